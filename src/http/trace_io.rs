// Ambient trace-file reader: the concrete stand-in for the out-of-scope
// packet-capture/TLS-termination collaborator (SPEC_FULL.md §3). Reads the
// JSON wire format — already-reconstructed request/response dicts, the same
// shape the original tool's pickle fast path consumed — into `Pair`s.
//
// Swapping this module for one fed by a live capture pipeline doesn't touch
// anything downstream: everything past this file only ever sees `Pair`.

use std::path::Path;

use anyhow::Context;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use super::{HttpRequest, HttpResponse, Pair};

#[derive(Debug, Serialize, Deserialize)]
struct RawPair {
    request: RawRequest,
    response: RawResponse,
}

#[derive(Debug, Serialize, Deserialize)]
struct RawRequest {
    method: String,
    url: String,
    #[serde(default = "default_http_version")]
    http_version: String,
    #[serde(default)]
    headers: IndexMap<String, String>,
    #[serde(default)]
    content: Content,
}

#[derive(Debug, Serialize, Deserialize)]
struct RawResponse {
    status_code: u16,
    #[serde(default)]
    status_text: String,
    #[serde(default = "default_http_version")]
    http_version: String,
    #[serde(default)]
    headers: IndexMap<String, String>,
    #[serde(default, rename = "set-cookie")]
    set_cookie: Vec<String>,
    #[serde(default)]
    content: Content,
}

fn default_http_version() -> String {
    "HTTP/1.1".to_string()
}

/// A request/response body: plain UTF-8 text in the common case, or a
/// `{"base64": "..."}` wrapper for bodies that aren't valid UTF-8.
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(untagged)]
enum Content {
    #[default]
    Empty,
    Text(String),
    Base64 {
        base64: String,
    },
}

impl Content {
    fn into_bytes(self) -> anyhow::Result<Vec<u8>> {
        Ok(match self {
            Content::Empty => Vec::new(),
            Content::Text(s) => s.into_bytes(),
            Content::Base64 { base64 } => STANDARD.decode(base64.as_bytes())?,
        })
    }
}

/// Read a trace file (a JSON array of `{"request": ..., "response": ...}`
/// objects) into an ordered list of `Pair`s.
pub fn read_trace(path: impl AsRef<Path>) -> anyhow::Result<Vec<Pair>> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading trace file {}", path.display()))?;
    let raw: Vec<RawPair> = serde_json::from_str(&text)
        .with_context(|| format!("parsing trace file {} as JSON", path.display()))?;

    raw.into_iter()
        .map(|rp| {
            let req = HttpRequest::new(
                rp.request.method,
                rp.request.url,
                rp.request.http_version,
                rp.request.headers,
                rp.request.content.into_bytes()?,
            );
            let res = HttpResponse::new(
                rp.response.status_code,
                rp.response.status_text,
                rp.response.http_version,
                rp.response.headers,
                rp.response.set_cookie,
                rp.response.content.into_bytes()?,
            );
            Ok(Pair::new(req, res))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_minimal_trace() {
        let json = r#"[{
            "request": {"method": "GET", "url": "http://a.com/", "headers": {}, "content": ""},
            "response": {"status_code": 200, "headers": {"content-type": "text/plain"}, "content": "hi"}
        }]"#;
        let dir = tempdir();
        let path = dir.join("trace.json");
        std::fs::write(&path, json).unwrap();
        let pairs = read_trace(&path).unwrap();
        assert_eq!(pairs.len(), 1);
        assert_eq!(pairs[0].request.method, "GET");
        assert_eq!(pairs[0].response.status_code, 200);
        assert_eq!(pairs[0].response.content.as_ref(), b"hi");
    }

    #[test]
    fn decodes_base64_body() {
        let json = r#"[{
            "request": {"method": "POST", "url": "http://a.com/", "headers": {}, "content": {"base64": "aGVsbG8="}},
            "response": {"status_code": 200, "headers": {}, "content": ""}
        }]"#;
        let dir = tempdir();
        let path = dir.join("trace.json");
        std::fs::write(&path, json).unwrap();
        let pairs = read_trace(&path).unwrap();
        assert_eq!(pairs[0].request.content.as_ref(), b"hello");
    }

    fn tempdir() -> std::path::PathBuf {
        use std::sync::atomic::{AtomicU32, Ordering};
        static COUNTER: AtomicU32 = AtomicU32::new(0);
        let n = COUNTER.fetch_add(1, Ordering::Relaxed);
        let dir = std::env::temp_dir().join(format!("tracesieve-test-{}-{n}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }
}
