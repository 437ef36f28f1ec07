use std::hash::{Hash, Hasher};

use indexmap::IndexMap;

use super::{parse_kv_pairs, Headers};
use crate::html;

#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status_code: u16,
    pub status_text: String,
    pub http_version: String,
    /// Every header except `set-cookie`, which is kept separately since a
    /// response may repeat it.
    pub headers: Headers,
    pub set_cookie: Vec<String>,
    pub content: bytes::Bytes,
}

impl HttpResponse {
    pub fn new(
        status_code: u16,
        status_text: impl Into<String>,
        http_version: impl Into<String>,
        headers: Headers,
        set_cookie: Vec<String>,
        content: Vec<u8>,
    ) -> Self {
        Self {
            status_code,
            status_text: status_text.into(),
            http_version: http_version.into(),
            headers,
            set_cookie,
            content: content.into(),
        }
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(&name.to_ascii_lowercase()).map(|v| v.as_str())
    }

    pub fn content_type(&self) -> Option<&str> {
        self.header("content-type").map(|v| v.split(';').next().unwrap_or(v).trim())
    }

    /// `text` decoded lossily from `content` — used by every derived view
    /// below since the wire body is carried as raw bytes.
    fn text(&self) -> String {
        String::from_utf8_lossy(&self.content).into_owned()
    }

    /// JSON body, stripping a 4-byte XSSI prefix line (e.g. `)]}'`) if the
    /// first line is exactly 4 characters.
    pub fn json_content(&self) -> Option<serde_json::Value> {
        self.parsed_json().and_then(|r| r.ok())
    }

    /// Like `json_content`, but keeps the `serde_json::Error` on a malformed
    /// body instead of discarding it — lets a caller tell "not JSON" (`None`)
    /// apart from "advertised as JSON but failed to parse" (`Some(Err(_))`).
    pub fn parsed_json(&self) -> Option<Result<serde_json::Value, serde_json::Error>> {
        if self.content_type() != Some("application/json") {
            return None;
        }
        let text = self.text();
        let stripped = strip_xssi_prefix(&text);
        Some(serde_json::from_str(stripped))
    }

    /// Flattened JSON as `(path, value)` pairs, `path` rooted at `""` with
    /// `|`-separated object keys / array indices.
    pub fn flattened_json(&self) -> Vec<(String, String)> {
        match self.json_content() {
            Some(v) => {
                let mut out = Vec::new();
                flatten_json(&v, String::new(), &mut out);
                out
            }
            None => Vec::new(),
        }
    }

    pub fn url_encoded_content(&self) -> IndexMap<String, String> {
        if self.content_type() != Some("application/x-www-form-urlencoded") {
            return IndexMap::new();
        }
        parse_kv_pairs(&self.text(), '&')
    }

    /// `set-cookie` values parsed into `name -> value`, first `=` only (a
    /// later `=` may be part of a base64 value).
    pub fn set_cookies(&self) -> IndexMap<String, String> {
        let mut map = IndexMap::new();
        for raw in &self.set_cookie {
            let pair = raw.split(';').next().unwrap_or(raw);
            if let Some((k, v)) = pair.split_once('=') {
                map.insert(k.to_string(), v.to_string());
            }
        }
        map
    }

    pub fn meta_refresh_url(&self) -> Option<String> {
        if self.content_type()? != "text/html" {
            return None;
        }
        html::parse_meta_refresh(&self.text())
    }

    /// Hidden `<input>` elements keyed by a locator: `//input[@id='...']`
    /// when an `id` attribute is present, else a canonical tree path.
    pub fn hidden_inputs(&self) -> IndexMap<String, String> {
        if self.content_type() != Some("text/html") {
            return IndexMap::new();
        }
        html::hidden_inputs(&self.text()).into_iter().collect()
    }

    fn identity_key(&self) -> (u16, &str, &[u8]) {
        (self.status_code, &self.http_version, self.content.as_ref())
    }
}

impl PartialEq for HttpResponse {
    fn eq(&self, other: &Self) -> bool {
        self.identity_key() == other.identity_key()
            && self.headers == other.headers
            && self.set_cookie == other.set_cookie
    }
}
impl Eq for HttpResponse {}

impl Hash for HttpResponse {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.status_code.hash(state);
        self.http_version.hash(state);
        self.content.hash(state);
        for (k, v) in &self.headers {
            k.hash(state);
            v.hash(state);
        }
        self.set_cookie.hash(state);
    }
}

fn strip_xssi_prefix(text: &str) -> &str {
    match text.split_once('\n') {
        Some((first_line, _)) if first_line.len() == 4 => &text[first_line.len() + 1..],
        _ => text,
    }
}

pub fn flatten_json(value: &serde_json::Value, prefix: String, out: &mut Vec<(String, String)>) {
    match value {
        serde_json::Value::Object(map) => {
            for (k, v) in map {
                flatten_json(v, format!("{prefix}|{k}"), out);
            }
        }
        serde_json::Value::Array(items) => {
            for (i, v) in items.iter().enumerate() {
                flatten_json(v, format!("{prefix}|{i}"), out);
            }
        }
        serde_json::Value::String(s) => out.push((prefix, s.clone())),
        serde_json::Value::Null => out.push((prefix, String::new())),
        other => out.push((prefix, other.to_string())),
    }
}
