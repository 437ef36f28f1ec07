use std::hash::{Hash, Hasher};

use url::Url;

use super::{parse_kv_pairs, Headers};
use indexmap::IndexMap;

#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: String,
    pub url: String,
    pub http_version: String,
    pub https: bool,
    /// Lowercase header names, insertion order preserved.
    pub headers: Headers,
    /// `Bytes` rather than `Vec<u8>`: pairs are cloned liberally (alignment
    /// search, nonce origins, dynamic-pruner candidate traces), and `Bytes`
    /// makes that a refcount bump instead of a deep copy.
    pub content: bytes::Bytes,
}

impl HttpRequest {
    pub fn new(
        method: impl Into<String>,
        url: impl Into<String>,
        http_version: impl Into<String>,
        headers: Headers,
        content: Vec<u8>,
    ) -> Self {
        let url = url.into();
        let https = url.starts_with("https");
        Self {
            method: method.into(),
            url,
            http_version: http_version.into(),
            https,
            headers,
            content: content.into(),
        }
    }

    /// Parse `self.url` fresh every time rather than caching it, since a
    /// replay may rewrite `self.url` in place between requests.
    pub fn parsed_url(&self) -> Option<Url> {
        Url::parse(&self.url).ok()
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(&name.to_ascii_lowercase()).map(|v| v.as_str())
    }

    /// Non-empty path segments, in order (`/a/b/` -> `["a", "b"]`).
    pub fn path_segments(&self) -> Vec<String> {
        self.parsed_url()
            .and_then(|u| u.path_segments().map(|s| s.filter(|seg| !seg.is_empty()).map(str::to_string).collect()))
            .unwrap_or_default()
    }

    /// Query parameters as an insertion-ordered map.
    pub fn query_params(&self) -> IndexMap<String, String> {
        self.parsed_url()
            .map(|u| parse_kv_pairs(u.query().unwrap_or(""), '&'))
            .unwrap_or_default()
    }

    pub fn fragment(&self) -> String {
        self.parsed_url()
            .and_then(|u| u.fragment().map(str::to_string))
            .unwrap_or_default()
    }

    /// Cookies from the `cookie` header, split on `"; "` then first `"="`.
    /// A base64-encoded cookie value may itself contain `=`, so only the
    /// first `=` is consumed as the separator.
    pub fn cookies(&self) -> IndexMap<String, String> {
        let mut cookies = IndexMap::new();
        if let Some(raw) = self.header("cookie") {
            for part in raw.split("; ") {
                if let Some((k, v)) = part.split_once('=') {
                    cookies.insert(k.to_string(), v.to_string());
                }
            }
        }
        cookies
    }

    /// Headers with `host`/`:authority` stripped — the HTTP client
    /// synthesizes these itself during replay.
    pub fn headers_for_replay(&self) -> Headers {
        let mut h = self.headers.clone();
        h.shift_remove("host");
        h.shift_remove(":authority");
        h
    }

    fn identity_key(&self) -> (&str, &str, &str, &[u8]) {
        (&self.method, &self.url, &self.http_version, self.content.as_ref())
    }
}

impl PartialEq for HttpRequest {
    fn eq(&self, other: &Self) -> bool {
        self.identity_key() == other.identity_key() && self.headers == other.headers
    }
}
impl Eq for HttpRequest {}

impl Hash for HttpRequest {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.method.hash(state);
        self.url.hash(state);
        self.http_version.hash(state);
        self.content.hash(state);
        for (k, v) in &self.headers {
            k.hash(state);
            v.hash(state);
        }
    }
}
