// Typed nonce representation. Grounded on the original tool's
// `nonces_helper.py`, which tagged a nonce with a bare kind string; here the
// kind is a variant of `NonceKind` so the per-kind key shape (query name,
// JSON flattened path, cookie name, XPath, ...) is part of the type instead
// of a convention callers have to remember.

use std::fmt;

use crate::http::Pair;

/// Which side of a request/response pair this nonce's value came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Origin {
    Request,
    Response,
}

/// Which URL component a `path`/`query`/`fragment`-flavored kind refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UrlComponent {
    Path,
    Query,
    Fragment,
}

impl fmt::Display for UrlComponent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UrlComponent::Path => write!(f, "path"),
            UrlComponent::Query => write!(f, "query"),
            UrlComponent::Fragment => write!(f, "fragment"),
        }
    }
}

/// The shape of a nonce's difference: which message part it was found in,
/// and what kind of locator (`key`) identifies it within that part.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum NonceKind {
    /// `key` is `None` for fragment, a query name for query, or a path
    /// segment index (as a string) for path.
    Url(UrlComponent),
    Authorization,
    Cookie,
    Json,
    FormUrlEncoded,
    SetCookie,
    MetaRedirect(UrlComponent),
    Location(UrlComponent),
    HtmlHiddenInput,
}

impl NonceKind {
    /// The wire-format name used by invariant checks and test fixtures,
    /// matching SPEC_FULL.md §3's kind vocabulary.
    pub fn wire_name(&self) -> String {
        match self {
            NonceKind::Url(c) => c.to_string(),
            NonceKind::Authorization => "authorization".to_string(),
            NonceKind::Cookie => "cookie".to_string(),
            NonceKind::Json => "json".to_string(),
            NonceKind::FormUrlEncoded => "form-urlencoded".to_string(),
            NonceKind::SetCookie => "set-cookie".to_string(),
            NonceKind::MetaRedirect(c) => format!("meta-redirect-{c}"),
            NonceKind::Location(c) => format!("location-{c}"),
            NonceKind::HtmlHiddenInput => "html-hidden-input".to_string(),
        }
    }
}

/// A single discovered difference between an alignment's two sides:
/// `origin` says which side produced it, `origin_pair` is the *recorded*
/// pair the nonce's value and retrieval key belong to (identified
/// structurally, not positionally, so the nonce stays addressable after the
/// Dynamic Pruner removes other pairs), `value` is the original-trace
/// literal to substitute, `kind` classifies it, and `key` locates it within
/// its kind (e.g. a query parameter name).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Nonce {
    pub origin: Origin,
    pub origin_pair: Pair,
    pub value: String,
    pub kind: NonceKind,
    pub key: Option<String>,
}

impl Nonce {
    pub fn new(
        origin: Origin,
        origin_pair: Pair,
        value: impl Into<String>,
        kind: NonceKind,
        key: Option<String>,
    ) -> Self {
        Self { origin, origin_pair, value: value.into(), kind, key }
    }

    /// The dedup/equality key used by `found_nonces` and by set-ness of
    /// `request_nonces`/`response_nonces` (SPEC_FULL.md §3 invariant).
    pub fn dedup_key(&self) -> (String, String, Option<String>) {
        (self.value.clone(), self.kind.wire_name(), self.key.clone())
    }
}
