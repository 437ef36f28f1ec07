// HTTP data model: request/response types, derived views, and the trace pair
// they're bundled into. Grounded on the original tool's `my_http.py` (request/
// response shape, derived-view semantics) but expressed as owned Rust types
// with `url::Url` for parsing instead of hand-rolled `urlparse` calls.

mod pair;
mod request;
mod response;
pub mod trace_io;

pub use pair::Pair;
pub use request::HttpRequest;
pub use response::HttpResponse;

use indexmap::IndexMap;

/// Case-insensitive, insertion-ordered header map. Values are plain strings
/// except `set-cookie`, which callers keep as a `Vec<String>` alongside (see
/// [`HttpResponse::set_cookies`]) since a response may repeat it.
pub type Headers = IndexMap<String, String>;

/// Split a `"k1=v1&k2=v2"` query/body string into an insertion-ordered map.
/// A key with no `=` maps to the empty string, mirroring the original's
/// `part.split("=")` fallback.
pub fn parse_kv_pairs(raw: &str, pair_sep: char) -> IndexMap<String, String> {
    let mut map = IndexMap::new();
    if raw.is_empty() {
        return map;
    }
    for part in raw.split(pair_sep) {
        if part.is_empty() {
            continue;
        }
        match part.split_once('=') {
            Some((k, v)) => {
                map.insert(k.to_string(), v.to_string());
            }
            None => {
                map.insert(part.to_string(), String::new());
            }
        }
    }
    map
}
