// Static pruning: drop pairs that are statically irrelevant to alignment
// before the expensive matching/replay stages ever see them. Grounded on
// the original tool's `pruning_helper.py` three-signal filter plus its
// oracle pre-prune and custom-filter hooks.

use tracing::{debug, info};

use crate::config::OracleConfig;
use crate::error::{Error, Result};
use crate::http::Pair;

use super::mime_tables::prunable_extensions_and_codes;

const ALLOWED_FETCH_DESTS: &[&str] = &["", "document", "empty"];

/// Apply the three static signals, the oracle pre-prune, and the caller's
/// custom filter, in that order. Returns `Err(Error::Config)` if no
/// oracle-eligible pair survives pre-prune (SPEC_FULL.md §4.1).
pub fn static_prune(pairs: Vec<Pair>, oracle: &dyn OracleConfig) -> Result<Vec<Pair>> {
    let (pruned_extensions, pruned_codes) = prunable_extensions_and_codes();

    let signal_filtered: Vec<Pair> = pairs
        .into_iter()
        .filter(|pair| !matches_static_signal(pair, &pruned_extensions, &pruned_codes))
        .collect();
    debug!(remaining = signal_filtered.len(), "static signal pruning complete");

    let pre_pruned = oracle_pre_prune(signal_filtered, oracle)?;
    debug!(remaining = pre_pruned.len(), "oracle pre-prune complete");

    let result: Vec<Pair> = pre_pruned.into_iter().filter(|pair| !oracle.custom_filter(pair)).collect();
    info!(remaining = result.len(), "static pruning complete");
    Ok(result)
}

fn matches_static_signal(pair: &Pair, pruned_extensions: &[String], pruned_codes: &[String]) -> bool {
    if let Some(last_segment) = pair.request.path_segments().last() {
        if let Some((_, ext)) = last_segment.rsplit_once('.') {
            if pruned_extensions.iter().any(|e| e == &ext.to_lowercase()) {
                return true;
            }
        }
    }

    if let Some(dest) = pair.request.header("sec-fetch-dest") {
        if !ALLOWED_FETCH_DESTS.contains(&dest) {
            return true;
        }
    }

    if let Some(content_type) = pair.response.content_type() {
        if pruned_codes.iter().any(|c| c == &content_type.to_lowercase()) {
            return true;
        }
    }

    false
}

/// Drop the longest suffix in which no pair satisfies `use_oracle`: keep
/// the trace up to and including the last oracle-eligible pair.
fn oracle_pre_prune(pairs: Vec<Pair>, oracle: &dyn OracleConfig) -> Result<Vec<Pair>> {
    let last_oracle_index = pairs.iter().rposition(|p| oracle.use_oracle(p));
    match last_oracle_index {
        Some(idx) => {
            let mut pairs = pairs;
            pairs.truncate(idx + 1);
            Ok(pairs)
        }
        None => Err(Error::Config("trace contains no oracle pair".to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::{HttpRequest, HttpResponse};
    use indexmap::IndexMap;

    struct AlwaysOracle;
    impl OracleConfig for AlwaysOracle {
        fn use_oracle(&self, _pair: &Pair) -> bool {
            true
        }
        fn oracle(&self, _status: u16, _headers: &reqwest::header::HeaderMap, _body: &[u8]) -> bool {
            true
        }
    }

    fn pair_with_content_type(ct: &str) -> Pair {
        let mut headers = IndexMap::new();
        headers.insert("content-type".to_string(), ct.to_string());
        Pair::new(
            HttpRequest::new("GET", "http://a.com/x", "HTTP/1.1", IndexMap::new(), Vec::new()),
            HttpResponse::new(200, "OK", "HTTP/1.1", headers, Vec::new(), Vec::new()),
        )
    }

    #[test]
    fn s8_javascript_pruned_json_kept() {
        let pairs = vec![pair_with_content_type("application/javascript"), pair_with_content_type("application/json")];
        let result = static_prune(pairs, &AlwaysOracle).unwrap();
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].response.content_type(), Some("application/json"));
    }

    struct NeverOracle;
    impl OracleConfig for NeverOracle {
        fn use_oracle(&self, _pair: &Pair) -> bool {
            false
        }
        fn oracle(&self, _status: u16, _headers: &reqwest::header::HeaderMap, _body: &[u8]) -> bool {
            false
        }
    }

    #[test]
    fn no_oracle_pair_is_fatal() {
        let pairs = vec![pair_with_content_type("text/html")];
        let result = static_prune(pairs, &NeverOracle);
        assert!(matches!(result, Err(Error::Config(_))));
    }
}
