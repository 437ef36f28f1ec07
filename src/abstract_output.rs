// Output Abstractor: turns a pruned trace and its discovered nonce sets into
// the serializable minimal-trace JSON, optionally replacing nonce values and
// user-known strings with stable labels. Grounded on the original tool's
// `create_output.py` (token assignment, XSSI-agnostic body handling) plus
// the base spec's §6 output contract; unlike the rest of the engine this
// stage is explicitly an ambient/swappable one (SPEC_FULL.md §4.6) but is
// built in full since the round-trip invariant and the CLI both need it.

use indexmap::{IndexMap, IndexSet};
use serde_json::json;

use crate::config::Config;
use crate::http::Pair;
use crate::nonce::Nonce;

/// `original value -> label` (e.g. `<request_nonce_0::integer>` or
/// `<user-defined:SESSION_ID>`), in assignment order. Reapplying this table
/// in reverse (label -> original) over the abstracted output reproduces the
/// original bytes (invariant 5).
pub type ReplacementTable = IndexMap<String, String>;

pub struct OutputAbstractor<'a> {
    config: &'a Config,
}

impl<'a> OutputAbstractor<'a> {
    pub fn new(config: &'a Config) -> Self {
        Self { config }
    }

    /// Produce the output JSON array and the replacement table used to
    /// build it (empty if `should_abstract_output` is false).
    pub fn abstract_trace(
        &self,
        trace: &[Pair],
        request_nonces: &IndexSet<Nonce>,
        response_nonces: &IndexSet<Nonce>,
    ) -> (serde_json::Value, ReplacementTable) {
        let live_request_nonces = restrict_to_pruned(request_nonces, trace);
        let live_response_nonces = restrict_to_pruned(response_nonces, trace);

        let mut table = ReplacementTable::new();
        if self.config.should_abstract_output {
            assign_tokens(&live_request_nonces, "request_nonce", self.config, &mut table);
            assign_tokens(&live_response_nonces, "response_nonce", self.config, &mut table);
            for (literal, name) in &self.config.known_strings {
                table.insert(literal.clone(), format!("<user-defined:{name}>"));
            }
        }

        let pairs: Vec<serde_json::Value> = trace
            .iter()
            .filter_map(|pair| self.abstract_pair(pair, &table))
            .collect();

        (json!(pairs), table)
    }

    /// `ONLY_NONCE_VALUES_IN_OUTPUT`: the distinct nonce literals still
    /// live in `trace`, stripped of origin/kind/key. The output file's
    /// shape is pinned regardless (SPEC_FULL.md §6), so this is exposed as
    /// a debug-log artifact for a caller who wants the bare strings and
    /// not their provenance.
    pub fn nonce_values(
        &self,
        trace: &[Pair],
        request_nonces: &IndexSet<Nonce>,
        response_nonces: &IndexSet<Nonce>,
    ) -> Vec<String> {
        let mut values: Vec<String> =
            restrict_to_pruned(request_nonces, trace).into_iter().map(|n| n.value.clone()).collect();
        for v in restrict_to_pruned(response_nonces, trace).into_iter().map(|n| n.value.clone()) {
            if !values.contains(&v) {
                values.push(v);
            }
        }
        values
    }

    /// Returns `None` if either side's body is not valid UTF-8 (dropped
    /// from the output per SPEC_FULL.md §4.6 step 5).
    fn abstract_pair(&self, pair: &Pair, table: &ReplacementTable) -> Option<serde_json::Value> {
        let req_body = std::str::from_utf8(&pair.request.content).ok()?;
        let res_body = std::str::from_utf8(&pair.response.content).ok()?;

        let sub = |s: &str| -> String {
            if self.config.should_abstract_output {
                crate::replay::substitute_str(s, table)
            } else {
                s.to_string()
            }
        };

        let mut request_headers = serde_json::Map::new();
        for (k, v) in &pair.request.headers {
            request_headers.insert(k.clone(), json!(sub(v)));
        }

        let mut response_headers = serde_json::Map::new();
        for (k, v) in &pair.response.headers {
            response_headers.insert(k.clone(), json!(sub(v)));
        }
        if !pair.response.set_cookie.is_empty() {
            let cookies: Vec<String> = pair.response.set_cookie.iter().map(|c| sub(c)).collect();
            response_headers.insert("set-cookie".to_string(), json!(cookies));
        }

        Some(json!({
            "request": {
                "method": pair.request.method,
                "url": sub(&pair.request.url),
                "headers": request_headers,
                "content": sub(req_body),
            },
            "response": {
                "status_code": pair.response.status_code,
                "headers": response_headers,
                "content": sub(res_body),
            },
        }))
    }
}

fn restrict_to_pruned<'a>(nonces: &'a IndexSet<Nonce>, trace: &[Pair]) -> Vec<&'a Nonce> {
    nonces.iter().filter(|n| trace.contains(&n.origin_pair)).collect()
}

/// Assign `<prefix_N::TYPE>` tokens to distinct nonce values in
/// first-encounter order, skipping values already assigned (e.g. by the
/// other nonce set, or already present from an earlier encounter).
fn assign_tokens(nonces: &[&Nonce], prefix: &str, config: &Config, table: &mut ReplacementTable) {
    let mut counter = 0usize;
    for nonce in nonces {
        if table.contains_key(&nonce.value) {
            continue;
        }
        let type_name = config.classify(&nonce.value);
        table.insert(nonce.value.clone(), format!("<{prefix}_{counter}::{type_name}>"));
        counter += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::{HttpRequest, HttpResponse};
    use crate::nonce::{NonceKind, Origin};
    use indexmap::IndexMap as Map;

    fn simple_pair(body: &str) -> Pair {
        let mut headers = Map::new();
        headers.insert("content-type".to_string(), "application/json".to_string());
        Pair::new(
            HttpRequest::new("GET", "http://a.com/", "HTTP/1.1", Map::new(), Vec::new()),
            HttpResponse::new(200, "OK", "HTTP/1.1", headers, Vec::new(), body.as_bytes().to_vec()),
        )
    }

    #[test]
    fn round_trip_reproduces_original_bytes() {
        let pair = simple_pair(r#"{"tok":"SECRET123"}"#);
        let trace = vec![pair.clone()];
        let mut response_nonces = IndexSet::new();
        response_nonces.insert(Nonce::new(Origin::Response, pair.clone(), "SECRET123", NonceKind::Json, Some("|tok".to_string())));

        let mut config = Config::default();
        config.should_abstract_output = true;
        let abstractor = OutputAbstractor::new(&config);
        let (output, table) = abstractor.abstract_trace(&trace, &IndexSet::new(), &response_nonces);

        let abstracted_body = output[0]["response"]["content"].as_str().unwrap().to_string();
        assert!(!abstracted_body.contains("SECRET123"));

        let mut reversed = abstracted_body;
        for (original, label) in &table {
            reversed = reversed.replace(label.as_str(), original.as_str());
        }
        assert_eq!(reversed, r#"{"tok":"SECRET123"}"#);
    }

    #[test]
    fn nonce_values_strips_provenance() {
        let pair = simple_pair(r#"{"tok":"SECRET123"}"#);
        let trace = vec![pair.clone()];
        let mut response_nonces = IndexSet::new();
        response_nonces.insert(Nonce::new(Origin::Response, pair.clone(), "SECRET123", NonceKind::Json, Some("|tok".to_string())));

        let config = Config::default();
        let abstractor = OutputAbstractor::new(&config);
        let values = abstractor.nonce_values(&trace, &IndexSet::new(), &response_nonces);
        assert_eq!(values, vec!["SECRET123".to_string()]);
    }

    #[test]
    fn non_utf8_body_is_dropped() {
        let mut pair = simple_pair("");
        pair.response.content = bytes::Bytes::from_static(&[0xff, 0xfe, 0x00]);
        let config = Config::default();
        let abstractor = OutputAbstractor::new(&config);
        let (output, _) = abstractor.abstract_trace(&[pair], &IndexSet::new(), &IndexSet::new());
        assert_eq!(output.as_array().unwrap().len(), 0);
    }
}
