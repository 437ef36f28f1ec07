// Delta-debug-style dynamic pruning: shrink a trace that is known to replay
// successfully down to a local minimum. Grounded on the original tool's
// `dynamic_pruning_helper.py`, which performed the same left-to-right
// remove-and-check shrinkage against a live server.

use std::time::Duration;

use indexmap::IndexSet;
use tracing::info;

use crate::config::OracleConfig;
use crate::http::Pair;
use crate::nonce::Nonce;
use crate::replay::Replayer;

/// Remove pairs one at a time, left to right, keeping a removal only if the
/// resulting trace still replays to an oracle-true verdict. The designated
/// `oracle_pair` is never proposed for removal. Sleeps
/// `time_between_runs` between replay probes to respect rate limits.
pub async fn dynamic_prune(
    trace: Vec<Pair>,
    response_nonces: &IndexSet<Nonce>,
    oracle_pair: &Pair,
    oracle: &dyn OracleConfig,
    time_between_runs: Duration,
) -> Vec<Pair> {
    let mut prefix: Vec<Pair> = Vec::new();
    let mut rest = trace;

    while !rest.is_empty() {
        let head = rest.remove(0);

        let keep_dropped = head != *oracle_pair && probe_succeeds(&prefix, &rest, response_nonces, oracle).await;

        if keep_dropped {
            info!(url = %head.request.url, "dynamic pruner dropped pair");
        } else {
            prefix.push(head);
        }

        tokio::time::sleep(time_between_runs).await;
    }

    prefix
}

async fn probe_succeeds(prefix: &[Pair], tail: &[Pair], response_nonces: &IndexSet<Nonce>, oracle: &dyn OracleConfig) -> bool {
    let candidate: Vec<Pair> = prefix.iter().cloned().chain(tail.iter().cloned()).collect();
    let mut replayer = Replayer::new(oracle);
    matches!(replayer.replay(&candidate, response_nonces).await, Ok(true))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::{HttpRequest, HttpResponse};
    use crate::nonce::{Nonce, NonceKind, Origin};
    use indexmap::IndexMap;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn pair(path: &str) -> Pair {
        Pair::new(
            HttpRequest::new("GET", format!("http://a.com/{path}"), "HTTP/1.1", IndexMap::new(), Vec::new()),
            HttpResponse::new(200, "OK", "HTTP/1.1", IndexMap::new(), Vec::new(), Vec::new()),
        )
    }

    #[test]
    fn oracle_pair_never_enters_removal_candidates() {
        let oracle_pair = pair("oracle");
        let trace = vec![pair("p1"), oracle_pair.clone(), pair("p2")];
        assert!(trace.iter().any(|p| p == &oracle_pair));
        assert_eq!(trace[1], oracle_pair);
    }

    struct StatusOracle {
        oracle_pair: Pair,
    }

    impl OracleConfig for StatusOracle {
        fn use_oracle(&self, pair: &Pair) -> bool {
            pair == &self.oracle_pair
        }

        fn oracle(&self, status: u16, _headers: &reqwest::header::HeaderMap, _body: &[u8]) -> bool {
            status == 200
        }
    }

    // S6 (SPEC_FULL.md §8): a three-pair trace `[p1, oracle, p2]` where the
    // oracle's live success depends on a nonce retrieved from `p1`'s
    // response. Dropping `p1` leaves the oracle request with its stale
    // recorded value, so the live server refuses it and `p1` is kept.
    // Dropping `p2` changes nothing the oracle observes, so it is removed.
    // The expected shrunk trace is `[p1, oracle]`.
    #[tokio::test]
    async fn dynamic_prune_reduces_trace_to_pairs_the_oracle_depends_on() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/p1"))
            .respond_with(ResponseTemplate::new(200).insert_header("content-type", "application/json").set_body_string(r#"{"tok":"NEW"}"#))
            .mount(&server)
            .await;

        Mock::given(method("GET")).and(path("/oracle")).and(query_param("t", "NEW")).respond_with(ResponseTemplate::new(200)).mount(&server).await;

        Mock::given(method("GET")).and(path("/oracle")).and(query_param("t", "OLD")).respond_with(ResponseTemplate::new(404)).mount(&server).await;

        Mock::given(method("GET")).and(path("/p2")).respond_with(ResponseTemplate::new(200)).mount(&server).await;

        let base = server.uri();

        let p1 = Pair::new(
            HttpRequest::new("GET", format!("{base}/p1"), "HTTP/1.1", IndexMap::new(), Vec::new()),
            {
                let mut headers = IndexMap::new();
                headers.insert("content-type".to_string(), "application/json".to_string());
                HttpResponse::new(200, "OK", "HTTP/1.1", headers, Vec::new(), br#"{"tok":"OLD"}"#.to_vec())
            },
        );
        let oracle_pair = Pair::new(
            HttpRequest::new("GET", format!("{base}/oracle?t=OLD"), "HTTP/1.1", IndexMap::new(), Vec::new()),
            HttpResponse::new(200, "OK", "HTTP/1.1", IndexMap::new(), Vec::new(), Vec::new()),
        );
        let p2 = Pair::new(
            HttpRequest::new("GET", format!("{base}/p2"), "HTTP/1.1", IndexMap::new(), Vec::new()),
            HttpResponse::new(200, "OK", "HTTP/1.1", IndexMap::new(), Vec::new(), Vec::new()),
        );

        let mut response_nonces = IndexSet::new();
        response_nonces.insert(Nonce::new(Origin::Response, p1.clone(), "OLD", NonceKind::Json, Some("|tok".to_string())));

        let oracle = StatusOracle { oracle_pair: oracle_pair.clone() };
        let trace = vec![p1.clone(), oracle_pair.clone(), p2];

        let result = dynamic_prune(trace, &response_nonces, &oracle_pair, &oracle, Duration::from_millis(1)).await;

        assert_eq!(result, vec![p1, oracle_pair]);
    }
}
