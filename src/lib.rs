//! Alignment, nonce discovery, live replay, and delta-debug reduction for a
//! pair of recorded HTTP traces — reduce two nominally-identical sessions
//! down to the smallest subsequence that still reproduces a caller-defined
//! oracle outcome.

pub mod abstract_output;
pub mod config;
pub mod error;
pub mod html;
pub mod http;
pub mod matcher;
pub mod nonce;
pub mod pruning;
pub mod replay;

use std::path::Path;
use std::time::Duration;

use tracing::{debug, info, warn};

use abstract_output::OutputAbstractor;
use config::{Config, OracleConfig};
use error::Error;
use http::{trace_io, Pair};
use matcher::Matcher;
use nonce::find_nonces;
use pruning::{dynamic_prune, static_prune};
use replay::Replayer;

/// Run the full pipeline end to end: read both traces, statically prune,
/// enumerate alignments longest-first, take the first that replays
/// successfully, dynamically prune it, and abstract the result into the
/// output JSON. Matches SPEC_FULL.md §2's component diagram.
pub async fn run_pipeline(
    trace_a_path: &Path,
    trace_b_path: &Path,
    config: &Config,
    oracle: &dyn OracleConfig,
) -> anyhow::Result<serde_json::Value> {
    let raw_a = trace_io::read_trace(trace_a_path)?;
    let raw_b = trace_io::read_trace(trace_b_path)?;
    info!(a = raw_a.len(), b = raw_b.len(), "read traces");

    let pruned_a = static_prune(raw_a, oracle)?;
    let pruned_b = static_prune(raw_b, oracle)?;
    info!(a = pruned_a.len(), b = pruned_b.len(), "static pruning complete");

    let oracle_pair = pruned_a
        .iter()
        .find(|pair| oracle.use_oracle(pair))
        .cloned()
        .ok_or(Error::OracleNotUsed)?;

    let matcher = Matcher::new(&pruned_a, &pruned_b);
    let alignments = matcher.alignments();
    if alignments.is_empty() {
        anyhow::bail!("no alignment exists between the two traces");
    }
    info!(count = alignments.len(), "matcher produced alignments");

    let mut chosen = None;
    for alignment in &alignments {
        if config.should_print_urls_for_matchings {
            let matched: std::collections::HashSet<usize> = alignment.iter().map(|&(i, _)| i).collect();
            let urls: Vec<String> = pruned_a
                .iter()
                .enumerate()
                .map(|(i, p)| format!("{}{}", if matched.contains(&i) { "+ " } else { "  " }, p.request.url))
                .collect();
            debug!(matching = %urls.join("\n"), "matched urls for this alignment");
        }
        let nonce_sets = find_nonces(&pruned_a, &pruned_b, alignment);
        let mut replayer = Replayer::new(oracle);
        match replayer.replay(&pruned_a, &nonce_sets.response_nonces).await {
            Ok(true) => {
                chosen = Some((nonce_sets, true));
                break;
            }
            Ok(false) => continue,
            Err(err) => {
                warn!(error = %err, "alignment failed to replay");
                continue;
            }
        }
    }

    let (nonce_sets, replay_succeeded) = match chosen {
        Some(found) => found,
        None => {
            warn!("no alignment produced a successful replay; falling back to the first alignment and skipping dynamic pruning");
            (find_nonces(&pruned_a, &pruned_b, &alignments[0]), false)
        }
    };

    let minimized = if replay_succeeded {
        dynamic_prune(
            pruned_a.clone(),
            &nonce_sets.response_nonces,
            &oracle_pair,
            oracle,
            Duration::from_secs(config.time_between_dynamic_pruning_runs),
        )
        .await
    } else {
        pruned_a.clone()
    };
    info!(remaining = minimized.len(), "dynamic pruning complete");

    let abstractor = OutputAbstractor::new(config);
    if config.only_nonce_values_in_output {
        let values = abstractor.nonce_values(&minimized, &nonce_sets.request_nonces, &nonce_sets.response_nonces);
        debug!(?values, "nonce values (provenance discarded)");
    }
    let (output, _table) = abstractor.abstract_trace(&minimized, &nonce_sets.request_nonces, &nonce_sets.response_nonces);
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;

    // S9: a trace written by the Output Abstractor with
    // `should_abstract_output = false` round-trips through `TraceReader` as
    // a fresh two-pair trace.
    #[test]
    fn s9_abstracted_trace_round_trips_through_trace_reader() {
        use crate::http::{HttpRequest, HttpResponse};
        use indexmap::IndexMap;

        let pairs: Vec<Pair> = vec![
            Pair::new(
                HttpRequest::new("GET", "http://a.com/1", "HTTP/1.1", IndexMap::new(), Vec::new()),
                HttpResponse::new(200, "OK", "HTTP/1.1", IndexMap::new(), Vec::new(), b"one".to_vec()),
            ),
            Pair::new(
                HttpRequest::new("GET", "http://a.com/2", "HTTP/1.1", IndexMap::new(), Vec::new()),
                HttpResponse::new(200, "OK", "HTTP/1.1", IndexMap::new(), Vec::new(), b"two".to_vec()),
            ),
        ];

        let config = Config::default();
        let abstractor = OutputAbstractor::new(&config);
        let (output, _) = abstractor.abstract_trace(&pairs, &indexmap::IndexSet::new(), &indexmap::IndexSet::new());

        let dir = std::env::temp_dir().join(format!("tracesieve-lib-test-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("roundtrip.json");
        std::fs::write(&path, serde_json::to_string(&output).unwrap()).unwrap();

        let reread = trace_io::read_trace(&path).unwrap();
        assert_eq!(reread.len(), 2);
        assert_eq!(reread[0].request.url, "http://a.com/1");
        assert_eq!(reread[1].response.content.as_ref(), b"two");
    }
}
