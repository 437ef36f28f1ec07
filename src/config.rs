// Runtime configuration and the pluggable oracle capability set.
//
// Grounded on the original tool's `config.py`, which mixed TOML-shaped data
// (timings, debug flags, the TYPES classification table) with three
// module-level functions (`USE_ORACLE`, `ORACLE`, `CUSTOM_FILTER`) that were
// process-wide mutable state by construction. SPEC_FULL.md §6 and Design
// Note "Configuration as pluggable predicates" turn those three into a
// trait, `OracleConfig`, injected at construction instead — a capability set
// rather than module globals.

use std::collections::HashMap;

use regex::Regex;
use serde::Deserialize;

use crate::http::Pair;

/// Data-only settings, loadable from a TOML file via `serde`.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Seconds to sleep between dynamic-pruner replay probes.
    pub time_between_dynamic_pruning_runs: u64,
    pub debug: bool,
    pub should_print_urls_for_matchings: bool,
    pub only_nonce_values_in_output: bool,
    pub should_abstract_output: bool,
    /// `name -> fully-matching regex` used to classify a nonce's abstracted
    /// type; evaluated in order, first match wins, `"unknown"` otherwise.
    pub types: Vec<(String, String)>,
    /// Literal strings a researcher already knows the meaning of; these are
    /// abstracted to `<user-defined:NAME>` regardless of whether they were
    /// ever discovered as a nonce.
    pub known_strings: HashMap<String, String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            time_between_dynamic_pruning_runs: 10,
            debug: true,
            should_print_urls_for_matchings: true,
            only_nonce_values_in_output: false,
            should_abstract_output: false,
            types: default_types(),
            known_strings: HashMap::new(),
        }
    }
}

fn default_types() -> Vec<(String, String)> {
    vec![
        (r"-?[0-9]*\.[0-9]+".to_string(), "decimal".to_string()),
        (r"-?[0-9]+".to_string(), "integer".to_string()),
        (
            r"https?://(?:[a-zA-Z0-9$\-_@.&+!*'(),]|%[0-9a-fA-F]{2})+".to_string(),
            "url".to_string(),
        ),
        (r"[a-zA-Z0-9_.+-]+@[a-zA-Z0-9-]+\.[a-zA-Z0-9.-]+".to_string(), "email".to_string()),
        (r"[a-f0-9]+".to_string(), "hex-string".to_string()),
        (
            r"([a-zA-Z0-9_\-]|%[a-fA-F0-9]{2})+%[a-fA-F0-9]{2}([a-zA-Z0-9_\-]|%[a-fA-F0-9]{2})+".to_string(),
            "url-encoded-string".to_string(),
        ),
        (
            r"([a-zA-Z0-9+/_\-,]+={0,3}\.){2}[a-zA-Z0-9+/_\-,]+={0,3}".to_string(),
            "JWT token".to_string(),
        ),
        (r"[a-zA-Z0-9+/_\-,]+={0,3}".to_string(), "base64-string".to_string()),
    ]
}

impl Config {
    pub fn load(path: &std::path::Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&text)?)
    }

    /// The first fully-matching `TYPES` entry's name, or `"unknown"`.
    pub fn classify(&self, value: &str) -> String {
        for (pattern, name) in &self.types {
            if let Ok(re) = Regex::new(&format!("^(?:{pattern})$")) {
                if re.is_match(value) {
                    return name.clone();
                }
            }
        }
        "unknown".to_string()
    }
}

/// The capability set a caller injects to tell the engine which pair is the
/// oracle pair, what the oracle actually decides, and which pairs to drop
/// regardless of static pruning. Unlike the original tool's module-level
/// functions, this is an object a caller constructs and owns — not
/// process-wide state.
pub trait OracleConfig: Send + Sync {
    /// True for exactly one pair per trace — the pair whose live response
    /// decides the oracle verdict.
    fn use_oracle(&self, pair: &Pair) -> bool;

    /// Pure: given the live status/headers/body mirroring the oracle pair,
    /// return whether the interaction "worked".
    fn oracle(&self, status: u16, headers: &reqwest::header::HeaderMap, body: &[u8]) -> bool;

    /// True for pairs the researcher already knows are irrelevant noise.
    fn custom_filter(&self, _pair: &Pair) -> bool {
        false
    }
}
