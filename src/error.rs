// Typed errors for the alignment/reduction engine.
//
// Only `ConfigError` (and plain I/O failure opening a file) is meant to
// bubble all the way past `main` — everything else is consumed internally
// by the component that can recover from it (see SPEC_FULL.md §7).

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("config error: {0}")]
    Config(String),

    #[error("replay completed without the oracle pair being observed")]
    OracleNotUsed,

    #[error("live status {live} did not match recorded status {recorded}")]
    ReplayMismatch { recorded: u16, live: u16 },

    #[error("failed to parse {kind} body: {reason}")]
    Parse { kind: &'static str, reason: String },

    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
