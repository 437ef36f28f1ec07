// CLI front end. A thin `clap` binary over the library crate's
// `run_pipeline` entry point — the "CLI plumbing" SPEC_FULL.md §1 calls an
// external collaborator, built here so the engine is runnable end to end.
// The bundled `StatusCodeOracle` is a small reference `OracleConfig`
// implementation for ad hoc use from the command line; a real deployment
// embeds this crate as a library and supplies its own.

use std::path::PathBuf;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use tracesieve::config::{Config, OracleConfig};
use tracesieve::http::{trace_io, Pair};

#[derive(Parser, Debug)]
#[command(name = "tracesieve", about = "Align, replay, and reduce a pair of recorded HTTP traces to the minimal subsequence that reproduces an oracle outcome.")]
struct Cli {
    /// Trace file to be reduced (the "recorded" / primary trace).
    trace_a: PathBuf,
    /// The comparison trace used to discover nonces via alignment.
    trace_b: PathBuf,
    /// Where to write the minimized, abstracted trace.
    #[arg(long)]
    output: PathBuf,
    /// TOML configuration file; falls back to built-in defaults if absent.
    #[arg(long)]
    config: Option<PathBuf>,
    /// 0-based index into `trace_a` of the pair whose live response decides
    /// the oracle verdict.
    #[arg(long)]
    oracle_index: usize,
    /// Live status code that counts as the oracle succeeding.
    #[arg(long, default_value_t = 200)]
    oracle_status: u16,
    /// Increase log verbosity (-v, -vv).
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

/// Reference oracle: the pair at a fixed index in `trace_a` is the oracle
/// pair, and the run "succeeds" iff the live replay of that pair returns a
/// specific status code.
struct StatusCodeOracle {
    oracle_pair: Pair,
    expected_status: u16,
}

impl OracleConfig for StatusCodeOracle {
    fn use_oracle(&self, pair: &Pair) -> bool {
        pair == &self.oracle_pair
    }

    fn oracle(&self, status: u16, _headers: &reqwest::header::HeaderMap, _body: &[u8]) -> bool {
        status == self.expected_status
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };

    // `config.debug` sets the baseline verbosity (matching the original
    // tool's `CONFIGURATION["DEBUG"]`-gated prints); `-v`/`-vv` escalate
    // further on top of it.
    let baseline = if config.debug { 1 } else { 0 };
    let default_level = match cli.verbose + baseline {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(format!("tracesieve={default_level}"))))
        .init();

    let raw_a = trace_io::read_trace(&cli.trace_a)?;
    let oracle_pair = raw_a
        .get(cli.oracle_index)
        .cloned()
        .ok_or_else(|| anyhow::anyhow!("--oracle-index {} is out of range for a {}-pair trace", cli.oracle_index, raw_a.len()))?;
    let oracle = StatusCodeOracle { oracle_pair, expected_status: cli.oracle_status };

    let output = tracesieve::run_pipeline(&cli.trace_a, &cli.trace_b, &config, &oracle).await?;
    std::fs::write(&cli.output, serde_json::to_string_pretty(&output)?)?;

    Ok(())
}
