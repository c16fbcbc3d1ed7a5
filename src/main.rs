//! Relay binary: one run per invocation, meant to be called by an external
//! scheduler (cron, CI schedule). The exit code tells the scheduler what
//! happened; see `RunOutcome::exit_code` and `RelayError::exit_code`.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use feed_thread_relay::{build_relay, RelayConfig};

#[derive(Debug, Parser)]
#[command(version, about = "Post one new feed item as an X thread")]
struct Cli {
    /// TOML config file (default: $RELAY_CONFIG_PATH, then config/relay.toml).
    #[arg(long)]
    config: Option<PathBuf>,

    /// Generate the thread and log it, without posting or marking processed.
    #[arg(long)]
    dry_run: bool,

    /// Run date stamp (YYYY-MM-DD); defaults to today's local date.
    #[arg(long, value_parser = parse_date)]
    date: Option<chrono::NaiveDate>,
}

fn parse_date(s: &str) -> Result<chrono::NaiveDate, String> {
    chrono::NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|e| format!("{s}: {e}"))
}

/// Compact logs by default; `RELAY_LOG_FORMAT=json` switches to JSON lines.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("feed_thread_relay=info,warn"));
    let json = std::env::var("RELAY_LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(fmt::layer().json()).init();
    } else {
        registry.with(fmt::layer().compact()).init();
    }
}

fn load_config(cli: &Cli) -> anyhow::Result<RelayConfig> {
    let cfg = match &cli.config {
        Some(p) => RelayConfig::load_from_file(p),
        None => RelayConfig::load_default(),
    };
    cfg.context("loading relay config")
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    // Load .env in local runs; no-op when the scheduler injects secrets.
    let _ = dotenvy::dotenv();
    init_tracing();

    let cli = Cli::parse();
    let config = match load_config(&cli) {
        Ok(c) => c,
        Err(e) => {
            tracing::error!(error = %format!("{e:#}"), "cannot start");
            return ExitCode::from(2);
        }
    };
    let relay = match build_relay(&config) {
        Ok(r) => r.with_dry_run(cli.dry_run),
        Err(e) => {
            tracing::error!(error = %format!("{e:#}"), "cannot build relay");
            return ExitCode::from(2);
        }
    };

    let date = cli
        .date
        .unwrap_or_else(|| chrono::Local::now().date_naive())
        .format("%Y-%m-%d")
        .to_string();

    tracing::info!(%date, dry_run = cli.dry_run, "relay run started");
    match relay.run_once(&date).await {
        Ok(outcome) => {
            tracing::info!(?outcome, "relay run finished");
            ExitCode::from(outcome.exit_code())
        }
        Err(e) => {
            tracing::error!(error = %e, "relay run aborted");
            ExitCode::from(e.exit_code())
        }
    }
}
