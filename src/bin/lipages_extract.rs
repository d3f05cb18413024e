//! lipages-extract: run one extraction described by a JSON configuration
//!
//! Usage:
//!   # Config at ./data/config.json, state in ./data/in, output in ./data/out
//!   lipages-extract
//!
//!   # Explicit data directory and token override
//!   lipages-extract --data-dir /data --access-token "$TOKEN"
//!
//! Exit codes: 1 for problems the user can fix (bad dates, expired token,
//! missing permissions), 2 for everything else.

use anyhow::{Context, Result};
use chrono::Utc;
use clap::Parser;
use lipages::{Config, CsvTableWriter, Extractor, LinkedInClient, RunState};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "lipages-extract")]
#[command(about = "Extract organization analytics into CSV tables", long_about = None)]
struct Args {
    /// Data directory holding config.json, in/state.json and out/
    #[arg(long, default_value = "./data")]
    data_dir: PathBuf,

    /// Configuration file (default: <DATA_DIR>/config.json)
    #[arg(long, short = 'c', value_name = "FILE")]
    config: Option<PathBuf>,

    /// Bearer token overriding the one in the configuration
    #[arg(long)]
    access_token: Option<String>,
}

fn main() -> ExitCode {
    let args = Args::parse();

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            init_tracing(false);
            let user_facing = err
                .downcast_ref::<lipages::Error>()
                .is_some_and(lipages::Error::is_user_facing);
            if user_facing {
                error!("{err}");
                ExitCode::from(1)
            } else {
                error!("{err:#}");
                ExitCode::from(2)
            }
        }
    }
}

fn run(args: Args) -> Result<()> {
    let config_path = args
        .config
        .unwrap_or_else(|| args.data_dir.join("config.json"));
    let mut config = Config::from_path(&config_path)
        .with_context(|| format!("Failed to load configuration from {}", config_path.display()))?;
    init_tracing(config.parameters.debug);

    if let Some(token) = args.access_token {
        config.authorization.access_token = Some(token);
    }
    let client = LinkedInClient::new(config.access_token()?);

    let state = RunState::load(args.data_dir.join("in").join("state.json"))?;
    let last_run = state.last_run()?;
    if let Some(last_run) = last_run {
        info!(%last_run, "previous run watermark loaded");
    }

    let out_dir = args.data_dir.join("out");
    let mut sink = CsvTableWriter::new(out_dir.join("tables"))?;
    let run = Extractor::new(&client, &config.parameters).run(&mut sink, last_run, Utc::now())?;

    RunState::with_watermark(run.watermark).save(out_dir.join("state.json"))?;
    info!(
        tables = ?run.tables_persisted,
        watermark = %run.watermark,
        "run complete"
    );
    Ok(())
}

/// RUST_LOG wins; otherwise `info`, or `debug` when the configuration asks for it.
/// Later calls are no-ops.
fn init_tracing(debug: bool) {
    let default_level = if debug { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}
