//! latency-check - per-region latency/uptime aggregation service
//!
//! Serves `POST /api/latency-check`, returning mean latency, nearest-rank
//! p95 latency, mean uptime and threshold breaches per requested region.
//!
//! Exit codes:
//!   0 - Success
//!   1 - Runtime error (bind failure, bad config, validation failure in one-shot mode)

mod analysis;
mod cli;
mod config;
mod error;
mod models;
mod server;
mod telemetry;

use anyhow::{Context, Result};
use cli::Args;
use config::{Config, DEFAULT_CONFIG_FILE};
use models::AggregationRequest;
use server::AppState;
use std::path::Path;
use telemetry::TelemetrySource;
use tracing::{debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse_args();

    // Validate arguments
    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    // Handle --init-config early (no logging needed)
    if args.init_config {
        return handle_init_config();
    }

    let (config, config_error) = match load_config(&args, Path::new(".")) {
        Ok((mut config, config_error)) => {
            config.merge_with_args(&args);
            (config, config_error)
        }
        Err(e) => {
            eprintln!("Error: {:#}", e);
            std::process::exit(1);
        }
    };

    init_logging(&args, &config);

    info!("latency-check v{}", env!("CARGO_PKG_VERSION"));
    debug!("Arguments: {:?}", args);

    if let Some(e) = config_error {
        warn!("Failed to load config, using defaults: {:#}", e);
    }

    if let Err(e) = run(args, config).await {
        error!("latency-check failed: {:#}", e);
        eprintln!("\n❌ Error: {:#}", e);
        std::process::exit(1);
    }

    Ok(())
}

/// Handle --init-config: generate a default .latency-check.toml.
fn handle_init_config() -> Result<()> {
    let path = Path::new(DEFAULT_CONFIG_FILE);

    if path.exists() {
        eprintln!(
            "⚠️  {} already exists. Remove it first or edit it manually.",
            DEFAULT_CONFIG_FILE
        );
        std::process::exit(1);
    }

    let content = Config::default_toml();
    std::fs::write(path, &content)
        .with_context(|| format!("Failed to write {}", DEFAULT_CONFIG_FILE))?;

    println!("✅ Created {} with default settings.", DEFAULT_CONFIG_FILE);
    println!("   Edit it to customize the bind address, threshold and telemetry source.");
    Ok(())
}

/// Initialize logging based on verbosity settings.
fn init_logging(args: &Args, config: &Config) {
    let level = if config.general.verbose && !args.quiet {
        tracing::Level::DEBUG
    } else {
        args.log_level()
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .finish();

    tracing::subscriber::set_global_default(subscriber).expect("Failed to set tracing subscriber");
}

/// Load telemetry, then either serve or run a one-shot aggregation.
async fn run(args: Args, config: Config) -> Result<()> {
    let telemetry = TelemetrySource::load(&config.telemetry);
    info!(
        "Telemetry: {} records ({})",
        telemetry.len(),
        telemetry.origin()
    );
    if telemetry.is_empty() {
        warn!("Telemetry source is empty; every region will report no data");
    }

    if let Some(regions) = args.regions {
        return run_one_shot(&telemetry, regions, config.aggregation.default_threshold_ms);
    }

    let state = AppState::new(telemetry, config.aggregation.default_threshold_ms);
    server::run_server(state, &config.server.bind_addr()).await
}

/// Handle --regions: aggregate once and print the report as JSON.
fn run_one_shot(telemetry: &TelemetrySource, regions: Vec<String>, threshold_ms: f64) -> Result<()> {
    let request = AggregationRequest::new(regions).with_threshold(threshold_ms);
    let report = analysis::aggregate(telemetry.records(), &request)?;

    let output = serde_json::to_string_pretty(&report).context("Failed to serialize report")?;
    println!("{}", output);
    Ok(())
}

/// Load configuration from file or use defaults.
///
/// An unreadable default config in `dir` is not fatal: defaults are returned
/// along with the error so it can be logged once tracing is up.
fn load_config(args: &Args, dir: &Path) -> Result<(Config, Option<anyhow::Error>)> {
    // Try explicit config path
    if let Some(ref config_path) = args.config {
        return Ok((Config::load(config_path)?, None));
    }

    // Try default location
    match Config::load_from_dir(dir) {
        Ok(Some(config)) => Ok((config, None)),
        Ok(None) => Ok((Config::default(), None)),
        Err(e) => Ok((Config::default(), Some(e))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    fn no_args() -> Args {
        Args::try_parse_from(["latency-check"]).unwrap()
    }

    #[test]
    fn test_load_config_missing_default() {
        let dir = tempfile::tempdir().unwrap();
        let (config, config_error) = load_config(&no_args(), dir.path()).unwrap();
        assert_eq!(config.server.port, 8000);
        assert!(config_error.is_none());
    }

    #[test]
    fn test_load_config_broken_default_is_deferred() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(DEFAULT_CONFIG_FILE), "[server\n").unwrap();

        let (config, config_error) = load_config(&no_args(), dir.path()).unwrap();
        assert_eq!(config.server.port, 8000);
        let err = config_error.expect("parse failure should be reported");
        assert!(format!("{:#}", err).contains("Failed to parse config file"));
    }

    #[test]
    fn test_load_config_broken_explicit_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("custom.toml");
        std::fs::write(&path, "[server\n").unwrap();

        let args = Args::try_parse_from(["latency-check", "--config", path.to_str().unwrap()])
            .unwrap();
        assert!(load_config(&args, dir.path()).is_err());
    }
}
