//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap,
//! including validation and default values.

use clap::Parser;
use std::path::PathBuf;

/// latency-check - per-region latency and uptime summaries over HTTP
///
/// Serves `POST /api/latency-check`, which returns mean latency, p95 latency,
/// mean uptime and threshold breaches for the requested regions.
///
/// Examples:
///   latency-check
///   latency-check --port 9000 --threshold 150
///   latency-check --telemetry-file samples.json
///   latency-check --regions apac,emea --threshold 177
///   latency-check --init-config
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    /// Address to bind the HTTP server to
    ///
    /// Default: from config or 0.0.0.0.
    #[arg(long, value_name = "HOST", env = "LATENCY_CHECK_HOST")]
    pub host: Option<String>,

    /// Port to bind the HTTP server to
    ///
    /// Default: from config or 8000.
    #[arg(short, long, value_name = "PORT", env = "LATENCY_CHECK_PORT")]
    pub port: Option<u16>,

    /// Path to configuration file
    ///
    /// If not specified, looks for .latency-check.toml in the current directory
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Default breach threshold in milliseconds
    ///
    /// Applied when a request omits threshold_ms. Default: from config or 180.
    #[arg(short, long, value_name = "MS")]
    pub threshold: Option<f64>,

    /// JSON file with telemetry records to serve instead of the built-in set
    #[arg(long, value_name = "FILE")]
    pub telemetry_file: Option<PathBuf>,

    /// Environment variable holding a JSON array of telemetry records
    #[arg(long, value_name = "VAR")]
    pub telemetry_env: Option<String>,

    /// Aggregate these regions once, print JSON and exit (comma-separated)
    ///
    /// Example: --regions apac,emea
    #[arg(short, long, value_name = "REGIONS", value_delimiter = ',')]
    pub regions: Option<Vec<String>>,

    /// Enable verbose logging output
    #[arg(short, long)]
    pub verbose: bool,

    /// Run in quiet mode (errors only)
    #[arg(short, long)]
    pub quiet: bool,

    /// Generate a default .latency-check.toml configuration file
    #[arg(long)]
    pub init_config: bool,
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate the parsed arguments.
    pub fn validate(&self) -> Result<(), String> {
        // Skip validation for --init-config
        if self.init_config {
            return Ok(());
        }

        if self.port == Some(0) {
            return Err("Port must be between 1 and 65535".to_string());
        }

        if let Some(threshold) = self.threshold {
            if !threshold.is_finite() {
                return Err("Threshold must be a finite number".to_string());
            }
        }

        // Check for conflicting options
        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        if let Some(ref path) = self.telemetry_file {
            if !path.is_file() {
                return Err(format!("Telemetry file does not exist: {}", path.display()));
            }
        }

        if let Some(ref env_var) = self.telemetry_env {
            if env_var.trim().is_empty() {
                return Err("Telemetry environment variable name cannot be empty".to_string());
            }
        }

        Ok(())
    }

    /// Returns the log level based on verbosity settings.
    pub fn log_level(&self) -> tracing::Level {
        if self.quiet {
            tracing::Level::ERROR
        } else if self.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_args() -> Args {
        Args {
            host: None,
            port: None,
            config: None,
            threshold: None,
            telemetry_file: None,
            telemetry_env: None,
            regions: None,
            verbose: false,
            quiet: false,
            init_config: false,
        }
    }

    #[test]
    fn test_parse_regions() {
        let args =
            Args::try_parse_from(["latency-check", "--regions", "apac,EMEA", "-t", "177"]).unwrap();
        assert_eq!(
            args.regions,
            Some(vec!["apac".to_string(), "EMEA".to_string()])
        );
        assert_eq!(args.threshold, Some(177.0));
    }

    #[test]
    fn test_validation_defaults_ok() {
        assert!(make_args().validate().is_ok());
    }

    #[test]
    fn test_validation_zero_port() {
        let mut args = make_args();
        args.port = Some(0);
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_validation_non_finite_threshold() {
        let mut args = make_args();
        args.threshold = Some(f64::INFINITY);
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_validation_missing_telemetry_file() {
        let mut args = make_args();
        args.telemetry_file = Some(PathBuf::from("/nonexistent/telemetry.json"));
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_validation_conflicting_options() {
        let mut args = make_args();
        args.verbose = true;
        args.quiet = true;
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_log_level() {
        let mut args = make_args();
        assert_eq!(args.log_level(), tracing::Level::INFO);

        args.verbose = true;
        assert_eq!(args.log_level(), tracing::Level::DEBUG);

        args.verbose = false;
        args.quiet = true;
        assert_eq!(args.log_level(), tracing::Level::ERROR);
    }
}
