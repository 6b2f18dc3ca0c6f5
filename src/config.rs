//! Configuration file handling.
//!
//! This module handles loading and merging configuration from
//! `.latency-check.toml` files.

use crate::models::DEFAULT_THRESHOLD_MS;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Name of the config file looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = ".latency-check.toml";

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// General settings.
    #[serde(default)]
    pub general: GeneralConfig,

    /// HTTP server settings.
    #[serde(default)]
    pub server: ServerConfig,

    /// Aggregation settings.
    #[serde(default)]
    pub aggregation: AggregationConfig,

    /// Telemetry source settings.
    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

/// General application settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Enable verbose logging by default.
    #[serde(default)]
    pub verbose: bool,
}

/// HTTP server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Address to bind.
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to bind.
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8000
}

impl ServerConfig {
    /// `host:port` string suitable for binding.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Aggregation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AggregationConfig {
    /// Threshold used when a request omits `threshold_ms`.
    #[serde(default = "default_threshold")]
    pub default_threshold_ms: f64,
}

impl Default for AggregationConfig {
    fn default() -> Self {
        Self {
            default_threshold_ms: default_threshold(),
        }
    }
}

fn default_threshold() -> f64 {
    DEFAULT_THRESHOLD_MS
}

/// Telemetry source settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelemetryConfig {
    /// Environment variable holding a JSON array of records.
    #[serde(default = "default_env_var")]
    pub env_var: String,

    /// File holding a JSON array of records. Takes precedence over `env_var`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<PathBuf>,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            env_var: default_env_var(),
            file: None,
        }
    }
}

fn default_env_var() -> String {
    "LATENCY_TELEMETRY_JSON".to_string()
}

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Try to load `.latency-check.toml` from a directory.
    ///
    /// Returns `Ok(None)` if the file doesn't exist, `Err` if it exists but can't be parsed.
    pub fn load_from_dir(dir: &Path) -> Result<Option<Self>> {
        let config_path = dir.join(DEFAULT_CONFIG_FILE);

        if config_path.exists() {
            Ok(Some(Self::load(&config_path)?))
        } else {
            Ok(None)
        }
    }

    /// Merge this configuration with CLI arguments.
    ///
    /// CLI arguments take precedence over config file settings.
    /// This method only overrides config when CLI provides explicit values.
    pub fn merge_with_args(&mut self, args: &crate::cli::Args) {
        if let Some(ref host) = args.host {
            self.server.host = host.clone();
        }
        if let Some(port) = args.port {
            self.server.port = port;
        }

        if let Some(threshold) = args.threshold {
            self.aggregation.default_threshold_ms = threshold;
        }

        if let Some(ref file) = args.telemetry_file {
            self.telemetry.file = Some(file.clone());
        }
        if let Some(ref env_var) = args.telemetry_env {
            self.telemetry.env_var = env_var.clone();
        }

        // Flags always override
        if args.verbose {
            self.general.verbose = true;
        }
    }

    /// Generate a default configuration file content.
    pub fn default_toml() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_else(|_| String::new())
    }
}
