//! Telemetry source.
//!
//! Loads the records the aggregator runs against. An override can come from
//! a JSON file or an environment variable; if it cannot be read or parsed the
//! built-in dataset is used instead and the failure is logged.

use crate::config::TelemetryConfig;
use crate::models::TelemetryRecord;
use anyhow::{Context, Result};
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Where the loaded records came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TelemetryOrigin {
    /// The built-in dataset, no override configured.
    Builtin,
    /// Parsed from the configured environment variable.
    Environment,
    /// Parsed from the configured file.
    File,
    /// An override was configured but failed; the built-in dataset is in use.
    Fallback,
}

impl fmt::Display for TelemetryOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TelemetryOrigin::Builtin => write!(f, "builtin"),
            TelemetryOrigin::Environment => write!(f, "environment"),
            TelemetryOrigin::File => write!(f, "file"),
            TelemetryOrigin::Fallback => write!(f, "fallback"),
        }
    }
}

/// Immutable set of telemetry records shared by all requests.
#[derive(Debug, Clone)]
pub struct TelemetrySource {
    records: Arc<[TelemetryRecord]>,
    origin: TelemetryOrigin,
}

impl TelemetrySource {
    /// Wrap an explicit record list.
    pub fn new(records: Vec<TelemetryRecord>, origin: TelemetryOrigin) -> Self {
        Self {
            records: records.into(),
            origin,
        }
    }

    /// The built-in dataset.
    pub fn builtin() -> Self {
        Self::new(builtin_records(), TelemetryOrigin::Builtin)
    }

    /// Load telemetry according to `config`, reading the process environment.
    ///
    /// Never fails: override errors fall back to the built-in dataset.
    pub fn load(config: &TelemetryConfig) -> Self {
        let env_value = std::env::var(&config.env_var).ok();
        Self::load_from(config.file.as_deref(), &config.env_var, env_value.as_deref())
    }

    /// Load telemetry from an optional file, then an optional environment value.
    pub fn load_from(file: Option<&Path>, env_var: &str, env_value: Option<&str>) -> Self {
        if let Some(path) = file {
            return match read_file(path) {
                Ok(records) => {
                    info!(
                        "Loaded {} telemetry records from {}",
                        records.len(),
                        path.display()
                    );
                    Self::new(records, TelemetryOrigin::File)
                }
                Err(e) => {
                    warn!(source = %path.display(), error = %e, "Telemetry override rejected, using built-in dataset");
                    Self::new(builtin_records(), TelemetryOrigin::Fallback)
                }
            };
        }

        match env_value.map(str::trim).filter(|v| !v.is_empty()) {
            Some(raw) => match parse_records(raw) {
                Ok(records) => {
                    info!("Loaded {} telemetry records from ${}", records.len(), env_var);
                    Self::new(records, TelemetryOrigin::Environment)
                }
                Err(e) => {
                    warn!(source = %env_var, error = %e, "Telemetry override rejected, using built-in dataset");
                    Self::new(builtin_records(), TelemetryOrigin::Fallback)
                }
            },
            None => {
                debug!("No telemetry override set, using built-in dataset");
                Self::builtin()
            }
        }
    }

    /// The loaded records.
    pub fn records(&self) -> &[TelemetryRecord] {
        &self.records
    }

    pub fn origin(&self) -> TelemetryOrigin {
        self.origin
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl Default for TelemetrySource {
    fn default() -> Self {
        Self::builtin()
    }
}

/// Parse a JSON array of telemetry records.
pub fn parse_records(raw: &str) -> Result<Vec<TelemetryRecord>> {
    serde_json::from_str(raw).context("Telemetry must be a JSON array of records")
}

fn read_file(path: &Path) -> Result<Vec<TelemetryRecord>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read telemetry file: {}", path.display()))?;
    parse_records(&content)
}

/// The built-in six-record dataset.
pub fn builtin_records() -> Vec<TelemetryRecord> {
    vec![
        TelemetryRecord::new("apac", 150.0, 0.98),
        TelemetryRecord::new("apac", 190.0, 0.96),
        TelemetryRecord::new("apac", 175.0, 0.97),
        TelemetryRecord::new("emea", 170.0, 0.99),
        TelemetryRecord::new("emea", 200.0, 0.95),
        TelemetryRecord::new("emea", 160.0, 0.97),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Reading;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const FIXTURE: &str = include_str!("../../fixtures/telemetry.json");

    #[test]
    fn test_builtin_dataset() {
        let source = TelemetrySource::builtin();
        assert_eq!(source.len(), 6);
        assert_eq!(source.origin(), TelemetryOrigin::Builtin);
        assert_eq!(
            source.records().iter().filter(|r| r.region == "apac").count(),
            3
        );
    }

    #[test]
    fn test_no_override_uses_builtin() {
        let source = TelemetrySource::load_from(None, "LATENCY_TELEMETRY_JSON", None);
        assert_eq!(source.origin(), TelemetryOrigin::Builtin);

        let blank = TelemetrySource::load_from(None, "LATENCY_TELEMETRY_JSON", Some("   "));
        assert_eq!(blank.origin(), TelemetryOrigin::Builtin);
    }

    #[test]
    fn test_env_override() {
        let source = TelemetrySource::load_from(None, "LATENCY_TELEMETRY_JSON", Some(FIXTURE));
        assert_eq!(source.origin(), TelemetryOrigin::Environment);
        assert_eq!(source.len(), 4);
        assert_eq!(source.records()[0].region, "US-East");
    }

    #[test]
    fn test_malformed_env_falls_back() {
        let source =
            TelemetrySource::load_from(None, "LATENCY_TELEMETRY_JSON", Some("[{not json"));
        assert_eq!(source.origin(), TelemetryOrigin::Fallback);
        assert_eq!(source.records(), builtin_records().as_slice());

        let not_array =
            TelemetrySource::load_from(None, "LATENCY_TELEMETRY_JSON", Some(r#"{"region":"apac"}"#));
        assert_eq!(not_array.origin(), TelemetryOrigin::Fallback);
    }

    #[test]
    fn test_non_numeric_fields_are_loaded_for_validation() {
        let raw = r#"[{"region":"apac","latency_ms":"slow","uptime":0.9}]"#;
        let source = TelemetrySource::load_from(None, "LATENCY_TELEMETRY_JSON", Some(raw));
        assert_eq!(source.origin(), TelemetryOrigin::Environment);
        assert!(matches!(source.records()[0].latency_ms, Reading::Invalid(_)));
    }

    #[test]
    fn test_file_override_takes_precedence() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(FIXTURE.as_bytes()).unwrap();

        let source = TelemetrySource::load_from(
            Some(file.path()),
            "LATENCY_TELEMETRY_JSON",
            Some("[]"),
        );
        assert_eq!(source.origin(), TelemetryOrigin::File);
        assert_eq!(source.len(), 4);
    }

    #[test]
    fn test_missing_file_falls_back() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.json");
        let source = TelemetrySource::load_from(Some(&missing), "LATENCY_TELEMETRY_JSON", None);
        assert_eq!(source.origin(), TelemetryOrigin::Fallback);
        assert_eq!(source.len(), 6);
    }
}
