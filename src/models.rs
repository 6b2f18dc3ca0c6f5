//! Data models for the latency checker.
//!
//! This module contains the telemetry records fed into the aggregator,
//! the request shape accepted over HTTP, and the statistics returned.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Threshold applied when a request does not carry one.
pub const DEFAULT_THRESHOLD_MS: f64 = 180.0;

/// A numeric telemetry reading as it arrived on the wire.
///
/// Anything other than a JSON number is kept verbatim so the aggregator can
/// report exactly which record was malformed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Reading {
    /// A JSON number.
    Number(f64),
    /// Any other JSON value (string, bool, null, object, array).
    Invalid(serde_json::Value),
}

impl Reading {
    /// Returns the reading as `f64` if it was a number.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Reading::Number(n) => Some(*n),
            Reading::Invalid(_) => None,
        }
    }
}

impl From<f64> for Reading {
    fn from(value: f64) -> Self {
        Reading::Number(value)
    }
}

/// A single latency/uptime sample for one region.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelemetryRecord {
    /// Region key, matched case-insensitively.
    pub region: String,
    /// Observed latency in milliseconds.
    pub latency_ms: Reading,
    /// Observed uptime ratio in `[0, 1]`.
    pub uptime: Reading,
}

impl TelemetryRecord {
    /// Creates a well-formed record.
    pub fn new(region: impl Into<String>, latency_ms: f64, uptime: f64) -> Self {
        Self {
            region: region.into(),
            latency_ms: Reading::Number(latency_ms),
            uptime: Reading::Number(uptime),
        }
    }
}

/// Numeric field of a telemetry record, used when reporting validation errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordField {
    LatencyMs,
    Uptime,
}

impl RecordField {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordField::LatencyMs => "latency_ms",
            RecordField::Uptime => "uptime",
        }
    }
}

impl fmt::Display for RecordField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Body of `POST /api/latency-check`.
///
/// `threshold_ms` is kept as raw JSON so a non-numeric value can be reported
/// as a validation error instead of a generic parse failure.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LatencyCheckRequest {
    /// Regions to aggregate.
    #[serde(default)]
    pub regions: Vec<String>,
    /// Latency threshold in milliseconds.
    #[serde(default)]
    pub threshold_ms: Option<serde_json::Value>,
}

/// Resolved aggregation request.
#[derive(Debug, Clone, PartialEq)]
pub struct AggregationRequest {
    /// Requested regions, as supplied by the caller.
    pub regions: Vec<String>,
    /// Breach threshold in milliseconds.
    pub threshold_ms: f64,
}

impl AggregationRequest {
    /// Creates a request with the default threshold.
    pub fn new(regions: Vec<String>) -> Self {
        Self {
            regions,
            threshold_ms: DEFAULT_THRESHOLD_MS,
        }
    }

    /// Overrides the breach threshold.
    pub fn with_threshold(mut self, threshold_ms: f64) -> Self {
        self.threshold_ms = threshold_ms;
        self
    }
}

/// Summary statistics for one region.
///
/// The averages and percentile are `None` (serialized as `null`) when the
/// region has no records, so "no data" is never confused with zero latency.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RegionStats {
    /// Mean latency in milliseconds.
    pub avg_latency: Option<f64>,
    /// Nearest-rank 95th percentile latency in milliseconds.
    pub p95_latency: Option<f64>,
    /// Mean uptime ratio.
    pub avg_uptime: Option<f64>,
    /// Number of samples strictly above the threshold.
    pub breaches: usize,
    /// Number of samples for the region.
    pub count: usize,
}

impl RegionStats {
    /// Stats for a region with no samples.
    pub fn empty() -> Self {
        Self::default()
    }
}

/// Response of `POST /api/latency-check`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LatencyReport {
    /// Stats keyed by normalized (lowercase) region.
    pub regions: BTreeMap<String, RegionStats>,
    /// Threshold the breaches were counted against.
    pub threshold_ms: f64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_reading_accepts_numbers() {
        let record: TelemetryRecord =
            serde_json::from_value(json!({"region": "apac", "latency_ms": 150, "uptime": 0.98}))
                .unwrap();
        assert_eq!(record.latency_ms.as_f64(), Some(150.0));
        assert_eq!(record.uptime.as_f64(), Some(0.98));
    }

    #[test]
    fn test_reading_keeps_invalid_values() {
        let record: TelemetryRecord =
            serde_json::from_value(json!({"region": "apac", "latency_ms": "fast", "uptime": null}))
                .unwrap();
        assert_eq!(record.latency_ms, Reading::Invalid(json!("fast")));
        assert_eq!(record.uptime.as_f64(), None);
    }

    #[test]
    fn test_empty_stats_serialize_as_null() {
        let value = serde_json::to_value(RegionStats::empty()).unwrap();
        assert_eq!(
            value,
            json!({
                "avg_latency": null,
                "p95_latency": null,
                "avg_uptime": null,
                "breaches": 0,
                "count": 0
            })
        );
    }

    #[test]
    fn test_request_defaults() {
        let request: LatencyCheckRequest = serde_json::from_str("{}").unwrap();
        assert!(request.regions.is_empty());
        assert!(request.threshold_ms.is_none());

        let resolved = AggregationRequest::new(vec!["apac".to_string()]);
        assert_eq!(resolved.threshold_ms, DEFAULT_THRESHOLD_MS);
        assert_eq!(resolved.with_threshold(177.0).threshold_ms, 177.0);
    }
}
