//! Per-region latency aggregation.
//!
//! Groups telemetry by region and computes mean latency, nearest-rank p95
//! latency, mean uptime and the number of threshold breaches.

use crate::error::ValidationError;
use crate::models::{
    AggregationRequest, LatencyReport, Reading, RecordField, RegionStats, TelemetryRecord,
};
use std::collections::{BTreeMap, BTreeSet};

/// Percentile reported as `p95_latency`.
const P95: f64 = 0.95;

/// A record that passed validation.
#[derive(Debug, Clone, Copy)]
struct Sample {
    latency_ms: f64,
    uptime: f64,
}

/// Normalize a region key for matching: trimmed and lowercased.
pub fn normalize_region(region: &str) -> String {
    region.trim().to_lowercase()
}

/// Normalize and deduplicate requested regions, dropping blank entries.
pub fn normalize_regions<S: AsRef<str>>(regions: &[S]) -> BTreeSet<String> {
    regions
        .iter()
        .map(|r| normalize_region(r.as_ref()))
        .filter(|r| !r.is_empty())
        .collect()
}

/// Resolve the request threshold from raw JSON.
///
/// Absent or `null` falls back to `default`.
pub fn resolve_threshold(
    raw: Option<&serde_json::Value>,
    default: f64,
) -> Result<f64, ValidationError> {
    let threshold = match raw {
        None | Some(serde_json::Value::Null) => default,
        Some(value) => value
            .as_f64()
            .ok_or(ValidationError::NonNumericThreshold)?,
    };

    if !threshold.is_finite() {
        return Err(ValidationError::InvalidThreshold);
    }

    Ok(threshold)
}

/// Aggregate telemetry for every requested region.
///
/// Each distinct (case-insensitive) region gets exactly one entry, including
/// regions with no records.
pub fn aggregate(
    telemetry: &[TelemetryRecord],
    request: &AggregationRequest,
) -> Result<LatencyReport, ValidationError> {
    if !request.threshold_ms.is_finite() {
        return Err(ValidationError::InvalidThreshold);
    }

    let mut regions = BTreeMap::new();

    for region in normalize_regions(request.regions.as_slice()) {
        let samples = samples_for_region(telemetry, &region)?;
        let stats = compute_stats(&samples, request.threshold_ms);
        regions.insert(region, stats);
    }

    Ok(LatencyReport {
        regions,
        threshold_ms: request.threshold_ms,
    })
}

/// Collect and validate the records belonging to `region`.
fn samples_for_region(
    telemetry: &[TelemetryRecord],
    region: &str,
) -> Result<Vec<Sample>, ValidationError> {
    telemetry
        .iter()
        .enumerate()
        .filter(|(_, record)| normalize_region(&record.region) == region)
        .map(|(index, record)| validate_record(index, record))
        .collect()
}

fn validate_record(index: usize, record: &TelemetryRecord) -> Result<Sample, ValidationError> {
    let latency_ms = numeric(index, RecordField::LatencyMs, &record.latency_ms)?;
    if latency_ms < 0.0 {
        return Err(ValidationError::OutOfRange {
            index,
            field: RecordField::LatencyMs,
            value: latency_ms,
        });
    }

    let uptime = numeric(index, RecordField::Uptime, &record.uptime)?;
    if !(0.0..=1.0).contains(&uptime) {
        return Err(ValidationError::OutOfRange {
            index,
            field: RecordField::Uptime,
            value: uptime,
        });
    }

    Ok(Sample { latency_ms, uptime })
}

fn numeric(index: usize, field: RecordField, reading: &Reading) -> Result<f64, ValidationError> {
    match reading.as_f64() {
        Some(value) if value.is_finite() => Ok(value),
        Some(value) => Err(ValidationError::OutOfRange {
            index,
            field,
            value,
        }),
        None => Err(ValidationError::NonNumeric { index, field }),
    }
}

fn compute_stats(samples: &[Sample], threshold_ms: f64) -> RegionStats {
    if samples.is_empty() {
        return RegionStats::empty();
    }

    let mut latencies: Vec<f64> = samples.iter().map(|s| s.latency_ms).collect();
    let uptimes: Vec<f64> = samples.iter().map(|s| s.uptime).collect();
    let breaches = latencies.iter().filter(|&&l| l > threshold_ms).count();

    let avg_latency = mean(&latencies);
    let avg_uptime = mean(&uptimes);

    latencies.sort_by(f64::total_cmp);
    let p95_latency = nearest_rank(&latencies, P95);

    RegionStats {
        avg_latency,
        p95_latency,
        avg_uptime,
        breaches,
        count: samples.len(),
    }
}

/// Arithmetic mean, `None` for an empty slice.
///
/// Accumulated incrementally so finite inputs near `f64::MAX` stay finite.
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut avg = 0.0;
    for (k, &x) in values.iter().enumerate() {
        avg += (x - avg) / (k + 1) as f64;
    }
    Some(avg)
}

/// Nearest-rank percentile over ascending `sorted` values.
///
/// Picks index `max(1, ceil(p * n)) - 1`, so a single value is its own
/// percentile.
pub fn nearest_rank(sorted: &[f64], percentile: f64) -> Option<f64> {
    if sorted.is_empty() {
        return None;
    }
    let n = sorted.len();
    let rank = ((percentile * n as f64).ceil() as usize).clamp(1, n);
    sorted.get(rank - 1).copied()
}
