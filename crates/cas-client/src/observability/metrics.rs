//! Metrics definitions for the CAS client.
//!
//! All metrics follow Prometheus naming conventions:
//! - `cas_` prefix
//! - `_total` suffix for counters
//! - `_seconds` suffix for duration histograms
//!
//! # Cardinality
//!
//! Label values are `&'static str` from fixed sets:
//! - `outcome`: success, rejected, invalid_response, transport_error
//! - `result`: hit, miss, error, no_storage

use metrics::{counter, histogram};
use std::time::Duration;

// ============================================================================
// Validation Metrics
// ============================================================================

/// Record one ticket validation round-trip.
///
/// Metrics: `cas_validations_total`, `cas_validation_duration_seconds`
/// Labels: `outcome`
pub fn record_validation(outcome: &'static str, duration: Duration) {
    counter!("cas_validations_total", "outcome" => outcome).increment(1);
    histogram!("cas_validation_duration_seconds", "outcome" => outcome)
        .record(duration.as_secs_f64());
}

// ============================================================================
// PGT Metrics
// ============================================================================

/// Record the result of resolving a PGT-IOU during validation.
///
/// Metric: `cas_pgt_resolutions_total`
/// Labels: `result`
///
/// A steady stream of `miss` usually means the callback endpoint is not
/// reachable from the CAS server, or callbacks land on another instance
/// without shared storage.
pub fn record_pgt_resolution(result: &'static str) {
    counter!("cas_pgt_resolutions_total", "result" => result).increment(1);
}

/// Record the number of expired correlations removed by one sweep.
///
/// Metric: `cas_pgt_entries_swept_total`
pub fn record_pgt_swept(count: usize) {
    counter!("cas_pgt_entries_swept_total").increment(u64::try_from(count).unwrap_or(u64::MAX));
}

/// Record one proxy ticket request.
///
/// Metric: `cas_proxy_ticket_requests_total`
/// Labels: `outcome`
pub fn record_proxy_ticket_request(outcome: &'static str) {
    counter!("cas_proxy_ticket_requests_total", "outcome" => outcome).increment(1);
}
