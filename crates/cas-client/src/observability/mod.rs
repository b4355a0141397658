//! Observability for the CAS client.
//!
//! Metrics go through the `metrics` facade; the embedding application
//! installs whichever recorder/exporter it uses.
//!
//! # Privacy by Default
//!
//! Tickets, PGTs and PGT-IOUs are never logged or used as labels. Spans use
//! `#[instrument(skip_all)]` and allow-list safe fields (service URL,
//! protocol). Labels are bounded enums.
//!
//! # Metrics
//!
//! | Metric | Type | Labels | Purpose |
//! |--------|------|--------|---------|
//! | `cas_validations_total` | Counter | `outcome` | Validation results |
//! | `cas_validation_duration_seconds` | Histogram | `outcome` | Round-trip latency |
//! | `cas_pgt_resolutions_total` | Counter | `result` | PGT-IOU lookups |
//! | `cas_pgt_entries_swept_total` | Counter | none | Expired correlations removed |
//! | `cas_proxy_ticket_requests_total` | Counter | `outcome` | Proxy ticket requests |

pub mod metrics;

pub use metrics::{
    record_pgt_resolution, record_pgt_swept, record_proxy_ticket_request, record_validation,
};
