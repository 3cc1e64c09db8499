//! Sink metrics.
//!
//! [`MetricsSink`] is the only state shared between concurrent attempts, so
//! implementations must tolerate calls from many completion tasks at once.
//! [`SinkMetrics`] keeps monotonic atomic counters.

#[cfg(feature = "metrics")]
pub mod prometheus;

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;
use tracing::{debug, info};
use tsw_common::RequestShape;

#[cfg(feature = "metrics")]
pub use self::prometheus::PrometheusMetrics;

/// Exception names that get their own counter; everything else is `unknown`.
///
/// Service faults first, then the wrapper and transport errors that
/// `WriteError::name` reports.
pub const KNOWN_EXCEPTIONS: [&str; 20] = [
    "access_denied",
    "conflict",
    "internal_server",
    "invalid_endpoint",
    "rejected_records",
    "resource_not_found",
    "service_quota_exceeded",
    "throttling",
    "validation",
    "client",
    "endpoint_discovery",
    "completion",
    "io",
    "http",
    "api_call_timeout",
    "api_call_attempt_timeout",
    "interrupted",
    "socket_timeout",
    "socket",
    "timeout",
];

pub const UNKNOWN_EXCEPTION: &str = "unknown";

/// Map an exception name onto the bounded label set.
pub fn exception_label(name: &str) -> &'static str {
    KNOWN_EXCEPTIONS
        .iter()
        .copied()
        .find(|known| *known == name)
        .unwrap_or(UNKNOWN_EXCEPTION)
}

pub trait MetricsSink: Send + Sync {
    /// Shape of the request about to be sent.
    fn pre_write(&self, shape: RequestShape);

    /// A request was written in full.
    fn write_succeeded(&self, records: usize);

    /// A failure was observed, whatever its eventual disposition.
    fn exception(&self, name: &str);

    /// Entries handed back for resubmission by this sink (on top of any
    /// retries the wire client already performed).
    fn retried(&self, entries: usize);

    /// Entries dropped out of a request of `request_records` records.
    ///
    /// The records that were not dropped count as written.
    fn dropped(&self, dropped: usize, request_records: usize);
}

/// Metrics sink that discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopMetrics;

impl MetricsSink for NoopMetrics {
    fn pre_write(&self, _shape: RequestShape) {}
    fn write_succeeded(&self, _records: usize) {}
    fn exception(&self, _name: &str) {}
    fn retried(&self, _entries: usize) {}
    fn dropped(&self, _dropped: usize, _request_records: usize) {}
}

/// In-process counters.
#[derive(Debug, Default)]
pub struct SinkMetrics {
    records_success: AtomicU64,
    writes_success: AtomicU64,
    records_dropped: AtomicU64,
    writes_retried: AtomicU64,
    exceptions: [AtomicU64; KNOWN_EXCEPTIONS.len() + 1],
    records_per_request: AtomicU64,
    measures_per_request: AtomicU64,
    common_dimensions_per_request: AtomicU64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub records_success: u64,
    pub writes_success: u64,
    pub records_dropped: u64,
    pub writes_retried: u64,
    /// Non-zero exception counters by label.
    pub exceptions: Vec<(String, u64)>,
    pub records_per_request: u64,
    pub measures_per_request: u64,
    pub common_dimensions_per_request: u64,
}

impl MetricsSnapshot {
    pub fn exception_count(&self, label: &str) -> u64 {
        self.exceptions
            .iter()
            .find(|(name, _)| name == label)
            .map_or(0, |(_, count)| *count)
    }

    pub fn total_exceptions(&self) -> u64 {
        self.exceptions.iter().map(|(_, count)| count).sum()
    }
}

impl SinkMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    fn exception_slot(name: &str) -> usize {
        KNOWN_EXCEPTIONS
            .iter()
            .position(|known| *known == name)
            .unwrap_or(KNOWN_EXCEPTIONS.len())
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        let labels = KNOWN_EXCEPTIONS.iter().copied().chain([UNKNOWN_EXCEPTION]);
        let exceptions = labels
            .zip(self.exceptions.iter())
            .map(|(label, counter)| (label.to_string(), counter.load(Ordering::Relaxed)))
            .filter(|(_, count)| *count > 0)
            .collect();
        MetricsSnapshot {
            records_success: self.records_success.load(Ordering::Relaxed),
            writes_success: self.writes_success.load(Ordering::Relaxed),
            records_dropped: self.records_dropped.load(Ordering::Relaxed),
            writes_retried: self.writes_retried.load(Ordering::Relaxed),
            exceptions,
            records_per_request: self.records_per_request.load(Ordering::Relaxed),
            measures_per_request: self.measures_per_request.load(Ordering::Relaxed),
            common_dimensions_per_request: self
                .common_dimensions_per_request
                .load(Ordering::Relaxed),
        }
    }
}

impl MetricsSink for SinkMetrics {
    fn pre_write(&self, shape: RequestShape) {
        self.records_per_request
            .store(shape.records as u64, Ordering::Relaxed);
        self.measures_per_request
            .store(shape.measures as u64, Ordering::Relaxed);
        self.common_dimensions_per_request
            .store(shape.common_attribute_dimensions as u64, Ordering::Relaxed);
    }

    fn write_succeeded(&self, records: usize) {
        debug!(records, "ingested successfully");
        self.writes_success.fetch_add(1, Ordering::Relaxed);
        self.records_success
            .fetch_add(records as u64, Ordering::Relaxed);
    }

    fn exception(&self, name: &str) {
        self.exceptions[Self::exception_slot(name)].fetch_add(1, Ordering::Relaxed);
    }

    fn retried(&self, entries: usize) {
        self.writes_retried.fetch_add(1, Ordering::Relaxed);
        if entries == 0 {
            debug!("no entries to retry");
        } else {
            info!(entries, "sink-level retry of entries");
        }
    }

    fn dropped(&self, dropped: usize, request_records: usize) {
        self.records_dropped
            .fetch_add(dropped as u64, Ordering::Relaxed);
        // Best effort: a converter may reshape the request, so clamp at zero.
        let succeeded = request_records.saturating_sub(dropped);
        self.records_success
            .fetch_add(succeeded as u64, Ordering::Relaxed);
        if succeeded > 0 {
            self.writes_success.fetch_add(1, Ordering::Relaxed);
        }
        info!(succeeded, dropped, "partially ingested request");
    }
}
