//! Prometheus export of sink metrics (feature `metrics`).

use prometheus::{IntCounter, IntCounterVec, IntGauge, Opts, Registry};
use tsw_common::RequestShape;

use super::{exception_label, MetricsSink};

/// Sink metrics registered in a Prometheus [`Registry`].
#[derive(Clone)]
pub struct PrometheusMetrics {
    registry: Registry,
    records_success: IntCounter,
    writes_success: IntCounter,
    records_dropped: IntCounter,
    writes_retried: IntCounter,
    exceptions: IntCounterVec,
    records_per_request: IntGauge,
    measures_per_request: IntGauge,
    common_dimensions_per_request: IntGauge,
}

impl PrometheusMetrics {
    /// Register all collectors in a fresh registry.
    pub fn new() -> prometheus::Result<Self> {
        Self::with_registry(Registry::new())
    }

    pub fn with_registry(registry: Registry) -> prometheus::Result<Self> {
        let counter = |name: &str, help: &str| -> prometheus::Result<IntCounter> {
            let c = IntCounter::with_opts(Opts::new(name, help).namespace("tsw"))?;
            registry.register(Box::new(c.clone()))?;
            Ok(c)
        };
        let gauge = |name: &str, help: &str| -> prometheus::Result<IntGauge> {
            let g = IntGauge::with_opts(Opts::new(name, help).namespace("tsw"))?;
            registry.register(Box::new(g.clone()))?;
            Ok(g)
        };

        let records_success = counter("records_success_total", "Records written")?;
        let writes_success = counter("writes_success_total", "Write requests with written records")?;
        let records_dropped = counter("records_dropped_total", "Records dropped by the failure policy")?;
        let writes_retried = counter("writes_retried_total", "Requests resubmitted by the sink")?;
        let exceptions = IntCounterVec::new(
            Opts::new("exceptions_total", "Write failures by exception").namespace("tsw"),
            &["exception"],
        )?;
        registry.register(Box::new(exceptions.clone()))?;
        let records_per_request = gauge("records_per_request", "Records in the last request")?;
        let measures_per_request = gauge("measures_per_request", "Measures in the last request")?;
        let common_dimensions_per_request = gauge(
            "common_dimensions_per_request",
            "Common attribute dimensions in the last request",
        )?;

        Ok(Self {
            registry,
            records_success,
            writes_success,
            records_dropped,
            writes_retried,
            exceptions,
            records_per_request,
            measures_per_request,
            common_dimensions_per_request,
        })
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }
}

impl MetricsSink for PrometheusMetrics {
    fn pre_write(&self, shape: RequestShape) {
        self.records_per_request.set(shape.records as i64);
        self.measures_per_request.set(shape.measures as i64);
        self.common_dimensions_per_request
            .set(shape.common_attribute_dimensions as i64);
    }

    fn write_succeeded(&self, records: usize) {
        self.writes_success.inc();
        self.records_success.inc_by(records as u64);
    }

    fn exception(&self, name: &str) {
        self.exceptions
            .with_label_values(&[exception_label(name)])
            .inc();
    }

    fn retried(&self, _entries: usize) {
        self.writes_retried.inc();
    }

    fn dropped(&self, dropped: usize, request_records: usize) {
        self.records_dropped.inc_by(dropped as u64);
        let succeeded = request_records.saturating_sub(dropped);
        self.records_success.inc_by(succeeded as u64);
        if succeeded > 0 {
            self.writes_success.inc();
        }
    }
}
