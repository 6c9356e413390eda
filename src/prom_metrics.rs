//! # Prometheus Metrics: Exposition for Scraping
//!
//! Exposes service metrics in the Prometheus text exposition format.
//!
//! ## Metrics Exposed
//!
//! | Metric | Type | Labels | Description |
//! |--------|------|--------|-------------|
//! | `stages_http_request_duration_seconds` | Histogram | `method`, `path` | HTTP latency |
//! | `stages_writes_total` | Counter | `op` | Successful create/patch/delete calls |
//! | `stages_validation_failures_total` | Counter | `field` | Rejected payloads by failing field |
//!
//! The `/metrics` endpoint renders the current registry state on each scrape.

use prometheus_client::encoding::text::encode;
use prometheus_client::metrics::counter::Counter;
use prometheus_client::metrics::family::Family;
use prometheus_client::metrics::histogram::{exponential_buckets, Histogram};
use prometheus_client::registry::Registry;

#[derive(Clone, Debug, Hash, PartialEq, Eq, prometheus_client::encoding::EncodeLabelSet)]
pub struct HttpLabel {
    pub method: String,
    pub path: String,
}

#[derive(Clone, Debug, Hash, PartialEq, Eq, prometheus_client::encoding::EncodeLabelSet)]
pub struct OpLabel {
    pub op: String,
}

#[derive(Clone, Debug, Hash, PartialEq, Eq, prometheus_client::encoding::EncodeLabelSet)]
pub struct FieldLabel {
    pub field: String,
}

/// Thread-safe metrics registry. All metric handles are atomic.
pub struct Metrics {
    pub registry: Registry,
    pub http_request_duration: Family<HttpLabel, Histogram>,
    pub stage_writes: Family<OpLabel, Counter>,
    pub validation_failures: Family<FieldLabel, Counter>,
}

impl Metrics {
    pub fn new() -> Self {
        let mut registry = Registry::default();

        let http_request_duration: Family<HttpLabel, Histogram> =
            Family::new_with_constructor(|| Histogram::new(exponential_buckets(0.001, 2.0, 14)));
        registry.register(
            "stages_http_request_duration_seconds",
            "HTTP request latency by method and normalized path",
            http_request_duration.clone(),
        );

        let stage_writes = Family::<OpLabel, Counter>::default();
        registry.register(
            "stages_writes",
            "Successful stage writes by operation",
            stage_writes.clone(),
        );

        let validation_failures = Family::<FieldLabel, Counter>::default();
        registry.register(
            "stages_validation_failures",
            "Rejected stage payloads by failing field",
            validation_failures.clone(),
        );

        Self {
            registry,
            http_request_duration,
            stage_writes,
            validation_failures,
        }
    }

    pub fn record_write(&self, op: &str) {
        self.stage_writes
            .get_or_create(&OpLabel { op: op.to_string() })
            .inc();
    }

    pub fn record_rejection(&self, field: &str) {
        self.validation_failures
            .get_or_create(&FieldLabel {
                field: field.to_string(),
            })
            .inc();
    }

    /// Render all metrics in Prometheus text exposition format.
    pub fn encode(&self) -> String {
        let mut buf = String::new();
        encode(&mut buf, &self.registry).expect("encoding metrics should not fail");
        buf
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}
