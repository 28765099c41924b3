//! # Prometheus Metrics
//!
//! Operational metrics for the registry, scraped from `/metrics` on the
//! metrics port. Everything lives in a dedicated [`prometheus::Registry`]
//! under the `codesync` namespace.

use axum::http::StatusCode;
use axum::response::IntoResponse;
use prometheus::{
    Encoder, Histogram, HistogramOpts, IntCounter, IntCounterVec, IntGauge, Opts, Registry,
    TextEncoder,
};
use std::sync::Arc;
use std::time::Instant;

use codesync_core::crypto::{IdentityRecoverer, Secp256k1Recoverer, SignatureError};
use codesync_core::Address;

/// Metric handles shared by all request handlers.
#[derive(Clone)]
pub struct ServerMetrics {
    registry: Registry,
    /// Records successfully created.
    pub records_registered_total: IntCounter,
    /// Access checks by outcome (`granted` / `denied`).
    pub access_checks_total: IntCounterVec,
    /// Signatures that failed to decode or recover.
    pub signature_rejections_total: IntCounter,
    /// Rejected requests by error kind.
    pub request_failures_total: IntCounterVec,
    /// Records currently stored.
    pub records: IntGauge,
    /// Time spent recovering a signer, in seconds.
    pub recovery_latency_seconds: Histogram,
}

impl ServerMetrics {
    /// Creates and registers all metrics. Call once at startup.
    pub fn new() -> Self {
        let registry = Registry::new_custom(Some("codesync".into()), None)
            .expect("failed to create prometheus registry");

        let records_registered_total = IntCounter::new(
            "records_registered_total",
            "Total number of content records created",
        )
        .expect("metric creation");
        registry
            .register(Box::new(records_registered_total.clone()))
            .expect("metric registration");

        let access_checks_total = IntCounterVec::new(
            Opts::new("access_checks_total", "Access checks by outcome"),
            &["outcome"],
        )
        .expect("metric creation");
        registry
            .register(Box::new(access_checks_total.clone()))
            .expect("metric registration");

        let signature_rejections_total = IntCounter::new(
            "signature_rejections_total",
            "Signatures that could not be decoded or recovered",
        )
        .expect("metric creation");
        registry
            .register(Box::new(signature_rejections_total.clone()))
            .expect("metric registration");

        let request_failures_total = IntCounterVec::new(
            Opts::new("request_failures_total", "Rejected requests by error kind"),
            &["kind"],
        )
        .expect("metric creation");
        registry
            .register(Box::new(request_failures_total.clone()))
            .expect("metric registration");

        let records = IntGauge::new("records", "Number of stored content records")
            .expect("metric creation");
        registry
            .register(Box::new(records.clone()))
            .expect("metric registration");

        let recovery_latency_seconds = Histogram::with_opts(
            HistogramOpts::new(
                "recovery_latency_seconds",
                "Signer recovery latency in seconds",
            )
            .buckets(vec![
                0.00005, 0.0001, 0.00025, 0.0005, 0.001, 0.0025, 0.005, 0.01,
            ]),
        )
        .expect("metric creation");
        registry
            .register(Box::new(recovery_latency_seconds.clone()))
            .expect("metric registration");

        Self {
            registry,
            records_registered_total,
            access_checks_total,
            signature_rejections_total,
            request_failures_total,
            records,
            recovery_latency_seconds,
        }
    }

    /// Encodes all registered metrics into the Prometheus text format.
    pub fn encode(&self) -> Result<String, prometheus::Error> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}

impl Default for ServerMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Shared metrics state passed to axum handlers.
pub type SharedMetrics = Arc<ServerMetrics>;

// ---------------------------------------------------------------------------
// Metered recovery
// ---------------------------------------------------------------------------

/// Wraps the secp256k1 recoverer to time every recovery and count failures.
pub struct MeteredRecoverer {
    inner: Secp256k1Recoverer,
    metrics: SharedMetrics,
}

impl MeteredRecoverer {
    pub fn new(metrics: SharedMetrics) -> Self {
        Self {
            inner: Secp256k1Recoverer,
            metrics,
        }
    }
}

impl IdentityRecoverer for MeteredRecoverer {
    fn recover_identity(&self, message: &str, signature: &str) -> Result<Address, SignatureError> {
        let started = Instant::now();
        let result = self.inner.recover_identity(message, signature);
        self.metrics
            .recovery_latency_seconds
            .observe(started.elapsed().as_secs_f64());
        if result.is_err() {
            self.metrics.signature_rejections_total.inc();
        }
        result
    }
}

/// Axum handler that renders `/metrics` in Prometheus text format.
pub async fn metrics_handler(
    axum::extract::State(metrics): axum::extract::State<SharedMetrics>,
) -> impl IntoResponse {
    match metrics.encode() {
        Ok(body) => (
            StatusCode::OK,
            [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
            body,
        )
            .into_response(),
        Err(e) => {
            tracing::error!("failed to encode metrics: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "metrics encoding failed").into_response()
        }
    }
}
