//! Prometheus metrics for monitoring the gateway.

use prometheus::{
    register_histogram_vec, register_int_counter_vec, register_int_gauge_vec, HistogramVec,
    IntCounterVec, IntGaugeVec,
};
use std::sync::OnceLock;

/// Container for all application metrics.
pub struct Metrics {
    /// Total number of requests by method, endpoint, provider, and status
    pub request_count: IntCounterVec,

    /// Request duration histogram in seconds (time to response headers)
    pub request_duration: HistogramVec,

    /// Number of currently active requests by endpoint
    pub active_requests: IntGaugeVec,

    /// Upstream call latency by provider and mode (buffered/stream/cv)
    pub upstream_latency: HistogramVec,

    /// Upstream failures by provider and error kind
    pub upstream_errors: IntCounterVec,

    /// Tokens relayed to clients over SSE, by provider
    pub streamed_tokens: IntCounterVec,
}

static METRICS: OnceLock<Metrics> = OnceLock::new();

/// Initialize the metrics registry.
///
/// Safe to call more than once; later calls return the same instance.
pub fn init_metrics() -> &'static Metrics {
    METRICS.get_or_init(|| {
        let request_count = register_int_counter_vec!(
            "workapp_gateway_requests_total",
            "Total number of requests",
            &["method", "endpoint", "provider", "status_code"]
        )
        .expect("Failed to register request_count metric");

        let request_duration = register_histogram_vec!(
            "workapp_gateway_request_duration_seconds",
            "Request duration in seconds",
            &["method", "endpoint", "provider"],
            vec![0.05, 0.1, 0.5, 1.0, 2.0, 5.0, 10.0, 30.0]
        )
        .expect("Failed to register request_duration metric");

        let active_requests = register_int_gauge_vec!(
            "workapp_gateway_active_requests",
            "Number of active requests",
            &["endpoint"]
        )
        .expect("Failed to register active_requests metric");

        let upstream_latency = register_histogram_vec!(
            "workapp_gateway_upstream_latency_seconds",
            "Upstream response latency in seconds",
            &["provider", "mode"],
            vec![0.1, 0.5, 1.0, 2.0, 5.0, 10.0, 30.0]
        )
        .expect("Failed to register upstream_latency metric");

        let upstream_errors = register_int_counter_vec!(
            "workapp_gateway_upstream_errors_total",
            "Upstream failures by error kind",
            &["provider", "kind"]
        )
        .expect("Failed to register upstream_errors metric");

        let streamed_tokens = register_int_counter_vec!(
            "workapp_gateway_streamed_tokens_total",
            "Token chunks relayed over SSE",
            &["provider"]
        )
        .expect("Failed to register streamed_tokens metric");

        Metrics {
            request_count,
            request_duration,
            active_requests,
            upstream_latency,
            upstream_errors,
            streamed_tokens,
        }
    })
}

/// Get the global metrics instance, registering it on first use.
pub fn get_metrics() -> &'static Metrics {
    init_metrics()
}
