//! Prometheus metrics for local-alb.
//!
//! Tracks rule selection outcomes, authentication decisions and forwarding failures.
use lazy_static::lazy_static;
use prometheus::{
    register_counter_vec, register_histogram_vec, CounterVec, Encoder, HistogramVec, TextEncoder,
};

lazy_static! {
    /// Total number of requests handled by the listener
    pub static ref REQUESTS_TOTAL: CounterVec = register_counter_vec!(
        "alb_requests_total",
        "Total number of requests handled by the listener",
        &["source", "outcome", "status"]  // source: rule name|default|none
    )
    .unwrap();

    /// Authentication decisions
    pub static ref AUTHENTICATIONS_TOTAL: CounterVec = register_counter_vec!(
        "alb_authentications_total",
        "Total number of authenticate-oidc decisions",
        &["result"]  // result: authenticated|unauthenticated|error
    )
    .unwrap();

    /// Upstream transport failures
    pub static ref FORWARD_ERRORS_TOTAL: CounterVec = register_counter_vec!(
        "alb_forward_errors_total",
        "Total number of requests that could not be forwarded",
        &["target"]
    )
    .unwrap();

    /// Request duration from selection to response
    pub static ref REQUEST_DURATION_MS: HistogramVec = register_histogram_vec!(
        "alb_request_duration_ms",
        "Histogram of request handling time in milliseconds",
        &["outcome"],  // outcome: responded|forwarded|failed|timeout
        vec![1.0, 5.0, 10.0, 25.0, 50.0, 100.0, 250.0, 500.0, 1000.0, 2500.0, 5000.0]
    )
    .unwrap();
}

/// Collect and return all metrics in Prometheus text format
pub fn collect_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::error!("Failed to encode metrics: {}", e);
    }
    String::from_utf8_lossy(&buffer).into_owned()
}

pub fn record_request(source: &str, outcome: &str, status: u16, duration_ms: f64) {
    REQUESTS_TOTAL
        .with_label_values(&[source, outcome, &status.to_string()])
        .inc();
    REQUEST_DURATION_MS
        .with_label_values(&[outcome])
        .observe(duration_ms);
}

pub fn record_authentication(result: &str) {
    AUTHENTICATIONS_TOTAL.with_label_values(&[result]).inc();
}

pub fn record_forward_error(target: &str) {
    FORWARD_ERRORS_TOTAL.with_label_values(&[target]).inc();
}
