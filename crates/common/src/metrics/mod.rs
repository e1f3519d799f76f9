//! Metrics and observability utilities
//!
//! Provides Prometheus metrics with standardized naming conventions.

use metrics::{
    counter, describe_counter, describe_gauge, describe_histogram, histogram, Unit,
};
use std::time::Instant;

/// Metrics prefix for all VeriDoc metrics
pub const METRICS_PREFIX: &str = "veridoc";

/// Histogram buckets for HTTP request latency (in seconds)
pub const LATENCY_BUCKETS: &[f64] = &[
    0.005, // 5ms
    0.010, // 10ms
    0.025, // 25ms
    0.050, // 50ms
    0.100, // 100ms
    0.250, // 250ms
    0.500, // 500ms
    1.000, // 1s
    2.500, // 2.5s
    5.000, // 5s
    10.00, // 10s
];

/// Buckets for oracle round-trips. Multimodal analysis runs for tens of
/// seconds, so the tail extends to the request timeout.
pub const ORACLE_BUCKETS: &[f64] = &[
    1.0,  // 1s
    2.5,  // 2.5s
    5.0,  // 5s
    10.0, // 10s
    20.0, // 20s
    30.0, // 30s
    45.0, // 45s
    60.0, // 60s - request timeout
];

/// Register all metric descriptions
pub fn register_metrics() {
    describe_counter!(
        format!("{}_requests_total", METRICS_PREFIX),
        Unit::Count,
        "Total number of HTTP requests"
    );

    describe_histogram!(
        format!("{}_request_duration_seconds", METRICS_PREFIX),
        Unit::Seconds,
        "HTTP request latency in seconds"
    );

    describe_counter!(
        format!("{}_documents_uploaded_total", METRICS_PREFIX),
        Unit::Count,
        "Total documents accepted for analysis"
    );

    describe_counter!(
        format!("{}_uploads_rejected_total", METRICS_PREFIX),
        Unit::Count,
        "Total uploads rejected by the validation gate"
    );

    describe_counter!(
        format!("{}_analyses_total", METRICS_PREFIX),
        Unit::Count,
        "Total analysis pipeline runs by outcome"
    );

    describe_histogram!(
        format!("{}_analysis_duration_seconds", METRICS_PREFIX),
        Unit::Seconds,
        "End-to-end analysis pipeline latency in seconds"
    );

    describe_counter!(
        format!("{}_oracle_requests_total", METRICS_PREFIX),
        Unit::Count,
        "Total analysis oracle requests"
    );

    describe_histogram!(
        format!("{}_oracle_request_duration_seconds", METRICS_PREFIX),
        Unit::Seconds,
        "Oracle round-trip latency in seconds"
    );

    describe_counter!(
        format!("{}_oracle_errors_total", METRICS_PREFIX),
        Unit::Count,
        "Total oracle failures by kind"
    );

    describe_counter!(
        format!("{}_verdict_fallbacks_total", METRICS_PREFIX),
        Unit::Count,
        "Verdicts built from the fallback path because the oracle output was unparseable"
    );

    describe_counter!(
        format!("{}_reviews_total", METRICS_PREFIX),
        Unit::Count,
        "Total review decisions by outcome"
    );

    describe_gauge!(
        format!("{}_db_connections_active", METRICS_PREFIX),
        Unit::Count,
        "Active database connections"
    );

    tracing::info!("Metrics registered");
}

/// Helper to record request metrics
pub struct RequestMetrics {
    start: Instant,
    endpoint: String,
    method: String,
}

impl RequestMetrics {
    /// Start tracking a request
    pub fn start(method: &str, endpoint: &str) -> Self {
        Self {
            start: Instant::now(),
            endpoint: endpoint.to_string(),
            method: method.to_string(),
        }
    }

    /// Record request completion
    pub fn finish(self, status: u16) {
        let duration = self.start.elapsed().as_secs_f64();

        counter!(
            format!("{}_requests_total", METRICS_PREFIX),
            "method" => self.method.clone(),
            "endpoint" => self.endpoint.clone(),
            "status" => status.to_string()
        )
        .increment(1);

        histogram!(
            format!("{}_request_duration_seconds", METRICS_PREFIX),
            "method" => self.method,
            "endpoint" => self.endpoint
        )
        .record(duration);
    }
}

/// Record one analysis pipeline run
pub fn record_analysis(duration_secs: f64, outcome: &str) {
    counter!(
        format!("{}_analyses_total", METRICS_PREFIX),
        "outcome" => outcome.to_string()
    )
    .increment(1);

    histogram!(format!("{}_analysis_duration_seconds", METRICS_PREFIX)).record(duration_secs);
}

/// Record a validation gate rejection
pub fn record_rejection(reason: &str) {
    counter!(
        format!("{}_uploads_rejected_total", METRICS_PREFIX),
        "reason" => reason.to_string()
    )
    .increment(1);
}

/// Record a review decision
pub fn record_review(decision: &str) {
    counter!(
        format!("{}_reviews_total", METRICS_PREFIX),
        "decision" => decision.to_string()
    )
    .increment(1);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_latency_buckets_sorted() {
        let mut prev = 0.0;
        for &bucket in LATENCY_BUCKETS {
            assert!(bucket > prev);
            prev = bucket;
        }
    }

    #[test]
    fn test_oracle_buckets_cover_timeout() {
        assert!(ORACLE_BUCKETS.contains(&60.0));
    }

    #[test]
    fn test_request_metrics() {
        let metrics = RequestMetrics::start("POST", "/v1/documents");
        std::thread::sleep(std::time::Duration::from_millis(5));
        metrics.finish(201);
        // Just verify it runs without panic
    }
}
