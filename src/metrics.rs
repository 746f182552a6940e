//! Prometheus metrics for application observability.
//!
//! Metrics are exposed on a dedicated HTTP listener when `METRICS_PORT` is
//! set to a non-zero value.
//!
//! # Available Metrics
//!
//! ## Counters
//! - `catalog_requests_total` - HTTP requests (labels: method, endpoint, status)
//! - `catalog_product_mutations_total` - Store mutations (labels: operation, outcome)
//! - `catalog_auth_failures_total` - Rejected API keys (labels: reason)
//!
//! ## Histograms
//! - `catalog_request_duration_seconds` - Request duration (labels: method, endpoint, status)
//!
//! ## Gauges
//! - `catalog_products` - Number of products currently held
//!
//! Recording functions are no-ops until [`init_metrics`] installs a recorder,
//! so they are safe to call from tests.

use std::net::SocketAddr;
use std::time::Instant;

use axum::extract::{MatchedPath, Request};
use axum::middleware::Next;
use axum::response::Response;
use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;
use tracing::{error, info};

/// Metric names as constants for consistency.
pub mod names {
    pub const REQUESTS_TOTAL: &str = "catalog_requests_total";
    pub const REQUEST_DURATION_SECONDS: &str = "catalog_request_duration_seconds";
    pub const PRODUCT_MUTATIONS_TOTAL: &str = "catalog_product_mutations_total";
    pub const AUTH_FAILURES_TOTAL: &str = "catalog_auth_failures_total";
    pub const PRODUCTS: &str = "catalog_products";
}

/// Initialize the Prometheus metrics exporter.
///
/// # Errors
///
/// Returns a message if the exporter cannot be installed (for example, the
/// port is already bound or a recorder was installed earlier).
pub fn init_metrics(metrics_addr: SocketAddr) -> Result<(), String> {
    PrometheusBuilder::new()
        .with_http_listener(metrics_addr)
        .install()
        .map_err(|e| format!("Failed to install Prometheus exporter: {e}"))?;

    describe_counter!(names::REQUESTS_TOTAL, "Total number of HTTP requests handled");
    describe_histogram!(
        names::REQUEST_DURATION_SECONDS,
        "HTTP request duration in seconds"
    );
    describe_counter!(
        names::PRODUCT_MUTATIONS_TOTAL,
        "Total number of create/update/delete operations on the store"
    );
    describe_counter!(
        names::AUTH_FAILURES_TOTAL,
        "Total number of requests rejected for a missing or wrong API key"
    );
    describe_gauge!(names::PRODUCTS, "Number of products currently in the store");

    info!(addr = %metrics_addr, "Prometheus metrics endpoint started");
    Ok(())
}

/// Try to initialize metrics, logging any errors but not failing.
pub fn try_init_metrics(metrics_addr: SocketAddr) {
    if let Err(e) = init_metrics(metrics_addr) {
        error!(error = %e, "Failed to initialize metrics, continuing without metrics");
    }
}

/// Middleware recording request count and latency per matched route.
///
/// Uses the route template (`/products/{id}`) rather than the raw path so
/// label cardinality stays bounded.
pub async fn track_requests(request: Request, next: Next) -> Response {
    let start = Instant::now();
    let method = request.method().to_string();
    let endpoint = request
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_string())
        .unwrap_or_else(|| "unmatched".to_string());

    let response = next.run(request).await;

    let status = response.status().as_u16().to_string();
    record_request(&endpoint, &method, &status, start.elapsed().as_secs_f64());

    response
}

/// Record one handled HTTP request.
pub fn record_request(endpoint: &str, method: &str, status: &str, duration_secs: f64) {
    counter!(names::REQUESTS_TOTAL, "endpoint" => endpoint.to_string(), "method" => method.to_string(), "status" => status.to_string())
        .increment(1);
    histogram!(names::REQUEST_DURATION_SECONDS, "endpoint" => endpoint.to_string(), "method" => method.to_string(), "status" => status.to_string())
        .record(duration_secs);
}

/// Record a store mutation and its outcome (`ok`, `not_found`, `conflict`).
pub fn record_mutation(operation: &'static str, outcome: &'static str) {
    counter!(names::PRODUCT_MUTATIONS_TOTAL, "operation" => operation, "outcome" => outcome)
        .increment(1);
}

/// Record a rejected API key (`missing`, `invalid`, `locked_out`).
pub fn record_auth_failure(reason: &'static str) {
    counter!(names::AUTH_FAILURES_TOTAL, "reason" => reason).increment(1);
}

/// Update the product count gauge.
pub fn set_product_count(count: usize) {
    gauge!(names::PRODUCTS).set(count as f64);
}
