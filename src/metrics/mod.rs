//! Prometheus metrics for the forum search service.
//!
//! Covers HTTP traffic, query execution, index synchronization and
//! reconciliation runs. Metrics are recorded unconditionally; they are only
//! exported once [`init_metrics`] has registered them.
//!
//! # Example
//! ```no_run
//! use skillswap_search::metrics::SEARCH_QUERIES_TOTAL;
//!
//! SEARCH_QUERIES_TOTAL.with_label_values(&["success"]).inc();
//! ```

use axum::{
    extract::{MatchedPath, Request},
    middleware::Next,
    response::Response,
};
use lazy_static::lazy_static;
use prometheus::{
    CounterVec, Gauge, GaugeVec, Histogram, HistogramOpts, HistogramVec, IntCounter, Opts,
    Registry,
};
use std::time::Instant;

const NAMESPACE: &str = "skillswap_search";

lazy_static! {
    /// Global Prometheus registry for all metrics
    pub static ref PROMETHEUS_REGISTRY: Registry = Registry::new();

    // ============================================================================
    // HTTP Metrics
    // ============================================================================

    /// Labels: method, path, status_code
    pub static ref HTTP_REQUESTS_TOTAL: CounterVec = CounterVec::new(
        Opts::new("http_requests_total", "Total number of HTTP requests")
            .namespace(NAMESPACE),
        &["method", "path", "status_code"]
    ).expect("Failed to create HTTP_REQUESTS_TOTAL metric");

    /// Labels: method, path
    pub static ref HTTP_REQUEST_DURATION_SECONDS: HistogramVec = HistogramVec::new(
        HistogramOpts::new(
            "http_request_duration_seconds",
            "HTTP request duration in seconds"
        )
        .namespace(NAMESPACE)
        .buckets(vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0]),
        &["method", "path"]
    ).expect("Failed to create HTTP_REQUEST_DURATION_SECONDS metric");

    // ============================================================================
    // Search Metrics
    // ============================================================================

    /// Labels: outcome (success, failure)
    pub static ref SEARCH_QUERIES_TOTAL: CounterVec = CounterVec::new(
        Opts::new("search_queries_total", "Total number of forum searches")
            .namespace(NAMESPACE),
        &["outcome"]
    ).expect("Failed to create SEARCH_QUERIES_TOTAL metric");

    pub static ref SEARCH_DURATION_SECONDS: Histogram = Histogram::with_opts(
        HistogramOpts::new(
            "search_duration_seconds",
            "Forum search latency including result merging"
        )
        .namespace(NAMESPACE)
        .buckets(vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5])
    ).expect("Failed to create SEARCH_DURATION_SECONDS metric");

    /// Search hits whose forum no longer exists in the store
    pub static ref SEARCH_STALE_HITS_TOTAL: IntCounter = IntCounter::with_opts(
        Opts::new("search_stale_hits_total", "Search hits without a live forum")
            .namespace(NAMESPACE)
    ).expect("Failed to create SEARCH_STALE_HITS_TOTAL metric");

    // ============================================================================
    // Sync Metrics
    // ============================================================================

    /// Labels: operation (index, delete), outcome (success, failure)
    pub static ref SYNC_OPERATIONS_TOTAL: CounterVec = CounterVec::new(
        Opts::new("sync_operations_total", "Single document sync operations")
            .namespace(NAMESPACE),
        &["operation", "outcome"]
    ).expect("Failed to create SYNC_OPERATIONS_TOTAL metric");

    pub static ref BULK_DOCUMENTS_INDEXED_TOTAL: IntCounter = IntCounter::with_opts(
        Opts::new("bulk_documents_indexed_total", "Documents written by full syncs")
            .namespace(NAMESPACE)
    ).expect("Failed to create BULK_DOCUMENTS_INDEXED_TOTAL metric");

    /// Labels: outcome (success, failure)
    pub static ref RECONCILE_RUNS_TOTAL: CounterVec = CounterVec::new(
        Opts::new("reconcile_runs_total", "Index reconciliation runs")
            .namespace(NAMESPACE),
        &["outcome"]
    ).expect("Failed to create RECONCILE_RUNS_TOTAL metric");

    pub static ref INDEX_DOCUMENTS: Gauge = Gauge::with_opts(
        Opts::new("index_documents", "Documents in the forum index at the last stats read")
            .namespace(NAMESPACE)
    ).expect("Failed to create INDEX_DOCUMENTS metric");

    // ============================================================================
    // System Metrics
    // ============================================================================

    /// Labels: version
    pub static ref BUILD_INFO: GaugeVec = GaugeVec::new(
        Opts::new("build_info", "Build information").namespace(NAMESPACE),
        &["version"]
    ).expect("Failed to create BUILD_INFO metric");
}

/// Register all metrics with the global registry
pub fn init_metrics() -> Result<(), prometheus::Error> {
    PROMETHEUS_REGISTRY.register(Box::new(HTTP_REQUESTS_TOTAL.clone()))?;
    PROMETHEUS_REGISTRY.register(Box::new(HTTP_REQUEST_DURATION_SECONDS.clone()))?;

    PROMETHEUS_REGISTRY.register(Box::new(SEARCH_QUERIES_TOTAL.clone()))?;
    PROMETHEUS_REGISTRY.register(Box::new(SEARCH_DURATION_SECONDS.clone()))?;
    PROMETHEUS_REGISTRY.register(Box::new(SEARCH_STALE_HITS_TOTAL.clone()))?;

    PROMETHEUS_REGISTRY.register(Box::new(SYNC_OPERATIONS_TOTAL.clone()))?;
    PROMETHEUS_REGISTRY.register(Box::new(BULK_DOCUMENTS_INDEXED_TOTAL.clone()))?;
    PROMETHEUS_REGISTRY.register(Box::new(RECONCILE_RUNS_TOTAL.clone()))?;
    PROMETHEUS_REGISTRY.register(Box::new(INDEX_DOCUMENTS.clone()))?;

    PROMETHEUS_REGISTRY.register(Box::new(BUILD_INFO.clone()))?;
    BUILD_INFO
        .with_label_values(&[env!("CARGO_PKG_VERSION")])
        .set(1.0);

    tracing::info!("Prometheus metrics initialized successfully");
    Ok(())
}

/// Generate Prometheus text format metrics
pub fn gather_metrics() -> String {
    use prometheus::Encoder;
    let encoder = prometheus::TextEncoder::new();
    let metric_families = PROMETHEUS_REGISTRY.gather();
    let mut buffer = Vec::new();

    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::error!("Failed to encode metrics: {}", e);
        return String::from("# Error encoding metrics\n");
    }

    String::from_utf8(buffer).unwrap_or_else(|e| {
        tracing::error!("Failed to convert metrics to string: {}", e);
        String::from("# Error converting metrics\n")
    })
}

/// Outcome label for a result
pub fn outcome<T, E>(result: &Result<T, E>) -> &'static str {
    if result.is_ok() {
        "success"
    } else {
        "failure"
    }
}

/// Axum middleware recording request counts and latency per matched route
pub async fn track_metrics(req: Request, next: Next) -> Response {
    let method = req.method().to_string();
    let path = req
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_string())
        .unwrap_or_else(|| req.uri().path().to_string());

    let start = Instant::now();
    let response = next.run(req).await;

    HTTP_REQUEST_DURATION_SECONDS
        .with_label_values(&[&method, &path])
        .observe(start.elapsed().as_secs_f64());
    HTTP_REQUESTS_TOTAL
        .with_label_values(&[&method, &path, response.status().as_str()])
        .inc();

    response
}
