//! Prometheus metrics for cache effectiveness and admission-filter behaviour.

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::net::SocketAddr;

/// Counter: byte-store hit, labelled by key family (`node`, `relation`,
/// `search`, `network`, `path`, `node_relations`).
pub const CACHE_HIT: &str = "graph_cache_repo_cache_hit_total";
/// Counter: byte-store miss, labelled by key family.
pub const CACHE_MISS: &str = "graph_cache_repo_cache_miss_total";
/// Counter: byte-store read resolved to a `NilMarker`/empty placeholder.
pub const CACHE_NEGATIVE_HIT: &str = "graph_cache_repo_cache_negative_hit_total";
/// Counter: admission filter rejected a read-through population attempt.
pub const ADMISSION_REJECTED: &str = "graph_cache_repo_admission_rejected_total";
/// Counter: byte-store operation failed and the call fell through to the DAL.
pub const STORE_FAILURE: &str = "graph_cache_repo_store_failure_total";
/// Histogram: DAL call latency in seconds, labelled by operation.
pub const DAL_LATENCY_SECONDS: &str = "graph_cache_repo_dal_latency_seconds";

/// Installs the global Prometheus recorder.
///
/// When `listen_addr` is `Some`, also starts the exporter's built-in HTTP
/// listener serving `/metrics`; when `None`, only the recorder is installed
/// and the caller is expected to render [`PrometheusHandle::render`] through
/// its own HTTP surface.
///
/// # Errors
///
/// Returns a boxed error if the recorder or listener fails to install.
pub fn install_prometheus(
    listen_addr: Option<SocketAddr>,
) -> Result<PrometheusHandle, Box<dyn std::error::Error + Send + Sync>> {
    let builder = PrometheusBuilder::new();
    let builder = match listen_addr {
        Some(addr) => builder.with_http_listener(addr),
        None => builder,
    };
    let handle = builder.install_recorder()?;
    Ok(handle)
}

/// Records a cache hit for `family`.
pub fn record_cache_hit(family: &'static str) {
    metrics::counter!(CACHE_HIT, "family" => family).increment(1);
}

/// Records a cache miss for `family`.
pub fn record_cache_miss(family: &'static str) {
    metrics::counter!(CACHE_MISS, "family" => family).increment(1);
}

/// Records a negative-cache hit (`NilMarker` or empty placeholder) for
/// `family`.
pub fn record_cache_negative_hit(family: &'static str) {
    metrics::counter!(CACHE_NEGATIVE_HIT, "family" => family).increment(1);
}

/// Records an admission-filter rejection for `family`.
pub fn record_admission_rejected(family: &'static str) {
    metrics::counter!(ADMISSION_REJECTED, "family" => family).increment(1);
}

/// Records a byte-store failure for `operation`.
pub fn record_store_failure(operation: &'static str) {
    metrics::counter!(STORE_FAILURE, "operation" => operation).increment(1);
}

/// Records DAL call latency for `operation`, in seconds.
pub fn record_dal_latency(operation: &'static str, seconds: f64) {
    metrics::histogram!(DAL_LATENCY_SECONDS, "operation" => operation).record(seconds);
}
