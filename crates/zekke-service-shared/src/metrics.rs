//! Prometheus metrics for the ZeKKe services.
//!
//! ```no_run
//! use zekke_service_shared::metrics::{init_metrics, metrics_handler, MetricsConfig};
//! use axum::{routing::get, Router};
//!
//! init_metrics(&MetricsConfig::default()).expect("failed to initialize metrics");
//! let app: Router = Router::new().route("/metrics", get(metrics_handler));
//! ```

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};

static PROMETHEUS_HANDLE: OnceCell<PrometheusHandle> = OnceCell::new();

/// Configuration for the metrics system.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsConfig {
    pub enabled: bool,
    /// Route serving the exposition text.
    pub path: String,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            path: "/metrics".to_string(),
        }
    }
}

impl MetricsConfig {
    /// Read `METRICS_ENABLED` (anything but `false` enables) and
    /// `METRICS_PATH`.
    pub fn from_env() -> Self {
        let enabled = std::env::var("METRICS_ENABLED")
            .map(|v| !v.trim().eq_ignore_ascii_case("false"))
            .unwrap_or(true);

        let path = std::env::var("METRICS_PATH")
            .ok()
            .filter(|p| p.starts_with('/'))
            .unwrap_or_else(|| "/metrics".to_string());

        Self { enabled, path }
    }
}

/// Install the global Prometheus recorder. Only the first call succeeds.
pub fn init_metrics(config: &MetricsConfig) -> Result<(), MetricsError> {
    if !config.enabled {
        return Err(MetricsError::Disabled);
    }

    let handle = PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| MetricsError::InstallFailed(e.to_string()))?;

    PROMETHEUS_HANDLE
        .set(handle)
        .map_err(|_| MetricsError::AlreadyInitialized)?;

    Ok(())
}

pub fn prometheus_handle() -> Option<&'static PrometheusHandle> {
    PROMETHEUS_HANDLE.get()
}

/// Prometheus exposition text, or a comment when no recorder is installed.
pub async fn metrics_handler() -> String {
    PROMETHEUS_HANDLE
        .get()
        .map(|h| h.render())
        .unwrap_or_else(|| "# Metrics not initialized\n".to_string())
}

#[derive(Debug, Clone)]
pub enum MetricsError {
    Disabled,
    AlreadyInitialized,
    InstallFailed(String),
}

impl std::fmt::Display for MetricsError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MetricsError::Disabled => write!(f, "metrics are disabled"),
            MetricsError::AlreadyInitialized => write!(f, "metrics recorder already initialized"),
            MetricsError::InstallFailed(e) => {
                write!(f, "failed to install metrics recorder: {}", e)
            }
        }
    }
}

impl std::error::Error for MetricsError {}

// Business metrics

/// Increment `zekke_routes_calculated_total`.
pub fn record_route_calculated(service: &str) {
    metrics::counter!(
        "zekke_routes_calculated_total",
        "service" => service.to_string()
    )
    .increment(1);
}

/// Increment `zekke_routes_failed_total`.
///
/// `reason` is a route failure label (`root_missing`, `unreachable`, ...),
/// `inconsistent_graph`, `validation_error` or `internal_error`.
pub fn record_route_failed(reason: &str, service: &str) {
    metrics::counter!(
        "zekke_routes_failed_total",
        "reason" => reason.to_string(),
        "service" => service.to_string()
    )
    .increment(1);
}

/// Record to the `zekke_route_hops` histogram.
pub fn record_route_hops(hops: usize) {
    metrics::histogram!("zekke_route_hops").record(hops as f64);
}

/// Increment `zekke_geocoder_queries_total`.
///
/// `query_type` is one of `by_position`, `like_name`, `in_area`.
pub fn record_geocoder_query(query_type: &str, service: &str) {
    metrics::counter!(
        "zekke_geocoder_queries_total",
        "query_type" => query_type.to_string(),
        "service" => service.to_string()
    )
    .increment(1);
}

/// Record to the `zekke_geocoder_results` histogram.
pub fn record_geocoder_results(count: usize, query_type: &str) {
    metrics::histogram!(
        "zekke_geocoder_results",
        "query_type" => query_type.to_string()
    )
    .record(count as f64);
}
