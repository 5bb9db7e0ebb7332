//! ZeKKe route finder HTTP microservice.
//!
//! # Endpoints
//!
//! - `GET /api/v1/route-finder/route.json` - shortest route between two coordinates
//! - `GET /metrics` - Prometheus metrics endpoint
//! - `GET /health/live` - liveness probe
//! - `GET /health/ready` - readiness probe
//!
//! # Configuration
//!
//! - `ZEKKE_DATABASE_PATH` - SQLite place database (default: /data/zekke.db)
//! - `ZEKKE_REQUIRE_SYMMETRIC` - refuse to start on one-way paths
//! - `RUST_LOG` - log level (default: info)
//! - `LOG_FORMAT` - json (default) or text
//! - `SERVICE_PORT` - HTTP port (default: 8080)
//! - `METRICS_ENABLED`, `METRICS_PATH` - Prometheus endpoint

use std::env;
use std::net::SocketAddr;

use axum::{
    Extension, Json, Router,
    extract::{Query, State, rejection::QueryRejection},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
};
use serde::Serialize;
use tracing::{error, info, warn};

use zekke_lib::{Error as LibError, Place};
use zekke_service_shared::{
    AppState, LoggingConfig, MetricsConfig, MetricsLayer, ProblemDetails, RequestId, RouteQuery,
    ServiceResponse, StateOptions, Validate, from_lib_error, health_live, health_ready,
    init_logging, init_metrics, metrics_handler, query_rejection, record_route_calculated,
    record_route_failed, record_route_hops,
};

const SERVICE: &str = "route-finder";

/// Route returned to the caller.
#[derive(Debug, Serialize)]
struct RouteResponse {
    /// Sum of the traversed path distances, in meters.
    distance: f64,
    hops: usize,
    /// Places from root to target.
    path: Vec<Place>,
}

/// HTTP response - either success or RFC 9457 error.
#[derive(Debug, Serialize)]
#[serde(untagged)]
enum Response {
    Success(ServiceResponse<RouteResponse>),
    Error(ProblemDetails),
}

impl IntoResponse for Response {
    fn into_response(self) -> axum::response::Response {
        match self {
            Response::Success(data) => (StatusCode::OK, Json(data)).into_response(),
            Response::Error(problem) => problem.into_response(),
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let logging_config = LoggingConfig::from_env().with_service(SERVICE);
    init_logging(&logging_config);

    let metrics_config = MetricsConfig::from_env();
    if let Err(e) = init_metrics(&metrics_config) {
        warn!(error = %e, "failed to initialize metrics, continuing without metrics");
    }

    let db_path = env::var("ZEKKE_DATABASE_PATH").unwrap_or_else(|_| "/data/zekke.db".to_string());
    let port: u16 = env::var("SERVICE_PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(8080);

    info!(db_path = %db_path, port = port, "starting route finder service");

    let state = AppState::load_with_options(&db_path, StateOptions::from_env()).map_err(|e| {
        error!(error = %e, path = %db_path, "failed to load application state");
        e
    })?;

    let app = app(state, &metrics_config.path);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!(addr = %addr, "listening on");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

fn app(state: AppState, metrics_path: &str) -> Router {
    Router::new()
        .route("/api/v1/route-finder/route.json", get(route_handler))
        .route(metrics_path, get(metrics_handler))
        .route("/health/live", get(health_live))
        .route("/health/ready", get(health_ready))
        .layer(MetricsLayer)
        .with_state(state)
}

/// Handle `GET /api/v1/route-finder/route.json`.
async fn route_handler(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    query: Result<Query<RouteQuery>, QueryRejection>,
) -> Response {
    let request_id = request_id.as_str();

    let query = match query {
        Ok(Query(query)) => query,
        Err(rejection) => {
            record_route_failed("validation_error", SERVICE);
            return Response::Error(query_rejection(&rejection, request_id));
        }
    };

    if let Err(problem) = query.validate(request_id) {
        record_route_failed("validation_error", SERVICE);
        return Response::Error(*problem);
    }

    let (root, target) = (query.root(), query.target());
    info!(request_id, root = %root, target = %target, "handling route request");

    let route = match state.route_finder().find_route(&root, &target) {
        Ok(route) => route,
        Err(e) => {
            let reason = match &e {
                LibError::RouteNotFound { reason } => reason.as_str(),
                LibError::InconsistentEdge { .. } => "inconsistent_graph",
                _ => "internal_error",
            };
            if reason == "inconsistent_graph" || reason == "internal_error" {
                error!(request_id, error = %e, "route search failed");
            } else {
                info!(request_id, reason, "no route");
            }
            record_route_failed(reason, SERVICE);
            return Response::Error(from_lib_error(&e, request_id));
        }
    };

    let hops = route.hop_count();
    record_route_calculated(SERVICE);
    record_route_hops(hops);
    info!(request_id, hops, distance = route.distance(), "route computed");

    Response::Success(ServiceResponse::new(RouteResponse {
        distance: route.distance(),
        hops,
        path: route.into_path(),
    }))
}
