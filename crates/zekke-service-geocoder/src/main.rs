//! ZeKKe geocoder HTTP microservice.
//!
//! # Endpoints
//!
//! - `GET /api/v1/geocoder/places/by-position/place.json` - place at a coordinate
//! - `GET /api/v1/geocoder/places/like/{name}.json` - places whose name contains `name`
//! - `GET /api/v1/geocoder/names/in-area/like/{name}.json` - matching names inside a circle
//! - `GET /metrics`, `GET /health/live`, `GET /health/ready`
//!
//! # Configuration
//!
//! - `ZEKKE_DATABASE_PATH` - SQLite place database (default: /data/zekke.db)
//! - `RUST_LOG`, `LOG_FORMAT`, `SERVICE_PORT`, `METRICS_ENABLED`, `METRICS_PATH`

use std::env;
use std::net::SocketAddr;

use axum::{
    Extension, Json, Router,
    extract::{Path, Query, State, rejection::QueryRejection},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
};
use serde::Serialize;
use tracing::{error, info, warn};

use zekke_lib::Place;
use zekke_service_shared::{
    AppState, AreaParams, LoggingConfig, MetricsConfig, MetricsLayer, PositionQuery,
    ProblemDetails, RequestId, ServiceResponse, StateOptions, Validate, from_lib_error,
    health_live, health_ready, init_logging, init_metrics, metrics_handler, query_rejection,
    record_geocoder_query, record_geocoder_results, strip_json_suffix, validate_name,
};

const SERVICE: &str = "geocoder";

#[derive(Debug, Serialize)]
struct PlacesResponse {
    places: Vec<Place>,
}

#[derive(Debug, Serialize)]
struct NamesResponse {
    names: Vec<String>,
}

/// HTTP response - either success or RFC 9457 error.
#[derive(Debug)]
enum Response<T> {
    Success(ServiceResponse<T>),
    Error(ProblemDetails),
}

impl<T: Serialize> IntoResponse for Response<T> {
    fn into_response(self) -> axum::response::Response {
        match self {
            Response::Success(data) => (StatusCode::OK, Json(data)).into_response(),
            Response::Error(problem) => problem.into_response(),
        }
    }
}

impl<T> From<ProblemDetails> for Response<T> {
    fn from(problem: ProblemDetails) -> Self {
        Response::Error(problem)
    }
}

impl<T> From<Box<ProblemDetails>> for Response<T> {
    fn from(problem: Box<ProblemDetails>) -> Self {
        Response::Error(*problem)
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

    info!(db_path = %db_path, port = port, "starting geocoder service");

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
        .route(
            "/api/v1/geocoder/places/by-position/place.json",
            get(by_position_handler),
        )
        .route("/api/v1/geocoder/places/like/{file}", get(like_name_handler))
        .route(
            "/api/v1/geocoder/names/in-area/like/{file}",
            get(in_area_handler),
        )
        .route(metrics_path, get(metrics_handler))
        .route("/health/live", get(health_live))
        .route("/health/ready", get(health_ready))
        .layer(MetricsLayer)
        .with_state(state)
}

/// Handle `GET /api/v1/geocoder/places/by-position/place.json`.
async fn by_position_handler(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    query: Result<Query<PositionQuery>, QueryRejection>,
) -> Response<Place> {
    let request_id = request_id.as_str();
    record_geocoder_query("by_position", SERVICE);

    let query = match query {
        Ok(Query(query)) => query,
        Err(rejection) => return query_rejection(&rejection, request_id).into(),
    };
    if let Err(problem) = query.validate(request_id) {
        return problem.into();
    }

    let position = query.position();
    match state.geocoder().find_by_position(&position) {
        Ok(Some(place)) => {
            record_geocoder_results(1, "by_position");
            info!(request_id, position = %position, place = %place.id(), "position resolved");
            Response::Success(ServiceResponse::new(place))
        }
        Ok(None) => {
            record_geocoder_results(0, "by_position");
            ProblemDetails::place_not_found(
                format!("No place within reach of {position}"),
                &[],
                request_id,
            )
            .into()
        }
        Err(e) => {
            error!(request_id, error = %e, "position lookup failed");
            from_lib_error(&e, request_id).into()
        }
    }
}

/// Handle `GET /api/v1/geocoder/places/like/{name}.json`.
async fn like_name_handler(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    Path(file): Path<String>,
) -> Response<PlacesResponse> {
    let request_id = request_id.as_str();
    record_geocoder_query("like_name", SERVICE);

    let name = match json_name(&file, request_id) {
        Ok(name) => name,
        Err(problem) => return problem.into(),
    };

    match state.geocoder().find_like_name(name) {
        Ok(places) => {
            record_geocoder_results(places.len(), "like_name");
            info!(request_id, name, matches = places.len(), "name lookup");
            Response::Success(ServiceResponse::new(PlacesResponse { places }))
        }
        Err(e) => from_lib_error(&e, request_id).into(),
    }
}

/// Handle `GET /api/v1/geocoder/names/in-area/like/{name}.json`.
async fn in_area_handler(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    Path(file): Path<String>,
    query: Result<Query<AreaParams>, QueryRejection>,
) -> Response<NamesResponse> {
    let request_id = request_id.as_str();
    record_geocoder_query("in_area", SERVICE);

    let name = match json_name(&file, request_id) {
        Ok(name) => name,
        Err(problem) => return problem.into(),
    };
    let params = match query {
        Ok(Query(params)) => params,
        Err(rejection) => return query_rejection(&rejection, request_id).into(),
    };
    if let Err(problem) = params.validate(request_id) {
        return problem.into();
    }

    let area = params.to_area_query(name);
    match state.geocoder().find_names_in_area_like_name(&area) {
        Ok(names) => {
            record_geocoder_results(names.len(), "in_area");
            info!(
                request_id,
                name,
                radius = area.radius,
                matches = names.len(),
                "area lookup"
            );
            Response::Success(ServiceResponse::new(NamesResponse { names }))
        }
        Err(e) => from_lib_error(&e, request_id).into(),
    }
}

fn json_name<'a>(file: &'a str, request_id: &str) -> Result<&'a str, Box<ProblemDetails>> {
    let name = strip_json_suffix(file).ok_or_else(|| {
        Box::new(ProblemDetails::bad_request(
            "Resource names must end in '.json'",
            request_id,
        ))
    })?;
    validate_name(name, request_id)?;
    Ok(name.trim())
}
