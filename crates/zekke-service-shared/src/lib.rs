//! Shared infrastructure for the ZeKKe HTTP microservices.
//!
//! This crate provides the HTTP glue shared by the route finder and geocoder
//! services:
//!
//! - [`AppState`]: graph snapshot loaded once at startup
//! - [`health`]: liveness and readiness handlers
//! - [`ProblemDetails`]: RFC 9457 error bodies
//! - [`ServiceResponse`]: success wrapper with content type
//! - [`metrics`]: Prometheus recorder and business counters
//! - [`logging`]: structured logging setup
//! - [`middleware`]: request id propagation and HTTP metrics
//! - Query types with validation for each endpoint
//!
//! Handlers stay thin: parse the query, validate it, call `zekke-lib`, and
//! format the response.
//!
//! Enable the `test-utils` feature to reach [`test_utils`] from the service
//! crates.

mod health;
pub mod logging;
pub mod metrics;
pub mod middleware;
mod problem;
mod request;
mod response;
mod state;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use health::{health_live, health_ready, HealthStatus};
pub use logging::{init_logging, LogFormat, LoggingConfig};
pub use metrics::{
    init_metrics, metrics_handler, record_geocoder_query, record_geocoder_results,
    record_route_calculated, record_route_failed, record_route_hops, MetricsConfig, MetricsError,
};
pub use middleware::{extract_or_generate_request_id, MetricsLayer, RequestId};
pub use problem::{
    from_lib_error, ProblemDetails, PROBLEM_INCONSISTENT_GRAPH, PROBLEM_INTERNAL_ERROR,
    PROBLEM_INVALID_REQUEST, PROBLEM_PLACE_NOT_FOUND, PROBLEM_ROUTE_NOT_FOUND,
};
pub use request::{
    query_rejection, strip_json_suffix, validate_name, AreaParams, PositionQuery, RouteQuery,
    Validate,
};
pub use response::ServiceResponse;
pub use state::{AppState, AppStateError, StateOptions};
