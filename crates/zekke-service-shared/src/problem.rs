//! RFC 9457 Problem Details for HTTP APIs.
//!
//! See: <https://www.rfc-editor.org/rfc/rfc9457.html>

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

use zekke_lib::{Error as LibError, PlaceId, RouteFailure};

/// No route between the requested coordinates.
pub const PROBLEM_ROUTE_NOT_FOUND: &str = "/problems/route-not-found";

/// The stored graph is missing a reverse path the search needs.
pub const PROBLEM_INCONSISTENT_GRAPH: &str = "/problems/inconsistent-graph";

/// Missing or out-of-range request parameters.
pub const PROBLEM_INVALID_REQUEST: &str = "/problems/invalid-request";

/// No place matches the requested position or name.
pub const PROBLEM_PLACE_NOT_FOUND: &str = "/problems/place-not-found";

pub const PROBLEM_INTERNAL_ERROR: &str = "/problems/internal-error";

/// RFC 9457 Problem Details response body.
///
/// ```
/// use zekke_service_shared::{ProblemDetails, PROBLEM_PLACE_NOT_FOUND};
/// use axum::http::StatusCode;
///
/// let problem = ProblemDetails::new(PROBLEM_PLACE_NOT_FOUND, "Place Not Found", StatusCode::NOT_FOUND)
///     .with_detail("No place near (19.05, -98.28)")
///     .with_request_id("req-12345");
/// assert_eq!(problem.status, 404);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProblemDetails {
    /// Relative URI identifying the problem type.
    #[serde(rename = "type")]
    pub type_uri: String,

    pub title: String,

    pub status: u16,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,

    /// Request id of the failing call.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instance: Option<String>,

    /// Why a route was not produced; only set on route-not-found problems.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<RouteFailure>,

    /// Similar place names offered for an unmatched name search.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub suggestions: Vec<String>,

    /// Always `application/problem+json`.
    pub content_type: String,
}

impl ProblemDetails {
    pub fn new(type_uri: impl Into<String>, title: impl Into<String>, status: StatusCode) -> Self {
        Self {
            type_uri: type_uri.into(),
            title: title.into(),
            status: status.as_u16(),
            detail: None,
            instance: None,
            reason: None,
            suggestions: Vec::new(),
            content_type: "application/problem+json".to_string(),
        }
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    pub fn with_request_id(mut self, request_id: impl Into<String>) -> Self {
        self.instance = Some(request_id.into());
        self
    }

    /// 400 for invalid input.
    pub fn bad_request(detail: impl Into<String>, request_id: impl Into<String>) -> Self {
        Self::new(
            PROBLEM_INVALID_REQUEST,
            "Invalid Request",
            StatusCode::BAD_REQUEST,
        )
        .with_detail(detail)
        .with_request_id(request_id)
    }

    /// 404 carrying the route failure reason.
    pub fn route_not_found(reason: RouteFailure, request_id: impl Into<String>) -> Self {
        let mut problem = Self::new(
            PROBLEM_ROUTE_NOT_FOUND,
            "Route Not Found",
            StatusCode::NOT_FOUND,
        )
        .with_detail(reason.to_string())
        .with_request_id(request_id);
        problem.reason = Some(reason);
        problem
    }

    /// 500 for a path without its reverse record.
    pub fn inconsistent_graph(from: PlaceId, to: PlaceId, request_id: impl Into<String>) -> Self {
        Self::new(
            PROBLEM_INCONSISTENT_GRAPH,
            "Inconsistent Graph",
            StatusCode::INTERNAL_SERVER_ERROR,
        )
        .with_detail(format!(
            "Path {from} -> {to} has no reverse path {to} -> {from}"
        ))
        .with_request_id(request_id)
    }

    /// 404 for a position or name that matched no place.
    pub fn place_not_found(
        detail: impl Into<String>,
        suggestions: &[String],
        request_id: impl Into<String>,
    ) -> Self {
        let mut problem = Self::new(
            PROBLEM_PLACE_NOT_FOUND,
            "Place Not Found",
            StatusCode::NOT_FOUND,
        )
        .with_detail(detail)
        .with_request_id(request_id);
        problem.suggestions = suggestions.to_vec();
        problem
    }

    pub fn internal_error(detail: impl Into<String>, request_id: impl Into<String>) -> Self {
        Self::new(
            PROBLEM_INTERNAL_ERROR,
            "Internal Error",
            StatusCode::INTERNAL_SERVER_ERROR,
        )
        .with_detail(detail)
        .with_request_id(request_id)
    }
}

impl std::fmt::Display for ProblemDetails {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}: {}",
            self.title,
            self.detail.as_deref().unwrap_or("")
        )
    }
}

impl std::error::Error for ProblemDetails {}

impl IntoResponse for ProblemDetails {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        let mut response = Json(&self).into_response();
        response.headers_mut().insert(
            axum::http::header::CONTENT_TYPE,
            axum::http::HeaderValue::from_static("application/problem+json"),
        );
        *response.status_mut() = status;
        response
    }
}

/// Map a library error to the problem returned to the caller.
pub fn from_lib_error(error: &LibError, request_id: &str) -> ProblemDetails {
    match error {
        LibError::RouteNotFound { reason } => ProblemDetails::route_not_found(*reason, request_id),
        LibError::InconsistentEdge { from, to } => {
            ProblemDetails::inconsistent_graph(*from, *to, request_id)
        }
        LibError::InvalidQuery { message } => ProblemDetails::bad_request(message.clone(), request_id),
        LibError::NoMatchingPlace { name, suggestions } => ProblemDetails::place_not_found(
            format!("No place matches '{name}'"),
            suggestions,
            request_id,
        ),
        LibError::Sqlite(_) | LibError::Io(_) => {
            ProblemDetails::internal_error("Place storage is unavailable", request_id)
        }
        _ => ProblemDetails::internal_error(error.to_string(), request_id),
    }
}
