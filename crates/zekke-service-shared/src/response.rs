//! Success wrapper for HTTP responses.

use axum::{
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

/// Successful payload flattened next to a `content_type` field, mirroring
/// the shape of [`ProblemDetails`](crate::ProblemDetails).
///
/// ```
/// use zekke_service_shared::ServiceResponse;
/// use serde::Serialize;
///
/// #[derive(Serialize)]
/// struct Names {
///     names: Vec<String>,
/// }
///
/// let response = ServiceResponse::new(Names { names: vec!["Rectoria".into()] });
/// assert_eq!(response.content_type, "application/json");
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceResponse<T> {
    #[serde(flatten)]
    pub data: T,

    pub content_type: String,
}

impl<T> ServiceResponse<T> {
    pub fn new(data: T) -> Self {
        Self {
            data,
            content_type: "application/json".to_string(),
        }
    }
}

impl<T> From<T> for ServiceResponse<T> {
    fn from(data: T) -> Self {
        Self::new(data)
    }
}

impl<T: Serialize> IntoResponse for ServiceResponse<T> {
    fn into_response(self) -> Response {
        Json(self).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
    struct Names {
        names: Vec<String>,
    }

    #[test]
    fn test_payload_is_flattened() {
        let response = ServiceResponse::new(Names {
            names: vec!["Estacionamiento 6".to_string()],
        });
        let json = serde_json::to_value(&response).unwrap();

        assert_eq!(json["names"][0], "Estacionamiento 6");
        assert_eq!(json["content_type"], "application/json");
        assert!(json.get("data").is_none());
    }

    #[test]
    fn test_response_from_payload() {
        let names = Names { names: Vec::new() };
        let response: ServiceResponse<Names> = names.clone().into();
        assert_eq!(response.data, names);
    }
}
