//! Query parameters and validation for the HTTP endpoints.

use axum::extract::rejection::QueryRejection;
use serde::{Deserialize, Serialize};

use zekke_lib::{
    AreaQuery, Coordinate, DEFAULT_AREA_LIMIT, MAX_AREA_LIMIT, MAX_LATITUDE, MAX_LONGITUDE,
};

use crate::ProblemDetails;

/// Validation trait for request types.
///
/// Returns a boxed `ProblemDetails` to keep the `Err` variant small.
pub trait Validate {
    fn validate(&self, request_id: &str) -> Result<(), Box<ProblemDetails>>;
}

/// Query string of `GET /api/v1/route-finder/route.json`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct RouteQuery {
    pub root_latitude: Option<f64>,
    pub root_longitude: Option<f64>,
    pub target_latitude: Option<f64>,
    pub target_longitude: Option<f64>,
}

impl RouteQuery {
    pub fn root(&self) -> Coordinate {
        Coordinate::normalize(self.root_latitude, self.root_longitude)
    }

    pub fn target(&self) -> Coordinate {
        Coordinate::normalize(self.target_latitude, self.target_longitude)
    }
}

impl Validate for RouteQuery {
    fn validate(&self, request_id: &str) -> Result<(), Box<ProblemDetails>> {
        check_latitude("root-latitude", self.root_latitude, request_id)?;
        check_longitude("root-longitude", self.root_longitude, request_id)?;
        check_latitude("target-latitude", self.target_latitude, request_id)?;
        check_longitude("target-longitude", self.target_longitude, request_id)
    }
}

/// Query string of the by-position lookup.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PositionQuery {
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

impl PositionQuery {
    pub fn position(&self) -> Coordinate {
        Coordinate::normalize(self.latitude, self.longitude)
    }
}

impl Validate for PositionQuery {
    fn validate(&self, request_id: &str) -> Result<(), Box<ProblemDetails>> {
        check_latitude("latitude", self.latitude, request_id)?;
        check_longitude("longitude", self.longitude, request_id)
    }
}

/// Query string of the in-area name search.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AreaParams {
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    /// Radius in meters.
    pub radius: Option<f64>,
    pub offset: Option<usize>,
    pub limit: Option<usize>,
}

impl AreaParams {
    /// Combine with the name taken from the path.
    pub fn to_area_query(&self, name: &str) -> AreaQuery {
        AreaQuery::new(
            name,
            Coordinate::normalize(self.latitude, self.longitude),
            self.radius.unwrap_or_default(),
        )
        .with_page(
            self.offset.unwrap_or(0),
            self.limit.unwrap_or(DEFAULT_AREA_LIMIT),
        )
    }
}

impl Validate for AreaParams {
    fn validate(&self, request_id: &str) -> Result<(), Box<ProblemDetails>> {
        check_latitude("latitude", self.latitude, request_id)?;
        check_longitude("longitude", self.longitude, request_id)?;

        match self.radius {
            None => return Err(missing("radius", request_id)),
            Some(radius) if !radius.is_finite() || radius <= 0.0 => {
                return Err(Box::new(ProblemDetails::bad_request(
                    "The 'radius' parameter must be a positive number of meters",
                    request_id,
                )));
            }
            Some(_) => {}
        }

        if let Some(limit) = self.limit {
            if limit == 0 || limit > MAX_AREA_LIMIT {
                return Err(Box::new(ProblemDetails::bad_request(
                    format!("The 'limit' parameter must be between 1 and {MAX_AREA_LIMIT}"),
                    request_id,
                )));
            }
        }
        Ok(())
    }
}

/// Reject blank or overlong names taken from a path segment.
pub fn validate_name(name: &str, request_id: &str) -> Result<(), Box<ProblemDetails>> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(Box::new(ProblemDetails::bad_request(
            "The place name cannot be empty",
            request_id,
        )));
    }
    if trimmed.chars().count() > zekke_lib::graph::MAX_NAME_LENGTH {
        return Err(Box::new(ProblemDetails::bad_request(
            format!(
                "The place name cannot exceed {} characters",
                zekke_lib::graph::MAX_NAME_LENGTH
            ),
            request_id,
        )));
    }
    Ok(())
}

/// Name part of a `{name}.json` path segment, `None` without the suffix.
pub fn strip_json_suffix(segment: &str) -> Option<&str> {
    segment.strip_suffix(".json")
}

/// Turn an undecodable query string into a 400 problem.
pub fn query_rejection(rejection: &QueryRejection, request_id: &str) -> ProblemDetails {
    ProblemDetails::bad_request(rejection.body_text(), request_id)
}

fn check_latitude(
    field: &str,
    value: Option<f64>,
    request_id: &str,
) -> Result<(), Box<ProblemDetails>> {
    check_range(field, value, MAX_LATITUDE, request_id)
}

fn check_longitude(
    field: &str,
    value: Option<f64>,
    request_id: &str,
) -> Result<(), Box<ProblemDetails>> {
    check_range(field, value, MAX_LONGITUDE, request_id)
}

fn check_range(
    field: &str,
    value: Option<f64>,
    limit: f64,
    request_id: &str,
) -> Result<(), Box<ProblemDetails>> {
    let Some(value) = value else {
        return Err(missing(field, request_id));
    };
    if !value.is_finite() || value.abs() > limit {
        return Err(Box::new(ProblemDetails::bad_request(
            format!("The '{field}' parameter must be between -{limit} and {limit}"),
            request_id,
        )));
    }
    Ok(())
}

fn missing(field: &str, request_id: &str) -> Box<ProblemDetails> {
    Box::new(ProblemDetails::bad_request(
        format!("The '{field}' parameter is required"),
        request_id,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn route_query() -> RouteQuery {
        RouteQuery {
            root_latitude: Some(19.0568650105012),
            root_longitude: Some(-98.2837209105492),
            target_latitude: Some(19.0564036015444),
            target_longitude: Some(-98.2824441790581),
        }
    }

    #[test]
    fn test_route_query_uses_kebab_case_names() {
        let query: RouteQuery = serde_json::from_value(serde_json::json!({
            "root-latitude": 1.0,
            "root-longitude": 2.0,
            "target-latitude": 3.0,
            "target-longitude": 4.0
        }))
        .unwrap();
        assert_eq!(query.root(), Coordinate::new(1.0, 2.0));
        assert_eq!(query.target(), Coordinate::new(3.0, 4.0));
    }

    #[test]
    fn test_route_query_valid() {
        assert!(route_query().validate("req").is_ok());
    }

    #[test]
    fn test_route_query_missing_parameter() {
        let query = RouteQuery {
            target_longitude: None,
            ..route_query()
        };
        let problem = query.validate("req-1").unwrap_err();
        assert_eq!(problem.status, 400);
        assert!(problem.detail.unwrap().contains("target-longitude"));
    }

    #[test]
    fn test_latitude_outside_mercator_band() {
        let query = RouteQuery {
            root_latitude: Some(86.0),
            ..route_query()
        };
        let problem = query.validate("req-2").unwrap_err();
        assert!(problem.detail.unwrap().contains("root-latitude"));

        let edge = RouteQuery {
            root_latitude: Some(-85.0),
            root_longitude: Some(180.0),
            ..route_query()
        };
        assert!(edge.validate("req-3").is_ok());
    }

    #[test]
    fn test_position_query_rejects_nan() {
        let query = PositionQuery {
            latitude: Some(f64::NAN),
            longitude: Some(0.0),
        };
        assert!(query.validate("req").is_err());
    }

    #[test]
    fn test_area_params_defaults_and_limits() {
        let params = AreaParams {
            latitude: Some(19.05),
            longitude: Some(-98.28),
            radius: Some(200.0),
            offset: None,
            limit: None,
        };
        assert!(params.validate("req").is_ok());
        let query = params.to_area_query("Estacionamiento");
        assert_eq!(query.limit, DEFAULT_AREA_LIMIT);
        assert_eq!(query.offset, 0);

        let too_many = AreaParams {
            limit: Some(MAX_AREA_LIMIT + 1),
            ..params.clone()
        };
        assert!(too_many.validate("req").is_err());

        let no_radius = AreaParams {
            radius: None,
            ..params
        };
        assert!(no_radius
            .validate("req")
            .unwrap_err()
            .detail
            .unwrap()
            .contains("radius"));
    }

    #[test]
    fn test_name_validation() {
        assert!(validate_name("Rectoria", "req").is_ok());
        assert!(validate_name("  ", "req").is_err());
        assert!(validate_name(&"x".repeat(101), "req").is_err());
    }

    #[test]
    fn test_strip_json_suffix() {
        assert_eq!(strip_json_suffix("Rectoria.json"), Some("Rectoria"));
        assert_eq!(strip_json_suffix("Rectoria"), None);
    }
}
