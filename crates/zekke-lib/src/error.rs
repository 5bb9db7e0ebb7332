use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::coordinate::Coordinate;
use crate::graph::PlaceId;

/// Convenient result alias for the ZeKKe library.
pub type Result<T> = std::result::Result<T, Error>;

/// Reason a route could not be produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RouteFailure {
    /// The root coordinate did not resolve to a place.
    RootMissing,
    /// The target coordinate did not resolve to a place.
    TargetMissing,
    /// Neither coordinate resolved to a place.
    BothMissing,
    /// Both places exist but no chain of paths connects them.
    Unreachable,
}

impl RouteFailure {
    /// Stable label used in metrics and problem responses.
    pub fn as_str(self) -> &'static str {
        match self {
            RouteFailure::RootMissing => "root_missing",
            RouteFailure::TargetMissing => "target_missing",
            RouteFailure::BothMissing => "both_missing",
            RouteFailure::Unreachable => "unreachable",
        }
    }
}

impl fmt::Display for RouteFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            RouteFailure::RootMissing => "root position does not match any place",
            RouteFailure::TargetMissing => "target position does not match any place",
            RouteFailure::BothMissing => "neither position matches a place",
            RouteFailure::Unreachable => "target is not reachable from root",
        };
        f.write_str(text)
    }
}

/// Top-level library error type.
#[derive(Debug, Error)]
pub enum Error {
    /// No route could be produced between the requested coordinates.
    #[error("no route found: {reason}")]
    RouteNotFound { reason: RouteFailure },

    /// A path `from -> to` exists without the reverse record the search reads.
    #[error("path {from} -> {to} has no reverse path {to} -> {from}")]
    InconsistentEdge { from: PlaceId, to: PlaceId },

    /// Raised when place data fails validation.
    #[error("invalid place: {message}")]
    InvalidPlace { message: String },

    /// Raised when path data fails validation.
    #[error("invalid path: {message}")]
    InvalidPath { message: String },

    /// Raised when a stored distance is negative or not finite.
    #[error("path {from} -> {to} has invalid distance {distance}")]
    InvalidPathDistance {
        from: PlaceId,
        to: PlaceId,
        distance: f64,
    },

    /// Raised when two places share an identifier.
    #[error("duplicate place id {id}")]
    DuplicatePlace { id: PlaceId },

    /// Raised when two places share a position.
    #[error("duplicate place position {position}")]
    DuplicatePosition { position: Coordinate },

    /// Raised when a path references a place that does not exist.
    #[error("unknown place id {id}")]
    UnknownPlace { id: PlaceId },

    /// Raised when two paths share the same ordered endpoints.
    #[error("duplicate path {from} -> {to}")]
    DuplicatePath { from: PlaceId, to: PlaceId },

    /// Raised when a geocoder query is malformed.
    #[error("invalid query: {message}")]
    InvalidQuery { message: String },

    /// Raised when a name search matched nothing.
    #[error("no place matches '{name}'{}", format_suggestions(.suggestions))]
    NoMatchingPlace {
        name: String,
        suggestions: Vec<String>,
    },

    /// Database could not be located at the resolved path.
    #[error("database not found at {path}")]
    DatabaseNotFound { path: PathBuf },

    /// Raised when the database lacks the place/path tables.
    #[error("unsupported database schema; expected place and path tables")]
    UnsupportedSchema,

    /// No suitable project directories could be resolved for this platform.
    #[error("failed to resolve project directories for the place database")]
    ProjectDirsUnavailable,

    /// Wrapper for SQLite errors.
    #[error(transparent)]
    Sqlite(#[from] rusqlite::Error),

    /// Wrapper for IO errors.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Wrapper for CSV parsing errors.
    #[error(transparent)]
    Csv(#[from] csv::Error),
}

impl Error {
    /// Shorthand for a [`Error::RouteNotFound`] with the given reason.
    pub fn route_not_found(reason: RouteFailure) -> Self {
        Error::RouteNotFound { reason }
    }
}

fn format_suggestions(suggestions: &[String]) -> String {
    if suggestions.is_empty() {
        String::new()
    } else if suggestions.len() == 1 {
        format!(". Did you mean '{}'?", suggestions[0])
    } else {
        format!(
            ". Did you mean one of: {}?",
            suggestions
                .iter()
                .map(|s| format!("'{}'", s))
                .collect::<Vec<_>>()
                .join(", ")
        )
    }
}
