//! Application state shared by the service handlers.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use zekke_lib::{Error as LibError, Geocoder, Graph, RouteFinder, SqliteGateway};

/// Error during application state initialization.
#[derive(Debug)]
pub enum AppStateError {
    /// Database file not found.
    DatabaseNotFound(String),

    /// Opening or reading the database failed.
    GraphLoad(LibError),

    /// The graph has one-way paths and symmetric paths were required.
    InconsistentGraph(LibError),
}

impl std::fmt::Display for AppStateError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::DatabaseNotFound(path) => write!(f, "database not found: {}", path),
            Self::GraphLoad(e) => write!(f, "failed to load place graph: {}", e),
            Self::InconsistentGraph(e) => write!(f, "place graph rejected: {}", e),
        }
    }
}

impl std::error::Error for AppStateError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::GraphLoad(e) | Self::InconsistentGraph(e) => Some(e),
            Self::DatabaseNotFound(_) => None,
        }
    }
}

impl From<LibError> for AppStateError {
    fn from(err: LibError) -> Self {
        Self::GraphLoad(err)
    }
}

/// Startup options read from the environment.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StateOptions {
    /// Refuse to start when a path lacks its reverse record.
    pub require_symmetric: bool,
}

impl StateOptions {
    /// `ZEKKE_REQUIRE_SYMMETRIC`: `true`/`1` enables the symmetry check.
    pub fn from_env() -> Self {
        let require_symmetric = std::env::var("ZEKKE_REQUIRE_SYMMETRIC")
            .map(|v| parse_flag(&v))
            .unwrap_or(false);
        Self { require_symmetric }
    }
}

fn parse_flag(value: &str) -> bool {
    matches!(value.trim().to_lowercase().as_str(), "1" | "true" | "yes")
}

/// Shared application state for all axum handlers.
///
/// Holds an immutable graph snapshot taken at startup; clones are cheap.
///
/// ```ignore
/// use axum::{Router, routing::get, extract::State};
/// use zekke_service_shared::AppState;
///
/// async fn handler(State(state): State<AppState>) {
///     let places = state.graph().len();
/// }
///
/// let state = AppState::load("/data/zekke.db").unwrap();
/// let app = Router::new()
///     .route("/api/v1/route-finder/route.json", get(handler))
///     .with_state(state);
/// ```
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    graph: Graph,
    source: Option<PathBuf>,
}

impl AppState {
    /// Load the place graph from a SQLite database.
    pub fn load(db_path: impl AsRef<Path>) -> Result<Self, AppStateError> {
        Self::load_with_options(db_path, StateOptions::default())
    }

    pub fn load_with_options(
        db_path: impl AsRef<Path>,
        options: StateOptions,
    ) -> Result<Self, AppStateError> {
        let db_path = db_path.as_ref();

        if !db_path.exists() {
            return Err(AppStateError::DatabaseNotFound(
                db_path.display().to_string(),
            ));
        }

        tracing::info!(path = %db_path.display(), "loading place graph");
        let gateway = SqliteGateway::open(db_path)?;
        let graph = Graph::load(&gateway)?;

        if options.require_symmetric {
            graph
                .validate_symmetry()
                .map_err(AppStateError::InconsistentGraph)?;
        } else {
            let one_way = graph.asymmetric_paths().len();
            if one_way > 0 {
                tracing::warn!(
                    one_way,
                    "graph has paths without a reverse record; routes through them will fail"
                );
            }
        }

        tracing::info!(
            places = graph.len(),
            paths = graph.path_count(),
            "place graph loaded"
        );

        Ok(Self {
            inner: Arc::new(AppStateInner {
                graph,
                source: Some(db_path.to_path_buf()),
            }),
        })
    }

    /// Wrap an already built graph, mainly for tests.
    pub fn from_graph(graph: Graph) -> Self {
        Self {
            inner: Arc::new(AppStateInner {
                graph,
                source: None,
            }),
        }
    }

    pub fn graph(&self) -> &Graph {
        &self.inner.graph
    }

    /// Database the graph was loaded from, if any.
    pub fn source(&self) -> Option<&Path> {
        self.inner.source.as_deref()
    }

    pub fn route_finder(&self) -> RouteFinder<&Graph> {
        RouteFinder::new(&self.inner.graph)
    }

    pub fn geocoder(&self) -> Geocoder<&Graph> {
        Geocoder::new(&self.inner.graph)
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("place_count", &self.inner.graph.len())
            .field("path_count", &self.inner.graph.path_count())
            .field("source", &self.inner.source)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use zekke_lib::Coordinate;

    fn small_graph() -> Graph {
        Graph::builder()
            .place_at(1, "Rectoria", 19.0552, -98.284)
            .place_at(40, "Estacionamiento 5", 19.0549, -98.2838)
            .link_both(1, 40, 39.43)
            .build()
            .unwrap()
    }

    #[test]
    fn test_app_state_from_graph() {
        let state = AppState::from_graph(small_graph());
        assert_eq!(state.graph().len(), 2);
        assert!(state.source().is_none());

        let route = state
            .route_finder()
            .find_route(
                &Coordinate::new(19.0552, -98.284),
                &Coordinate::new(19.0549, -98.2838),
            )
            .unwrap();
        assert_eq!(route.hop_count(), 1);
    }

    #[test]
    fn test_app_state_debug() {
        let state = AppState::from_graph(small_graph());
        let debug = format!("{:?}", state);
        assert!(debug.contains("AppState"));
        assert!(debug.contains("place_count: 2"));
    }

    #[test]
    fn test_app_state_load_nonexistent() {
        match AppState::load("/nonexistent/path/to/zekke.db") {
            Err(AppStateError::DatabaseNotFound(path)) => assert!(path.contains("nonexistent")),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_app_state_error_display() {
        let err = AppStateError::DatabaseNotFound("/data/zekke.db".to_string());
        assert_eq!(err.to_string(), "database not found: /data/zekke.db");
    }

    #[test]
    fn test_parse_flag() {
        assert!(parse_flag("true"));
        assert!(parse_flag(" 1 "));
        assert!(parse_flag("YES"));
        assert!(!parse_flag("false"));
        assert!(!parse_flag(""));
    }
}
