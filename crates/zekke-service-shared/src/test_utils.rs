//! Fixtures for handler tests: a state built from the campus CSV fixtures.

use std::path::PathBuf;
use std::sync::OnceLock;

use zekke_lib::import_csv_files;

use crate::state::AppState;

/// Directory holding `campus_places.csv` and `campus_paths.csv`.
pub const FIXTURE_DIR: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/../../docs/fixtures");

static TEST_STATE: OnceLock<AppState> = OnceLock::new();

/// Shared state over the campus fixture graph, built once per process.
///
/// # Panics
///
/// Panics if the fixtures cannot be imported.
pub fn test_state() -> AppState {
    TEST_STATE
        .get_or_init(|| {
            let dir = PathBuf::from(FIXTURE_DIR);
            let graph = import_csv_files(
                &dir.join("campus_places.csv"),
                &dir.join("campus_paths.csv"),
            )
            .unwrap_or_else(|e| panic!("failed to import fixtures from {:?}: {}", dir, e));
            AppState::from_graph(graph)
        })
        .clone()
}

/// Coordinates of fixture places.
pub mod fixture_places {
    pub const ACCESO_PRINCIPAL: (f64, f64) = (19.0568650105012, -98.2837209105492);
    pub const SORTEO_UDLA: (f64, f64) = (19.0564036015444, -98.2824441790581);
    pub const RECTORIA: (f64, f64) = (19.0552, -98.284);
    pub const CIRIA_2: (f64, f64) = (19.0540128741435, -98.2830825448036);
    /// Has no paths.
    pub const BIBLIOTECA: (f64, f64) = (19.051, -98.279);
    /// Center used for the parking area searches.
    pub const PARKING_CENTER: (f64, f64) = (19.05351, -98.28321);
}
