//! ZeKKe library entry points.
//!
//! This crate stores named places and the paths between them, resolves
//! coordinates and names to places, and computes shortest routes. The
//! services and the CLI should only depend on the items exported here
//! instead of reimplementing behavior.

pub mod coordinate;
pub mod dataset;
pub mod db;
pub mod error;
pub mod gateway;
pub mod geocoder;
pub mod graph;
pub mod import;
pub mod path;
pub mod route;
pub mod routing;
pub mod spatial;

pub use coordinate::{BoundingBox, Coordinate, MAX_LATITUDE, MAX_LONGITUDE};
pub use dataset::{default_database_path, resolve_database_path, DATABASE_PATH_ENV};
pub use db::SqliteGateway;
pub use error::{Error, Result, RouteFailure};
pub use gateway::{AreaQuery, PlaceGateway, DEFAULT_AREA_LIMIT, POSITION_TOLERANCE_METERS};
pub use geocoder::{Geocoder, MAX_AREA_LIMIT};
pub use graph::{Graph, GraphBuilder, Path, PathId, Place, PlaceId};
pub use import::{import_csv, import_csv_files, read_paths_csv, read_places_csv, PathRecord};
pub use path::shortest_path;
pub use route::Route;
pub use routing::{RouteFinder, RouteFinderOptions};
pub use spatial::PlaceIndex;
