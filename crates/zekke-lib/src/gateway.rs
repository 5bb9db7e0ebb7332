//! Read-only access to stored places and paths.
//!
//! The route finder and geocoder only talk to storage through
//! [`PlaceGateway`]. Two implementations ship with the library: the
//! in-memory [`Graph`](crate::graph::Graph) and the SQLite-backed
//! [`SqliteGateway`](crate::db::SqliteGateway).

use std::sync::Arc;

use crate::coordinate::Coordinate;
use crate::error::Result;
use crate::graph::{Path, Place, PlaceId};

/// Maximum distance in meters between a queried position and the place it
/// resolves to when no place sits at exactly that position.
pub const POSITION_TOLERANCE_METERS: f64 = 30.0;

/// Page size used by area searches when the caller does not pick one.
pub const DEFAULT_AREA_LIMIT: usize = 10;

/// Name search restricted to a circle around a center point.
#[derive(Debug, Clone, PartialEq)]
pub struct AreaQuery {
    /// Case-insensitive substring the name must contain.
    pub pattern: String,
    pub center: Coordinate,
    /// Radius in meters.
    pub radius: f64,
    pub offset: usize,
    pub limit: usize,
}

impl AreaQuery {
    pub fn new(pattern: impl Into<String>, center: Coordinate, radius: f64) -> Self {
        Self {
            pattern: pattern.into(),
            center,
            radius,
            offset: 0,
            limit: DEFAULT_AREA_LIMIT,
        }
    }

    pub fn with_page(mut self, offset: usize, limit: usize) -> Self {
        self.offset = offset;
        self.limit = limit;
        self
    }
}

/// Storage operations needed by the route finder and geocoder.
///
/// Implementations must not mutate data while a search is running.
pub trait PlaceGateway {
    /// Every stored place.
    fn list_places(&self) -> Result<Vec<Place>>;

    /// Every stored directed path.
    fn list_paths(&self) -> Result<Vec<Path>>;

    /// Places reachable from `id` by one outgoing path, ordered by id.
    fn outgoing_neighbors(&self, id: PlaceId) -> Result<Vec<Place>>;

    /// Distance of the directed path `from -> to`, if stored.
    fn edge_weight(&self, from: PlaceId, to: PlaceId) -> Result<Option<f64>>;

    /// Place at exactly `position`, otherwise the nearest place within
    /// [`POSITION_TOLERANCE_METERS`].
    fn find_place_by_position(&self, position: &Coordinate) -> Result<Option<Place>>;

    /// Places whose name contains `pattern` (case-insensitive), ordered by
    /// name then id.
    fn find_places_like_name(&self, pattern: &str) -> Result<Vec<Place>>;

    /// Names of places inside the query circle matching its pattern, nearest
    /// first, paginated by the query's offset and limit.
    fn find_names_in_area(&self, query: &AreaQuery) -> Result<Vec<String>>;
}

impl<G: PlaceGateway + ?Sized> PlaceGateway for &G {
    fn list_places(&self) -> Result<Vec<Place>> {
        (**self).list_places()
    }

    fn list_paths(&self) -> Result<Vec<Path>> {
        (**self).list_paths()
    }

    fn outgoing_neighbors(&self, id: PlaceId) -> Result<Vec<Place>> {
        (**self).outgoing_neighbors(id)
    }

    fn edge_weight(&self, from: PlaceId, to: PlaceId) -> Result<Option<f64>> {
        (**self).edge_weight(from, to)
    }

    fn find_place_by_position(&self, position: &Coordinate) -> Result<Option<Place>> {
        (**self).find_place_by_position(position)
    }

    fn find_places_like_name(&self, pattern: &str) -> Result<Vec<Place>> {
        (**self).find_places_like_name(pattern)
    }

    fn find_names_in_area(&self, query: &AreaQuery) -> Result<Vec<String>> {
        (**self).find_names_in_area(query)
    }
}

impl<G: PlaceGateway + ?Sized> PlaceGateway for Arc<G> {
    fn list_places(&self) -> Result<Vec<Place>> {
        (**self).list_places()
    }

    fn list_paths(&self) -> Result<Vec<Path>> {
        (**self).list_paths()
    }

    fn outgoing_neighbors(&self, id: PlaceId) -> Result<Vec<Place>> {
        (**self).outgoing_neighbors(id)
    }

    fn edge_weight(&self, from: PlaceId, to: PlaceId) -> Result<Option<f64>> {
        (**self).edge_weight(from, to)
    }

    fn find_place_by_position(&self, position: &Coordinate) -> Result<Option<Place>> {
        (**self).find_place_by_position(position)
    }

    fn find_places_like_name(&self, pattern: &str) -> Result<Vec<Place>> {
        (**self).find_places_like_name(pattern)
    }

    fn find_names_in_area(&self, query: &AreaQuery) -> Result<Vec<String>> {
        (**self).find_names_in_area(query)
    }
}

/// Case-insensitive substring match shared by every gateway.
pub(crate) fn matches_pattern(name: &str, pattern: &str) -> bool {
    name.to_lowercase().contains(&pattern.to_lowercase())
}

/// Order `(distance, name)` candidates nearest first (name breaks ties) and
/// cut the requested page.
pub(crate) fn paginate_names(mut candidates: Vec<(f64, String)>, query: &AreaQuery) -> Vec<String> {
    candidates.sort_by(|a, b| a.0.total_cmp(&b.0).then_with(|| a.1.cmp(&b.1)));
    candidates
        .into_iter()
        .skip(query.offset)
        .take(query.limit)
        .map(|(_, name)| name)
        .collect()
}
