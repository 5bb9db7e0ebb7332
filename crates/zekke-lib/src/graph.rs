use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::coordinate::Coordinate;
use crate::error::{Error, Result};
use crate::gateway::{
    matches_pattern, paginate_names, AreaQuery, PlaceGateway, POSITION_TOLERANCE_METERS,
};
use crate::spatial::PlaceIndex;

/// Longest place name accepted, in characters.
pub const MAX_NAME_LENGTH: usize = 100;

/// Numeric identifier for a place.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlaceId(pub i64);

impl fmt::Display for PlaceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for PlaceId {
    fn from(value: i64) -> Self {
        PlaceId(value)
    }
}

/// Numeric identifier for a path record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PathId(pub i64);

impl fmt::Display for PathId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A named location with a unique position.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Place {
    id: PlaceId,
    name: String,
    position: Coordinate,
}

impl Place {
    /// Validate and build a place.
    ///
    /// The name must be non-empty and at most [`MAX_NAME_LENGTH`] characters;
    /// the position must have both components.
    pub fn new(id: PlaceId, name: impl Into<String>, position: Coordinate) -> Result<Self> {
        let name = name.into();

        if name.trim().is_empty() {
            return Err(Error::InvalidPlace {
                message: format!("place {id} has an empty name"),
            });
        }
        let length = name.chars().count();
        if length > MAX_NAME_LENGTH {
            return Err(Error::InvalidPlace {
                message: format!(
                    "place {id} name has {length} characters (max {MAX_NAME_LENGTH})"
                ),
            });
        }
        if !position.is_complete() {
            return Err(Error::InvalidPlace {
                message: format!("place {id} has incomplete position {position}"),
            });
        }

        Ok(Self { id, name, position })
    }

    pub fn id(&self) -> PlaceId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn position(&self) -> &Coordinate {
        &self.position
    }
}

/// A directed, weighted connection between two places.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Path {
    id: PathId,
    from: PlaceId,
    to: PlaceId,
    distance: f64,
}

impl Path {
    /// Validate and build a path. The distance must be finite and
    /// non-negative and the endpoints must differ.
    pub fn new(id: PathId, from: PlaceId, to: PlaceId, distance: f64) -> Result<Self> {
        if from == to {
            return Err(Error::InvalidPath {
                message: format!("path {id} loops on place {from}"),
            });
        }
        if !distance.is_finite() || distance < 0.0 {
            return Err(Error::InvalidPathDistance { from, to, distance });
        }
        Ok(Self {
            id,
            from,
            to,
            distance,
        })
    }

    pub fn id(&self) -> PathId {
        self.id
    }

    pub fn from(&self) -> PlaceId {
        self.from
    }

    pub fn to(&self) -> PlaceId {
        self.to
    }

    pub fn distance(&self) -> f64 {
        self.distance
    }
}

#[derive(Debug, Clone)]
struct RawPlace {
    id: PlaceId,
    name: String,
    position: Coordinate,
}

#[derive(Debug, Clone, Copy)]
struct RawPath {
    id: PathId,
    from: PlaceId,
    to: PlaceId,
    distance: f64,
}

/// Accumulates places and paths, validating everything in [`GraphBuilder::build`].
#[derive(Debug)]
pub struct GraphBuilder {
    places: Vec<RawPlace>,
    paths: Vec<RawPath>,
    next_path_id: i64,
}

impl Default for GraphBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl GraphBuilder {
    pub fn new() -> Self {
        Self {
            places: Vec::new(),
            paths: Vec::new(),
            next_path_id: 1,
        }
    }

    /// Add an already validated place.
    pub fn place(mut self, place: Place) -> Self {
        self.places.push(RawPlace {
            id: place.id,
            name: place.name,
            position: place.position,
        });
        self
    }

    /// Add a place from raw parts; validated on build.
    pub fn place_at(mut self, id: i64, name: impl Into<String>, latitude: f64, longitude: f64) -> Self {
        self.places.push(RawPlace {
            id: PlaceId(id),
            name: name.into(),
            position: Coordinate::new(latitude, longitude),
        });
        self
    }

    /// Add an already validated path, keeping its identifier.
    pub fn path(mut self, path: Path) -> Self {
        self.next_path_id = self.next_path_id.max(path.id.0.saturating_add(1));
        self.paths.push(RawPath {
            id: path.id,
            from: path.from,
            to: path.to,
            distance: path.distance,
        });
        self
    }

    /// Add a directed path with the next free identifier.
    pub fn link(mut self, from: i64, to: i64, distance: f64) -> Self {
        let id = PathId(self.next_path_id);
        self.next_path_id += 1;
        self.paths.push(RawPath {
            id,
            from: PlaceId(from),
            to: PlaceId(to),
            distance,
        });
        self
    }

    /// Add a pair of directed paths with equal distance.
    pub fn link_both(self, a: i64, b: i64, distance: f64) -> Self {
        self.link(a, b, distance).link(b, a, distance)
    }

    /// Validate every record and freeze the arena.
    pub fn build(self) -> Result<Graph> {
        let mut places = BTreeMap::new();
        let mut positions = HashMap::new();
        for raw in self.places {
            let place = Place::new(raw.id, raw.name, raw.position)?;
            if places.contains_key(&place.id) {
                return Err(Error::DuplicatePlace { id: place.id });
            }
            if positions.insert(place.position, place.id).is_some() {
                return Err(Error::DuplicatePosition {
                    position: place.position,
                });
            }
            places.insert(place.id, place);
        }

        let mut paths = Vec::with_capacity(self.paths.len());
        let mut weights = HashMap::new();
        let mut path_ids = HashSet::new();
        for raw in self.paths {
            let path = Path::new(raw.id, raw.from, raw.to, raw.distance)?;
            for endpoint in [path.from, path.to] {
                if !places.contains_key(&endpoint) {
                    return Err(Error::UnknownPlace { id: endpoint });
                }
            }
            if !path_ids.insert(path.id) {
                return Err(Error::InvalidPath {
                    message: format!("duplicate path id {}", path.id),
                });
            }
            if weights.insert((path.from, path.to), path.distance).is_some() {
                return Err(Error::DuplicatePath {
                    from: path.from,
                    to: path.to,
                });
            }
            paths.push(path);
        }

        let mut outgoing: HashMap<PlaceId, Vec<usize>> = HashMap::new();
        for (slot, path) in paths.iter().enumerate() {
            outgoing.entry(path.from).or_default().push(slot);
        }
        for slots in outgoing.values_mut() {
            slots.sort_unstable_by_key(|&slot| paths[slot].to);
        }

        let index = PlaceIndex::build(places.values());
        debug!(
            places = places.len(),
            paths = paths.len(),
            "built place graph"
        );

        Ok(Graph {
            inner: Arc::new(GraphInner {
                places,
                paths,
                outgoing,
                weights,
                positions,
                index,
            }),
        })
    }
}

/// Immutable arena of places and paths addressed by identifier.
///
/// Records never point at each other; adjacency is resolved through the
/// arena. Cloning is cheap.
#[derive(Clone)]
pub struct Graph {
    inner: Arc<GraphInner>,
}

struct GraphInner {
    places: BTreeMap<PlaceId, Place>,
    paths: Vec<Path>,
    outgoing: HashMap<PlaceId, Vec<usize>>,
    weights: HashMap<(PlaceId, PlaceId), f64>,
    positions: HashMap<Coordinate, PlaceId>,
    index: PlaceIndex,
}

impl Graph {
    pub fn builder() -> GraphBuilder {
        GraphBuilder::new()
    }

    /// Snapshot every place and path exposed by a gateway.
    pub fn load<G: PlaceGateway + ?Sized>(gateway: &G) -> Result<Self> {
        let places = gateway.list_places()?;
        let paths = gateway.list_paths()?;
        let (place_count, path_count) = (places.len(), paths.len());

        let builder = places
            .into_iter()
            .fold(GraphBuilder::new(), GraphBuilder::place);
        let graph = paths.into_iter().fold(builder, GraphBuilder::path).build()?;

        info!(
            places = place_count,
            paths = path_count,
            "loaded graph snapshot"
        );
        Ok(graph)
    }

    pub fn len(&self) -> usize {
        self.inner.places.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.places.is_empty()
    }

    pub fn path_count(&self) -> usize {
        self.inner.paths.len()
    }

    pub fn place(&self, id: PlaceId) -> Option<&Place> {
        self.inner.places.get(&id)
    }

    /// All places ordered by identifier.
    pub fn places(&self) -> impl Iterator<Item = &Place> {
        self.inner.places.values()
    }

    pub fn paths(&self) -> &[Path] {
        &self.inner.paths
    }

    /// Paths leaving `id`, ordered by destination identifier.
    pub fn outgoing(&self, id: PlaceId) -> impl Iterator<Item = &Path> {
        self.inner
            .outgoing
            .get(&id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
            .iter()
            .map(move |&slot| &self.inner.paths[slot])
    }

    /// Paths arriving at `id`, ordered by origin identifier.
    pub fn incoming(&self, id: PlaceId) -> Vec<&Path> {
        let mut paths: Vec<&Path> = self.inner.paths.iter().filter(|p| p.to == id).collect();
        paths.sort_unstable_by_key(|p| p.from);
        paths
    }

    /// Distance of the directed path `from -> to`.
    pub fn weight(&self, from: PlaceId, to: PlaceId) -> Option<f64> {
        self.inner.weights.get(&(from, to)).copied()
    }

    /// Place stored at exactly this normalized position.
    pub fn place_at(&self, position: &Coordinate) -> Option<&Place> {
        self.inner
            .positions
            .get(position)
            .and_then(|id| self.inner.places.get(id))
    }

    /// Paths whose reverse record is missing, ordered by (from, to).
    pub fn asymmetric_paths(&self) -> Vec<&Path> {
        let mut missing: Vec<&Path> = self
            .inner
            .paths
            .iter()
            .filter(|p| !self.inner.weights.contains_key(&(p.to, p.from)))
            .collect();
        missing.sort_unstable_by_key(|p| (p.from, p.to));
        missing
    }

    /// Fail on the first path that lacks a reverse record.
    pub fn validate_symmetry(&self) -> Result<()> {
        let missing = self.asymmetric_paths();
        if let Some(first) = missing.first() {
            warn!(
                count = missing.len(),
                from = %first.from,
                to = %first.to,
                "graph has one-way paths"
            );
            return Err(Error::InconsistentEdge {
                from: first.from,
                to: first.to,
            });
        }
        Ok(())
    }

    /// Places within `radius` meters of `center`, nearest first.
    pub fn places_within(&self, center: &Coordinate, radius: f64) -> Vec<(&Place, f64)> {
        self.inner
            .index
            .within(center, radius)
            .into_iter()
            .filter_map(|(id, distance)| self.place(id).map(|place| (place, distance)))
            .collect()
    }
}

impl fmt::Debug for Graph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Graph")
            .field("places", &self.inner.places.len())
            .field("paths", &self.inner.paths.len())
            .finish()
    }
}

impl PlaceGateway for Graph {
    fn list_places(&self) -> Result<Vec<Place>> {
        Ok(self.places().cloned().collect())
    }

    fn list_paths(&self) -> Result<Vec<Path>> {
        Ok(self.inner.paths.clone())
    }

    fn outgoing_neighbors(&self, id: PlaceId) -> Result<Vec<Place>> {
        Ok(self
            .outgoing(id)
            .filter_map(|path| self.place(path.to))
            .cloned()
            .collect())
    }

    fn edge_weight(&self, from: PlaceId, to: PlaceId) -> Result<Option<f64>> {
        Ok(self.weight(from, to))
    }

    fn find_place_by_position(&self, position: &Coordinate) -> Result<Option<Place>> {
        if let Some(place) = self.place_at(position) {
            return Ok(Some(place.clone()));
        }
        Ok(self
            .inner
            .index
            .nearest_within(position, POSITION_TOLERANCE_METERS)
            .and_then(|(id, _)| self.place(id))
            .cloned())
    }

    fn find_places_like_name(&self, pattern: &str) -> Result<Vec<Place>> {
        let mut matches: Vec<Place> = self
            .places()
            .filter(|place| matches_pattern(place.name(), pattern))
            .cloned()
            .collect();
        matches.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        Ok(matches)
    }

    fn find_names_in_area(&self, query: &AreaQuery) -> Result<Vec<String>> {
        let candidates = self
            .places_within(&query.center, query.radius)
            .into_iter()
            .filter(|(place, _)| matches_pattern(place.name(), &query.pattern))
            .map(|(place, distance)| (distance, place.name.clone()))
            .collect();
        Ok(paginate_names(candidates, query))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn triangle() -> Graph {
        Graph::builder()
            .place_at(1, "A", 0.0, 0.0)
            .place_at(2, "B", 0.0, 0.001)
            .place_at(3, "C", 0.001, 0.0)
            .link_both(1, 2, 10.0)
            .link_both(2, 3, 10.0)
            .link_both(1, 3, 5.0)
            .build()
            .expect("graph builds")
    }

    #[test]
    fn place_rejects_bad_names() {
        let at = Coordinate::new(1.0, 1.0);
        assert!(matches!(
            Place::new(PlaceId(1), "  ", at),
            Err(Error::InvalidPlace { .. })
        ));
        assert!(Place::new(PlaceId(1), "x".repeat(MAX_NAME_LENGTH), at).is_ok());
        assert!(matches!(
            Place::new(PlaceId(1), "x".repeat(MAX_NAME_LENGTH + 1), at),
            Err(Error::InvalidPlace { .. })
        ));
        assert!(matches!(
            Place::new(PlaceId(1), "A", Coordinate::normalize(Some(1.0), None)),
            Err(Error::InvalidPlace { .. })
        ));
    }

    #[test]
    fn path_rejects_bad_distances() {
        let (a, b) = (PlaceId(1), PlaceId(2));
        assert!(Path::new(PathId(1), a, b, 0.0).is_ok());
        assert!(matches!(
            Path::new(PathId(1), a, b, -1.0),
            Err(Error::InvalidPathDistance { .. })
        ));
        assert!(matches!(
            Path::new(PathId(1), a, b, f64::INFINITY),
            Err(Error::InvalidPathDistance { .. })
        ));
        assert!(matches!(
            Path::new(PathId(1), a, a, 1.0),
            Err(Error::InvalidPath { .. })
        ));
    }

    #[test]
    fn builder_enforces_unique_positions() {
        let result = Graph::builder()
            .place_at(1, "A", 1.0, 1.0)
            .place_at(2, "B", 1.0, 1.0)
            .build();
        assert!(matches!(result, Err(Error::DuplicatePosition { .. })));
    }

    #[test]
    fn builder_enforces_unique_ids_and_pairs() {
        let result = Graph::builder()
            .place_at(1, "A", 1.0, 1.0)
            .place_at(1, "B", 2.0, 2.0)
            .build();
        assert!(matches!(result, Err(Error::DuplicatePlace { id }) if id == PlaceId(1)));

        let result = Graph::builder()
            .place_at(1, "A", 1.0, 1.0)
            .place_at(2, "B", 2.0, 2.0)
            .link(1, 2, 1.0)
            .link(1, 2, 2.0)
            .build();
        assert!(matches!(result, Err(Error::DuplicatePath { .. })));
    }

    #[test]
    fn builder_rejects_dangling_paths() {
        let result = Graph::builder()
            .place_at(1, "A", 1.0, 1.0)
            .link(1, 9, 1.0)
            .build();
        assert!(matches!(result, Err(Error::UnknownPlace { id }) if id == PlaceId(9)));
    }

    #[test]
    fn adjacency_is_resolved_through_the_arena() {
        let graph = triangle();
        let targets: Vec<_> = graph.outgoing(PlaceId(1)).map(|p| p.to()).collect();
        assert_eq!(targets, vec![PlaceId(2), PlaceId(3)]);

        let sources: Vec<_> = graph.incoming(PlaceId(3)).iter().map(|p| p.from()).collect();
        assert_eq!(sources, vec![PlaceId(1), PlaceId(2)]);

        assert_eq!(graph.weight(PlaceId(3), PlaceId(1)), Some(5.0));
        assert_eq!(graph.weight(PlaceId(3), PlaceId(3)), None);
        assert_eq!(graph.path_count(), 6);
    }

    #[test]
    fn symmetry_check_reports_first_one_way_path() {
        assert!(triangle().validate_symmetry().is_ok());

        let graph = Graph::builder()
            .place_at(1, "A", 1.0, 1.0)
            .place_at(2, "B", 2.0, 2.0)
            .place_at(3, "C", 3.0, 3.0)
            .link(2, 3, 1.0)
            .link_both(1, 2, 1.0)
            .build()
            .unwrap();
        assert_eq!(graph.asymmetric_paths().len(), 1);
        assert!(matches!(
            graph.validate_symmetry(),
            Err(Error::InconsistentEdge { from, to }) if from == PlaceId(2) && to == PlaceId(3)
        ));
    }

    #[test]
    fn link_ids_follow_explicit_paths() {
        let explicit = Path::new(PathId(40), PlaceId(1), PlaceId(2), 1.0).unwrap();
        let graph = Graph::builder()
            .place_at(1, "A", 1.0, 1.0)
            .place_at(2, "B", 2.0, 2.0)
            .path(explicit)
            .link(2, 1, 1.0)
            .build()
            .unwrap();
        let ids: Vec<_> = graph.paths().iter().map(|p| p.id()).collect();
        assert_eq!(ids, vec![PathId(40), PathId(41)]);
    }

    #[test]
    fn position_lookup_prefers_exact_match() {
        let graph = triangle();
        let found = graph
            .find_place_by_position(&Coordinate::new(0.0, 0.001))
            .unwrap()
            .unwrap();
        assert_eq!(found.id(), PlaceId(2));

        // ~11 m east of A
        let near = graph
            .find_place_by_position(&Coordinate::new(0.0, 0.0001))
            .unwrap()
            .unwrap();
        assert_eq!(near.id(), PlaceId(1));

        let far = graph
            .find_place_by_position(&Coordinate::new(1.0, 1.0))
            .unwrap();
        assert!(far.is_none());
    }

    #[test]
    fn load_round_trips_through_gateway() {
        let graph = triangle();
        let copy = Graph::load(&graph).unwrap();
        assert_eq!(copy.len(), 3);
        assert_eq!(copy.paths(), graph.paths());
    }

    #[test]
    fn largest_path_id_does_not_overflow_builder() {
        let path = Path::new(PathId(i64::MAX), PlaceId(1), PlaceId(2), 5.0).unwrap();
        let graph = Graph::builder()
            .place_at(1, "A", 0.0, 0.0)
            .place_at(2, "B", 0.0, 0.001)
            .path(path)
            .build()
            .unwrap();
        assert_eq!(graph.weight(PlaceId(1), PlaceId(2)), Some(5.0));
        assert_eq!(graph.paths()[0].id(), PathId(i64::MAX));
    }
}
