//! KD-tree over place positions for nearest and radius lookups.
//!
//! Positions are projected onto the unit sphere so straight-line (chord)
//! distance grows monotonically with great-circle distance. The tree narrows
//! the candidates; final distances always come from
//! [`Coordinate::great_circle_distance`] so every gateway reports the same
//! numbers.

use kiddo::float::kdtree::KdTree;
use kiddo::SquaredEuclidean;
use tracing::debug;

use crate::coordinate::{Coordinate, METERS_PER_DEGREE};
use crate::graph::{Place, PlaceId};

/// KD-tree bucket size (kiddo default).
const BUCKET_SIZE: usize = 32;

/// Candidates pulled from the tree before exact distances decide the winner.
const NEAREST_CANDIDATES: usize = 8;

/// Slack added to chord radii so float rounding never drops a boundary hit.
const CHORD_SLACK: f64 = 1e-9;

struct IndexNode {
    id: PlaceId,
    position: Coordinate,
}

/// Spatial index over place positions.
pub struct PlaceIndex {
    tree: KdTree<f64, usize, 3, BUCKET_SIZE, u32>,
    nodes: Vec<IndexNode>,
}

impl PlaceIndex {
    /// Index every place with a complete position.
    pub fn build<'a>(places: impl IntoIterator<Item = &'a Place>) -> Self {
        let mut tree: KdTree<f64, usize, 3, BUCKET_SIZE, u32> = KdTree::new();
        let mut nodes = Vec::new();

        for place in places {
            let Some(point) = place.position().unit_vector() else {
                continue;
            };
            tree.add(&point, nodes.len());
            nodes.push(IndexNode {
                id: place.id(),
                position: *place.position(),
            });
        }

        debug!(node_count = nodes.len(), "built place index");
        Self { tree, nodes }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Nearest place to `position`, with its distance in meters.
    ///
    /// Equal distances resolve to the lowest id.
    pub fn nearest(&self, position: &Coordinate) -> Option<(PlaceId, f64)> {
        let point = position.unit_vector()?;
        if self.nodes.is_empty() {
            return None;
        }

        self.tree
            .nearest_n::<SquaredEuclidean>(&point, NEAREST_CANDIDATES)
            .into_iter()
            .filter_map(|neighbour| self.measure(neighbour.item, position))
            .min_by(|a, b| a.1.total_cmp(&b.1).then_with(|| a.0.cmp(&b.0)))
    }

    /// Nearest place no further than `tolerance` meters away.
    pub fn nearest_within(&self, position: &Coordinate, tolerance: f64) -> Option<(PlaceId, f64)> {
        self.nearest(position)
            .filter(|(_, distance)| *distance <= tolerance)
    }

    /// Every place within `radius` meters, sorted by distance then id.
    pub fn within(&self, center: &Coordinate, radius: f64) -> Vec<(PlaceId, f64)> {
        let Some(point) = center.unit_vector() else {
            return Vec::new();
        };
        if !radius.is_finite() || radius < 0.0 || self.nodes.is_empty() {
            return Vec::new();
        }

        let chord = chord_length(radius) + CHORD_SLACK;
        let mut hits: Vec<(PlaceId, f64)> = self
            .tree
            .within::<SquaredEuclidean>(&point, chord * chord)
            .into_iter()
            .filter_map(|neighbour| self.measure(neighbour.item, center))
            .filter(|(_, distance)| *distance <= radius)
            .collect();

        hits.sort_by(|a, b| a.1.total_cmp(&b.1).then_with(|| a.0.cmp(&b.0)));
        hits
    }

    fn measure(&self, slot: usize, from: &Coordinate) -> Option<(PlaceId, f64)> {
        let node = self.nodes.get(slot)?;
        let distance = node.position.great_circle_distance(from)?;
        Some((node.id, distance))
    }
}

/// Straight-line distance on the unit sphere spanning `meters` of arc.
fn chord_length(meters: f64) -> f64 {
    let angle = (meters / METERS_PER_DEGREE).to_radians();
    if angle >= std::f64::consts::PI {
        return 2.0;
    }
    2.0 * (angle / 2.0).sin()
}

impl std::fmt::Debug for PlaceIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlaceIndex")
            .field("node_count", &self.nodes.len())
            .finish()
    }
}
