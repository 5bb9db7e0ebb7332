use std::collections::HashMap;

use serde::Serialize;

use crate::error::{Error, Result, RouteFailure};
use crate::graph::{Place, PlaceId};

/// Result of a successful search: total distance and the places visited,
/// ordered from root to target.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Route {
    distance: f64,
    path: Vec<Place>,
}

impl Route {
    /// Zero-distance route containing a single place.
    pub fn single(place: Place) -> Self {
        Self {
            distance: 0.0,
            path: vec![place],
        }
    }

    /// Total distance, the sum of the traversed path weights.
    pub fn distance(&self) -> f64 {
        self.distance
    }

    /// Places from root to target.
    pub fn path(&self) -> &[Place] {
        &self.path
    }

    pub fn into_path(self) -> Vec<Place> {
        self.path
    }

    /// Number of paths traversed.
    pub fn hop_count(&self) -> usize {
        self.path.len().saturating_sub(1)
    }

    pub fn root(&self) -> Option<&Place> {
        self.path.first()
    }

    pub fn target(&self) -> Option<&Place> {
        self.path.last()
    }

    pub fn place_ids(&self) -> Vec<PlaceId> {
        self.path.iter().map(Place::id).collect()
    }
}

/// Rebuild the route to `target` by following predecessor links back to
/// `root`.
///
/// When `root == target` the predecessor map is not consulted. A chain that
/// breaks before reaching `root`, loops, or a non-finite distance means the
/// target was never reached.
pub fn reconstruct_route(
    root: PlaceId,
    target: PlaceId,
    target_distance: f64,
    predecessors: &HashMap<PlaceId, PlaceId>,
    nodes: &HashMap<PlaceId, Place>,
) -> Result<Route> {
    let lookup = |id: PlaceId| nodes.get(&id).cloned().ok_or(Error::UnknownPlace { id });

    if root == target {
        return Ok(Route::single(lookup(root)?));
    }

    if !target_distance.is_finite() {
        return Err(Error::route_not_found(RouteFailure::Unreachable));
    }

    let mut ids = vec![target];
    let mut current = target;
    while current != root {
        let Some(&previous) = predecessors.get(&current) else {
            return Err(Error::route_not_found(RouteFailure::Unreachable));
        };
        if ids.len() > nodes.len() {
            return Err(Error::route_not_found(RouteFailure::Unreachable));
        }
        ids.push(previous);
        current = previous;
    }
    ids.reverse();

    let path = ids.into_iter().map(lookup).collect::<Result<Vec<_>>>()?;
    Ok(Route {
        distance: target_distance,
        path,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coordinate::Coordinate;

    fn nodes(count: i64) -> HashMap<PlaceId, Place> {
        (1..=count)
            .map(|id| {
                let place = Place::new(
                    PlaceId(id),
                    format!("P{id}"),
                    Coordinate::new(id as f64, 0.0),
                )
                .unwrap();
                (PlaceId(id), place)
            })
            .collect()
    }

    #[test]
    fn same_root_and_target_ignores_predecessors() {
        let nodes = nodes(2);
        let mut predecessors = HashMap::new();
        predecessors.insert(PlaceId(1), PlaceId(2));

        let route = reconstruct_route(PlaceId(1), PlaceId(1), 0.0, &predecessors, &nodes).unwrap();
        assert_eq!(route.place_ids(), vec![PlaceId(1)]);
        assert_eq!(route.distance(), 0.0);
        assert_eq!(route.hop_count(), 0);
    }

    #[test]
    fn walks_back_and_orders_root_first() {
        let nodes = nodes(4);
        let predecessors = HashMap::from([
            (PlaceId(3), PlaceId(2)),
            (PlaceId(2), PlaceId(1)),
            (PlaceId(4), PlaceId(1)),
        ]);

        let route = reconstruct_route(PlaceId(1), PlaceId(3), 15.0, &predecessors, &nodes).unwrap();
        assert_eq!(route.place_ids(), vec![PlaceId(1), PlaceId(2), PlaceId(3)]);
        assert_eq!(route.distance(), 15.0);
        assert_eq!(route.root().map(Place::id), Some(PlaceId(1)));
        assert_eq!(route.target().map(Place::id), Some(PlaceId(3)));
    }

    #[test]
    fn broken_chain_is_unreachable() {
        let nodes = nodes(3);
        let predecessors = HashMap::from([(PlaceId(3), PlaceId(2))]);
        let err = reconstruct_route(PlaceId(1), PlaceId(3), 5.0, &predecessors, &nodes).unwrap_err();
        assert!(matches!(
            err,
            Error::RouteNotFound {
                reason: RouteFailure::Unreachable
            }
        ));
    }

    #[test]
    fn cycles_do_not_hang() {
        let nodes = nodes(3);
        let predecessors = HashMap::from([(PlaceId(3), PlaceId(2)), (PlaceId(2), PlaceId(3))]);
        assert!(reconstruct_route(PlaceId(1), PlaceId(3), 5.0, &predecessors, &nodes).is_err());
    }

    #[test]
    fn infinite_distance_never_escapes() {
        let nodes = nodes(2);
        let predecessors = HashMap::from([(PlaceId(2), PlaceId(1))]);
        let err =
            reconstruct_route(PlaceId(1), PlaceId(2), f64::INFINITY, &predecessors, &nodes)
                .unwrap_err();
        assert!(matches!(err, Error::RouteNotFound { .. }));
    }

    #[test]
    fn serializes_distance_and_path() {
        let nodes = nodes(1);
        let route = reconstruct_route(PlaceId(1), PlaceId(1), 0.0, &HashMap::new(), &nodes).unwrap();
        let json = serde_json::to_value(&route).unwrap();
        assert_eq!(json["distance"], 0.0);
        assert_eq!(json["path"][0]["name"], "P1");
        assert_eq!(json["path"][0]["position"]["latitude"], 1.0);
    }
}
