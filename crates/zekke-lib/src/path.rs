use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap, HashSet};

use tracing::debug;

use crate::error::{Error, Result, RouteFailure};
use crate::gateway::PlaceGateway;
use crate::graph::{Place, PlaceId};
use crate::route::{reconstruct_route, Route};

/// Run a label-setting (Dijkstra) search from `root` to `target`.
///
/// All state is scoped to this call. Neighbours come from
/// [`PlaceGateway::outgoing_neighbors`], but the weight used to relax
/// `u -> v` is the stored distance of the reverse path `v -> u`; a missing
/// reverse path fails the search with [`Error::InconsistentEdge`]. The
/// frontier is a binary heap ordered by `(distance, place id)`, so among
/// equally distant candidates the lowest id is settled first.
pub fn shortest_path<G: PlaceGateway + ?Sized>(
    gateway: &G,
    root: &Place,
    target: &Place,
) -> Result<Route> {
    let nodes: HashMap<PlaceId, Place> = gateway
        .list_places()?
        .into_iter()
        .map(|place| (place.id(), place))
        .collect();

    for place in [root, target] {
        if !nodes.contains_key(&place.id()) {
            return Err(Error::UnknownPlace { id: place.id() });
        }
    }

    let (start, goal) = (root.id(), target.id());
    if start == goal {
        return reconstruct_route(start, goal, 0.0, &HashMap::new(), &nodes);
    }

    let mut distances: HashMap<PlaceId, f64> = HashMap::new();
    let mut predecessors: HashMap<PlaceId, PlaceId> = HashMap::new();
    let mut settled: HashSet<PlaceId> = HashSet::new();
    let mut queue = BinaryHeap::new();

    distances.insert(start, 0.0);
    queue.push(QueueEntry::new(start, 0.0));

    while let Some(entry) = queue.pop() {
        let current = entry.node;
        if !settled.insert(current) {
            continue;
        }
        let current_distance = entry.cost.0;

        if current == goal {
            debug!(settled = settled.len(), distance = current_distance, "target settled");
            return reconstruct_route(start, goal, current_distance, &predecessors, &nodes);
        }

        for neighbour in gateway.outgoing_neighbors(current)? {
            let next = neighbour.id();
            if !nodes.contains_key(&next) || settled.contains(&next) {
                continue;
            }

            let weight = gateway
                .edge_weight(next, current)?
                .ok_or(Error::InconsistentEdge {
                    from: current,
                    to: next,
                })?;
            if !weight.is_finite() || weight < 0.0 {
                return Err(Error::InvalidPathDistance {
                    from: next,
                    to: current,
                    distance: weight,
                });
            }

            let next_cost = current_distance + weight;
            if next_cost < *distances.get(&next).unwrap_or(&f64::INFINITY) {
                distances.insert(next, next_cost);
                predecessors.insert(next, current);
                queue.push(QueueEntry::new(next, next_cost));
            }
        }
    }

    debug!(settled = settled.len(), "frontier exhausted before target");
    Err(Error::route_not_found(RouteFailure::Unreachable))
}

#[derive(Copy, Clone, Debug, Default)]
struct FloatOrd(f64);

impl PartialEq for FloatOrd {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for FloatOrd {}

impl PartialOrd for FloatOrd {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for FloatOrd {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
struct QueueEntry {
    node: PlaceId,
    cost: FloatOrd,
}

impl QueueEntry {
    fn new(node: PlaceId, cost: f64) -> Self {
        Self {
            node,
            cost: FloatOrd(cost),
        }
    }
}

impl Ord for QueueEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reverse ordering so BinaryHeap becomes a min-heap by (cost, id).
        other
            .cost
            .cmp(&self.cost)
            .then_with(|| other.node.cmp(&self.node))
    }
}

impl PartialOrd for QueueEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::Graph;

    fn place(graph: &Graph, id: i64) -> Place {
        graph.place(PlaceId(id)).cloned().unwrap()
    }

    fn square() -> Graph {
        Graph::builder()
            .place_at(1, "A", 0.0, 0.0)
            .place_at(2, "B", 0.0, 1.0)
            .place_at(3, "C", 1.0, 0.0)
            .place_at(4, "D", 1.0, 1.0)
            .link_both(1, 2, 1.0)
            .link_both(1, 3, 1.0)
            .link_both(2, 4, 1.0)
            .link_both(3, 4, 1.0)
            .build()
            .unwrap()
    }

    #[test]
    fn heap_pops_lowest_cost_then_lowest_id() {
        let mut heap = BinaryHeap::new();
        heap.push(QueueEntry::new(PlaceId(5), 2.0));
        heap.push(QueueEntry::new(PlaceId(3), 1.0));
        heap.push(QueueEntry::new(PlaceId(1), 1.0));
        heap.push(QueueEntry::new(PlaceId(2), 0.5));

        let order: Vec<_> = std::iter::from_fn(|| heap.pop().map(|e| e.node.0)).collect();
        assert_eq!(order, vec![2, 1, 3, 5]);
    }

    #[test]
    fn equal_cost_routes_resolve_to_lowest_id() {
        let graph = square();
        for _ in 0..5 {
            let route = shortest_path(&graph, &place(&graph, 1), &place(&graph, 4)).unwrap();
            assert_eq!(route.place_ids(), vec![PlaceId(1), PlaceId(2), PlaceId(4)]);
            assert_eq!(route.distance(), 2.0);
        }
    }

    #[test]
    fn relaxation_reads_reverse_weight() {
        let graph = Graph::builder()
            .place_at(1, "A", 0.0, 0.0)
            .place_at(2, "B", 0.0, 1.0)
            .link(1, 2, 100.0)
            .link(2, 1, 1.0)
            .build()
            .unwrap();
        let route = shortest_path(&graph, &place(&graph, 1), &place(&graph, 2)).unwrap();
        assert_eq!(route.distance(), 1.0);
    }

    #[test]
    fn missing_reverse_path_is_inconsistent() {
        let graph = Graph::builder()
            .place_at(1, "A", 0.0, 0.0)
            .place_at(2, "B", 0.0, 1.0)
            .link(1, 2, 3.0)
            .build()
            .unwrap();
        let err = shortest_path(&graph, &place(&graph, 1), &place(&graph, 2)).unwrap_err();
        assert!(matches!(
            err,
            Error::InconsistentEdge { from, to } if from == PlaceId(1) && to == PlaceId(2)
        ));
    }

    #[test]
    fn exhausted_frontier_is_unreachable() {
        let graph = Graph::builder()
            .place_at(1, "A", 0.0, 0.0)
            .place_at(2, "B", 0.0, 1.0)
            .place_at(3, "C", 1.0, 1.0)
            .link_both(1, 2, 3.0)
            .build()
            .unwrap();
        let err = shortest_path(&graph, &place(&graph, 1), &place(&graph, 3)).unwrap_err();
        assert!(matches!(
            err,
            Error::RouteNotFound {
                reason: RouteFailure::Unreachable
            }
        ));
    }

    #[test]
    fn zero_weight_paths_are_allowed() {
        let graph = Graph::builder()
            .place_at(1, "A", 0.0, 0.0)
            .place_at(2, "B", 0.0, 1.0)
            .place_at(3, "C", 1.0, 1.0)
            .link_both(1, 2, 0.0)
            .link_both(2, 3, 2.5)
            .build()
            .unwrap();
        let route = shortest_path(&graph, &place(&graph, 1), &place(&graph, 3)).unwrap();
        assert_eq!(route.distance(), 2.5);
        assert_eq!(route.hop_count(), 2);
    }
}
