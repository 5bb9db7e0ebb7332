use tracing::{debug, debug_span, warn};

use crate::coordinate::Coordinate;
use crate::error::{Error, Result, RouteFailure};
use crate::gateway::PlaceGateway;
use crate::graph::{Graph, Place};
use crate::path::shortest_path;
use crate::route::Route;

/// Tuning knobs for [`RouteFinder`]. Results are identical in every mode.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RouteFinderOptions {
    /// Snapshot the whole gateway into a [`Graph`] before searching instead
    /// of querying it once per settled place.
    pub preload: bool,
    /// With `preload`, reject graphs containing one-way paths before the
    /// search starts.
    pub require_symmetric: bool,
}

/// Computes shortest routes between coordinates over a [`PlaceGateway`].
///
/// The finder keeps no state between calls, so a shared instance can serve
/// concurrent requests.
#[derive(Debug, Clone)]
pub struct RouteFinder<G> {
    gateway: G,
    options: RouteFinderOptions,
}

impl<G: PlaceGateway> RouteFinder<G> {
    pub fn new(gateway: G) -> Self {
        Self::with_options(gateway, RouteFinderOptions::default())
    }

    pub fn with_options(gateway: G, options: RouteFinderOptions) -> Self {
        Self { gateway, options }
    }

    pub fn options(&self) -> RouteFinderOptions {
        self.options
    }

    pub fn gateway(&self) -> &G {
        &self.gateway
    }

    /// Find the shortest route from the place at `root` to the place at
    /// `target`.
    ///
    /// Both coordinates are resolved with
    /// [`PlaceGateway::find_place_by_position`]. When they resolve to the
    /// same place the result is a zero-distance route holding that place.
    pub fn find_route(&self, root: &Coordinate, target: &Coordinate) -> Result<Route> {
        let _span = debug_span!("find_route", root = %root, target = %target).entered();
        let (root_place, target_place) = self.resolve(root, target)?;
        debug!(
            root = %root_place.id(),
            target = %target_place.id(),
            preload = self.options.preload,
            "resolved route endpoints"
        );

        if root_place.id() == target_place.id() {
            return Ok(Route::single(root_place));
        }

        let result = if self.options.preload {
            self.search_snapshot(&root_place, &target_place)
        } else {
            shortest_path(&self.gateway, &root_place, &target_place)
        };

        match &result {
            Ok(route) => debug!(
                hops = route.hop_count(),
                distance = route.distance(),
                "route found"
            ),
            Err(Error::InconsistentEdge { from, to }) => warn!(
                from = %from,
                to = %to,
                "path has no reverse record; fix the stored graph"
            ),
            Err(err) => debug!(error = %err, "route search failed"),
        }
        result
    }

    fn search_snapshot(&self, root: &Place, target: &Place) -> Result<Route> {
        let snapshot = Graph::load(&self.gateway)?;
        if self.options.require_symmetric {
            snapshot.validate_symmetry()?;
        }
        shortest_path(&snapshot, root, target)
    }

    fn resolve(&self, root: &Coordinate, target: &Coordinate) -> Result<(Place, Place)> {
        let root_place = self.gateway.find_place_by_position(root)?;
        let target_place = self.gateway.find_place_by_position(target)?;

        match (root_place, target_place) {
            (Some(root), Some(target)) => Ok((root, target)),
            (None, Some(_)) => Err(Error::route_not_found(RouteFailure::RootMissing)),
            (Some(_), None) => Err(Error::route_not_found(RouteFailure::TargetMissing)),
            (None, None) => Err(Error::route_not_found(RouteFailure::BothMissing)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::PlaceId;

    fn abc() -> Graph {
        Graph::builder()
            .place_at(1, "A", 10.0, 10.0)
            .place_at(2, "B", 10.0, 10.5)
            .place_at(3, "C", 10.5, 10.5)
            .place_at(4, "D", 20.0, 20.0)
            .link_both(1, 2, 10.0)
            .link_both(2, 3, 5.0)
            .build()
            .unwrap()
    }

    fn reason(err: Error) -> RouteFailure {
        match err {
            Error::RouteNotFound { reason } => reason,
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn finds_route_root_first() {
        let finder = RouteFinder::new(abc());
        let route = finder
            .find_route(&Coordinate::new(10.0, 10.0), &Coordinate::new(10.5, 10.5))
            .unwrap();
        assert_eq!(route.distance(), 15.0);
        assert_eq!(route.place_ids(), vec![PlaceId(1), PlaceId(2), PlaceId(3)]);
    }

    #[test]
    fn same_place_is_a_single_stop() {
        let finder = RouteFinder::new(abc());
        let at = Coordinate::new(20.0, 20.0);
        let route = finder.find_route(&at, &at).unwrap();
        assert_eq!(route.distance(), 0.0);
        assert_eq!(route.place_ids(), vec![PlaceId(4)]);
    }

    #[test]
    fn reports_which_endpoint_is_missing() {
        let finder = RouteFinder::new(abc());
        let known = Coordinate::new(10.0, 10.0);
        let unknown = Coordinate::new(-40.0, 60.0);

        assert_eq!(
            reason(finder.find_route(&unknown, &known).unwrap_err()),
            RouteFailure::RootMissing
        );
        assert_eq!(
            reason(finder.find_route(&known, &unknown).unwrap_err()),
            RouteFailure::TargetMissing
        );
        assert_eq!(
            reason(finder.find_route(&unknown, &unknown).unwrap_err()),
            RouteFailure::BothMissing
        );
    }

    #[test]
    fn incomplete_coordinates_do_not_resolve() {
        let finder = RouteFinder::new(abc());
        let partial = Coordinate::normalize(Some(10.0), None);
        assert_eq!(
            reason(finder.find_route(&partial, &Coordinate::new(10.0, 10.0)).unwrap_err()),
            RouteFailure::RootMissing
        );
    }

    #[test]
    fn disconnected_target_is_unreachable() {
        let finder = RouteFinder::new(abc());
        let err = finder
            .find_route(&Coordinate::new(10.0, 10.0), &Coordinate::new(20.0, 20.0))
            .unwrap_err();
        assert_eq!(reason(err), RouteFailure::Unreachable);
    }

    #[test]
    fn preload_matches_lazy_search() {
        let graph = abc();
        let lazy = RouteFinder::new(&graph);
        let eager = RouteFinder::with_options(
            &graph,
            RouteFinderOptions {
                preload: true,
                require_symmetric: true,
            },
        );
        let (root, target) = (Coordinate::new(10.5, 10.5), Coordinate::new(10.0, 10.0));
        assert_eq!(
            lazy.find_route(&root, &target).unwrap(),
            eager.find_route(&root, &target).unwrap()
        );
    }

    #[test]
    fn preload_can_reject_one_way_paths_up_front() {
        let graph = Graph::builder()
            .place_at(1, "A", 0.0, 0.0)
            .place_at(2, "B", 0.0, 1.0)
            .place_at(3, "C", 1.0, 1.0)
            .link_both(1, 2, 1.0)
            .link(3, 2, 1.0)
            .build()
            .unwrap();
        let finder = RouteFinder::with_options(
            &graph,
            RouteFinderOptions {
                preload: true,
                require_symmetric: true,
            },
        );
        let err = finder
            .find_route(&Coordinate::new(0.0, 0.0), &Coordinate::new(0.0, 1.0))
            .unwrap_err();
        assert!(matches!(err, Error::InconsistentEdge { .. }));

        // Without the up-front check the one-way path is never touched.
        let lazy = RouteFinder::new(&graph);
        assert!(lazy
            .find_route(&Coordinate::new(0.0, 0.0), &Coordinate::new(0.0, 1.0))
            .is_ok());
    }
}
