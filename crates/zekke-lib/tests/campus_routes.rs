mod common;

use zekke_lib::{
    Coordinate, Error, PlaceId, RouteFailure, RouteFinder, RouteFinderOptions,
};

use common::{campus_gateway, campus_graph};

const ACCESO_PRINCIPAL: (f64, f64) = (19.0568650105012, -98.2837209105492);
const SORTEO_UDLA: (f64, f64) = (19.0564036015444, -98.2824441790581);
const CIRIA_2: (f64, f64) = (19.0540128741435, -98.2830825448036);
const HUMANIDADES_3: (f64, f64) = (19.0528998938543, -98.2805827260017);
const BIBLIOTECA: (f64, f64) = (19.051, -98.279);

fn at((latitude, longitude): (f64, f64)) -> Coordinate {
    Coordinate::new(latitude, longitude)
}

fn ids(values: &[i64]) -> Vec<PlaceId> {
    values.iter().copied().map(PlaceId).collect()
}

#[test]
fn entrance_to_sorteo_follows_the_north_walkway() {
    let finder = RouteFinder::new(campus_graph());
    let route = finder
        .find_route(&at(ACCESO_PRINCIPAL), &at(SORTEO_UDLA))
        .expect("route exists");

    assert_eq!(route.place_ids(), ids(&[6, 7, 8, 9]));
    assert!((route.distance() - 159.06).abs() < 1e-9);
    assert_eq!(route.hop_count(), 3);
}

#[test]
fn entrance_to_ciria_goes_through_rectoria() {
    let finder = RouteFinder::new(campus_graph());
    let route = finder
        .find_route(&at(ACCESO_PRINCIPAL), &at(CIRIA_2))
        .expect("route exists");

    assert_eq!(route.place_ids(), ids(&[6, 7, 1, 40, 41, 129]));
    assert!((route.distance() - 421.18).abs() < 1e-9);
}

#[test]
fn entrance_to_humanidades_takes_the_east_loop() {
    let finder = RouteFinder::new(campus_graph());
    let route = finder
        .find_route(&at(ACCESO_PRINCIPAL), &at(HUMANIDADES_3))
        .expect("route exists");

    assert_eq!(route.place_ids(), ids(&[6, 7, 8, 9, 32, 33, 34]));
    assert!((route.distance() - 616.27).abs() < 1e-9);
}

#[test]
fn sqlite_and_memory_gateways_agree() {
    let graph = campus_graph();
    let gateway = campus_gateway();

    let in_memory = RouteFinder::new(&graph);
    let stored = RouteFinder::new(&gateway);
    let preloaded = RouteFinder::with_options(
        &gateway,
        RouteFinderOptions {
            preload: true,
            require_symmetric: true,
        },
    );

    for target in [SORTEO_UDLA, CIRIA_2, HUMANIDADES_3] {
        let expected = in_memory
            .find_route(&at(ACCESO_PRINCIPAL), &at(target))
            .expect("route exists");
        assert_eq!(
            stored.find_route(&at(ACCESO_PRINCIPAL), &at(target)).unwrap(),
            expected
        );
        assert_eq!(
            preloaded
                .find_route(&at(ACCESO_PRINCIPAL), &at(target))
                .unwrap(),
            expected
        );
    }
}

#[test]
fn nearby_coordinates_snap_to_a_place() {
    let finder = RouteFinder::new(campus_graph());
    // About 11 m north of Acceso Principal.
    let near_entrance = Coordinate::new(19.0569650105012, -98.2837209105492);
    let route = finder
        .find_route(&near_entrance, &at(SORTEO_UDLA))
        .expect("route exists");
    assert_eq!(route.root().map(|p| p.id()), Some(PlaceId(6)));
}

#[test]
fn isolated_library_is_unreachable() {
    let finder = RouteFinder::new(campus_graph());
    let err = finder
        .find_route(&at(ACCESO_PRINCIPAL), &at(BIBLIOTECA))
        .unwrap_err();
    assert!(matches!(
        err,
        Error::RouteNotFound {
            reason: RouteFailure::Unreachable
        }
    ));
}

#[test]
fn route_json_lists_places_root_first() {
    let finder = RouteFinder::new(campus_graph());
    let route = finder
        .find_route(&at(SORTEO_UDLA), &at(ACCESO_PRINCIPAL))
        .expect("route exists");
    let json = serde_json::to_value(&route).unwrap();

    assert_eq!(json["path"][0]["name"], "Sorteo UDLA");
    assert_eq!(json["path"][3]["name"], "Acceso Principal");
}
