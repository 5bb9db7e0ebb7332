#![allow(dead_code)]

use std::path::PathBuf;

use zekke_lib::{import_csv_files, Graph, SqliteGateway};

pub fn fixtures_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../docs/fixtures")
}

pub fn campus_graph() -> Graph {
    let dir = fixtures_dir();
    import_csv_files(&dir.join("campus_places.csv"), &dir.join("campus_paths.csv"))
        .expect("campus fixtures import")
}

pub fn campus_gateway() -> SqliteGateway {
    let gateway = SqliteGateway::in_memory().expect("in-memory database");
    gateway
        .insert_graph(&campus_graph())
        .expect("store campus graph");
    gateway
}
