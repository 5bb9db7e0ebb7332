//! CSV import of places and paths.
//!
//! Places use the header `id,name,latitude,longitude`. Paths use
//! `from,to,distance` with an optional `bidirectional` column; a true value
//! adds the reverse path with the same distance.

use std::fs::File;
use std::io::Read;
use std::path::Path as FsPath;

use csv::{ReaderBuilder, Trim};
use serde::Deserialize;
use tracing::info;

use crate::coordinate::Coordinate;
use crate::error::{Error, Result};
use crate::graph::{Graph, Place, PlaceId};

#[derive(Debug, Deserialize)]
struct PlaceRecord {
    id: i64,
    name: String,
    latitude: f64,
    longitude: f64,
}

/// One row of a paths file.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PathRecord {
    pub from: i64,
    pub to: i64,
    pub distance: f64,
    #[serde(default)]
    pub bidirectional: bool,
}

/// Parse and validate every row of a places file.
pub fn read_places_csv<R: Read>(reader: R) -> Result<Vec<Place>> {
    let mut csv_reader = ReaderBuilder::new().trim(Trim::Fields).from_reader(reader);

    let mut places = Vec::new();
    for record in csv_reader.deserialize::<PlaceRecord>() {
        let record = record?;
        let position = Coordinate::new(record.latitude, record.longitude);
        if !position.is_within_bounds() {
            return Err(Error::InvalidPlace {
                message: format!("place {} has out-of-range position {position}", record.id),
            });
        }
        places.push(Place::new(PlaceId(record.id), record.name, position)?);
    }
    Ok(places)
}

/// Parse every row of a paths file. Endpoint checks happen in [`import_csv`].
pub fn read_paths_csv<R: Read>(reader: R) -> Result<Vec<PathRecord>> {
    let mut csv_reader = ReaderBuilder::new()
        .trim(Trim::Fields)
        .flexible(true)
        .from_reader(reader);

    let mut paths = Vec::new();
    for record in csv_reader.deserialize::<PathRecord>() {
        paths.push(record?);
    }
    Ok(paths)
}

/// Build a validated graph from a places reader and a paths reader.
pub fn import_csv<P: Read, E: Read>(places: P, paths: E) -> Result<Graph> {
    let places = read_places_csv(places)?;
    let paths = read_paths_csv(paths)?;

    let mut builder = Graph::builder();
    for place in places {
        builder = builder.place(place);
    }
    for record in paths {
        builder = if record.bidirectional {
            builder.link_both(record.from, record.to, record.distance)
        } else {
            builder.link(record.from, record.to, record.distance)
        };
    }

    let graph = builder.build()?;
    info!(
        places = graph.len(),
        paths = graph.path_count(),
        "imported graph from csv"
    );
    Ok(graph)
}

/// [`import_csv`] over two files on disk.
pub fn import_csv_files(places: &FsPath, paths: &FsPath) -> Result<Graph> {
    import_csv(File::open(places)?, File::open(paths)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    const PLACES: &str = "id,name,latitude,longitude\n\
                          1, A ,10.0,10.0\n\
                          2,B,10.0,10.5\n\
                          3,C,10.5,10.5\n";

    #[test]
    fn reads_places_and_trims_fields() {
        let places = read_places_csv(PLACES.as_bytes()).unwrap();
        assert_eq!(places.len(), 3);
        assert_eq!(places[0].name(), "A");
        assert_eq!(places[1].position(), &Coordinate::new(10.0, 10.5));
    }

    #[test]
    fn bidirectional_column_is_optional() {
        let paths = "from,to,distance,bidirectional\n1,2,10.0,true\n2,3,5.0\n3,2,5.0,false\n";
        let graph = import_csv(PLACES.as_bytes(), paths.as_bytes()).unwrap();
        assert_eq!(graph.path_count(), 4);
        assert_eq!(graph.weight(PlaceId(2), PlaceId(1)), Some(10.0));
        assert_eq!(graph.weight(PlaceId(3), PlaceId(2)), Some(5.0));
    }

    #[test]
    fn rejects_out_of_range_latitude() {
        let places = "id,name,latitude,longitude\n1,Pole,89.0,0.0\n";
        assert!(matches!(
            read_places_csv(places.as_bytes()),
            Err(Error::InvalidPlace { .. })
        ));
    }

    #[test]
    fn malformed_rows_surface_as_csv_errors() {
        let places = "id,name,latitude,longitude\nnot-a-number,A,1.0,1.0\n";
        assert!(matches!(read_places_csv(places.as_bytes()), Err(Error::Csv(_))));
    }

    #[test]
    fn paths_to_unknown_places_fail() {
        let paths = "from,to,distance\n1,9,1.0\n";
        let err = import_csv(PLACES.as_bytes(), paths.as_bytes()).unwrap_err();
        assert!(matches!(err, Error::UnknownPlace { .. }));
    }
}
