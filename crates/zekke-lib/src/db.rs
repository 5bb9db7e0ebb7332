use std::fmt;
use std::path::{Path as FsPath, PathBuf};
use std::sync::Mutex;

use rusqlite::{params, Connection, OptionalExtension, Row};
use tracing::{debug, info};

use crate::coordinate::Coordinate;
use crate::error::{Error, Result};
use crate::gateway::{
    matches_pattern, paginate_names, AreaQuery, PlaceGateway, POSITION_TOLERANCE_METERS,
};
use crate::graph::{Graph, Path, PathId, Place, PlaceId};

const PLACE_TABLE: &str = "place";
const PATH_TABLE: &str = "path";

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS place (
    id INTEGER PRIMARY KEY,
    name TEXT NOT NULL CHECK (length(trim(name)) >= 1 AND length(name) <= 100),
    latitude REAL NOT NULL,
    longitude REAL NOT NULL,
    UNIQUE (latitude, longitude)
);
CREATE TABLE IF NOT EXISTS path (
    id INTEGER PRIMARY KEY,
    from_place_id INTEGER NOT NULL REFERENCES place (id),
    to_place_id INTEGER NOT NULL REFERENCES place (id),
    distance REAL NOT NULL CHECK (distance >= 0),
    UNIQUE (from_place_id, to_place_id)
);
CREATE INDEX IF NOT EXISTS place_position_idx ON place (latitude, longitude);
";

/// Place gateway backed by a SQLite database.
///
/// Reads never modify the database. The write helpers exist for import
/// tooling and tests.
pub struct SqliteGateway {
    connection: Mutex<Connection>,
    source: Option<PathBuf>,
}

impl SqliteGateway {
    /// Open an existing database that already holds the place and path tables.
    pub fn open(db_path: &FsPath) -> Result<Self> {
        if !db_path.exists() {
            return Err(Error::DatabaseNotFound {
                path: db_path.to_path_buf(),
            });
        }

        let connection = Connection::open(db_path)?;
        if !has_schema(&connection)? {
            return Err(Error::UnsupportedSchema);
        }
        debug!(path = %db_path.display(), "opened place database");

        Ok(Self::wrap(connection, Some(db_path.to_path_buf())))
    }

    /// Open or create a database file and make sure the tables exist.
    pub fn create(db_path: &FsPath) -> Result<Self> {
        if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let connection = Connection::open(db_path)?;
        let gateway = Self::wrap(connection, Some(db_path.to_path_buf()));
        gateway.initialize_schema()?;
        Ok(gateway)
    }

    /// Fresh in-memory database with the schema applied.
    pub fn in_memory() -> Result<Self> {
        let gateway = Self::wrap(Connection::open_in_memory()?, None);
        gateway.initialize_schema()?;
        Ok(gateway)
    }

    fn wrap(connection: Connection, source: Option<PathBuf>) -> Self {
        Self {
            connection: Mutex::new(connection),
            source,
        }
    }

    /// File backing this gateway, `None` for in-memory databases.
    pub fn source(&self) -> Option<&FsPath> {
        self.source.as_deref()
    }

    /// Create the place and path tables when missing.
    pub fn initialize_schema(&self) -> Result<()> {
        self.with_connection(|connection| {
            connection.execute_batch("PRAGMA foreign_keys = ON;")?;
            connection.execute_batch(SCHEMA)?;
            Ok(())
        })
    }

    pub fn insert_place(&self, place: &Place) -> Result<()> {
        let (latitude, longitude) = place_components(place)?;
        self.with_connection(|connection| {
            connection.execute(
                "INSERT INTO place (id, name, latitude, longitude) VALUES (?1, ?2, ?3, ?4)",
                params![place.id().0, place.name(), latitude, longitude],
            )?;
            Ok(())
        })
    }

    pub fn insert_path(&self, path: &Path) -> Result<()> {
        self.with_connection(|connection| {
            connection.execute(
                "INSERT INTO path (id, from_place_id, to_place_id, distance) VALUES (?1, ?2, ?3, ?4)",
                params![path.id().0, path.from().0, path.to().0, path.distance()],
            )?;
            Ok(())
        })
    }

    /// Store every place and path of `graph` in one transaction.
    pub fn insert_graph(&self, graph: &Graph) -> Result<()> {
        self.with_connection(|connection| {
            let tx = connection.transaction()?;
            {
                let mut place_stmt = tx.prepare(
                    "INSERT INTO place (id, name, latitude, longitude) VALUES (?1, ?2, ?3, ?4)",
                )?;
                for place in graph.places() {
                    let (latitude, longitude) = place_components(place)?;
                    place_stmt.execute(params![place.id().0, place.name(), latitude, longitude])?;
                }

                let mut path_stmt = tx.prepare(
                    "INSERT INTO path (id, from_place_id, to_place_id, distance) VALUES (?1, ?2, ?3, ?4)",
                )?;
                for path in graph.paths() {
                    path_stmt.execute(params![
                        path.id().0,
                        path.from().0,
                        path.to().0,
                        path.distance()
                    ])?;
                }
            }
            tx.commit()?;
            Ok(())
        })?;

        info!(
            places = graph.len(),
            paths = graph.path_count(),
            "stored graph"
        );
        Ok(())
    }

    fn with_connection<T>(&self, f: impl FnOnce(&mut Connection) -> Result<T>) -> Result<T> {
        // A panic while holding the lock leaves the connection itself usable.
        let mut guard = self
            .connection
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        f(&mut guard)
    }

    fn query_places(&self, sql: &str, params: impl rusqlite::Params) -> Result<Vec<Place>> {
        self.with_connection(|connection| {
            let mut stmt = connection.prepare(sql)?;
            let rows = stmt.query_map(params, row_to_place)?;

            let mut places = Vec::new();
            for row in rows {
                places.push(validate_row(row?)?);
            }
            Ok(places)
        })
    }

    fn places_near(&self, center: &Coordinate, radius: f64) -> Result<Vec<(Place, f64)>> {
        let Some(bbox) = center.bounding_box(radius) else {
            return Ok(Vec::new());
        };

        let candidates = if bbox.wraps_longitude() {
            self.query_places(
                "SELECT id, name, latitude, longitude FROM place
                 WHERE latitude BETWEEN ?1 AND ?2",
                params![bbox.min_latitude, bbox.max_latitude],
            )?
        } else {
            self.query_places(
                "SELECT id, name, latitude, longitude FROM place
                 WHERE latitude BETWEEN ?1 AND ?2 AND longitude BETWEEN ?3 AND ?4",
                params![
                    bbox.min_latitude,
                    bbox.max_latitude,
                    bbox.min_longitude,
                    bbox.max_longitude
                ],
            )?
        };

        let mut hits: Vec<(Place, f64)> = candidates
            .into_iter()
            .filter_map(|place| {
                let distance = place.position().great_circle_distance(center)?;
                (distance <= radius).then_some((place, distance))
            })
            .collect();
        hits.sort_by(|a, b| a.1.total_cmp(&b.1).then_with(|| a.0.id().cmp(&b.0.id())));
        Ok(hits)
    }
}

impl fmt::Debug for SqliteGateway {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SqliteGateway")
            .field("source", &self.source)
            .finish()
    }
}

impl PlaceGateway for SqliteGateway {
    fn list_places(&self) -> Result<Vec<Place>> {
        self.query_places(
            "SELECT id, name, latitude, longitude FROM place ORDER BY id",
            [],
        )
    }

    fn list_paths(&self) -> Result<Vec<Path>> {
        self.with_connection(|connection| {
            let mut stmt = connection.prepare(
                "SELECT id, from_place_id, to_place_id, distance FROM path ORDER BY id",
            )?;
            let rows = stmt.query_map([], |row| {
                Ok((
                    PathId(row.get(0)?),
                    PlaceId(row.get(1)?),
                    PlaceId(row.get(2)?),
                    row.get::<_, f64>(3)?,
                ))
            })?;

            let mut paths = Vec::new();
            for row in rows {
                let (id, from, to, distance) = row?;
                paths.push(Path::new(id, from, to, distance)?);
            }
            Ok(paths)
        })
    }

    fn outgoing_neighbors(&self, id: PlaceId) -> Result<Vec<Place>> {
        self.query_places(
            "SELECT p.id, p.name, p.latitude, p.longitude
             FROM path e JOIN place p ON p.id = e.to_place_id
             WHERE e.from_place_id = ?1
             ORDER BY p.id",
            [id.0],
        )
    }

    fn edge_weight(&self, from: PlaceId, to: PlaceId) -> Result<Option<f64>> {
        self.with_connection(|connection| {
            let weight = connection
                .query_row(
                    "SELECT distance FROM path WHERE from_place_id = ?1 AND to_place_id = ?2",
                    [from.0, to.0],
                    |row| row.get::<_, f64>(0),
                )
                .optional()?;
            Ok(weight)
        })
    }

    fn find_place_by_position(&self, position: &Coordinate) -> Result<Option<Place>> {
        let Some((latitude, longitude)) = position.components() else {
            return Ok(None);
        };

        let exact = self.query_places(
            "SELECT id, name, latitude, longitude FROM place
             WHERE latitude = ?1 AND longitude = ?2",
            params![latitude, longitude],
        )?;
        if let Some(place) = exact.into_iter().next() {
            return Ok(Some(place));
        }

        Ok(self
            .places_near(position, POSITION_TOLERANCE_METERS)?
            .into_iter()
            .next()
            .map(|(place, _)| place))
    }

    fn find_places_like_name(&self, pattern: &str) -> Result<Vec<Place>> {
        let places = self.query_places(
            "SELECT id, name, latitude, longitude FROM place ORDER BY name, id",
            [],
        )?;
        Ok(places
            .into_iter()
            .filter(|place| matches_pattern(place.name(), pattern))
            .collect())
    }

    fn find_names_in_area(&self, query: &AreaQuery) -> Result<Vec<String>> {
        let candidates = self
            .places_near(&query.center, query.radius)?
            .into_iter()
            .filter(|(place, _)| matches_pattern(place.name(), &query.pattern))
            .map(|(place, distance)| (distance, place.name().to_string()))
            .collect();
        Ok(paginate_names(candidates, query))
    }
}

fn place_components(place: &Place) -> Result<(f64, f64)> {
    place
        .position()
        .components()
        .ok_or_else(|| Error::InvalidPlace {
            message: format!("place {} has incomplete position", place.id()),
        })
}

struct PlaceRow {
    id: i64,
    name: String,
    latitude: f64,
    longitude: f64,
}

fn row_to_place(row: &Row<'_>) -> rusqlite::Result<PlaceRow> {
    Ok(PlaceRow {
        id: row.get(0)?,
        name: row.get(1)?,
        latitude: row.get(2)?,
        longitude: row.get(3)?,
    })
}

/// Stored rows must satisfy the same rules as imported places.
fn validate_row(row: PlaceRow) -> Result<Place> {
    Place::new(
        PlaceId(row.id),
        row.name,
        Coordinate::new(row.latitude, row.longitude),
    )
}

fn has_schema(connection: &Connection) -> Result<bool> {
    Ok(
        table_has_columns(connection, PLACE_TABLE, &["id", "name", "latitude", "longitude"])?
            && table_has_columns(
                connection,
                PATH_TABLE,
                &["id", "from_place_id", "to_place_id", "distance"],
            )?,
    )
}

fn table_has_columns(connection: &Connection, table: &str, required: &[&str]) -> Result<bool> {
    let pragma = format!("PRAGMA table_info('{table}')");
    let mut stmt = connection.prepare(&pragma)?;
    let mut rows = stmt.query([])?;

    let mut columns = Vec::new();
    while let Some(row) = rows.next()? {
        let name: String = row.get(1)?;
        columns.push(name);
    }

    Ok(!columns.is_empty()
        && required.iter().all(|required| {
            columns
                .iter()
                .any(|column| column.eq_ignore_ascii_case(required))
        }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seeded() -> SqliteGateway {
        let graph = Graph::builder()
            .place_at(1, "A", 10.0, 10.0)
            .place_at(2, "B", 10.0, 10.5)
            .place_at(3, "C", 10.5, 10.5)
            .link_both(1, 2, 10.0)
            .link_both(2, 3, 5.0)
            .build()
            .unwrap();
        let gateway = SqliteGateway::in_memory().unwrap();
        gateway.insert_graph(&graph).unwrap();
        gateway
    }

    #[test]
    fn reads_back_inserted_records() {
        let gateway = seeded();
        assert_eq!(gateway.list_places().unwrap().len(), 3);
        assert_eq!(gateway.list_paths().unwrap().len(), 4);
        assert_eq!(gateway.edge_weight(PlaceId(3), PlaceId(2)).unwrap(), Some(5.0));
        assert_eq!(gateway.edge_weight(PlaceId(1), PlaceId(3)).unwrap(), None);

        let neighbours: Vec<_> = gateway
            .outgoing_neighbors(PlaceId(2))
            .unwrap()
            .iter()
            .map(Place::id)
            .collect();
        assert_eq!(neighbours, vec![PlaceId(1), PlaceId(3)]);
    }

    #[test]
    fn schema_rejects_duplicate_positions() {
        let gateway = SqliteGateway::in_memory().unwrap();
        let a = Place::new(PlaceId(1), "A", Coordinate::new(1.0, 1.0)).unwrap();
        let b = Place::new(PlaceId(2), "B", Coordinate::new(1.0, 1.0)).unwrap();
        gateway.insert_place(&a).unwrap();
        assert!(matches!(gateway.insert_place(&b), Err(Error::Sqlite(_))));
    }

    #[test]
    fn exact_position_lookup() {
        let gateway = seeded();
        let place = gateway
            .find_place_by_position(&Coordinate::new(10.0, 10.5))
            .unwrap()
            .unwrap();
        assert_eq!(place.id(), PlaceId(2));
        assert!(gateway
            .find_place_by_position(&Coordinate::normalize(Some(10.0), None))
            .unwrap()
            .is_none());
    }

    #[test]
    fn open_requires_existing_file() {
        let err = SqliteGateway::open(FsPath::new("/nonexistent/zekke.db")).unwrap_err();
        assert!(matches!(err, Error::DatabaseNotFound { .. }));
    }

    #[test]
    fn open_rejects_foreign_schema() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("other.db");
        let connection = Connection::open(&db_path).unwrap();
        connection
            .execute_batch("CREATE TABLE something (id INTEGER PRIMARY KEY);")
            .unwrap();
        drop(connection);

        let err = SqliteGateway::open(&db_path).unwrap_err();
        assert!(matches!(err, Error::UnsupportedSchema));
    }
}
