use std::env;
use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use tracing::debug;

use crate::error::{Error, Result};

/// Default filename for the place database.
const DATABASE_FILENAME: &str = "zekke.db";

/// Environment variable that overrides the database location.
pub const DATABASE_PATH_ENV: &str = "ZEKKE_DATABASE_PATH";

/// Resolve the default database location using platform-specific project directories.
pub fn default_database_path() -> Result<PathBuf> {
    let dirs = ProjectDirs::from("com", "zekke", "zekke").ok_or(Error::ProjectDirsUnavailable)?;
    Ok(dirs.data_dir().join(DATABASE_FILENAME))
}

/// Pick the database to use.
///
/// Precedence: an explicit path, then `ZEKKE_DATABASE_PATH`, then
/// [`default_database_path`].
pub fn resolve_database_path(explicit: Option<&Path>) -> Result<PathBuf> {
    if let Some(path) = explicit {
        debug!(path = %path.display(), "using explicit database path");
        return Ok(path.to_path_buf());
    }

    if let Some(value) = env::var_os(DATABASE_PATH_ENV).filter(|v| !v.is_empty()) {
        let path = PathBuf::from(value);
        debug!(path = %path.display(), "using database path from environment");
        return Ok(path);
    }

    default_database_path()
}
