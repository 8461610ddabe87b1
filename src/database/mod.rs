pub mod schema;

use crate::error::AppError;
use rusqlite::Connection;
use std::path::{Path, PathBuf};

/// Returns the path to the local database file.
///
/// `SERVETRACKER_DB` overrides the default location.
pub fn get_database_path() -> PathBuf {
    match std::env::var("SERVETRACKER_DB") {
        Ok(path) if !path.trim().is_empty() => PathBuf::from(path),
        _ => PathBuf::from("./data/servetracker.db"),
    }
}

/// Opens the local database and initializes the schema
pub fn init_database() -> Result<Connection, AppError> {
    init_database_at(&get_database_path())
}

/// Opens a database at an explicit path and initializes the schema
pub fn init_database_at(db_path: &Path) -> Result<Connection, AppError> {
    // Make sure the directory exists
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let conn = Connection::open(db_path)?;

    schema::init_schema(&conn)?;

    Ok(conn)
}
