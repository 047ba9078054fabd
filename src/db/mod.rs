pub mod meta;
pub mod migrations;
pub mod schema;

use anyhow::{Context, Result};
use rusqlite::Connection;
use sqlite_vec::sqlite3_vec_init;
use std::path::Path;
use std::sync::Once;

static SQLITE_VEC_INIT: Once = Once::new();

/// Register the sqlite-vec extension globally. Safe to call multiple times.
pub fn load_sqlite_vec() {
    SQLITE_VEC_INIT.call_once(|| unsafe {
        rusqlite::ffi::sqlite3_auto_extension(Some(std::mem::transmute(
            sqlite3_vec_init as *const (),
        )));
    });
}

/// An open store: the SQLite connection plus the vector capability flag.
///
/// `vec_available` is resolved once at open time — when false, search runs
/// keyword-only and indexing commands fail explicitly. Components check this
/// flag rather than probing for the vec0 table.
pub struct Database {
    pub conn: Connection,
    pub vec_available: bool,
}

/// Open (or create) the agmem database at the given path, with extensions
/// loaded and schema initialized.
pub fn open_database(path: impl AsRef<Path>) -> Result<Database> {
    let path = path.as_ref();

    // Ensure parent directory exists
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create directory {}", parent.display()))?;
    }

    load_sqlite_vec();

    let conn = Connection::open(path)
        .with_context(|| format!("failed to open database at {}", path.display()))?;

    // Enable WAL mode for better concurrent read performance
    conn.pragma_update(None, "journal_mode", "WAL")?;
    conn.pragma_update(None, "foreign_keys", "ON")?;

    let vec_available = schema::init_schema(&conn).context("failed to initialize schema")?;
    migrations::run_migrations(&conn).context("failed to run migrations")?;

    tracing::info!(path = %path.display(), vec_available, "database initialized");
    Ok(Database {
        conn,
        vec_available,
    })
}

/// Open an in-memory database for testing.
#[cfg(test)]
pub fn open_memory_database() -> Result<Database> {
    load_sqlite_vec();
    let conn = Connection::open_in_memory().context("failed to open in-memory database")?;
    conn.pragma_update(None, "foreign_keys", "ON")?;
    let vec_available = schema::init_schema(&conn).context("failed to initialize schema")?;
    Ok(Database {
        conn,
        vec_available,
    })
}
