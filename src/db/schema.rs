//! SQL DDL for all agmem tables.
//!
//! Defines the `memories` table, the `memories_fts` (FTS5) mirror, the
//! optional `memories_vec` (vec0) index, and the `meta` key/value table.
//! All DDL uses `IF NOT EXISTS` for idempotent initialization.

use rusqlite::Connection;

use crate::embedding::EMBEDDING_DIM;

/// Base schema DDL. The vec0 table is attempted separately because its
/// availability is a runtime capability, not a given.
const SCHEMA_SQL: &str = r#"
-- Core record storage. `hash` is the dedup key: one row per unique content.
CREATE TABLE IF NOT EXISTS memories (
    id           TEXT PRIMARY KEY,
    hash         TEXT NOT NULL,
    content      TEXT NOT NULL,
    digest       TEXT NOT NULL,
    tags         TEXT NOT NULL DEFAULT '[]',
    created_at   TEXT NOT NULL,
    updated_at   TEXT NOT NULL,
    access_count INTEGER NOT NULL DEFAULT 0
);

CREATE UNIQUE INDEX IF NOT EXISTS idx_memories_hash ON memories(hash);
CREATE INDEX IF NOT EXISTS idx_memories_created ON memories(created_at);

-- Standalone FTS5 table (not external-content): the TEXT primary key on
-- memories never has to round-trip through rowids.
CREATE VIRTUAL TABLE IF NOT EXISTS memories_fts USING fts5(
    id UNINDEXED,
    content,
    tags
);

-- Key/value metadata (schema version, embedding model provenance)
CREATE TABLE IF NOT EXISTS meta (
    key   TEXT PRIMARY KEY,
    value TEXT NOT NULL
);
"#;

/// Initialize all tables. Returns the vector capability: `false` when the
/// vec0 virtual table cannot be created in this build.
pub fn init_schema(conn: &Connection) -> rusqlite::Result<bool> {
    conn.execute_batch(SCHEMA_SQL)?;

    let vec_ddl = format!(
        "CREATE VIRTUAL TABLE IF NOT EXISTS memories_vec USING vec0(\n\
         id TEXT PRIMARY KEY,\n\
         embedding FLOAT[{EMBEDDING_DIM}]\n\
         )"
    );
    let vec_available = match conn.execute_batch(&vec_ddl) {
        Ok(()) => true,
        Err(err) => {
            tracing::warn!(%err, "sqlite-vec unavailable, vector search disabled");
            false
        }
    };

    // Set initial schema version if not already present
    conn.execute(
        "INSERT OR IGNORE INTO meta (key, value) VALUES ('schema_version', '1')",
        [],
    )?;

    Ok(vec_available)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schema_creates_all_tables() {
        crate::db::load_sqlite_vec();
        let conn = Connection::open_in_memory().unwrap();
        let vec_available = init_schema(&conn).unwrap();
        assert!(vec_available);

        let tables: Vec<String> = conn
            .prepare("SELECT name FROM sqlite_master WHERE type='table' ORDER BY name")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .collect::<Result<Vec<_>, _>>()
            .unwrap();

        assert!(tables.contains(&"memories".to_string()));
        assert!(tables.contains(&"meta".to_string()));
        assert!(tables.contains(&"memories_fts".to_string()));
        assert!(tables.contains(&"memories_vec".to_string()));

        let version: String = conn
            .query_row("SELECT vec_version()", [], |r| r.get(0))
            .unwrap();
        assert!(!version.is_empty());
    }

    #[test]
    fn schema_is_idempotent() {
        crate::db::load_sqlite_vec();
        let conn = Connection::open_in_memory().unwrap();
        init_schema(&conn).unwrap();
        init_schema(&conn).unwrap(); // second call should not error
    }

    #[test]
    fn hash_uniqueness_is_enforced() {
        crate::db::load_sqlite_vec();
        let conn = Connection::open_in_memory().unwrap();
        init_schema(&conn).unwrap();

        conn.execute(
            "INSERT INTO memories (id, hash, content, digest, created_at, updated_at) \
             VALUES ('a', 'h1', 'x', 'x', 't', 't')",
            [],
        )
        .unwrap();
        let dup = conn.execute(
            "INSERT INTO memories (id, hash, content, digest, created_at, updated_at) \
             VALUES ('b', 'h1', 'x', 'x', 't', 't')",
            [],
        );
        assert!(dup.is_err());
    }
}
