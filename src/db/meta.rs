//! Key/value metadata table.
//!
//! Records index provenance — at minimum which embedding model the vector
//! index was built with, so model changes can be surfaced.

use rusqlite::Connection;

/// Meta key recording the embedding model behind the current vector index.
pub const EMBEDDING_MODEL_KEY: &str = "embedding.model";

/// Get a metadata value, `None` if the key was never set.
pub fn get_meta(conn: &Connection, key: &str) -> rusqlite::Result<Option<String>> {
    match conn.query_row("SELECT value FROM meta WHERE key = ?1", [key], |row| {
        row.get::<_, String>(0)
    }) {
        Ok(val) => Ok(Some(val)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e),
    }
}

/// Set (or replace) a metadata value.
pub fn set_meta(conn: &Connection, key: &str, value: &str) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT OR REPLACE INTO meta (key, value) VALUES (?1, ?2)",
        [key, value],
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_conn() -> Connection {
        crate::db::load_sqlite_vec();
        let conn = Connection::open_in_memory().unwrap();
        crate::db::schema::init_schema(&conn).unwrap();
        conn
    }

    #[test]
    fn missing_key_is_none() {
        let conn = test_conn();
        assert_eq!(get_meta(&conn, EMBEDDING_MODEL_KEY).unwrap(), None);
    }

    #[test]
    fn set_and_get_round_trip() {
        let conn = test_conn();
        set_meta(&conn, EMBEDDING_MODEL_KEY, "all-MiniLM-L6-v2").unwrap();
        assert_eq!(
            get_meta(&conn, EMBEDDING_MODEL_KEY).unwrap(),
            Some("all-MiniLM-L6-v2".to_string())
        );

        set_meta(&conn, EMBEDDING_MODEL_KEY, "new-model").unwrap();
        assert_eq!(
            get_meta(&conn, EMBEDDING_MODEL_KEY).unwrap(),
            Some("new-model".to_string())
        );
    }
}
