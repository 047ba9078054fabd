//! Store-wide statistics.

use anyhow::Result;

use crate::db::Database;
use crate::memory::index;
use crate::memory::types::StoreStats;

/// Compute store statistics: record count, distinct tag count, on-disk size,
/// and (when the vector backend is present) index coverage.
pub fn store_stats(db: &Database) -> Result<StoreStats> {
    let total_memories: i64 = db
        .conn
        .query_row("SELECT COUNT(*) FROM memories", [], |r| r.get(0))?;

    let total_tags: i64 = db.conn.query_row(
        "SELECT COUNT(DISTINCT json_each.value) FROM memories, json_each(memories.tags)",
        [],
        |r| r.get(0),
    )?;

    let storage_size_bytes: i64 = db
        .conn
        .query_row(
            "SELECT page_count * page_size FROM pragma_page_count(), pragma_page_size()",
            [],
            |r| r.get(0),
        )
        .unwrap_or(0);

    let index_status = if db.vec_available {
        Some(index::index_status(db)?)
    } else {
        None
    };

    Ok(StoreStats {
        total_memories: total_memories as u64,
        total_tags: total_tags as u64,
        storage_size_bytes: storage_size_bytes as u64,
        index_status,
    })
}
