//! Tag aggregation.

use anyhow::Result;

use crate::db::Database;
use crate::memory::types::TagCount;

/// Aggregate tag usage across all memories, most-used first.
pub fn tag_counts(db: &Database) -> Result<Vec<TagCount>> {
    let mut stmt = db.conn.prepare(
        "SELECT json_each.value AS tag, COUNT(*) AS uses \
         FROM memories, json_each(memories.tags) \
         GROUP BY json_each.value \
         ORDER BY uses DESC, tag ASC",
    )?;
    let rows = stmt
        .query_map([], |row| {
            Ok(TagCount {
                tag: row.get(0)?,
                count: row.get::<_, i64>(1)? as u64,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}
