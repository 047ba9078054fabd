//! Paginated browse over stored memories.

use anyhow::Result;
use rusqlite::types::ToSql;

use crate::db::Database;
use crate::memory::types::{ListOptions, ListPage, Memory, SortKey, MEMORY_COLUMNS};

/// Browse memories with tag/date filters, sorting, and offset pagination.
///
/// Tag filtering is AND semantics: a memory qualifies only when it carries
/// every requested tag. `has_more` is true exactly when the page came back
/// full.
pub fn list_memories(db: &Database, opts: &ListOptions) -> Result<ListPage> {
    let limit = opts.limit.unwrap_or(10);
    let limit_param = limit as i64;
    let offset_param = opts.offset as i64;

    let mut conditions: Vec<&str> = Vec::new();
    let mut bindings: Vec<&dyn ToSql> = Vec::new();

    for tag in &opts.tags {
        conditions
            .push("EXISTS (SELECT 1 FROM json_each(memories.tags) WHERE json_each.value = ?)");
        bindings.push(tag);
    }
    if let Some(ref after) = opts.after {
        conditions.push("created_at >= ?");
        bindings.push(after);
    }
    if let Some(ref before) = opts.before {
        conditions.push("created_at <= ?");
        bindings.push(before);
    }

    let where_clause = if conditions.is_empty() {
        String::new()
    } else {
        format!("WHERE {}", conditions.join(" AND "))
    };

    // UUID v7 ids are time-ordered, so the id tiebreak keeps pages stable
    // when timestamps collide.
    let order = match opts.sort {
        SortKey::Time => "created_at DESC, id DESC",
        SortKey::Access => "access_count DESC, created_at DESC, id DESC",
    };

    let sql = format!(
        "SELECT {MEMORY_COLUMNS} FROM memories {where_clause} ORDER BY {order} LIMIT ? OFFSET ?"
    );
    bindings.push(&limit_param);
    bindings.push(&offset_param);

    let mut stmt = db.conn.prepare(&sql)?;
    let memories = stmt
        .query_map(bindings.as_slice(), |row| Memory::from_row(row))?
        .collect::<Result<Vec<_>, _>>()?;

    let has_more = memories.len() == limit;
    Ok(ListPage { memories, has_more })
}
