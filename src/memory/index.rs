//! Vector index lifecycle — incremental embedding, shadow rebuild, status.
//!
//! [`index_unembedded`] fills the gaps: records that never got a vector (the
//! write path is best-effort) are embedded one at a time. [`rebuild_index`]
//! re-embeds everything into a shadow table and swaps it in atomically: until
//! the swap commits, the live index stays intact and queryable, so an
//! interrupted rebuild loses nothing.

use anyhow::{Context, Result};
use rusqlite::params;

use crate::db::{meta, Database};
use crate::embedding::{EmbeddingProvider, EMBEDDING_DIM};
use crate::error::StoreError;
use crate::memory::embedding_to_bytes;
use crate::memory::types::IndexStatus;

/// Progress callback: `(done, total)` after each embedded record.
pub type Progress<'a> = &'a mut dyn FnMut(usize, usize);

/// The generic indexing command set advertised to external callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexCommand {
    /// Embed records that have no vector entry yet.
    Index,
    /// Full shadow rebuild of every record's vector.
    Rebuild,
    /// Report index coverage.
    Status,
}

/// Command names accepted by [`IndexCommand::from_str`], in display order.
pub const INDEX_COMMANDS: &[&str] = &["index", "index-rebuild", "index-status"];

impl IndexCommand {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Index => "index",
            Self::Rebuild => "index-rebuild",
            Self::Status => "index-status",
        }
    }
}

impl std::str::FromStr for IndexCommand {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "index" => Ok(Self::Index),
            "index-rebuild" => Ok(Self::Rebuild),
            "index-status" => Ok(Self::Status),
            other => Err(StoreError::UnknownCommand {
                command: other.to_string(),
                valid: INDEX_COMMANDS.join(", "),
            }),
        }
    }
}

struct PendingRow {
    id: String,
    content: String,
    tags: Vec<String>,
}

/// Embed every record lacking a vector entry, one request at a time.
///
/// Reports `(done, total)` after each record and records the provider's model
/// in the meta table on completion. Returns 0 with no side effects when
/// nothing is pending.
pub fn index_unembedded(
    db: &mut Database,
    provider: &dyn EmbeddingProvider,
    mut on_progress: Option<Progress<'_>>,
) -> Result<usize> {
    ensure_vec_available(db)?;

    let rows = pending_rows(
        db,
        "SELECT m.id, m.content, m.tags FROM memories m \
         LEFT JOIN memories_vec v ON m.id = v.id WHERE v.id IS NULL",
    )?;
    if rows.is_empty() {
        return Ok(0);
    }
    let total = rows.len();

    {
        let mut insert = db
            .conn
            .prepare("INSERT INTO memories_vec (id, embedding) VALUES (?1, ?2)")?;
        for (done, row) in rows.iter().enumerate() {
            let embedding = embed_row(provider, row)?;
            insert.execute(params![row.id, embedding_to_bytes(&embedding)])?;
            if let Some(cb) = on_progress.as_mut() {
                cb(done + 1, total);
            }
        }
    }

    meta::set_meta(&db.conn, meta::EMBEDDING_MODEL_KEY, provider.model_name())?;
    tracing::info!(count = total, model = provider.model_name(), "indexed unembedded memories");
    Ok(total)
}

/// Re-embed every record into a shadow table, then atomically swap it in.
///
/// The swap (drop live, rename shadow, record model) is one transaction, so
/// readers observe either the old complete index or the new complete index.
/// Any failure before the swap leaves the live index untouched.
pub fn rebuild_index(
    db: &mut Database,
    provider: &dyn EmbeddingProvider,
    mut on_progress: Option<Progress<'_>>,
) -> Result<usize> {
    ensure_vec_available(db)?;

    let rows = pending_rows(db, "SELECT id, content, tags FROM memories")?;
    if rows.is_empty() {
        return Ok(0);
    }
    let total = rows.len();

    // A prior interrupted rebuild may have left a partial shadow behind;
    // start it from scratch either way.
    db.conn.execute_batch(&format!(
        "CREATE VIRTUAL TABLE IF NOT EXISTS memories_vec_new USING vec0(\n\
         id TEXT PRIMARY KEY,\n\
         embedding FLOAT[{EMBEDDING_DIM}]\n\
         );\n\
         DELETE FROM memories_vec_new;"
    ))?;

    {
        let mut insert = db
            .conn
            .prepare("INSERT INTO memories_vec_new (id, embedding) VALUES (?1, ?2)")?;
        for (done, row) in rows.iter().enumerate() {
            let embedding = embed_row(provider, row)?;
            insert.execute(params![row.id, embedding_to_bytes(&embedding)])?;
            if let Some(cb) = on_progress.as_mut() {
                cb(done + 1, total);
            }
        }
    }

    // Shadow → live swap plus provenance, as one atomic step
    let tx = db.conn.transaction()?;
    tx.execute_batch(
        "DROP TABLE memories_vec;\n\
         ALTER TABLE memories_vec_new RENAME TO memories_vec;",
    )?;
    meta::set_meta(&tx, meta::EMBEDDING_MODEL_KEY, provider.model_name())?;
    tx.commit()?;

    tracing::info!(count = total, model = provider.model_name(), "vector index rebuilt");
    Ok(total)
}

/// Report index coverage: vector entries vs total records, plus the recorded
/// model. A missing or empty vector index reads as 0, not an error.
pub fn index_status(db: &Database) -> Result<IndexStatus> {
    let total: i64 = db
        .conn
        .query_row("SELECT COUNT(*) FROM memories", [], |r| r.get(0))?;

    let indexed: i64 = if db.vec_available {
        db.conn
            .query_row("SELECT COUNT(*) FROM memories_vec", [], |r| r.get(0))
            .unwrap_or(0)
    } else {
        0
    };

    let model = meta::get_meta(&db.conn, meta::EMBEDDING_MODEL_KEY)?;

    Ok(IndexStatus {
        indexed: indexed as u64,
        total: total as u64,
        model,
    })
}

fn ensure_vec_available(db: &Database) -> Result<()> {
    if db.vec_available {
        Ok(())
    } else {
        Err(StoreError::VectorBackendUnavailable.into())
    }
}

fn pending_rows(db: &Database, sql: &str) -> Result<Vec<PendingRow>> {
    let mut stmt = db.conn.prepare(sql)?;
    let rows = stmt
        .query_map([], |row| {
            let tags_json: String = row.get(2)?;
            Ok(PendingRow {
                id: row.get(0)?,
                content: row.get(1)?,
                tags: serde_json::from_str(&tags_json).unwrap_or_default(),
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

fn embed_row(provider: &dyn EmbeddingProvider, row: &PendingRow) -> Result<Vec<f32>> {
    let text = provider.document_text(&row.content, &row.tags);
    provider
        .embed(&text)
        .with_context(|| format!("embedding failed for memory {}", row.id))
}
