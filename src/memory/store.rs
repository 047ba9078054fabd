//! Write path — content-hash dedup, record storage, and index sync.
//!
//! Every record mutation runs inside one transaction that keeps the
//! `memories` table and the FTS5 mirror in lockstep. Vector entries are
//! maintained best-effort after the transaction commits: a failed embedding
//! leaves the record durable and searchable by keyword, and `agmem index`
//! catches it up later.

use anyhow::Result;
use rusqlite::{params, OptionalExtension, Transaction};
use sha2::{Digest, Sha256};

use crate::db::{meta, Database};
use crate::embedding::EmbeddingProvider;
use crate::error::StoreError;
use crate::memory::types::{AddInput, Memory, UpdatePatch, MEMORY_COLUMNS};
use crate::memory::{embedding_to_bytes, normalize_tags};

/// SHA-256 hex digest of memory content — the dedup key.
pub fn hash_content(content: &str) -> String {
    hex::encode(Sha256::digest(content.as_bytes()))
}

/// Store a new memory, or return the existing record when the content hash
/// already exists.
///
/// The dedup lookup and the insert share one transaction, so two concurrent
/// adds of identical content cannot both insert. A dedup hit returns the
/// existing record unchanged — no new row, no re-embedding.
pub fn add_memory(
    db: &mut Database,
    input: AddInput,
    provider: Option<&dyn EmbeddingProvider>,
) -> Result<Memory> {
    let hash = hash_content(&input.content);
    let tags = normalize_tags(&input.tags);
    let digest = input.digest.unwrap_or_else(|| input.content.clone());
    let tags_json = serde_json::to_string(&tags)?;
    let now = chrono::Utc::now().to_rfc3339();

    let tx = db.conn.transaction()?;

    if let Some(existing) = select_by_hash(&tx, &hash)? {
        tx.commit()?;
        tracing::debug!(id = %existing.id, "add deduplicated to existing memory");
        return Ok(existing);
    }

    let id = uuid::Uuid::now_v7().to_string();
    tx.execute(
        "INSERT INTO memories (id, hash, content, digest, tags, created_at, updated_at, access_count) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6, 0)",
        params![id, hash, input.content, digest, tags_json, now],
    )?;
    tx.execute(
        "INSERT INTO memories_fts (id, content, tags) VALUES (?1, ?2, ?3)",
        params![id, input.content, tags_json],
    )?;
    tx.commit()?;

    let memory = Memory {
        id,
        hash,
        content: input.content,
        digest,
        tags,
        created_at: now.clone(),
        updated_at: now,
        access_count: 0,
    };

    // Failure isolated: the record is durable either way and can be indexed
    // later via `agmem index`.
    if let Err(err) = try_embed(db, provider, &memory) {
        tracing::warn!(id = %memory.id, %err, "embedding failed, memory stored without vector");
    }

    Ok(memory)
}

/// Fetch memories by id, silently omitting unknown ids.
///
/// Every returned record's `access_count` is incremented once per call, in
/// the same transaction as the read.
pub fn get_memories(db: &mut Database, ids: &[String]) -> Result<Vec<Memory>> {
    if ids.is_empty() {
        return Ok(Vec::new());
    }

    let tx = db.conn.transaction()?;

    let placeholders: Vec<String> = (1..=ids.len()).map(|i| format!("?{i}")).collect();
    let sql = format!(
        "SELECT {MEMORY_COLUMNS} FROM memories WHERE id IN ({})",
        placeholders.join(", ")
    );

    let mut memories = {
        let mut stmt = tx.prepare(&sql)?;
        let bindings: Vec<&dyn rusqlite::types::ToSql> = ids
            .iter()
            .map(|id| id as &dyn rusqlite::types::ToSql)
            .collect();
        let rows = stmt
            .query_map(bindings.as_slice(), |row| Memory::from_row(row))?
            .collect::<Result<Vec<_>, _>>()?;
        rows
    };

    {
        let mut bump = tx.prepare(
            "UPDATE memories SET access_count = access_count + 1 WHERE id = ?1",
        )?;
        for memory in &memories {
            bump.execute([&memory.id])?;
        }
    }

    tx.commit()?;

    for memory in &mut memories {
        memory.access_count += 1;
    }
    Ok(memories)
}

/// Apply a partial update. Unset fields keep their prior values.
///
/// A content patch recomputes the hash; the FTS row is rewritten in the same
/// transaction; a content or tag change also drops the vector entry so the
/// record is re-embedded (immediately if a provider is at hand, otherwise at
/// the next `agmem index` run).
pub fn update_memory(
    db: &mut Database,
    id: &str,
    patch: UpdatePatch,
    provider: Option<&dyn EmbeddingProvider>,
) -> Result<Memory> {
    let content_changed = patch.content.is_some();
    let tags_changed = patch.tags.is_some();

    let tx = db.conn.transaction()?;

    let existing = select_by_id(&tx, id)?
        .ok_or_else(|| StoreError::NotFound(id.to_string()))?;

    let content = patch.content.unwrap_or(existing.content);
    let digest = patch.digest.unwrap_or(existing.digest);
    let tags = match patch.tags {
        Some(t) => normalize_tags(&t),
        None => existing.tags,
    };
    let hash = if content_changed {
        hash_content(&content)
    } else {
        existing.hash
    };
    let tags_json = serde_json::to_string(&tags)?;
    let now = chrono::Utc::now().to_rfc3339();

    tx.execute(
        "UPDATE memories SET hash = ?1, content = ?2, digest = ?3, tags = ?4, updated_at = ?5 \
         WHERE id = ?6",
        params![hash, content, digest, tags_json, now, id],
    )?;

    // Resync the FTS mirror
    tx.execute("DELETE FROM memories_fts WHERE id = ?1", [id])?;
    tx.execute(
        "INSERT INTO memories_fts (id, content, tags) VALUES (?1, ?2, ?3)",
        params![id, content, tags_json],
    )?;

    // A stale vector must not outlive changed content or tags.
    if content_changed || tags_changed {
        delete_vec_entry(&tx, id);
    }

    tx.commit()?;

    let memory = Memory {
        id: id.to_string(),
        hash,
        content,
        digest,
        tags,
        created_at: existing.created_at,
        updated_at: now,
        access_count: existing.access_count,
    };

    if content_changed || tags_changed {
        // Failure isolated, same contract as add.
        if let Err(err) = try_embed(db, provider, &memory) {
            tracing::warn!(id = %memory.id, %err, "re-embedding failed, vector cleared until next index run");
        }
    }

    Ok(memory)
}

/// Delete memories and all their derived index entries. Unknown ids are no-ops.
pub fn delete_memories(db: &mut Database, ids: &[String]) -> Result<()> {
    if ids.is_empty() {
        return Ok(());
    }

    let tx = db.conn.transaction()?;
    {
        let mut del_memory = tx.prepare("DELETE FROM memories WHERE id = ?1")?;
        let mut del_fts = tx.prepare("DELETE FROM memories_fts WHERE id = ?1")?;
        for id in ids {
            del_memory.execute([id])?;
            del_fts.execute([id])?;
            delete_vec_entry(&tx, id);
        }
    }
    tx.commit()?;

    tracing::debug!(count = ids.len(), "memories deleted");
    Ok(())
}

/// Insert or refresh the vector entry for one memory and record the model
/// provenance.
///
/// Callers on the write path intentionally discard this Result (logged, not
/// surfaced) so that an embedding failure never fails the write itself.
pub fn try_embed(
    db: &Database,
    provider: Option<&dyn EmbeddingProvider>,
    memory: &Memory,
) -> Result<()> {
    if !db.vec_available {
        return Ok(());
    }
    let Some(provider) = provider else {
        return Ok(());
    };

    let text = provider.document_text(&memory.content, &memory.tags);
    let embedding = provider.embed(&text)?;
    db.conn.execute(
        "INSERT OR REPLACE INTO memories_vec (id, embedding) VALUES (?1, ?2)",
        params![memory.id, embedding_to_bytes(&embedding)],
    )?;
    meta::set_meta(&db.conn, meta::EMBEDDING_MODEL_KEY, provider.model_name())?;
    Ok(())
}

fn select_by_hash(tx: &Transaction<'_>, hash: &str) -> Result<Option<Memory>> {
    let row = tx
        .query_row(
            &format!("SELECT {MEMORY_COLUMNS} FROM memories WHERE hash = ?1"),
            [hash],
            |row| Memory::from_row(row),
        )
        .optional()?;
    Ok(row)
}

fn select_by_id(tx: &Transaction<'_>, id: &str) -> Result<Option<Memory>> {
    let row = tx
        .query_row(
            &format!("SELECT {MEMORY_COLUMNS} FROM memories WHERE id = ?1"),
            [id],
            |row| Memory::from_row(row),
        )
        .optional()?;
    Ok(row)
}

/// Drop the vector entry for an id, tolerating a missing vec table.
fn delete_vec_entry(conn: &rusqlite::Connection, id: &str) {
    // memories_vec does not exist when the vector backend is unavailable
    let _ = conn.execute("DELETE FROM memories_vec WHERE id = ?1", [id]);
}
