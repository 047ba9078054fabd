#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};

use agmem::db::{self, Database};
use agmem::embedding::{EmbeddingProvider, EMBEDDING_DIM};
use agmem::memory::store;
use agmem::memory::types::{AddInput, Memory};
use anyhow::Result;
use rusqlite::Connection;

/// Open a fresh in-memory database with schema and migrations applied.
pub fn test_db() -> Database {
    db::load_sqlite_vec();
    let conn = Connection::open_in_memory().unwrap();
    conn.pragma_update(None, "foreign_keys", "ON").unwrap();
    let vec_available = db::schema::init_schema(&conn).unwrap();
    db::migrations::run_migrations(&conn).unwrap();
    Database {
        conn,
        vec_available,
    }
}

/// Deterministic embedding provider: each text embeds to a unit spike at a
/// position derived from the text bytes, so identical text lands on identical
/// vectors. Optionally fails after a fixed number of embed calls.
pub struct MockProvider {
    model: String,
    fail_after: Option<usize>,
    calls: AtomicUsize,
}

impl MockProvider {
    pub fn new() -> Self {
        Self::named("mock-embed-v1")
    }

    pub fn named(model: &str) -> Self {
        Self {
            model: model.to_string(),
            fail_after: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing_after(n: usize) -> Self {
        Self {
            fail_after: Some(n),
            ..Self::new()
        }
    }
}

impl EmbeddingProvider for MockProvider {
    fn model_name(&self) -> &str {
        &self.model
    }

    fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(limit) = self.fail_after {
            if call >= limit {
                anyhow::bail!("mock embedding failure");
            }
        }
        Ok(spike_embedding(text))
    }
}

/// Unit spike vector at a position derived from the text bytes.
pub fn spike_embedding(text: &str) -> Vec<f32> {
    let mut v = vec![0.0f32; EMBEDDING_DIM];
    let spike = text.bytes().map(usize::from).sum::<usize>() % EMBEDDING_DIM;
    v[spike] = 1.0;
    v
}

/// Insert a memory through the store, without a provider.
pub fn add(db: &mut Database, content: &str, tags: &[&str]) -> Memory {
    add_with_provider(db, content, tags, None)
}

/// Insert a memory through the store with an optional provider.
pub fn add_with_provider(
    db: &mut Database,
    content: &str,
    tags: &[&str],
    provider: Option<&dyn EmbeddingProvider>,
) -> Memory {
    store::add_memory(
        db,
        AddInput {
            content: content.to_string(),
            digest: None,
            tags: tags.iter().map(|s| s.to_string()).collect(),
        },
        provider,
    )
    .unwrap()
}
