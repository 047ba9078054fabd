//! CLI write/read commands: add, get, update, delete.

use anyhow::Result;
use std::io::Read;

use crate::config::AgmemConfig;
use crate::memory::store;
use crate::memory::types::{AddInput, UpdatePatch};

/// Store a new memory. Content falls back to stdin when piped.
pub fn add(
    config: &AgmemConfig,
    content: Option<String>,
    digest: Option<String>,
    tags: Option<String>,
) -> Result<()> {
    let content = match content {
        Some(c) => c,
        None => read_stdin()?,
    };
    anyhow::ensure!(
        !content.trim().is_empty(),
        "content is required (provide as argument or pipe via stdin)"
    );

    let mut db = crate::db::open_database(config.resolved_db_path())?;
    let provider = super::maybe_provider(&config.embedding, db.vec_available);

    let memory = store::add_memory(
        &mut db,
        AddInput {
            content,
            digest,
            tags: super::parse_tags(tags),
        },
        provider.as_deref(),
    )?;

    println!("{}", serde_json::to_string_pretty(&memory)?);
    Ok(())
}

/// Retrieve memories by id. Exits nonzero when nothing matched.
pub fn get(config: &AgmemConfig, ids: &[String], full: bool) -> Result<()> {
    let mut db = crate::db::open_database(config.resolved_db_path())?;
    let memories = store::get_memories(&mut db, ids)?;
    anyhow::ensure!(!memories.is_empty(), "no memories found");

    if full {
        println!("{}", serde_json::to_string_pretty(&memories)?);
    } else {
        for memory in &memories {
            println!("{}", memory.content);
        }
    }
    Ok(())
}

/// Update a memory. Content falls back to stdin when no field flag is given.
pub fn update(
    config: &AgmemConfig,
    id: &str,
    content: Option<String>,
    digest: Option<String>,
    tags: Option<String>,
) -> Result<()> {
    let content = if content.is_none() && digest.is_none() && tags.is_none() {
        Some(read_stdin()?)
    } else {
        content
    };

    let mut db = crate::db::open_database(config.resolved_db_path())?;
    let provider = super::maybe_provider(&config.embedding, db.vec_available);

    let memory = store::update_memory(
        &mut db,
        id,
        UpdatePatch {
            content,
            digest,
            tags: tags.map(|t| super::parse_tags(Some(t))),
        },
        provider.as_deref(),
    )?;

    println!("{}", serde_json::to_string_pretty(&memory)?);
    Ok(())
}

/// Delete memories by id. Unknown ids are tolerated.
pub fn delete(config: &AgmemConfig, ids: &[String]) -> Result<()> {
    let mut db = crate::db::open_database(config.resolved_db_path())?;
    store::delete_memories(&mut db, ids)?;
    println!("Deleted {} memorie(s).", ids.len());
    Ok(())
}

fn read_stdin() -> Result<String> {
    let mut buf = String::new();
    std::io::stdin().read_to_string(&mut buf)?;
    Ok(buf.trim_end().to_string())
}
