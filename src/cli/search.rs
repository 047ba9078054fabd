//! CLI `search` command — hybrid ranked retrieval from the terminal.

use anyhow::Result;

use crate::config::AgmemConfig;
use crate::memory::search::search_memories;
use crate::memory::types::SearchOptions;

pub fn search(
    config: &AgmemConfig,
    query: &str,
    tags: Option<String>,
    after: Option<String>,
    before: Option<String>,
    limit: Option<usize>,
) -> Result<()> {
    let db = crate::db::open_database(config.resolved_db_path())?;
    super::warn_model_mismatch(&db, config);

    let provider = super::maybe_provider(&config.embedding, db.vec_available);

    let opts = SearchOptions {
        tags: super::parse_tags(tags),
        after,
        before,
        limit: Some(limit.unwrap_or(config.search.default_limit)),
    };

    let results = search_memories(&db, query, &opts, provider.as_deref())?;

    if results.is_empty() {
        println!("No results found.");
        return Ok(());
    }

    println!("Found {} result(s)\n", results.len());
    for (i, result) in results.iter().enumerate() {
        let tag_list = if result.tags.is_empty() {
            String::new()
        } else {
            format!(" [{}]", result.tags.join(", "))
        };
        println!(
            "  {}. {} (score: {:.4}){}",
            i + 1,
            result.id,
            result.score,
            tag_list,
        );
        println!("     {}", result.digest);
        println!();
    }

    Ok(())
}
