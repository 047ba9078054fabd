//! CLI `list` command — paginated browse.

use anyhow::Result;

use crate::config::AgmemConfig;
use crate::memory::list::list_memories;
use crate::memory::types::{ListOptions, SortKey};

#[allow(clippy::too_many_arguments)]
pub fn list(
    config: &AgmemConfig,
    tags: Option<String>,
    after: Option<String>,
    before: Option<String>,
    limit: Option<usize>,
    offset: usize,
    sort: &str,
) -> Result<()> {
    let sort: SortKey = sort.parse().map_err(|e: String| anyhow::anyhow!(e))?;

    let db = crate::db::open_database(config.resolved_db_path())?;
    let page = list_memories(
        &db,
        &ListOptions {
            tags: super::parse_tags(tags),
            after,
            before,
            limit: Some(limit.unwrap_or(config.search.default_limit)),
            offset,
            sort,
        },
    )?;

    if page.memories.is_empty() {
        println!("No memories found.");
        return Ok(());
    }

    for memory in &page.memories {
        let tag_list = if memory.tags.is_empty() {
            String::new()
        } else {
            format!(" [{}]", memory.tags.join(", "))
        };
        println!(
            "  {}  {}{} (accessed {})",
            memory.id, memory.digest, tag_list, memory.access_count,
        );
    }

    if page.has_more {
        println!(
            "\nMore results available — rerun with --offset {}",
            offset + page.memories.len()
        );
    }

    Ok(())
}
