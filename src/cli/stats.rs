//! CLI `stats` and `tags` commands.

use anyhow::Result;

use crate::config::AgmemConfig;

/// Display store statistics in the terminal.
pub fn stats(config: &AgmemConfig) -> Result<()> {
    let db = crate::db::open_database(config.resolved_db_path())?;
    let response = crate::memory::stats::store_stats(&db)?;

    println!("Memory Statistics");
    println!("{}", "=".repeat(40));
    println!("  Total memories:      {}", response.total_memories);
    println!("  Total tags:          {}", response.total_tags);
    println!("  Storage size:        {} bytes", response.storage_size_bytes);

    match response.index_status {
        Some(ref status) => {
            println!();
            println!("Vector index:");
            println!("  Indexed:             {}/{}", status.indexed, status.total);
            println!(
                "  Model:               {}",
                status.model.as_deref().unwrap_or("(never indexed)")
            );
        }
        None => {
            println!();
            println!("Vector index:          unavailable (keyword-only mode)");
        }
    }

    Ok(())
}

/// Display all tags with usage counts.
pub fn tags(config: &AgmemConfig) -> Result<()> {
    let db = crate::db::open_database(config.resolved_db_path())?;
    let counts = crate::memory::tags::tag_counts(&db)?;

    if counts.is_empty() {
        println!("No tags yet.");
        return Ok(());
    }

    for entry in &counts {
        println!("  {:<24} {}", entry.tag, entry.count);
    }
    Ok(())
}
