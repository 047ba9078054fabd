//! CLI indexing commands, dispatched through the generic command set.

use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};

use crate::config::AgmemConfig;
use crate::memory::index::{self, IndexCommand};

/// Dispatch one of the advertised indexing commands:
/// `index`, `index-rebuild`, `index-status`.
pub async fn run(config: &AgmemConfig, command: &str) -> Result<()> {
    let command: IndexCommand = command.parse()?;

    let mut db = crate::db::open_database(config.resolved_db_path())?;
    super::warn_model_mismatch(&db, config);

    if command == IndexCommand::Status {
        let status = index::index_status(&db)?;
        println!("Indexed:  {}/{}", status.indexed, status.total);
        println!(
            "Model:    {}",
            status.model.as_deref().unwrap_or("(never indexed)")
        );
        return Ok(());
    }

    let provider = crate::embedding::create_provider(&config.embedding)
        .context("failed to create embedding provider")?;

    // Embedding is CPU-bound, so run the whole pass off the async runtime.
    let count = tokio::task::spawn_blocking(move || {
        let pb = ProgressBar::new(0);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("  {bar:40.cyan/blue} {pos}/{len} ({eta})")
                .expect("valid template")
                .progress_chars("##-"),
        );
        let mut on_progress = |done: usize, total: usize| {
            pb.set_length(total as u64);
            pb.set_position(done as u64);
        };

        let result = match command {
            IndexCommand::Index => {
                index::index_unembedded(&mut db, provider.as_ref(), Some(&mut on_progress))
            }
            IndexCommand::Rebuild => {
                index::rebuild_index(&mut db, provider.as_ref(), Some(&mut on_progress))
            }
            IndexCommand::Status => unreachable!("status handled above"),
        };
        pb.finish_and_clear();
        result
    })
    .await??;

    match command {
        IndexCommand::Index if count == 0 => println!("Nothing to index — all memories embedded."),
        IndexCommand::Index => println!("Embedded {count} memorie(s)."),
        IndexCommand::Rebuild => println!("Rebuilt vector index over {count} memorie(s)."),
        IndexCommand::Status => unreachable!("status handled above"),
    }

    Ok(())
}
