mod cli;
mod config;
mod db;
mod embedding;
mod error;
mod memory;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "agmem", version, about = "Persistent memory for AI agents with hybrid search")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Store a new memory (reads stdin when no content argument is given)
    Add {
        content: Option<String>,
        /// Short summary shown in search results
        #[arg(long)]
        digest: Option<String>,
        /// Comma-separated tags
        #[arg(long)]
        tags: Option<String>,
    },
    /// Retrieve memories by id
    Get {
        #[arg(required = true)]
        ids: Vec<String>,
        /// Print full records instead of content only
        #[arg(long)]
        full: bool,
    },
    /// Update an existing memory
    Update {
        id: String,
        /// New content (stdin is read when no field flag is given)
        #[arg(long)]
        content: Option<String>,
        /// New digest
        #[arg(long)]
        digest: Option<String>,
        /// New comma-separated tags
        #[arg(long)]
        tags: Option<String>,
    },
    /// Delete memories by id
    Delete {
        #[arg(required = true)]
        ids: Vec<String>,
    },
    /// Search memories with hybrid keyword + semantic ranking
    Search {
        query: String,
        /// Require all of these comma-separated tags
        #[arg(long)]
        tags: Option<String>,
        /// Inclusive creation-date lower bound (ISO 8601)
        #[arg(long)]
        after: Option<String>,
        /// Inclusive creation-date upper bound (ISO 8601)
        #[arg(long)]
        before: Option<String>,
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Browse and filter memories
    List {
        /// Require all of these comma-separated tags
        #[arg(long)]
        tags: Option<String>,
        #[arg(long)]
        after: Option<String>,
        #[arg(long)]
        before: Option<String>,
        #[arg(long)]
        limit: Option<usize>,
        #[arg(long, default_value_t = 0)]
        offset: usize,
        /// Sort by: time (default) or access
        #[arg(long, default_value = "time")]
        sort: String,
    },
    /// List all tags with usage counts
    Tags,
    /// Show store statistics
    Stats,
    /// Embed records that have no vector entry yet
    Index,
    /// Rebuild the whole vector index from scratch (crash-safe swap)
    IndexRebuild,
    /// Show vector index coverage
    IndexStatus,
    /// Manage the embedding model
    Model {
        #[command(subcommand)]
        action: ModelAction,
    },
}

#[derive(Subcommand)]
enum ModelAction {
    /// Download the embedding model to ~/.agmem/models/
    Download,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = config::AgmemConfig::load()?;

    // Log to stderr so stdout stays clean for piped output.
    let filter = EnvFilter::try_new(&config.logging.level)
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Command::Add {
            content,
            digest,
            tags,
        } => cli::memory::add(&config, content, digest, tags),
        Command::Get { ids, full } => cli::memory::get(&config, &ids, full),
        Command::Update {
            id,
            content,
            digest,
            tags,
        } => cli::memory::update(&config, &id, content, digest, tags),
        Command::Delete { ids } => cli::memory::delete(&config, &ids),
        Command::Search {
            query,
            tags,
            after,
            before,
            limit,
        } => cli::search::search(&config, &query, tags, after, before, limit),
        Command::List {
            tags,
            after,
            before,
            limit,
            offset,
            sort,
        } => cli::list::list(&config, tags, after, before, limit, offset, &sort),
        Command::Tags => cli::stats::tags(&config),
        Command::Stats => cli::stats::stats(&config),
        Command::Index => cli::index::run(&config, "index").await,
        Command::IndexRebuild => cli::index::run(&config, "index-rebuild").await,
        Command::IndexStatus => cli::index::run(&config, "index-status").await,
        Command::Model { action } => match action {
            ModelAction::Download => cli::model_download(&config.embedding).await,
        },
    }
}
