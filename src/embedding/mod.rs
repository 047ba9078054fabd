//! Text-to-vector embedding pipeline.
//!
//! Provides the [`EmbeddingProvider`] capability trait and a local
//! implementation using all-MiniLM-L6-v2 (384 dimensions, L2-normalized).
//! The provider is created via [`create_provider`] from configuration and is
//! passed explicitly into the search pipeline and the index lifecycle — there
//! is no process-wide provider singleton.

pub mod local;

use anyhow::Result;

/// Number of dimensions in the embedding vectors (all-MiniLM-L6-v2).
pub const EMBEDDING_DIM: usize = 384;

/// Trait for embedding text into vectors.
///
/// Implementations produce vectors of exactly [`EMBEDDING_DIM`] dimensions
/// and report a stable model identifier used for provenance tracking in the
/// meta table. Text framing — how stored documents and search queries are
/// presented to the model — belongs to the provider, so the core always goes
/// through [`document_text`](EmbeddingProvider::document_text) and
/// [`query_text`](EmbeddingProvider::query_text) rather than baking a format
/// in. All methods are synchronous — callers in async contexts should use
/// `tokio::task::spawn_blocking`.
pub trait EmbeddingProvider: Send + Sync {
    /// Stable identifier of the underlying model, recorded with the index.
    fn model_name(&self) -> &str;

    /// Embed a single text string into a vector.
    fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Embed a batch of text strings. Implementations may override for batched inference.
    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        texts.iter().map(|t| self.embed(t)).collect()
    }

    /// Return the number of dimensions this provider produces.
    fn dimensions(&self) -> usize {
        EMBEDDING_DIM
    }

    /// Frame stored content (plus its tags) for document embedding.
    fn document_text(&self, content: &str, tags: &[String]) -> String {
        if tags.is_empty() {
            content.to_string()
        } else {
            format!("[{}] {}", tags.join(", "), content)
        }
    }

    /// Frame a search query for query embedding.
    fn query_text(&self, query: &str) -> String {
        query.to_string()
    }
}

/// Create an embedding provider from config.
///
/// Currently only `"local"` is supported (ONNX Runtime + all-MiniLM-L6-v2).
/// Returns an error if model files are not found — run `agmem model download` first.
pub fn create_provider(
    config: &crate::config::EmbeddingConfig,
) -> Result<Box<dyn EmbeddingProvider>> {
    match config.provider.as_str() {
        "local" => {
            let provider = local::LocalEmbeddingProvider::new(config)?;
            Ok(Box::new(provider))
        }
        other => anyhow::bail!("unknown embedding provider: {other}. Supported: local"),
    }
}
