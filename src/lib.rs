//! Persistent memory for AI agents — a local note/fact store with hybrid
//! keyword + semantic search.
//!
//! agmem stores short notes and facts for autonomous agents. Every record is
//! content-addressed: adding the same text twice resolves to the same record
//! instead of creating a duplicate. Retrieval combines two rankings:
//!
//! - **Keyword**: SQLite FTS5 over content and tags
//! - **Semantic**: nearest-neighbor search over
//!   [sqlite-vec](https://github.com/asg017/sqlite-vec) embeddings
//!
//! merged with Reciprocal Rank Fusion. The vector side is strictly optional —
//! when the vector backend or the embedding model is unavailable, writes and
//! searches keep working in keyword-only mode, and embeddings can be caught up
//! later with `agmem index`.
//!
//! # Modules
//!
//! - [`config`] — Configuration loading from TOML files and environment variables
//! - [`db`] — SQLite database initialization, schema, migrations, and metadata
//! - [`embedding`] — Text-to-vector embedding pipeline (injected capability)
//! - [`error`] — Typed store errors
//! - [`memory`] — Core engine: store, search, list, tags, stats, and the
//!   vector index lifecycle

pub mod config;
pub mod db;
pub mod embedding;
pub mod error;
pub mod memory;
