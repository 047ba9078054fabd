pub mod index;
pub mod list;
pub mod search;
pub mod stats;
pub mod store;
pub mod tags;
pub mod types;

/// Convert an f32 embedding slice to raw bytes for sqlite-vec.
///
/// sqlite-vec expects fixed-width little-endian f32 blobs, which is exactly
/// the in-memory layout on every supported target.
pub fn embedding_to_bytes(embedding: &[f32]) -> &[u8] {
    unsafe {
        std::slice::from_raw_parts(
            embedding.as_ptr() as *const u8,
            embedding.len() * std::mem::size_of::<f32>(),
        )
    }
}

/// Normalize a tag list to set semantics: trim whitespace, drop empties,
/// dedup keeping first-occurrence order. The kept order is display-only;
/// filtering never depends on it.
pub fn normalize_tags(tags: &[String]) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    let mut out = Vec::new();
    for tag in tags {
        let tag = tag.trim();
        if tag.is_empty() {
            continue;
        }
        if seen.insert(tag.to_string()) {
            out.push(tag.to_string());
        }
    }
    out
}
