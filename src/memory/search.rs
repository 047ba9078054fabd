use anyhow::Result;
use rusqlite::{params, Connection};
use std::collections::HashMap;

use crate::db::Database;
use crate::embedding::{EmbeddingProvider, EMBEDDING_DIM};
use crate::error::StoreError;
use crate::memory::embedding_to_bytes;
use crate::memory::types::{SearchOptions, SearchResult};

// ── Rank fusion ───────────────────────────────────────────────────────────────

/// RRF constant from Cormack, Clarke & Buettcher (SIGIR 2009). Dampens the
/// weight of top ranks so membership in multiple lists dominates.
pub const RRF_K: usize = 60;

/// One entry of a ranked id-list. Ranks are 1-based and dense.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ranked {
    pub id: String,
    pub rank: usize,
}

/// A fused id with its combined score.
#[derive(Debug, Clone)]
pub struct Fused {
    pub id: String,
    pub score: f64,
}

/// Reciprocal Rank Fusion over any number of ranked lists.
///
/// `score(id) = Σ over lists containing id of 1 / (K + rank)`. Ids absent
/// from a list contribute nothing from it. Output is ordered by descending
/// score; ties keep first-encounter order.
pub fn rrf_fuse(rankings: &[Vec<Ranked>]) -> Vec<Fused> {
    let mut order: Vec<String> = Vec::new();
    let mut scores: HashMap<String, f64> = HashMap::new();

    for ranking in rankings {
        for item in ranking {
            if !scores.contains_key(&item.id) {
                order.push(item.id.clone());
            }
            *scores.entry(item.id.clone()).or_insert(0.0) +=
                1.0 / (RRF_K as f64 + item.rank as f64);
        }
    }

    let mut fused: Vec<Fused> = order
        .into_iter()
        .map(|id| {
            let score = scores[&id];
            Fused { id, score }
        })
        .collect();
    // Stable sort keeps first-encounter order for equal scores
    fused.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
    fused
}

// ── Keyword index ─────────────────────────────────────────────────────────────

/// FTS5 keyword search with dense ranks 1..n.
///
/// Tokens are OR-joined so a partial term match still ranks above no match.
pub fn fts_search(conn: &Connection, query: &str, limit: usize) -> Result<Vec<Ranked>> {
    let Some(match_expr) = build_match_expr(query) else {
        return Ok(Vec::new());
    };

    let mut stmt = conn.prepare(
        "SELECT id FROM memories_fts WHERE memories_fts MATCH ?1 ORDER BY rank LIMIT ?2",
    )?;
    let ids = stmt
        .query_map(params![match_expr, limit as i64], |row| {
            row.get::<_, String>(0)
        })?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(ids
        .into_iter()
        .enumerate()
        .map(|(i, id)| Ranked { id, rank: i + 1 })
        .collect())
}

/// Build an FTS5 MATCH expression: non-word characters become spaces, each
/// surviving token is quoted, tokens are OR-joined. `None` when no tokens
/// survive.
fn build_match_expr(query: &str) -> Option<String> {
    let cleaned: String = query
        .chars()
        .map(|c| if c.is_alphanumeric() || c == '_' { c } else { ' ' })
        .collect();
    let tokens: Vec<String> = cleaned
        .split_whitespace()
        .map(|t| format!("\"{t}\""))
        .collect();
    if tokens.is_empty() {
        None
    } else {
        Some(tokens.join(" OR "))
    }
}

// ── Vector index ──────────────────────────────────────────────────────────────

/// A vector KNN hit.
#[derive(Debug, Clone)]
pub struct VectorHit {
    pub id: String,
    pub rank: usize,
    pub distance: f64,
}

/// KNN search over stored vectors, nearest first, dense ranks 1..n.
///
/// The query vector must match the index dimension exactly.
pub fn vector_search(conn: &Connection, embedding: &[f32], limit: usize) -> Result<Vec<VectorHit>> {
    if embedding.len() != EMBEDDING_DIM {
        return Err(StoreError::DimensionMismatch {
            expected: EMBEDDING_DIM,
            got: embedding.len(),
        }
        .into());
    }

    let mut stmt = conn.prepare(
        "SELECT id, distance FROM memories_vec \
         WHERE embedding MATCH ?1 ORDER BY distance LIMIT ?2",
    )?;
    let rows = stmt
        .query_map(params![embedding_to_bytes(embedding), limit as i64], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, f64>(1)?))
        })?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(rows
        .into_iter()
        .enumerate()
        .map(|(i, (id, distance))| VectorHit {
            id,
            rank: i + 1,
            distance,
        })
        .collect())
}

// ── Pipeline ──────────────────────────────────────────────────────────────────

/// Hybrid search: keyword + (optional) vector KNN → RRF → hydrate → filter.
///
/// The vector leg is strictly best-effort. Any failure embedding the query or
/// querying the index downgrades to keyword-only ranking; search itself never
/// fails on the vector path.
pub fn search_memories(
    db: &Database,
    query: &str,
    opts: &SearchOptions,
    provider: Option<&dyn EmbeddingProvider>,
) -> Result<Vec<SearchResult>> {
    let limit = opts.limit.unwrap_or(10);
    // Over-fetch candidates before fusion: post-filters may drop fused results
    let fetch_limit = (limit * 3).max(30);

    let fts_results = fts_search(&db.conn, query, fetch_limit)?;

    let mut rankings = vec![fts_results];
    if db.vec_available {
        if let Some(provider) = provider {
            match vector_leg(db, provider, query, fetch_limit) {
                Ok(hits) if !hits.is_empty() => rankings.push(
                    hits.into_iter()
                        .map(|h| Ranked {
                            id: h.id,
                            rank: h.rank,
                        })
                        .collect(),
                ),
                Ok(_) => {}
                Err(err) => {
                    tracing::debug!(%err, "vector search failed, continuing keyword-only");
                }
            }
        }
    }

    let fused = rrf_fuse(&rankings);
    if fused.is_empty() {
        return Ok(Vec::new());
    }

    let rows = fetch_result_rows(&db.conn, &fused)?;

    // Hydrate in fused order, dropping ids with no backing record (stale
    // index entries are tolerated, not fatal)
    let mut results: Vec<SearchResult> = fused
        .iter()
        .filter_map(|f| {
            let row = rows.get(&f.id)?;
            Some(SearchResult {
                id: f.id.clone(),
                digest: row.digest.clone(),
                tags: row.tags.clone(),
                score: f.score,
                created_at: row.created_at.clone(),
            })
        })
        .collect();

    // Post-filters: all requested tags, then inclusive date bounds
    if !opts.tags.is_empty() {
        results.retain(|r| opts.tags.iter().all(|t| r.tags.contains(t)));
    }
    if let Some(ref after) = opts.after {
        results.retain(|r| r.created_at.as_str() >= after.as_str());
    }
    if let Some(ref before) = opts.before {
        results.retain(|r| r.created_at.as_str() <= before.as_str());
    }

    results.truncate(limit);
    Ok(results)
}

fn vector_leg(
    db: &Database,
    provider: &dyn EmbeddingProvider,
    query: &str,
    limit: usize,
) -> Result<Vec<VectorHit>> {
    let embedding = provider.embed(&provider.query_text(query))?;
    vector_search(&db.conn, &embedding, limit)
}

struct ResultRow {
    digest: String,
    tags: Vec<String>,
    created_at: String,
}

fn fetch_result_rows(conn: &Connection, fused: &[Fused]) -> Result<HashMap<String, ResultRow>> {
    let placeholders: Vec<String> = (1..=fused.len()).map(|i| format!("?{i}")).collect();
    let sql = format!(
        "SELECT id, digest, tags, created_at FROM memories WHERE id IN ({})",
        placeholders.join(", ")
    );

    let mut stmt = conn.prepare(&sql)?;
    let bindings: Vec<&dyn rusqlite::types::ToSql> = fused
        .iter()
        .map(|f| &f.id as &dyn rusqlite::types::ToSql)
        .collect();

    let rows = stmt
        .query_map(bindings.as_slice(), |row| {
            let tags_json: String = row.get(2)?;
            Ok((
                row.get::<_, String>(0)?,
                ResultRow {
                    digest: row.get(1)?,
                    tags: serde_json::from_str(&tags_json).unwrap_or_default(),
                    created_at: row.get(3)?,
                },
            ))
        })?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(rows.into_iter().collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;
    use crate::memory::store::add_memory;
    use crate::memory::types::AddInput;

    fn test_db() -> Database {
        db::open_memory_database().unwrap()
    }

    fn add(db: &mut Database, content: &str, tags: &[&str]) -> String {
        add_memory(
            db,
            AddInput {
                content: content.to_string(),
                digest: None,
                tags: tags.iter().map(|s| s.to_string()).collect(),
            },
            None,
        )
        .unwrap()
        .id
    }

    fn ranked(ids: &[&str]) -> Vec<Ranked> {
        ids.iter()
            .enumerate()
            .map(|(i, id)| Ranked {
                id: id.to_string(),
                rank: i + 1,
            })
            .collect()
    }

    /// A provider whose embed always fails — exercises the degradation path.
    struct BrokenProvider;

    impl EmbeddingProvider for BrokenProvider {
        fn model_name(&self) -> &str {
            "broken"
        }
        fn embed(&self, _text: &str) -> Result<Vec<f32>> {
            anyhow::bail!("inference backend offline")
        }
    }

    #[test]
    fn rrf_single_ranking_preserves_order() {
        let fused = rrf_fuse(&[ranked(&["a", "b", "c"])]);
        let ids: Vec<&str> = fused.iter().map(|f| f.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
        assert!((fused[0].score - 1.0 / 61.0).abs() < 1e-5);
    }

    #[test]
    fn rrf_two_list_membership_wins() {
        let fused = rrf_fuse(&[ranked(&["a", "b"]), ranked(&["b", "c"])]);
        let scores: HashMap<&str, f64> =
            fused.iter().map(|f| (f.id.as_str(), f.score)).collect();
        // b appears in both lists and must beat both single-list ids
        assert_eq!(fused[0].id, "b");
        assert!(scores["b"] > scores["a"]);
        assert!(scores["b"] > scores["c"]);
    }

    #[test]
    fn rrf_empty_rankings_fuse_to_nothing() {
        assert!(rrf_fuse(&[Vec::new(), Vec::new()]).is_empty());
        assert!(rrf_fuse(&[]).is_empty());
    }

    #[test]
    fn match_expr_strips_punctuation_and_or_joins() {
        assert_eq!(
            build_match_expr("ESM compatibility!").as_deref(),
            Some("\"ESM\" OR \"compatibility\"")
        );
        assert_eq!(build_match_expr("...").as_deref(), None);
        assert_eq!(build_match_expr("").as_deref(), None);
        assert_eq!(build_match_expr("one").as_deref(), Some("\"one\""));
    }

    #[test]
    fn fts_search_ranks_matches_densely() {
        let mut db = test_db();
        let id_a = add(&mut db, "quantum computers need cold qubits", &[]);
        let _id_b = add(&mut db, "gardening tips for spring", &[]);

        let results = fts_search(&db.conn, "quantum qubits", 10).unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].id, id_a);
        assert_eq!(results[0].rank, 1);
    }

    #[test]
    fn fts_search_empty_query_is_empty() {
        let db = test_db();
        assert!(fts_search(&db.conn, "!!!", 10).unwrap().is_empty());
    }

    #[test]
    fn fts_search_matches_tags_too() {
        let mut db = test_db();
        let id = add(&mut db, "some note", &["kubernetes"]);
        let results = fts_search(&db.conn, "kubernetes", 10).unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].id, id);
    }

    #[test]
    fn vector_search_rejects_wrong_dimension() {
        let db = test_db();
        let err = vector_search(&db.conn, &[1.0, 2.0], 10).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<StoreError>(),
            Some(StoreError::DimensionMismatch { expected, got })
                if *expected == EMBEDDING_DIM && *got == 2
        ));
    }

    #[test]
    fn vector_search_orders_by_distance() {
        let mut db = test_db();
        let id_a = add(&mut db, "alpha", &[]);
        let id_b = add(&mut db, "beta", &[]);

        let mut emb_a = vec![0.0f32; EMBEDDING_DIM];
        emb_a[0] = 1.0;
        let mut emb_b = vec![0.0f32; EMBEDDING_DIM];
        emb_b[7] = 1.0;

        db.conn
            .execute(
                "INSERT INTO memories_vec (id, embedding) VALUES (?1, ?2)",
                params![id_a, embedding_to_bytes(&emb_a)],
            )
            .unwrap();
        db.conn
            .execute(
                "INSERT INTO memories_vec (id, embedding) VALUES (?1, ?2)",
                params![id_b, embedding_to_bytes(&emb_b)],
            )
            .unwrap();

        let hits = vector_search(&db.conn, &emb_a, 10).unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].id, id_a);
        assert_eq!(hits[0].rank, 1);
        assert!(hits[0].distance < hits[1].distance);
    }

    #[test]
    fn search_degrades_when_vector_leg_fails() {
        let mut db = test_db();
        let id = add(&mut db, "degradation should be invisible", &[]);

        let results = search_memories(
            &db,
            "degradation",
            &SearchOptions::default(),
            Some(&BrokenProvider),
        )
        .unwrap();

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].id, id);
    }

    #[test]
    fn search_applies_and_tag_filter() {
        let mut db = test_db();
        let id_both = add(&mut db, "release checklist for deploys", &["ops", "ci"]);
        let _id_one = add(&mut db, "deploys happen on tuesdays", &["ops"]);

        let results = search_memories(
            &db,
            "deploys",
            &SearchOptions {
                tags: vec!["ops".to_string(), "ci".to_string()],
                ..Default::default()
            },
            None,
        )
        .unwrap();

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].id, id_both);
    }

    #[test]
    fn search_applies_inclusive_date_bounds() {
        let mut db = test_db();
        let id = add(&mut db, "dated fact", &[]);
        let created_at: String = db
            .conn
            .query_row(
                "SELECT created_at FROM memories WHERE id = ?1",
                [&id],
                |r| r.get(0),
            )
            .unwrap();

        // Bounds equal to the timestamp are inclusive
        let hit = search_memories(
            &db,
            "dated",
            &SearchOptions {
                after: Some(created_at.clone()),
                before: Some(created_at.clone()),
                ..Default::default()
            },
            None,
        )
        .unwrap();
        assert_eq!(hit.len(), 1);

        let miss = search_memories(
            &db,
            "dated",
            &SearchOptions {
                after: Some("9999-01-01T00:00:00+00:00".to_string()),
                ..Default::default()
            },
            None,
        )
        .unwrap();
        assert!(miss.is_empty());
    }

    #[test]
    fn search_truncates_to_limit() {
        let mut db = test_db();
        for i in 0..5 {
            add(&mut db, &format!("recurring topic number {i}"), &[]);
        }

        let results = search_memories(
            &db,
            "recurring topic",
            &SearchOptions {
                limit: Some(2),
                ..Default::default()
            },
            None,
        )
        .unwrap();
        assert_eq!(results.len(), 2);
    }

    #[test]
    fn search_tolerates_stale_index_entries() {
        let mut db = test_db();
        let id = add(&mut db, "living record", &[]);

        // A stale FTS row pointing at a vanished record
        db.conn
            .execute(
                "INSERT INTO memories_fts (id, content, tags) VALUES ('ghost', 'living ghost', '[]')",
                [],
            )
            .unwrap();

        let results =
            search_memories(&db, "living", &SearchOptions::default(), None).unwrap();
        let ids: Vec<&str> = results.iter().map(|r| r.id.as_str()).collect();
        assert!(ids.contains(&id.as_str()));
        assert!(!ids.contains(&"ghost"));
    }

    #[test]
    fn search_empty_query_returns_empty() {
        let db = test_db();
        let results =
            search_memories(&db, "??", &SearchOptions::default(), None).unwrap();
        assert!(results.is_empty());
    }
}
