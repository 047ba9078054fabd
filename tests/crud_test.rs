mod helpers;

use agmem::memory::store::{add_memory, delete_memories, get_memories, update_memory};
use agmem::memory::types::{AddInput, UpdatePatch};
use helpers::{add, test_db, MockProvider};

#[test]
fn identical_content_resolves_to_one_record() {
    let mut db = test_db();

    let first = add(&mut db, "the user prefers dark mode", &["prefs"]);
    let second = add_memory(
        &mut db,
        AddInput {
            content: "the user prefers dark mode".to_string(),
            digest: Some("a different digest that must be ignored".to_string()),
            tags: vec!["other".to_string()],
        },
        None,
    )
    .unwrap();

    // The existing record comes back unchanged — no new row
    assert_eq!(second.id, first.id);
    assert_eq!(second.hash, first.hash);
    assert_eq!(second.digest, first.digest);
    assert_eq!(second.tags, first.tags);

    let count: i64 = db
        .conn
        .query_row("SELECT COUNT(*) FROM memories", [], |r| r.get(0))
        .unwrap();
    assert_eq!(count, 1);
}

#[test]
fn dedup_does_not_re_embed() {
    let mut db = test_db();
    let provider = MockProvider::new();

    helpers::add_with_provider(&mut db, "embedded once", &[], Some(&provider));
    helpers::add_with_provider(&mut db, "embedded once", &[], Some(&provider));

    let vec_count: i64 = db
        .conn
        .query_row("SELECT COUNT(*) FROM memories_vec", [], |r| r.get(0))
        .unwrap();
    assert_eq!(vec_count, 1);
}

#[test]
fn access_counts_increase_once_per_call() {
    let mut db = test_db();
    let a = add(&mut db, "alpha", &[]);
    let b = add(&mut db, "beta", &[]);

    let both = get_memories(&mut db, &[a.id.clone(), b.id.clone()]).unwrap();
    assert_eq!(both.len(), 2);
    for memory in &both {
        assert_eq!(memory.access_count, 1);
    }

    // Only `a` this time; `b` stays at 1
    let just_a = get_memories(&mut db, &[a.id.clone()]).unwrap();
    assert_eq!(just_a[0].access_count, 2);

    let b_again = get_memories(&mut db, &[b.id.clone()]).unwrap();
    assert_eq!(b_again[0].access_count, 2);
}

#[test]
fn get_with_unknown_ids_is_not_an_error() {
    let mut db = test_db();
    let a = add(&mut db, "present", &[]);

    let found = get_memories(&mut db, &["missing".to_string(), a.id.clone()]).unwrap();
    assert_eq!(found.len(), 1);

    let none = get_memories(&mut db, &["missing".to_string()]).unwrap();
    assert!(none.is_empty());
}

#[test]
fn update_keeps_unset_fields() {
    let mut db = test_db();
    let memory = add_memory(
        &mut db,
        AddInput {
            content: "original content".to_string(),
            digest: Some("original digest".to_string()),
            tags: vec!["keep".to_string()],
        },
        None,
    )
    .unwrap();

    let updated = update_memory(
        &mut db,
        &memory.id,
        UpdatePatch {
            content: Some("revised content".to_string()),
            ..Default::default()
        },
        None,
    )
    .unwrap();

    assert_eq!(updated.content, "revised content");
    assert_eq!(updated.digest, "original digest");
    assert_eq!(updated.tags, vec!["keep"]);
    assert_ne!(updated.hash, memory.hash);
    assert_eq!(updated.created_at, memory.created_at);
}

#[test]
fn update_of_missing_id_fails() {
    let mut db = test_db();
    let err = update_memory(
        &mut db,
        "nope",
        UpdatePatch {
            digest: Some("x".to_string()),
            ..Default::default()
        },
        None,
    )
    .unwrap_err();
    assert!(err.to_string().contains("memory not found"));
}

#[test]
fn updated_content_is_immediately_searchable() {
    let mut db = test_db();
    let memory = add(&mut db, "tabs are superior", &[]);

    update_memory(
        &mut db,
        &memory.id,
        UpdatePatch {
            content: Some("spaces are superior".to_string()),
            ..Default::default()
        },
        None,
    )
    .unwrap();

    let results = agmem::memory::search::search_memories(
        &db,
        "spaces",
        &agmem::memory::types::SearchOptions::default(),
        None,
    )
    .unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].id, memory.id);
}

#[test]
fn delete_cascades_out_of_search_list_and_tags() {
    let mut db = test_db();
    let doomed = add(&mut db, "ephemeral note about gardens", &["garden"]);
    let kept = add(&mut db, "permanent note about gardens", &["garden"]);

    delete_memories(&mut db, &[doomed.id.clone()]).unwrap();

    let results = agmem::memory::search::search_memories(
        &db,
        "gardens",
        &agmem::memory::types::SearchOptions::default(),
        None,
    )
    .unwrap();
    let ids: Vec<&str> = results.iter().map(|r| r.id.as_str()).collect();
    assert!(!ids.contains(&doomed.id.as_str()));
    assert!(ids.contains(&kept.id.as_str()));

    let page = agmem::memory::list::list_memories(
        &db,
        &agmem::memory::types::ListOptions::default(),
    )
    .unwrap();
    assert_eq!(page.memories.len(), 1);
    assert_eq!(page.memories[0].id, kept.id);

    let tags = agmem::memory::tags::tag_counts(&db).unwrap();
    assert_eq!(tags.len(), 1);
    assert_eq!(tags[0].count, 1);
}

#[test]
fn delete_of_unknown_ids_is_silent() {
    let mut db = test_db();
    delete_memories(&mut db, &["ghost".to_string()]).unwrap();
}

#[test]
fn on_disk_database_round_trips() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("memories.db");

    let id = {
        let mut db = agmem::db::open_database(&path).unwrap();
        add(&mut db, "persisted fact", &["disk"]).id
    };

    let mut db = agmem::db::open_database(&path).unwrap();
    let found = get_memories(&mut db, &[id]).unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].content, "persisted fact");
}
