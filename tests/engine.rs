//! Engine integration tests over the SQLite store.
//!
//! Exercises the save/toggle/classify-merge/evaluate flows end to end
//! against a real (temp-file) database, including the uniqueness
//! behavior the schema enforces.

use tempfile::TempDir;

use gitfolio::catalog::LabelCatalog;
use gitfolio::collections::{self, SaveRequest};
use gitfolio::db;
use gitfolio::error::EngineError;
use gitfolio::evaluate;
use gitfolio::identity;
use gitfolio::likes;
use gitfolio::migrate;
use gitfolio::models::{Collection, LabelMap, RepoMetadata};
use gitfolio::store::{CollectionStore, SqliteStore};

async fn setup_store() -> (TempDir, SqliteStore) {
    let tmp = TempDir::new().unwrap();
    let db_path = tmp.path().join("folio.sqlite");
    let pool = db::connect_path(&db_path).await.unwrap();
    migrate::run_migrations(&pool).await.unwrap();
    (tmp, SqliteStore::new(pool))
}

fn save_request(collection: &str, file: &str, repo: &str) -> SaveRequest {
    SaveRequest {
        candidate: "octocat".to_string(),
        collection_name: collection.to_string(),
        language: "JavaScript".to_string(),
        file_name: format!("{}.js", file),
        owner: "octocat".to_string(),
        repo_name: repo.to_string(),
        download_url: format!(
            "https://raw.githubusercontent.com/octocat/{}/main/{}.js",
            repo, file
        ),
    }
}

fn labels(entries: &[(&str, f64)]) -> LabelMap {
    entries.iter().map(|(l, c)| (l.to_string(), *c)).collect()
}

#[tokio::test]
async fn test_save_creates_collection_with_membership() {
    let (_tmp, store) = setup_store().await;

    let outcome = collections::save_file(&store, &save_request("Frontend", "index", "webapp"))
        .await
        .unwrap();
    assert!(outcome.created);

    let stored = store.get_collection(&outcome.collection_id).await.unwrap().unwrap();
    assert_eq!(stored.name, "Frontend");
    assert_eq!(stored.candidate, "octocat");
    assert_eq!(stored.score, 0.0);

    let files = store.collection_files(&outcome.collection_id).await.unwrap();
    assert_eq!(files.len(), 1);
    assert_eq!(files[0].name, "index.js");
    assert!(!files[0].is_classified());

    let repos = store.collection_repos(&outcome.collection_id).await.unwrap();
    assert_eq!(repos, vec!["webapp".to_string()]);
}

#[tokio::test]
async fn test_save_twice_is_idempotent() {
    let (_tmp, store) = setup_store().await;
    let req = save_request("Frontend", "index", "webapp");

    let first = collections::save_file(&store, &req).await.unwrap();
    let second = collections::save_file(&store, &req).await.unwrap();

    assert!(first.created);
    assert!(!second.created);
    assert_eq!(second.collection_id, first.collection_id);
    assert_eq!(second.file_id, first.file_id);

    assert_eq!(store.collection_files(&first.collection_id).await.unwrap().len(), 1);
    assert_eq!(store.collection_repos(&first.collection_id).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_collection_names_merge_case_insensitively() {
    let (_tmp, store) = setup_store().await;

    let first = collections::save_file(&store, &save_request("Frontend", "index", "webapp"))
        .await
        .unwrap();
    let second = collections::save_file(&store, &save_request("frontend", "util", "webapp"))
        .await
        .unwrap();

    assert_eq!(second.collection_id, first.collection_id);

    let all = store.collections_for_candidate("octocat").await.unwrap();
    assert_eq!(all.len(), 1);
    assert_eq!(all[0].name, "Frontend");
    assert_eq!(store.collection_files(&first.collection_id).await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_same_name_under_other_candidate_is_separate() {
    let (_tmp, store) = setup_store().await;

    let mut other = save_request("Frontend", "index", "webapp");
    other.candidate = "hubot".to_string();

    let a = collections::save_file(&store, &save_request("Frontend", "index", "webapp"))
        .await
        .unwrap();
    let b = collections::save_file(&store, &other).await.unwrap();

    assert!(a.created);
    assert!(b.created);
    assert_ne!(a.collection_id, b.collection_id);
}

#[tokio::test]
async fn test_repositories_deduped_case_insensitively() {
    let (_tmp, store) = setup_store().await;

    let first = collections::save_file(&store, &save_request("Frontend", "index", "WebApp"))
        .await
        .unwrap();
    collections::save_file(&store, &save_request("Frontend", "util", "webapp"))
        .await
        .unwrap();
    collections::save_file(&store, &save_request("Frontend", "app", "tools"))
        .await
        .unwrap();

    let repos = store.collection_repos(&first.collection_id).await.unwrap();
    assert_eq!(repos, vec!["WebApp".to_string(), "tools".to_string()]);
}

#[tokio::test]
async fn test_unique_index_rejects_duplicate_create() {
    let (_tmp, store) = setup_store().await;

    collections::save_file(&store, &save_request("Frontend", "index", "webapp"))
        .await
        .unwrap();
    let file_id = identity::identify(
        "https://raw.githubusercontent.com/octocat/webapp/main/other.js",
    )
    .unwrap();

    // Bypass the resolver's lookup, as a racing session would.
    let duplicate = Collection {
        id: "dup".to_string(),
        candidate: "octocat".to_string(),
        name: "FRONTEND".to_string(),
        language: "JavaScript".to_string(),
        score: 0.0,
        created_at: 0,
    };
    let result = store.create_collection(&duplicate, "webapp", &file_id).await;
    assert!(matches!(result, Err(EngineError::Conflict(_))));

    // The losing transaction left nothing behind.
    assert!(store.get_collection("dup").await.unwrap().is_none());
    assert_eq!(store.collections_for_candidate("octocat").await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_identity_is_stable_across_discovery_paths() {
    let (_tmp, store) = setup_store().await;

    // Same download URL reached via two different collections.
    let a = collections::save_file(&store, &save_request("Frontend", "index", "webapp"))
        .await
        .unwrap();
    let b = collections::save_file(&store, &save_request("Archive", "index", "webapp"))
        .await
        .unwrap();

    assert_eq!(a.file_id, b.file_id);
    assert_eq!(store.list_files().await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_remove_file_deletes_edge_only() {
    let (_tmp, store) = setup_store().await;

    let a = collections::save_file(&store, &save_request("Frontend", "index", "webapp"))
        .await
        .unwrap();
    let b = collections::save_file(&store, &save_request("Backend", "index", "webapp"))
        .await
        .unwrap();
    assert_eq!(a.file_id, b.file_id);

    assert!(collections::remove_file(&store, &a.collection_id, &a.file_id).await.unwrap());
    assert!(store.collection_files(&a.collection_id).await.unwrap().is_empty());

    // Still a member elsewhere, and the record itself survives.
    assert_eq!(store.collection_files(&b.collection_id).await.unwrap().len(), 1);
    assert!(store.get_file(&a.file_id).await.unwrap().is_some());

    // Removing again reports a no-op.
    assert!(!collections::remove_file(&store, &a.collection_id, &a.file_id).await.unwrap());
}

#[tokio::test]
async fn test_validate_existing_target_requires_match() {
    let (_tmp, store) = setup_store().await;
    collections::save_file(&store, &save_request("Frontend", "index", "webapp"))
        .await
        .unwrap();

    let existing = store.collections_for_candidate("octocat").await.unwrap();
    assert!(collections::validate_existing_target(&existing, "octocat", " frontend ").is_ok());
    assert!(matches!(
        collections::validate_existing_target(&existing, "octocat", "Frontned"),
        Err(EngineError::Validation { .. })
    ));
}

#[tokio::test]
async fn test_toggle_like_is_self_inverse() {
    let (_tmp, store) = setup_store().await;
    let metadata = RepoMetadata {
        owner_name: "octocat".to_string(),
        repo_name: "hello".to_string(),
        language: "JavaScript".to_string(),
    };

    let on = likes::toggle_like(&store, "u1", "r1", &metadata).await.unwrap();
    assert!(on.liked);

    let liked = store.liked_repos("u1").await.unwrap();
    assert_eq!(liked.len(), 1);
    assert_eq!(liked[0].owner_name, "octocat");
    assert_eq!(liked[0].language, "JavaScript");

    let off = likes::toggle_like(&store, "u1", "r1", &metadata).await.unwrap();
    assert!(!off.liked);
    assert!(store.liked_repos("u1").await.unwrap().is_empty());
}

#[tokio::test]
async fn test_like_relation_is_at_most_one_row() {
    let (_tmp, store) = setup_store().await;
    let like = gitfolio::models::LikedRepo {
        user_id: "u1".to_string(),
        repo_id: "r1".to_string(),
        owner_name: "octocat".to_string(),
        repo_name: "hello".to_string(),
        language: "JavaScript".to_string(),
        created_at: 0,
    };

    assert!(store.insert_like(&like).await.unwrap());
    // A second racing insert applies nothing.
    assert!(!store.insert_like(&like).await.unwrap());
    assert_eq!(store.liked_repos("u1").await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_classification_snapshot_is_replaced() {
    let (_tmp, store) = setup_store().await;

    let outcome = collections::save_file(&store, &save_request("Frontend", "index", "webapp"))
        .await
        .unwrap();

    store
        .set_file_labels(&outcome.file_id, &labels(&[("DOM", 80.0), ("Network", 60.0)]))
        .await
        .unwrap();
    let first = store.get_file(&outcome.file_id).await.unwrap().unwrap();
    assert_eq!(first.labels.as_ref().unwrap().len(), 2);

    // A new classification replaces the snapshot, it does not merge.
    store
        .set_file_labels(&outcome.file_id, &labels(&[("Async", 42.5)]))
        .await
        .unwrap();
    let second = store.get_file(&outcome.file_id).await.unwrap().unwrap();
    let snapshot = second.labels.unwrap();
    assert_eq!(snapshot.len(), 1);
    assert_eq!(snapshot["Async"], 42.5);
}

#[tokio::test]
async fn test_resaving_keeps_classification_snapshot() {
    let (_tmp, store) = setup_store().await;
    let req = save_request("Frontend", "index", "webapp");

    let outcome = collections::save_file(&store, &req).await.unwrap();
    store
        .set_file_labels(&outcome.file_id, &labels(&[("DOM", 80.0)]))
        .await
        .unwrap();

    // Saving the same file again (e.g., into another collection) must not
    // wipe its labels.
    collections::save_file(&store, &save_request("Backend", "index", "webapp"))
        .await
        .unwrap();
    let file = store.get_file(&outcome.file_id).await.unwrap().unwrap();
    assert!(file.is_classified());
}

#[tokio::test]
async fn test_evaluate_writes_coverage_score() {
    let (_tmp, store) = setup_store().await;
    let catalog = LabelCatalog::default();

    let a = collections::save_file(&store, &save_request("Frontend", "a", "webapp"))
        .await
        .unwrap();
    let b = collections::save_file(&store, &save_request("Frontend", "b", "webapp"))
        .await
        .unwrap();
    // A third, never-classified file contributes nothing.
    collections::save_file(&store, &save_request("Frontend", "c", "webapp"))
        .await
        .unwrap();

    store
        .set_file_labels(&a.file_id, &labels(&[("DOM", 80.0), ("Network", 60.0)]))
        .await
        .unwrap();
    store
        .set_file_labels(&b.file_id, &labels(&[("DOM", 90.0)]))
        .await
        .unwrap();

    let evaluation = evaluate::evaluate_collection(&store, &catalog, &a.collection_id)
        .await
        .unwrap();

    assert_eq!(evaluation.labels["DOM"], 85.00);
    assert_eq!(evaluation.labels["Network"], 60.00);
    assert_eq!(evaluation.score, 6.45);

    let collection = store.get_collection(&a.collection_id).await.unwrap().unwrap();
    assert_eq!(collection.score, 6.45);
}

#[tokio::test]
async fn test_evaluate_empty_collection_scores_zero() {
    let (_tmp, store) = setup_store().await;
    let catalog = LabelCatalog::default();

    let outcome = collections::save_file(&store, &save_request("Frontend", "a", "webapp"))
        .await
        .unwrap();
    let evaluation = evaluate::evaluate_collection(&store, &catalog, &outcome.collection_id)
        .await
        .unwrap();

    assert!(evaluation.labels.is_empty());
    assert_eq!(evaluation.score, 0.0);
}
