//! Collection save resolution and membership mutation.
//!
//! A save either merges into an existing collection of the candidate
//! (matched case-insensitively) or creates a new one. Merging adds the
//! file and repository only if absent, so repeating a save with identical
//! arguments leaves membership unchanged. A uniqueness conflict on the
//! create path proves another session created the collection first; the
//! save is then retried exactly once as a merge.

use chrono::Utc;
use tracing::debug;
use uuid::Uuid;

use crate::error::EngineError;
use crate::identity;
use crate::models::{Collection, FileId, FileRecord};
use crate::store::CollectionStore;

/// Comparison form of a collection name: trimmed and case-folded.
/// The stored name keeps the casing from first creation.
pub fn normalize_name(name: &str) -> String {
    name.trim().to_lowercase()
}

/// A file-save action: which file, where it came from, and which
/// collection of which candidate it should land in.
#[derive(Debug, Clone)]
pub struct SaveRequest {
    pub candidate: String,
    pub collection_name: String,
    pub language: String,
    pub file_name: String,
    pub owner: String,
    pub repo_name: String,
    pub download_url: String,
}

/// Result of a resolved save.
#[derive(Debug, Clone, serde::Serialize)]
pub struct SaveOutcome {
    pub collection_id: String,
    pub file_id: FileId,
    /// Whether a new collection was created (vs. merged into an existing one).
    pub created: bool,
}

/// Guard for callers that claim "add to an existing collection": the name
/// must match one of the candidate's collections case-insensitively.
///
/// A miss is [`EngineError::Validation`], never a silent auto-create —
/// otherwise a typo would fork a duplicate collection.
pub fn validate_existing_target(
    collections: &[Collection],
    candidate: &str,
    name: &str,
) -> Result<(), EngineError> {
    let normalized = normalize_name(name);
    if collections
        .iter()
        .any(|c| normalize_name(&c.name) == normalized)
    {
        Ok(())
    } else {
        Err(EngineError::Validation {
            candidate: candidate.to_string(),
            name: name.to_string(),
        })
    }
}

/// Save a file: derive its identity, upsert the file record, and resolve
/// the target collection.
pub async fn save_file(
    store: &dyn CollectionStore,
    req: &SaveRequest,
) -> Result<SaveOutcome, EngineError> {
    let file_id = identity::identify(&req.download_url)?;

    let file = FileRecord {
        id: file_id.clone(),
        name: req.file_name.clone(),
        owner: req.owner.clone(),
        repo_name: req.repo_name.clone(),
        download_url: req.download_url.trim().to_string(),
        labels: None,
        created_at: Utc::now().timestamp(),
    };
    store.upsert_file(&file).await?;

    resolve_save(
        store,
        &req.candidate,
        &req.collection_name,
        &req.language,
        &file_id,
        &req.repo_name,
    )
    .await
}

/// Decide create-vs-merge for a save and perform the membership mutation.
///
/// Idempotent: invoking twice with identical arguments produces the same
/// final membership as invoking once.
pub async fn resolve_save(
    store: &dyn CollectionStore,
    candidate: &str,
    collection_name: &str,
    language: &str,
    file_id: &str,
    repo_name: &str,
) -> Result<SaveOutcome, EngineError> {
    if let Some(existing) = find_by_name(store, candidate, collection_name).await? {
        merge_into(store, &existing.id, file_id, repo_name).await?;
        return Ok(SaveOutcome {
            collection_id: existing.id,
            file_id: file_id.to_string(),
            created: false,
        });
    }

    let collection = Collection {
        id: Uuid::new_v4().to_string(),
        candidate: candidate.to_string(),
        name: collection_name.trim().to_string(),
        language: language.to_string(),
        score: 0.0,
        created_at: Utc::now().timestamp(),
    };

    match store.create_collection(&collection, repo_name, file_id).await {
        Ok(()) => Ok(SaveOutcome {
            collection_id: collection.id,
            file_id: file_id.to_string(),
            created: true,
        }),
        Err(e) if e.is_conflict() => {
            // The conflict proves the name now exists; retry once as a merge.
            debug!(candidate, collection_name, "create lost a race, merging");
            let existing = find_by_name(store, candidate, collection_name)
                .await?
                .ok_or(e)?;
            merge_into(store, &existing.id, file_id, repo_name).await?;
            Ok(SaveOutcome {
                collection_id: existing.id,
                file_id: file_id.to_string(),
                created: false,
            })
        }
        Err(e) => Err(e),
    }
}

/// Delete the membership edge only. The file record survives; it may
/// belong to other collections.
pub async fn remove_file(
    store: &dyn CollectionStore,
    collection_id: &str,
    file_id: &str,
) -> Result<bool, EngineError> {
    store.remove_file_from_collection(collection_id, file_id).await
}

async fn find_by_name(
    store: &dyn CollectionStore,
    candidate: &str,
    name: &str,
) -> Result<Option<Collection>, EngineError> {
    let normalized = normalize_name(name);
    Ok(store
        .collections_for_candidate(candidate)
        .await?
        .into_iter()
        .find(|c| normalize_name(&c.name) == normalized))
}

async fn merge_into(
    store: &dyn CollectionStore,
    collection_id: &str,
    file_id: &str,
    repo_name: &str,
) -> Result<(), EngineError> {
    store.add_file_to_collection(collection_id, file_id).await?;
    store.add_repo_to_collection(collection_id, repo_name).await?;
    Ok(())
}
