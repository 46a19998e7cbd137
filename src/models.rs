//! Core data models for the collection engine.
//!
//! These types represent the collections, file records, and liked-repo
//! relations that flow through the save, classify, and evaluate pipelines.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Deterministic identifier derived from a file's download URL.
///
/// Two records discovered through different views (search results vs.
/// collection listings) of the same remote file always share an id.
pub type FileId = String;

/// Label name → confidence percentage, in `[0, 100]`.
///
/// Ordered so that serialized snapshots and aggregation output are stable.
pub type LabelMap = BTreeMap<String, f64>;

/// A named, candidate-scoped set of files and their source repositories.
///
/// `name` keeps the casing from first creation; uniqueness within a
/// candidate is enforced on the trimmed, case-folded form.
#[derive(Debug, Clone, Serialize)]
pub struct Collection {
    pub id: String,
    /// GitHub-account scope this collection belongs to.
    pub candidate: String,
    pub name: String,
    pub language: String,
    /// Coverage score in `[0, 100]`, written by the evaluate operation.
    pub score: f64,
    pub created_at: i64,
}

/// A saved remote file and its most recent classification snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileRecord {
    pub id: FileId,
    pub name: String,
    pub owner: String,
    pub repo_name: String,
    pub download_url: String,
    /// Absent until the first successful classification; replaced wholesale
    /// by each subsequent one.
    pub labels: Option<LabelMap>,
    pub created_at: i64,
}

impl FileRecord {
    /// Whether this file carries a classification snapshot.
    pub fn is_classified(&self) -> bool {
        self.labels.is_some()
    }
}

/// A user's liked-repository relation. Presence = liked; at most one entry
/// per `(user_id, repo_id)` pair.
#[derive(Debug, Clone, Serialize)]
pub struct LikedRepo {
    pub user_id: String,
    pub repo_id: String,
    pub owner_name: String,
    pub repo_name: String,
    pub language: String,
    pub created_at: i64,
}

/// Repository metadata persisted alongside a like.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepoMetadata {
    pub owner_name: String,
    pub repo_name: String,
    pub language: String,
}
