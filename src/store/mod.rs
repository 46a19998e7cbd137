//! Storage abstraction for the collection engine.
//!
//! The [`CollectionStore`] trait defines the persistence operations the
//! resolver, toggle controller, and evaluate pipeline need, enabling
//! pluggable backends (SQLite in production, in-memory for tests).
//!
//! Implementations must be `Send + Sync` to work with async runtimes, and
//! must enforce uniqueness on `(candidate, normalized collection name)`
//! and `(user_id, repo_id)` — the engine's read-then-write sequences are
//! not atomic by themselves and rely on these constraints under racing
//! sessions.

pub mod memory;
pub mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

use async_trait::async_trait;

use crate::error::EngineError;
use crate::models::{Collection, FileRecord, LabelMap, LikedRepo};

/// Abstract persistence backend.
///
/// # Operations
///
/// | Method | Purpose |
/// |--------|---------|
/// | [`collections_for_candidate`](CollectionStore::collections_for_candidate) | Read a candidate's collections |
/// | [`create_collection`](CollectionStore::create_collection) | Create a collection with its first repo and file |
/// | [`add_file_to_collection`](CollectionStore::add_file_to_collection) | Add a membership edge if absent |
/// | [`add_repo_to_collection`](CollectionStore::add_repo_to_collection) | Add a repository if absent (case-insensitive) |
/// | [`remove_file_from_collection`](CollectionStore::remove_file_from_collection) | Delete a membership edge only |
/// | [`set_collection_score`](CollectionStore::set_collection_score) | Persist an evaluation score |
/// | [`upsert_file`](CollectionStore::upsert_file) | Insert or refresh a file record, keeping labels |
/// | [`set_file_labels`](CollectionStore::set_file_labels) | Replace a file's classification snapshot |
/// | [`delete_like`](CollectionStore::delete_like) / [`insert_like`](CollectionStore::insert_like) | Conflict-driven flip primitives |
#[async_trait]
pub trait CollectionStore: Send + Sync {
    /// All collections in a candidate's scope.
    async fn collections_for_candidate(
        &self,
        candidate: &str,
    ) -> Result<Vec<Collection>, EngineError>;

    /// Read a single collection by id.
    async fn get_collection(&self, collection_id: &str)
        -> Result<Option<Collection>, EngineError>;

    /// Create a collection together with its first repository and file
    /// membership, atomically.
    ///
    /// Fails with [`EngineError::Conflict`] when another collection with
    /// the same `(candidate, normalized name)` already exists.
    async fn create_collection(
        &self,
        collection: &Collection,
        repo_name: &str,
        file_id: &str,
    ) -> Result<(), EngineError>;

    /// Add a file membership edge. Returns `false` when the edge was
    /// already present (no-op).
    async fn add_file_to_collection(
        &self,
        collection_id: &str,
        file_id: &str,
    ) -> Result<bool, EngineError>;

    /// Add a repository to a collection, deduplicated case-insensitively.
    /// Returns `false` when already present (no-op).
    async fn add_repo_to_collection(
        &self,
        collection_id: &str,
        repo_name: &str,
    ) -> Result<bool, EngineError>;

    /// Delete a file membership edge. The file record itself is never
    /// deleted. Returns `false` when no edge existed.
    async fn remove_file_from_collection(
        &self,
        collection_id: &str,
        file_id: &str,
    ) -> Result<bool, EngineError>;

    /// Repositories of a collection, in insertion order.
    async fn collection_repos(&self, collection_id: &str) -> Result<Vec<String>, EngineError>;

    /// Full file records of a collection's members.
    async fn collection_files(&self, collection_id: &str)
        -> Result<Vec<FileRecord>, EngineError>;

    /// Persist an evaluation score onto a collection.
    async fn set_collection_score(
        &self,
        collection_id: &str,
        score: f64,
    ) -> Result<(), EngineError>;

    /// Insert a file record, or refresh its metadata when it already
    /// exists. An existing classification snapshot is kept.
    async fn upsert_file(&self, file: &FileRecord) -> Result<(), EngineError>;

    /// Read a file record by id.
    async fn get_file(&self, file_id: &str) -> Result<Option<FileRecord>, EngineError>;

    /// All saved file records.
    async fn list_files(&self) -> Result<Vec<FileRecord>, EngineError>;

    /// Replace a file's classification snapshot wholesale.
    async fn set_file_labels(&self, file_id: &str, labels: &LabelMap)
        -> Result<(), EngineError>;

    /// Remove a like relation. Returns `true` when a row was deleted.
    async fn delete_like(&self, user_id: &str, repo_id: &str) -> Result<bool, EngineError>;

    /// Insert a like relation. Returns `false` when the pair already
    /// exists (another session applied the like first).
    async fn insert_like(&self, like: &LikedRepo) -> Result<bool, EngineError>;

    /// A user's liked repositories.
    async fn liked_repos(&self, user_id: &str) -> Result<Vec<LikedRepo>, EngineError>;
}
