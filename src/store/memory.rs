//! In-memory [`CollectionStore`] implementation for testing.
//!
//! Uses `HashMap` and `Vec` behind `std::sync::RwLock` for thread safety.
//! Uniqueness behavior matches the SQLite schema: creating a collection
//! whose `(candidate, normalized name)` already exists fails with a
//! conflict, membership inserts report whether they wrote anything, and
//! the like relation holds at most one row per `(user_id, repo_id)`.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;

use crate::collections::normalize_name;
use crate::error::EngineError;
use crate::models::{Collection, FileRecord, LabelMap, LikedRepo};

use super::CollectionStore;

struct Membership {
    collection_id: String,
    file_id: String,
}

struct RepoEntry {
    collection_id: String,
    repo_name: String,
}

/// In-memory store for unit and engine tests.
#[derive(Default)]
pub struct MemoryStore {
    collections: RwLock<Vec<Collection>>,
    files: RwLock<HashMap<String, FileRecord>>,
    memberships: RwLock<Vec<Membership>>,
    repos: RwLock<Vec<RepoEntry>>,
    likes: RwLock<Vec<LikedRepo>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CollectionStore for MemoryStore {
    async fn collections_for_candidate(
        &self,
        candidate: &str,
    ) -> Result<Vec<Collection>, EngineError> {
        let collections = self.collections.read().unwrap();
        Ok(collections
            .iter()
            .filter(|c| c.candidate == candidate)
            .cloned()
            .collect())
    }

    async fn get_collection(
        &self,
        collection_id: &str,
    ) -> Result<Option<Collection>, EngineError> {
        let collections = self.collections.read().unwrap();
        Ok(collections.iter().find(|c| c.id == collection_id).cloned())
    }

    async fn create_collection(
        &self,
        collection: &Collection,
        repo_name: &str,
        file_id: &str,
    ) -> Result<(), EngineError> {
        let mut collections = self.collections.write().unwrap();
        let clash = collections.iter().any(|c| {
            c.candidate == collection.candidate
                && normalize_name(&c.name) == normalize_name(&collection.name)
        });
        if clash {
            return Err(EngineError::Conflict("collection already exists".to_string()));
        }
        collections.push(collection.clone());

        self.repos.write().unwrap().push(RepoEntry {
            collection_id: collection.id.clone(),
            repo_name: repo_name.to_string(),
        });
        self.memberships.write().unwrap().push(Membership {
            collection_id: collection.id.clone(),
            file_id: file_id.to_string(),
        });
        Ok(())
    }

    async fn add_file_to_collection(
        &self,
        collection_id: &str,
        file_id: &str,
    ) -> Result<bool, EngineError> {
        let mut memberships = self.memberships.write().unwrap();
        if memberships
            .iter()
            .any(|m| m.collection_id == collection_id && m.file_id == file_id)
        {
            return Ok(false);
        }
        memberships.push(Membership {
            collection_id: collection_id.to_string(),
            file_id: file_id.to_string(),
        });
        Ok(true)
    }

    async fn add_repo_to_collection(
        &self,
        collection_id: &str,
        repo_name: &str,
    ) -> Result<bool, EngineError> {
        let mut repos = self.repos.write().unwrap();
        if repos.iter().any(|r| {
            r.collection_id == collection_id
                && r.repo_name.to_lowercase() == repo_name.to_lowercase()
        }) {
            return Ok(false);
        }
        repos.push(RepoEntry {
            collection_id: collection_id.to_string(),
            repo_name: repo_name.to_string(),
        });
        Ok(true)
    }

    async fn remove_file_from_collection(
        &self,
        collection_id: &str,
        file_id: &str,
    ) -> Result<bool, EngineError> {
        let mut memberships = self.memberships.write().unwrap();
        let before = memberships.len();
        memberships.retain(|m| !(m.collection_id == collection_id && m.file_id == file_id));
        Ok(memberships.len() < before)
    }

    async fn collection_repos(&self, collection_id: &str) -> Result<Vec<String>, EngineError> {
        let repos = self.repos.read().unwrap();
        Ok(repos
            .iter()
            .filter(|r| r.collection_id == collection_id)
            .map(|r| r.repo_name.clone())
            .collect())
    }

    async fn collection_files(
        &self,
        collection_id: &str,
    ) -> Result<Vec<FileRecord>, EngineError> {
        let memberships = self.memberships.read().unwrap();
        let files = self.files.read().unwrap();
        Ok(memberships
            .iter()
            .filter(|m| m.collection_id == collection_id)
            .filter_map(|m| files.get(&m.file_id).cloned())
            .collect())
    }

    async fn set_collection_score(
        &self,
        collection_id: &str,
        score: f64,
    ) -> Result<(), EngineError> {
        let mut collections = self.collections.write().unwrap();
        if let Some(c) = collections.iter_mut().find(|c| c.id == collection_id) {
            c.score = score;
        }
        Ok(())
    }

    async fn upsert_file(&self, file: &FileRecord) -> Result<(), EngineError> {
        let mut files = self.files.write().unwrap();
        match files.get_mut(&file.id) {
            Some(existing) => {
                existing.name = file.name.clone();
                existing.owner = file.owner.clone();
                existing.repo_name = file.repo_name.clone();
                existing.download_url = file.download_url.clone();
                // labels kept
            }
            None => {
                let mut fresh = file.clone();
                fresh.labels = None;
                files.insert(file.id.clone(), fresh);
            }
        }
        Ok(())
    }

    async fn get_file(&self, file_id: &str) -> Result<Option<FileRecord>, EngineError> {
        let files = self.files.read().unwrap();
        Ok(files.get(file_id).cloned())
    }

    async fn list_files(&self) -> Result<Vec<FileRecord>, EngineError> {
        let files = self.files.read().unwrap();
        let mut all: Vec<FileRecord> = files.values().cloned().collect();
        all.sort_by(|a, b| {
            (&a.owner, &a.repo_name, &a.name).cmp(&(&b.owner, &b.repo_name, &b.name))
        });
        Ok(all)
    }

    async fn set_file_labels(
        &self,
        file_id: &str,
        labels: &LabelMap,
    ) -> Result<(), EngineError> {
        let mut files = self.files.write().unwrap();
        match files.get_mut(file_id) {
            Some(file) => {
                file.labels = Some(labels.clone());
                Ok(())
            }
            None => Err(EngineError::InvalidInput(format!(
                "no file record with id {}",
                file_id
            ))),
        }
    }

    async fn delete_like(&self, user_id: &str, repo_id: &str) -> Result<bool, EngineError> {
        let mut likes = self.likes.write().unwrap();
        let before = likes.len();
        likes.retain(|l| !(l.user_id == user_id && l.repo_id == repo_id));
        Ok(likes.len() < before)
    }

    async fn insert_like(&self, like: &LikedRepo) -> Result<bool, EngineError> {
        let mut likes = self.likes.write().unwrap();
        if likes
            .iter()
            .any(|l| l.user_id == like.user_id && l.repo_id == like.repo_id)
        {
            return Ok(false);
        }
        likes.push(like.clone());
        Ok(true)
    }

    async fn liked_repos(&self, user_id: &str) -> Result<Vec<LikedRepo>, EngineError> {
        let likes = self.likes.read().unwrap();
        Ok(likes
            .iter()
            .filter(|l| l.user_id == user_id)
            .cloned()
            .collect())
    }
}
