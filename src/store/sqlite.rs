//! SQLite [`CollectionStore`] implementation (sqlx).
//!
//! Uniqueness lives in the schema: `(candidate, name_norm)` on
//! collections, `(collection_id, repo_norm)` and `(collection_id,
//! file_id)` on the membership tables, `(user_id, repo_id)` on likes.
//! Membership inserts use `ON CONFLICT DO NOTHING` and report whether a
//! row was actually written, which is what makes the resolver and toggle
//! operations idempotent and race-safe.

use async_trait::async_trait;
use sqlx::{Row, SqlitePool};

use crate::collections::normalize_name;
use crate::error::{map_unique_violation, EngineError};
use crate::models::{Collection, FileRecord, LabelMap, LikedRepo};

use super::CollectionStore;

pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

fn collection_from_row(row: &sqlx::sqlite::SqliteRow) -> Collection {
    Collection {
        id: row.get("id"),
        candidate: row.get("candidate"),
        name: row.get("name"),
        language: row.get("language"),
        score: row.get("score"),
        created_at: row.get("created_at"),
    }
}

fn file_from_row(row: &sqlx::sqlite::SqliteRow) -> Result<FileRecord, EngineError> {
    let labels_json: Option<String> = row.get("labels_json");
    let labels = match labels_json {
        Some(json) => Some(serde_json::from_str::<LabelMap>(&json).map_err(|e| {
            EngineError::InvalidInput(format!("corrupt labels snapshot: {}", e))
        })?),
        None => None,
    };
    Ok(FileRecord {
        id: row.get("id"),
        name: row.get("name"),
        owner: row.get("owner"),
        repo_name: row.get("repo_name"),
        download_url: row.get("download_url"),
        labels,
        created_at: row.get("created_at"),
    })
}

#[async_trait]
impl CollectionStore for SqliteStore {
    async fn collections_for_candidate(
        &self,
        candidate: &str,
    ) -> Result<Vec<Collection>, EngineError> {
        let rows = sqlx::query(
            "SELECT id, candidate, name, language, score, created_at
             FROM collections WHERE candidate = ? ORDER BY created_at",
        )
        .bind(candidate)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(collection_from_row).collect())
    }

    async fn get_collection(
        &self,
        collection_id: &str,
    ) -> Result<Option<Collection>, EngineError> {
        let row = sqlx::query(
            "SELECT id, candidate, name, language, score, created_at
             FROM collections WHERE id = ?",
        )
        .bind(collection_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(collection_from_row))
    }

    async fn create_collection(
        &self,
        collection: &Collection,
        repo_name: &str,
        file_id: &str,
    ) -> Result<(), EngineError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "INSERT INTO collections (id, candidate, name, name_norm, language, score, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&collection.id)
        .bind(&collection.candidate)
        .bind(&collection.name)
        .bind(normalize_name(&collection.name))
        .bind(&collection.language)
        .bind(collection.score)
        .bind(collection.created_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| map_unique_violation(e, "collection"))?;

        sqlx::query(
            "INSERT INTO collection_repos (collection_id, repo_name, repo_norm) VALUES (?, ?, ?)",
        )
        .bind(&collection.id)
        .bind(repo_name)
        .bind(repo_name.to_lowercase())
        .execute(&mut *tx)
        .await?;

        sqlx::query("INSERT INTO collection_files (collection_id, file_id) VALUES (?, ?)")
            .bind(&collection.id)
            .bind(file_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn add_file_to_collection(
        &self,
        collection_id: &str,
        file_id: &str,
    ) -> Result<bool, EngineError> {
        let result = sqlx::query(
            "INSERT INTO collection_files (collection_id, file_id) VALUES (?, ?)
             ON CONFLICT(collection_id, file_id) DO NOTHING",
        )
        .bind(collection_id)
        .bind(file_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn add_repo_to_collection(
        &self,
        collection_id: &str,
        repo_name: &str,
    ) -> Result<bool, EngineError> {
        let result = sqlx::query(
            "INSERT INTO collection_repos (collection_id, repo_name, repo_norm) VALUES (?, ?, ?)
             ON CONFLICT(collection_id, repo_norm) DO NOTHING",
        )
        .bind(collection_id)
        .bind(repo_name)
        .bind(repo_name.to_lowercase())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn remove_file_from_collection(
        &self,
        collection_id: &str,
        file_id: &str,
    ) -> Result<bool, EngineError> {
        let result =
            sqlx::query("DELETE FROM collection_files WHERE collection_id = ? AND file_id = ?")
                .bind(collection_id)
                .bind(file_id)
                .execute(&self.pool)
                .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn collection_repos(&self, collection_id: &str) -> Result<Vec<String>, EngineError> {
        let rows = sqlx::query(
            "SELECT repo_name FROM collection_repos WHERE collection_id = ? ORDER BY rowid",
        )
        .bind(collection_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(|row| row.get("repo_name")).collect())
    }

    async fn collection_files(
        &self,
        collection_id: &str,
    ) -> Result<Vec<FileRecord>, EngineError> {
        let rows = sqlx::query(
            "SELECT f.id, f.name, f.owner, f.repo_name, f.download_url, f.labels_json, f.created_at
             FROM files f
             JOIN collection_files cf ON cf.file_id = f.id
             WHERE cf.collection_id = ?
             ORDER BY cf.rowid",
        )
        .bind(collection_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(file_from_row).collect()
    }

    async fn set_collection_score(
        &self,
        collection_id: &str,
        score: f64,
    ) -> Result<(), EngineError> {
        sqlx::query("UPDATE collections SET score = ? WHERE id = ?")
            .bind(score)
            .bind(collection_id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn upsert_file(&self, file: &FileRecord) -> Result<(), EngineError> {
        // labels_json is deliberately not in the update set: re-saving a
        // file must not discard its classification snapshot.
        sqlx::query(
            r#"
            INSERT INTO files (id, name, owner, repo_name, download_url, labels_json, created_at)
            VALUES (?, ?, ?, ?, ?, NULL, ?)
            ON CONFLICT(id) DO UPDATE SET
                name = excluded.name,
                owner = excluded.owner,
                repo_name = excluded.repo_name,
                download_url = excluded.download_url
            "#,
        )
        .bind(&file.id)
        .bind(&file.name)
        .bind(&file.owner)
        .bind(&file.repo_name)
        .bind(&file.download_url)
        .bind(file.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn get_file(&self, file_id: &str) -> Result<Option<FileRecord>, EngineError> {
        let row = sqlx::query(
            "SELECT id, name, owner, repo_name, download_url, labels_json, created_at
             FROM files WHERE id = ?",
        )
        .bind(file_id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(file_from_row).transpose()
    }

    async fn list_files(&self) -> Result<Vec<FileRecord>, EngineError> {
        let rows = sqlx::query(
            "SELECT id, name, owner, repo_name, download_url, labels_json, created_at
             FROM files ORDER BY owner, repo_name, name",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(file_from_row).collect()
    }

    async fn set_file_labels(
        &self,
        file_id: &str,
        labels: &LabelMap,
    ) -> Result<(), EngineError> {
        let json = serde_json::to_string(labels)
            .map_err(|e| EngineError::Classifier(format!("unserializable labels: {}", e)))?;

        let result = sqlx::query("UPDATE files SET labels_json = ? WHERE id = ?")
            .bind(json)
            .bind(file_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(EngineError::InvalidInput(format!(
                "no file record with id {}",
                file_id
            )));
        }
        Ok(())
    }

    async fn delete_like(&self, user_id: &str, repo_id: &str) -> Result<bool, EngineError> {
        let result = sqlx::query("DELETE FROM liked_repos WHERE user_id = ? AND repo_id = ?")
            .bind(user_id)
            .bind(repo_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn insert_like(&self, like: &LikedRepo) -> Result<bool, EngineError> {
        let result = sqlx::query(
            r#"
            INSERT INTO liked_repos (user_id, repo_id, owner_name, repo_name, language, created_at)
            VALUES (?, ?, ?, ?, ?, ?)
            ON CONFLICT(user_id, repo_id) DO NOTHING
            "#,
        )
        .bind(&like.user_id)
        .bind(&like.repo_id)
        .bind(&like.owner_name)
        .bind(&like.repo_name)
        .bind(&like.language)
        .bind(like.created_at)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn liked_repos(&self, user_id: &str) -> Result<Vec<LikedRepo>, EngineError> {
        let rows = sqlx::query(
            "SELECT user_id, repo_id, owner_name, repo_name, language, created_at
             FROM liked_repos WHERE user_id = ? ORDER BY owner_name, repo_name",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .iter()
            .map(|row| LikedRepo {
                user_id: row.get("user_id"),
                repo_id: row.get("repo_id"),
                owner_name: row.get("owner_name"),
                repo_name: row.get("repo_name"),
                language: row.get("language"),
                created_at: row.get("created_at"),
            })
            .collect())
    }
}
