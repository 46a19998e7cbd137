use anyhow::Result;
use sqlx::SqlitePool;

pub async fn run_migrations(pool: &SqlitePool) -> Result<()> {
    // Collections, unique per (candidate, normalized name). The unique
    // index is the arbiter when two sessions race to create the same
    // collection; the loser's insert surfaces as a conflict and is
    // retried as a merge by the resolver.
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS collections (
            id TEXT PRIMARY KEY,
            candidate TEXT NOT NULL,
            name TEXT NOT NULL,
            name_norm TEXT NOT NULL,
            language TEXT NOT NULL DEFAULT 'JavaScript',
            score REAL NOT NULL DEFAULT 0,
            created_at INTEGER NOT NULL,
            UNIQUE(candidate, name_norm)
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Saved file records. `id` is content-addressed (SHA-256 of the
    // download URL), so re-saving the same remote file is an upsert.
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS files (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            owner TEXT NOT NULL,
            repo_name TEXT NOT NULL,
            download_url TEXT NOT NULL,
            labels_json TEXT,
            created_at INTEGER NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Membership edges. Deleting an edge never deletes the file record;
    // the same file may belong to other collections.
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS collection_files (
            collection_id TEXT NOT NULL,
            file_id TEXT NOT NULL,
            UNIQUE(collection_id, file_id),
            FOREIGN KEY (collection_id) REFERENCES collections(id),
            FOREIGN KEY (file_id) REFERENCES files(id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Source repositories per collection, deduplicated case-insensitively
    // via repo_norm.
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS collection_repos (
            collection_id TEXT NOT NULL,
            repo_name TEXT NOT NULL,
            repo_norm TEXT NOT NULL,
            UNIQUE(collection_id, repo_norm),
            FOREIGN KEY (collection_id) REFERENCES collections(id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Liked-repo relation; at most one row per (user, repo) pair.
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS liked_repos (
            user_id TEXT NOT NULL,
            repo_id TEXT NOT NULL,
            owner_name TEXT NOT NULL,
            repo_name TEXT NOT NULL,
            language TEXT NOT NULL DEFAULT 'Unknown',
            created_at INTEGER NOT NULL,
            UNIQUE(user_id, repo_id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Create indexes
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_collections_candidate ON collections(candidate)")
        .execute(pool)
        .await?;
    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_collection_files_file ON collection_files(file_id)",
    )
    .execute(pool)
    .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_liked_repos_user ON liked_repos(user_id)")
        .execute(pool)
        .await?;

    Ok(())
}
