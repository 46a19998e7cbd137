//! JSON HTTP API over the collection engine.
//!
//! A thin adapter: every handler delegates to the same engine operations
//! the CLI uses, and no handler mutates state optimistically — responses
//! carry the authoritative outcome for the client to reconcile against.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `POST` | `/api/files` | Save a file into a collection |
//! | `GET`  | `/api/files` | List all saved files |
//! | `POST` | `/api/files/{id}/classify` | Classify a file and replace its labels |
//! | `GET`  | `/api/collections?candidate=` | List a candidate's collections |
//! | `GET`  | `/api/collections/{id}/files` | Files in a collection |
//! | `GET`  | `/api/collections/{id}/repos` | Repositories in a collection |
//! | `POST` | `/api/collections/{id}/evaluate` | Aggregate labels and persist the score |
//! | `DELETE` | `/api/collections/{id}/files/{file_id}` | Remove a membership edge |
//! | `POST` | `/api/likes` | Flip a liked-repo relation |
//! | `GET`  | `/api/likes?user=` | List a user's liked repos |
//! | `GET`  | `/health` | Health check (returns version) |
//!
//! # Error Contract
//!
//! All error responses use the envelope:
//!
//! ```json
//! { "error": { "code": "validation_failed", "message": "..." } }
//! ```
//!
//! Error codes: `invalid_input` (400), `validation_failed` (400),
//! `conflict` (409), `classifier_error` (502), `network_error` (502),
//! `internal` (500).

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

use crate::catalog::LabelCatalog;
use crate::classify;
use crate::collections::{self, SaveRequest};
use crate::config::Config;
use crate::db;
use crate::error::EngineError;
use crate::evaluate;
use crate::likes;
use crate::models::RepoMetadata;
use crate::store::{CollectionStore, SqliteStore};

/// Shared application state passed to all route handlers.
#[derive(Clone)]
struct AppState {
    config: Arc<Config>,
    store: Arc<SqliteStore>,
    catalog: Arc<LabelCatalog>,
}

/// Start the HTTP server on the address configured in `[server].bind`.
pub async fn run_server(config: &Config) -> anyhow::Result<()> {
    let bind_addr = config.server.bind.clone();
    let pool = db::connect(config).await?;

    let state = AppState {
        config: Arc::new(config.clone()),
        store: Arc::new(SqliteStore::new(pool)),
        catalog: Arc::new(LabelCatalog::default()),
    };

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = Router::new()
        .route("/api/files", post(handle_save_file).get(handle_list_files))
        .route("/api/files/{id}/classify", post(handle_classify_file))
        .route("/api/collections", get(handle_list_collections))
        .route("/api/collections/{id}/files", get(handle_collection_files))
        .route("/api/collections/{id}/repos", get(handle_collection_repos))
        .route("/api/collections/{id}/evaluate", post(handle_evaluate))
        .route(
            "/api/collections/{id}/files/{file_id}",
            delete(handle_remove_file),
        )
        .route("/api/likes", post(handle_toggle_like).get(handle_liked_repos))
        .route("/health", get(handle_health))
        .layer(cors)
        .with_state(state);

    info!("API server listening on http://{}", bind_addr);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

// ============ Error response ============

/// JSON error response envelope.
#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    /// Machine-readable error code (e.g., `"validation_failed"`).
    code: String,
    /// Human-readable error message.
    message: String,
}

/// Internal error type that converts into an Axum HTTP response.
struct AppError {
    status: StatusCode,
    code: &'static str,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code.to_string(),
                message: self.message,
            },
        };
        (self.status, Json(body)).into_response()
    }
}

impl From<EngineError> for AppError {
    fn from(err: EngineError) -> Self {
        let (status, code) = match &err {
            EngineError::InvalidInput(_) => (StatusCode::BAD_REQUEST, "invalid_input"),
            EngineError::Validation { .. } => (StatusCode::BAD_REQUEST, "validation_failed"),
            EngineError::Conflict(_) => (StatusCode::CONFLICT, "conflict"),
            EngineError::Classifier(_) => (StatusCode::BAD_GATEWAY, "classifier_error"),
            EngineError::Network(_) => (StatusCode::BAD_GATEWAY, "network_error"),
            EngineError::Storage(_) => (StatusCode::INTERNAL_SERVER_ERROR, "internal"),
        };
        AppError {
            status,
            code,
            message: err.to_string(),
        }
    }
}

fn not_found(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::NOT_FOUND,
        code: "not_found",
        message: message.into(),
    }
}

// ============ GET /health ============

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

// ============ POST /api/files ============

/// Request body for a save. `existing: true` asserts the target
/// collection already exists and fails validation when it does not,
/// instead of silently creating a duplicate from a typo.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SaveFileBody {
    candidate: String,
    collection: String,
    #[serde(default = "default_language")]
    language: String,
    file_name: String,
    owner: String,
    repo_name: String,
    download_url: String,
    #[serde(default)]
    existing: bool,
}

fn default_language() -> String {
    "JavaScript".to_string()
}

async fn handle_save_file(
    State(state): State<AppState>,
    Json(body): Json<SaveFileBody>,
) -> Result<Json<serde_json::Value>, AppError> {
    if body.existing {
        let existing = state
            .store
            .collections_for_candidate(&body.candidate)
            .await?;
        collections::validate_existing_target(&existing, &body.candidate, &body.collection)?;
    }

    let req = SaveRequest {
        candidate: body.candidate,
        collection_name: body.collection,
        language: body.language,
        file_name: body.file_name,
        owner: body.owner,
        repo_name: body.repo_name,
        download_url: body.download_url,
    };

    let outcome = collections::save_file(state.store.as_ref(), &req).await?;
    Ok(Json(serde_json::json!({
        "collectionId": outcome.collection_id,
        "fileId": outcome.file_id,
        "created": outcome.created,
    })))
}

// ============ GET /api/files ============

async fn handle_list_files(
    State(state): State<AppState>,
) -> Result<Json<serde_json::Value>, AppError> {
    let files = state.store.list_files().await?;
    Ok(Json(serde_json::json!({ "files": files })))
}

// ============ POST /api/files/{id}/classify ============

async fn handle_classify_file(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    let labels = classify::classify_file(
        state.store.as_ref(),
        &state.config.classifier,
        &state.catalog,
        &id,
    )
    .await?;
    Ok(Json(serde_json::json!({ "labels": labels })))
}

// ============ GET /api/collections ============

#[derive(Deserialize)]
struct CandidateQuery {
    candidate: String,
}

async fn handle_list_collections(
    State(state): State<AppState>,
    Query(query): Query<CandidateQuery>,
) -> Result<Json<serde_json::Value>, AppError> {
    let collections = state
        .store
        .collections_for_candidate(&query.candidate)
        .await?;
    Ok(Json(serde_json::json!({ "collections": collections })))
}

// ============ GET /api/collections/{id}/files ============

async fn handle_collection_files(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    require_collection(&state, &id).await?;
    let files = state.store.collection_files(&id).await?;
    Ok(Json(serde_json::json!({ "files": files })))
}

// ============ GET /api/collections/{id}/repos ============

async fn handle_collection_repos(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    let collection = require_collection(&state, &id).await?;
    let repos = state.store.collection_repos(&id).await?;
    Ok(Json(serde_json::json!({
        "repositories": repos,
        "score": collection.score,
    })))
}

// ============ POST /api/collections/{id}/evaluate ============

async fn handle_evaluate(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    let evaluation =
        evaluate::evaluate_collection(state.store.as_ref(), &state.catalog, &id).await?;
    Ok(Json(serde_json::json!({
        "labels": evaluation.labels,
        "score": evaluation.score,
    })))
}

// ============ DELETE /api/collections/{id}/files/{file_id} ============

async fn handle_remove_file(
    State(state): State<AppState>,
    Path((id, file_id)): Path<(String, String)>,
) -> Result<Json<serde_json::Value>, AppError> {
    let removed = collections::remove_file(state.store.as_ref(), &id, &file_id).await?;
    if !removed {
        return Err(not_found(format!(
            "file {} is not a member of collection {}",
            file_id, id
        )));
    }
    Ok(Json(serde_json::json!({ "removed": true })))
}

// ============ POST /api/likes ============

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ToggleLikeBody {
    user_id: String,
    repo_id: String,
    owner_name: String,
    repo_name: String,
    #[serde(default = "default_unknown")]
    repo_language: String,
}

fn default_unknown() -> String {
    "Unknown".to_string()
}

async fn handle_toggle_like(
    State(state): State<AppState>,
    Json(body): Json<ToggleLikeBody>,
) -> Result<Json<serde_json::Value>, AppError> {
    let metadata = RepoMetadata {
        owner_name: body.owner_name,
        repo_name: body.repo_name,
        language: body.repo_language,
    };
    let outcome =
        likes::toggle_like(state.store.as_ref(), &body.user_id, &body.repo_id, &metadata).await?;
    Ok(Json(serde_json::json!({ "liked": outcome.liked })))
}

// ============ GET /api/likes ============

#[derive(Deserialize)]
struct UserQuery {
    user: String,
}

async fn handle_liked_repos(
    State(state): State<AppState>,
    Query(query): Query<UserQuery>,
) -> Result<Json<serde_json::Value>, AppError> {
    let liked = state.store.liked_repos(&query.user).await?;
    Ok(Json(serde_json::json!({ "likedRepos": liked })))
}

async fn require_collection(
    state: &AppState,
    id: &str,
) -> Result<crate::models::Collection, AppError> {
    state
        .store
        .get_collection(id)
        .await?
        .ok_or_else(|| not_found(format!("no collection with id {}", id)))
}
