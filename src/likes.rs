//! Liked-repository toggle controller.
//!
//! A toggle is a strict flip: the caller never specifies the desired end
//! state, only that a flip is requested. Presence of the `(user, repo)`
//! relation decides the direction, and two successful sequential flips
//! restore the original state exactly. Flips are not idempotent and must
//! never be blindly retried; a failed flip leaves both server and
//! client-visible state unchanged.

use chrono::Utc;
use std::collections::HashSet;
use tracing::debug;

use crate::error::EngineError;
use crate::models::{LikedRepo, RepoMetadata};
use crate::store::CollectionStore;

/// Authoritative result of a flip.
#[derive(Debug, Clone, Copy, serde::Serialize)]
pub struct ToggleOutcome {
    /// The liked state after the flip.
    pub liked: bool,
}

/// Flip the liked state of `(user_id, repo_id)`.
///
/// Delete-then-insert against the unique key gives at-most-one-applies
/// semantics: when the delete removes a row, the repo was liked and is
/// now un-liked; otherwise an insert records the like, and an insert that
/// finds the pair already present means another session applied a like
/// between the two statements — that flip fails with
/// [`EngineError::Conflict`] instead of double-applying.
pub async fn toggle_like(
    store: &dyn CollectionStore,
    user_id: &str,
    repo_id: &str,
    metadata: &RepoMetadata,
) -> Result<ToggleOutcome, EngineError> {
    if store.delete_like(user_id, repo_id).await? {
        debug!(user_id, repo_id, "unliked");
        return Ok(ToggleOutcome { liked: false });
    }

    let like = LikedRepo {
        user_id: user_id.to_string(),
        repo_id: repo_id.to_string(),
        owner_name: metadata.owner_name.clone(),
        repo_name: metadata.repo_name.clone(),
        language: metadata.language.clone(),
        created_at: Utc::now().timestamp(),
    };

    if store.insert_like(&like).await? {
        debug!(user_id, repo_id, "liked");
        Ok(ToggleOutcome { liked: true })
    } else {
        Err(EngineError::Conflict(format!(
            "concurrent like toggle on repo {}",
            repo_id
        )))
    }
}

/// Apply a confirmed flip result to a client-visible liked set.
///
/// The outcome, not the caller's optimistic expectation, decides the
/// transition. On a failed toggle call there is no outcome — skip this
/// and leave the set untouched.
pub fn reconcile(liked: &mut HashSet<String>, repo_id: &str, outcome: ToggleOutcome) {
    if outcome.liked {
        liked.insert(repo_id.to_string());
    } else {
        liked.remove(repo_id);
    }
}
