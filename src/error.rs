//! Typed error taxonomy for the collection engine.
//!
//! Pure computations (identity hashing, aggregation, score) either succeed
//! or fail with [`EngineError::InvalidInput`]; they never coerce bad data.
//! Resolver and toggle operations leave persisted state unchanged on any
//! error. [`EngineError::Conflict`] on collection creation is retried once
//! by the resolver as a merge; every other error is surfaced to the caller.

use thiserror::Error;

/// Unified error type for all engine operations.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Malformed input to a pure computation (bad download URL, zero-sized catalog).
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The caller asked to merge into an existing collection that does not exist.
    /// The creation path must be used instead; auto-creating here would let a
    /// typo silently fork a duplicate collection.
    #[error("no collection named {name:?} exists for candidate {candidate:?}")]
    Validation {
        /// Candidate scope that was searched.
        candidate: String,
        /// The name that failed to match, as supplied by the caller.
        name: String,
    },

    /// The classifier returned a malformed response, an out-of-range
    /// confidence, or a non-retryable HTTP error.
    #[error("classifier error: {0}")]
    Classifier(String),

    /// A uniqueness constraint fired in the persistence collaborator.
    #[error("persistence conflict: {0}")]
    Conflict(String),

    /// Transport failure talking to the classifier or a download URL.
    /// No state change is assumed.
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Any other storage-layer failure.
    #[error("storage error: {0}")]
    Storage(#[from] sqlx::Error),
}

impl EngineError {
    /// True for uniqueness-violation conflicts, which the resolver may
    /// retry once as a merge.
    pub fn is_conflict(&self) -> bool {
        matches!(self, EngineError::Conflict(_))
    }
}

/// Map a sqlx error to [`EngineError::Conflict`] when it is a unique-key
/// violation, passing everything else through as a storage error.
pub(crate) fn map_unique_violation(err: sqlx::Error, what: &str) -> EngineError {
    if let sqlx::Error::Database(ref db_err) = err {
        if db_err.is_unique_violation() {
            return EngineError::Conflict(format!("{} already exists", what));
        }
    }
    EngineError::Storage(err)
}
