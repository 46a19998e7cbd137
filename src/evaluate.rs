//! Collection evaluation: aggregate current labels and persist the score.
//!
//! The pipeline is read-current-files → aggregate → compute score →
//! persist score, explicitly sequential. The persisted score and the
//! membership it was computed from are not updated atomically together;
//! a save racing with an evaluation leaves the score one evaluation
//! behind until the next call recomputes it from scratch.

use tracing::debug;

use crate::aggregate::{aggregate_labels, coverage_score};
use crate::catalog::LabelCatalog;
use crate::error::EngineError;
use crate::models::LabelMap;
use crate::store::CollectionStore;

/// Result of evaluating a collection.
#[derive(Debug, Clone, serde::Serialize)]
pub struct Evaluation {
    /// Label → mean confidence across the collection's classified files.
    pub labels: LabelMap,
    /// Coverage percentage of the label catalog, also persisted onto the
    /// collection.
    pub score: f64,
}

/// Evaluate a collection against the label catalog.
pub async fn evaluate_collection(
    store: &dyn CollectionStore,
    catalog: &LabelCatalog,
    collection_id: &str,
) -> Result<Evaluation, EngineError> {
    let collection = store.get_collection(collection_id).await?.ok_or_else(|| {
        EngineError::InvalidInput(format!("no collection with id {}", collection_id))
    })?;

    let files = store.collection_files(collection_id).await?;
    let labels = aggregate_labels(&files);
    let score = coverage_score(&labels, catalog.size())?;

    debug!(
        collection = %collection.name,
        files = files.len(),
        labels = labels.len(),
        score,
        "evaluated collection"
    );

    store.set_collection_score(collection_id, score).await?;

    Ok(Evaluation { labels, score })
}
