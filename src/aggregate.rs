//! Label aggregation and coverage scoring.
//!
//! Both functions are pure folds over current state. Aggregation is always
//! recomputed from scratch on every evaluation call rather than maintained
//! incrementally, so file insertions and removals between evaluations
//! cannot drift the averages.

use std::collections::BTreeMap;

use crate::error::EngineError;
use crate::models::{FileRecord, LabelMap};

/// Round to 2 decimal places.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Combine the label maps of every classified file into one
/// label → mean-confidence summary.
///
/// Files without a classification snapshot contribute nothing. Labels
/// never seen are absent from the result, not zero-filled. An empty file
/// list yields an empty map.
pub fn aggregate_labels(files: &[FileRecord]) -> LabelMap {
    let mut buckets: BTreeMap<&str, Vec<f64>> = BTreeMap::new();

    for file in files {
        if let Some(labels) = &file.labels {
            for (label, confidence) in labels {
                buckets.entry(label).or_default().push(*confidence);
            }
        }
    }

    buckets
        .into_iter()
        .map(|(label, confidences)| {
            let mean = confidences.iter().sum::<f64>() / confidences.len() as f64;
            (label.to_string(), round2(mean))
        })
        .collect()
}

/// Coverage percentage of the label catalog represented by the aggregation.
///
/// Counts distinct label keys only — a label covered by one low-confidence
/// file weighs the same as one covered by ten files.
///
/// # Errors
///
/// `EngineError::InvalidInput` when `catalog_size` is zero.
pub fn coverage_score(aggregation: &LabelMap, catalog_size: usize) -> Result<f64, EngineError> {
    if catalog_size == 0 {
        return Err(EngineError::InvalidInput(
            "label catalog size must be positive".to_string(),
        ));
    }
    Ok(round2(aggregation.len() as f64 / catalog_size as f64 * 100.0))
}
