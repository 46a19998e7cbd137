//! Classifier service client and classification merge.
//!
//! The classifier is an external collaborator: it takes source text and
//! returns label/confidence pairs keyed by raw catalog codes. This module
//! calls it with retry/backoff, validates the response, translates codes
//! through the [`LabelCatalog`], and stores the result as the file's
//! entire new classification snapshot.
//!
//! # Retry Strategy
//!
//! - HTTP 429 (rate limited) and 5xx (server error) → retry
//! - HTTP 4xx (client error, not 429) → fail immediately
//! - Network errors → retry
//! - Backoff: 1s, 2s, 4s, 8s, 16s, 32s (capped at 2^5)
//!
//! A classification is a replacement write, not an idempotent merge —
//! callers must surface a failure rather than auto-retry the whole
//! operation once a response has been applied.

use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

use crate::aggregate::round2;
use crate::catalog::LabelCatalog;
use crate::config::ClassifierConfig;
use crate::error::EngineError;
use crate::models::LabelMap;
use crate::store::CollectionStore;

/// One label/confidence pair from the classifier, confidence in `[0, 1]`.
#[derive(Debug, Clone, Deserialize)]
pub struct Prediction {
    pub label: String,
    pub confidence: f64,
}

#[derive(Debug, Deserialize)]
struct ClassifierResponse {
    predictions: Vec<Prediction>,
}

/// Send source text to the classifier and return its validated predictions.
pub async fn classify_source(
    config: &ClassifierConfig,
    code: &str,
) -> Result<Vec<Prediction>, EngineError> {
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(config.timeout_secs))
        .build()?;

    let body = serde_json::json!({ "code": code });

    let mut last_err: Option<EngineError> = None;

    for attempt in 0..=config.max_retries {
        if attempt > 0 {
            // Exponential backoff: 1s, 2s, 4s, 8s, ...
            let delay = Duration::from_secs(1 << (attempt - 1).min(5));
            tokio::time::sleep(delay).await;
        }

        let resp = client.post(&config.url).json(&body).send().await;

        match resp {
            Ok(response) => {
                let status = response.status();

                if status.is_success() {
                    let parsed: ClassifierResponse = response.json().await.map_err(|e| {
                        EngineError::Classifier(format!("unparseable response: {}", e))
                    })?;
                    return validate_predictions(parsed.predictions);
                }

                // Rate limited or server error — retry
                if status.as_u16() == 429 || status.is_server_error() {
                    let body_text = response.text().await.unwrap_or_default();
                    last_err = Some(EngineError::Classifier(format!(
                        "classifier error {}: {}",
                        status, body_text
                    )));
                    continue;
                }

                // Client error (not 429) — don't retry
                let body_text = response.text().await.unwrap_or_default();
                return Err(EngineError::Classifier(format!(
                    "classifier error {}: {}",
                    status, body_text
                )));
            }
            Err(e) => {
                last_err = Some(e.into());
                continue;
            }
        }
    }

    Err(last_err
        .unwrap_or_else(|| EngineError::Classifier("classification failed after retries".into())))
}

fn validate_predictions(predictions: Vec<Prediction>) -> Result<Vec<Prediction>, EngineError> {
    for p in &predictions {
        if !(0.0..=1.0).contains(&p.confidence) || !p.confidence.is_finite() {
            return Err(EngineError::Classifier(format!(
                "confidence {} for {} outside [0, 1]",
                p.confidence, p.label
            )));
        }
    }
    Ok(predictions)
}

/// Translate predictions into the file's new label map.
///
/// Codes the catalog cannot translate are dropped silently — experimental
/// classifier outputs must not corrupt the label namespace. Surviving
/// confidences become percentages rounded to 2 decimals. The result is a
/// replacement for any prior snapshot, not a merge with it.
pub fn merge_classification(predictions: &[Prediction], catalog: &LabelCatalog) -> LabelMap {
    let mut labels = LabelMap::new();
    for p in predictions {
        if let Some(name) = catalog.translate(&p.label) {
            labels.insert(name.to_string(), round2(p.confidence * 100.0));
        }
    }
    labels
}

/// Classify a saved file end to end: fetch its source text, call the
/// classifier, translate, and replace the stored snapshot.
pub async fn classify_file(
    store: &dyn CollectionStore,
    config: &ClassifierConfig,
    catalog: &LabelCatalog,
    file_id: &str,
) -> Result<LabelMap, EngineError> {
    let file = store
        .get_file(file_id)
        .await?
        .ok_or_else(|| EngineError::InvalidInput(format!("no file record with id {}", file_id)))?;

    let code = fetch_source(config, &file.download_url).await?;
    let predictions = classify_source(config, &code).await?;
    let labels = merge_classification(&predictions, catalog);

    debug!(file_id, labels = labels.len(), "storing classification snapshot");
    store.set_file_labels(file_id, &labels).await?;
    Ok(labels)
}

/// Fetch the file's source text from its download URL.
async fn fetch_source(config: &ClassifierConfig, download_url: &str) -> Result<String, EngineError> {
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(config.timeout_secs))
        .build()?;

    let response = client.get(download_url).send().await?;
    if !response.status().is_success() {
        return Err(EngineError::Classifier(format!(
            "fetching {} failed with {}",
            download_url,
            response.status()
        )));
    }
    Ok(response.text().await?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn prediction(label: &str, confidence: f64) -> Prediction {
        Prediction {
            label: label.to_string(),
            confidence,
        }
    }

    #[test]
    fn test_merge_translates_and_scales() {
        let catalog = LabelCatalog::default();
        let labels = merge_classification(
            &[prediction("LABEL_0", 0.8512), prediction("LABEL_1", 0.6)],
            &catalog,
        );

        assert_eq!(labels.len(), 2);
        assert_eq!(labels["DOM"], 85.12);
        assert_eq!(labels["Network"], 60.00);
    }

    #[test]
    fn test_merge_drops_unrecognized_codes() {
        let catalog = LabelCatalog::default();
        let labels = merge_classification(
            &[prediction("LABEL_0", 0.9), prediction("LABEL_99", 0.95)],
            &catalog,
        );

        assert_eq!(labels.len(), 1);
        assert!(labels.contains_key("DOM"));
    }

    #[test]
    fn test_merge_empty_predictions() {
        assert!(merge_classification(&[], &LabelCatalog::default()).is_empty());
    }

    #[test]
    fn test_validate_rejects_out_of_range_confidence() {
        assert!(validate_predictions(vec![prediction("LABEL_0", 1.2)]).is_err());
        assert!(validate_predictions(vec![prediction("LABEL_0", -0.1)]).is_err());
        assert!(validate_predictions(vec![prediction("LABEL_0", f64::NAN)]).is_err());
        assert!(validate_predictions(vec![prediction("LABEL_0", 1.0)]).is_ok());
    }
}
