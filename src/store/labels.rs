//! The label collection: element labels enriched with element metadata.

use std::collections::HashMap;

use serde::Serialize;
use serde_json::error::Category;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::error::StoreError;

use super::normalize::{now_timestamp, Record};
use super::{AnnotationStore, DETAILED_LABELS_FILE, ELEMENTS_FILE, LABELS_FILE, SORTED_ELEMENTS_FILE};

/// Result of a [`AnnotationStore::save_labels`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SaveLabelsOutcome {
    /// Total labels stored after the merge
    pub count: usize,
    /// Existing labels whose `label`/`timestamp` were replaced
    pub updated: usize,
    /// Labels appended as new records
    pub added: usize,
}

impl AnnotationStore {
    /// Return the stored labels.
    ///
    /// Prefers `detailed_labels.json`, falls back to `labels.json`, and
    /// returns an empty list when neither is readable. Malformed files are
    /// logged and skipped, never reported to the caller.
    pub async fn get_labels(&self) -> Vec<Value> {
        for name in [DETAILED_LABELS_FILE, LABELS_FILE] {
            match self.files.read::<Vec<Value>>(name).await {
                Ok(Some(labels)) => {
                    debug!(file = name, count = labels.len(), "Returning labels");
                    return labels;
                }
                Ok(None) => {}
                Err(e) => warn!(file = name, "Skipping unreadable label file: {}", e),
            }
        }

        debug!("No label files found, returning empty list");
        Vec::new()
    }

    /// Merge submitted labels into the label collection.
    ///
    /// Each label is keyed by its selector. When the selector names a known
    /// element, the stored record starts from the element's fields. Existing
    /// records get their `label` and `timestamp` replaced; unknown selectors
    /// are appended. Stored entries that are not objects are kept as they
    /// are. The result is written to both label files.
    ///
    /// A `labels.json` that does not parse is replaced. One that parses but
    /// is not an array is reported as [`StoreError::Json`].
    pub async fn save_labels(&self, new_labels: Vec<Record>) -> Result<SaveLabelsOutcome, StoreError> {
        let elements = self.element_index().await;

        let mut labels: Vec<Value> = match self.files.read(LABELS_FILE).await {
            Ok(Some(labels)) => labels,
            Ok(None) => Vec::new(),
            Err(StoreError::Json { path, source })
                if matches!(source.classify(), Category::Syntax | Category::Eof) =>
            {
                warn!(path = %path, "Discarding unparseable label file: {}", source);
                Vec::new()
            }
            Err(e) => return Err(e),
        };

        let mut positions: HashMap<String, usize> = HashMap::new();
        for (index, label) in labels.iter().enumerate() {
            if let Some(selector) = label.as_object().and_then(selector_of) {
                positions.entry(selector.to_string()).or_insert(index);
            }
        }

        let mut updated = 0;
        let mut added = 0;

        for submitted in new_labels {
            let selector = selector_of(&submitted).unwrap_or_default().to_string();
            let label = submitted.get("label").cloned().unwrap_or(Value::Null);
            let timestamp = submitted
                .get("timestamp")
                .cloned()
                .unwrap_or_else(|| Value::String(now_timestamp()));

            let complete = match elements.get(&selector) {
                Some(element) => {
                    let mut complete = element.clone();
                    complete.insert("label".to_string(), label.clone());
                    complete.insert("timestamp".to_string(), timestamp.clone());
                    complete
                }
                None => {
                    let mut complete = submitted;
                    complete.insert("timestamp".to_string(), timestamp.clone());
                    complete
                }
            };

            match positions
                .get(&selector)
                .and_then(|&index| labels.get_mut(index))
                .and_then(Value::as_object_mut)
            {
                Some(existing) => {
                    existing.insert("label".to_string(), label);
                    existing.insert("timestamp".to_string(), timestamp);
                    updated += 1;
                }
                None => {
                    positions.insert(selector, labels.len());
                    labels.push(Value::Object(complete));
                    added += 1;
                }
            }
        }

        self.files.write(LABELS_FILE, &labels).await?;
        self.files.write(DETAILED_LABELS_FILE, &labels).await?;

        info!(
            count = labels.len(),
            updated = updated,
            added = added,
            "Saved labels"
        );

        Ok(SaveLabelsOutcome {
            count: labels.len(),
            updated,
            added,
        })
    }

    /// Index the known elements by selector for label enrichment.
    async fn element_index(&self) -> HashMap<String, Record> {
        let mut index = HashMap::new();

        for name in [SORTED_ELEMENTS_FILE, ELEMENTS_FILE] {
            match self.files.read::<Vec<Record>>(name).await {
                Ok(Some(elements)) => {
                    for element in elements {
                        if let Some(selector) = selector_of(&element).map(str::to_string) {
                            index.insert(selector, element);
                        }
                    }
                    debug!(file = name, count = index.len(), "Loaded element index");
                    break;
                }
                Ok(None) => {}
                Err(e) => warn!(file = name, "Skipping unreadable element file: {}", e),
            }
        }

        index
    }
}

fn selector_of(record: &Record) -> Option<&str> {
    record.get("selector").and_then(Value::as_str)
}
