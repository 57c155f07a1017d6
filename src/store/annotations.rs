//! Per-page annotation files.
//!
//! Each page has its own `<name>.json` file holding one record per selector.
//! Appends replace records by selector (last write wins); removals drop a
//! single label from a record, or the record itself once no label is left.

use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info};

use crate::error::StoreError;

use super::files::{file_name_from_url, validate_file_name};
use super::normalize::{normalize, NormalizePolicy, Record};
use super::AnnotationStore;

/// Result of [`AnnotationStore::append_annotations`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AppendOutcome {
    /// File the records were merged into
    pub file: String,
    /// Records in the request
    pub submitted: usize,
    /// Records normalized and merged
    pub written: usize,
    /// Records skipped for missing selector or label
    pub skipped: usize,
}

/// What [`AnnotationStore::remove_annotation`] changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RemoveOutcome {
    /// The whole record was deleted
    RecordRemoved,
    /// One label was removed, the record remains
    LabelRemoved,
    /// The selector exists but does not carry the label
    Unchanged,
}

impl AnnotationStore {
    /// Read an annotation file, returning `[]` when it does not exist.
    pub async fn get_annotations(&self, file: &str) -> Result<Value, StoreError> {
        let file = validate_file_name(file)?;
        Ok(self
            .files
            .read::<Value>(file)
            .await?
            .unwrap_or_else(|| Value::Array(Vec::new())))
    }

    /// Replace an annotation file with `data` as submitted.
    pub async fn save_annotations(&self, file: &str, data: &Value) -> Result<(), StoreError> {
        let file = validate_file_name(file)?;
        self.files.write(file, data).await?;
        info!(file = file, "Saved annotation file");
        Ok(())
    }

    /// Normalize `records` and merge them into the file named by `source`.
    ///
    /// `source` may be a page URL or path; its basename is the file name and
    /// must end in `.json`. Records without a selector or label are skipped.
    /// Every merged record replaces any stored record with the same selector.
    pub async fn append_annotations(
        &self,
        source: &str,
        records: Option<Value>,
    ) -> Result<AppendOutcome, StoreError> {
        let file = file_name_from_url(source);
        validate_file_name(&file)?;

        let records = match records {
            Some(Value::Array(records)) if !records.is_empty() => records,
            _ => return Err(StoreError::InvalidRequest("Invalid annotation data".to_string())),
        };
        let submitted = records.len();

        let mut annotations: Vec<Record> = self.files.read(&file).await?.unwrap_or_default();
        let mut written = 0;

        for value in records {
            let annotation = match normalize(value, NormalizePolicy::local()) {
                Ok(annotation) => annotation,
                Err(reason) => {
                    debug!(file = %file, "Skipping annotation: {}", reason);
                    continue;
                }
            };

            let selector = annotation.selector.clone();
            annotations
                .retain(|a| a.get("selector").and_then(Value::as_str) != Some(selector.as_str()));
            annotations.push(annotation.into_record());
            written += 1;

            debug!(file = %file, selector = %selector, "Added/updated annotation");
        }

        self.files.write(&file, &annotations).await?;
        info!(
            file = %file,
            submitted = submitted,
            written = written,
            "Appended annotations"
        );

        Ok(AppendOutcome {
            file,
            submitted,
            written,
            skipped: submitted - written,
        })
    }

    /// Remove `label` from the record with `selector` in `file`.
    ///
    /// Three record shapes are handled: a legacy plural `labels` array, a
    /// `label` array as written by [`append_annotations`](Self::append_annotations),
    /// and a scalar `label`. A record left without labels is deleted.
    pub async fn remove_annotation(
        &self,
        file: &str,
        selector: &str,
        label: &Value,
    ) -> Result<RemoveOutcome, StoreError> {
        let file = validate_file_name(file)?;

        if selector.is_empty() || is_blank(label) {
            return Err(StoreError::InvalidRequest(
                "Selector and label are required".to_string(),
            ));
        }

        let mut annotations: Vec<Record> = self
            .files
            .read(file)
            .await?
            .ok_or_else(|| StoreError::NotFound("Annotation file not found".to_string()))?;

        let index = annotations
            .iter()
            .position(|a| a.get("selector").and_then(Value::as_str) == Some(selector))
            .ok_or_else(|| StoreError::NotFound("Annotation not found".to_string()))?;

        let outcome = remove_label(&mut annotations[index], label);
        if outcome == RemoveOutcome::RecordRemoved {
            annotations.remove(index);
        }

        self.files.write(file, &annotations).await?;
        info!(file = file, selector = selector, outcome = ?outcome, "Removed annotation label");

        Ok(outcome)
    }
}

/// Apply a label removal to one record.
///
/// Returns [`RemoveOutcome::RecordRemoved`] when the caller should delete
/// the record.
fn remove_label(record: &mut Record, label: &Value) -> RemoveOutcome {
    if let Some(Value::Array(labels)) = record.get("labels") {
        if labels.len() == 1 && &labels[0] == label {
            return RemoveOutcome::RecordRemoved;
        }

        let Some(position) = labels.iter().position(|l| l == label) else {
            return RemoveOutcome::Unchanged;
        };

        let mut labels = labels.clone();
        labels.remove(position);
        let last = labels.last().cloned();
        record.insert("labels".to_string(), Value::Array(labels));

        if record.get("label") == Some(label) {
            if let Some(last) = last {
                record.insert("label".to_string(), last);
            }
        }
        return RemoveOutcome::LabelRemoved;
    }

    match record.get_mut("label") {
        Some(Value::Array(labels)) => {
            let Some(position) = labels.iter().position(|l| l == label) else {
                return RemoveOutcome::Unchanged;
            };
            labels.remove(position);
            if labels.is_empty() {
                RemoveOutcome::RecordRemoved
            } else {
                RemoveOutcome::LabelRemoved
            }
        }
        Some(current) if *current == *label => RemoveOutcome::RecordRemoved,
        _ => RemoveOutcome::Unchanged,
    }
}

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        Value::Array(items) => items.is_empty(),
        _ => false,
    }
}
