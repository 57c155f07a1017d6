//! Element reference data and its area-sorted cache.

use std::cmp::Ordering;

use serde_json::{Number, Value};
use tracing::info;

use crate::error::StoreError;

use super::normalize::Record;
use super::{AnnotationStore, ELEMENTS_FILE, SORTED_ELEMENTS_FILE};

impl AnnotationStore {
    /// Return the element list sorted by area, largest first.
    ///
    /// The sorted list is cached in `sorted_elements.json`. On the first call
    /// it is derived from `elements.json` and written; later calls read the
    /// cache, so repeated calls return the identical sequence.
    pub async fn get_elements(&self) -> Result<Vec<Record>, StoreError> {
        if let Some(sorted) = self.files.read::<Vec<Record>>(SORTED_ELEMENTS_FILE).await? {
            return Ok(sorted);
        }

        let raw = self
            .files
            .read::<Vec<Record>>(ELEMENTS_FILE)
            .await?
            .ok_or_else(|| StoreError::NotFound("No elements found".to_string()))?;

        let sorted = sort_by_area(raw)?;
        self.files.write(SORTED_ELEMENTS_FILE, &sorted).await?;

        info!(count = sorted.len(), "Derived sorted element cache");
        Ok(sorted)
    }
}

/// Compute `area = width * height` for every element and sort descending.
///
/// The sort is stable: elements of equal area keep their input order.
pub fn sort_by_area(elements: Vec<Record>) -> Result<Vec<Record>, StoreError> {
    let mut with_area = Vec::with_capacity(elements.len());

    for (index, mut element) in elements.into_iter().enumerate() {
        let area = element_area(&element).ok_or_else(|| {
            let selector = element
                .get("selector")
                .and_then(Value::as_str)
                .unwrap_or("<no selector>");
            StoreError::InvalidData(format!(
                "element {} ({}) has no numeric width/height",
                index, selector
            ))
        })?;

        let key = area.as_f64().unwrap_or(0.0);
        element.insert("area".to_string(), Value::Number(area));
        with_area.push((key, element));
    }

    with_area.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(Ordering::Equal));
    Ok(with_area.into_iter().map(|(_, element)| element).collect())
}

/// Area of an element, kept integral when both dimensions are integers.
fn element_area(element: &Record) -> Option<Number> {
    let (Some(Value::Number(width)), Some(Value::Number(height))) =
        (element.get("width"), element.get("height"))
    else {
        return None;
    };

    if let (Some(w), Some(h)) = (width.as_i64(), height.as_i64()) {
        if let Some(area) = w.checked_mul(h) {
            return Some(Number::from(area));
        }
    }

    Number::from_f64(width.as_f64()? * height.as_f64()?)
}
