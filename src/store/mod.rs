//! Flat-file annotation store.
//!
//! All collections are JSON files in a single data directory:
//!
//! ```text
//! elements.json          raw element dump (reference data)
//! sorted_elements.json   elements with `area`, largest first (derived cache)
//! labels.json            element labels
//! detailed_labels.json   copy of labels.json kept for older clients
//! <page>.json            per-page annotations, one record per selector
//! ```
//!
//! Every mutation reads the whole file, changes it in memory and writes the
//! whole file back. There is no locking: concurrent writers to the same file
//! race and the last one wins.

mod annotations;
mod elements;
mod files;
mod labels;
mod normalize;

use std::path::{Path, PathBuf};

pub use annotations::{AppendOutcome, RemoveOutcome};
pub use elements::sort_by_area;
pub use files::{file_name_from_url, validate_file_name, JsonFiles, JSON_SUFFIX};
pub use labels::SaveLabelsOutcome;
pub use normalize::{
    label_sequence, normalize, now_timestamp, selector_parts, Annotation, NormalizePolicy,
    Record, Rejection, DEFAULT_COLOR, DEFAULT_TAG,
};

/// Raw element dump.
pub const ELEMENTS_FILE: &str = "elements.json";

/// Area-sorted element cache.
pub const SORTED_ELEMENTS_FILE: &str = "sorted_elements.json";

/// Label collection.
pub const LABELS_FILE: &str = "labels.json";

/// Mirror of the label collection.
pub const DETAILED_LABELS_FILE: &str = "detailed_labels.json";

/// Element, label and annotation collections under one data directory.
#[derive(Debug, Clone)]
pub struct AnnotationStore {
    files: JsonFiles,
}

impl AnnotationStore {
    /// Create a store rooted at `data_dir`.
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            files: JsonFiles::new(data_dir),
        }
    }

    /// The data directory.
    pub fn data_dir(&self) -> &Path {
        self.files.root()
    }
}
