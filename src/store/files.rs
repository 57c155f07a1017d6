//! JSON collection files inside the data directory.
//!
//! Every collection is a single file holding a top-level JSON value, written
//! pretty-printed with two-space indentation. Writes replace the whole file.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;
use url::Url;

use crate::error::StoreError;

/// Suffix every annotation file name must carry.
pub const JSON_SUFFIX: &str = ".json";

/// Reader/writer for the JSON files under one directory.
#[derive(Debug, Clone)]
pub struct JsonFiles {
    root: PathBuf,
}

impl JsonFiles {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path_of(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }

    /// Whether the named file exists.
    pub async fn exists(&self, name: &str) -> Result<bool, StoreError> {
        let path = self.path_of(name);
        tokio::fs::try_exists(&path)
            .await
            .map_err(|source| StoreError::Io {
                path: path.display().to_string(),
                source,
            })
    }

    /// Read and parse the named file.
    ///
    /// Returns `Ok(None)` when the file does not exist.
    pub async fn read<T: DeserializeOwned>(&self, name: &str) -> Result<Option<T>, StoreError> {
        let path = self.path_of(name);
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(StoreError::Io {
                    path: path.display().to_string(),
                    source,
                })
            }
        };

        serde_json::from_slice(&bytes)
            .map(Some)
            .map_err(|source| StoreError::Json {
                path: path.display().to_string(),
                source,
            })
    }

    /// Serialize `value` and replace the named file with it.
    pub async fn write<T: Serialize + ?Sized>(&self, name: &str, value: &T) -> Result<(), StoreError> {
        let path = self.path_of(name);
        let json = serde_json::to_vec_pretty(value).map_err(|source| StoreError::Json {
            path: path.display().to_string(),
            source,
        })?;

        tokio::fs::write(&path, json)
            .await
            .map_err(|source| StoreError::Io {
                path: path.display().to_string(),
                source,
            })?;

        debug!(path = %path.display(), "Wrote collection file");
        Ok(())
    }
}

/// Check that `name` is a plain `*.json` basename.
///
/// Names with path separators or parent references are rejected so that a
/// request can never address a file outside the data directory.
pub fn validate_file_name(name: &str) -> Result<&str, StoreError> {
    let invalid = || StoreError::InvalidFileName(name.to_string());

    if name.len() <= JSON_SUFFIX.len() || !name.ends_with(JSON_SUFFIX) {
        return Err(invalid());
    }
    if name.contains('/') || name.contains('\\') || name.contains("..") {
        return Err(invalid());
    }
    Ok(name)
}

/// Extract the basename of a URL or path, ignoring any query and fragment.
///
/// `https://host/pages/home.json?v=2` and `pages/home.json` both yield
/// `home.json`.
pub fn file_name_from_url(raw: &str) -> String {
    let path = match Url::parse(raw) {
        Ok(url) => url.path().to_string(),
        Err(_) => raw
            .split(['?', '#'])
            .next()
            .unwrap_or_default()
            .to_string(),
    };

    path.rsplit('/').next().unwrap_or_default().to_string()
}
