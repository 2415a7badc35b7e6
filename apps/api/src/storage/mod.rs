//! Uploaded file storage.
//!
//! `AppState` holds an `Arc<dyn FileStore>`: `S3FileStore` when `S3_BUCKET`
//! is configured, `LocalFileStore` under `STORAGE_PATH` otherwise.

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use serde::Serialize;
use thiserror::Error;
use tracing::info;

use crate::config::Config;

pub mod extract;
pub mod local;
pub mod s3;

pub use local::LocalFileStore;
pub use s3::S3FileStore;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("File not found: {0}")]
    NotFound(String),

    #[error("S3 error: {0}")]
    S3(String),

    #[error("Invalid file URL or folder: {0}")]
    InvalidUrl(String),
}

/// A file received from a client.
#[derive(Debug, Clone)]
pub struct Upload {
    pub file_name: String,
    pub content_type: Option<String>,
    pub bytes: Bytes,
}

impl Upload {
    /// Lowercased extension with its leading dot, or empty.
    pub fn extension(&self) -> String {
        std::path::Path::new(&self.file_name)
            .extension()
            .and_then(|ext| ext.to_str())
            .filter(|ext| ext.chars().all(|c| c.is_ascii_alphanumeric()))
            .map(|ext| format!(".{}", ext.to_ascii_lowercase()))
            .unwrap_or_default()
    }

    pub fn file_type(&self) -> String {
        self.content_type
            .clone()
            .filter(|ct| !ct.trim().is_empty())
            .unwrap_or_else(|| "application/octet-stream".to_string())
    }
}

/// Where a stored file ended up.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StoredFile {
    pub url: String,
    pub file_type: String,
    pub size: usize,
}

#[async_trait]
pub trait FileStore: Send + Sync {
    async fn store(&self, upload: &Upload, folder: &str) -> Result<StoredFile, StorageError>;

    async fn read(&self, url: &str) -> Result<Bytes, StorageError>;

    /// Removes a stored file. Returns false if it did not exist or could not be removed.
    async fn delete(&self, url: &str) -> bool;
}

pub async fn from_config(config: &Config) -> Result<Arc<dyn FileStore>, StorageError> {
    match &config.s3 {
        Some(settings) => {
            info!("File storage: s3://{}", settings.bucket);
            Ok(Arc::new(S3FileStore::from_settings(settings).await))
        }
        None => {
            info!("File storage: local directory {}", config.storage_path);
            Ok(Arc::new(LocalFileStore::new(&config.storage_path).await?))
        }
    }
}

/// `<unix seconds>_<uuid><ext>`, unique per call.
fn object_name(upload: &Upload) -> String {
    format!(
        "{}_{}{}",
        chrono::Utc::now().timestamp(),
        uuid::Uuid::new_v4().simple(),
        upload.extension()
    )
}

/// Folder names are a single path segment of letters, digits, `-` or `_`.
fn validate_folder(folder: &str) -> Result<(), StorageError> {
    let valid = !folder.is_empty()
        && folder
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if valid {
        Ok(())
    } else {
        Err(StorageError::InvalidUrl(folder.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn upload(name: &str, content_type: Option<&str>) -> Upload {
        Upload {
            file_name: name.to_string(),
            content_type: content_type.map(str::to_string),
            bytes: Bytes::from_static(b"x"),
        }
    }

    #[test]
    fn test_extension_is_normalized() {
        assert_eq!(upload("CV.PDF", None).extension(), ".pdf");
        assert_eq!(upload("notes", None).extension(), "");
        assert_eq!(upload("evil.p/df", None).extension(), "");
    }

    #[test]
    fn test_file_type_defaults_to_octet_stream() {
        assert_eq!(upload("a.txt", None).file_type(), "application/octet-stream");
        assert_eq!(upload("a.txt", Some("text/plain")).file_type(), "text/plain");
    }

    #[test]
    fn test_folder_validation() {
        assert!(validate_folder("resumes").is_ok());
        assert!(validate_folder("job-docs").is_ok());
        assert!(validate_folder("../etc").is_err());
        assert!(validate_folder("").is_err());
    }

    #[test]
    fn test_object_names_are_unique() {
        let file = upload("cv.pdf", None);
        let a = object_name(&file);
        let b = object_name(&file);
        assert_ne!(a, b);
        assert!(a.ends_with(".pdf"));
    }
}
