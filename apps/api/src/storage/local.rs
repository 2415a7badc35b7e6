use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use bytes::Bytes;
use tracing::{info, warn};

use super::{object_name, validate_folder, FileStore, StorageError, StoredFile, Upload};

const URL_PREFIX: &str = "/uploads/";

/// Files on the local filesystem, addressed by `/uploads/<folder>/<name>` URLs.
pub struct LocalFileStore {
    root: PathBuf,
}

impl LocalFileStore {
    pub async fn new(root: impl AsRef<Path>) -> Result<Self, StorageError> {
        let root = root.as_ref().to_path_buf();
        tokio::fs::create_dir_all(&root).await?;
        Ok(Self { root })
    }

    /// Maps a URL back to a path under the root, rejecting anything that escapes it.
    fn resolve(&self, url: &str) -> Result<PathBuf, StorageError> {
        let relative = url
            .strip_prefix(URL_PREFIX)
            .ok_or_else(|| StorageError::InvalidUrl(url.to_string()))?;
        let relative = Path::new(relative);
        let escapes = relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_)));
        if escapes || relative.as_os_str().is_empty() {
            return Err(StorageError::InvalidUrl(url.to_string()));
        }
        Ok(self.root.join(relative))
    }
}

#[async_trait]
impl FileStore for LocalFileStore {
    async fn store(&self, upload: &Upload, folder: &str) -> Result<StoredFile, StorageError> {
        validate_folder(folder)?;
        let dir = self.root.join(folder);
        tokio::fs::create_dir_all(&dir).await?;

        let name = object_name(upload);
        let path = dir.join(&name);
        tokio::fs::write(&path, &upload.bytes).await?;
        info!("Stored {} ({} bytes) at {}", upload.file_name, upload.bytes.len(), path.display());

        Ok(StoredFile {
            url: format!("{URL_PREFIX}{folder}/{name}"),
            file_type: upload.file_type(),
            size: upload.bytes.len(),
        })
    }

    async fn read(&self, url: &str) -> Result<Bytes, StorageError> {
        let path = self.resolve(url)?;
        match tokio::fs::read(&path).await {
            Ok(content) => Ok(Bytes::from(content)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(StorageError::NotFound(url.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn delete(&self, url: &str) -> bool {
        let path = match self.resolve(url) {
            Ok(path) => path,
            Err(e) => {
                warn!("Refusing to delete {url}: {e}");
                return false;
            }
        };
        match tokio::fs::remove_file(&path).await {
            Ok(()) => {
                info!("Deleted stored file {url}");
                true
            }
            Err(e) => {
                warn!("Could not delete stored file {url}: {e}");
                false
            }
        }
    }
}
