use async_trait::async_trait;
use aws_config::Region;
use aws_sdk_s3::config::Credentials;
use aws_sdk_s3::primitives::ByteStream;
use bytes::Bytes;
use tracing::{info, warn};

use super::{object_name, validate_folder, FileStore, StorageError, StoredFile, Upload};
use crate::config::S3Settings;

/// Files in one S3 (or MinIO) bucket, addressed by `s3://<bucket>/<key>` URLs.
pub struct S3FileStore {
    client: aws_sdk_s3::Client,
    bucket: String,
}

impl S3FileStore {
    pub fn new(client: aws_sdk_s3::Client, bucket: String) -> Self {
        Self { client, bucket }
    }

    /// Constructs a client configured for MinIO (custom endpoint) or AWS.
    pub async fn from_settings(settings: &S3Settings) -> Self {
        let credentials = Credentials::new(
            &settings.access_key_id,
            &settings.secret_access_key,
            None,
            None,
            "recruit-static",
        );

        let mut loader = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .region(Region::new(settings.region.clone()))
            .credentials_provider(credentials);
        if let Some(endpoint) = &settings.endpoint {
            loader = loader.endpoint_url(endpoint);
        }
        let shared = loader.load().await;

        // MinIO only serves path-style addressing.
        let s3_config = aws_sdk_s3::config::Builder::from(&shared)
            .force_path_style(settings.endpoint.is_some())
            .build();

        Self::new(aws_sdk_s3::Client::from_conf(s3_config), settings.bucket.clone())
    }
}

/// Object key of an `s3://<bucket>/<key>` URL, only for URLs in `bucket`.
fn key_for<'a>(bucket: &str, url: &'a str) -> Result<&'a str, StorageError> {
    url.strip_prefix("s3://")
        .and_then(|rest| rest.strip_prefix(bucket))
        .and_then(|rest| rest.strip_prefix('/'))
        .filter(|key| !key.is_empty())
        .ok_or_else(|| StorageError::InvalidUrl(url.to_string()))
}

#[async_trait]
impl FileStore for S3FileStore {
    async fn store(&self, upload: &Upload, folder: &str) -> Result<StoredFile, StorageError> {
        validate_folder(folder)?;
        let key = format!("{folder}/{}", object_name(upload));
        let file_type = upload.file_type();

        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(&key)
            .content_type(&file_type)
            .body(ByteStream::from(upload.bytes.clone()))
            .send()
            .await
            .map_err(|e| StorageError::S3(e.to_string()))?;

        info!("Uploaded {} to s3://{}/{}", upload.file_name, self.bucket, key);

        Ok(StoredFile {
            url: format!("s3://{}/{}", self.bucket, key),
            file_type,
            size: upload.bytes.len(),
        })
    }

    async fn read(&self, url: &str) -> Result<Bytes, StorageError> {
        let key = key_for(&self.bucket, url)?;
        let object = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| {
                if e.as_service_error().is_some_and(|se| se.is_no_such_key()) {
                    StorageError::NotFound(url.to_string())
                } else {
                    StorageError::S3(e.to_string())
                }
            })?;

        let data = object
            .body
            .collect()
            .await
            .map_err(|e| StorageError::S3(e.to_string()))?;
        Ok(data.into_bytes())
    }

    async fn delete(&self, url: &str) -> bool {
        let key = match key_for(&self.bucket, url) {
            Ok(key) => key,
            Err(e) => {
                warn!("Refusing to delete {url}: {e}");
                return false;
            }
        };
        match self
            .client
            .delete_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
        {
            Ok(_) => {
                info!("Deleted {url}");
                true
            }
            Err(e) => {
                warn!("Could not delete {url}: {e}");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_for_own_bucket() {
        assert_eq!(
            key_for("resumes", "s3://resumes/resumes/1_abc.pdf").unwrap(),
            "resumes/1_abc.pdf"
        );
    }

    #[test]
    fn test_key_for_rejects_foreign_urls() {
        assert!(key_for("resumes", "s3://other/resumes/1_abc.pdf").is_err());
        assert!(key_for("resumes", "s3://resumes-old/1_abc.pdf").is_err());
        assert!(key_for("resumes", "/uploads/resumes/1_abc.pdf").is_err());
        assert!(key_for("resumes", "s3://resumes/").is_err());
    }
}
