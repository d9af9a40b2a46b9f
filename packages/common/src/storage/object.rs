use async_trait::async_trait;
use s3::creds::Credentials;
use s3::error::S3Error;
use s3::{Bucket, Region};
use tracing::debug;

use super::error::StorageError;
use super::key::BlobKey;
use super::traits::{BlobStore, verify_digest};
use crate::config::ObjectStoreConfig;

/// S3-compatible blob store.
///
/// Objects live at `{prefix}/{2 hex chars}/{62 hex chars}.{ext}`, mirroring the
/// filesystem layout. A single PUT is atomic, so no temp-object dance is needed.
pub struct ObjectBlobStore {
    bucket: Box<Bucket>,
    prefix: String,
}

impl ObjectBlobStore {
    pub fn new(config: &ObjectStoreConfig) -> Result<Self, StorageError> {
        let region = match &config.endpoint {
            Some(endpoint) => Region::Custom {
                region: config.region.clone(),
                endpoint: endpoint.clone(),
            },
            None => config
                .region
                .parse()
                .map_err(|e| StorageError::Backend(format!("invalid region: {e}")))?,
        };

        let credentials = Credentials::new(
            Some(&config.access_key),
            Some(&config.secret_key),
            None,
            None,
            None,
        )
        .map_err(|e| StorageError::Backend(format!("invalid credentials: {e}")))?;

        let mut bucket = Bucket::new(&config.bucket, region, credentials).map_err(backend)?;
        if config.path_style {
            bucket = bucket.with_path_style();
        }

        Ok(Self {
            bucket,
            prefix: config.prefix.trim_matches('/').to_string(),
        })
    }

    fn object_path(&self, key: &BlobKey) -> String {
        let hash = key.hash();
        format!(
            "{}/{}/{}.{}",
            self.prefix,
            hash.shard(),
            hash.shard_rest(),
            key.extension()
        )
    }
}

fn backend(err: S3Error) -> StorageError {
    StorageError::Backend(err.to_string())
}

fn is_not_found(err: &S3Error) -> bool {
    matches!(err, S3Error::HttpFailWithBody(404, _))
}

fn check_status(code: u16, path: &str) -> Result<(), StorageError> {
    match code {
        200..=299 => Ok(()),
        404 => Err(StorageError::NotFound(path.to_string())),
        other => Err(StorageError::Backend(format!(
            "unexpected status {other} for {path}"
        ))),
    }
}

#[async_trait]
impl BlobStore for ObjectBlobStore {
    async fn save(&self, key: &BlobKey, data: &[u8]) -> Result<(), StorageError> {
        verify_digest(key, data)?;

        if self.exists(key).await? {
            debug!(%key, "object already present");
            return Ok(());
        }

        let path = self.object_path(key);
        let response = self.bucket.put_object(&path, data).await.map_err(backend)?;
        check_status(response.status_code(), &path)?;
        debug!(%key, size = data.len(), "object written");
        Ok(())
    }

    async fn get(&self, key: &BlobKey) -> Result<Vec<u8>, StorageError> {
        let path = self.object_path(key);
        match self.bucket.get_object(&path).await {
            Ok(response) => {
                check_status(response.status_code(), &key.to_string())?;
                Ok(response.bytes().to_vec())
            }
            Err(e) if is_not_found(&e) => Err(StorageError::NotFound(key.to_string())),
            Err(e) => Err(backend(e)),
        }
    }

    async fn delete(&self, key: &BlobKey) -> Result<(), StorageError> {
        // S3 DELETE succeeds for missing objects; probe first so callers see NotFound.
        if !self.exists(key).await? {
            return Err(StorageError::NotFound(key.to_string()));
        }
        let path = self.object_path(key);
        let response = self.bucket.delete_object(&path).await.map_err(backend)?;
        check_status(response.status_code(), &path)
    }

    async fn exists(&self, key: &BlobKey) -> Result<bool, StorageError> {
        match self.bucket.head_object(self.object_path(key)).await {
            Ok((_, 404)) => Ok(false),
            Ok((_, code)) => check_status(code, &key.to_string()).map(|()| true),
            Err(e) if is_not_found(&e) => Ok(false),
            Err(e) => Err(backend(e)),
        }
    }
}
