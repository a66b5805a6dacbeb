//! Object store client.
//!
//! Thin wrapper over the S3 API with a custom endpoint and path-style
//! addressing, so it works against MinIO and other S3-compatible stores.
//! Unlike a single-bucket client, every call addresses `(bucket, key)`
//! because the job message carries the bucket.

use std::path::Path;

use aws_config::BehaviorVersion;
use aws_credential_types::Credentials;
use aws_sdk_s3::config::{Builder, Region};
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;
use tracing::{debug, info};

use crate::error::{StorageError, StorageResult};
use crate::keys::{guess_content_type, validate_key};

/// Configuration for the object store client.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// S3 API endpoint URL
    pub endpoint_url: String,
    /// Access key ID
    pub access_key_id: String,
    /// Secret access key
    pub secret_access_key: String,
    /// Region (MinIO accepts any value here)
    pub region: String,
}

impl StoreConfig {
    /// Create config from environment variables.
    pub fn from_env() -> StorageResult<Self> {
        Ok(Self {
            endpoint_url: std::env::var("OBJECT_STORE_ENDPOINT")
                .map_err(|_| StorageError::config_error("OBJECT_STORE_ENDPOINT not set"))?,
            access_key_id: std::env::var("OBJECT_STORE_ACCESS_KEY_ID")
                .map_err(|_| StorageError::config_error("OBJECT_STORE_ACCESS_KEY_ID not set"))?,
            secret_access_key: std::env::var("OBJECT_STORE_SECRET_ACCESS_KEY").map_err(|_| {
                StorageError::config_error("OBJECT_STORE_SECRET_ACCESS_KEY not set")
            })?,
            region: std::env::var("OBJECT_STORE_REGION").unwrap_or_else(|_| "us-east-1".to_string()),
        })
    }
}

/// S3-compatible object store gateway.
#[derive(Clone)]
pub struct ObjectStore {
    client: Client,
}

impl ObjectStore {
    /// Create a new client from configuration.
    pub fn new(config: StoreConfig) -> Self {
        let credentials = Credentials::new(
            &config.access_key_id,
            &config.secret_access_key,
            None,
            None,
            "vanon",
        );

        let sdk_config = Builder::new()
            .behavior_version(BehaviorVersion::latest())
            .endpoint_url(&config.endpoint_url)
            .region(Region::new(config.region))
            .credentials_provider(credentials)
            .force_path_style(true)
            .build();

        Self {
            client: Client::from_conf(sdk_config),
        }
    }

    /// Create from environment variables.
    pub fn from_env() -> StorageResult<Self> {
        Ok(Self::new(StoreConfig::from_env()?))
    }

    /// Fetch an object to a local file, creating parent directories.
    pub async fn fetch(
        &self,
        bucket: &str,
        key: &str,
        path: impl AsRef<Path>,
    ) -> StorageResult<()> {
        validate_key(key)?;
        let path = path.as_ref();
        let object = format!("{}/{}", bucket, key);
        debug!("Fetching {} to {}", object, path.display());

        let response = self
            .client
            .get_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| {
                if e.to_string().contains("NoSuchKey") {
                    StorageError::not_found(&object)
                } else {
                    StorageError::fetch_failed(&object, e.to_string())
                }
            })?;

        let bytes = response
            .body
            .collect()
            .await
            .map_err(|e| StorageError::fetch_failed(&object, e.to_string()))?
            .into_bytes();

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        tokio::fs::write(path, bytes).await?;

        info!("Fetched {}/{} to {}", bucket, key, path.display());
        Ok(())
    }

    /// Publish a local file to the store.
    pub async fn publish(
        &self,
        bucket: &str,
        key: &str,
        path: impl AsRef<Path>,
    ) -> StorageResult<()> {
        validate_key(key)?;
        let path = path.as_ref();
        let object = format!("{}/{}", bucket, key);
        debug!("Publishing {} to {}", path.display(), object);

        let body = ByteStream::from_path(path)
            .await
            .map_err(|e| StorageError::publish_failed(&object, e.to_string()))?;

        self.client
            .put_object()
            .bucket(bucket)
            .key(key)
            .body(body)
            .content_type(guess_content_type(key))
            .send()
            .await
            .map_err(|e| StorageError::publish_failed(&object, e.to_string()))?;

        info!("Published {} to {}/{}", path.display(), bucket, key);
        Ok(())
    }

    /// Check if an object exists.
    pub async fn exists(&self, bucket: &str, key: &str) -> StorageResult<bool> {
        match self
            .client
            .head_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
        {
            Ok(_) => Ok(true),
            Err(e) => {
                if e.to_string().contains("NotFound") || e.to_string().contains("NoSuchKey") {
                    Ok(false)
                } else {
                    Err(StorageError::Transport(e.to_string()))
                }
            }
        }
    }

    /// Check connectivity to the store by heading a bucket.
    pub async fn check_connectivity(&self, bucket: &str) -> StorageResult<()> {
        self.client
            .head_bucket()
            .bucket(bucket)
            .send()
            .await
            .map_err(|e| StorageError::Transport(format!("Store connectivity check failed: {}", e)))?;
        Ok(())
    }
}
