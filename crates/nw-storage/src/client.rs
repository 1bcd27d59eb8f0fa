//! S3 client implementation.

use std::time::Duration;

use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_credential_types::Credentials;
use aws_sdk_s3::config::{Builder, Region};
use aws_sdk_s3::presigning::PresigningConfig;
use aws_sdk_s3::Client;
use tracing::debug;

use crate::error::{StorageError, StorageResult};

/// Default lifetime of presigned URLs (1 hour).
pub const DEFAULT_PRESIGN_EXPIRY_SECS: u64 = 3600;

/// Maximum allowed expiry (7 days), the SigV4 ceiling.
pub const MAX_PRESIGN_EXPIRY_SECS: u64 = 604_800;

/// Configuration for the S3 client.
#[derive(Debug, Clone)]
pub struct S3Config {
    /// AWS region
    pub region: String,
    /// Bucket holding videos and documents
    pub bucket_name: String,
    /// Access key ID
    pub access_key_id: String,
    /// Secret access key
    pub secret_access_key: String,
    /// Custom S3-compatible endpoint (MinIO, R2, LocalStack)
    pub endpoint_url: Option<String>,
    /// Lifetime of issued presigned URLs
    pub presign_expiry: Duration,
}

impl S3Config {
    /// Create config from environment variables.
    ///
    /// Region, bucket and credentials are mandatory; a missing value is a
    /// startup failure.
    pub fn from_env() -> StorageResult<Self> {
        Ok(Self {
            region: required_env("AWS_REGION")?,
            bucket_name: required_env("S3_BUCKET_NAME")?,
            access_key_id: required_env("AWS_ACCESS_KEY_ID")?,
            secret_access_key: required_env("AWS_SECRET_ACCESS_KEY")?,
            endpoint_url: std::env::var("S3_ENDPOINT_URL").ok().filter(|s| !s.is_empty()),
            presign_expiry: Duration::from_secs(
                std::env::var("PRESIGN_EXPIRY_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(DEFAULT_PRESIGN_EXPIRY_SECS)
                    .min(MAX_PRESIGN_EXPIRY_SECS),
            ),
        })
    }
}

fn required_env(name: &str) -> StorageResult<String> {
    std::env::var(name)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| StorageError::config_error(format!("{} not set", name)))
}

/// Low-level object storage operations used by the capability issuer.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Presign a PUT of `key` with the given content type.
    async fn presign_put(
        &self,
        key: &str,
        content_type: &str,
        expires_in: Duration,
    ) -> StorageResult<String>;

    /// Presign a GET of `key`.
    async fn presign_get(&self, key: &str, expires_in: Duration) -> StorageResult<String>;

    /// Check whether `key` exists.
    async fn exists(&self, key: &str) -> StorageResult<bool>;

    /// Check connectivity to the backing bucket.
    async fn check_connectivity(&self) -> StorageResult<()>;
}

/// S3 storage client.
#[derive(Clone)]
pub struct S3ObjectStore {
    client: Client,
    bucket: String,
}

impl S3ObjectStore {
    /// Create a new S3 client from configuration.
    pub fn new(config: &S3Config) -> Self {
        let credentials = Credentials::new(
            &config.access_key_id,
            &config.secret_access_key,
            None,
            None,
            "neverwrite",
        );

        let mut builder = Builder::new()
            .behavior_version(BehaviorVersion::latest())
            .region(Region::new(config.region.clone()))
            .credentials_provider(credentials);

        if let Some(endpoint) = &config.endpoint_url {
            builder = builder.endpoint_url(endpoint).force_path_style(true);
        }

        Self {
            client: Client::from_conf(builder.build()),
            bucket: config.bucket_name.clone(),
        }
    }

    /// Bucket name.
    pub fn bucket(&self) -> &str {
        &self.bucket
    }
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    async fn presign_put(
        &self,
        key: &str,
        content_type: &str,
        expires_in: Duration,
    ) -> StorageResult<String> {
        let presign_config = PresigningConfig::expires_in(expires_in)
            .map_err(|e| StorageError::presign_failed(e.to_string()))?;

        let presigned = self
            .client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .content_type(content_type)
            .presigned(presign_config)
            .await
            .map_err(|e| StorageError::presign_failed(e.to_string()))?;

        debug!(key = %key, "Presigned PUT");
        Ok(presigned.uri().to_string())
    }

    async fn presign_get(&self, key: &str, expires_in: Duration) -> StorageResult<String> {
        let presign_config = PresigningConfig::expires_in(expires_in)
            .map_err(|e| StorageError::presign_failed(e.to_string()))?;

        let presigned = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .presigned(presign_config)
            .await
            .map_err(|e| StorageError::presign_failed(e.to_string()))?;

        debug!(key = %key, "Presigned GET");
        Ok(presigned.uri().to_string())
    }

    async fn exists(&self, key: &str) -> StorageResult<bool> {
        match self
            .client
            .head_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
        {
            Ok(_) => Ok(true),
            Err(e) => {
                if e.as_service_error().is_some_and(|se| se.is_not_found()) {
                    Ok(false)
                } else {
                    Err(StorageError::AwsSdk(e.to_string()))
                }
            }
        }
    }

    async fn check_connectivity(&self) -> StorageResult<()> {
        self.client
            .head_bucket()
            .bucket(&self.bucket)
            .send()
            .await
            .map_err(|e| StorageError::AwsSdk(format!("S3 connectivity check failed: {}", e)))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> S3Config {
        S3Config {
            region: "ap-south-1".to_string(),
            bucket_name: "neverwrite-test".to_string(),
            access_key_id: "AKIDEXAMPLE".to_string(),
            secret_access_key: "wJalrXUtnFEMI/K7MDENG+bPxRfiCYEXAMPLEKEY".to_string(),
            endpoint_url: None,
            presign_expiry: Duration::from_secs(DEFAULT_PRESIGN_EXPIRY_SECS),
        }
    }

    #[tokio::test]
    async fn test_presign_put_is_local_and_signed() {
        let store = S3ObjectStore::new(&config());
        let url = store
            .presign_put("videos/1_demo.mp4", "video/mp4", Duration::from_secs(3600))
            .await
            .unwrap();

        assert!(url.contains("neverwrite-test"));
        assert!(url.contains("videos/1_demo.mp4"));
        assert!(url.contains("X-Amz-Signature"));
        assert!(url.contains("X-Amz-Expires=3600"));
    }

    #[tokio::test]
    async fn test_presign_get_rejects_excessive_expiry() {
        let store = S3ObjectStore::new(&config());
        let result = store
            .presign_get("documents/1_demo.md", Duration::from_secs(MAX_PRESIGN_EXPIRY_SECS + 1))
            .await;
        assert!(matches!(result, Err(StorageError::PresignFailed(_))));
    }
}
