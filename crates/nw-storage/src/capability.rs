//! Upload and read capabilities.
//!
//! Upload keys are always derived server-side from a fresh timestamp, so a
//! caller can never choose the key it writes to.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info};

use nw_models::{document_key, validate_stem, KeyClock, UploadKey};

use crate::client::{ObjectStore, DEFAULT_PRESIGN_EXPIRY_SECS};
use crate::error::{StorageError, StorageResult};

/// A presigned PUT scoped to one freshly derived key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadCapability {
    pub url: String,
    pub key: UploadKey,
    pub expires_in: Duration,
}

/// A presigned GET for a generated document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadCapability {
    pub url: String,
    pub key: String,
    pub expires_in: Duration,
}

/// Issues capabilities against the `videos/` and `documents/` namespaces.
#[derive(Clone)]
pub struct CapabilityIssuer {
    store: Arc<dyn ObjectStore>,
    clock: Arc<KeyClock>,
    expiry: Duration,
}

impl CapabilityIssuer {
    pub fn new(store: Arc<dyn ObjectStore>, expiry: Duration) -> Self {
        Self {
            store,
            clock: Arc::new(KeyClock::new()),
            expiry,
        }
    }

    /// Issuer with the default one-hour expiry.
    pub fn with_default_expiry(store: Arc<dyn ObjectStore>) -> Self {
        Self::new(store, Duration::from_secs(DEFAULT_PRESIGN_EXPIRY_SECS))
    }

    pub fn store(&self) -> &Arc<dyn ObjectStore> {
        &self.store
    }

    /// Mint a presigned PUT for a new upload of `file_name`.
    pub async fn acquire_upload_capability(
        &self,
        file_name: &str,
        mime_type: &str,
    ) -> StorageResult<UploadCapability> {
        if file_name.trim().is_empty() || mime_type.trim().is_empty() {
            return Err(StorageError::invalid_request(
                "Missing required fields: fileName or fileType",
            ));
        }

        let key = self.clock.derive(file_name);
        let url = self
            .store
            .presign_put(key.as_str(), mime_type.trim(), self.expiry)
            .await?;

        info!(key = %key, content_type = %mime_type, "Issued upload capability");

        Ok(UploadCapability {
            url,
            key,
            expires_in: self.expiry,
        })
    }

    /// Mint a presigned GET for the document generated from `stem`.
    ///
    /// Returns `Ok(None)` while the document does not exist yet.
    pub async fn acquire_read_capability(
        &self,
        stem: &str,
    ) -> StorageResult<Option<ReadCapability>> {
        let stem = validate_stem(stem)?;
        let key = document_key(&stem);

        if !self.store.exists(&key).await? {
            debug!(key = %key, "Document not ready yet");
            return Ok(None);
        }

        let url = self.store.presign_get(&key, self.expiry).await?;
        info!(key = %key, "Issued read capability");

        Ok(Some(ReadCapability {
            url,
            key,
            expires_in: self.expiry,
        }))
    }
}
