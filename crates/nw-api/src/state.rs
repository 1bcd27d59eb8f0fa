//! Application state.

use std::sync::Arc;

use tracing::{info, warn};

use nw_ledger::{DynamoUsageStore, InMemoryUsageStore, UsageLedger, UsageStore};
use nw_storage::{CapabilityIssuer, ObjectStore, S3Config, S3ObjectStore};

use crate::config::{ApiConfig, UsageStoreKind};
use crate::error::ApiResult;
use crate::session::{CookiePolicy, SessionProvider};

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: ApiConfig,
    pub capabilities: CapabilityIssuer,
    pub ledger: UsageLedger,
    pub sessions: SessionProvider,
}

impl AppState {
    /// Create new application state from the environment.
    ///
    /// Fails when a required storage or ledger variable is missing.
    pub async fn new(config: ApiConfig) -> ApiResult<Self> {
        let s3_config = S3Config::from_env()?;
        let expiry = s3_config.presign_expiry;
        info!(
            bucket = %s3_config.bucket_name,
            region = %s3_config.region,
            expiry_secs = expiry.as_secs(),
            "S3 object store configured"
        );
        let store: Arc<dyn ObjectStore> = Arc::new(S3ObjectStore::new(&s3_config));

        let usage: Arc<dyn UsageStore> = match config.usage_store {
            UsageStoreKind::DynamoDb => Arc::new(DynamoUsageStore::from_env()?),
            UsageStoreKind::Memory => {
                if config.is_production() {
                    warn!("In-memory usage store in production; quotas reset on restart");
                }
                Arc::new(InMemoryUsageStore::new())
            }
        };

        let capabilities = CapabilityIssuer::new(store, expiry);
        Ok(Self::with_capabilities(config, capabilities, usage))
    }

    /// Assemble state from explicit backends.
    pub fn from_parts(
        config: ApiConfig,
        store: Arc<dyn ObjectStore>,
        usage: Arc<dyn UsageStore>,
    ) -> Self {
        Self::with_capabilities(config, CapabilityIssuer::with_default_expiry(store), usage)
    }

    fn with_capabilities(
        config: ApiConfig,
        capabilities: CapabilityIssuer,
        usage: Arc<dyn UsageStore>,
    ) -> Self {
        let ledger = UsageLedger::new(usage, config.free_tier_quota);
        let sessions = SessionProvider::new(CookiePolicy::from_config(&config));
        Self {
            config,
            capabilities,
            ledger,
            sessions,
        }
    }
}
