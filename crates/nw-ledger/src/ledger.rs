//! Free-tier usage gate.

use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};

use nw_models::SessionId;

use crate::error::LedgerResult;
use crate::store::{IncrementOutcome, UsageStore};

/// Attempts granted to an anonymous session.
pub const DEFAULT_FREE_TIER_QUOTA: u32 = 2;

/// Result of a usage attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UsageOutcome {
    /// Attempt recorded; `count` is the new total.
    Allowed { count: u32 },
    /// Quota reached; the stored count is unchanged.
    QuotaExceeded { count: u32 },
}

impl UsageOutcome {
    pub fn is_allowed(&self) -> bool {
        matches!(self, UsageOutcome::Allowed { .. })
    }

    pub fn count(&self) -> u32 {
        match self {
            UsageOutcome::Allowed { count } | UsageOutcome::QuotaExceeded { count } => *count,
        }
    }
}

/// Enforces the per-session quota on top of a `UsageStore`.
#[derive(Clone)]
pub struct UsageLedger {
    store: Arc<dyn UsageStore>,
    quota: u32,
}

impl UsageLedger {
    pub fn new(store: Arc<dyn UsageStore>, quota: u32) -> Self {
        Self { store, quota }
    }

    pub fn quota(&self) -> u32 {
        self.quota
    }

    pub fn store(&self) -> &Arc<dyn UsageStore> {
        &self.store
    }

    /// Record one attempt for `session`, or reject it once the quota is spent.
    pub async fn use_feature(&self, session: &SessionId) -> LedgerResult<UsageOutcome> {
        if self.quota == 0 {
            let count = self.store.get(session).await?.count;
            return Ok(UsageOutcome::QuotaExceeded { count });
        }

        let now_ms = Utc::now().timestamp_millis();
        match self
            .store
            .increment_below(session, self.quota, now_ms)
            .await?
        {
            IncrementOutcome::Accepted { count } => {
                info!(session_id = %session, count, quota = self.quota, "Usage recorded");
                Ok(UsageOutcome::Allowed { count })
            }
            IncrementOutcome::Exhausted => {
                let count = self.store.get(session).await?.count;
                warn!(session_id = %session, count, quota = self.quota, "Usage quota exceeded");
                Ok(UsageOutcome::QuotaExceeded { count })
            }
        }
    }

    /// Attempts recorded so far for `session`.
    pub async fn usage(&self, session: &SessionId) -> LedgerResult<u32> {
        Ok(self.store.get(session).await?.count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::InMemoryUsageStore;
    use tokio_test::assert_ok;

    fn ledger(quota: u32) -> UsageLedger {
        UsageLedger::new(Arc::new(InMemoryUsageStore::new()), quota)
    }

    #[tokio::test]
    async fn test_third_attempt_is_rejected() {
        let ledger = ledger(DEFAULT_FREE_TIER_QUOTA);
        let session = SessionId::new();

        assert_eq!(
            ledger.use_feature(&session).await.unwrap(),
            UsageOutcome::Allowed { count: 1 }
        );
        assert_eq!(
            ledger.use_feature(&session).await.unwrap(),
            UsageOutcome::Allowed { count: 2 }
        );
        assert_eq!(
            ledger.use_feature(&session).await.unwrap(),
            UsageOutcome::QuotaExceeded { count: 2 }
        );
        assert_eq!(
            ledger.use_feature(&session).await.unwrap(),
            UsageOutcome::QuotaExceeded { count: 2 }
        );
        assert_eq!(ledger.usage(&session).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_sessions_are_independent() {
        let ledger = ledger(1);
        let alice = SessionId::new();
        let bob = SessionId::new();

        assert!(assert_ok!(ledger.use_feature(&alice).await).is_allowed());
        assert!(!assert_ok!(ledger.use_feature(&alice).await).is_allowed());
        assert!(assert_ok!(ledger.use_feature(&bob).await).is_allowed());
    }

    #[tokio::test]
    async fn test_zero_quota_rejects_everything() {
        let ledger = ledger(0);
        let session = SessionId::new();
        let outcome = assert_ok!(ledger.use_feature(&session).await);
        assert_eq!(outcome, UsageOutcome::QuotaExceeded { count: 0 });
        assert_eq!(assert_ok!(ledger.usage(&session).await), 0);
    }
}
