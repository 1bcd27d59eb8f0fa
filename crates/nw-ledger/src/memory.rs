//! In-memory usage store.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use nw_models::SessionId;

use crate::error::LedgerResult;
use crate::store::{IncrementOutcome, UsageRecord, UsageStore};

/// Process-local usage store. Counters are lost on restart.
#[derive(Clone, Default)]
pub struct InMemoryUsageStore {
    records: Arc<Mutex<HashMap<SessionId, UsageRecord>>>,
}

impl InMemoryUsageStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UsageStore for InMemoryUsageStore {
    async fn increment_below(
        &self,
        session: &SessionId,
        ceiling: u32,
        now_ms: i64,
    ) -> LedgerResult<IncrementOutcome> {
        let mut records = self.records.lock().await;
        let current = records.get(session).map(|r| r.count).unwrap_or(0);
        if current >= ceiling {
            return Ok(IncrementOutcome::Exhausted);
        }

        let count = current + 1;
        records.insert(
            session.clone(),
            UsageRecord {
                count,
                last_used_ms: Some(now_ms),
            },
        );
        Ok(IncrementOutcome::Accepted { count })
    }

    async fn get(&self, session: &SessionId) -> LedgerResult<UsageRecord> {
        Ok(self
            .records
            .lock()
            .await
            .get(session)
            .copied()
            .unwrap_or_default())
    }

    async fn check_connectivity(&self) -> LedgerResult<()> {
        Ok(())
    }
}
