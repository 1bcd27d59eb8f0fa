//! Usage store abstraction.

use async_trait::async_trait;

use nw_models::SessionId;

use crate::error::LedgerResult;

/// Usage recorded for one session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UsageRecord {
    /// Accepted attempts; never decreases.
    pub count: u32,
    /// Epoch milliseconds of the last accepted attempt.
    pub last_used_ms: Option<i64>,
}

/// Result of an increment-with-ceiling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IncrementOutcome {
    /// Count was below the ceiling and has been incremented to `count`.
    Accepted { count: u32 },
    /// Count already reached the ceiling; nothing was written.
    Exhausted,
}

/// Backing store for usage counters.
///
/// `increment_below` must be a single atomic step: concurrent calls for the
/// same session never push the count past `ceiling`.
#[async_trait]
pub trait UsageStore: Send + Sync {
    /// Increment the session's count if it is strictly below `ceiling`.
    async fn increment_below(
        &self,
        session: &SessionId,
        ceiling: u32,
        now_ms: i64,
    ) -> LedgerResult<IncrementOutcome>;

    /// Current record for the session (default when absent).
    async fn get(&self, session: &SessionId) -> LedgerResult<UsageRecord>;

    /// Check connectivity to the backing store.
    async fn check_connectivity(&self) -> LedgerResult<()>;
}
