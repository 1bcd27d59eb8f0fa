//! Usage ledger.
//!
//! Tracks how many times each anonymous session has used the generator and
//! rejects attempts past the free-tier quota.
//!
//! Stores:
//! - `DynamoUsageStore`: single conditional `UpdateItem` per attempt
//! - `InMemoryUsageStore`: process-local map for tests and local development

pub mod dynamo;
pub mod error;
pub mod ledger;
pub mod memory;
pub mod store;

pub use dynamo::{DynamoConfig, DynamoUsageStore};
pub use error::{LedgerError, LedgerResult};
pub use ledger::{UsageLedger, UsageOutcome, DEFAULT_FREE_TIER_QUOTA};
pub use memory::InMemoryUsageStore;
pub use store::{IncrementOutcome, UsageRecord, UsageStore};
