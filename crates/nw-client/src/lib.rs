//! NeverWrite generation client.
//!
//! This crate provides:
//! - `ApiClient`: session-aware HTTP client for the usage gate and the
//!   upload/read capability endpoints
//! - `DocumentGenerator`: the quota → upload → poll state machine
//! - `Notifier`: the seam through which progress reaches the user

pub mod api;
pub mod config;
pub mod error;
pub mod notify;
pub mod orchestrator;

pub use api::{ApiClient, GenerationBackend, QuotaStatus};
pub use config::{ClientConfig, PollPolicy};
pub use error::{ClientError, ClientResult};
pub use notify::{Notification, NotificationKind, Notifier, TracingNotifier};
pub use orchestrator::{
    DocumentGenerator, GenerationFailure, GenerationState, PollOutcome, SelectedFile,
    PLACEHOLDER_DOCUMENT,
};
