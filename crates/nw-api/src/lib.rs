//! Axum HTTP API server.
//!
//! This crate provides:
//! - Anonymous session cookies (`sessionId`)
//! - The free-tier usage gate
//! - Presigned upload and document-read capabilities
//! - Rate limiting, security headers and Prometheus metrics

pub mod config;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod routes;
pub mod session;
pub mod state;

pub use config::{ApiConfig, UsageStoreKind};
pub use error::{ApiError, ApiResult};
pub use routes::create_router;
pub use session::{CookiePolicy, EnsuredSession, SessionProvider};
pub use state::AppState;
