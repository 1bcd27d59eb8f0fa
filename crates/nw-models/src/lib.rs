//! Shared data models for the NeverWrite backend.
//!
//! This crate provides Serde-serializable types for:
//! - Session identifiers carried in the `sessionId` cookie
//! - Storage key derivation for uploaded videos and generated documents
//! - Request/response bodies of the public HTTP endpoints
//! - MIME type lookup for uploaded recordings

pub mod api;
pub mod error;
pub mod keys;
pub mod mime;
pub mod session;

// Re-export common types
pub use api::{
    ErrorBody, MarkdownUrlRequest, MarkdownUrlResponse, UploadUrlRequest, UploadUrlResponse,
    UseFeatureResponse,
};
pub use error::{ModelError, ModelResult};
pub use keys::{
    document_key, file_stem, sanitize_file_name, validate_stem, DocumentStem, KeyClock, UploadKey,
    DOCUMENTS_PREFIX, VIDEOS_PREFIX,
};
pub use mime::mime_for_file_name;
pub use session::{SessionId, SESSION_COOKIE_NAME};
