//! Object storage gateway.
//!
//! This crate provides:
//! - Presigned PUT capabilities for uploading recordings under `videos/`
//! - Presigned GET capabilities for generated documents under `documents/`
//! - An `ObjectStore` seam with an S3 implementation

pub mod capability;
pub mod client;
pub mod error;

pub use capability::{CapabilityIssuer, ReadCapability, UploadCapability};
pub use client::{ObjectStore, S3Config, S3ObjectStore};
pub use error::{StorageError, StorageResult};
