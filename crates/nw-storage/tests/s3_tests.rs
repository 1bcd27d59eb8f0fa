//! S3 integration tests.

use std::sync::Arc;
use std::time::Duration;

use nw_storage::{CapabilityIssuer, ObjectStore, S3Config, S3ObjectStore};

fn store() -> S3ObjectStore {
    dotenvy::dotenv().ok();
    let config = S3Config::from_env().expect("Failed to load S3 config");
    S3ObjectStore::new(&config)
}

/// Test bucket access.
#[tokio::test]
#[ignore = "requires AWS credentials"]
async fn test_s3_connection() {
    store()
        .check_connectivity()
        .await
        .expect("Failed to check S3 connectivity");
}

/// Test upload capability against the real bucket.
#[tokio::test]
#[ignore = "requires AWS credentials"]
async fn test_upload_capability() {
    let issuer = CapabilityIssuer::new(Arc::new(store()), Duration::from_secs(300));

    let capability = issuer
        .acquire_upload_capability("integration test.mp4", "video/mp4")
        .await
        .expect("Failed to issue upload capability");

    assert!(capability.key.as_str().starts_with("videos/"));
    assert!(capability.key.as_str().ends_with("_integration_test.mp4"));
    assert!(capability.url.contains("X-Amz-Signature"));
}

/// Missing documents are reported as not ready, not as errors.
#[tokio::test]
#[ignore = "requires AWS credentials"]
async fn test_read_capability_missing_document() {
    let issuer = CapabilityIssuer::with_default_expiry(Arc::new(store()));

    let capability = issuer
        .acquire_read_capability("0_never_uploaded")
        .await
        .expect("Lookup failed");

    assert!(capability.is_none());
}
