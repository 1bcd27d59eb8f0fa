//! Upload capability handler.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use tracing::warn;
use validator::Validate;

use nw_models::{UploadUrlRequest, UploadUrlResponse};

use super::{body_rejection, validation_message};
use crate::error::{ApiError, ApiResult};
use crate::metrics;
use crate::state::AppState;

/// Issue a presigned PUT for a new recording.
///
/// POST /api/get-presigned-url
///
/// Request:
/// ```json
/// { "fileName": "demo.mp4", "fileType": "video/mp4" }
/// ```
///
/// Response:
/// ```json
/// { "uploadURL": "https://...", "key": "videos/1700000000000_demo.mp4" }
/// ```
pub async fn get_presigned_url(
    State(state): State<AppState>,
    body: Result<Json<UploadUrlRequest>, JsonRejection>,
) -> ApiResult<Json<UploadUrlResponse>> {
    let Json(request) = body.map_err(body_rejection)?;

    if request.file_name.is_empty() || request.file_type.is_empty() {
        return Err(ApiError::bad_request(
            "Missing required fields: fileName or fileType",
        ));
    }
    request.validate().map_err(|e| {
        let message = validation_message(&e);
        warn!(error = %message, "Rejected upload request");
        ApiError::Validation(message)
    })?;

    let capability = state
        .capabilities
        .acquire_upload_capability(&request.file_name, &request.file_type)
        .await?;
    metrics::record_capability_issued("upload");

    Ok(Json(UploadUrlResponse {
        upload_url: capability.url,
        key: capability.key.as_str().to_string(),
    }))
}
