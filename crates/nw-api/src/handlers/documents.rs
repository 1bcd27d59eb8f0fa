//! Document read capability handler.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use validator::Validate;

use nw_models::{MarkdownUrlRequest, MarkdownUrlResponse};

use super::{body_rejection, validation_message};
use crate::error::{ApiError, ApiResult};
use crate::metrics;
use crate::state::AppState;

/// Issue a presigned GET for the document generated from a stem.
///
/// POST /api/get-generated-markdown-url
///
/// 404 while the document has not been produced yet; clients poll.
pub async fn get_generated_markdown_url(
    State(state): State<AppState>,
    body: Result<Json<MarkdownUrlRequest>, JsonRejection>,
) -> ApiResult<Json<MarkdownUrlResponse>> {
    let Json(request) = body.map_err(body_rejection)?;
    request
        .validate()
        .map_err(|e| ApiError::Validation(validation_message(&e)))?;

    match state
        .capabilities
        .acquire_read_capability(&request.file_name)
        .await?
    {
        Some(capability) => {
            metrics::record_capability_issued("read");
            Ok(Json(MarkdownUrlResponse {
                markdown_url: capability.url,
            }))
        }
        None => {
            metrics::record_document_not_ready();
            Err(ApiError::not_found("Markdown not ready yet."))
        }
    }
}
