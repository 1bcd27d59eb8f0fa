//! Free-tier usage gate handler.

use axum::extract::State;
use axum::{Extension, Json};

use nw_ledger::UsageOutcome;
use nw_models::{SessionId, UseFeatureResponse};

use crate::error::{ApiError, ApiResult};
use crate::metrics;
use crate::state::AppState;

/// Count one generation attempt against the caller's session.
///
/// POST /api/use-feature
///
/// 200 with the new count while under quota, 403 once it is spent.
pub async fn use_feature(
    State(state): State<AppState>,
    Extension(session): Extension<SessionId>,
) -> ApiResult<Json<UseFeatureResponse>> {
    match state.ledger.use_feature(&session).await? {
        UsageOutcome::Allowed { count } => {
            metrics::record_usage_attempt("allowed");
            Ok(Json(UseFeatureResponse {
                message: format!("Feature used successfully. Attempt #{}", count),
                count: Some(count),
            }))
        }
        UsageOutcome::QuotaExceeded { .. } => {
            metrics::record_usage_attempt("quota_exceeded");
            Err(ApiError::QuotaExceeded)
        }
    }
}
