//! Request handlers.

pub mod documents;
pub mod health;
pub mod uploads;
pub mod usage;

pub use documents::*;
pub use health::*;
pub use uploads::*;
pub use usage::*;

use axum::extract::rejection::JsonRejection;
use validator::ValidationErrors;

use crate::error::ApiError;

/// Flatten validator field errors into one client-facing message.
pub(crate) fn validation_message(errors: &ValidationErrors) -> String {
    let mut messages: Vec<String> = errors
        .field_errors()
        .into_iter()
        .flat_map(|(field, errs)| {
            errs.iter().map(move |e| {
                e.message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| format!("{} is invalid", field))
            })
        })
        .collect();
    messages.sort();
    messages.join("; ")
}

/// Body that is missing, not JSON, or not an object.
pub(crate) fn body_rejection(rejection: JsonRejection) -> ApiError {
    ApiError::bad_request(format!("Invalid request body: {}", rejection.body_text()))
}
