use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::report::RenderError;
use crate::survey::orchestrator::TransitionError;

pub const CONFIGURATION_ERROR_MESSAGE: &str = "API key environment variable not set.";

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Configuration error")]
    Configuration,

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid transition: {0}")]
    InvalidTransition(String),

    #[error("A request is already in flight")]
    Busy,

    #[error("Render error: {0}")]
    Render(#[from] RenderError),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl From<TransitionError> for AppError {
    fn from(e: TransitionError) -> Self {
        match e {
            TransitionError::InvalidTransition { .. } => AppError::InvalidTransition(e.to_string()),
            TransitionError::Busy => AppError::Busy,
            TransitionError::EmptyInput
            | TransitionError::UnknownLanguage(_)
            | TransitionError::NoLanguageSelected => AppError::Validation(e.to_string()),
            TransitionError::Prompt(inner) => AppError::Internal(inner.into()),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::Configuration => (
                StatusCode::SERVICE_UNAVAILABLE,
                "CONFIGURATION_ERROR",
                CONFIGURATION_ERROR_MESSAGE.to_string(),
            ),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg.clone()),
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone()),
            AppError::InvalidTransition(msg) => {
                (StatusCode::CONFLICT, "INVALID_TRANSITION", msg.clone())
            }
            AppError::Busy => (
                StatusCode::CONFLICT,
                "BUSY",
                "A request is already in progress".to_string(),
            ),
            AppError::Render(e) => {
                tracing::error!("Render error: {e}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "RENDER_ERROR",
                    "The report could not be rendered".to_string(),
                )
            }
            AppError::Internal(e) => {
                tracing::error!("Internal error: {e:?}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An internal server error occurred".to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": {
                "code": code,
                "message": message
            }
        }));

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::survey::models::AppState;

    #[test]
    fn test_transition_errors_map_to_status_codes() {
        let invalid: AppError = TransitionError::InvalidTransition {
            action: "answer",
            state: AppState::PlatformSelect,
        }
        .into();
        assert_eq!(invalid.into_response().status(), StatusCode::CONFLICT);

        let busy: AppError = TransitionError::Busy.into();
        assert!(matches!(busy, AppError::Busy));

        let empty: AppError = TransitionError::EmptyInput.into();
        assert_eq!(empty.into_response().status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_configuration_error_is_unavailable() {
        let response = AppError::Configuration.into_response();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }
}
