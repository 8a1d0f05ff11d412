use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::genai_client::GenerationError;
use crate::pdf::ExportError;
use crate::session::SessionError;

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("No page to edit")]
    NoPageToEdit,

    #[error("Generation failed: {0}")]
    Generation(#[from] GenerationError),

    #[error("Cannot export an empty comic")]
    EmptyExport,

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl From<SessionError> for AppError {
    fn from(err: SessionError) -> Self {
        match err {
            SessionError::NoPageToEdit => AppError::NoPageToEdit,
        }
    }
}

impl From<ExportError> for AppError {
    fn from(err: ExportError) -> Self {
        match err {
            ExportError::EmptyInput => AppError::EmptyExport,
            other => AppError::Internal(anyhow::Error::new(other)),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg.clone()),
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone()),
            AppError::NoPageToEdit => (
                StatusCode::CONFLICT,
                "NO_PAGE_TO_EDIT",
                "Generate a page before applying an edit".to_string(),
            ),
            AppError::Generation(e) => {
                tracing::error!("Generation error: {e}");
                (
                    StatusCode::BAD_GATEWAY,
                    "GENERATION_FAILED",
                    "Comic page generation failed".to_string(),
                )
            }
            AppError::EmptyExport => (
                StatusCode::BAD_REQUEST,
                "EMPTY_INPUT",
                "There are no pages to export".to_string(),
            ),
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

    #[test]
    fn test_no_page_to_edit_maps_to_conflict() {
        let response = AppError::from(SessionError::NoPageToEdit).into_response();
        assert_eq!(response.status(), StatusCode::CONFLICT);
    }

    #[test]
    fn test_empty_export_maps_to_bad_request() {
        let response = AppError::from(ExportError::EmptyInput).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_generation_error_is_generic_bad_gateway() {
        let response = AppError::from(GenerationError::MissingApiKey).into_response();
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    }
}
