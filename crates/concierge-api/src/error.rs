//! # API Error Types
//!
//! `AppError` and its `IntoResponse` mapping. Lifecycle and workflow
//! errors from concierge-state become HTTP statuses with JSON bodies. A
//! rejected status change is a 403 whose message is the validator's
//! `Illegal <kind> transition: <current> -> <next>`.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use concierge_state::{IllegalTransition, WorkflowError};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

/// JSON body of every error response.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

/// Code, message and optional structured details.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorDetail {
    /// Machine-readable error code (e.g., "NOT_FOUND", "FORBIDDEN").
    pub code: String,
    /// Human-readable error message.
    pub message: String,
    /// Additional details, present only for client errors.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

/// Errors a handler can return; each maps to one HTTP status.
#[derive(Error, Debug)]
pub enum AppError {
    /// Resource not found (404).
    #[error("not found: {0}")]
    NotFound(String),

    /// Request body malformed or failed validation (422).
    #[error("validation error: {0}")]
    Validation(String),

    /// Missing or wrong bearer token (401).
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// Status change rejected by the lifecycle graph (403).
    #[error(transparent)]
    IllegalTransition(#[from] IllegalTransition),

    /// Workflow action not permitted in the case's current position (403).
    #[error("forbidden: {0}")]
    Forbidden(String),
}

impl AppError {
    /// HTTP status and machine-readable code.
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            Self::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            Self::Validation(_) => (StatusCode::UNPROCESSABLE_ENTITY, "VALIDATION_ERROR"),
            Self::Unauthorized(_) => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED"),
            Self::IllegalTransition(_) | Self::Forbidden(_) => {
                (StatusCode::FORBIDDEN, "FORBIDDEN")
            }
        }
    }

    /// Message and details safe to return to the caller.
    fn client_view(&self) -> (String, Option<serde_json::Value>) {
        match self {
            Self::IllegalTransition(err) => (err.to_string(), serde_json::to_value(err).ok()),
            Self::Forbidden(message) => (message.clone(), None),
            other => (other.to_string(), None),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();
        let (message, details) = self.client_view();

        let body = ErrorBody {
            error: ErrorDetail {
                code: code.to_string(),
                message,
                details,
            },
        };

        (status, Json(body)).into_response()
    }
}

/// Workflow errors are all client-visible rejections.
impl From<WorkflowError> for AppError {
    fn from(err: WorkflowError) -> Self {
        match err {
            WorkflowError::IllegalTransition(inner) => Self::IllegalTransition(inner),
            other @ (WorkflowError::StageNotComplete { .. } | WorkflowError::NotPermitted { .. }) => {
                Self::Forbidden(other.to_string())
            }
        }
    }
}
