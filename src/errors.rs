use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("invalid event signature")]
    BadSignature,

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("ticket rejected: {0}")]
    TicketRejected(String),

    #[error("approval timeout")]
    ApprovalTimeout,

    #[error("approval request superseded")]
    Superseded,

    #[error("prompt delivery failed")]
    PromptFailed(#[source] anyhow::Error),

    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_type, code, msg) = match &self {
            AppError::BadSignature => (
                StatusCode::UNAUTHORIZED,
                "authentication_error",
                "bad_signature",
                "event signature verification failed".to_string(),
            ),
            AppError::BadRequest(reason) => (
                StatusCode::BAD_REQUEST,
                "invalid_request_error",
                "bad_request",
                reason.clone(),
            ),
            AppError::TicketRejected(reason) => (
                StatusCode::BAD_REQUEST,
                "invalid_request_error",
                "ticket_rejected",
                reason.clone(),
            ),
            AppError::ApprovalTimeout => (
                StatusCode::REQUEST_TIMEOUT,
                "timeout_error",
                "approval_timeout",
                "timed out without response".to_string(),
            ),
            AppError::Superseded => (
                StatusCode::CONFLICT,
                "conflict_error",
                "approval_superseded",
                "a newer approval round replaced this request".to_string(),
            ),
            AppError::PromptFailed(e) => {
                tracing::error!("prompt post failed: {}", e);
                (
                    StatusCode::BAD_GATEWAY,
                    "upstream_error",
                    "prompt_post_failed",
                    "could not deliver the approval prompt".to_string(),
                )
            }
            AppError::Internal(e) => {
                tracing::error!("Internal error: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "internal_server_error",
                    "internal server error".to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": {
                "message": msg,
                "type": error_type,
                "code": code,
            }
        }));

        (status, body).into_response()
    }
}
