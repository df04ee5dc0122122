use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use serde_json::json;
use thiserror::Error;

use diffhub_notify::NotifyError;
use diffhub_processor::ProcessorError;

/// Errors starting or running the server.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

pub type ServerResult<T> = Result<T, ServerError>;

/// Error returned by a request handler, rendered as `{"error": ...}`.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Processor(#[from] ProcessorError),

    #[error(transparent)]
    Notify(#[from] NotifyError),

    #[error("{0}")]
    BadRequest(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Processor(e) if e.is_validation() => StatusCode::BAD_REQUEST,
            Self::Processor(e) if e.is_not_found() => StatusCode::NOT_FOUND,
            Self::Processor(ProcessorError::ShuttingDown) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Processor(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Notify(NotifyError::UnknownConnection(_)) => StatusCode::NOT_FOUND,
            Self::Notify(NotifyError::NotOwner { .. }) => StatusCode::FORBIDDEN,
            Self::Notify(NotifyError::AlreadyConnected(_)) => StatusCode::CONFLICT,
            Self::Notify(NotifyError::Transport { .. }) => StatusCode::BAD_GATEWAY,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        } else {
            tracing::debug!(error = %self, %status, "request rejected");
        }
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}
