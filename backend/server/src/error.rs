use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use records::{RecordError, StoreError};
use serde_json::json;
use thiserror::Error;
use tracing::{error, warn};

use crate::runner::RunnerError;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Malformed payload: {0}")]
    MalformedPayload(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    Unprocessable(String),

    #[error("Internal error: {0}")]
    InternalError(#[from] Box<dyn std::error::Error + Send + Sync>),
}

impl From<RecordError> for AppError {
    fn from(error: RecordError) -> Self {
        match error {
            RecordError::NotFound(what) => AppError::NotFound(format!("{what} not found")),
            RecordError::Conflict(message) => AppError::Conflict(message),
            RecordError::InvalidState(message) => AppError::Conflict(message),
            RecordError::Unauthorized(message) => AppError::Unauthorized(message),
            RecordError::Forbidden(message) => AppError::Forbidden(message),
            RecordError::Validation(message) => AppError::Unprocessable(message),
            RecordError::Store(StoreError::Contention(what)) => {
                AppError::Conflict(format!("{what} is busy, retry the request"))
            }
            RecordError::Store(store) => AppError::InternalError(Box::new(store)),
        }
    }
}

impl From<RunnerError> for AppError {
    fn from(error: RunnerError) -> Self {
        match error {
            RunnerError::Rejected(message) => AppError::Unprocessable(message),
            RunnerError::MissingInterpreter(program) => {
                AppError::Unprocessable(format!("{program} is not available on this server"))
            }
            RunnerError::Io(e) => AppError::InternalError(Box::new(e)),
        }
    }
}

impl From<std::io::Error> for AppError {
    fn from(error: std::io::Error) -> Self {
        AppError::InternalError(Box::new(error))
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match self {
            AppError::MalformedPayload { .. } => StatusCode::BAD_REQUEST,
            AppError::Unauthorized { .. } => StatusCode::UNAUTHORIZED,
            AppError::Forbidden { .. } => StatusCode::FORBIDDEN,
            AppError::NotFound { .. } => StatusCode::NOT_FOUND,
            AppError::Conflict { .. } => StatusCode::CONFLICT,
            AppError::Unprocessable { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::InternalError { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        };

        if status.is_server_error() {
            error!("{self}");
        } else {
            warn!("Rejected request: {status} {self}");
        }

        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}
