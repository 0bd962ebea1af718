use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("Malformed document: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("Document {0} changed too often while updating")]
    Contention(String),
}

#[derive(Error, Debug)]
pub enum RecordError {
    #[error("{0} not found")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    InvalidState(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    Validation(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl From<redis::RedisError> for RecordError {
    fn from(error: redis::RedisError) -> Self {
        RecordError::Store(StoreError::Redis(error))
    }
}

impl From<serde_json::Error> for RecordError {
    fn from(error: serde_json::Error) -> Self {
        RecordError::Store(StoreError::Serde(error))
    }
}

pub type RecordResult<T> = Result<T, RecordError>;

pub(crate) fn not_found(what: impl Into<String>) -> RecordError {
    RecordError::NotFound(what.into())
}

pub(crate) fn invalid(message: impl Into<String>) -> RecordError {
    RecordError::Validation(message.into())
}
