use axum::http::StatusCode;
use std::path::PathBuf;

#[derive(Debug)]
pub struct AppError {
    pub status: StatusCode,
    pub message: String,
}

impl AppError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }

    pub fn unavailable(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::SERVICE_UNAVAILABLE,
            message: message.into(),
        }
    }

    pub fn internal(err: impl std::error::Error) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: err.to_string(),
        }
    }
}

impl From<SubmitError> for AppError {
    fn from(err: SubmitError) -> Self {
        match err {
            SubmitError::Validation(message) => Self::bad_request(message),
            SubmitError::Write(err) => Self::internal(err),
        }
    }
}

impl axum::response::IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        (self.status, self.message).into_response()
    }
}

/// Startup configuration that is absent or unusable.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("STORE_CONFIG is not a valid store descriptor: {0}")]
    StoreDescriptor(#[from] serde_json::Error),

    #[error("{0} must not be blank")]
    Blank(&'static str),
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("failed to persist store file {path}: {source}")]
    Persist {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to encode document: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("document for {0} must be a JSON object")]
    NotAnObject(String),

    #[error("subscription to {0} closed")]
    Closed(String),

    #[error("write rejected: {0}")]
    Rejected(String),
}

#[derive(Debug, thiserror::Error)]
pub enum IdentityError {
    #[error("bootstrap token rejected")]
    InvalidToken,

    #[error("failed to persist session {path}: {source}")]
    Persist {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to encode session: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("identity provider unavailable: {0}")]
    Unavailable(String),
}

/// Outcome of a rejected submission: either nothing was written
/// (`Validation`) or the store refused the write (`Write`).
#[derive(Debug, thiserror::Error)]
pub enum SubmitError {
    #[error("{0}")]
    Validation(String),

    #[error("failed to store record: {0}")]
    Write(#[from] StoreError),
}

impl SubmitError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, SubmitError::Validation(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_maps_to_bad_request() {
        let err: AppError = SubmitError::validation("Por favor, completa todos los campos.").into();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
        assert_eq!(err.message, "Por favor, completa todos los campos.");
    }

    #[test]
    fn write_failure_maps_to_internal() {
        let err: AppError = SubmitError::Write(StoreError::Rejected("offline".into())).into();
        assert_eq!(err.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(err.message.contains("offline"));
    }
}
