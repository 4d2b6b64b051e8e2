use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Json, Response};
use cask_provider::ProviderError;
use cask_store::StoreError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

pub type ServerResult<T> = Result<T, ServerError>;

impl ServerError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Store(e) => match e {
                StoreError::FileNotFound { .. } => StatusCode::NOT_FOUND,
                StoreError::InvalidKey { .. } => StatusCode::BAD_REQUEST,
                StoreError::ReadOnly(_) => StatusCode::FORBIDDEN,
                StoreError::ObjectTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
                StoreError::KeyConflict { .. } => StatusCode::CONFLICT,
                StoreError::RangeNotSatisfiable { .. } => StatusCode::RANGE_NOT_SATISFIABLE,
                StoreError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::Provider(ProviderError::BucketNotFound(_)) => StatusCode::NOT_FOUND,
            Self::Provider(_) | Self::Config(_) | Self::Io(_) | Self::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

/// JSON body of every error response.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub code: u16,
    pub error: String,
    pub description: String,
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }

        let body = ErrorBody {
            code: status.as_u16(),
            error: self.to_string(),
            description: status.canonical_reason().unwrap_or_default().to_string(),
        };
        let mut response = (status, Json(body)).into_response();

        if let Self::Store(StoreError::RangeNotSatisfiable { size, .. }) = self {
            if let Ok(value) = HeaderValue::from_str(&format!("bytes */{size}")) {
                response.headers_mut().insert(header::CONTENT_RANGE, value);
            }
        }
        response
    }
}
