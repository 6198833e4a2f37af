use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use docqa_rag::{ErrorKind, RagError};
use thiserror::Error;
use tracing::{error, warn};

use crate::protocol::{ErrorBody, ErrorKindName, ErrorPayload};

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("document session `{0}` not found")]
    SessionNotFound(String),

    #[error("invalid upload: {0}")]
    BadUpload(String),

    #[error(transparent)]
    Rag(#[from] RagError),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::SessionNotFound(_) => StatusCode::NOT_FOUND,
            Self::BadUpload(_) => StatusCode::BAD_REQUEST,
            Self::Rag(error) => match error.kind() {
                ErrorKind::Validation | ErrorKind::Extraction => StatusCode::BAD_REQUEST,
                ErrorKind::EmbeddingService | ErrorKind::InferenceService => {
                    StatusCode::BAD_GATEWAY
                }
                ErrorKind::DimensionMismatch | ErrorKind::Config => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            },
        }
    }

    fn payload(&self) -> ErrorPayload {
        match self {
            Self::SessionNotFound(_) => ErrorPayload {
                kind: ErrorKindName::SessionNotFound,
                stage: None,
                message: self.to_string(),
                retryable: false,
            },
            Self::BadUpload(_) => ErrorPayload {
                kind: ErrorKindName::Validation,
                stage: Some("validate".to_string()),
                message: self.to_string(),
                retryable: false,
            },
            Self::Rag(error) => ErrorPayload::from(error),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(status = status.as_u16(), error = %self, "request failed");
        } else {
            warn!(status = status.as_u16(), error = %self, "request rejected");
        }
        (status, Json(ErrorBody { error: self.payload() })).into_response()
    }
}
