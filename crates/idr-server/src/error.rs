use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use idr_resolver::ResolveError;
use serde_json::json;
use thiserror::Error;

use crate::validate::FieldError;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("request failed validation ({} errors)", .0.len())]
    Validation(Vec<FieldError>),

    #[error("malformed request body: {0}")]
    BadRequest(String),

    #[error("resolve error: {0}")]
    Resolve(#[from] ResolveError),

    #[error("store error: {0}")]
    Store(#[from] idr_store::StoreError),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

impl ServerError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_) | Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Resolve(ResolveError::EmptyIdentifier) => StatusCode::BAD_REQUEST,
            Self::Resolve(ResolveError::NotFound) => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match &self {
            Self::Validation(errors) => json!({ "errors": errors }),
            Self::BadRequest(message) => json!({ "status": "error", "message": message }),
            Self::Resolve(ResolveError::EmptyIdentifier) => json!({
                "status": "error",
                "message": "At least one of email or phoneNumber is required",
            }),
            Self::Resolve(ResolveError::NotFound) => {
                json!({ "status": "error", "message": "No contacts found" })
            }
            Self::Resolve(err) => {
                tracing::error!(error = %err, "identify failed");
                json!({ "status": "error", "message": "Failed to identify contact" })
            }
            other => {
                tracing::error!(error = %other, "unhandled error");
                json!({ "status": "error", "message": "Internal server error" })
            }
        };
        (status, Json(body)).into_response()
    }
}

pub type ServerResult<T> = Result<T, ServerError>;
