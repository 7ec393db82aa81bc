use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use inkpost_core::{CredentialError, DbError, SchemaError};
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("store error: {0}")]
    Store(#[from] DbError),

    #[error("schema error: {0}")]
    Schema(#[from] SchemaError),

    #[error("credential setup error: {0}")]
    Credentials(#[from] CredentialError),

    #[error("logging setup error: {0}")]
    Logging(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

pub type ServerResult<T> = Result<T, ServerError>;

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        log::error!(
            "event=http_request module=server status=error error={}",
            self
        );
        let body = json!({
            "data": null,
            "errors": [{
                "message": "internal server error",
                "extensions": { "code": "INTERNAL_ERROR" },
            }],
        });
        (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
    }
}
