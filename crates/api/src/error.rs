use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

use crate::state::StartRunError;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("unknown preset: {0}")]
    UnknownPreset(String),
    #[error("invalid request body: {0}")]
    BadRequest(String),
    #[error(transparent)]
    StartRun(#[from] StartRunError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            Self::UnknownPreset(_) => StatusCode::NOT_FOUND,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::StartRun(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }

        let body = json!({ "error": self.to_string() });
        (status, axum::Json(body)).into_response()
    }
}
