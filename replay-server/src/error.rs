//! HTTP error mapping

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use replay_core::ReplayError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Replay(#[from] ReplayError),

    #[error("no replay session '{0}'")]
    SessionNotFound(String),

    #[error("{0}")]
    BadRequest(String),
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Replay(ReplayError::NotFound { .. }) => StatusCode::NOT_FOUND,
            ApiError::Replay(ReplayError::MalformedTrack { .. }) => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            ApiError::Replay(ReplayError::InvalidArgument { .. })
            | ApiError::Replay(ReplayError::InvalidConfig { .. }) => StatusCode::BAD_REQUEST,
            ApiError::SessionNotFound(_) => StatusCode::NOT_FOUND,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_client_error() {
            tracing::debug!("Request rejected: {}", self);
        }
        (status, Json(serde_json::json!({ "error": self.to_string() }))).into_response()
    }
}
