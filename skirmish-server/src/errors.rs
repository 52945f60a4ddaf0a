//! Error responses of the administrative routes

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use skirmish_orchestrator::OrchestratorError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ServerError {
    /// The request body was missing a field or could not be parsed
    #[error("{0}")]
    Validation(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

pub type ServerResult<T> = Result<T, ServerError>;

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        tracing::error!(error = %self, "Request failed");
        let body = json!({ "error": self.to_string() });
        (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
    }
}

impl From<OrchestratorError> for ServerError {
    fn from(err: OrchestratorError) -> Self {
        match err {
            OrchestratorError::Validation(message) => ServerError::Validation(message),
        }
    }
}
