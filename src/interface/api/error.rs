//! API error responses

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    /// The request body could not be parsed
    #[error("Invalid payload: {0}")]
    InvalidPayload(String),
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    message: &'static str,
    error: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            ApiError::InvalidPayload(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error")
            }
        };
        let body = ErrorBody {
            message,
            error: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}
