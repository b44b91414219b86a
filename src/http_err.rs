use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use tracing::error;

use crate::rate_limit::{RateLimitError, RateLimitResult};

/// Errors shared by every endpoint. Endpoint specific outcomes, such as
/// validation failures, are modelled by each handler's response type.
#[derive(Debug)]
pub enum ApiError {
    BadRequestReason(String),
    Conflict(String),
    InternalServerError,
    NotFound(String),
    TooManyRequests(RateLimitResult),
    Unauthorized,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Self::BadRequestReason(message) => (StatusCode::BAD_REQUEST, message),
            Self::Conflict(message) => (StatusCode::CONFLICT, message),
            Self::InternalServerError => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error.".to_owned(),
            ),
            Self::NotFound(message) => (StatusCode::NOT_FOUND, message),
            Self::TooManyRequests(result) => return result.into_response(),
            Self::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                "Authentication required.".to_owned(),
            ),
        };

        (status, Json(ErrorRep { message })).into_response()
    }
}

impl From<RateLimitResult> for ApiError {
    fn from(result: RateLimitResult) -> Self {
        Self::TooManyRequests(result)
    }
}

impl From<RateLimitError> for ApiError {
    fn from(error: RateLimitError) -> Self {
        match error {
            RateLimitError::Limited(until) => {
                Self::TooManyRequests(RateLimitResult::LimitedUntil(until))
            }
            RateLimitError::Other(error) => error.into(),
        }
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(error: anyhow::Error) -> Self {
        error!(?error, "Received error.");

        Self::InternalServerError
    }
}

pub type ApiResponse<T> = Result<T, ApiError>;

#[derive(Serialize)]
pub struct ErrorRep {
    pub message: String,
}
