use std::time::Duration;

use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use eventwise_core::errors::Error as CoreError;
use serde::Serialize;
use thiserror::Error;

/// Retry hint for 503s that carry none of their own.
const DEFAULT_RETRY_AFTER: Duration = Duration::from_secs(60);

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("{0}")]
    Core(#[from] CoreError),
    #[error("{0}")]
    BadRequest(String),
}

#[derive(Serialize)]
struct ErrorBody {
    code: u16,
    message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, retry_after) = match &self {
            ApiError::Core(e) => (
                StatusCode::from_u16(e.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
                e.retry_after(),
            ),
            ApiError::BadRequest(_) => (StatusCode::BAD_REQUEST, None),
        };

        match status.as_u16() {
            500..=599 => tracing::warn!("Request failed with {}: {}", status, self),
            _ => tracing::debug!("Request rejected with {}: {}", status, self),
        }

        let body = Json(ErrorBody {
            code: status.as_u16(),
            message: self.to_string(),
        });
        let mut response = (status, body).into_response();

        if status == StatusCode::SERVICE_UNAVAILABLE {
            let secs = retry_after.unwrap_or(DEFAULT_RETRY_AFTER);
            // Whole seconds, rounded up so clients never retry early.
            let secs = secs.as_secs() + u64::from(secs.subsec_nanos() > 0);
            response
                .headers_mut()
                .insert(header::RETRY_AFTER, HeaderValue::from(secs.max(1)));
        }
        response
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
