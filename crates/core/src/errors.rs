//! Core error types for the Eventwise pipeline.
//!
//! Every variant maps to an HTTP-status equivalent through
//! [`Error::status_code`], which is what the request boundary uses to pick
//! the response shape. Transport failures of the upstreams are normally
//! absorbed before they reach this type; see the degradation rules in
//! [`crate::events::BudgetEventService`].

use std::time::Duration;

use eventwise_upstream::{UpstreamError, WindowError};
use thiserror::Error;

use crate::fx::FxError;

/// Type alias for Result using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Root error type for the pipeline.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid date range: {0}")]
    InvalidWindow(#[from] WindowError),

    #[error("Invalid {field}: {message}")]
    Validation { field: String, message: String },

    /// Legitimate empty outcome, not a failure of either upstream.
    #[error("{0}")]
    NoMatchingEvents(String),

    #[error("Fx error: {0}")]
    Fx(#[from] FxError),

    #[error("Upstream error: {0}")]
    Upstream(#[from] UpstreamError),

    #[error("Invalid configuration value: {0}")]
    InvalidConfigValue(String),
}

impl Error {
    pub fn validation(field: &str, message: impl Into<String>) -> Self {
        Error::Validation {
            field: field.to_string(),
            message: message.into(),
        }
    }

    /// HTTP status equivalent of this error.
    pub fn status_code(&self) -> u16 {
        match self {
            Error::InvalidWindow(_) | Error::Validation { .. } => 400,
            Error::NoMatchingEvents(_) => 404,
            Error::Fx(err) => err.status_code(),
            Error::Upstream(_) => 503,
            Error::InvalidConfigValue(_) => 500,
        }
    }

    /// Retry hint for service-unavailable errors, when one is known.
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            Error::Fx(FxError::RatesUnavailable { retry_after }) => *retry_after,
            _ => None,
        }
    }
}

impl From<Error> for String {
    fn from(err: Error) -> Self {
        err.to_string()
    }
}
