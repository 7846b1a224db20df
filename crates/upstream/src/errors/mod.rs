//! Error types and retry classification for the upstream crate.
//!
//! This module provides:
//! - [`UpstreamError`]: The error enum for every call to the event catalog or rate provider
//! - [`RetryClass`]: Classification for circuit breaker accounting

mod retry;

pub use retry::RetryClass;

use thiserror::Error;

/// Errors that can occur while talking to an upstream dependency.
///
/// Each variant is classified into a [`RetryClass`] via the
/// [`retry_class`](Self::retry_class) method.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum UpstreamError {
    /// The upstream answered with an error status or the transport failed.
    /// `status` is `None` for transport-level failures (DNS, connect, reset).
    #[error("Upstream unavailable: {provider} ({}) - {reason}", status_label(*.status))]
    Unavailable {
        /// The provider that failed
        provider: String,
        /// HTTP status returned by the provider, if any
        status: Option<u16>,
        /// Human readable cause
        reason: String,
    },

    /// The upstream rate limited the request (HTTP 429).
    #[error("Rate limited: {provider}")]
    RateLimited {
        /// The provider that rate limited the request
        provider: String,
    },

    /// The call did not complete within the configured timeout.
    #[error("Timeout: {provider}")]
    Timeout {
        /// The provider that timed out
        provider: String,
    },

    /// The upstream answered 2xx but the body could not be decoded.
    #[error("Malformed response from {provider}: {message}")]
    MalformedResponse {
        /// The provider that returned the body
        provider: String,
        /// Decoder error
        message: String,
    },

    /// A rate value in the upstream table is not a decimal number.
    #[error("Invalid rate for {code}: '{value}'")]
    InvalidRate {
        /// Currency code of the offending row
        code: String,
        /// Raw value as published
        value: String,
    },

    /// The permit gate was closed while waiting for a permit.
    #[error("Permit gate closed")]
    GateClosed,
}

fn status_label(status: Option<u16>) -> String {
    match status {
        Some(code) => format!("HTTP {}", code),
        None => "transport".to_string(),
    }
}

impl UpstreamError {
    /// Build an [`UpstreamError::Unavailable`] for an HTTP error status.
    pub fn status(provider: &str, status: u16, reason: impl Into<String>) -> Self {
        Self::Unavailable {
            provider: provider.to_string(),
            status: Some(status),
            reason: reason.into(),
        }
    }

    /// Build an [`UpstreamError::Unavailable`] for a transport failure.
    pub fn transport(provider: &str, reason: impl Into<String>) -> Self {
        Self::Unavailable {
            provider: provider.to_string(),
            status: None,
            reason: reason.into(),
        }
    }

    /// HTTP status that triggered this error, when there was one.
    pub fn http_status(&self) -> Option<u16> {
        match self {
            Self::Unavailable { status, .. } => *status,
            Self::RateLimited { .. } => Some(429),
            _ => None,
        }
    }

    /// Returns the retry classification for this error.
    ///
    /// # Examples
    ///
    /// ```
    /// use eventwise_upstream::errors::{RetryClass, UpstreamError};
    ///
    /// let error = UpstreamError::status("CBR", 503, "Service Unavailable");
    /// assert_eq!(error.retry_class(), RetryClass::WithPenalty);
    ///
    /// assert_eq!(UpstreamError::GateClosed.retry_class(), RetryClass::Never);
    /// ```
    pub fn retry_class(&self) -> RetryClass {
        match self {
            Self::Unavailable { .. }
            | Self::RateLimited { .. }
            | Self::Timeout { .. }
            | Self::MalformedResponse { .. } => RetryClass::WithPenalty,

            Self::InvalidRate { .. } | Self::GateClosed => RetryClass::Never,
        }
    }
}
