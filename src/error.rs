//! Error types and handling for Tachograph
//!
//! This module defines the error types used throughout the application and
//! the classification used to decide how a failed collaborator call is
//! reported.

use crate::logging::StructuredLogger;
use thiserror::Error;

/// Result type alias for Tachograph operations
pub type Result<T> = std::result::Result<T, TachographError>;

/// Main error type for Tachograph
#[derive(Debug, Error)]
pub enum TachographError {
    /// Configuration-related errors
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// Validation errors
    #[error("Validation error: {field} - {message}")]
    Validation { field: String, message: String },

    /// Serialization/deserialization errors
    #[error("Serialization error: {message}")]
    Serialization { message: String },

    /// File I/O errors
    #[error("I/O error: {message}")]
    Io { message: String },

    /// Transport-level failures (DNS, TLS, connection reset)
    #[error("Network error: {message}")]
    Network { message: String },

    /// The backend refused the call because the daily quota is exhausted
    #[error("Rate limit error: {message}")]
    RateLimit { message: String },

    /// A single call could not reach its target in time
    #[error("Timeout error: {message}")]
    Timeout { message: String },

    /// Remote-reported failure (Kia Connect, Spritmonitor)
    #[error("API error: {message}")]
    Api { message: String },

    /// Authentication/session errors
    #[error("Authentication error: {message}")]
    Auth { message: String },

    /// Local clock and vehicle timestamps disagree
    #[error("Clock skew error: {message}")]
    ClockSkew { message: String },

    /// Generic errors with context
    #[error("Error: {message}")]
    Generic { message: String },
}

/// How a failed external call is classified for reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Quota exhausted; the backend blocks further calls for about a day
    RateLimit,
    /// The vehicle or service did not answer
    Timeout,
    /// The service answered with an error
    Api,
    /// Anything else, including data-shape mismatches
    Unclassified,
}

impl TachographError {
    /// Create a new configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        TachographError::Config {
            message: message.into(),
        }
    }

    /// Create a new validation error
    pub fn validation<S: Into<String>>(field: S, message: S) -> Self {
        TachographError::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create a new serialization error
    pub fn serialization<S: Into<String>>(message: S) -> Self {
        TachographError::Serialization {
            message: message.into(),
        }
    }

    /// Create a new I/O error
    pub fn io<S: Into<String>>(message: S) -> Self {
        TachographError::Io {
            message: message.into(),
        }
    }

    /// Create a new network error
    pub fn network<S: Into<String>>(message: S) -> Self {
        TachographError::Network {
            message: message.into(),
        }
    }

    /// Create a new rate limit error
    pub fn rate_limit<S: Into<String>>(message: S) -> Self {
        TachographError::RateLimit {
            message: message.into(),
        }
    }

    /// Create a new timeout error
    pub fn timeout<S: Into<String>>(message: S) -> Self {
        TachographError::Timeout {
            message: message.into(),
        }
    }

    /// Create a new API error
    pub fn api<S: Into<String>>(message: S) -> Self {
        TachographError::Api {
            message: message.into(),
        }
    }

    /// Create a new auth error
    pub fn auth<S: Into<String>>(message: S) -> Self {
        TachographError::Auth {
            message: message.into(),
        }
    }

    /// Create a new clock skew error
    pub fn clock_skew<S: Into<String>>(message: S) -> Self {
        TachographError::ClockSkew {
            message: message.into(),
        }
    }

    /// Create a new generic error
    pub fn generic<S: Into<String>>(message: S) -> Self {
        TachographError::Generic {
            message: message.into(),
        }
    }

    /// Map this error onto the reporting taxonomy
    pub fn class(&self) -> ErrorClass {
        match self {
            TachographError::RateLimit { .. } => ErrorClass::RateLimit,
            TachographError::Timeout { .. } => ErrorClass::Timeout,
            TachographError::Api { .. } | TachographError::Auth { .. } => ErrorClass::Api,
            _ => ErrorClass::Unclassified,
        }
    }

    /// Whether this error must stop the whole run rather than just the current pass
    pub fn is_fatal(&self) -> bool {
        matches!(self, TachographError::ClockSkew { .. })
    }
}

/// Log a failed collaborator call with a class-specific explanation.
///
/// `context` names the call that failed (e.g. "fetching cached vehicle state").
pub fn report_failure(logger: &StructuredLogger, context: &str, err: &TachographError) {
    match err.class() {
        ErrorClass::RateLimit => logger.error(&format!(
            "{}: rate limited, the daily request quota is probably exhausted; giving up until the next run: {}",
            context, err
        )),
        ErrorClass::Timeout => logger.error(&format!(
            "{}: the vehicle did not respond; stopping to avoid piling up failed requests: {}",
            context, err
        )),
        ErrorClass::Api => logger.error(&format!(
            "{}: server responded with error: {}",
            context, err
        )),
        ErrorClass::Unclassified => {
            logger.error(&format!("{}: generic error: {}", context, err))
        }
    }
}

impl From<std::io::Error> for TachographError {
    fn from(err: std::io::Error) -> Self {
        TachographError::io(err.to_string())
    }
}

impl From<serde_yaml::Error> for TachographError {
    fn from(err: serde_yaml::Error) -> Self {
        TachographError::serialization(err.to_string())
    }
}

impl From<serde_json::Error> for TachographError {
    fn from(err: serde_json::Error) -> Self {
        TachographError::serialization(err.to_string())
    }
}

impl From<reqwest::Error> for TachographError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            TachographError::timeout(err.to_string())
        } else if err.is_decode() {
            TachographError::serialization(err.to_string())
        } else {
            TachographError::network(err.to_string())
        }
    }
}

impl From<chrono::ParseError> for TachographError {
    fn from(err: chrono::ParseError) -> Self {
        TachographError::validation("datetime", &err.to_string())
    }
}

impl From<chrono_tz::ParseError> for TachographError {
    fn from(err: chrono_tz::ParseError) -> Self {
        TachographError::validation("timezone", &err.to_string())
    }
}
