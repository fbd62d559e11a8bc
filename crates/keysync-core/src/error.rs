//! Error types for key synchronization operations.
//!
//! A single error enum is shared by the directory client, the snapshot
//! builder, and the server glue, so a failed rebuild carries the upstream
//! context all the way to the synchronizer boundary where it is logged.

use thiserror::Error;

/// Main error type for key synchronization operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Network or connection failure reaching an upstream service
    #[error("Transport failure: {0}")]
    Transport(String),

    /// Operation timed out
    #[error("Timeout: {0}")]
    Timeout(String),

    /// Upstream returned a non-success status
    #[error("Upstream error {status}: {body}")]
    UpstreamStatus {
        /// HTTP status code returned by the upstream service
        status: u16,
        /// Response body as returned by the upstream service
        body: String,
    },

    /// Malformed response body
    #[error("Failed to decode upstream response: {0}")]
    Decode(String),

    /// A write reported success but the echoed state did not reflect it
    #[error("Write verification failed: {0}")]
    WriteVerification(String),

    /// Submitted data failed validation
    #[error("Validation error: {0}")]
    Validation(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Durable publish to object storage failed
    #[error("Publish failed: {0}")]
    Publish(String),
}

/// Specialized result type for key synchronization operations.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Returns the error code for this error type.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::Transport(_) => "TRANSPORT_ERROR",
            Self::Timeout(_) => "TIMEOUT",
            Self::UpstreamStatus { .. } => "UPSTREAM_STATUS_ERROR",
            Self::Decode(_) => "DECODE_ERROR",
            Self::WriteVerification(_) => "WRITE_VERIFICATION_ERROR",
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::Config(_) => "CONFIG_ERROR",
            Self::Publish(_) => "PUBLISH_ERROR",
        }
    }

    /// Returns true if the failure may clear up by the next scheduled tick.
    ///
    /// Validation and configuration errors are definitive; everything else
    /// depends on upstream state and is worth retrying on the next interval.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        !matches!(self, Self::Validation(_) | Self::Config(_))
    }
}

// Conversions from external error types
impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout(err.to_string())
        } else if err.is_decode() {
            Self::Decode(err.to_string())
        } else {
            Self::Transport(err.to_string())
        }
    }
}

impl From<url::ParseError> for Error {
    fn from(err: url::ParseError) -> Self {
        Self::Config(format!("invalid URL: {err}"))
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::Decode(err.to_string())
    }
}

impl From<validator::ValidationErrors> for Error {
    fn from(err: validator::ValidationErrors) -> Self {
        Self::Config(err.to_string())
    }
}
