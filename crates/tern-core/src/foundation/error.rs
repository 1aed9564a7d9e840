//! Unified error types for the Tern core.
//!
//! Plugin registration errors are defined in `tern-framework`.

use thiserror::Error;

use super::failure::ApiFailure;

// =============================================================================
// Transport Errors
// =============================================================================

/// Errors reported by a transport collaborator.
#[derive(Debug, Clone, Error)]
pub enum TransportError {
    /// The request never reached the remote end.
    #[error("request to {url} failed: {reason}")]
    RequestFailed {
        /// Target URL.
        url: String,
        /// Reason for failure.
        reason: String,
    },

    /// The remote end did not answer in time.
    #[error("request to {url} timed out")]
    Timeout {
        /// Target URL.
        url: String,
    },

    /// The response could not be read.
    #[error("failed to read response body: {0}")]
    BodyRead(String),

    /// Transport not available.
    #[error("transport '{transport}' not available")]
    NotAvailable {
        /// The transport type that's not available.
        transport: &'static str,
    },

    /// Invalid configuration.
    #[error("invalid transport configuration: {0}")]
    InvalidConfig(String),
}

// =============================================================================
// Composer Errors
// =============================================================================

/// Errors raised by the composer stack.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ComposerError {
    /// No composer was ever created under this identifier.
    #[error("unknown composer '{0}'")]
    Unknown(String),
}

// =============================================================================
// Session Errors
// =============================================================================

/// Errors raised by a session store.
#[derive(Debug, Error)]
pub enum SessionError {
    /// Reading or writing the backing medium failed.
    #[error("session I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The stored record could not be (de)serialised.
    #[error("session record is invalid: {0}")]
    Serialization(#[from] serde_json::Error),
}

// =============================================================================
// API Errors
// =============================================================================

/// Error type for API calls issued through the client facade.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The API answered with a failure no handler recovered.
    #[error(transparent)]
    Failure(Box<ApiFailure>),

    /// The transport failed before a response was available.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A composer the facade relies on is missing.
    #[error(transparent)]
    Composer(#[from] ComposerError),

    /// Parameters could not be serialised.
    #[error("serialization error: {0}")]
    Serialization(String),
}

impl ApiError {
    /// Returns the structured failure, if this is one.
    pub fn failure(&self) -> Option<&ApiFailure> {
        match self {
            Self::Failure(failure) => Some(failure),
            _ => None,
        }
    }
}

impl From<ApiFailure> for ApiError {
    fn from(failure: ApiFailure) -> Self {
        Self::Failure(Box::new(failure))
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Result type for transport operations.
pub type TransportResult<T> = Result<T, TransportError>;

/// Result type for API calls.
pub type ApiResult<T> = Result<T, ApiError>;

/// Result type for session store operations.
pub type SessionResult<T> = Result<T, SessionError>;
