//! Runtime error types.

use thiserror::Error;

use crate::config::ConfigError;
use tern_core::{SessionError, TransportError};
use tern_framework::{PluginError, RegistrationError};

/// Errors that can occur during runtime operations.
#[derive(Error, Debug)]
pub enum RuntimeError {
    /// Configuration could not be loaded.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// The transport could not be built.
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// The session store failed.
    #[error("Session error: {0}")]
    Session(#[from] SessionError),

    /// A plugin was rejected at registration.
    #[error("Plugin registration error: {0}")]
    Registration(#[from] RegistrationError),

    /// A plugin commit failed.
    #[error("Plugin error: {0}")]
    Plugin(#[from] PluginError),
}

/// Result type for runtime operations.
pub type RuntimeResult<T> = Result<T, RuntimeError>;
