//! Error types for the Tern framework.

use thiserror::Error;

/// Boxed error returned by plugin enable routines.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Errors that reject a plugin registration.
///
/// A rejected registration leaves the registry untouched.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistrationError {
    /// The descriptor has an empty name.
    #[error("plugin name must not be empty")]
    EmptyName,

    /// The name collides with a facade surface.
    #[error("plugin name '{0}' is reserved")]
    ReservedName(String),

    /// A plugin with this name is already queued or installed.
    #[error("plugin '{0}' is already registered")]
    DuplicateName(String),

    /// A required plugin is neither installed nor queued.
    #[error("plugin '{plugin}' requires '{dependency}', which is not registered")]
    MissingDependency {
        /// The plugin being registered.
        plugin: String,
        /// The requirement that is not satisfied.
        dependency: String,
    },

    /// The queued plugins cannot be ordered.
    #[error("plugin ordering cycle detected among: {}", .0.join(", "))]
    DependencyCycle(Vec<String>),
}

/// Errors raised while installing plugins.
#[derive(Debug, Error)]
pub enum PluginError {
    /// The registry rejected the operation.
    #[error(transparent)]
    Registration(#[from] RegistrationError),

    /// A plugin's enable routine failed.
    #[error("plugin '{plugin}' failed to enable: {source}")]
    EnableFailed {
        /// Name of the failing plugin.
        plugin: String,
        /// The routine's error.
        #[source]
        source: BoxError,
    },

    /// The task running an enable routine panicked or was aborted.
    #[error("plugin '{plugin}' enable task did not complete: {reason}")]
    Join {
        /// Name of the affected plugin.
        plugin: String,
        /// Description of the join failure.
        reason: String,
    },
}

/// Result type for registration.
pub type RegistrationResult<T> = Result<T, RegistrationError>;

/// Result type for plugin installation.
pub type PluginResult<T> = Result<T, PluginError>;
