//! Tern Runtime - configuration, logging and persistence for the Tern API
//! client.
//!
//! This crate provides:
//! - Layered configuration (`TernConfig`, `ConfigLoader`)
//! - Logging setup (`LoggingBuilder`, `init_from_config`)
//! - File session persistence (`FileSessionStore`)
//! - A runtime that wires them into a ready client (`TernRuntime`)
//!
//! ```ignore
//! use tern_runtime::TernRuntime;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let runtime = TernRuntime::builder().build()?;
//!     runtime.register_plugin(my_plugin(), serde_json::Value::Null)?;
//!     runtime.start().await?;
//!
//!     let me = runtime.client().call("users.get", serde_json::Value::Null).await?;
//!     println!("{me}");
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod logging;
pub mod runtime;
pub mod session;

// Re-exports
pub use config::{ConfigError, ConfigLoader, ConfigResult, TernConfig};
pub use error::{RuntimeError, RuntimeResult};
pub use logging::{API_CALL_SPAN, LoggingBuilder, PLUGIN_ENABLE_SPAN};
pub use runtime::{RuntimeBuilder, TernRuntime};
pub use session::FileSessionStore;

// Re-export tracing for use by other crates
pub use tracing;
pub use tracing_subscriber;

/// Prelude module for convenient imports.
///
/// Provides the commonly used logging macros:
/// - `trace!`, `debug!`, `info!`, `warn!`, `error!`
/// - `span`, `event`
/// - `instrument` attribute
/// - `Level` for span creation
pub mod prelude {
    pub use tracing::{Level, debug, error, event, info, instrument, span, trace, warn};
}
