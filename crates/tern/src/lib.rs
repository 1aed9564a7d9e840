//! # Tern
//!
//! An extensible client for a social-network API, built around middleware
//! pipelines, recoverable failures and dependency-ordered plugins.
//!
//! ## Architecture
//!
//! ```text
//! call ──▶ api.request composer ──▶ Transport ──▶ ResponseClassifier
//!                                                    │
//!                     payload ◀── api.response ◀─────┤ success
//!                                 composer           │
//!                                                    ▼ failure
//!                                      ExceptionRegistry (by category)
//!                                        ├─ Resolve(value) ──▶ api.response
//!                                        └─ Pass ──▶ ApiError::Failure
//! ```
//!
//! - **Client**: the facade every call site and plugin talks to
//! - **Composers**: named middleware pipelines (`api.request`, `api.response`)
//! - **Exception handlers**: async recovery routines keyed by failure category,
//!   matched by ancestry
//! - **Plugins**: behaviour bundles installed in two phases and ordered by
//!   their declared requirements
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use tern::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let runtime = TernRuntime::builder().build()?;
//!
//!     runtime.register_plugin(
//!         PluginDescriptor::new("captcha-log", |ctx| async move {
//!             ctx.client().handle(
//!                 Category::Captcha,
//!                 exception_handler(|failure, _| async move {
//!                     warn!(code = failure.code, "Captcha requested");
//!                     Recovery::Pass(failure)
//!                 }),
//!             );
//!             Ok(None)
//!         }),
//!         serde_json::Value::Null,
//!     )?;
//!     runtime.start().await?;
//!
//!     let me = runtime.client().call("users.get", serde_json::Value::Null).await?;
//!     info!(%me, "Fetched profile");
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - `toml-config` *(default)*: TOML configuration files
//! - `yaml-config`: YAML configuration files
//! - `json-log`: JSON log output
//! - `http-client` *(default)*: the `reqwest` transport

pub use tern_core as core;
pub use tern_framework as framework;
pub use tern_runtime as runtime;
pub use tern_transport as transport;

/// Prelude module for convenient imports.
///
/// ```rust,ignore
/// use tern::prelude::*;
/// ```
pub mod prelude {
    // Runtime - main entry point
    pub use tern_runtime::{TernConfig, TernRuntime};

    // Client facade
    pub use tern_framework::{
        Client, ClientOptions, REQUEST_COMPOSER, RESPONSE_COMPOSER,
    };

    // Plugin system
    pub use tern_framework::{BoxError, Capability, PluginContext, PluginDescriptor};

    // Middleware and recovery
    pub use tern_core::{
        CallContext, Category, FailureKind, HttpMethod, Recovery, exception_handler, middleware,
    };

    // Errors and sessions
    pub use tern_core::{ApiError, ApiFailure, Session};

    // Logging macros
    pub use tern_runtime::prelude::*;
}
