//! Configuration for the Tern runtime.
//!
//! Settings are layered with `figment` from built-in defaults, a
//! `tern.toml` / `tern.yaml` file and `TERN_*` environment variables, then
//! checked by [`validate_config`].

pub mod error;
pub mod loader;
pub mod schema;
pub mod validation;

pub use error::{ConfigError, ConfigResult};
pub use loader::{ConfigLoader, Profile, load_config, load_config_from_file};
pub use schema::{
    ApiConfig, LogFormat, LogLevel, LogOutput, LoggingConfig, SessionConfig, SpanEventConfig,
    TernConfig,
};
pub use validation::validate_config;
