//! # Tern Framework
//!
//! The extension layer of the Tern API client.
//!
//! This layer provides:
//! - The [`Client`] facade: issues API calls, runs composers, offers failures
//!   to exception handlers
//! - The plugin system: descriptors, two-phase install, dependency ordering
//!   and capabilities
//!
//! It is built on top of `tern-core`, which owns the composer stack, the
//! exception handler registry and the response classifier.

pub mod client;
pub mod error;
pub mod plugin;

pub use client::{Client, ClientBuilder, ClientOptions, REQUEST_COMPOSER, RESPONSE_COMPOSER};
pub use error::{BoxError, PluginError, PluginResult, RegistrationError, RegistrationResult};
pub use plugin::{
    Capability, PluginContext, PluginDescriptor, PluginRegistry, PluginState,
    RESERVED_PLUGIN_NAMES,
};
