//! Plugin system for the Tern client.
//!
//! # Architecture
//!
//! A plugin is an optional behaviour bundle described by a
//! [`PluginDescriptor`]: a unique name, the plugins it requires, an optional
//! `setup_after` ordering hint, default options and an async enable routine.
//!
//! The enable routine receives a [`PluginContext`]. Through it the plugin
//! appends middleware to composers and registers exception handlers on the
//! client facade. It may return a [`Capability`], which the facade stores
//! under the plugin's name instead of growing new methods.
//!
//! # Quick start
//!
//! ```rust,ignore
//! use tern::prelude::*;
//!
//! struct Counter(AtomicU64);
//!
//! let counter = PluginDescriptor::new("counter", |ctx| async move {
//!     let counter = Arc::new(Counter(AtomicU64::new(0)));
//!     let seen = Arc::clone(&counter);
//!     ctx.client().append(REQUEST_COMPOSER, middleware(move |call, next| {
//!         seen.0.fetch_add(1, Ordering::Relaxed);
//!         next.run(call)
//!     }));
//!     Ok(Some(counter as Capability))
//! });
//!
//! client.register_plugin(counter, Value::Null, true)?;
//! client.commit_plugins(&HashMap::new()).await?;
//! let counter = client.capability::<Counter>("counter");
//! ```
//!
//! # Options
//!
//! Each plugin's options are its descriptor defaults, overlaid with the
//! options given at registration, overlaid with the per-plugin overrides
//! passed to commit (the runtime feeds these from `tern.toml → plugins`).

pub mod context;
pub mod descriptor;
pub mod registry;

pub use context::PluginContext;
pub use descriptor::{Capability, EnableFn, PluginDescriptor, RESERVED_PLUGIN_NAMES};
pub use registry::{PluginRegistry, PluginState};
