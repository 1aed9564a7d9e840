//! Plugin descriptor: name, ordering constraints, defaults and the enable
//! routine.

use std::any::Any;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use futures::future::BoxFuture;
use serde_json::{Map, Value};

use super::context::PluginContext;
use crate::error::BoxError;

/// A capability a plugin exposes through the client facade.
///
/// Stored under the plugin's name and fetched with
/// [`Client::capability`](crate::Client::capability).
pub type Capability = Arc<dyn Any + Send + Sync>;

/// Type of the async enable routine stored inside a [`PluginDescriptor`].
pub type EnableFn =
    Arc<dyn Fn(PluginContext) -> BoxFuture<'static, Result<Option<Capability>, BoxError>> + Send + Sync>;

/// Names a plugin may not use because the facade already owns them.
pub const RESERVED_PLUGIN_NAMES: &[&str] = &[
    "api",
    "call",
    "options",
    "plugins",
    "composers",
    "exceptions",
    "session",
    "transport",
];

/// Describes an optional behaviour bundle.
///
/// # Example
///
/// ```rust,ignore
/// let captcha = PluginDescriptor::new("captcha", |ctx| async move {
///     ctx.client().handle(Category::Captcha, solver(ctx.options().clone()));
///     Ok(None)
/// })
/// .requires(["session-refresh"])
/// .defaults(json!({"attempts": 3}));
/// ```
#[derive(Clone)]
pub struct PluginDescriptor {
    name: String,
    version: &'static str,
    requires: Vec<String>,
    setup_after: Option<String>,
    defaults: Map<String, Value>,
    enable: EnableFn,
}

impl PluginDescriptor {
    /// Creates a descriptor named `name` whose enable routine is `enable`.
    pub fn new<F, Fut>(name: impl Into<String>, enable: F) -> Self
    where
        F: Fn(PluginContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Option<Capability>, BoxError>> + Send + 'static,
    {
        Self {
            name: name.into(),
            version: "0.0.0",
            requires: Vec::new(),
            setup_after: None,
            defaults: Map::new(),
            enable: Arc::new(move |ctx| Box::pin(enable(ctx))),
        }
    }

    /// Declares plugins that must be queued or installed first.
    pub fn requires<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.requires.extend(names.into_iter().map(Into::into));
        self
    }

    /// Asks to be queued immediately before `name`, if `name` is queued.
    pub fn setup_after(mut self, name: impl Into<String>) -> Self {
        self.setup_after = Some(name.into());
        self
    }

    /// Sets the default options.
    ///
    /// Non-object values are ignored.
    pub fn defaults(mut self, defaults: Value) -> Self {
        if let Value::Object(map) = defaults {
            self.defaults = map;
        }
        self
    }

    /// Sets the version reported in logs.
    pub fn version(mut self, version: &'static str) -> Self {
        self.version = version;
        self
    }

    /// Returns the plugin name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the plugin version.
    pub fn plugin_version(&self) -> &'static str {
        self.version
    }

    /// Returns the declared requirements.
    pub fn requirements(&self) -> &[String] {
        &self.requires
    }

    /// Returns the `setup_after` target.
    pub fn setup_after_target(&self) -> Option<&str> {
        self.setup_after.as_deref()
    }

    /// Returns the default options.
    pub fn default_options(&self) -> &Map<String, Value> {
        &self.defaults
    }

    pub(crate) fn enable_fn(&self) -> EnableFn {
        Arc::clone(&self.enable)
    }
}

impl fmt::Debug for PluginDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PluginDescriptor")
            .field("name", &self.name)
            .field("version", &self.version)
            .field("requires", &self.requires)
            .field("setup_after", &self.setup_after)
            .field("defaults", &self.defaults)
            .finish_non_exhaustive()
    }
}
