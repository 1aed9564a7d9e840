//! Wires configuration, logging, transport and session persistence into a
//! ready [`Client`].
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use tern_runtime::TernRuntime;
//!
//! let runtime = TernRuntime::builder()
//!     .config_file("config/tern.toml")
//!     .profile("production")
//!     .build()?;
//!
//! runtime.register_plugin(captcha_plugin(), json!({}))?;
//! runtime.start().await?;
//!
//! let users = runtime.client().call("users.get", json!({"user_ids": [1]})).await?;
//! ```

use std::path::Path;
use std::sync::Arc;

use serde_json::Value;
use tracing::{info, warn};

use crate::config::{ConfigLoader, TernConfig, validate_config};
use crate::error::RuntimeResult;
use crate::logging;
use crate::session::FileSessionStore;
use tern_core::{BoxedTransport, SessionStore};
use tern_framework::{Client, PluginDescriptor, RegistrationResult};

/// A configured client plus the settings it was built from.
///
/// Cloning is cheap.
#[derive(Debug, Clone)]
pub struct TernRuntime {
    config: Arc<TernConfig>,
    client: Client,
}

impl TernRuntime {
    /// Creates a runtime builder.
    pub fn builder() -> RuntimeBuilder {
        RuntimeBuilder::new()
    }

    /// Creates a runtime from an already loaded configuration.
    ///
    /// Initializes logging, builds the HTTP transport (feature
    /// `http-client`) and a file session store if persistence is on.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid or the transport
    /// cannot be built.
    pub fn from_config(config: TernConfig) -> RuntimeResult<Self> {
        validate_config(&config)?;
        Self::assemble(config, None, None)
    }

    fn assemble(
        config: TernConfig,
        transport: Option<BoxedTransport>,
        session_store: Option<Arc<dyn SessionStore>>,
    ) -> RuntimeResult<Self> {
        logging::init_from_config(&config.logging);

        let transport = match transport {
            Some(transport) => transport,
            None => Self::default_transport(&config)?,
        };

        let session_store = session_store.or_else(|| {
            config.session.resolved_path().map(|path| {
                info!(path = %path.display(), "Persisting sessions to file");
                Arc::new(FileSessionStore::new(path)) as Arc<dyn SessionStore>
            })
        });

        let mut builder = Client::builder()
            .shared_transport(transport)
            .options(config.api.to_client_options())
            .classifier(config.classifier.clone());
        if let Some(store) = session_store {
            builder = builder.shared_session_store(store);
        }

        info!(
            base_url = %config.api.base_url,
            api_version = %config.api.version,
            log_level = %config.logging.level,
            "Runtime initialized from configuration"
        );

        Ok(Self {
            config: Arc::new(config),
            client: builder.build(),
        })
    }

    #[cfg(feature = "http-client")]
    fn default_transport(config: &TernConfig) -> RuntimeResult<BoxedTransport> {
        let transport = tern_transport::HttpTransport::new(config.api.to_transport_config())?;
        Ok(Arc::new(transport))
    }

    #[cfg(not(feature = "http-client"))]
    fn default_transport(_config: &TernConfig) -> RuntimeResult<BoxedTransport> {
        warn!("Built without `http-client`; calls will fail until a transport is supplied");
        Ok(Arc::new(tern_core::DisabledTransport))
    }

    /// Returns the configuration.
    pub fn config(&self) -> &TernConfig {
        &self.config
    }

    /// Returns the client facade.
    pub fn client(&self) -> &Client {
        &self.client
    }

    /// Queues a plugin for [`start`](Self::start).
    ///
    /// `options` are overlaid on the plugin defaults; the `plugins.<name>`
    /// section of the configuration is overlaid on top at commit.
    ///
    /// # Errors
    ///
    /// See [`Client::register_plugin`].
    pub fn register_plugin(
        &self,
        descriptor: PluginDescriptor,
        options: Value,
    ) -> RegistrationResult<()> {
        self.client.register_plugin(descriptor, options, true)
    }

    /// Restores a persisted session, then commits every queued plugin with
    /// the configured overrides.
    ///
    /// # Errors
    ///
    /// Returns the first session or plugin error.
    pub async fn start(&self) -> RuntimeResult<()> {
        if self.client.restore_session().await? {
            info!("Resumed persisted session");
        }

        for name in self.config.plugins.keys() {
            if self.client.plugins().state(name).is_none() {
                warn!(plugin = %name, "Overrides configured for an unknown plugin");
            }
        }

        self.client.commit_plugins(&self.config.plugins).await?;
        info!("Runtime started");
        Ok(())
    }
}

// =============================================================================
// RuntimeBuilder
// =============================================================================

/// Builder for [`TernRuntime`].
pub struct RuntimeBuilder {
    config_loader: ConfigLoader,
    transport: Option<BoxedTransport>,
    session_store: Option<Arc<dyn SessionStore>>,
}

impl RuntimeBuilder {
    /// Creates a new runtime builder searching the current directory.
    pub fn new() -> Self {
        Self {
            config_loader: ConfigLoader::new().with_current_dir(),
            transport: None,
            session_store: None,
        }
    }

    /// Sets a specific configuration file to load.
    pub fn config_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.config_loader = self.config_loader.file(path);
        self
    }

    /// Sets the configuration profile (e.g., "development", "production").
    pub fn profile(mut self, profile: impl Into<String>) -> Self {
        self.config_loader = self.config_loader.profile(profile);
        self
    }

    /// Adds a search path for configuration files.
    pub fn search_path<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.config_loader = self.config_loader.search_path(path);
        self
    }

    /// Enables loading environment variables (enabled by default).
    pub fn with_env(mut self) -> Self {
        self.config_loader = self.config_loader.with_env();
        self
    }

    /// Disables loading environment variables.
    pub fn without_env(mut self) -> Self {
        self.config_loader = self.config_loader.without_env();
        self
    }

    /// Merges additional configuration programmatically.
    pub fn merge(mut self, config: TernConfig) -> Self {
        self.config_loader = self.config_loader.merge(config);
        self
    }

    /// Uses `transport` instead of the configured HTTP transport.
    pub fn transport(mut self, transport: BoxedTransport) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Uses `store` instead of the configured file store.
    pub fn session_store(mut self, store: Arc<dyn SessionStore>) -> Self {
        self.session_store = Some(store);
        self
    }

    /// Loads the configuration and builds the runtime.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration cannot be loaded or the
    /// transport cannot be built.
    pub fn build(self) -> RuntimeResult<TernRuntime> {
        let config = self.config_loader.load()?;
        TernRuntime::assemble(config, self.transport, self.session_store)
    }
}

impl Default for RuntimeBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use serde_json::{Map, json};
    use tempfile::TempDir;
    use tern_core::{ApiResponse, FnTransport, MemorySessionStore, Session};
    use tokio_test::assert_ok;

    fn stub_transport() -> BoxedTransport {
        Arc::new(FnTransport::new(|request| async move {
            Ok(ApiResponse::json(json!({"response": request.params})))
        }))
    }

    /// Searches only an empty directory so stray config files are ignored.
    fn builder(config: TernConfig) -> (TempDir, RuntimeBuilder) {
        let dir = TempDir::new().unwrap();
        let builder = RuntimeBuilder {
            config_loader: ConfigLoader::new()
                .search_path(dir.path())
                .without_env()
                .merge(config),
            transport: Some(stub_transport()),
            session_store: None,
        };
        (dir, builder)
    }

    #[tokio::test]
    async fn test_start_applies_configured_overrides() {
        let mut config = TernConfig::default();
        config.session.persist = false;
        config.plugins.insert("limits".into(), json!({"per_second": 3}));

        let (_dir, builder) = builder(config);
        let runtime = assert_ok!(builder.build());

        let seen: Arc<Mutex<Option<Map<String, Value>>>> = Arc::new(Mutex::new(None));
        let sink = Arc::clone(&seen);
        let descriptor = PluginDescriptor::new("limits", move |ctx| {
            let sink = Arc::clone(&sink);
            async move {
                *sink.lock() = Some(ctx.options().clone());
                Ok(None)
            }
        })
        .defaults(json!({"per_second": 20, "burst": 1}));
        assert_ok!(runtime.register_plugin(descriptor, json!({"burst": 2})));

        assert_ok!(runtime.start().await);
        assert_eq!(
            Value::Object(seen.lock().clone().unwrap()),
            json!({"per_second": 3, "burst": 2})
        );
    }

    #[tokio::test]
    async fn test_client_uses_configured_api_settings() {
        let mut config = TernConfig::default();
        config.session.persist = false;
        config.api.version = "5.131".into();
        config.api.language = Some("en".into());

        let (_dir, builder) = builder(config);
        let runtime = assert_ok!(builder.build());
        let params = assert_ok!(runtime.client().call("users.get", Value::Null).await);
        assert_eq!(params["v"], json!("5.131"));
        assert_eq!(params["lang"], json!("en"));
    }

    #[tokio::test]
    async fn test_start_restores_file_session() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("session.json");
        assert_ok!(
            FileSessionStore::new(&path)
                .store(&Session::new("persisted").with_user_id(1))
                .await
        );

        let mut config = TernConfig::default();
        config.session.path = Some(path);
        let (_dir, builder) = builder(config);
        let runtime = assert_ok!(builder.build());
        assert!(runtime.client().session().is_none());

        assert_ok!(runtime.start().await);
        assert_eq!(runtime.client().session().unwrap().access_token, "persisted");
    }

    #[tokio::test]
    async fn test_explicit_session_store_wins() {
        let store: Arc<dyn SessionStore> = Arc::new(MemorySessionStore::new());
        assert_ok!(store.store(&Session::new("memory")).await);

        let (_dir, builder) = builder(TernConfig::default());
        let runtime = assert_ok!(builder.session_store(Arc::clone(&store)).build());
        assert_ok!(runtime.start().await);
        assert_eq!(runtime.client().session().unwrap().access_token, "memory");
    }

    #[test]
    fn test_builder_reads_only_its_search_path() {
        let (dir, builder) = builder(TernConfig::default());
        std::fs::write(dir.path().join("tern.toml"), "[api]\nversion = \"5.100\"\n").unwrap();
        let runtime = assert_ok!(builder.build());
        assert_eq!(runtime.config().api.version, "5.100");

        let (_empty, builder) = self::builder(TernConfig::default());
        let runtime = assert_ok!(builder.build());
        assert_eq!(runtime.config().api.version, "5.199");
    }

    #[test]
    fn test_from_config_rejects_invalid_config() {
        let mut config = TernConfig::default();
        config.api.timeout_secs = 0;
        assert!(TernRuntime::from_config(config).is_err());
    }
}
