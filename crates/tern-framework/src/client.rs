//! The client facade.
//!
//! [`Client`] owns the composer stack, the exception handler registry, the
//! plugin registry, the response classifier and the capability table, and is
//! the only entry point call sites and plugins talk to.
//!
//! # Example
//!
//! ```rust,ignore
//! use tern_framework::Client;
//!
//! let client = Client::builder()
//!     .transport(HttpTransport::new(HttpTransportConfig::default())?)
//!     .build();
//! client.authenticate(Session::new(token)).await?;
//!
//! let users = client.call("users.get", json!({"user_ids": [1]})).await?;
//! ```

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{Instrument, debug, debug_span, info, warn};

use crate::error::{PluginResult, RegistrationResult};
use crate::plugin::{Capability, PluginDescriptor, PluginRegistry};
use tern_core::{
    ApiError, ApiRequest, ApiResult, BoxedTransport, CallContext, Category, ClassifierConfig,
    ComposerStack, DisabledTransport, ExceptionHandler, ExceptionRegistry, HandlerHandle,
    HttpMethod, Middleware, ResponseClassifier, Session, SessionResult, SessionStore, Transport,
};

/// Composer run before the transport.
///
/// Middleware may short-circuit the round trip by filling
/// [`CallContext::response`] or [`CallContext::payload`].
pub const REQUEST_COMPOSER: &str = "api.request";

/// Composer run after a successful (or recovered) call; may rewrite
/// [`CallContext::payload`].
pub const RESPONSE_COMPOSER: &str = "api.response";

// =============================================================================
// ClientOptions
// =============================================================================

/// Options shared by the facade and every plugin.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientOptions {
    /// API version sent as `v` with every call.
    pub api_version: String,
    /// Response language sent as `lang`, if set.
    pub language: Option<String>,
    /// Free-form defaults readable by plugins.
    pub defaults: Map<String, Value>,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            api_version: "5.199".to_string(),
            language: None,
            defaults: Map::new(),
        }
    }
}

// =============================================================================
// ClientBuilder
// =============================================================================

/// Builder for [`Client`].
#[derive(Default)]
pub struct ClientBuilder {
    transport: Option<BoxedTransport>,
    session_store: Option<Arc<dyn SessionStore>>,
    options: ClientOptions,
    classifier: ClassifierConfig,
}

impl ClientBuilder {
    /// Sets the transport collaborator.
    pub fn transport<T: Transport + 'static>(mut self, transport: T) -> Self {
        self.transport = Some(Arc::new(transport));
        self
    }

    /// Sets an already shared transport.
    pub fn shared_transport(mut self, transport: BoxedTransport) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Sets the session persistence collaborator.
    pub fn session_store<S: SessionStore + 'static>(mut self, store: S) -> Self {
        self.session_store = Some(Arc::new(store));
        self
    }

    /// Sets an already shared session store.
    pub fn shared_session_store(mut self, store: Arc<dyn SessionStore>) -> Self {
        self.session_store = Some(store);
        self
    }

    /// Sets the shared options.
    pub fn options(mut self, options: ClientOptions) -> Self {
        self.options = options;
        self
    }

    /// Sets the classifier sentinels and codes.
    pub fn classifier(mut self, config: ClassifierConfig) -> Self {
        self.classifier = config;
        self
    }

    /// Builds the client.
    ///
    /// Without a transport every call fails with
    /// [`TransportError::NotAvailable`](tern_core::TransportError::NotAvailable).
    pub fn build(self) -> Client {
        let composers = ComposerStack::new();
        composers.ensure(REQUEST_COMPOSER);
        composers.ensure(RESPONSE_COMPOSER);

        Client {
            inner: Arc::new(ClientInner {
                options: self.options,
                transport: self
                    .transport
                    .unwrap_or_else(|| Arc::new(DisabledTransport)),
                classifier: ResponseClassifier::new(self.classifier),
                composers,
                exceptions: ExceptionRegistry::new(),
                plugins: PluginRegistry::new(),
                capabilities: RwLock::new(HashMap::new()),
                session: RwLock::new(None),
                session_store: self.session_store,
            }),
        }
    }
}

// =============================================================================
// Client
// =============================================================================

struct ClientInner {
    options: ClientOptions,
    transport: BoxedTransport,
    classifier: ResponseClassifier,
    composers: ComposerStack<CallContext>,
    exceptions: ExceptionRegistry,
    plugins: PluginRegistry,
    capabilities: RwLock<HashMap<String, Capability>>,
    session: RwLock<Option<Session>>,
    session_store: Option<Arc<dyn SessionStore>>,
}

/// The API client facade.
///
/// Cloning is cheap; every clone shares the same registries.
///
/// # Concurrency
///
/// Calls are independent and may run concurrently. Registration and
/// middleware/handler mutation take short write locks; running composers and
/// resolving failures work on snapshots and never block other calls.
#[derive(Clone)]
pub struct Client {
    inner: Arc<ClientInner>,
}

impl Client {
    /// Creates a client builder.
    pub fn builder() -> ClientBuilder {
        ClientBuilder::default()
    }

    /// Returns the shared options.
    pub fn options(&self) -> &ClientOptions {
        &self.inner.options
    }

    // ─── API calls ───────────────────────────────────────────────────────────

    /// Calls `method` over GET.
    ///
    /// `params` must serialise to a JSON object (or `null`).
    ///
    /// # Errors
    ///
    /// See [`call_with`](Self::call_with).
    pub async fn call(&self, method: &str, params: impl Serialize) -> ApiResult<Value> {
        self.call_with(method, params, HttpMethod::Get).await
    }

    /// Calls `method` and deserialises the payload into `T`.
    ///
    /// # Errors
    ///
    /// See [`call_with`](Self::call_with); additionally
    /// [`ApiError::Serialization`] if the payload does not fit `T`.
    pub async fn call_as<T: DeserializeOwned>(
        &self,
        method: &str,
        params: impl Serialize,
    ) -> ApiResult<T> {
        let payload = self.call(method, params).await?;
        Ok(serde_json::from_value(payload)?)
    }

    /// Calls `method` with the given HTTP verb.
    ///
    /// # Errors
    ///
    /// - [`ApiError::Failure`] when the API reported a failure that no
    ///   exception handler recovered.
    /// - [`ApiError::Transport`] when the round trip itself failed. These are
    ///   not offered to exception handlers.
    /// - [`ApiError::Serialization`] when `params` is not an object.
    pub async fn call_with(
        &self,
        method: &str,
        params: impl Serialize,
        http_method: HttpMethod,
    ) -> ApiResult<Value> {
        let request = self.build_request(method, serde_json::to_value(params)?, http_method)?;
        let span = debug_span!("api_call", method = %method, http_method = %http_method);
        self.dispatch(request).instrument(span).await
    }

    fn build_request(
        &self,
        method: &str,
        params: Value,
        http_method: HttpMethod,
    ) -> ApiResult<ApiRequest> {
        let params = match params {
            Value::Object(map) => map,
            Value::Null => Map::new(),
            other => {
                return Err(ApiError::Serialization(format!(
                    "parameters must be a JSON object, got {other}"
                )));
            }
        };

        let mut request = ApiRequest::new(method)
            .with_params(params)
            .with_http_method(http_method);
        if let Some(session) = self.inner.session.read().as_ref() {
            request.param_or_insert("access_token", session.access_token.clone());
        }
        request.param_or_insert("v", self.inner.options.api_version.clone());
        if let Some(language) = &self.inner.options.language {
            request.param_or_insert("lang", language.clone());
        }
        Ok(request)
    }

    async fn dispatch(&self, request: ApiRequest) -> ApiResult<Value> {
        let inner = &self.inner;
        let mut ctx = inner
            .composers
            .run(REQUEST_COMPOSER, CallContext::new(request))
            .await?;

        let payload = match ctx.payload.take() {
            Some(payload) => {
                debug!("Payload supplied by request middleware");
                payload
            }
            None => {
                let response = match ctx.response.take() {
                    Some(response) => response,
                    None => inner.transport.send(&ctx.request).await?,
                };
                let classified = inner.classifier.classify(&response, &ctx.request);
                ctx.response = Some(response);
                match classified {
                    Ok(payload) => payload,
                    Err(failure) => {
                        debug!(category = %failure.category(), "Offering failure to handlers");
                        inner.exceptions.resolve(failure).await.map_err(|failure| {
                            warn!(
                                category = %failure.category(),
                                code = failure.code,
                                message = %failure.message,
                                "API call failed"
                            );
                            ApiError::from(failure)
                        })?
                    }
                }
            }
        };

        ctx.payload = Some(payload);
        let ctx = inner.composers.run(RESPONSE_COMPOSER, ctx).await?;
        Ok(ctx.payload.unwrap_or(Value::Null))
    }

    // ─── Composers ───────────────────────────────────────────────────────────

    /// Appends `middleware` to the composer `id`, creating it if needed.
    pub fn append(&self, id: &str, middleware: Middleware<CallContext>) {
        self.inner.composers.append(id, middleware);
    }

    /// The composer stack.
    pub fn composers(&self) -> &ComposerStack<CallContext> {
        &self.inner.composers
    }

    // ─── Exception handlers ──────────────────────────────────────────────────

    /// Appends a recovery handler for `category`.
    pub fn handle(&self, category: Category, handler: ExceptionHandler) -> HandlerHandle {
        self.inner.exceptions.handle(category, handler)
    }

    /// Prepends a recovery handler for `category`.
    pub fn handle_first(&self, category: Category, handler: ExceptionHandler) -> HandlerHandle {
        self.inner.exceptions.handle_first(category, handler)
    }

    /// Removes a recovery handler. Returns `false` for a stale handle.
    pub fn unhandle(&self, handle: HandlerHandle) -> bool {
        self.inner.exceptions.unregister(handle)
    }

    /// The exception handler registry.
    pub fn exceptions(&self) -> &ExceptionRegistry {
        &self.inner.exceptions
    }

    // ─── Plugins ─────────────────────────────────────────────────────────────

    /// Registers a plugin. See [`PluginRegistry::register`].
    ///
    /// # Errors
    ///
    /// Returns a [`RegistrationError`](crate::RegistrationError) if the name
    /// is unusable or a requirement is missing.
    pub fn register_plugin(
        &self,
        descriptor: PluginDescriptor,
        options: Value,
        deferred: bool,
    ) -> RegistrationResult<()> {
        self.inner
            .plugins
            .register(self, descriptor, options, deferred)
    }

    /// Queues a plugin with no registration options.
    ///
    /// # Errors
    ///
    /// See [`register_plugin`](Self::register_plugin).
    pub fn use_plugin(&self, descriptor: PluginDescriptor) -> RegistrationResult<()> {
        self.register_plugin(descriptor, Value::Null, true)
    }

    /// Enables every queued plugin. See [`PluginRegistry::commit`].
    ///
    /// # Errors
    ///
    /// Returns the first enable failure, or a dependency cycle.
    pub async fn commit_plugins(&self, overrides: &HashMap<String, Value>) -> PluginResult<()> {
        self.inner.plugins.commit(self, overrides).await
    }

    /// The plugin registry.
    pub fn plugins(&self) -> &PluginRegistry {
        &self.inner.plugins
    }

    /// Returns the capability plugin `name` exposed, if it is a `T`.
    pub fn capability<T: Any + Send + Sync>(&self, name: &str) -> Option<Arc<T>> {
        let capability = self.inner.capabilities.read().get(name).cloned()?;
        capability.downcast::<T>().ok()
    }

    pub(crate) fn install_capability(&self, name: &str, capability: Capability) {
        self.inner
            .capabilities
            .write()
            .insert(name.to_string(), capability);
        debug!(plugin = %name, "Capability installed");
    }

    // ─── Session ─────────────────────────────────────────────────────────────

    /// Returns the current session.
    pub fn session(&self) -> Option<Session> {
        self.inner.session.read().clone()
    }

    /// Installs `session` and persists it.
    ///
    /// # Errors
    ///
    /// Returns a [`SessionError`](tern_core::SessionError) if the store
    /// fails; the session is installed regardless.
    pub async fn authenticate(&self, session: Session) -> SessionResult<()> {
        *self.inner.session.write() = Some(session.clone());
        info!(user_id = ?session.user_id, "Session installed");
        if let Some(store) = &self.inner.session_store {
            store.store(&session).await?;
        }
        Ok(())
    }

    /// Loads a stored session, ignoring an expired one.
    ///
    /// Returns `true` when a session was restored.
    ///
    /// # Errors
    ///
    /// Returns a [`SessionError`](tern_core::SessionError) if the store
    /// fails.
    pub async fn restore_session(&self) -> SessionResult<bool> {
        let Some(store) = &self.inner.session_store else {
            return Ok(false);
        };
        match store.load().await? {
            Some(session) if !session.is_expired() => {
                info!(user_id = ?session.user_id, "Session restored");
                *self.inner.session.write() = Some(session);
                Ok(true)
            }
            Some(_) => {
                warn!("Stored session has expired");
                Ok(false)
            }
            None => Ok(false),
        }
    }

    /// Drops the current session and clears the store.
    ///
    /// # Errors
    ///
    /// Returns a [`SessionError`](tern_core::SessionError) if the store
    /// fails.
    pub async fn logout(&self) -> SessionResult<()> {
        self.inner.session.write().take();
        if let Some(store) = &self.inner.session_store {
            store.clear().await?;
        }
        info!("Session cleared");
        Ok(())
    }
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("options", &self.inner.options)
            .field("composers", &self.inner.composers.ids())
            .field("queued_plugins", &self.inner.plugins.queued())
            .finish_non_exhaustive()
    }
}
