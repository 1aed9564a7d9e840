//! # Tern Core
//!
//! The dispatch engine of the Tern API client.
//!
//! ## Architecture Layers
//!
//! ### Foundation Layer
//!
//! The values that flow through an API call:
//! - **Requests and responses**: [`ApiRequest`], [`ApiResponse`], [`CallContext`]
//! - **Failure taxonomy**: [`Category`] (closed hierarchy) and [`ApiFailure`]
//! - **Errors**: [`ApiError`], [`TransportError`], [`ComposerError`]
//!
//! ### Dispatch Layer
//!
//! - **Composer stack**: named middleware pipelines ([`ComposerStack`])
//! - **Exception handlers**: category-keyed recovery ([`ExceptionRegistry`])
//! - **Response classifier**: payload or structured failure ([`ResponseClassifier`])
//!
//! ### Integration Layer
//!
//! External collaborators:
//! - **Transport**: performs the network round trip ([`Transport`])
//! - **Session store**: persists the authenticated session ([`SessionStore`])
//!
//! ## Call Flow
//!
//! ```text
//! call site ──▶ api.request ──▶ Transport ──▶ Classifier ──▶ api.response ──▶ payload
//!               (composer)                        │
//!                                                 │ failure
//!                                                 ▼
//!                                         ExceptionRegistry ──▶ recovered payload
//!                                                 │
//!                                                 ▼
//!                                         ApiError::Failure
//! ```

// Architectural layers
pub mod dispatch;
pub mod foundation;
pub mod integration;

// Re-export foundation types
pub use foundation::{
    ApiError, ApiFailure, ApiRequest, ApiResponse, ApiResult, CallContext, Category,
    ComposerError, FailureKind, HttpMethod, ResponseBody, SessionError, SessionResult,
    TransportError, TransportResult,
};

// Re-export dispatch types
pub use dispatch::{
    ClassifierConfig, ComposerStack, ExceptionHandler, ExceptionRegistry, HandlerHandle,
    Middleware, Next, Recovery, ResponseClassifier, exception_handler, middleware,
};

// Re-export integration types
pub use integration::{
    BoxedTransport, DisabledTransport, FnTransport, MemorySessionStore, Session, SessionStore,
    Transport,
};

pub use futures::future::BoxFuture;
