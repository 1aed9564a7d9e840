//! The transport collaborator.
//!
//! The client facade is unaware of how a request travels; it only needs a
//! [`Transport`] that turns an [`ApiRequest`] into an [`ApiResponse`].
//!
//! | Implementation | Where | Strategy |
//! |----------------|-------|----------|
//! | `HttpTransport` | `tern-transport` | HTTP round trip via `reqwest`. |
//! | [`FnTransport`] | here | Delegates to a closure; used for stubbing. |
//! | [`DisabledTransport`] | here | Refuses every call. |

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use futures::future::BoxFuture;

use crate::foundation::{ApiRequest, ApiResponse, TransportError, TransportResult};

/// Performs the network round trip for a single API call.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Sends `request` and returns the raw response.
    ///
    /// # Errors
    ///
    /// Returns a [`TransportError`] when no response could be obtained.
    async fn send(&self, request: &ApiRequest) -> TransportResult<ApiResponse>;
}

/// Shared, type-erased transport.
pub type BoxedTransport = Arc<dyn Transport>;

// =============================================================================
// DisabledTransport
// =============================================================================

/// [`Transport`] used when none was configured.
#[derive(Debug, Default, Clone, Copy)]
pub struct DisabledTransport;

#[async_trait]
impl Transport for DisabledTransport {
    async fn send(&self, _request: &ApiRequest) -> TransportResult<ApiResponse> {
        Err(TransportError::NotAvailable {
            transport: "disabled",
        })
    }
}

// =============================================================================
// FnTransport
// =============================================================================

type SendFn = Arc<dyn Fn(ApiRequest) -> BoxFuture<'static, TransportResult<ApiResponse>> + Send + Sync>;

/// [`Transport`] backed by an async closure.
///
/// ```rust,ignore
/// let transport = FnTransport::new(|request| async move {
///     Ok(ApiResponse::json(json!({"response": request.method})))
/// });
/// ```
#[derive(Clone)]
pub struct FnTransport {
    send: SendFn,
}

impl FnTransport {
    /// Wraps `f`.
    pub fn new<F, Fut>(f: F) -> Self
    where
        F: Fn(ApiRequest) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = TransportResult<ApiResponse>> + Send + 'static,
    {
        Self {
            send: Arc::new(move |request| Box::pin(f(request))),
        }
    }
}

#[async_trait]
impl Transport for FnTransport {
    async fn send(&self, request: &ApiRequest) -> TransportResult<ApiResponse> {
        (self.send)(request.clone()).await
    }
}
