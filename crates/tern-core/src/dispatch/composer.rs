//! Named middleware pipelines.
//!
//! A [`ComposerStack`] maps composer identifiers to ordered middleware chains.
//! Each middleware receives the context and a [`Next`] continuation:
//!
//! ```rust,ignore
//! stack.append("api.request", middleware(|mut ctx: CallContext, next| async move {
//!     ctx.state.insert("started".into(), true.into());
//!     next.run(ctx).await
//! }));
//! ```
//!
//! Dropping `next` without running it short-circuits the chain; the value the
//! middleware returns becomes the result of [`ComposerStack::run`].

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use futures::future::BoxFuture;
use parking_lot::RwLock;
use tracing::trace;

use crate::foundation::ComposerError;

/// A type-erased middleware for contexts of type `C`.
pub type Middleware<C> = Arc<dyn Fn(C, Next<C>) -> BoxFuture<'static, C> + Send + Sync>;

type Chain<C> = Arc<Vec<Middleware<C>>>;

/// Wraps an async closure into a [`Middleware`].
pub fn middleware<C, F, Fut>(f: F) -> Middleware<C>
where
    F: Fn(C, Next<C>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = C> + Send + 'static,
{
    Arc::new(move |ctx, next| Box::pin(f(ctx, next)))
}

// =============================================================================
// Next
// =============================================================================

/// Continuation handed to each middleware.
pub struct Next<C> {
    chain: Chain<C>,
    index: usize,
}

impl<C: Send + 'static> Next<C> {
    /// Runs the rest of the chain.
    ///
    /// Returns the context unchanged once the end of the chain is reached.
    pub async fn run(self, ctx: C) -> C {
        let Some(current) = self.chain.get(self.index).cloned() else {
            return ctx;
        };
        let next = Next {
            chain: Arc::clone(&self.chain),
            index: self.index + 1,
        };
        current(ctx, next).await
    }

    /// Number of middleware still to run after this point.
    pub fn remaining(&self) -> usize {
        self.chain.len().saturating_sub(self.index)
    }
}

impl<C> fmt::Debug for Next<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Next")
            .field("index", &self.index)
            .field("len", &self.chain.len())
            .finish()
    }
}

// =============================================================================
// ComposerStack
// =============================================================================

/// Owner of every named middleware pipeline.
///
/// Appends are serialised behind a write lock. [`run`](Self::run) only takes
/// the read lock long enough to snapshot the chain, so a long-running
/// pipeline never blocks other calls, and middleware appended mid-run is
/// picked up by the next run.
pub struct ComposerStack<C> {
    composers: RwLock<HashMap<String, Chain<C>>>,
}

impl<C> Default for ComposerStack<C> {
    fn default() -> Self {
        Self {
            composers: RwLock::new(HashMap::new()),
        }
    }
}

impl<C: Send + 'static> ComposerStack<C> {
    /// Creates an empty stack.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty pipeline for `id` if none exists.
    ///
    /// Returns `true` when a pipeline was created.
    pub fn ensure(&self, id: &str) -> bool {
        let mut composers = self.composers.write();
        if composers.contains_key(id) {
            return false;
        }
        composers.insert(id.to_string(), Arc::new(Vec::new()));
        trace!(composer = %id, "Composer created");
        true
    }

    /// Appends `middleware` to the pipeline for `id`, creating it if needed.
    pub fn append(&self, id: &str, middleware: Middleware<C>) {
        let mut composers = self.composers.write();
        let chain = composers.entry(id.to_string()).or_default();
        Arc::make_mut(chain).push(middleware);
        trace!(composer = %id, len = chain.len(), "Middleware appended");
    }

    /// Runs the pipeline for `id` against `ctx`.
    ///
    /// # Errors
    ///
    /// Returns [`ComposerError::Unknown`] if no pipeline was ever created
    /// for `id`.
    pub async fn run(&self, id: &str, ctx: C) -> Result<C, ComposerError> {
        let chain = self
            .composers
            .read()
            .get(id)
            .cloned()
            .ok_or_else(|| ComposerError::Unknown(id.to_string()))?;
        trace!(composer = %id, len = chain.len(), "Running composer");
        Ok(Next { chain, index: 0 }.run(ctx).await)
    }

    /// Returns `true` if a pipeline exists for `id`.
    pub fn contains(&self, id: &str) -> bool {
        self.composers.read().contains_key(id)
    }

    /// Returns the number of middleware in the pipeline for `id`.
    pub fn len(&self, id: &str) -> Option<usize> {
        self.composers.read().get(id).map(|chain| chain.len())
    }

    /// Returns the identifiers of every pipeline, sorted.
    pub fn ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.composers.read().keys().cloned().collect();
        ids.sort();
        ids
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};

    fn tag(name: &'static str) -> Middleware<Vec<&'static str>> {
        middleware(move |mut ctx: Vec<&'static str>, next| async move {
            ctx.push(name);
            next.run(ctx).await
        })
    }

    #[tokio::test]
    async fn test_run_in_append_order() {
        let stack = ComposerStack::new();
        stack.append("events", tag("a"));
        stack.append("events", tag("b"));
        stack.append("events", tag("c"));

        let out = stack.run("events", Vec::new()).await.unwrap();
        assert_eq!(out, vec!["a", "b", "c"]);
    }

    #[tokio::test]
    async fn test_short_circuit_skips_rest() {
        let stack = ComposerStack::new();
        let c_ran = Arc::new(AtomicBool::new(false));

        stack.append("events", tag("a"));
        stack.append(
            "events",
            middleware(|_ctx: Vec<&'static str>, _next| async move { vec!["b-result"] }),
        );
        let flag = Arc::clone(&c_ran);
        stack.append(
            "events",
            middleware(move |ctx: Vec<&'static str>, next| {
                let flag = Arc::clone(&flag);
                async move {
                    flag.store(true, Ordering::SeqCst);
                    next.run(ctx).await
                }
            }),
        );

        let out = stack.run("events", Vec::new()).await.unwrap();
        assert_eq!(out, vec!["b-result"]);
        assert!(!c_ran.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_unknown_composer() {
        let stack: ComposerStack<Vec<&'static str>> = ComposerStack::new();
        let err = stack.run("missing", Vec::new()).await.unwrap_err();
        assert_eq!(err, ComposerError::Unknown("missing".into()));
    }

    #[tokio::test]
    async fn test_empty_composer_returns_context() {
        let stack = ComposerStack::new();
        assert!(stack.ensure("events"));
        let out = stack.run("events", vec!["ctx"]).await.unwrap();
        assert_eq!(out, vec!["ctx"]);
    }

    #[tokio::test]
    async fn test_ensure_is_idempotent() {
        let stack = ComposerStack::new();
        assert!(stack.ensure("events"));
        stack.append("events", tag("a"));
        assert!(!stack.ensure("events"));
        stack.append("events", tag("b"));
        stack.append("events", tag("c"));

        assert_eq!(stack.ids(), vec!["events".to_string()]);
        assert_eq!(stack.len("events"), Some(3));
        let out = stack.run("events", Vec::new()).await.unwrap();
        assert_eq!(out, vec!["a", "b", "c"]);
    }

    #[tokio::test]
    async fn test_append_after_run_is_visible_to_next_run() {
        let stack = ComposerStack::new();
        stack.append("events", tag("a"));
        assert_eq!(stack.run("events", Vec::new()).await.unwrap(), vec!["a"]);
        stack.append("events", tag("b"));
        assert_eq!(
            stack.run("events", Vec::new()).await.unwrap(),
            vec!["a", "b"]
        );
    }
}
