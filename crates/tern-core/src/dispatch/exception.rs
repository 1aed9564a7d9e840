//! Recovery handlers keyed by failure category.
//!
//! Handlers registered for a category also intercept failures of every
//! descendant category (see [`Category`]). During [`ExceptionRegistry::resolve`]
//! each matching category is visited in first-registration order and its
//! handlers run in list order until one of them resolves the failure.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use futures::future::BoxFuture;
use parking_lot::RwLock;
use serde_json::Value;
use tracing::{debug, trace};

use crate::foundation::{ApiFailure, Category};

/// What a handler did with a failure.
#[derive(Debug)]
pub enum Recovery {
    /// The handler did not deal with the failure; keep looking.
    Pass(ApiFailure),
    /// The failure is handled; the value replaces the call's payload.
    Resolve(Value),
}

/// A type-erased recovery handler.
///
/// Receives the failure and the static category resolution was asked for.
pub type ExceptionHandler =
    Arc<dyn Fn(ApiFailure, Category) -> BoxFuture<'static, Recovery> + Send + Sync>;

/// Wraps an async closure into an [`ExceptionHandler`].
pub fn exception_handler<F, Fut>(f: F) -> ExceptionHandler
where
    F: Fn(ApiFailure, Category) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Recovery> + Send + 'static,
{
    Arc::new(move |failure, category| Box::pin(f(failure, category)))
}

/// Position of a registered handler, used to remove it again.
///
/// Removing a handler shifts the ones after it; a handle must not be reused
/// once any handler of the same category was removed or prepended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HandlerHandle {
    /// Category the handler was registered under.
    pub category: Category,
    /// Index within that category's list.
    pub index: usize,
}

#[derive(Default)]
struct HandlerTable {
    handlers: HashMap<Category, Vec<ExceptionHandler>>,
    /// Every category ever registered, in first-registration order.
    known: Vec<Category>,
}

/// Registry of recovery handlers.
#[derive(Default)]
pub struct ExceptionRegistry {
    table: RwLock<HandlerTable>,
}

impl ExceptionRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `handler` to the list for `category`.
    pub fn handle(&self, category: Category, handler: ExceptionHandler) -> HandlerHandle {
        self.insert(category, handler, false)
    }

    /// Prepends `handler` to the list for `category`.
    pub fn handle_first(&self, category: Category, handler: ExceptionHandler) -> HandlerHandle {
        self.insert(category, handler, true)
    }

    /// Registers `handler`, at the front of the list when `at_front` is set.
    pub fn insert(
        &self,
        category: Category,
        handler: ExceptionHandler,
        at_front: bool,
    ) -> HandlerHandle {
        let mut table = self.table.write();
        if !table.known.contains(&category) {
            table.known.push(category);
        }
        let list = table.handlers.entry(category).or_default();
        let index = if at_front {
            list.insert(0, handler);
            0
        } else {
            list.push(handler);
            list.len() - 1
        };
        debug!(category = %category, index, at_front, "Exception handler registered");
        HandlerHandle { category, index }
    }

    /// Removes the handler at `handle`.
    ///
    /// Returns `false` if no handler sits at that position.
    pub fn unregister(&self, handle: HandlerHandle) -> bool {
        let mut table = self.table.write();
        match table.handlers.get_mut(&handle.category) {
            Some(list) if handle.index < list.len() => {
                list.remove(handle.index);
                debug!(category = %handle.category, index = handle.index, "Exception handler removed");
                true
            }
            _ => false,
        }
    }

    /// Number of handlers registered directly under `category`.
    pub fn count(&self, category: Category) -> usize {
        self.table
            .read()
            .handlers
            .get(&category)
            .map_or(0, Vec::len)
    }

    /// Every category that has ever had a handler, in registration order.
    pub fn categories(&self) -> Vec<Category> {
        self.table.read().known.clone()
    }

    /// Offers `failure` to the handlers matching its own category.
    ///
    /// # Errors
    ///
    /// Returns the failure when no handler resolved it.
    pub async fn resolve(&self, failure: ApiFailure) -> Result<Value, ApiFailure> {
        let category = failure.category();
        self.resolve_as(failure, category).await
    }

    /// Offers `failure` to every handler whose category is `static_type` or
    /// one of its ancestors.
    ///
    /// # Errors
    ///
    /// Returns the failure when no handler resolved it.
    pub async fn resolve_as(
        &self,
        failure: ApiFailure,
        static_type: Category,
    ) -> Result<Value, ApiFailure> {
        let candidates: Vec<ExceptionHandler> = {
            let table = self.table.read();
            table
                .known
                .iter()
                .filter(|category| static_type.is_a(**category))
                .filter_map(|category| table.handlers.get(category))
                .flat_map(|list| list.iter().cloned())
                .collect()
        };

        trace!(
            category = %static_type,
            handlers = candidates.len(),
            "Resolving failure"
        );

        let mut current = failure;
        for handler in candidates {
            match handler(current, static_type).await {
                Recovery::Pass(failure) => current = failure,
                Recovery::Resolve(value) => {
                    debug!(category = %static_type, "Failure recovered by handler");
                    return Ok(value);
                }
            }
        }
        Err(current)
    }
}
