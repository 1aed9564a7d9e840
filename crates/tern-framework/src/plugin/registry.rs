//! Two-phase plugin installation.
//!
//! [`PluginRegistry`] accepts [`PluginDescriptor`]s and installs them in two
//! phases:
//!
//! - **Queue** ([`register`](PluginRegistry::register) with `deferred`): the
//!   descriptor is validated and placed into the queue. Nothing runs yet.
//! - **Commit** ([`commit`](PluginRegistry::commit)): the queue is ordered as
//!   a dependency graph, every enable routine is dispatched concurrently, and
//!   the commit completes once all of them (plus any earlier immediate
//!   installs) have settled.
//!
//! The state machine of a single plugin is:
//!
//! ```text
//! register(deferred)  ──► Queued
//!     commit()        ──► Enabling ──► Enabled
//!                                  ──► Failed   (enable routine errored)
//! register(immediate) ──► Enabling ──► ...
//! ```
//!
//! A plugin is never demoted: once committed its name stays installed, even
//! if the commit as a whole failed.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::Arc;

use futures::FutureExt;
use futures::future::{self, BoxFuture};
use parking_lot::{Mutex, RwLock};
use serde_json::{Map, Value};
use tokio::runtime::Handle;
use tracing::{Instrument, debug, error, info, info_span};

use super::context::{PluginContext, merge_options};
use super::descriptor::{PluginDescriptor, RESERVED_PLUGIN_NAMES};
use crate::client::Client;
use crate::error::{PluginError, PluginResult, RegistrationError, RegistrationResult};

/// Load state of a plugin known to the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PluginState {
    /// Waiting for [`PluginRegistry::commit`].
    Queued,
    /// Enable routine dispatched, not yet settled.
    Enabling,
    /// Enable routine succeeded.
    Enabled,
    /// Enable routine failed. The name stays installed.
    Failed,
}

// =============================================================================
// Dependency ordering
// =============================================================================

/// Orders the queue with Kahn's algorithm.
///
/// Edges:
/// - a queued requirement loads before the plugin requiring it;
/// - a plugin with `setup_after` loads before its queued target.
///
/// Among plugins that are ready at the same time, the one earlier in the
/// queue goes first, so a queue that already satisfies every edge comes back
/// unchanged.
///
/// # Errors
///
/// Returns [`RegistrationError::DependencyCycle`] naming every plugin left
/// unordered.
fn dependency_order(queue: &[QueueEntry]) -> RegistrationResult<Vec<usize>> {
    let n = queue.len();
    let position: HashMap<&str, usize> = queue
        .iter()
        .enumerate()
        .map(|(i, entry)| (entry.descriptor.name(), i))
        .collect();

    let mut in_degree = vec![0usize; n];
    let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); n];
    let mut add_edge = |from: usize, to: usize| {
        if from != to {
            dependents[from].push(to);
            in_degree[to] += 1;
        }
    };

    for (i, entry) in queue.iter().enumerate() {
        for requirement in entry.descriptor.requirements() {
            // Requirements outside the queue are already installed.
            if let Some(&j) = position.get(requirement.as_str()) {
                add_edge(j, i);
            }
        }
        if let Some(&j) = entry
            .descriptor
            .setup_after_target()
            .and_then(|target| position.get(target))
        {
            add_edge(i, j);
        }
    }

    let mut ready: BTreeSet<usize> = (0..n).filter(|&i| in_degree[i] == 0).collect();
    let mut order = Vec::with_capacity(n);
    while let Some(i) = ready.pop_first() {
        order.push(i);
        for &j in &dependents[i] {
            in_degree[j] -= 1;
            if in_degree[j] == 0 {
                ready.insert(j);
            }
        }
    }

    if order.len() != n {
        let cycle = (0..n)
            .filter(|&i| in_degree[i] > 0)
            .map(|i| queue[i].descriptor.name().to_string())
            .collect();
        return Err(RegistrationError::DependencyCycle(cycle));
    }
    Ok(order)
}

// =============================================================================
// PluginRegistry
// =============================================================================

struct QueueEntry {
    descriptor: Arc<PluginDescriptor>,
    /// Options supplied at registration time.
    options: Value,
}

type EnableTask = BoxFuture<'static, PluginResult<()>>;

#[derive(Default)]
struct RegistryState {
    queue: Vec<QueueEntry>,
    installed: HashSet<String>,
    /// In-flight enable routines not yet awaited by a commit.
    pending: Vec<EnableTask>,
}

/// Registry of queued and installed plugins.
///
/// Mutations are serialised behind a mutex that is never held across an
/// `.await`. Enable routines run on their own Tokio tasks when a runtime is
/// current; otherwise they are polled by the next commit.
#[derive(Default)]
pub struct PluginRegistry {
    state: Mutex<RegistryState>,
    states: Arc<RwLock<HashMap<String, PluginState>>>,
}

impl PluginRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `descriptor` with `client` as the host facade.
    ///
    /// With `deferred` the descriptor is queued (respecting `setup_after`)
    /// and enabled on the next [`commit`](Self::commit). Otherwise it is
    /// installed right away: its enable routine is invoked now, spawned on
    /// the current Tokio runtime if there is one, and awaited by the next
    /// commit.
    ///
    /// # Errors
    ///
    /// - [`RegistrationError::EmptyName`], [`RegistrationError::ReservedName`]
    ///   or [`RegistrationError::DuplicateName`] for an unusable name.
    /// - [`RegistrationError::MissingDependency`] when a requirement is
    ///   neither installed nor queued.
    ///
    /// The registry is unchanged when an error is returned.
    pub fn register(
        &self,
        client: &Client,
        descriptor: PluginDescriptor,
        options: Value,
        deferred: bool,
    ) -> RegistrationResult<()> {
        let mut state = self.state.lock();
        let name = descriptor.name().to_string();

        if name.is_empty() {
            return Err(RegistrationError::EmptyName);
        }
        if RESERVED_PLUGIN_NAMES.contains(&name.as_str()) {
            return Err(RegistrationError::ReservedName(name));
        }
        if state.installed.contains(&name) || state.is_queued(&name) {
            return Err(RegistrationError::DuplicateName(name));
        }
        if let Some(dependency) = descriptor
            .requirements()
            .iter()
            .find(|dep| !state.installed.contains(*dep) && !state.is_queued(dep))
        {
            return Err(RegistrationError::MissingDependency {
                plugin: name,
                dependency: dependency.clone(),
            });
        }

        let descriptor = Arc::new(descriptor);

        if deferred {
            let position = descriptor
                .setup_after_target()
                .and_then(|target| state.position(target))
                .unwrap_or(state.queue.len());
            state.queue.insert(
                position,
                QueueEntry {
                    descriptor,
                    options,
                },
            );
            self.states.write().insert(name.clone(), PluginState::Queued);
            debug!(plugin = %name, position, "Plugin queued");
        } else {
            let merged = merge_options(descriptor.default_options(), [&options]);
            state.installed.insert(name.clone());
            let task = self.dispatch_enable(client, &descriptor, merged);
            state.pending.push(task);
            debug!(plugin = %name, "Plugin installed immediately");
        }
        Ok(())
    }

    /// Enables every queued plugin and waits for all in-flight enables.
    ///
    /// Options for each plugin are the descriptor defaults, overlaid with the
    /// options given at registration, overlaid with `overrides[name]`.
    ///
    /// # Errors
    ///
    /// - [`RegistrationError::DependencyCycle`] (wrapped) if the queue
    ///   cannot be ordered; nothing is enabled and the queue is kept.
    /// - The first [`PluginError::EnableFailed`] or [`PluginError::Join`]
    ///   among the awaited routines. Plugins dispatched by this commit stay
    ///   installed.
    pub async fn commit(
        &self,
        client: &Client,
        overrides: &HashMap<String, Value>,
    ) -> PluginResult<()> {
        let pending = {
            let mut state = self.state.lock();
            let order = dependency_order(&state.queue)?;

            let mut slots: Vec<Option<QueueEntry>> =
                std::mem::take(&mut state.queue).into_iter().map(Some).collect();
            for i in order {
                let Some(entry) = slots[i].take() else {
                    continue;
                };
                let name = entry.descriptor.name().to_string();
                let merged = merge_options(
                    entry.descriptor.default_options(),
                    [&entry.options, overrides.get(&name).unwrap_or(&Value::Null)],
                );
                state.installed.insert(name);
                let task = self.dispatch_enable(client, &entry.descriptor, merged);
                state.pending.push(task);
            }
            std::mem::take(&mut state.pending)
        };

        info!(count = pending.len(), "Committing plugins");

        future::try_join_all(pending).await?;

        Ok(())
    }

    /// Names of queued plugins, in queue order.
    pub fn queued(&self) -> Vec<String> {
        self.state
            .lock()
            .queue
            .iter()
            .map(|entry| entry.descriptor.name().to_string())
            .collect()
    }

    /// Returns `true` once `name` has been installed (committed or immediate).
    pub fn is_installed(&self, name: &str) -> bool {
        self.state.lock().installed.contains(name)
    }

    /// Returns the load state of `name`, or `None` if unknown.
    pub fn state(&self, name: &str) -> Option<PluginState> {
        self.states.read().get(name).copied()
    }

    fn dispatch_enable(
        &self,
        client: &Client,
        descriptor: &PluginDescriptor,
        options: Map<String, Value>,
    ) -> EnableTask {
        let name = descriptor.name().to_string();
        let version = descriptor.plugin_version();
        let states = Arc::clone(&self.states);
        let ctx = PluginContext::new(client.clone(), name.clone(), options);
        let host = client.clone();

        states.write().insert(name.clone(), PluginState::Enabling);
        let span = info_span!("plugin_enable", plugin = %name, version = %version);
        let routine = (descriptor.enable_fn())(ctx);

        let plugin = name.clone();
        let task = async move {
            match routine.await {
                Ok(capability) => {
                    if let Some(capability) = capability {
                        host.install_capability(&name, capability);
                    }
                    states.write().insert(name, PluginState::Enabled);
                    info!("Plugin enabled");
                    Ok(())
                }
                Err(source) => {
                    states.write().insert(name.clone(), PluginState::Failed);
                    error!(error = %source, "Plugin failed to enable");
                    Err(PluginError::EnableFailed {
                        plugin: name,
                        source,
                    })
                }
            }
        }
        .instrument(span);

        match Handle::try_current() {
            Ok(runtime) => {
                let handle = runtime.spawn(task);
                async move {
                    handle.await.unwrap_or_else(|join| {
                        Err(PluginError::Join {
                            plugin,
                            reason: join.to_string(),
                        })
                    })
                }
                .boxed()
            }
            Err(_) => {
                debug!(plugin = %plugin, "No runtime, enable routine deferred to commit");
                task.boxed()
            }
        }
    }
}

impl RegistryState {
    fn position(&self, name: &str) -> Option<usize> {
        self.queue
            .iter()
            .position(|entry| entry.descriptor.name() == name)
    }

    fn is_queued(&self, name: &str) -> bool {
        self.position(name).is_some()
    }
}
