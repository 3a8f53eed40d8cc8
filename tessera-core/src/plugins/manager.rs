//! PluginManager - plugin registry and lifecycle
//!
//! Plugins registered before the host provides its capabilities wait in a FIFO
//! queue. Once [`PluginManager::initialize`] runs, the queue is drained one
//! plugin at a time; later registrations are initialized before `register`
//! returns. A plugin that fails, panics, or times out is marked failed and
//! reported on `core.plugin.error`. It never takes other plugins down with it.

use std::any::Any;
use std::collections::VecDeque;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use indexmap::IndexMap;
use parking_lot::Mutex;
use serde::Serialize;
use tessera_bus::EventBus;
use tessera_plugin_api::{
    AuthCapability, CoreCapability, ExtensionRegistrar, Plugin, PluginContext, PluginError,
    PluginManifest, RouteRegistration, WidgetRegistration, WidgetSlot,
};

use super::error::{HookFailure, ManagerError};
use super::extensions::ExtensionRegistry;
use crate::config::RuntimeConfig;
use crate::events::RuntimeEvent;

/// Lifecycle state of a registered plugin
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum PluginStatus {
    /// Registered, waiting for capabilities or for its turn in the queue
    Pending,
    /// `init` is in flight
    Initializing,
    /// `init` completed
    Active,
    /// `init` errored, panicked, or timed out. Kept for diagnostics.
    Failed { error: String },
    /// Skipped because configuration lists it as disabled
    Disabled { reason: String },
    /// Descriptor failed validation; the plugin was not stored
    Rejected { reason: String },
}

/// Snapshot of a registered plugin
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PluginInfo {
    pub name: String,
    pub version: String,
    pub description: String,
    pub status: PluginStatus,
}

#[derive(Clone)]
struct Capabilities {
    auth: Arc<dyn AuthCapability>,
    core: Option<Arc<dyn CoreCapability>>,
}

struct PluginEntry {
    plugin: Arc<dyn Plugin>,
    manifest: PluginManifest,
    status: PluginStatus,
}

#[derive(Default)]
struct ManagerState {
    /// In registration order
    plugins: IndexMap<String, PluginEntry>,
    queue: VecDeque<String>,
    capabilities: Option<Capabilities>,
    /// A drain loop is running; new work goes on the queue
    draining: bool,
}

struct ManagerInner {
    bus: EventBus,
    config: RuntimeConfig,
    extensions: Arc<ExtensionRegistry>,
    state: Mutex<ManagerState>,
}

/// Registry of plugins and the extension points they contribute to.
///
/// Cheap to clone; clones share state. The internal lock is never held across
/// an `.await` or while plugin code runs, so plugins may call back into the
/// manager (for example, register another plugin from inside `init`).
#[derive(Clone)]
pub struct PluginManager {
    inner: Arc<ManagerInner>,
}

impl PluginManager {
    pub fn new(bus: EventBus, config: RuntimeConfig) -> Self {
        let extensions = Arc::new(ExtensionRegistry::with_default_priority(
            config.default_widget_priority,
        ));
        Self {
            inner: Arc::new(ManagerInner {
                bus,
                config,
                extensions,
                state: Mutex::new(ManagerState::default()),
            }),
        }
    }

    pub fn event_bus(&self) -> &EventBus {
        &self.inner.bus
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.inner.config
    }

    // ─── Registration ────────────────────────────────────────────────

    /// Register a plugin.
    ///
    /// Before [`initialize`](Self::initialize) the plugin is queued and
    /// `Pending` is returned. Afterwards it is initialized before this returns
    /// and the resulting `Active` or `Failed` status is returned.
    ///
    /// If a drain is already running, the plugin is queued behind it and
    /// `Pending` is returned; the running drain initializes it. This covers a
    /// re-entrant registration from inside an `init` as well as a concurrent
    /// `register` from another task. Callers that need the final status can
    /// poll [`status`](Self::status) or listen for `core.plugin.loaded`.
    ///
    /// Re-registering a name that is pending or active replaces the stored
    /// descriptor without re-running `init`.
    pub async fn register(&self, plugin: Arc<dyn Plugin>) -> PluginStatus {
        let manifest = plugin.manifest();

        if let Err(e) = manifest.validate() {
            let name = if manifest.name.trim().is_empty() {
                "<unnamed>".to_string()
            } else {
                manifest.name.clone()
            };
            tracing::error!(plugin = %name, error = %e, "Plugin registration rejected");
            RuntimeEvent::PluginError {
                name,
                error: e.to_string(),
            }
            .publish(&self.inner.bus);
            return PluginStatus::Rejected {
                reason: e.to_string(),
            };
        }

        let name = manifest.name.clone();

        if self.inner.config.is_disabled(&name) {
            let status = PluginStatus::Disabled {
                reason: "disabled by configuration".to_string(),
            };
            tracing::info!(plugin = %name, "Plugin disabled, skipping");
            self.inner.state.lock().plugins.insert(
                name,
                PluginEntry {
                    plugin,
                    manifest,
                    status: status.clone(),
                },
            );
            return status;
        }

        let should_drain = {
            let mut guard = self.inner.state.lock();
            let state = &mut *guard;

            match state.plugins.get_mut(&name) {
                Some(entry)
                    if matches!(
                        entry.status,
                        PluginStatus::Pending | PluginStatus::Initializing | PluginStatus::Active
                    ) =>
                {
                    tracing::debug!(
                        plugin = %name,
                        version = %manifest.version,
                        "Replaced plugin descriptor"
                    );
                    entry.plugin = plugin;
                    entry.manifest = manifest;
                }
                Some(entry) => {
                    entry.plugin = plugin;
                    entry.manifest = manifest;
                    entry.status = PluginStatus::Pending;
                    state.queue.push_back(name.clone());
                }
                None => {
                    tracing::debug!(plugin = %name, version = %manifest.version, "Plugin registered");
                    state.plugins.insert(
                        name.clone(),
                        PluginEntry {
                            plugin,
                            manifest,
                            status: PluginStatus::Pending,
                        },
                    );
                    state.queue.push_back(name.clone());
                }
            }

            Self::claim_drain(state)
        };

        if should_drain {
            self.drain_pending().await;
        }

        self.status(&name).unwrap_or(PluginStatus::Pending)
    }

    /// Provide the host capabilities and initialize every queued plugin.
    ///
    /// May only be called once. Emits `core.app.initialized` after the queue
    /// has been drained.
    pub async fn initialize(
        &self,
        auth: Arc<dyn AuthCapability>,
        core: Option<Arc<dyn CoreCapability>>,
    ) -> Result<(), ManagerError> {
        let (should_drain, pending) = {
            let mut guard = self.inner.state.lock();
            let state = &mut *guard;
            if state.capabilities.is_some() {
                return Err(ManagerError::AlreadyInitialized);
            }
            state.capabilities = Some(Capabilities { auth, core });
            (Self::claim_drain(state), state.queue.len())
        };

        tracing::info!(pending, "Plugin manager initialized");

        if should_drain {
            self.drain_pending().await;
        }

        RuntimeEvent::app_initialized(self.inner.config.app_version.clone())
            .publish(&self.inner.bus);
        Ok(())
    }

    /// Run `init` again for a registered plugin.
    ///
    /// An active plugin is torn down first (`destroy`, then its widgets are
    /// removed). Pending or initializing plugins are left alone.
    pub async fn reinitialize(&self, name: &str) -> Result<PluginStatus, ManagerError> {
        let teardown = {
            let mut guard = self.inner.state.lock();
            let state = &mut *guard;
            if state.capabilities.is_none() {
                return Err(ManagerError::NotReady);
            }
            let entry = state
                .plugins
                .get_mut(name)
                .ok_or_else(|| ManagerError::NotFound {
                    name: name.to_string(),
                })?;

            match entry.status {
                PluginStatus::Active => {
                    entry.status = PluginStatus::Pending;
                    Some(Arc::clone(&entry.plugin))
                }
                PluginStatus::Failed { .. } => {
                    entry.status = PluginStatus::Pending;
                    None
                }
                _ => return Ok(entry.status.clone()),
            }
        };

        if let Some(plugin) = teardown {
            self.run_destroy(name, plugin).await;
            self.inner.extensions.remove_widgets_with_prefix(name);
        }

        let should_drain = {
            let mut guard = self.inner.state.lock();
            let state = &mut *guard;
            let still_pending = state
                .plugins
                .get(name)
                .is_some_and(|entry| entry.status == PluginStatus::Pending);
            if still_pending {
                state.queue.push_back(name.to_string());
            }
            Self::claim_drain(state)
        };

        tracing::info!(plugin = %name, "Reinitializing plugin");

        if should_drain {
            self.drain_pending().await;
        }

        self.status(name).ok_or_else(|| ManagerError::NotFound {
            name: name.to_string(),
        })
    }

    // ─── Unloading ───────────────────────────────────────────────────

    /// Remove a plugin from the registry.
    ///
    /// Calls `destroy` for active and failed plugins, strips widgets whose id
    /// starts with `name`, and emits `core.plugin.unloaded`. Routes are only
    /// removed when `unload_routes` is configured.
    pub async fn unload_plugin(&self, name: &str) -> Result<(), ManagerError> {
        let entry = {
            let mut guard = self.inner.state.lock();
            let state = &mut *guard;
            let entry = state
                .plugins
                .shift_remove(name)
                .ok_or_else(|| ManagerError::NotFound {
                    name: name.to_string(),
                })?;
            state.queue.retain(|queued| queued != name);
            entry
        };

        if matches!(
            entry.status,
            PluginStatus::Active | PluginStatus::Failed { .. }
        ) {
            self.run_destroy(name, entry.plugin).await;
        }

        let widgets = self.inner.extensions.remove_widgets_with_prefix(name);
        let routes = if self.inner.config.unload_routes {
            self.inner.extensions.remove_routes_owned_by(name)
        } else {
            0
        };

        tracing::info!(plugin = %name, widgets, routes, "Plugin unloaded");
        RuntimeEvent::PluginUnloaded {
            name: name.to_string(),
        }
        .publish(&self.inner.bus);
        Ok(())
    }

    /// Unload every plugin, most recently registered first
    pub async fn unload_all(&self) {
        let names: Vec<String> = self.inner.state.lock().plugins.keys().cloned().collect();
        for name in names.iter().rev() {
            // Already gone if a destroy hook unloaded it
            if let Err(e) = self.unload_plugin(name).await {
                tracing::debug!(plugin = %name, error = %e, "Skipped unload");
            }
        }
    }

    // ─── Queries ─────────────────────────────────────────────────────

    /// Copy of the route map, in registration order
    pub fn registered_routes(&self) -> IndexMap<String, RouteRegistration> {
        self.inner.extensions.routes()
    }

    pub fn sidebar_widgets(&self) -> Vec<WidgetRegistration> {
        self.inner.extensions.widgets(WidgetSlot::Sidebar)
    }

    pub fn header_widgets(&self) -> Vec<WidgetRegistration> {
        self.inner.extensions.widgets(WidgetSlot::Header)
    }

    pub fn dashboard_widgets(&self) -> Vec<WidgetRegistration> {
        self.inner.extensions.widgets(WidgetSlot::Dashboard)
    }

    /// Plugin that last registered `path`
    pub fn route_owner(&self, path: &str) -> Option<String> {
        self.inner.extensions.route_owner(path)
    }

    /// Names of active plugins, in registration order
    pub fn loaded_plugins(&self) -> Vec<String> {
        self.inner
            .state
            .lock()
            .plugins
            .iter()
            .filter(|(_, entry)| entry.status == PluginStatus::Active)
            .map(|(name, _)| name.clone())
            .collect()
    }

    pub fn plugin_info(&self, name: &str) -> Option<PluginInfo> {
        self.inner
            .state
            .lock()
            .plugins
            .get(name)
            .map(Self::info)
    }

    /// Every registered plugin, in registration order
    pub fn list_plugins(&self) -> Vec<PluginInfo> {
        self.inner
            .state
            .lock()
            .plugins
            .values()
            .map(Self::info)
            .collect()
    }

    pub fn status(&self, name: &str) -> Option<PluginStatus> {
        self.inner
            .state
            .lock()
            .plugins
            .get(name)
            .map(|entry| entry.status.clone())
    }

    /// True once `initialize` has been called
    pub fn is_ready(&self) -> bool {
        self.inner.state.lock().capabilities.is_some()
    }

    /// Number of plugins waiting to be initialized
    pub fn pending_count(&self) -> usize {
        self.inner
            .state
            .lock()
            .plugins
            .values()
            .filter(|entry| entry.status == PluginStatus::Pending)
            .count()
    }

    // ─── Internals ───────────────────────────────────────────────────

    fn info(entry: &PluginEntry) -> PluginInfo {
        PluginInfo {
            name: entry.manifest.name.clone(),
            version: entry.manifest.version.clone(),
            description: entry.manifest.description.clone(),
            status: entry.status.clone(),
        }
    }

    /// Mark a drain as running if the manager is ready and none is.
    /// Returns true if the caller must run it.
    fn claim_drain(state: &mut ManagerState) -> bool {
        if state.capabilities.is_none() || state.draining {
            return false;
        }
        state.draining = true;
        true
    }

    /// Initialize queued plugins one at a time until the queue is empty
    async fn drain_pending(&self) {
        let mut claim = DrainClaim {
            manager: self,
            current: None,
            finished: false,
        };

        loop {
            let next = {
                let mut guard = self.inner.state.lock();
                let state = &mut *guard;
                let Some(capabilities) = state.capabilities.clone() else {
                    state.draining = false;
                    claim.finished = true;
                    return;
                };

                let mut next = None;
                while let Some(name) = state.queue.pop_front() {
                    if let Some(entry) = state.plugins.get_mut(&name)
                        && entry.status == PluginStatus::Pending
                    {
                        entry.status = PluginStatus::Initializing;
                        next = Some((
                            name,
                            Arc::clone(&entry.plugin),
                            entry.manifest.version.clone(),
                            capabilities,
                        ));
                        break;
                    }
                }

                match next {
                    Some(next) => next,
                    None => {
                        state.draining = false;
                        claim.finished = true;
                        return;
                    }
                }
            };

            let (name, plugin, version, capabilities) = next;
            claim.current = Some(name.clone());
            self.initialize_plugin(&name, &version, plugin, capabilities)
                .await;
            claim.current = None;
        }
    }

    async fn initialize_plugin(
        &self,
        name: &str,
        version: &str,
        plugin: Arc<dyn Plugin>,
        capabilities: Capabilities,
    ) {
        let registrar: Arc<dyn ExtensionRegistrar> = self.inner.extensions.clone();
        let ctx = PluginContext::new(
            name,
            capabilities.auth,
            capabilities.core,
            self.inner.bus.clone(),
            registrar,
        );

        let outcome = run_guarded(plugin.init(ctx), self.inner.config.init_timeout()).await;

        let status = match &outcome {
            Ok(()) => PluginStatus::Active,
            Err(failure) => PluginStatus::Failed {
                error: failure.to_string(),
            },
        };

        let recorded = {
            let mut state = self.inner.state.lock();
            match state.plugins.get_mut(name) {
                Some(entry) if entry.status == PluginStatus::Initializing => {
                    entry.status = status;
                    true
                }
                _ => false,
            }
        };

        if !recorded {
            // Unload already ran; drop anything init registered after it.
            let widgets = self.inner.extensions.remove_widgets_with_prefix(name);
            if self.inner.config.unload_routes {
                self.inner.extensions.remove_routes_owned_by(name);
            }
            tracing::debug!(plugin = %name, widgets, "Plugin removed while initializing");
            return;
        }

        match outcome {
            Ok(()) => {
                tracing::info!(plugin = %name, version = %version, "Plugin loaded");
                RuntimeEvent::PluginLoaded {
                    name: name.to_string(),
                    version: version.to_string(),
                }
                .publish(&self.inner.bus);
            }
            Err(failure) => self.report_failure(name, "init", &failure),
        }
    }

    async fn run_destroy(&self, name: &str, plugin: Arc<dyn Plugin>) {
        if let Err(failure) = run_guarded(plugin.destroy(), self.inner.config.init_timeout()).await
        {
            self.report_failure(name, "destroy", &failure);
        }
    }

    fn report_failure(&self, name: &str, stage: &str, failure: &HookFailure) {
        tracing::error!(plugin = %name, stage, error = %failure, "Plugin failed");
        RuntimeEvent::PluginError {
            name: name.to_string(),
            error: failure.to_string(),
        }
        .publish(&self.inner.bus);
    }
}

impl std::fmt::Debug for PluginManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.inner.state.lock();
        f.debug_struct("PluginManager")
            .field("plugins", &state.plugins.keys().collect::<Vec<_>>())
            .field("ready", &state.capabilities.is_some())
            .field("queued", &state.queue.len())
            .finish_non_exhaustive()
    }
}

/// Releases a claimed drain when the draining future is dropped early.
///
/// A plugin caught mid-init is marked failed so the queue can move past it.
struct DrainClaim<'a> {
    manager: &'a PluginManager,
    current: Option<String>,
    finished: bool,
}

impl Drop for DrainClaim<'_> {
    fn drop(&mut self) {
        if self.finished {
            return;
        }

        let inner = &self.manager.inner;
        let cancelled = {
            let mut state = inner.state.lock();
            state.draining = false;
            match self.current.as_deref().and_then(|name| state.plugins.get_mut(name)) {
                Some(entry) if entry.status == PluginStatus::Initializing => {
                    entry.status = PluginStatus::Failed {
                        error: CANCELLED_INIT.to_string(),
                    };
                    true
                }
                _ => false,
            }
        };

        if cancelled && let Some(name) = self.current.take() {
            tracing::warn!(plugin = %name, "Plugin initialization cancelled");
            RuntimeEvent::PluginError {
                name,
                error: CANCELLED_INIT.to_string(),
            }
            .publish(&inner.bus);
        }
    }
}

const CANCELLED_INIT: &str = "initialization cancelled";

/// Await a plugin hook, turning errors, panics, and timeouts into a failure
async fn run_guarded<F>(hook: F, timeout: Option<Duration>) -> Result<(), HookFailure>
where
    F: Future<Output = Result<(), PluginError>>,
{
    let guarded = AssertUnwindSafe(hook).catch_unwind();
    let result = match timeout {
        Some(limit) => match tokio::time::timeout(limit, guarded).await {
            Ok(result) => result,
            Err(_) => return Err(HookFailure::TimedOut(limit)),
        },
        None => guarded.await,
    };

    match result {
        Ok(Ok(())) => Ok(()),
        Ok(Err(e)) => Err(HookFailure::Error(e)),
        Err(panic) => Err(HookFailure::Panicked(panic_message(panic.as_ref()))),
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
