//! Runtime - composition root wiring the bus, plugin manager, and host state

use std::sync::Arc;

use parking_lot::Mutex;
use tessera_bus::EventBus;
use tessera_plugin_api::{AuthCapability, CoreCapability, Plugin};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::adapters::{AuthAdapter, CoreAdapter};
use crate::config::{ConfigLoader, RuntimeConfig};
use crate::error::TesseraError;
use crate::host::{AuthBackend, AuthStore, TenantStore};
use crate::plugins::{ManagerError, PluginManager, PluginStatus};

/// One runtime instance: a bus, a plugin manager, the host stores, and the
/// adapters exposing those stores to plugins.
pub struct Runtime {
    bus: EventBus,
    manager: PluginManager,
    auth: Arc<AuthAdapter>,
    core: Arc<CoreAdapter>,
    shutdown: CancellationToken,
    bridges: Mutex<Vec<JoinHandle<()>>>,
}

impl Runtime {
    pub fn new(config: RuntimeConfig, backend: Arc<dyn AuthBackend>) -> Self {
        let bus = EventBus::new();
        let manager = PluginManager::new(bus.clone(), config);
        let auth_store = AuthStore::new();
        let auth = Arc::new(AuthAdapter::new(auth_store.clone(), backend));
        let core = Arc::new(CoreAdapter::new(TenantStore::new(), auth_store));

        Self {
            bus,
            manager,
            auth,
            core,
            shutdown: CancellationToken::new(),
            bridges: Mutex::new(Vec::new()),
        }
    }

    /// Build a runtime from the layered config files
    pub fn from_config_files(backend: Arc<dyn AuthBackend>) -> Result<Self, TesseraError> {
        let config = ConfigLoader::load()?;
        Ok(Self::new(config, backend))
    }

    pub fn event_bus(&self) -> &EventBus {
        &self.bus
    }

    pub fn manager(&self) -> &PluginManager {
        &self.manager
    }

    pub fn auth_store(&self) -> &AuthStore {
        self.auth.store()
    }

    pub fn tenant_store(&self) -> &TenantStore {
        self.core.tenants()
    }

    /// Register a plugin with the manager
    pub async fn register(&self, plugin: Arc<dyn Plugin>) -> PluginStatus {
        self.manager.register(plugin).await
    }

    /// Start the state bridges and hand the capabilities to the manager,
    /// which initializes every plugin registered so far.
    pub async fn start(&self) -> Result<(), TesseraError> {
        if self.manager.is_ready() {
            return Err(ManagerError::AlreadyInitialized.into());
        }

        {
            let mut bridges = self.bridges.lock();
            bridges.push(
                self.auth
                    .spawn_bridge(self.bus.clone(), self.shutdown.child_token()),
            );
            bridges.push(
                self.core
                    .spawn_bridge(self.bus.clone(), self.shutdown.child_token()),
            );
        }

        let auth: Arc<dyn AuthCapability> = self.auth.clone();
        let core: Arc<dyn CoreCapability> = self.core.clone();
        self.manager.initialize(auth, Some(core)).await?;

        tracing::info!(
            plugins = self.manager.loaded_plugins().len(),
            "Runtime started"
        );
        Ok(())
    }

    /// Stop the bridges, unload every plugin, and drop all bus subscriptions
    pub async fn shutdown(&self) {
        self.shutdown.cancel();
        let bridges = std::mem::take(&mut *self.bridges.lock());
        for bridge in bridges {
            if let Err(e) = bridge.await {
                tracing::warn!(error = %e, "State bridge task failed");
            }
        }

        self.manager.unload_all().await;
        self.bus.clear();
        tracing::info!("Runtime stopped");
    }
}
