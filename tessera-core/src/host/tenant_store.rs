//! Host tenant/workspace selection

use serde::{Deserialize, Serialize};
use tessera_plugin_api::{Tenant, Workspace};
use tokio::sync::watch;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TenantState {
    pub tenant: Option<Tenant>,
    pub workspace: Option<Workspace>,
}

/// Reactive tenant/workspace selection
#[derive(Debug, Clone)]
pub struct TenantStore {
    tx: watch::Sender<TenantState>,
}

impl TenantStore {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(TenantState::default());
        Self { tx }
    }

    pub fn snapshot(&self) -> TenantState {
        self.tx.borrow().clone()
    }

    /// Select a tenant. Switching tenants clears a workspace that belongs to
    /// a different tenant.
    pub fn set_tenant(&self, tenant: Option<Tenant>) {
        self.tx.send_if_modified(|state| {
            if state.tenant == tenant {
                return false;
            }
            let tenant_id = tenant.as_ref().map(|t| t.id.as_str());
            if let Some(workspace) = &state.workspace
                && workspace.tenant_id.is_some()
                && workspace.tenant_id.as_deref() != tenant_id
            {
                state.workspace = None;
            }
            state.tenant = tenant;
            true
        });
    }

    pub fn set_workspace(&self, workspace: Option<Workspace>) {
        self.tx.send_if_modified(|state| {
            if state.workspace == workspace {
                return false;
            }
            state.workspace = workspace;
            true
        });
    }

    pub fn subscribe(&self) -> watch::Receiver<TenantState> {
        self.tx.subscribe()
    }
}

impl Default for TenantStore {
    fn default() -> Self {
        Self::new()
    }
}
