//! CoreCapability over the host TenantStore

use tessera_bus::EventBus;
use tessera_plugin_api::{CoreCapability, Tenant, Workspace};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::events::RuntimeEvent;
use crate::host::{AuthStore, TenantState, TenantStore};

/// Lets plugins request tenant and workspace changes. The resulting state is
/// only observable through `tenant.switched` and `workspace.switched`.
#[derive(Debug, Clone)]
pub struct CoreAdapter {
    tenants: TenantStore,
    auth: AuthStore,
}

impl CoreAdapter {
    pub fn new(tenants: TenantStore, auth: AuthStore) -> Self {
        Self { tenants, auth }
    }

    pub fn tenants(&self) -> &TenantStore {
        &self.tenants
    }

    /// Publish tenant and workspace switches on `bus` until `shutdown` is
    /// cancelled. `tenant.switched` carries the id of the user signed in at
    /// the time of the switch.
    pub fn spawn_bridge(&self, bus: EventBus, shutdown: CancellationToken) -> JoinHandle<()> {
        let mut rx = self.tenants.subscribe();
        let mut previous = rx.borrow_and_update().clone();
        let auth = self.auth.clone();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = shutdown.cancelled() => break,
                    changed = rx.changed() => {
                        if changed.is_err() {
                            break;
                        }
                        let next = rx.borrow_and_update().clone();
                        let user_id = auth.snapshot().user.map(|u| u.id);
                        for event in tenant_transitions(&previous, &next, user_id) {
                            event.publish(&bus);
                        }
                        previous = next;
                    }
                }
            }
            tracing::debug!("Tenant bridge stopped");
        })
    }
}

/// Events for a change between two observed selections, tenant first
fn tenant_transitions(
    previous: &TenantState,
    next: &TenantState,
    user_id: Option<String>,
) -> Vec<RuntimeEvent> {
    let mut events = Vec::new();
    if previous.tenant != next.tenant {
        events.push(RuntimeEvent::TenantSwitched {
            tenant_id: next.tenant.as_ref().map(|t| t.id.clone()),
            user_id,
        });
    }
    if previous.workspace != next.workspace {
        events.push(RuntimeEvent::WorkspaceSwitched {
            workspace_id: next.workspace.as_ref().map(|w| w.id.clone()),
            workspace: next.workspace.clone(),
        });
    }
    events
}

impl CoreCapability for CoreAdapter {
    fn set_current_tenant(&self, tenant: Option<Tenant>) {
        tracing::debug!(tenant = ?tenant.as_ref().map(|t| &t.id), "Tenant change requested");
        self.tenants.set_tenant(tenant);
    }

    fn set_current_workspace(&self, workspace: Option<Workspace>) {
        tracing::debug!(workspace = ?workspace.as_ref().map(|w| &w.id), "Workspace change requested");
        self.tenants.set_workspace(workspace);
    }
}
