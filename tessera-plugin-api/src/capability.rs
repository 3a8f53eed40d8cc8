//! Capability interfaces handed to plugins
//!
//! The host implements these over its own state stores. Plugins only ever see
//! the trait objects, never the stores behind them.

use async_trait::async_trait;

use crate::error::PluginError;
use crate::types::{Tenant, User, Workspace};

/// Read access to the host's authentication state plus login/logout requests.
///
/// Reads are synchronous snapshots of the host store.
#[async_trait]
pub trait AuthCapability: Send + Sync {
    /// Currently authenticated user, if any
    fn current_user(&self) -> Option<User>;

    /// True when a user is signed in
    fn is_authenticated(&self) -> bool {
        self.current_user().is_some()
    }

    /// Current access token, if any
    fn token(&self) -> Option<String>;

    /// Ask the host to sign in with credentials
    async fn login(&self, email: &str, password: &str) -> Result<(), PluginError>;

    /// Ask the host to sign out
    async fn logout(&self) -> Result<(), PluginError>;
}

/// Write-only access to the host's tenant/workspace selection.
///
/// Plugins observe the resulting state through `tenant.switched` and
/// `workspace.switched` events.
pub trait CoreCapability: Send + Sync {
    /// Request a tenant change; `None` clears the selection
    fn set_current_tenant(&self, tenant: Option<Tenant>);

    /// Request a workspace change; `None` clears the selection
    fn set_current_workspace(&self, workspace: Option<Workspace>);
}
