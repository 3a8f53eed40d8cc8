//! Host state stores backing the plugin capabilities

mod auth_store;
mod tenant_store;

pub use auth_store::{AuthBackend, AuthSession, AuthState, AuthStore};
pub use tenant_store::{TenantState, TenantStore};
