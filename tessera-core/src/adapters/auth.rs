//! AuthCapability over the host AuthStore

use std::sync::Arc;

use async_trait::async_trait;
use tessera_bus::EventBus;
use tessera_plugin_api::{AuthCapability, PluginError, User};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::events::RuntimeEvent;
use crate::host::{AuthBackend, AuthState, AuthStore};

/// Exposes the host auth store to plugins. Reads are snapshots of the store;
/// login and logout go through the backend and write back to the store.
#[derive(Clone)]
pub struct AuthAdapter {
    store: AuthStore,
    backend: Arc<dyn AuthBackend>,
}

impl AuthAdapter {
    pub fn new(store: AuthStore, backend: Arc<dyn AuthBackend>) -> Self {
        Self { store, backend }
    }

    pub fn store(&self) -> &AuthStore {
        &self.store
    }

    /// Publish auth transitions on `bus` until `shutdown` is cancelled.
    ///
    /// Only changes made after this call are published.
    pub fn spawn_bridge(&self, bus: EventBus, shutdown: CancellationToken) -> JoinHandle<()> {
        let mut rx = self.store.subscribe();
        let mut previous = rx.borrow_and_update().clone();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = shutdown.cancelled() => break,
                    changed = rx.changed() => {
                        if changed.is_err() {
                            break;
                        }
                        let next = rx.borrow_and_update().clone();
                        if let Some(event) = auth_transition(&previous, &next) {
                            event.publish(&bus);
                        }
                        previous = next;
                    }
                }
            }
            tracing::debug!("Auth bridge stopped");
        })
    }
}

/// Event for a change between two observed auth states
fn auth_transition(previous: &AuthState, next: &AuthState) -> Option<RuntimeEvent> {
    match (&previous.user, &next.user) {
        (None, Some(user)) => Some(RuntimeEvent::UserLoggedIn { user: user.clone() }),
        (Some(_), None) => Some(RuntimeEvent::UserLoggedOut),
        (Some(before), Some(after)) if before.id != after.id => {
            Some(RuntimeEvent::UserLoggedIn {
                user: after.clone(),
            })
        }
        (Some(before), Some(after)) if before != after => Some(RuntimeEvent::UserUpdated {
            user: after.clone(),
        }),
        _ => None,
    }
}

#[async_trait]
impl AuthCapability for AuthAdapter {
    fn current_user(&self) -> Option<User> {
        self.store.snapshot().user
    }

    fn token(&self) -> Option<String> {
        self.store.snapshot().token
    }

    async fn login(&self, email: &str, password: &str) -> Result<(), PluginError> {
        let session = self.backend.login(email, password).await?;
        tracing::info!(user = %session.user.id, "User logged in");
        self.store
            .set(AuthState::signed_in(session.user, session.token));
        Ok(())
    }

    async fn logout(&self) -> Result<(), PluginError> {
        let result = self.backend.logout().await;
        if let Err(e) = &result {
            tracing::warn!(error = %e, "Auth backend logout failed, clearing local session");
        }
        self.store.clear();
        result
    }
}
