//! Host authentication state

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tessera_plugin_api::{PluginError, User};
use tokio::sync::watch;

/// Authentication state held by the host
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthState {
    pub user: Option<User>,
    pub token: Option<String>,
}

impl AuthState {
    pub fn signed_in(user: User, token: impl Into<String>) -> Self {
        Self {
            user: Some(user),
            token: Some(token.into()),
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.user.is_some()
    }
}

/// Successful login returned by an [`AuthBackend`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthSession {
    pub user: User,
    pub token: String,
}

/// The host's authentication service
#[async_trait]
pub trait AuthBackend: Send + Sync {
    async fn login(&self, email: &str, password: &str) -> Result<AuthSession, PluginError>;

    async fn logout(&self) -> Result<(), PluginError> {
        Ok(())
    }
}

/// Reactive auth state. Writers replace the whole state; readers take
/// snapshots or subscribe to changes.
#[derive(Debug, Clone)]
pub struct AuthStore {
    tx: watch::Sender<AuthState>,
}

impl AuthStore {
    pub fn new() -> Self {
        Self::with_state(AuthState::default())
    }

    pub fn with_state(state: AuthState) -> Self {
        let (tx, _rx) = watch::channel(state);
        Self { tx }
    }

    /// Current state
    pub fn snapshot(&self) -> AuthState {
        self.tx.borrow().clone()
    }

    /// Replace the state and notify subscribers
    pub fn set(&self, state: AuthState) {
        self.tx.send_replace(state);
    }

    /// Update the signed-in user's profile; no-op when signed out
    pub fn update_user(&self, user: User) {
        self.tx.send_if_modified(|state| {
            let changed = state.user.as_ref().is_some_and(|current| *current != user);
            if changed {
                state.user = Some(user);
            }
            changed
        });
    }

    pub fn clear(&self) {
        self.set(AuthState::default());
    }

    pub fn subscribe(&self) -> watch::Receiver<AuthState> {
        self.tx.subscribe()
    }
}

impl Default for AuthStore {
    fn default() -> Self {
        Self::new()
    }
}
