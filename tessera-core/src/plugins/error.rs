//! Plugin manager error types

use std::time::Duration;

use tessera_plugin_api::PluginError;
use thiserror::Error;

/// Errors returned to the host by [`PluginManager`](super::PluginManager).
///
/// Plugin failures are not in here: those are reported on the event bus and
/// never cross back to the caller.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ManagerError {
    /// `initialize` was called a second time
    #[error("Plugin manager is already initialized")]
    AlreadyInitialized,

    /// Operation needs capabilities that have not been provided yet
    #[error("Plugin manager has not been initialized")]
    NotReady,

    /// Plugin not found
    #[error("Plugin '{name}' not found")]
    NotFound { name: String },
}

/// Why a plugin's `init` or `destroy` did not complete
#[derive(Error, Debug)]
pub(crate) enum HookFailure {
    #[error(transparent)]
    Error(#[from] PluginError),

    #[error("panicked: {0}")]
    Panicked(String),

    #[error("timed out after {0:?}")]
    TimedOut(Duration),
}
