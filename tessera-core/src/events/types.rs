//! Runtime event vocabulary

use chrono::Utc;
use serde_json::{Value, json};
use tessera_bus::EventBus;
use tessera_plugin_api::{User, Workspace};

/// Topic names published by the runtime
pub mod topics {
    pub const APP_INITIALIZED: &str = "core.app.initialized";
    pub const PLUGIN_LOADED: &str = "core.plugin.loaded";
    pub const PLUGIN_ERROR: &str = "core.plugin.error";
    pub const PLUGIN_UNLOADED: &str = "core.plugin.unloaded";
    pub const USER_LOGGED_IN: &str = "core.user.logged_in";
    pub const USER_LOGGED_OUT: &str = "core.user.logged_out";
    pub const USER_UPDATED: &str = "core.user.updated";
    pub const TENANT_SWITCHED: &str = "tenant.switched";
    pub const WORKSPACE_SWITCHED: &str = "workspace.switched";
    pub const EVENTBUS_ERROR: &str = tessera_bus::ERROR_TOPIC;
}

/// Events the runtime itself publishes on the bus
#[derive(Debug, Clone, PartialEq)]
pub enum RuntimeEvent {
    /// Manager received its capabilities and drained the pending queue
    AppInitialized { timestamp: i64, version: String },

    /// A plugin's `init` completed
    PluginLoaded { name: String, version: String },

    /// A plugin failed to register, initialize, or tear down
    PluginError { name: String, error: String },

    /// A plugin was removed from the registry
    PluginUnloaded { name: String },

    UserLoggedIn { user: User },

    UserLoggedOut,

    /// Same user, changed profile fields
    UserUpdated { user: User },

    TenantSwitched {
        tenant_id: Option<String>,
        user_id: Option<String>,
    },

    WorkspaceSwitched {
        workspace_id: Option<String>,
        workspace: Option<Workspace>,
    },
}

impl RuntimeEvent {
    /// `AppInitialized` stamped with the current time in milliseconds
    pub fn app_initialized(version: impl Into<String>) -> Self {
        Self::AppInitialized {
            timestamp: Utc::now().timestamp_millis(),
            version: version.into(),
        }
    }

    pub fn topic(&self) -> &'static str {
        match self {
            Self::AppInitialized { .. } => topics::APP_INITIALIZED,
            Self::PluginLoaded { .. } => topics::PLUGIN_LOADED,
            Self::PluginError { .. } => topics::PLUGIN_ERROR,
            Self::PluginUnloaded { .. } => topics::PLUGIN_UNLOADED,
            Self::UserLoggedIn { .. } => topics::USER_LOGGED_IN,
            Self::UserLoggedOut => topics::USER_LOGGED_OUT,
            Self::UserUpdated { .. } => topics::USER_UPDATED,
            Self::TenantSwitched { .. } => topics::TENANT_SWITCHED,
            Self::WorkspaceSwitched { .. } => topics::WORKSPACE_SWITCHED,
        }
    }

    /// Wire payload for the bus (camelCase keys)
    pub fn payload(&self) -> Value {
        match self {
            Self::AppInitialized { timestamp, version } => {
                json!({ "timestamp": timestamp, "version": version })
            }
            Self::PluginLoaded { name, version } => json!({ "name": name, "version": version }),
            Self::PluginError { name, error } => json!({ "name": name, "error": error }),
            Self::PluginUnloaded { name } => json!({ "name": name }),
            Self::UserLoggedIn { user } | Self::UserUpdated { user } => json!({ "user": user }),
            Self::UserLoggedOut => json!({}),
            Self::TenantSwitched { tenant_id, user_id } => {
                json!({ "tenantId": tenant_id, "userId": user_id })
            }
            Self::WorkspaceSwitched {
                workspace_id,
                workspace,
            } => json!({ "workspaceId": workspace_id, "workspace": workspace }),
        }
    }

    /// Emit this event on `bus`
    pub fn publish(&self, bus: &EventBus) {
        bus.emit(self.topic(), self.payload());
    }

    /// Rebuild an event from a topic and payload received on the bus
    pub fn parse(topic: &str, payload: &Value) -> Option<Self> {
        let str_field = |key: &str| payload.get(key)?.as_str().map(str::to_string);
        let opt_str_field = |key: &str| payload.get(key).and_then(Value::as_str).map(str::to_string);
        let user_field = || serde_json::from_value::<User>(payload.get("user")?.clone()).ok();

        let event = match topic {
            topics::APP_INITIALIZED => Self::AppInitialized {
                timestamp: payload.get("timestamp")?.as_i64()?,
                version: str_field("version")?,
            },
            topics::PLUGIN_LOADED => Self::PluginLoaded {
                name: str_field("name")?,
                version: str_field("version")?,
            },
            topics::PLUGIN_ERROR => Self::PluginError {
                name: str_field("name")?,
                error: str_field("error")?,
            },
            topics::PLUGIN_UNLOADED => Self::PluginUnloaded {
                name: str_field("name")?,
            },
            topics::USER_LOGGED_IN => Self::UserLoggedIn { user: user_field()? },
            topics::USER_LOGGED_OUT => Self::UserLoggedOut,
            topics::USER_UPDATED => Self::UserUpdated { user: user_field()? },
            topics::TENANT_SWITCHED => Self::TenantSwitched {
                tenant_id: opt_str_field("tenantId"),
                user_id: opt_str_field("userId"),
            },
            topics::WORKSPACE_SWITCHED => Self::WorkspaceSwitched {
                workspace_id: opt_str_field("workspaceId"),
                workspace: payload
                    .get("workspace")
                    .filter(|w| !w.is_null())
                    .and_then(|w| serde_json::from_value(w.clone()).ok()),
            },
            _ => return None,
        };
        Some(event)
    }
}
