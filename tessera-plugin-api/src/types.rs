//! Plugin metadata and extension-point value types

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::PluginError;

/// Plugin manifest containing metadata about the plugin
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginManifest {
    /// Unique plugin name. Also the prefix used to find the plugin's widgets on unload.
    pub name: String,
    /// Plugin version
    pub version: String,
    /// Human-readable description
    #[serde(default)]
    pub description: String,
}

impl PluginManifest {
    /// Create a manifest with an empty description
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            description: String::new(),
        }
    }

    /// Set the description
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Check the fields the runtime relies on
    pub fn validate(&self) -> Result<(), PluginError> {
        if self.name.trim().is_empty() {
            return Err(PluginError::InvalidManifest("name is empty".into()));
        }
        if self.name.chars().any(char::is_whitespace) {
            return Err(PluginError::InvalidManifest(format!(
                "name '{}' contains whitespace",
                self.name
            )));
        }
        if self.version.trim().is_empty() {
            return Err(PluginError::InvalidManifest(format!(
                "plugin '{}' has an empty version",
                self.name
            )));
        }
        Ok(())
    }
}

/// Opaque handle naming a UI component the host knows how to render
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ComponentRef(String);

impl ComponentRef {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ComponentRef {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for ComponentRef {
    fn from(name: String) -> Self {
        Self(name)
    }
}

impl fmt::Display for ComponentRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Priority used when a widget does not specify one
pub const DEFAULT_WIDGET_PRIORITY: i32 = 1;

/// A widget contributed to the sidebar, header, or dashboard
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WidgetRegistration {
    /// Widget id. Prefix it with the plugin name so unload can find it.
    pub id: String,
    /// Component to render
    pub component: ComponentRef,
    /// Sort key, lowest first. `None` means [`DEFAULT_WIDGET_PRIORITY`].
    #[serde(default)]
    pub priority: Option<i32>,
}

impl WidgetRegistration {
    pub fn new(id: impl Into<String>, component: impl Into<ComponentRef>) -> Self {
        Self {
            id: id.into(),
            component: component.into(),
            priority: None,
        }
    }

    /// Set the sort priority
    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = Some(priority);
        self
    }

    /// Priority with the default applied
    pub fn effective_priority(&self) -> i32 {
        self.priority.unwrap_or(DEFAULT_WIDGET_PRIORITY)
    }
}

/// A page route contributed by a plugin
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteRegistration {
    /// Lookup key; a later registration of the same path replaces this one
    pub path: String,
    /// Component rendered for the path
    pub component: ComponentRef,
    /// Rendered outside the host's main layout
    #[serde(default)]
    pub standalone: bool,
}

/// Widget extension points
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WidgetSlot {
    Sidebar,
    Header,
    Dashboard,
}

impl WidgetSlot {
    pub const ALL: [WidgetSlot; 3] = [Self::Sidebar, Self::Header, Self::Dashboard];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sidebar => "sidebar",
            Self::Header => "header",
            Self::Dashboard => "dashboard",
        }
    }
}

/// Authenticated user as seen by plugins
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl User {
    pub fn new(id: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            email: email.into(),
            name: None,
        }
    }

    /// Set the display name
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }
}

/// Tenant (organization) the host is operating in
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tenant {
    pub id: String,
    pub name: String,
}

impl Tenant {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}

/// Workspace within a tenant
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Workspace {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tenant_id: Option<String>,
}

impl Workspace {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            tenant_id: None,
        }
    }

    /// Attach the owning tenant
    pub fn in_tenant(mut self, tenant_id: impl Into<String>) -> Self {
        self.tenant_id = Some(tenant_id.into());
        self
    }
}
