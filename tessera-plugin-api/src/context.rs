//! PluginContext - a plugin's interface to the host runtime

use std::sync::Arc;

use tessera_bus::EventBus;

use crate::capability::{AuthCapability, CoreCapability};
use crate::types::{ComponentRef, RouteRegistration, WidgetRegistration, WidgetSlot};

/// Sink for extension-point registrations, implemented by the host runtime
pub trait ExtensionRegistrar: Send + Sync {
    /// Add or replace a route on behalf of `owner`
    fn register_route(&self, owner: &str, route: RouteRegistration);

    /// Add a widget to `slot` on behalf of `owner`
    fn register_widget(&self, owner: &str, slot: WidgetSlot, widget: WidgetRegistration);
}

/// Capabilities handed to a plugin when it is initialized.
///
/// A fresh context is built for every initialization and passed by value.
/// It exposes:
/// - the shared [`EventBus`]
/// - the host's auth capability
/// - the host's tenant/workspace capability (absent if the host did not provide one)
/// - route and widget registration
/// - logging helpers tagged with the plugin name
///
/// The context has no setters; cloning it only clones handles.
#[derive(Clone)]
pub struct PluginContext {
    plugin_name: String,
    auth: Arc<dyn AuthCapability>,
    core: Option<Arc<dyn CoreCapability>>,
    event_bus: EventBus,
    registrar: Arc<dyn ExtensionRegistrar>,
}

impl PluginContext {
    /// Create a context bound to `plugin_name`
    pub fn new(
        plugin_name: impl Into<String>,
        auth: Arc<dyn AuthCapability>,
        core: Option<Arc<dyn CoreCapability>>,
        event_bus: EventBus,
        registrar: Arc<dyn ExtensionRegistrar>,
    ) -> Self {
        Self {
            plugin_name: plugin_name.into(),
            auth,
            core,
            event_bus,
            registrar,
        }
    }

    /// Name of the plugin this context was built for
    pub fn plugin_name(&self) -> &str {
        &self.plugin_name
    }

    // ─── Capabilities ────────────────────────────────────────────────

    /// Authentication capability
    pub fn auth(&self) -> &dyn AuthCapability {
        self.auth.as_ref()
    }

    /// Tenant/workspace capability, if the host provided one
    pub fn core(&self) -> Option<&dyn CoreCapability> {
        self.core.as_deref()
    }

    /// Shared event bus
    pub fn event_bus(&self) -> &EventBus {
        &self.event_bus
    }

    // ─── Route Registration ──────────────────────────────────────────

    /// Register a route rendered inside the host layout
    pub fn register_route(&self, path: impl Into<String>, component: impl Into<ComponentRef>) {
        self.registrar.register_route(
            &self.plugin_name,
            RouteRegistration {
                path: path.into(),
                component: component.into(),
                standalone: false,
            },
        );
    }

    /// Register a route rendered outside the host layout (login pages, embeds)
    pub fn register_standalone_route(
        &self,
        path: impl Into<String>,
        component: impl Into<ComponentRef>,
    ) {
        self.registrar.register_route(
            &self.plugin_name,
            RouteRegistration {
                path: path.into(),
                component: component.into(),
                standalone: true,
            },
        );
    }

    // ─── Widget Registration ─────────────────────────────────────────

    pub fn register_sidebar_widget(&self, widget: WidgetRegistration) {
        self.registrar
            .register_widget(&self.plugin_name, WidgetSlot::Sidebar, widget);
    }

    pub fn register_header_widget(&self, widget: WidgetRegistration) {
        self.registrar
            .register_widget(&self.plugin_name, WidgetSlot::Header, widget);
    }

    pub fn register_dashboard_widget(&self, widget: WidgetRegistration) {
        self.registrar
            .register_widget(&self.plugin_name, WidgetSlot::Dashboard, widget);
    }

    // ─── Logging ─────────────────────────────────────────────────────

    /// Log an info message (automatically prefixed with plugin name)
    pub fn log_info(&self, message: &str) {
        tracing::info!(plugin = %self.plugin_name, "{}", message);
    }

    /// Log a warning message
    pub fn log_warn(&self, message: &str) {
        tracing::warn!(plugin = %self.plugin_name, "{}", message);
    }

    /// Log an error message
    pub fn log_error(&self, message: &str) {
        tracing::error!(plugin = %self.plugin_name, "{}", message);
    }

    /// Log a debug message
    pub fn log_debug(&self, message: &str) {
        tracing::debug!(plugin = %self.plugin_name, "{}", message);
    }
}

impl std::fmt::Debug for PluginContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PluginContext")
            .field("plugin_name", &self.plugin_name)
            .field("has_core", &self.core.is_some())
            .finish_non_exhaustive()
    }
}
