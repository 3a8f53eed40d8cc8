//! Extension-point registries: routes and priority-sorted widget slots

use std::collections::HashMap;

use indexmap::IndexMap;
use parking_lot::RwLock;
use tessera_plugin_api::{
    DEFAULT_WIDGET_PRIORITY, ExtensionRegistrar, RouteRegistration, WidgetRegistration, WidgetSlot,
};

#[derive(Default)]
struct Extensions {
    /// Keyed by path, in first-registration order
    routes: IndexMap<String, RouteRegistration>,
    /// path -> plugin that last registered it
    route_owners: HashMap<String, String>,
    sidebar: Vec<WidgetRegistration>,
    header: Vec<WidgetRegistration>,
    dashboard: Vec<WidgetRegistration>,
}

impl Extensions {
    fn slot_mut(&mut self, slot: WidgetSlot) -> &mut Vec<WidgetRegistration> {
        match slot {
            WidgetSlot::Sidebar => &mut self.sidebar,
            WidgetSlot::Header => &mut self.header,
            WidgetSlot::Dashboard => &mut self.dashboard,
        }
    }

    fn slot(&self, slot: WidgetSlot) -> &[WidgetRegistration] {
        match slot {
            WidgetSlot::Sidebar => &self.sidebar,
            WidgetSlot::Header => &self.header,
            WidgetSlot::Dashboard => &self.dashboard,
        }
    }
}

/// Routes and widgets contributed by plugins.
///
/// Widget lists are kept sorted ascending by priority. The sort is stable, so
/// widgets with equal priority stay in registration order.
pub struct ExtensionRegistry {
    inner: RwLock<Extensions>,
    default_priority: i32,
}

impl ExtensionRegistry {
    pub fn new() -> Self {
        Self::with_default_priority(DEFAULT_WIDGET_PRIORITY)
    }

    /// Registry that sorts unprioritized widgets at `default_priority`
    pub fn with_default_priority(default_priority: i32) -> Self {
        Self {
            inner: RwLock::new(Extensions::default()),
            default_priority,
        }
    }

    /// Add or replace the route at `route.path`
    pub fn add_route(&self, owner: &str, route: RouteRegistration) {
        let mut ext = self.inner.write();
        if let Some(previous) = ext.route_owners.get(&route.path) {
            tracing::debug!(
                path = %route.path,
                previous_owner = %previous,
                owner = %owner,
                "Route replaced"
            );
        }
        ext.route_owners
            .insert(route.path.clone(), owner.to_string());
        ext.routes.insert(route.path.clone(), route);
    }

    /// Add a widget and re-sort its slot
    pub fn add_widget(&self, owner: &str, slot: WidgetSlot, widget: WidgetRegistration) {
        let default_priority = self.default_priority;
        let mut ext = self.inner.write();
        let list = ext.slot_mut(slot);
        if list.iter().any(|w| w.id == widget.id) {
            tracing::debug!(
                slot = slot.as_str(),
                widget = %widget.id,
                owner = %owner,
                "Widget id already registered"
            );
        }
        list.push(widget);
        list.sort_by_key(|w| w.priority.unwrap_or(default_priority));
    }

    /// Copy of the route map
    pub fn routes(&self) -> IndexMap<String, RouteRegistration> {
        self.inner.read().routes.clone()
    }

    /// Copy of one widget slot, in priority order
    pub fn widgets(&self, slot: WidgetSlot) -> Vec<WidgetRegistration> {
        self.inner.read().slot(slot).to_vec()
    }

    /// Plugin that last registered `path`
    pub fn route_owner(&self, path: &str) -> Option<String> {
        self.inner.read().route_owners.get(path).cloned()
    }

    /// Drop every widget whose id starts with `prefix`, across all slots.
    /// Returns how many were removed.
    pub fn remove_widgets_with_prefix(&self, prefix: &str) -> usize {
        let mut ext = self.inner.write();
        let mut removed = 0;
        for slot in WidgetSlot::ALL {
            let list = ext.slot_mut(slot);
            let before = list.len();
            list.retain(|w| !w.id.starts_with(prefix));
            removed += before - list.len();
        }
        removed
    }

    /// Drop the routes `owner` registered last. Returns how many were removed.
    pub fn remove_routes_owned_by(&self, owner: &str) -> usize {
        let mut ext = self.inner.write();
        let paths: Vec<String> = ext
            .route_owners
            .iter()
            .filter(|(_, o)| o.as_str() == owner)
            .map(|(path, _)| path.clone())
            .collect();
        for path in &paths {
            ext.route_owners.remove(path);
            ext.routes.shift_remove(path);
        }
        paths.len()
    }
}

impl Default for ExtensionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ExtensionRegistrar for ExtensionRegistry {
    fn register_route(&self, owner: &str, route: RouteRegistration) {
        self.add_route(owner, route);
    }

    fn register_widget(&self, owner: &str, slot: WidgetSlot, widget: WidgetRegistration) {
        self.add_widget(owner, slot, widget);
    }
}
