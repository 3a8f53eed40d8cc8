//! Hello Plugin - A simple example plugin for tessera
//!
//! This plugin demonstrates:
//! - Implementing the `Plugin` trait
//! - Contributing a route and widgets during `init`
//! - Reacting to host events on the bus (`core.user.logged_in`)
//! - Publishing its own events for other plugins (`hello.greeted`)
//! - Dropping subscriptions in `destroy`
//!
//! Widget ids are prefixed with the plugin name so the runtime can strip them
//! on unload.

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::json;
use tessera_plugin_api::{
    Plugin, PluginContext, PluginError, PluginManifest, Subscription, WidgetRegistration,
};

pub const NAME: &str = "hello";

/// Published after a signed-in user has been greeted
pub const GREETED_TOPIC: &str = "hello.greeted";

const LOGGED_IN_TOPIC: &str = "core.user.logged_in";
const LOGGED_OUT_TOPIC: &str = "core.user.logged_out";

/// Greets users as they sign in and counts the greetings.
#[derive(Default)]
pub struct HelloPlugin {
    greetings: Arc<AtomicU32>,
    subscriptions: Mutex<Vec<Subscription>>,
}

impl HelloPlugin {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of sign-ins greeted since `init`
    pub fn greetings(&self) -> u32 {
        self.greetings.load(Ordering::SeqCst)
    }

    /// Number of live bus subscriptions held by the plugin
    pub fn subscription_count(&self) -> usize {
        self.subscriptions.lock().len()
    }
}

#[async_trait]
impl Plugin for HelloPlugin {
    fn manifest(&self) -> PluginManifest {
        PluginManifest::new(NAME, env!("CARGO_PKG_VERSION"))
            .with_description("A simple example plugin that greets signed-in users")
    }

    async fn init(&self, ctx: PluginContext) -> Result<(), PluginError> {
        ctx.register_route("/hello", "HelloPage");
        ctx.register_sidebar_widget(
            WidgetRegistration::new("hello.nav", "HelloNavLink").with_priority(50),
        );
        ctx.register_dashboard_widget(WidgetRegistration::new("hello.card", "HelloCard"));

        if let Some(user) = ctx.auth().current_user() {
            ctx.log_info(&format!("Already signed in as {}", user.email));
        }

        let greetings = Arc::clone(&self.greetings);
        let bus = ctx.event_bus().clone();
        let log_ctx = ctx.clone();
        let on_login = ctx.event_bus().on_fn(LOGGED_IN_TOPIC, move |payload| {
            let email = payload["user"]["email"].as_str().unwrap_or("someone");
            let count = greetings.fetch_add(1, Ordering::SeqCst) + 1;
            log_ctx.log_info(&format!("Hello, {}! (greeting #{})", email, count));
            bus.emit(GREETED_TOPIC, json!({ "email": email, "count": count }));
            Ok(())
        });

        let log_ctx = ctx.clone();
        let on_logout = ctx.event_bus().on_fn(LOGGED_OUT_TOPIC, move |_| {
            log_ctx.log_debug("Goodbye");
            Ok(())
        });

        self.subscriptions.lock().extend([on_login, on_logout]);
        ctx.log_info("Hello plugin loaded!");
        Ok(())
    }

    async fn destroy(&self) -> Result<(), PluginError> {
        for subscription in self.subscriptions.lock().drain(..) {
            subscription.unsubscribe();
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tessera_plugin_api::{
        AuthCapability, EventBus, ExtensionRegistrar, RouteRegistration, User, WidgetSlot,
    };

    #[derive(Default)]
    struct Recorder {
        routes: Mutex<Vec<String>>,
        widgets: Mutex<Vec<(WidgetSlot, String)>>,
    }

    impl ExtensionRegistrar for Recorder {
        fn register_route(&self, _owner: &str, route: RouteRegistration) {
            self.routes.lock().push(route.path);
        }

        fn register_widget(&self, _owner: &str, slot: WidgetSlot, widget: WidgetRegistration) {
            self.widgets.lock().push((slot, widget.id));
        }
    }

    struct SignedOut;

    #[async_trait]
    impl AuthCapability for SignedOut {
        fn current_user(&self) -> Option<User> {
            None
        }

        fn token(&self) -> Option<String> {
            None
        }

        async fn login(&self, _email: &str, _password: &str) -> Result<(), PluginError> {
            Ok(())
        }

        async fn logout(&self) -> Result<(), PluginError> {
            Ok(())
        }
    }

    fn context(bus: &EventBus, recorder: Arc<Recorder>) -> PluginContext {
        PluginContext::new(NAME, Arc::new(SignedOut), None, bus.clone(), recorder)
    }

    #[tokio::test]
    async fn test_init_registers_extensions() {
        let bus = EventBus::new();
        let recorder = Arc::new(Recorder::default());
        let plugin = HelloPlugin::new();

        plugin.init(context(&bus, Arc::clone(&recorder))).await.unwrap();

        assert_eq!(*recorder.routes.lock(), vec!["/hello"]);
        let widgets = recorder.widgets.lock();
        assert!(widgets.iter().all(|(_, id)| id.starts_with(NAME)));
        assert_eq!(widgets.len(), 2);
    }

    #[tokio::test]
    async fn test_login_event_is_greeted() {
        let bus = EventBus::new();
        let plugin = HelloPlugin::new();
        plugin
            .init(context(&bus, Arc::new(Recorder::default())))
            .await
            .unwrap();
        let greeted = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&greeted);
        let _sub = bus.on_fn(GREETED_TOPIC, move |payload| {
            sink.lock().push(payload.clone());
            Ok(())
        });

        bus.emit(
            LOGGED_IN_TOPIC,
            json!({"user": {"id": "u1", "email": "ann@example.com"}}),
        );

        assert_eq!(plugin.greetings(), 1);
        assert_eq!(
            *greeted.lock(),
            vec![json!({"email": "ann@example.com", "count": 1})]
        );
    }

    #[tokio::test]
    async fn test_destroy_unsubscribes() {
        let bus = EventBus::new();
        let plugin = HelloPlugin::new();
        plugin
            .init(context(&bus, Arc::new(Recorder::default())))
            .await
            .unwrap();
        assert_eq!(plugin.subscription_count(), 2);

        plugin.destroy().await.unwrap();
        bus.emit(LOGGED_IN_TOPIC, json!({"user": {"id": "u1", "email": "a@b.c"}}));

        assert_eq!(plugin.greetings(), 0);
        assert_eq!(bus.listener_count(LOGGED_IN_TOPIC), 0);
    }
}
