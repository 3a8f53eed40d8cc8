//! Plugin lifecycle tests
//!
//! Covers ordering of deferred initialization, failure isolation, extension
//! point ordering, and unload behavior through the public manager API.

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{Value, json};
use tessera_core::{EventBus, ManagerError, PluginManager, PluginStatus, RuntimeConfig, topics};
use tessera_plugin_api::{
    AuthCapability, Plugin, PluginContext, PluginError, PluginManifest, User, WidgetRegistration,
};

type Log = Arc<Mutex<Vec<String>>>;

struct NoAuth;

#[async_trait]
impl AuthCapability for NoAuth {
    fn current_user(&self) -> Option<User> {
        None
    }

    fn token(&self) -> Option<String> {
        None
    }

    async fn login(&self, _email: &str, _password: &str) -> Result<(), PluginError> {
        Err(PluginError::auth("not supported"))
    }

    async fn logout(&self) -> Result<(), PluginError> {
        Ok(())
    }
}

/// Plugin whose init appends its name to a shared log and registers the
/// configured widgets and route.
struct Scripted {
    name: String,
    fail: bool,
    log: Log,
    sidebar: Vec<WidgetRegistration>,
    route: Option<&'static str>,
    spawns: Mutex<Option<(PluginManager, Arc<dyn Plugin>)>>,
}

impl Scripted {
    fn new(name: &str, log: &Log) -> Self {
        Self {
            name: name.to_string(),
            fail: false,
            log: Arc::clone(log),
            sidebar: Vec::new(),
            route: None,
            spawns: Mutex::new(None),
        }
    }

    fn failing(mut self) -> Self {
        self.fail = true;
        self
    }

    fn with_sidebar(mut self, widget: WidgetRegistration) -> Self {
        self.sidebar.push(widget);
        self
    }

    fn with_route(mut self, path: &'static str) -> Self {
        self.route = Some(path);
        self
    }

    /// Register `child` with `manager` from inside init
    fn spawning(self, manager: &PluginManager, child: Arc<dyn Plugin>) -> Self {
        *self.spawns.lock() = Some((manager.clone(), child));
        self
    }

    fn arc(self) -> Arc<dyn Plugin> {
        Arc::new(self)
    }
}

#[async_trait]
impl Plugin for Scripted {
    fn manifest(&self) -> PluginManifest {
        PluginManifest::new(self.name.clone(), "1.0.0")
    }

    async fn init(&self, ctx: PluginContext) -> Result<(), PluginError> {
        self.log.lock().push(format!("init:{}", self.name));
        for widget in &self.sidebar {
            ctx.register_sidebar_widget(widget.clone());
        }
        if let Some(path) = self.route {
            ctx.register_route(path, format!("{}Page", self.name));
        }

        let spawn = self.spawns.lock().take();
        if let Some((manager, child)) = spawn {
            let status = manager.register(child).await;
            self.log.lock().push(format!("child:{:?}", status));
        }

        if self.fail {
            return Err(PluginError::init("boom"));
        }
        self.log.lock().push(format!("done:{}", self.name));
        Ok(())
    }

    async fn destroy(&self) -> Result<(), PluginError> {
        self.log.lock().push(format!("destroy:{}", self.name));
        Ok(())
    }
}

fn new_log() -> Log {
    Arc::new(Mutex::new(Vec::new()))
}

fn record(bus: &EventBus, topic: &str) -> Arc<Mutex<Vec<Value>>> {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    bus.on_fn(topic, move |payload| {
        sink.lock().push(payload.clone());
        Ok(())
    });
    seen
}

async fn initialize(manager: &PluginManager) {
    manager.initialize(Arc::new(NoAuth), None).await.unwrap();
}

// ==================== Deferred Initialization ====================

#[tokio::test]
async fn plugins_registered_before_initialize_run_in_fifo_order() {
    let log = new_log();
    let manager = PluginManager::new(EventBus::new(), RuntimeConfig::default());

    for name in ["alpha", "beta", "gamma"] {
        let status = manager.register(Scripted::new(name, &log).arc()).await;
        assert_eq!(status, PluginStatus::Pending);
    }
    assert!(log.lock().is_empty());
    assert_eq!(manager.pending_count(), 3);

    initialize(&manager).await;

    let inits: Vec<String> = log
        .lock()
        .iter()
        .filter(|entry| entry.starts_with("init:"))
        .cloned()
        .collect();
    assert_eq!(inits, vec!["init:alpha", "init:beta", "init:gamma"]);
    assert_eq!(manager.loaded_plugins(), vec!["alpha", "beta", "gamma"]);
    assert_eq!(manager.pending_count(), 0);
}

#[tokio::test]
async fn single_pending_plugin_emits_one_loaded_event() {
    let log = new_log();
    let manager = PluginManager::new(EventBus::new(), RuntimeConfig::default());
    let loaded = record(manager.event_bus(), topics::PLUGIN_LOADED);

    manager.register(Scripted::new("P1", &log).arc()).await;
    initialize(&manager).await;

    assert_eq!(manager.loaded_plugins(), vec!["P1"]);
    assert_eq!(
        *loaded.lock(),
        vec![json!({"name": "P1", "version": "1.0.0"})]
    );
}

#[tokio::test]
async fn app_initialized_follows_queued_plugin_events() {
    let log = new_log();
    let manager = PluginManager::new(EventBus::new(), RuntimeConfig::default());
    let order = Arc::new(Mutex::new(Vec::new()));
    for topic in [topics::PLUGIN_LOADED, topics::APP_INITIALIZED] {
        let order = Arc::clone(&order);
        manager.event_bus().on_fn(topic, move |_| {
            order.lock().push(topic);
            Ok(())
        });
    }

    manager.register(Scripted::new("a", &log).arc()).await;
    manager.register(Scripted::new("b", &log).arc()).await;
    initialize(&manager).await;

    assert_eq!(
        *order.lock(),
        vec![
            topics::PLUGIN_LOADED,
            topics::PLUGIN_LOADED,
            topics::APP_INITIALIZED
        ]
    );
}

#[tokio::test]
async fn plugin_registered_after_initialize_is_active_on_return() {
    let log = new_log();
    let manager = PluginManager::new(EventBus::new(), RuntimeConfig::default());
    manager.register(Scripted::new("first", &log).arc()).await;
    initialize(&manager).await;

    let status = manager.register(Scripted::new("late", &log).arc()).await;

    assert_eq!(status, PluginStatus::Active);
    assert_eq!(manager.loaded_plugins(), vec!["first", "late"]);
    // The earlier plugin was not initialized again
    assert_eq!(
        log.lock()
            .iter()
            .filter(|entry| *entry == "init:first")
            .count(),
        1
    );
}

#[tokio::test]
async fn registration_from_inside_init_is_queued_behind_current_plugin() {
    let log = new_log();
    let manager = PluginManager::new(EventBus::new(), RuntimeConfig::default());
    let child = Scripted::new("child", &log).arc();
    let parent = Scripted::new("parent", &log)
        .spawning(&manager, child)
        .arc();
    initialize(&manager).await;

    let status = manager.register(parent).await;

    assert_eq!(status, PluginStatus::Active);
    assert_eq!(
        *log.lock(),
        vec![
            "init:parent",
            "child:Pending",
            "done:parent",
            "init:child",
            "done:child"
        ]
    );
    assert_eq!(manager.loaded_plugins(), vec!["parent", "child"]);
}

// ==================== Failure Isolation ====================

#[tokio::test]
async fn failing_plugin_does_not_block_later_plugins() {
    let log = new_log();
    let manager = PluginManager::new(EventBus::new(), RuntimeConfig::default());
    let loaded = record(manager.event_bus(), topics::PLUGIN_LOADED);
    let errors = record(manager.event_bus(), topics::PLUGIN_ERROR);

    manager.register(Scripted::new("A", &log).failing().arc()).await;
    manager.register(Scripted::new("B", &log).arc()).await;
    initialize(&manager).await;

    assert_eq!(manager.loaded_plugins(), vec!["B"]);
    assert_eq!(loaded.lock().len(), 1);
    assert_eq!(loaded.lock()[0]["name"], "B");

    let errors = errors.lock();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0]["name"], "A");
    assert!(errors[0]["error"].as_str().unwrap().contains("boom"));

    match manager.plugin_info("A").unwrap().status {
        PluginStatus::Failed { error } => assert!(error.contains("boom")),
        other => panic!("expected failed status, got {:?}", other),
    }
}

#[tokio::test]
async fn failed_plugin_is_not_retried_automatically() {
    let log = new_log();
    let manager = PluginManager::new(EventBus::new(), RuntimeConfig::default());
    initialize(&manager).await;

    manager.register(Scripted::new("A", &log).failing().arc()).await;
    manager.register(Scripted::new("B", &log).arc()).await;

    let attempts = log
        .lock()
        .iter()
        .filter(|entry| *entry == "init:A")
        .count();
    assert_eq!(attempts, 1);
}

#[tokio::test]
async fn reinitialize_retries_failed_plugin() {
    let log = new_log();
    let manager = PluginManager::new(EventBus::new(), RuntimeConfig::default());
    initialize(&manager).await;
    manager.register(Scripted::new("A", &log).failing().arc()).await;

    let status = manager.reinitialize("A").await.unwrap();

    // Still failing, but init ran again and no destroy was needed
    assert!(matches!(status, PluginStatus::Failed { .. }));
    assert_eq!(
        log.lock()
            .iter()
            .filter(|entry| *entry == "init:A")
            .count(),
        2
    );
    assert!(!log.lock().iter().any(|entry| entry == "destroy:A"));
}

// ==================== Extension Points ====================

#[tokio::test]
async fn widgets_read_back_in_priority_order() {
    let log = new_log();
    let manager = PluginManager::new(EventBus::new(), RuntimeConfig::default());
    initialize(&manager).await;

    manager
        .register(
            Scripted::new("w", &log)
                .with_sidebar(WidgetRegistration::new("w.five", "Five").with_priority(5))
                .with_sidebar(WidgetRegistration::new("w.one", "One").with_priority(1))
                .with_sidebar(WidgetRegistration::new("w.three", "Three").with_priority(3))
                .arc(),
        )
        .await;

    let priorities: Vec<Option<i32>> = manager
        .sidebar_widgets()
        .iter()
        .map(|w| w.priority)
        .collect();
    assert_eq!(priorities, vec![Some(1), Some(3), Some(5)]);
}

#[tokio::test]
async fn equal_priority_widgets_keep_registration_order_across_plugins() {
    let log = new_log();
    let manager = PluginManager::new(EventBus::new(), RuntimeConfig::default());
    manager
        .register(
            Scripted::new("a", &log)
                .with_sidebar(WidgetRegistration::new("a.nav", "A"))
                .arc(),
        )
        .await;
    manager
        .register(
            Scripted::new("b", &log)
                .with_sidebar(WidgetRegistration::new("b.nav", "B"))
                .arc(),
        )
        .await;
    initialize(&manager).await;

    let ids: Vec<String> = manager.sidebar_widgets().into_iter().map(|w| w.id).collect();
    assert_eq!(ids, vec!["a.nav", "b.nav"]);
}

#[tokio::test]
async fn later_route_registration_wins() {
    let log = new_log();
    let manager = PluginManager::new(EventBus::new(), RuntimeConfig::default());
    initialize(&manager).await;

    manager
        .register(Scripted::new("a", &log).with_route("/shared").arc())
        .await;
    manager
        .register(Scripted::new("b", &log).with_route("/shared").arc())
        .await;

    let routes = manager.registered_routes();
    assert_eq!(routes.len(), 1);
    assert_eq!(routes["/shared"].component.as_str(), "bPage");
    assert_eq!(manager.route_owner("/shared").as_deref(), Some("b"));
}

// ==================== Unload ====================

#[tokio::test]
async fn unload_removes_plugin_and_prefixed_widgets_but_keeps_routes() {
    let log = new_log();
    let manager = PluginManager::new(EventBus::new(), RuntimeConfig::default());
    let unloaded = record(manager.event_bus(), topics::PLUGIN_UNLOADED);
    initialize(&manager).await;
    manager
        .register(
            Scripted::new("billing", &log)
                .with_sidebar(WidgetRegistration::new("billing.nav", "Nav"))
                .with_route("/billing")
                .arc(),
        )
        .await;
    manager
        .register(
            Scripted::new("reports", &log)
                .with_sidebar(WidgetRegistration::new("reports.nav", "Nav"))
                .arc(),
        )
        .await;

    manager.unload_plugin("billing").await.unwrap();

    assert_eq!(manager.loaded_plugins(), vec!["reports"]);
    let ids: Vec<String> = manager.sidebar_widgets().into_iter().map(|w| w.id).collect();
    assert_eq!(ids, vec!["reports.nav"]);
    assert!(manager.registered_routes().contains_key("/billing"));
    assert!(log.lock().iter().any(|entry| entry == "destroy:billing"));
    assert_eq!(*unloaded.lock(), vec![json!({"name": "billing"})]);
}

#[tokio::test]
async fn unload_routes_option_removes_owned_routes() {
    let log = new_log();
    let config = RuntimeConfig {
        unload_routes: true,
        ..RuntimeConfig::default()
    };
    let manager = PluginManager::new(EventBus::new(), config);
    initialize(&manager).await;
    manager
        .register(Scripted::new("billing", &log).with_route("/billing").arc())
        .await;
    manager
        .register(Scripted::new("reports", &log).with_route("/reports").arc())
        .await;

    manager.unload_plugin("billing").await.unwrap();

    let routes = manager.registered_routes();
    assert!(!routes.contains_key("/billing"));
    assert!(routes.contains_key("/reports"));
}

#[tokio::test]
async fn unload_unknown_plugin_is_not_found() {
    let manager = PluginManager::new(EventBus::new(), RuntimeConfig::default());

    let err = manager.unload_plugin("ghost").await.unwrap_err();

    assert_eq!(
        err,
        ManagerError::NotFound {
            name: "ghost".into()
        }
    );
}

#[tokio::test]
async fn unloaded_plugin_can_be_registered_again() {
    let log = new_log();
    let manager = PluginManager::new(EventBus::new(), RuntimeConfig::default());
    initialize(&manager).await;
    manager.register(Scripted::new("a", &log).arc()).await;
    manager.unload_plugin("a").await.unwrap();

    let status = manager.register(Scripted::new("a", &log).arc()).await;

    assert_eq!(status, PluginStatus::Active);
    assert_eq!(manager.loaded_plugins(), vec!["a"]);
}
