//! tessera-plugin-api - Plugin API for the tessera runtime
//!
//! This crate provides the traits and types needed to write plugins. A plugin
//! is any value implementing [`Plugin`]: it has a manifest (name and version),
//! an async `init` that receives a [`PluginContext`], and an optional async
//! `destroy`.
//!
//! During `init` a plugin contributes routes and widgets through the context
//! and subscribes to bus topics it cares about. Plugins never talk to each
//! other directly; everything goes through the event bus.
//!
//! # Example
//!
//! ```ignore
//! use async_trait::async_trait;
//! use tessera_plugin_api::{Plugin, PluginContext, PluginError, PluginManifest, WidgetRegistration};
//!
//! pub struct BillingPlugin;
//!
//! #[async_trait]
//! impl Plugin for BillingPlugin {
//!     fn manifest(&self) -> PluginManifest {
//!         PluginManifest::new("billing", "1.0.0")
//!     }
//!
//!     async fn init(&self, ctx: PluginContext) -> Result<(), PluginError> {
//!         ctx.register_route("/billing", "BillingPage");
//!         ctx.register_sidebar_widget(WidgetRegistration::new("billing.nav", "BillingNav"));
//!         Ok(())
//!     }
//! }
//! ```

pub mod capability;
pub mod context;
pub mod error;
pub mod types;

use async_trait::async_trait;

pub use capability::{AuthCapability, CoreCapability};
pub use context::{ExtensionRegistrar, PluginContext};
pub use error::PluginError;
pub use types::*;

pub use tessera_bus::{EventBus, HandlerError, Subscription};

/// The core plugin trait - implement this to create a tessera plugin.
#[async_trait]
pub trait Plugin: Send + Sync {
    /// Return plugin metadata
    fn manifest(&self) -> PluginManifest;

    /// Called once the host capabilities are available. Register routes,
    /// widgets, and bus subscriptions here.
    async fn init(&self, ctx: PluginContext) -> Result<(), PluginError>;

    /// Called when the plugin is unloaded. The default does nothing.
    async fn destroy(&self) -> Result<(), PluginError> {
        Ok(())
    }
}
