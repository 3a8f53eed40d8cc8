//! tessera-core: plugin runtime for the tessera host
//!
//! This crate provides the pieces a host needs to load independently authored
//! plugins:
//!
//! - **Plugin manager** - [`PluginManager`] registers plugins, defers their
//!   initialization until the host provides capabilities, and isolates failures
//! - **Extension points** - routes plus sidebar, header, and dashboard widgets
//!   contributed by plugins
//! - **Capability adapters** - [`AuthAdapter`] and [`CoreAdapter`] expose host
//!   state to plugins and bridge state changes onto the event bus
//! - **Event vocabulary** - [`RuntimeEvent`] and [`events::topics`]
//! - **Runtime** - [`Runtime`] wires everything together
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use async_trait::async_trait;
//! use tessera_core::{AuthBackend, AuthSession, Runtime, RuntimeConfig};
//! use tessera_plugin_api::{PluginError, User};
//!
//! struct Backend;
//!
//! #[async_trait]
//! impl AuthBackend for Backend {
//!     async fn login(&self, email: &str, _password: &str) -> Result<AuthSession, PluginError> {
//!         Ok(AuthSession { user: User::new("u1", email), token: "token".into() })
//!     }
//! }
//!
//! # async fn example() -> Result<(), tessera_core::TesseraError> {
//! let runtime = Runtime::new(RuntimeConfig::default(), Arc::new(Backend));
//! // runtime.register(Arc::new(MyPlugin)).await;
//! runtime.start().await?;
//!
//! for (path, route) in runtime.manager().registered_routes() {
//!     println!("{} -> {}", path, route.component);
//! }
//!
//! runtime.shutdown().await;
//! # Ok(())
//! # }
//! ```
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────── Runtime ─────────────────────────────┐
//! │                                                                  │
//! │  AuthStore ──► AuthAdapter ──┐           ┌──► ExtensionRegistry  │
//! │  TenantStore ► CoreAdapter ──┼─► PluginManager                   │
//! │        │            │        │           └──► plugin.init(ctx)   │
//! │        └── bridges ─┴────────┴──────────────► EventBus           │
//! └──────────────────────────────────────────────────────────────────┘
//! ```

pub mod adapters;
pub mod config;
pub mod error;
pub mod events;
pub mod host;
pub mod plugins;
pub mod runtime;
pub mod telemetry;

// Re-export key types for convenience
pub use adapters::{AuthAdapter, CoreAdapter};
pub use config::{ConfigError, ConfigLoader, RuntimeConfig};
pub use error::TesseraError;
pub use events::{RuntimeEvent, topics};
pub use host::{AuthBackend, AuthSession, AuthState, AuthStore, TenantState, TenantStore};
pub use plugins::{ExtensionRegistry, ManagerError, PluginInfo, PluginManager, PluginStatus};
pub use runtime::Runtime;
pub use telemetry::init_tracing;

pub use tessera_bus::EventBus;
