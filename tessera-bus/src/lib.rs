//! tessera-bus - in-process event bus for the tessera plugin runtime
//!
//! Plugins and the host talk to each other exclusively through string topics
//! carrying JSON payloads. Dispatch is synchronous and failure-isolated: a
//! handler that errors or panics is reported on [`ERROR_TOPIC`] and never
//! prevents the other handlers from running.
//!
//! # Example
//!
//! ```
//! use serde_json::json;
//! use tessera_bus::EventBus;
//!
//! let bus = EventBus::new();
//! let sub = bus.on_fn("tenant.switched", |payload| {
//!     println!("tenant is now {}", payload["tenantId"]);
//!     Ok(())
//! });
//!
//! bus.emit("tenant.switched", json!({ "tenantId": "acme", "userId": "u1" }));
//! sub.unsubscribe();
//! ```

pub mod bus;
pub mod error;

pub use bus::{ERROR_TOPIC, EventBus, Handler, Subscription, handler};
pub use error::{BusError, HandlerError};
