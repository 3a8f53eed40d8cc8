//! Capability adapters: host state exposed to plugins, state changes bridged
//! onto the event bus

mod auth;
mod tenant;

pub use auth::AuthAdapter;
pub use tenant::CoreAdapter;
