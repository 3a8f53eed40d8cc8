//! Plugin registry, lifecycle, and extension points

mod error;
pub mod extensions;
mod manager;

pub use error::ManagerError;
pub use extensions::ExtensionRegistry;
pub use manager::{PluginInfo, PluginManager, PluginStatus};
