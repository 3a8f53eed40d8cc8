//! Error types for tessera-core

use thiserror::Error;

use crate::config::ConfigError;
use crate::plugins::ManagerError;

/// Top-level error type for tessera-core
#[derive(Error, Debug)]
pub enum TesseraError {
    #[error("Plugin manager error: {0}")]
    Manager(#[from] ManagerError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}
