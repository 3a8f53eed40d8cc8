//! Event vocabulary for the runtime

pub mod types;

pub use types::{RuntimeEvent, topics};
