//! Chat and application settings
//!
//! - [`model`]: persisted shapes
//! - [`store`]: the storage contract and its memory / JSON file backends
//! - [`cache`]: per-chat read-through cache used by handlers and the sweep

pub mod cache;
pub mod model;
pub mod store;

pub use cache::SettingsCache;
pub use model::{AppSettings, ChatSettings};
pub use store::{JsonFileSettingsStore, MemorySettingsStore, SettingsStore, WritePolicy};
