//! hkocore - core library for the HKO weather bot
//!
//! Everything that does not talk to Telegram lives here: the inline-menu
//! navigation engine, the observatory feed client and its cache, per-chat
//! settings and the warning notification sweep.
//!
//! # Module Structure
//!
//! - `core`: configuration, errors, logging and small text utilities
//! - `i18n`: locales and Fluent message lookup
//! - `menu`: page graph, action registry, reply rendering, navigation engine
//! - `weather`: feed model/client, cache, composers and the weather menu
//! - `settings`: chat/app settings, persistence and the settings cache
//! - `notify`: periodic sweep for newly issued warnings

#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used))]

pub mod core;
pub mod i18n;
pub mod menu;
pub mod notify;
pub mod settings;
pub mod weather;

// Re-export commonly used types for convenience
pub use core::{AppError, AppResult};
pub use i18n::Locale;
pub use menu::{Interaction, NavigationEngine, Outbound, ReplyStrategy, Viewer};
