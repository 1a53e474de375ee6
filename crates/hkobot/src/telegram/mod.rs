//! Telegram bot integration and handlers

pub mod bot;
pub mod inline;
pub mod notifications;
pub mod schema;
pub mod transport;
pub mod types;

// Re-exports for convenience
pub use bot::{create_bot, setup_bot_commands, Command};
pub use inline::to_inline_result;
pub use notifications::{broadcast, spawn_delivery};
pub use schema::schema;
pub use transport::{dispatch, dispatch_all, to_markup};
pub use types::{HandlerDeps, HandlerError};
