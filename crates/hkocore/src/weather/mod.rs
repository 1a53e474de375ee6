//! Hong Kong Observatory weather
//!
//! - [`model`]: typed shapes of the open data feeds
//! - [`feed`]: the feed contract and its HTTP client
//! - [`cache`]: TTL cache with one upstream fetch per key at a time
//! - [`board`]: warnings in force, readable from layout functions
//! - [`compose`]: message text for each report
//! - [`menu`]: the bot's page tree and actions

pub mod board;
pub mod cache;
pub mod compose;
pub mod feed;
pub mod menu;
pub mod model;

pub use board::WarningBoard;
pub use cache::{CacheStats, WeatherCache};
pub use feed::{FeedKind, HkoClient, WeatherFeed, WeatherSnapshot};
pub use menu::{current_weather_article, ids, InlineArticle, WeatherMenu};
pub use model::ActiveWarning;
