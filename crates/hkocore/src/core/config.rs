use once_cell::sync::Lazy;
use std::env;
use std::time::Duration;

/// Configuration constants for the bot
/// Bot token
/// Read from BOT_TOKEN or TELOXIDE_TOKEN environment variable
pub static BOT_TOKEN: Lazy<String> = Lazy::new(|| {
    env::var("BOT_TOKEN")
        .or_else(|_| env::var("TELOXIDE_TOKEN"))
        .unwrap_or_else(|_| String::new())
});

/// Display name used in the landing message and the about page
/// Read from BOT_NAME environment variable
/// Default: HKO Weather
pub static BOT_NAME: Lazy<String> = Lazy::new(|| env::var("BOT_NAME").unwrap_or_else(|_| "HKO Weather".to_string()));

/// Log file path
/// Read from LOG_FILE_PATH environment variable
/// Default: hkobot.log
pub static LOG_FILE_PATH: Lazy<String> =
    Lazy::new(|| env::var("LOG_FILE_PATH").unwrap_or_else(|_| "hkobot.log".to_string()));

/// Log level for both terminal and file output
/// Read from LOG_LEVEL environment variable (error, warn, info, debug, trace)
/// Default: info
pub static LOG_LEVEL: Lazy<log::LevelFilter> = Lazy::new(|| {
    env::var("LOG_LEVEL")
        .ok()
        .and_then(|level| level.parse().ok())
        .unwrap_or(log::LevelFilter::Info)
});

/// Chat settings file path (JSON document)
/// Read from SETTINGS_FILE environment variable
/// Default: settings.json
pub static SETTINGS_FILE: Lazy<String> =
    Lazy::new(|| env::var("SETTINGS_FILE").unwrap_or_else(|_| "settings.json".to_string()));

/// Public webhook URL for Telegram updates
/// Read from WEBHOOK_URL environment variable; when unset the bot long-polls
pub static WEBHOOK_URL: Lazy<Option<String>> = Lazy::new(|| env::var("WEBHOOK_URL").ok().filter(|s| !s.is_empty()));

/// Port the webhook HTTP server binds to
/// Read from WEBHOOK_PORT environment variable
/// Default: 8080
pub static WEBHOOK_PORT: Lazy<u16> = Lazy::new(|| {
    env::var("WEBHOOK_PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(8080)
});

/// Observatory open data endpoint
/// Read from HKO_API_URL environment variable
pub static HKO_API_URL: Lazy<String> = Lazy::new(|| {
    env::var("HKO_API_URL").unwrap_or_else(|_| "https://data.weather.gov.hk/weatherAPI/opendata/weather.php".to_string())
});

/// Version string shown on the about page
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Cache configuration
pub mod cache {
    use super::Duration;

    /// How long a fetched weather snapshot is served before refetching (in seconds)
    pub const WEATHER_TTL_SECS: u64 = 60;

    /// Maximum number of (kind, locale) snapshots held at once
    pub const WEATHER_CAPACITY: u64 = 64;

    /// Per-chat settings are evicted after this much inactivity (in seconds)
    pub const SETTINGS_IDLE_SECS: u64 = 30;

    /// Maximum number of chats held in the settings cache
    pub const SETTINGS_CAPACITY: u64 = 10_000;

    /// Weather snapshot TTL duration
    pub fn weather_ttl() -> Duration {
        Duration::from_secs(WEATHER_TTL_SECS)
    }

    /// Settings idle expiry duration
    pub fn settings_idle() -> Duration {
        Duration::from_secs(SETTINGS_IDLE_SECS)
    }
}

/// Warning notification sweep configuration
pub mod notify {
    use super::{env, Duration, Lazy};

    /// Interval between warning sweeps (in seconds)
    /// Read from SWEEP_INTERVAL_SECS environment variable
    /// Default: 60
    pub static SWEEP_INTERVAL_SECS: Lazy<u64> = Lazy::new(|| {
        env::var("SWEEP_INTERVAL_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .filter(|&s| s > 0)
            .unwrap_or(60)
    });

    /// Sweep interval duration
    pub fn sweep_interval() -> Duration {
        Duration::from_secs(*SWEEP_INTERVAL_SECS)
    }
}

/// Settings persistence configuration
pub mod persistence {
    use super::Duration;

    /// Outstanding changes before the JSON file store writes to disk
    pub const MAX_OUTSTANDING_CHANGES: usize = 100;

    /// Maximum age of unwritten changes (in seconds)
    pub const MAX_WRITE_DELAY_SECS: u64 = 60;

    /// Maximum unwritten age duration
    pub fn max_write_delay() -> Duration {
        Duration::from_secs(MAX_WRITE_DELAY_SECS)
    }
}

/// Network configuration
pub mod network {
    use super::Duration;

    /// Request timeout for feed HTTP requests (in seconds)
    pub const REQUEST_TIMEOUT_SECS: u64 = 15;

    /// Request timeout duration
    pub fn timeout() -> Duration {
        Duration::from_secs(REQUEST_TIMEOUT_SECS)
    }
}
