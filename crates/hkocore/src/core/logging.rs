//! Logging initialization
//!
//! Console + file output through `simplelog`; everything else in the
//! workspace logs through the `log` facade.

use anyhow::Result;
use simplelog::*;
use std::fs::File;

use crate::core::config;

/// Initialize logger for both console and file output
///
/// # Arguments
/// * `log_file_path` - Path to the log file
///
/// # Returns
/// * `Ok(())` - Logger initialized successfully
/// * `Err(anyhow::Error)` - Failed to create the file or a logger was already set
pub fn init_logger(log_file_path: &str) -> Result<()> {
    let log_file = File::create(log_file_path).map_err(|e| anyhow::anyhow!("Failed to create log file: {}", e))?;
    let level = *config::LOG_LEVEL;

    CombinedLogger::init(vec![
        TermLogger::new(level, Config::default(), TerminalMode::Mixed, ColorChoice::Auto),
        WriteLogger::new(level, Config::default(), log_file),
    ])
    .map_err(|e| anyhow::anyhow!("Failed to initialize logger: {}", e))?;

    Ok(())
}

/// Logs the effective configuration at startup (never the token itself).
pub fn log_startup_configuration(webhook: bool) {
    log::info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    log::info!("{} v{}", config::BOT_NAME.as_str(), config::VERSION);
    log::info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    log::info!("Feed endpoint: {}", config::HKO_API_URL.as_str());
    log::info!("Settings file: {}", config::SETTINGS_FILE.as_str());
    log::info!("Warning sweep every {}s", *config::notify::SWEEP_INTERVAL_SECS);
    if config::BOT_TOKEN.is_empty() {
        log::error!("BOT_TOKEN is not set - the bot cannot connect to Telegram");
    }
    if webhook {
        match config::WEBHOOK_URL.as_deref() {
            Some(url) => log::info!("Mode: webhook ({}, port {})", url, *config::WEBHOOK_PORT),
            None => log::error!("Webhook mode requested but WEBHOOK_URL is not set"),
        }
    } else {
        log::info!("Mode: long polling");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use tempfile::NamedTempFile;

    #[test]
    fn test_init_logger_creates_log_file() {
        let temp_file = NamedTempFile::new().unwrap();
        let path = temp_file.path().to_str().unwrap();

        // A second init in the same process fails; either way the file exists.
        let _ = init_logger(path);
        assert!(temp_file.path().exists());
    }

    #[test]
    fn test_init_logger_rejects_bad_path() {
        let result = init_logger("/nonexistent-dir/for/sure/hkobot.log");
        assert!(result.is_err());
    }
}
