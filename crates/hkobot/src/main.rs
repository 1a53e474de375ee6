use std::sync::Arc;

use anyhow::Result;
use dotenvy::dotenv;
use teloxide::prelude::*;
use teloxide::update_listeners::{webhooks, Polling};
use tokio::time::interval;

use hkobot::cli::{Cli, Commands};
use hkobot::telegram::{broadcast, create_bot, schema, setup_bot_commands, spawn_delivery, HandlerDeps};
use hkocore::core::logging::log_startup_configuration;
use hkocore::core::{config, init_logger};
use hkocore::notify::{start_sweep, WarningSweep};
use hkocore::settings::{JsonFileSettingsStore, SettingsCache, SettingsStore};
use hkocore::weather::{HkoClient, WarningBoard, WeatherCache, WeatherMenu};

/// Main entry point for the Telegram bot
///
/// Parses CLI arguments and dispatches to appropriate subcommand.
///
/// # Errors
/// Returns an error if initialization fails (logging, settings file, bot creation).
#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse_args();

    // Load environment variables from .env if present, before any config is read
    let _ = dotenv();

    // Log panics (a page without an action) instead of losing them in a worker task
    std::panic::set_hook(Box::new(|panic_info| {
        log::error!("Panic caught: {}", panic_info);
    }));

    init_logger(&config::LOG_FILE_PATH)?;

    match cli.command {
        Some(Commands::Run { webhook }) => run_bot(webhook).await,
        Some(Commands::Broadcast { message }) => run_broadcast(&message).await,
        None => {
            log::info!("No command specified, running bot in default mode");
            run_bot(false).await
        }
    }
}

async fn open_store() -> Result<Arc<dyn SettingsStore>> {
    let store = JsonFileSettingsStore::open(config::SETTINGS_FILE.as_str()).await?;
    Ok(Arc::new(store))
}

/// Send one message to every known chat
async fn run_broadcast(message: &str) -> Result<()> {
    let bot = create_bot()?;
    let store = open_store().await?;
    let (sent, failed) = broadcast(&bot, store.as_ref(), message).await?;
    log::info!("Broadcast finished: {} sent, {} failed", sent, failed);
    Ok(())
}

async fn run_bot(use_webhook: bool) -> Result<()> {
    let webhook_url = match (use_webhook, config::WEBHOOK_URL.clone()) {
        (_, Some(url)) => Some(url),
        (true, None) => return Err(anyhow::anyhow!("--webhook given but WEBHOOK_URL is not set")),
        (false, None) => None,
    };
    log_startup_configuration(webhook_url.is_some());

    let bot = create_bot()?;

    // Collaborators shared by the menu, the sweep and the handlers
    let store = open_store().await?;
    let settings = Arc::new(SettingsCache::new(Arc::clone(&store)));
    let weather = Arc::new(WeatherCache::new(Arc::new(HkoClient::from_env()?)));
    let board = Arc::new(WarningBoard::new());
    let engine = Arc::new(
        WeatherMenu::new(Arc::clone(&weather), Arc::clone(&board), Arc::clone(&settings)).build_engine(),
    );

    if let Err(e) = setup_bot_commands(&bot).await {
        log::warn!("Failed to register bot commands: {}", e);
    }

    // Warning sweep and its delivery loop
    let sweep = Arc::new(WarningSweep::new(Arc::clone(&weather), board, Arc::clone(&settings)));
    let notifications = start_sweep(sweep, config::notify::sweep_interval());
    let delivery = spawn_delivery(bot.clone(), Arc::clone(&settings), notifications);

    // Write out batched settings changes even when no new change arrives
    let settings_flush = Arc::clone(&settings);
    let flusher = tokio::spawn(async move {
        let mut ticker = interval(config::persistence::max_write_delay());
        loop {
            ticker.tick().await;
            if let Err(e) = settings_flush.flush().await {
                log::warn!("Periodic settings flush failed: {}", e);
            }
        }
    });

    let handler = schema(HandlerDeps::new(engine, Arc::clone(&settings), weather));
    let mut dispatcher = Dispatcher::builder(bot.clone(), handler)
        .default_handler(|update| async move {
            log::debug!("Unhandled update: {:?}", update.kind);
        })
        .error_handler(LoggingErrorHandler::with_custom_text("An error has occurred in the dispatcher"))
        .enable_ctrlc_handler()
        .build();

    match webhook_url {
        Some(url) => {
            log::info!("Starting bot in webhook mode at {}", url);
            let addr = ([0, 0, 0, 0], *config::WEBHOOK_PORT).into();
            let listener = webhooks::axum(bot.clone(), webhooks::Options::new(addr, url::Url::parse(&url)?)).await?;
            dispatcher
                .dispatch_with_listener(
                    listener,
                    LoggingErrorHandler::with_custom_text("An error from the webhook listener"),
                )
                .await;
        }
        None => {
            log::info!("Starting bot in long polling mode");
            let listener = Polling::builder(bot.clone()).drop_pending_updates().build();
            dispatcher
                .dispatch_with_listener(
                    listener,
                    LoggingErrorHandler::with_custom_text("An error from the update listener"),
                )
                .await;
        }
    }

    log::info!("Dispatcher stopped, flushing settings");
    flusher.abort();
    delivery.abort();
    settings.flush().await?;
    Ok(())
}
