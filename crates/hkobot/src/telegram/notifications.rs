//! Delivery of warning notifications and broadcasts

use std::future::IntoFuture;
use std::sync::Arc;

use hkocore::notify::WarningNotification;
use hkocore::settings::{SettingsCache, SettingsStore};
use teloxide::prelude::*;
use teloxide::{ApiError, RequestError};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::telegram::transport::with_retry_after;

/// The chat is gone for good; further messages will fail the same way.
pub fn is_unreachable(error: &RequestError) -> bool {
    matches!(
        error,
        RequestError::Api(ApiError::BotBlocked | ApiError::ChatNotFound | ApiError::UserDeactivated | ApiError::BotKicked)
    )
}

async fn send_text(bot: &Bot, chat_id: i64, text: &str) -> Result<(), RequestError> {
    with_retry_after(|| bot.send_message(ChatId(chat_id), text.to_string()).into_future())
        .await
        .map(|_| ())
}

/// Consumes the sweep's notifications until the channel closes.
///
/// Chats that blocked the bot get notifications switched off.
pub fn spawn_delivery(
    bot: Bot,
    settings: Arc<SettingsCache>,
    mut rx: mpsc::UnboundedReceiver<WarningNotification>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(notification) = rx.recv().await {
            match send_text(&bot, notification.chat_id, &notification.text).await {
                Ok(()) => log::debug!("Warning notification sent to chat {}", notification.chat_id),
                Err(e) if is_unreachable(&e) => {
                    log::warn!(
                        "Chat {} is unreachable ({}), turning notifications off",
                        notification.chat_id,
                        e
                    );
                    if let Err(e) = settings
                        .update(notification.chat_id, |s| s.notifications_enabled = false)
                        .await
                    {
                        log::warn!("Failed to update chat {}: {}", notification.chat_id, e);
                    }
                }
                Err(e) => log::warn!("Failed to notify chat {}: {}", notification.chat_id, e),
            }
        }
        log::info!("Notification channel closed, delivery stopped");
    })
}

/// Sends `text` to every chat in the store; returns (sent, failed).
pub async fn broadcast(bot: &Bot, store: &dyn SettingsStore, text: &str) -> anyhow::Result<(usize, usize)> {
    let chats = store.all_chat_settings().await?;
    log::info!("Broadcasting to {} chat(s)", chats.len());

    let mut sent = 0;
    let mut failed = 0;
    for chat_id in chats.keys() {
        match send_text(bot, *chat_id, text).await {
            Ok(()) => sent += 1,
            Err(e) => {
                log::warn!("Broadcast to chat {} failed: {}", chat_id, e);
                failed += 1;
            }
        }
    }
    Ok((sent, failed))
}
