//! Delivery of outbound descriptors through the Bot API

use std::future::{Future, IntoFuture};

use hkocore::menu::{Formatting, Keyboard, Outbound};
use teloxide::prelude::*;
use teloxide::types::{InlineKeyboardButton, InlineKeyboardMarkup, MessageId, ParseMode, ReplyParameters};
use teloxide::{ApiError, RequestError};

/// Inline keyboard with one callback button per menu button.
pub fn to_markup(keyboard: &Keyboard) -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(keyboard.iter().map(|row| {
        row.iter()
            .map(|button| InlineKeyboardButton::callback(button.label.clone(), button.payload.clone()))
            .collect::<Vec<_>>()
    }))
}

/// Telegram rejects edits that change nothing; for a menu that is success.
pub fn is_not_modified(error: &RequestError) -> bool {
    matches!(error, RequestError::Api(ApiError::MessageNotModified))
}

/// Runs `request`, waiting once for Telegram's flood-control delay if asked to.
pub async fn with_retry_after<F, Fut, T>(mut request: F) -> Result<T, RequestError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, RequestError>>,
{
    match request().await {
        Err(RequestError::RetryAfter(seconds)) => {
            log::warn!("Rate limited, waiting {}s before retry", seconds.seconds());
            tokio::time::sleep(seconds.duration()).await;
            request().await
        }
        other => other,
    }
}

/// Sends or edits one message.
pub async fn dispatch(bot: &Bot, outbound: &Outbound) -> Result<(), RequestError> {
    let result = match outbound {
        Outbound::SendNew {
            chat_id,
            text,
            keyboard,
            formatting,
            reply_to,
        } => {
            with_retry_after(|| {
                let mut request = bot.send_message(ChatId(*chat_id), text.clone());
                if let Some(keyboard) = keyboard {
                    request = request.reply_markup(to_markup(keyboard));
                }
                if *formatting == Formatting::MarkdownV2 {
                    request = request.parse_mode(ParseMode::MarkdownV2);
                }
                if let Some(message_id) = reply_to {
                    request = request.reply_parameters(ReplyParameters::new(MessageId(*message_id)));
                }
                request.into_future()
            })
            .await
            .map(|_| ())
        }
        Outbound::EditExisting {
            chat_id,
            message_id,
            text: Some(text),
            keyboard,
            formatting,
        } => {
            with_retry_after(|| {
                let mut request = bot.edit_message_text(ChatId(*chat_id), MessageId(*message_id), text.clone());
                if let Some(keyboard) = keyboard {
                    request = request.reply_markup(to_markup(keyboard));
                }
                if *formatting == Formatting::MarkdownV2 {
                    request = request.parse_mode(ParseMode::MarkdownV2);
                }
                request.into_future()
            })
            .await
            .map(|_| ())
        }
        Outbound::EditExisting {
            chat_id,
            message_id,
            text: None,
            keyboard,
            ..
        } => {
            with_retry_after(|| {
                let mut request = bot.edit_message_reply_markup(ChatId(*chat_id), MessageId(*message_id));
                if let Some(keyboard) = keyboard {
                    request = request.reply_markup(to_markup(keyboard));
                }
                request.into_future()
            })
            .await
            .map(|_| ())
        }
    };

    match result {
        Err(e) if is_not_modified(&e) => {
            log::debug!("Message in chat {} already up to date", outbound.chat_id());
            Ok(())
        }
        other => other,
    }
}

/// Dispatches descriptors in order; stops at the first failure.
pub async fn dispatch_all(bot: &Bot, outbound: &[Outbound]) -> Result<(), RequestError> {
    for descriptor in outbound {
        if let Err(e) = dispatch(bot, descriptor).await {
            log::warn!("Failed to deliver to chat {}: {}", descriptor.chat_id(), e);
            return Err(e);
        }
    }
    Ok(())
}
