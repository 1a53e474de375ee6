//! Handler types, dependencies, and interaction builders

use std::sync::Arc;

use hkocore::i18n::Locale;
use hkocore::menu::{AnchorRef, Interaction, NavigationEngine};
use hkocore::settings::{ChatSettings, SettingsCache};
use hkocore::weather::WeatherCache;
use teloxide::types::{CallbackQuery, InlineQuery, Message};

/// Error type for handlers
pub type HandlerError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Dependencies required by handlers
#[derive(Clone)]
pub struct HandlerDeps {
    pub engine: Arc<NavigationEngine>,
    pub settings: Arc<SettingsCache>,
    pub weather: Arc<WeatherCache>,
}

impl HandlerDeps {
    /// Create new handler dependencies
    pub fn new(engine: Arc<NavigationEngine>, settings: Arc<SettingsCache>, weather: Arc<WeatherCache>) -> Self {
        Self {
            engine,
            settings,
            weather,
        }
    }

    /// Registers the chat on first contact, seeding its locale from the Telegram client.
    pub async fn ensure_chat(&self, msg: &Message) -> ChatSettings {
        let chat_id = msg.chat.id.0;
        let initial = msg
            .from
            .as_ref()
            .and_then(|user| user.language_code.as_deref())
            .and_then(Locale::from_telegram_code)
            .map(ChatSettings::with_locale)
            .unwrap_or_default();

        match self.settings.remember(chat_id, initial).await {
            Ok(settings) => settings,
            Err(e) => {
                log::warn!("Failed to register chat {}: {}", chat_id, e);
                self.settings.get(chat_id).await
            }
        }
    }

    /// Locale for an inline query: the user's client language, else their stored settings.
    pub async fn inline_locale(&self, q: &InlineQuery) -> Locale {
        match q.from.language_code.as_deref().and_then(Locale::from_telegram_code) {
            Some(locale) => locale,
            None => self.settings.get(q.from.id.0 as i64).await.locale,
        }
    }

    /// Interaction for a command message; the command itself is the anchor.
    pub async fn command_interaction(&self, msg: &Message) -> Interaction {
        let viewer = self.settings.viewer(msg.chat.id.0).await;
        let anchor = AnchorRef {
            chat_id: msg.chat.id.0,
            message_id: msg.id.0,
        };
        Interaction::command(viewer, Some(anchor), msg.text().unwrap_or_default())
    }

    /// Interaction for a button press on a menu message.
    ///
    /// Returns `None` for queries without callback data.
    pub async fn callback_interaction(&self, q: &CallbackQuery) -> Option<Interaction> {
        let payload = q.data.clone()?;
        let anchor = q.message.as_ref().map(|m| AnchorRef {
            chat_id: m.chat().id.0,
            message_id: m.id().0,
        });
        let chat_id = anchor.map(|a| a.chat_id).unwrap_or(q.from.id.0 as i64);
        let viewer = self.settings.viewer(chat_id).await;
        Some(Interaction::callback(viewer, anchor, payload))
    }
}
