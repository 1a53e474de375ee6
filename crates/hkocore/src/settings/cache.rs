//! Read-through per-chat settings cache
//!
//! Entries idle for [`config::cache::SETTINGS_IDLE_SECS`] are dropped. Updates
//! go to the store first, then to the cache. Writes for one chat run one at a
//! time.

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use moka::future::Cache;
use tokio::sync::Mutex;

use crate::core::config;
use crate::core::AppResult;
use crate::menu::Viewer;
use crate::settings::model::ChatSettings;
use crate::settings::store::SettingsStore;

pub struct SettingsCache {
    store: Arc<dyn SettingsStore>,
    chats: Cache<i64, ChatSettings>,
    write_locks: DashMap<i64, Arc<Mutex<()>>>,
}

impl SettingsCache {
    pub fn new(store: Arc<dyn SettingsStore>) -> Self {
        Self::with_idle(store, config::cache::settings_idle())
    }

    pub fn with_idle(store: Arc<dyn SettingsStore>, idle: Duration) -> Self {
        Self {
            store,
            chats: Cache::builder()
                .max_capacity(config::cache::SETTINGS_CAPACITY)
                .time_to_idle(idle)
                .build(),
            write_locks: DashMap::new(),
        }
    }

    fn write_lock(&self, chat_id: i64) -> Arc<Mutex<()>> {
        Arc::clone(self.write_locks.entry(chat_id).or_default().value())
    }

    pub fn store(&self) -> &Arc<dyn SettingsStore> {
        &self.store
    }

    /// Settings for `chat_id`; defaults when the chat is unknown or the store fails.
    pub async fn get(&self, chat_id: i64) -> ChatSettings {
        let store = Arc::clone(&self.store);
        let loaded = self
            .chats
            .try_get_with(chat_id, async move {
                store
                    .chat_settings(chat_id)
                    .await
                    .map(|found| found.unwrap_or_default())
            })
            .await;

        match loaded {
            Ok(settings) => settings,
            Err(e) => {
                log::warn!("Failed to load settings for chat {}: {}", chat_id, e);
                ChatSettings::default()
            }
        }
    }

    pub async fn viewer(&self, chat_id: i64) -> Viewer {
        Viewer::new(chat_id, self.get(chat_id).await)
    }

    /// Applies `change` and persists the result.
    pub async fn update<F>(&self, chat_id: i64, change: F) -> AppResult<ChatSettings>
    where
        F: FnOnce(&mut ChatSettings),
    {
        let lock = self.write_lock(chat_id);
        let _guard = lock.lock().await;

        let mut settings = self.get(chat_id).await;
        change(&mut settings);
        self.store.save_chat_settings(chat_id, settings).await?;
        self.chats.insert(chat_id, settings).await;
        Ok(settings)
    }

    /// Stores `initial` for a chat the store has never seen; returns what is stored.
    pub async fn remember(&self, chat_id: i64, initial: ChatSettings) -> AppResult<ChatSettings> {
        let lock = self.write_lock(chat_id);
        let _guard = lock.lock().await;

        if let Some(existing) = self.store.chat_settings(chat_id).await? {
            return Ok(existing);
        }
        log::info!("New chat {} ({})", chat_id, initial.locale);
        self.store.save_chat_settings(chat_id, initial).await?;
        self.chats.insert(chat_id, initial).await;
        Ok(initial)
    }

    /// Flushes the underlying store.
    pub async fn flush(&self) -> AppResult<()> {
        self.chats.run_pending_tasks().await;
        self.store.flush().await
    }
}
