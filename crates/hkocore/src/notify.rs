//! Periodic sweep for newly issued weather warnings.
//!
//! Runs as a `tokio::spawn`ed task, emitting `WarningNotification`s through an
//! mpsc channel. The Telegram layer receives these and delivers them.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use strum::IntoEnumIterator;
use tokio::sync::mpsc;
use tokio::time::interval;

use crate::core::AppResult;
use crate::i18n::Locale;
use crate::settings::{AppSettings, SettingsCache, SettingsStore};
use crate::weather::board::WarningBoard;
use crate::weather::cache::WeatherCache;
use crate::weather::compose;
use crate::weather::feed::FeedKind;
use crate::weather::model::{ActiveWarning, Timestamp};

/// One push message for one chat.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WarningNotification {
    pub chat_id: i64,
    pub text: String,
}

/// Warnings in `active` issued or updated after what `ledger` recorded for them.
///
/// Warnings without any issue/update time cannot be recorded and are skipped.
pub fn diff_new_warnings<'a>(
    active: &'a [ActiveWarning],
    ledger: &BTreeMap<String, Timestamp>,
) -> Vec<&'a ActiveWarning> {
    active
        .iter()
        .filter(|warning| match (warning.last_change(), ledger.get(&warning.statement)) {
            (None, _) => false,
            (Some(_), None) => true,
            (Some(changed), Some(seen)) => changed > *seen,
        })
        .collect()
}

/// Ledger after a cycle: one entry per warning still in force.
fn next_ledger(active: &[ActiveWarning], previous: &BTreeMap<String, Timestamp>) -> BTreeMap<String, Timestamp> {
    active
        .iter()
        .filter_map(|warning| {
            let changed = warning.last_change().or_else(|| previous.get(&warning.statement).copied())?;
            Some((warning.statement.clone(), changed))
        })
        .collect()
}

pub struct WarningSweep {
    weather: Arc<WeatherCache>,
    board: Arc<WarningBoard>,
    settings: Arc<SettingsCache>,
    primed: AtomicBool,
}

impl WarningSweep {
    pub fn new(weather: Arc<WeatherCache>, board: Arc<WarningBoard>, settings: Arc<SettingsCache>) -> Self {
        Self {
            weather,
            board,
            settings,
            primed: AtomicBool::new(false),
        }
    }

    /// Runs one cycle; returns the number of notifications emitted.
    ///
    /// The first cycle of a process with an empty ledger only records what is
    /// already in force, so a restart does not re-announce old warnings.
    pub async fn run_cycle(&self, tx: &mpsc::UnboundedSender<WarningNotification>) -> AppResult<usize> {
        for locale in Locale::iter() {
            self.weather.invalidate(FeedKind::WarningSummary, locale).await;
            self.board.refresh(&self.weather, locale).await?;
        }
        let stats = self.weather.stats();
        log::debug!(
            "Weather cache: {} entries, {} hits, {} misses",
            stats.size,
            stats.hits,
            stats.misses
        );

        let store = self.settings.store();
        let app = store.app_settings().await?;
        let reference = self.board.active(Locale::default());
        let fresh = diff_new_warnings(&reference, &app.last_notified_warnings);
        let first_cycle = !self.primed.swap(true, Ordering::SeqCst);

        let mut sent = 0;
        if first_cycle && app.last_notified_warnings.is_empty() {
            if !fresh.is_empty() {
                log::info!("Recording {} warning(s) already in force without notifying", fresh.len());
            }
        } else if !fresh.is_empty() {
            let chats = store.all_chat_settings().await?;
            for (chat_id, settings) in chats.iter().filter(|(_, s)| s.notifications_enabled) {
                for warning in &fresh {
                    let localized = self
                        .board
                        .find(settings.locale, &warning.statement)
                        .unwrap_or_else(|| (*warning).clone());
                    let notification = WarningNotification {
                        chat_id: *chat_id,
                        text: compose::warning_notification(&localized, settings.locale),
                    };
                    if tx.send(notification).is_err() {
                        log::warn!("Notification channel closed, dropping remaining notifications");
                        return Ok(sent);
                    }
                    sent += 1;
                }
            }
            log::info!("Sweep: {} new warning(s), {} notification(s)", fresh.len(), sent);
        }

        let ledger = next_ledger(&reference, &app.last_notified_warnings);
        if ledger != app.last_notified_warnings {
            store
                .save_app_settings(AppSettings {
                    last_notified_warnings: ledger,
                })
                .await?;
        }
        Ok(sent)
    }
}

/// Start the sweep background task.
///
/// Returns a receiver for `WarningNotification`s that should be consumed
/// by the Telegram delivery loop.
pub fn start_sweep(sweep: Arc<WarningSweep>, every: Duration) -> mpsc::UnboundedReceiver<WarningNotification> {
    let (tx, rx) = mpsc::unbounded_channel();

    tokio::spawn(async move {
        let mut ticker = interval(every);
        log::info!("Warning sweep started (interval: {}s)", every.as_secs());

        loop {
            ticker.tick().await;
            if tx.is_closed() {
                log::info!("Notification receiver dropped, stopping warning sweep");
                break;
            }
            match sweep.run_cycle(&tx).await {
                Ok(_) => {}
                Err(e) if e.is_transient() => log::warn!("Warning sweep cycle failed, retrying next tick: {}", e),
                Err(e) => log::error!("Warning sweep cycle failed: {}", e),
            }
        }
    });

    rx
}
