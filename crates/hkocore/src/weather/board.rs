//! Warnings currently in force, per locale
//!
//! Layout functions run synchronously, so the warnings page reads this board
//! instead of the feed. The sweep and the warnings page handler refresh it.

use std::sync::Arc;

use dashmap::DashMap;

use crate::core::AppResult;
use crate::i18n::Locale;
use crate::weather::cache::WeatherCache;
use crate::weather::model::ActiveWarning;

#[derive(Debug, Default)]
pub struct WarningBoard {
    active: DashMap<Locale, Arc<Vec<ActiveWarning>>>,
}

impl WarningBoard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the list for `locale`; returns whether it changed.
    pub fn replace(&self, locale: Locale, warnings: Vec<ActiveWarning>) -> bool {
        let warnings = Arc::new(warnings);
        match self.active.insert(locale, Arc::clone(&warnings)) {
            Some(previous) => previous != warnings,
            None => !warnings.is_empty(),
        }
    }

    pub fn active(&self, locale: Locale) -> Arc<Vec<ActiveWarning>> {
        self.active
            .get(&locale)
            .map(|entry| Arc::clone(entry.value()))
            .unwrap_or_default()
    }

    pub fn has_active(&self, locale: Locale) -> bool {
        self.active.get(&locale).is_some_and(|entry| !entry.is_empty())
    }

    pub fn find(&self, locale: Locale, statement: &str) -> Option<ActiveWarning> {
        self.active(locale)
            .iter()
            .find(|w| w.statement == statement)
            .cloned()
    }

    /// Reloads `locale` from the (cached) warning summary.
    pub async fn refresh(&self, cache: &WeatherCache, locale: Locale) -> AppResult<Arc<Vec<ActiveWarning>>> {
        let summary = cache.warning_summary(locale).await?;
        let warnings = summary.active();
        if self.replace(locale, warnings) {
            log::info!("Warnings in force ({}): {}", locale, self.active(locale).len());
        }
        Ok(self.active(locale))
    }
}
