//! Short-lived snapshot cache in front of the weather feed
//!
//! Concurrent misses for the same `(kind, locale)` share one upstream fetch.
//! Failed fetches are not cached.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;

use crate::core::config;
use crate::core::{AppError, AppResult};
use crate::i18n::Locale;
use crate::weather::feed::{FeedKind, WeatherFeed, WeatherSnapshot};
use crate::weather::model::{CurrentReport, LocalForecast, NineDayForecast, SpecialTips, WarningInfo, WarningSummary};

type Key = (FeedKind, Locale);

pub struct WeatherCache {
    feed: Arc<dyn WeatherFeed>,
    snapshots: Cache<Key, WeatherSnapshot>,
    hits: AtomicU64,
    misses: AtomicU64,
}

/// Cache statistics
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    pub size: u64,
    pub hits: u64,
    pub misses: u64,
}

impl WeatherCache {
    pub fn new(feed: Arc<dyn WeatherFeed>) -> Self {
        Self::with_ttl(feed, config::cache::weather_ttl())
    }

    pub fn with_ttl(feed: Arc<dyn WeatherFeed>, ttl: Duration) -> Self {
        Self {
            feed,
            snapshots: Cache::builder()
                .max_capacity(config::cache::WEATHER_CAPACITY)
                .time_to_live(ttl)
                .build(),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Cached snapshot, fetched on a miss.
    pub async fn get(&self, kind: FeedKind, locale: Locale) -> AppResult<WeatherSnapshot> {
        let key = (kind, locale);
        if let Some(snapshot) = self.snapshots.get(&key).await {
            self.hits.fetch_add(1, Ordering::Relaxed);
            return Ok(snapshot);
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        let feed = Arc::clone(&self.feed);
        self.snapshots
            .try_get_with(key, async move { feed.fetch(kind, locale).await })
            .await
            .map_err(|e: Arc<AppError>| {
                log::warn!("Weather fetch {} ({}) failed: {}", kind, locale, e);
                AppError::Feed(e.to_string())
            })
    }

    /// Drops one entry so the next read refetches.
    pub async fn invalidate(&self, kind: FeedKind, locale: Locale) {
        self.snapshots.invalidate(&(kind, locale)).await;
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            size: self.snapshots.entry_count(),
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }

    pub async fn local_forecast(&self, locale: Locale) -> AppResult<LocalForecast> {
        self.get(FeedKind::LocalForecast, locale).await?.into_local_forecast()
    }

    pub async fn nine_day_forecast(&self, locale: Locale) -> AppResult<NineDayForecast> {
        self.get(FeedKind::NineDayForecast, locale)
            .await?
            .into_nine_day_forecast()
    }

    pub async fn current_report(&self, locale: Locale) -> AppResult<CurrentReport> {
        self.get(FeedKind::CurrentReport, locale).await?.into_current_report()
    }

    pub async fn warning_summary(&self, locale: Locale) -> AppResult<WarningSummary> {
        self.get(FeedKind::WarningSummary, locale).await?.into_warning_summary()
    }

    pub async fn warning_info(&self, locale: Locale) -> AppResult<WarningInfo> {
        self.get(FeedKind::WarningInfo, locale).await?.into_warning_info()
    }

    pub async fn special_tips(&self, locale: Locale) -> AppResult<SpecialTips> {
        self.get(FeedKind::SpecialTips, locale).await?.into_special_tips()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use pretty_assertions::assert_eq;
    use std::sync::atomic::AtomicUsize;

    struct CountingFeed {
        calls: AtomicUsize,
        fail: bool,
    }

    #[async_trait]
    impl WeatherFeed for CountingFeed {
        async fn fetch(&self, kind: FeedKind, _locale: Locale) -> AppResult<WeatherSnapshot> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(20)).await;
            if self.fail {
                return Err(AppError::Feed("upstream down".to_string()));
            }
            WeatherSnapshot::parse(kind, "{}")
        }
    }

    fn feed(fail: bool) -> Arc<CountingFeed> {
        Arc::new(CountingFeed {
            calls: AtomicUsize::new(0),
            fail,
        })
    }

    #[tokio::test]
    async fn test_concurrent_misses_share_one_fetch() {
        let feed = feed(false);
        let cache = Arc::new(WeatherCache::new(feed.clone()));

        let handles: Vec<_> = (0..10)
            .map(|_| {
                let cache = Arc::clone(&cache);
                tokio::spawn(async move { cache.current_report(Locale::EnUk).await })
            })
            .collect();
        for handle in handles {
            assert!(handle.await.unwrap().is_ok());
        }
        assert_eq!(feed.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_keys_are_per_kind_and_locale() {
        let feed = feed(false);
        let cache = WeatherCache::new(feed.clone());

        cache.current_report(Locale::EnUk).await.unwrap();
        cache.current_report(Locale::ZhHk).await.unwrap();
        cache.local_forecast(Locale::EnUk).await.unwrap();
        cache.current_report(Locale::EnUk).await.unwrap();

        assert_eq!(feed.calls.load(Ordering::SeqCst), 3);
        let stats = cache.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 3);
    }

    #[tokio::test]
    async fn test_errors_are_not_cached() {
        let feed = feed(true);
        let cache = WeatherCache::new(feed.clone());

        assert!(cache.special_tips(Locale::EnUk).await.is_err());
        assert!(cache.special_tips(Locale::EnUk).await.is_err());
        assert_eq!(feed.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_expired_entry_is_refetched() {
        let feed = feed(false);
        let cache = WeatherCache::with_ttl(feed.clone(), Duration::from_millis(50));

        cache.warning_summary(Locale::EnUk).await.unwrap();
        tokio::time::sleep(Duration::from_millis(120)).await;
        cache.warning_summary(Locale::EnUk).await.unwrap();
        assert_eq!(feed.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_invalidate_forces_refetch() {
        let feed = feed(false);
        let cache = WeatherCache::new(feed.clone());

        cache.warning_info(Locale::ZhHk).await.unwrap();
        cache.invalidate(FeedKind::WarningInfo, Locale::ZhHk).await;
        cache.warning_info(Locale::ZhHk).await.unwrap();
        assert_eq!(feed.calls.load(Ordering::SeqCst), 2);
    }
}
