//! Observatory open data client
//!
//! One GET per `(kind, locale)`: `<base>?dataType=<kind>&lang=<code>`.

use std::time::Duration;

use async_trait::async_trait;
use url::Url;

use crate::core::config;
use crate::core::{AppError, AppResult};
use crate::i18n::Locale;
use crate::weather::model::{CurrentReport, LocalForecast, NineDayForecast, SpecialTips, WarningInfo, WarningSummary};

/// Datasets the bot reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display, strum::EnumIter, strum::AsRefStr)]
pub enum FeedKind {
    #[strum(serialize = "flw")]
    LocalForecast,
    #[strum(serialize = "fnd")]
    NineDayForecast,
    #[strum(serialize = "rhrread")]
    CurrentReport,
    #[strum(serialize = "warnsum")]
    WarningSummary,
    #[strum(serialize = "warningInfo")]
    WarningInfo,
    #[strum(serialize = "swt")]
    SpecialTips,
}

/// A parsed dataset.
#[derive(Debug, Clone, PartialEq)]
pub enum WeatherSnapshot {
    LocalForecast(LocalForecast),
    NineDayForecast(NineDayForecast),
    CurrentReport(CurrentReport),
    WarningSummary(WarningSummary),
    WarningInfo(WarningInfo),
    SpecialTips(SpecialTips),
}

impl WeatherSnapshot {
    pub fn kind(&self) -> FeedKind {
        match self {
            WeatherSnapshot::LocalForecast(_) => FeedKind::LocalForecast,
            WeatherSnapshot::NineDayForecast(_) => FeedKind::NineDayForecast,
            WeatherSnapshot::CurrentReport(_) => FeedKind::CurrentReport,
            WeatherSnapshot::WarningSummary(_) => FeedKind::WarningSummary,
            WeatherSnapshot::WarningInfo(_) => FeedKind::WarningInfo,
            WeatherSnapshot::SpecialTips(_) => FeedKind::SpecialTips,
        }
    }

    /// Parses a response body as the dataset `kind`.
    pub fn parse(kind: FeedKind, body: &str) -> AppResult<Self> {
        let snapshot = match kind {
            FeedKind::LocalForecast => WeatherSnapshot::LocalForecast(serde_json::from_str(body)?),
            FeedKind::NineDayForecast => WeatherSnapshot::NineDayForecast(serde_json::from_str(body)?),
            FeedKind::CurrentReport => WeatherSnapshot::CurrentReport(serde_json::from_str(body)?),
            FeedKind::WarningSummary => WeatherSnapshot::WarningSummary(serde_json::from_str(body)?),
            FeedKind::WarningInfo => WeatherSnapshot::WarningInfo(serde_json::from_str(body)?),
            FeedKind::SpecialTips => WeatherSnapshot::SpecialTips(serde_json::from_str(body)?),
        };
        Ok(snapshot)
    }

    fn mismatch(&self, wanted: FeedKind) -> AppError {
        AppError::Feed(format!("expected {} snapshot, got {}", wanted, self.kind()))
    }

    pub fn into_local_forecast(self) -> AppResult<LocalForecast> {
        match self {
            WeatherSnapshot::LocalForecast(v) => Ok(v),
            other => Err(other.mismatch(FeedKind::LocalForecast)),
        }
    }

    pub fn into_nine_day_forecast(self) -> AppResult<NineDayForecast> {
        match self {
            WeatherSnapshot::NineDayForecast(v) => Ok(v),
            other => Err(other.mismatch(FeedKind::NineDayForecast)),
        }
    }

    pub fn into_current_report(self) -> AppResult<CurrentReport> {
        match self {
            WeatherSnapshot::CurrentReport(v) => Ok(v),
            other => Err(other.mismatch(FeedKind::CurrentReport)),
        }
    }

    pub fn into_warning_summary(self) -> AppResult<WarningSummary> {
        match self {
            WeatherSnapshot::WarningSummary(v) => Ok(v),
            other => Err(other.mismatch(FeedKind::WarningSummary)),
        }
    }

    pub fn into_warning_info(self) -> AppResult<WarningInfo> {
        match self {
            WeatherSnapshot::WarningInfo(v) => Ok(v),
            other => Err(other.mismatch(FeedKind::WarningInfo)),
        }
    }

    pub fn into_special_tips(self) -> AppResult<SpecialTips> {
        match self {
            WeatherSnapshot::SpecialTips(v) => Ok(v),
            other => Err(other.mismatch(FeedKind::SpecialTips)),
        }
    }
}

/// Source of weather snapshots.
#[async_trait]
pub trait WeatherFeed: Send + Sync {
    async fn fetch(&self, kind: FeedKind, locale: Locale) -> AppResult<WeatherSnapshot>;
}

/// HTTP client for the observatory open data API.
#[derive(Debug, Clone)]
pub struct HkoClient {
    http: reqwest::Client,
    base: Url,
}

impl HkoClient {
    pub fn new(base: &str, timeout: Duration) -> AppResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("hkobot/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            http,
            base: Url::parse(base)?,
        })
    }

    /// Client for `HKO_API_URL` with the configured request timeout.
    pub fn from_env() -> AppResult<Self> {
        Self::new(&config::HKO_API_URL, config::network::timeout())
    }

    pub fn endpoint(&self, kind: FeedKind, locale: Locale) -> Url {
        let mut url = self.base.clone();
        url.query_pairs_mut()
            .append_pair("dataType", kind.as_ref())
            .append_pair("lang", locale.feed_code());
        url
    }
}

#[async_trait]
impl WeatherFeed for HkoClient {
    async fn fetch(&self, kind: FeedKind, locale: Locale) -> AppResult<WeatherSnapshot> {
        let url = self.endpoint(kind, locale);
        log::debug!("Fetching {}", url);

        let response = self.http.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            log::warn!("Observatory answered {} for {} ({})", status, kind, locale);
            return Err(AppError::HttpStatus(status));
        }

        let body = response.text().await?;
        WeatherSnapshot::parse(kind, &body).inspect_err(|e| {
            log::warn!("Unparseable {} payload ({}): {}", kind, locale, e);
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_endpoint_query() {
        let client = HkoClient::new("https://example.org/weather.php", Duration::from_secs(1)).unwrap();
        let url = client.endpoint(FeedKind::WarningInfo, Locale::ZhHk);
        assert_eq!(url.as_str(), "https://example.org/weather.php?dataType=warningInfo&lang=tc");
    }

    #[test]
    fn test_invalid_base_is_rejected() {
        let err = HkoClient::new("not a url", Duration::from_secs(1)).unwrap_err();
        assert!(matches!(err, AppError::Url(_)));
    }

    #[test]
    fn test_snapshot_accessors() {
        let snapshot = WeatherSnapshot::parse(FeedKind::SpecialTips, r#"{"swt": ""}"#).unwrap();
        assert_eq!(snapshot.kind(), FeedKind::SpecialTips);
        assert!(snapshot.clone().into_current_report().is_err());
        assert_eq!(snapshot.into_special_tips().unwrap().swt, None);
    }

    #[test]
    fn test_parse_rejects_garbage() {
        let err = WeatherSnapshot::parse(FeedKind::LocalForecast, "<html>").unwrap_err();
        assert!(matches!(err, AppError::Json(_)));
    }
}
