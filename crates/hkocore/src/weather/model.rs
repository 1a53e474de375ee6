//! Observatory open data payloads
//!
//! Every field is optional. The feed sends `""` where an object or array is
//! absent, so every field goes through [`empty_as_none`].

use std::collections::BTreeMap;

use chrono::{DateTime, FixedOffset};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

pub type Timestamp = DateTime<FixedOffset>;

/// Action codes of a warning that is still in force.
pub const ACTIVE_ACTION_CODES: [&str; 4] = ["ISSUE", "REISSUE", "EXTEND", "UPDATE"];

/// `null`, a missing key and `""` all deserialize to `None`.
fn empty_as_none<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    match Value::deserialize(deserializer)? {
        Value::Null => Ok(None),
        Value::String(s) if s.is_empty() => Ok(None),
        other => T::deserialize(other).map(Some).map_err(serde::de::Error::custom),
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ValueUnit {
    #[serde(default, deserialize_with = "empty_as_none")]
    pub value: Option<f64>,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub unit: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct PlaceValue {
    #[serde(default, deserialize_with = "empty_as_none")]
    pub place: Option<String>,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub value: Option<f64>,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub unit: Option<String>,
}

/// `flw`: local weather forecast.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocalForecast {
    #[serde(default, deserialize_with = "empty_as_none")]
    pub general_situation: Option<String>,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub tc_info: Option<String>,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub fire_danger_warning: Option<String>,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub forecast_period: Option<String>,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub forecast_desc: Option<String>,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub outlook: Option<String>,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub update_time: Option<Timestamp>,
}

/// `fnd`: nine-day forecast.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NineDayForecast {
    #[serde(default, deserialize_with = "empty_as_none")]
    pub general_situation: Option<String>,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub weather_forecast: Option<Vec<DailyForecast>>,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub update_time: Option<Timestamp>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyForecast {
    /// `yyyyMMdd`
    #[serde(default, deserialize_with = "empty_as_none")]
    pub forecast_date: Option<String>,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub week: Option<String>,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub forecast_wind: Option<String>,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub forecast_weather: Option<String>,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub forecast_maxtemp: Option<ValueUnit>,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub forecast_mintemp: Option<ValueUnit>,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub forecast_maxrh: Option<ValueUnit>,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub forecast_minrh: Option<ValueUnit>,
}

/// `rhrread`: current weather report.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CurrentReport {
    #[serde(default, deserialize_with = "empty_as_none")]
    pub temperature: Option<Readings>,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub humidity: Option<Readings>,
    #[serde(default, rename = "uvindex", deserialize_with = "empty_as_none")]
    pub uv_index: Option<UvIndex>,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub warning_message: Option<Vec<String>>,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub special_wx_tips: Option<Vec<String>>,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub update_time: Option<Timestamp>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Readings {
    #[serde(default, deserialize_with = "empty_as_none")]
    pub data: Option<Vec<PlaceValue>>,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub record_time: Option<Timestamp>,
}

impl Readings {
    /// Reading for `place`, or the first reading when no place matches.
    pub fn at(&self, place: &str) -> Option<&PlaceValue> {
        let data = self.data.as_ref()?;
        data.iter()
            .find(|r| r.place.as_deref() == Some(place))
            .or_else(|| data.first())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UvIndex {
    #[serde(default, deserialize_with = "empty_as_none")]
    pub data: Option<Vec<UvReading>>,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub record_desc: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct UvReading {
    #[serde(default, deserialize_with = "empty_as_none")]
    pub place: Option<String>,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub value: Option<f64>,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub desc: Option<String>,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub message: Option<String>,
}

/// `warnsum`: warning statement code to its latest entry.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(transparent)]
pub struct WarningSummary(pub BTreeMap<String, WarningEntry>);

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WarningEntry {
    #[serde(default, deserialize_with = "empty_as_none")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub code: Option<String>,
    #[serde(default, rename = "type", deserialize_with = "empty_as_none")]
    pub kind: Option<String>,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub action_code: Option<String>,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub issue_time: Option<Timestamp>,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub update_time: Option<Timestamp>,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub expire_time: Option<Timestamp>,
}

impl WarningEntry {
    pub fn is_active(&self) -> bool {
        self.action_code
            .as_deref()
            .is_some_and(|code| ACTIVE_ACTION_CODES.contains(&code))
    }
}

impl WarningSummary {
    /// Warnings still in force, ordered by statement code.
    pub fn active(&self) -> Vec<ActiveWarning> {
        self.0
            .iter()
            .filter(|(_, entry)| entry.is_active())
            .map(|(statement, entry)| ActiveWarning {
                statement: statement.clone(),
                code: entry.code.clone(),
                name: entry.name.clone().unwrap_or_else(|| statement.clone()),
                action_code: entry.action_code.clone().unwrap_or_default(),
                issued_at: entry.issue_time,
                updated_at: entry.update_time,
            })
            .collect()
    }
}

/// A warning in force, flattened out of the summary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveWarning {
    /// Statement code such as `WRAIN`; stable while the warning lasts.
    pub statement: String,
    /// Subtype such as `WRAINA`.
    pub code: Option<String>,
    pub name: String,
    pub action_code: String,
    pub issued_at: Option<Timestamp>,
    pub updated_at: Option<Timestamp>,
}

impl ActiveWarning {
    pub fn last_change(&self) -> Option<Timestamp> {
        self.updated_at.or(self.issued_at)
    }

    /// Changes whenever the observatory reissues or updates the warning.
    pub fn revision(&self) -> String {
        format!(
            "{}@{}",
            self.code.as_deref().unwrap_or(&self.statement),
            self.last_change().map(|t| t.to_rfc3339()).unwrap_or_default()
        )
    }
}

/// `warningInfo`: detailed statements for warnings in force.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct WarningInfo {
    #[serde(default, deserialize_with = "empty_as_none")]
    pub details: Option<Vec<WarningDetail>>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WarningDetail {
    #[serde(default, deserialize_with = "empty_as_none")]
    pub contents: Option<Vec<String>>,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub warning_statement_code: Option<String>,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub subtype: Option<String>,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub update_time: Option<Timestamp>,
}

impl WarningInfo {
    pub fn detail_for(&self, statement: &str) -> Option<&WarningDetail> {
        self.details
            .as_ref()?
            .iter()
            .find(|d| d.warning_statement_code.as_deref() == Some(statement))
    }
}

/// `swt`: special weather tips.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct SpecialTips {
    #[serde(default, deserialize_with = "empty_as_none")]
    pub swt: Option<Vec<Tip>>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tip {
    #[serde(default, deserialize_with = "empty_as_none")]
    pub desc: Option<String>,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub update_time: Option<Timestamp>,
}
