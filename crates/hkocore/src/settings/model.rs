use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::i18n::Locale;
use crate::weather::model::Timestamp;

/// Per-chat preferences.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatSettings {
    #[serde(rename = "botLocale", default)]
    pub locale: Locale,
    #[serde(rename = "isNotificationEnabled", default = "enabled")]
    pub notifications_enabled: bool,
}

fn enabled() -> bool {
    true
}

impl Default for ChatSettings {
    fn default() -> Self {
        Self {
            locale: Locale::default(),
            notifications_enabled: true,
        }
    }
}

impl ChatSettings {
    pub fn with_locale(locale: Locale) -> Self {
        Self {
            locale,
            ..Self::default()
        }
    }
}

/// Process-wide state that survives restarts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppSettings {
    /// Warning statement code to the issue/update time last announced.
    #[serde(rename = "lastNotifiedWarnings", default)]
    pub last_notified_warnings: BTreeMap<String, Timestamp>,
}
