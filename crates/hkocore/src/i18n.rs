use std::collections::HashMap;

use fluent_templates::{
    fluent_bundle::{FluentArgs, FluentValue},
    static_loader, Loader,
};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use unic_langid::LanguageIdentifier;

static_loader! {
    static LOCALES = {
        locales: "./locales",
        fallback_language: "en-GB",
        // Telegram renders the bidi isolation marks as visible garbage.
        customise: |bundle| bundle.set_use_isolating(false),
    };
}

/// Languages a chat can switch between.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Default,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumIter,
    strum::EnumString,
)]
pub enum Locale {
    #[serde(rename = "ZH_HK")]
    #[strum(serialize = "zh-HK")]
    ZhHk,
    #[default]
    #[serde(rename = "EN_UK")]
    #[strum(serialize = "en-GB")]
    EnUk,
}

static ZH_HK: Lazy<LanguageIdentifier> = Lazy::new(|| "zh-HK".parse().unwrap_or_default());
static EN_GB: Lazy<LanguageIdentifier> = Lazy::new(|| "en-GB".parse().unwrap_or_default());

impl Locale {
    /// Fluent language identifier for this locale.
    pub fn lang_id(self) -> &'static LanguageIdentifier {
        match self {
            Locale::ZhHk => &ZH_HK,
            Locale::EnUk => &EN_GB,
        }
    }

    /// Language code understood by the observatory feed.
    pub fn feed_code(self) -> &'static str {
        match self {
            Locale::ZhHk => "tc",
            Locale::EnUk => "en",
        }
    }

    /// The other locale; the language button flips between the two.
    pub fn toggled(self) -> Locale {
        match self {
            Locale::ZhHk => Locale::EnUk,
            Locale::EnUk => Locale::ZhHk,
        }
    }

    /// Maps a Telegram `language_code` ("zh-hant", "en-US", ...) to a locale.
    pub fn from_telegram_code(code: &str) -> Option<Locale> {
        let normalized = code.split('-').next().unwrap_or(code).to_lowercase();
        match normalized.as_str() {
            "zh" => Some(Locale::ZhHk),
            "en" => Some(Locale::EnUk),
            _ => None,
        }
    }
}

/// Returns a localized string for the given key.
/// Converts literal `\n` sequences to actual newlines for proper Telegram formatting.
pub fn t(locale: Locale, key: &str) -> String {
    let text = LOCALES
        .lookup(locale.lang_id(), key)
        .unwrap_or_else(|| LOCALES.lookup(&EN_GB, key).unwrap_or_else(|| key.to_string()));
    text.replace("\\n", "\n")
}

/// Returns a localized string with arguments for interpolation.
/// Converts literal `\n` sequences to actual newlines for proper Telegram formatting.
pub fn t_args(locale: Locale, key: &str, args: &FluentArgs) -> String {
    let args_map: HashMap<String, FluentValue> = args.iter().map(|(k, v)| (k.to_string(), v.clone())).collect();

    let text = LOCALES
        .lookup_with_args(locale.lang_id(), key, &args_map)
        .unwrap_or_else(|| {
            LOCALES
                .lookup_with_args(&EN_GB, key, &args_map)
                .unwrap_or_else(|| key.to_string())
        });
    text.replace("\\n", "\n")
}

/// Shorthand for the common single-argument lookup.
pub fn t_arg(locale: Locale, key: &str, name: &'static str, value: impl Into<String>) -> String {
    let mut args = FluentArgs::new();
    args.set(name, value.into());
    t_args(locale, key, &args)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn loads_known_translation() {
        assert_eq!(t(Locale::ZhHk, "button-current-weather"), "天氣報告");
        assert_eq!(t(Locale::EnUk, "button-current-weather"), "Current Weather");
    }

    #[test]
    fn interpolates_without_isolation_marks() {
        let text = t_arg(Locale::EnUk, "button-about", "name", "HKO Weather");
        assert_eq!(text, "About HKO Weather");
    }

    #[test]
    fn converts_newlines() {
        let mut args = FluentArgs::new();
        args.set("name", "Bot");
        args.set("version", "1.0");
        let text = t_args(Locale::EnUk, "about-body", &args);

        assert!(text.contains('\n'));
        assert!(!text.contains("\\n"));
    }

    #[test]
    fn unknown_key_falls_back_to_key() {
        assert_eq!(t(Locale::ZhHk, "no-such-key"), "no-such-key");
    }

    #[test]
    fn test_locale_codes() {
        assert_eq!(Locale::ZhHk.feed_code(), "tc");
        assert_eq!(Locale::EnUk.feed_code(), "en");
        assert_eq!(Locale::ZhHk.toggled(), Locale::EnUk);
        assert_eq!(Locale::default(), Locale::EnUk);
        assert_eq!(Locale::EnUk.to_string(), "en-GB");
    }

    #[test]
    fn test_from_telegram_code() {
        assert_eq!(Locale::from_telegram_code("zh-hant"), Some(Locale::ZhHk));
        assert_eq!(Locale::from_telegram_code("en-US"), Some(Locale::EnUk));
        assert_eq!(Locale::from_telegram_code("EN"), Some(Locale::EnUk));
        assert_eq!(Locale::from_telegram_code("ru"), None);
    }

    #[test]
    fn test_locale_serde_matches_persisted_names() {
        assert_eq!(serde_json::to_string(&Locale::ZhHk).unwrap(), "\"ZH_HK\"");
        let parsed: Locale = serde_json::from_str("\"EN_UK\"").unwrap();
        assert_eq!(parsed, Locale::EnUk);
    }
}
