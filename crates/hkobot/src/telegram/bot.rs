//! Bot initialization and command setup

use hkocore::core::config;
use hkocore::i18n::{t, Locale};
use reqwest::ClientBuilder;
use strum::IntoEnumIterator;
use teloxide::prelude::*;
use teloxide::types::BotCommand;
use teloxide::utils::command::BotCommands;

/// Bot commands enum with descriptions
#[derive(BotCommands, Clone, Debug, PartialEq, Eq)]
#[command(rename_rule = "lowercase", description = "Available commands:")]
pub enum Command {
    #[command(description = "open the weather menu")]
    Start,
}

/// Creates a Bot instance with custom or default API URL
///
/// # Returns
/// * `Ok(Bot)` - Successfully created bot instance
/// * `Err(anyhow::Error)` - Missing token or invalid API URL
pub fn create_bot() -> anyhow::Result<Bot> {
    if config::BOT_TOKEN.is_empty() {
        return Err(anyhow::anyhow!("BOT_TOKEN environment variable not set"));
    }
    let client = ClientBuilder::new().timeout(config::network::timeout()).build()?;
    let bot = Bot::with_client(config::BOT_TOKEN.as_str(), client);

    // Check if local Bot API server is configured
    let bot = if let Ok(bot_api_url) = std::env::var("BOT_API_URL") {
        log::info!("Using custom Bot API URL: {}", bot_api_url);
        let url = url::Url::parse(&bot_api_url).map_err(|e| anyhow::anyhow!("Invalid BOT_API_URL: {}", e))?;
        bot.set_api_url(url)
    } else {
        bot
    };

    Ok(bot)
}

/// Telegram language code the command list is registered under.
fn command_language(locale: Locale) -> &'static str {
    match locale {
        Locale::ZhHk => "zh",
        Locale::EnUk => "en",
    }
}

/// Registers the command list in every supported language, plus the default list.
pub async fn setup_bot_commands(bot: &Bot) -> Result<(), teloxide::RequestError> {
    bot.set_my_commands(vec![BotCommand::new(
        "start",
        t(Locale::default(), "command-start"),
    )])
    .await?;

    for locale in Locale::iter() {
        bot.set_my_commands(vec![BotCommand::new("start", t(locale, "command-start"))])
            .language_code(command_language(locale))
            .await?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_start_command() {
        assert_eq!(Command::parse("/start", "hko_bot").unwrap(), Command::Start);
        assert_eq!(Command::parse("/start@hko_bot", "hko_bot").unwrap(), Command::Start);
        assert!(Command::parse("/weather", "hko_bot").is_err());
    }

    #[test]
    fn test_command_languages() {
        assert_eq!(command_language(Locale::ZhHk), "zh");
        assert_eq!(command_language(Locale::EnUk), "en");
    }
}
