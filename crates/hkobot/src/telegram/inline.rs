//! Inline mode: `@bot` in any chat offers the current weather report

use hkocore::weather::InlineArticle;
use teloxide::types::{InlineQueryResult, InlineQueryResultArticle, InputMessageContent, InputMessageContentText};

const CURRENT_WEATHER_RESULT_ID: &str = "current_weather";

/// Single article result that posts `article.text` when chosen.
pub fn to_inline_result(article: &InlineArticle) -> InlineQueryResult {
    let preview = article.text.lines().next().unwrap_or_default().to_string();
    InlineQueryResult::Article(
        InlineQueryResultArticle::new(
            CURRENT_WEATHER_RESULT_ID,
            article.title.clone(),
            InputMessageContent::Text(InputMessageContentText::new(article.text.clone())),
        )
        .description(preview),
    )
}
