//! Dispatcher schema and handler chain builders

use hkocore::i18n::t;
use hkocore::menu::NavigationError;
use hkocore::weather::current_weather_article;
use teloxide::dispatching::{UpdateFilterExt, UpdateHandler};
use teloxide::prelude::*;
use teloxide::types::{InlineQuery, Message};

use crate::telegram::bot::Command;
use crate::telegram::inline::to_inline_result;
use crate::telegram::transport;
use crate::telegram::types::{HandlerDeps, HandlerError};

/// Creates the main dispatcher schema for the Telegram bot.
///
/// # Arguments
/// * `deps` - Handler dependencies (navigation engine, settings cache, weather cache)
///
/// # Returns
/// The complete handler tree for the bot
pub fn schema(deps: HandlerDeps) -> UpdateHandler<HandlerError> {
    let deps_commands = deps.clone();
    let deps_messages = deps.clone();
    let deps_callback = deps.clone();
    let deps_inline = deps;

    dptree::entry()
        .branch(command_handler(deps_commands))
        .branch(message_handler(deps_messages))
        .branch(callback_handler(deps_callback))
        .branch(inline_handler(deps_inline))
}

/// `/start`: a fresh menu message replying to the command.
fn command_handler(deps: HandlerDeps) -> UpdateHandler<HandlerError> {
    Update::filter_message().branch(dptree::entry().filter_command::<Command>().endpoint(
        move |bot: Bot, msg: Message, cmd: Command| {
            let deps = deps.clone();
            async move {
                log::info!("Received command: {:?} from chat {}", cmd, msg.chat.id);

                match cmd {
                    Command::Start => {
                        deps.ensure_chat(&msg).await;
                        let interaction = deps.command_interaction(&msg).await;
                        let outbound = deps.engine.handle(&interaction).await?;
                        transport::dispatch_all(&bot, &outbound).await?;
                    }
                }
                Ok(())
            }
        },
    ))
}

/// Any other text: point the user at /start.
fn message_handler(deps: HandlerDeps) -> UpdateHandler<HandlerError> {
    Update::filter_message()
        .filter(|msg: Message| msg.text().is_some())
        .endpoint(move |bot: Bot, msg: Message| {
            let deps = deps.clone();
            async move {
                let settings = deps.settings.get(msg.chat.id.0).await;
                bot.send_message(msg.chat.id, t(settings.locale, "hint-start")).await?;
                Ok(())
            }
        })
}

/// Button presses: travel, react, deliver, then acknowledge.
fn callback_handler(deps: HandlerDeps) -> UpdateHandler<HandlerError> {
    Update::filter_callback_query().endpoint(move |bot: Bot, q: CallbackQuery| {
        let deps = deps.clone();
        async move {
            let Some(interaction) = deps.callback_interaction(&q).await else {
                bot.answer_callback_query(q.id.clone()).await?;
                return Ok(());
            };

            let delivered = match deps.engine.handle(&interaction).await {
                Ok(outbound) => transport::dispatch_all(&bot, &outbound).await,
                Err(NavigationError::NotFound(target)) => {
                    log::debug!("Stale button '{}' pressed in chat {}", target, interaction.chat_id());
                    Ok(())
                }
            };

            bot.answer_callback_query(q.id.clone()).await?;
            delivered.map_err(|e| Box::new(e) as HandlerError)
        }
    })
}

/// Inline mode: one article with the current weather report.
fn inline_handler(deps: HandlerDeps) -> UpdateHandler<HandlerError> {
    Update::filter_inline_query().endpoint(move |bot: Bot, q: InlineQuery| {
        let deps = deps.clone();
        async move {
            let locale = deps.inline_locale(&q).await;
            log::debug!("Inline query from user {} ({})", q.from.id, locale);

            let article = current_weather_article(&deps.weather, locale).await;
            bot.answer_inline_query(q.id.clone(), vec![to_inline_result(&article)])
                .is_personal(true)
                .await?;
            Ok(())
        }
    })
}
