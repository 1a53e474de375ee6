//! The bot's menu: page tree and actions over the weather collaborators

use std::sync::Arc;

use fluent_templates::fluent_bundle::FluentArgs;

use crate::core::config;
use crate::core::{escape_markdown, AppResult};
use crate::i18n::{t, t_arg, t_args, Locale};
use crate::menu::{Action, ActionRegistry, Interaction, NavigationEngine, Page, PageGraph, Reply, ReplyStrategy, Viewer};
use crate::settings::SettingsCache;
use crate::weather::board::WarningBoard;
use crate::weather::cache::WeatherCache;
use crate::weather::compose;
use crate::weather::model::ActiveWarning;

/// Page ids. Also the callback payloads of their buttons.
pub mod ids {
    pub const LANDING: &str = "landing";
    pub const CURRENT_WEATHER: &str = "current_weather";
    pub const GENERAL_WEATHER: &str = "general_weather";
    pub const NINE_DAY_FORECAST: &str = "9_day_forecast";
    pub const WARNINGS: &str = "warnings";
    pub const OTHERS: &str = "others";
    pub const SPECIAL_TIPS: &str = "special_tips";
    pub const SETTINGS: &str = "settings";
    pub const NOTIFICATION: &str = "notification";
    pub const LANGUAGE: &str = "language";
    pub const ABOUT: &str = "about";
    pub const WARNING_PREFIX: &str = "warning:";

    pub fn warning(statement: &str) -> String {
        format!("{}{}", WARNING_PREFIX, statement)
    }
}

/// Collaborators the weather actions read from.
#[derive(Clone)]
pub struct WeatherMenu {
    pub weather: Arc<WeatherCache>,
    pub board: Arc<WarningBoard>,
    pub settings: Arc<SettingsCache>,
    pub bot_name: String,
}

impl WeatherMenu {
    pub fn new(weather: Arc<WeatherCache>, board: Arc<WarningBoard>, settings: Arc<SettingsCache>) -> Self {
        Self {
            weather,
            board,
            settings,
            bot_name: config::BOT_NAME.clone(),
        }
    }

    pub fn with_bot_name(mut self, name: impl Into<String>) -> Self {
        self.bot_name = name.into();
        self
    }

    /// Builds the navigation engine for the weather menu.
    pub fn build_engine(&self) -> NavigationEngine {
        let registry = Arc::new(ActionRegistry::new());
        registry.register_all(self.static_actions());
        let graph = PageGraph::new(self.landing_page(Arc::clone(&registry)));
        NavigationEngine::new(graph, registry)
    }

    fn landing_page(&self, registry: Arc<ActionRegistry>) -> Page {
        let board = Arc::clone(&self.board);
        let warnings = self.warnings_page(registry);
        let others = Page::new(ids::OTHERS).item(Page::new(ids::SPECIAL_TIPS));
        let settings = Page::new(ids::SETTINGS)
            .item(Page::new(ids::NOTIFICATION))
            .item(Page::new(ids::LANGUAGE));

        Page::dynamic(ids::LANDING, move |ctx| {
            let mut rows = vec![
                vec![Page::new(ids::CURRENT_WEATHER)],
                vec![Page::new(ids::GENERAL_WEATHER)],
                vec![Page::new(ids::NINE_DAY_FORECAST)],
            ];
            if board.has_active(ctx.viewer.locale()) {
                rows.push(vec![warnings.clone()]);
            }
            rows.push(vec![others.clone()]);
            rows.push(vec![settings.clone()]);
            rows.push(vec![Page::new(ids::ABOUT)]);
            rows
        })
    }

    /// One child per warning in force; their actions are registered here.
    fn warnings_page(&self, registry: Arc<ActionRegistry>) -> Page {
        let menu = self.clone();
        Page::dynamic(ids::WARNINGS, move |ctx| {
            menu.board
                .active(ctx.viewer.locale())
                .iter()
                .map(|warning| {
                    let id = ids::warning(&warning.statement);
                    registry.register_dynamic(&id, &warning.revision(), || menu.warning_action(warning.clone()));
                    vec![Page::new(id)]
                })
                .collect()
        })
    }

    fn warning_action(&self, snapshot: ActiveWarning) -> Action {
        let board = Arc::clone(&self.board);
        let weather = Arc::clone(&self.weather);
        let statement = snapshot.statement.clone();
        let label_snapshot = snapshot.clone();

        Action::new(ids::warning(&statement), move |viewer: &Viewer| {
            board
                .find(viewer.locale(), &label_snapshot.statement)
                .map(|w| w.name)
                .unwrap_or_else(|| label_snapshot.name.clone())
        })
        .handler(move |interaction: Interaction| {
            let weather = Arc::clone(&weather);
            let snapshot = snapshot.clone();
            async move {
                let locale = interaction.viewer.locale();
                let info = match weather.warning_info(locale).await {
                    Ok(info) => Some(info),
                    Err(e) => {
                        log::warn!("Warning details unavailable: {}", e);
                        None
                    }
                };
                Ok(Reply::new(
                    ReplyStrategy::NewMessageAndBack,
                    compose::warning_detail(&snapshot, info.as_ref(), locale),
                ))
            }
        })
    }

    fn static_actions(&self) -> Vec<Action> {
        let name = self.bot_name.clone();
        vec![
            Action::new(ids::LANDING, |_| String::new()).body_with({
                let name = name.clone();
                move |viewer| t_arg(viewer.locale(), "landing-body", "name", name.clone())
            }),
            self.current_weather(),
            self.general_weather(),
            self.nine_day_forecast(),
            self.warnings(),
            Action::new(ids::OTHERS, |viewer: &Viewer| t(viewer.locale(), "button-others"))
                .body_with(|viewer| t(viewer.locale(), "others-body")),
            self.special_tips(),
            Action::new(ids::SETTINGS, |viewer: &Viewer| t(viewer.locale(), "button-settings"))
                .body_with(|viewer| t(viewer.locale(), "settings-body")),
            self.notification_toggle(),
            self.language_toggle(),
            Action::new(ids::ABOUT, {
                let name = name.clone();
                move |viewer: &Viewer| t_arg(viewer.locale(), "button-about", "name", name.clone())
            })
            .body_with(move |viewer| {
                let mut args = FluentArgs::new();
                args.set("name", name.clone());
                args.set("version", config::VERSION);
                t_args(viewer.locale(), "about-body", &args)
            }),
        ]
    }

    fn current_weather(&self) -> Action {
        let weather = Arc::clone(&self.weather);
        Action::new(ids::CURRENT_WEATHER, |viewer: &Viewer| {
            t(viewer.locale(), "button-current-weather")
        })
        .handler(move |interaction: Interaction| {
            let weather = Arc::clone(&weather);
            async move {
                let locale = interaction.viewer.locale();
                let text = weather
                    .current_report(locale)
                    .await
                    .map(|report| compose::current_weather(&report, locale));
                Ok(Reply::new(ReplyStrategy::NewMessageAndBack, or_unavailable(text, locale)))
            }
        })
    }

    fn general_weather(&self) -> Action {
        let weather = Arc::clone(&self.weather);
        Action::new(ids::GENERAL_WEATHER, |viewer: &Viewer| {
            t(viewer.locale(), "button-general-weather")
        })
        .handler(move |interaction: Interaction| {
            let weather = Arc::clone(&weather);
            async move {
                let locale = interaction.viewer.locale();
                let text = weather
                    .local_forecast(locale)
                    .await
                    .map(|flw| compose::general_situation(&flw, locale));
                Ok(Reply::new(
                    ReplyStrategy::NewMessageAndBackMarkdown,
                    or_unavailable_markdown(text, locale),
                ))
            }
        })
    }

    fn nine_day_forecast(&self) -> Action {
        let weather = Arc::clone(&self.weather);
        Action::new(ids::NINE_DAY_FORECAST, |viewer: &Viewer| {
            t(viewer.locale(), "button-nine-day-forecast")
        })
        .handler(move |interaction: Interaction| {
            let weather = Arc::clone(&weather);
            async move {
                let locale = interaction.viewer.locale();
                let text = weather
                    .nine_day_forecast(locale)
                    .await
                    .map(|fnd| compose::nine_day_forecast(&fnd, locale));
                Ok(Reply::new(
                    ReplyStrategy::NewMessageAndBackMarkdown,
                    or_unavailable_markdown(text, locale),
                ))
            }
        })
    }

    fn warnings(&self) -> Action {
        let weather = Arc::clone(&self.weather);
        let board = Arc::clone(&self.board);
        Action::new(ids::WARNINGS, |viewer: &Viewer| t(viewer.locale(), "button-warnings"))
            .body_with({
                let board = Arc::clone(&board);
                move |viewer| compose::warnings_overview(&board.active(viewer.locale()), viewer.locale())
            })
            .handler(move |interaction: Interaction| {
                let weather = Arc::clone(&weather);
                let board = Arc::clone(&board);
                async move {
                    let locale = interaction.viewer.locale();
                    let warnings = match board.refresh(&weather, locale).await {
                        Ok(warnings) => warnings,
                        Err(e) => {
                            log::warn!("Serving stale warnings for {}: {}", locale, e);
                            board.active(locale)
                        }
                    };
                    Ok(Reply::update(compose::warnings_overview(&warnings, locale)))
                }
            })
    }

    fn special_tips(&self) -> Action {
        let weather = Arc::clone(&self.weather);
        Action::new(ids::SPECIAL_TIPS, |viewer: &Viewer| t(viewer.locale(), "button-special-tips")).handler(
            move |interaction: Interaction| {
                let weather = Arc::clone(&weather);
                async move {
                    let locale = interaction.viewer.locale();
                    let text = weather
                        .special_tips(locale)
                        .await
                        .map(|tips| compose::special_tips(&tips, locale));
                    Ok(Reply::new(ReplyStrategy::NewMessageAndBack, or_unavailable(text, locale)))
                }
            },
        )
    }

    fn notification_toggle(&self) -> Action {
        let settings = Arc::clone(&self.settings);
        Action::new(ids::NOTIFICATION, |viewer: &Viewer| {
            let state = if viewer.settings.notifications_enabled {
                "state-on"
            } else {
                "state-off"
            };
            t_arg(viewer.locale(), "button-notification", "state", t(viewer.locale(), state))
        })
        .body_with(|viewer| t(viewer.locale(), "notification-body"))
        .handler(move |interaction: Interaction| {
            let settings = Arc::clone(&settings);
            async move {
                let chat_id = interaction.viewer.id;
                let updated = settings
                    .update(chat_id, |s| s.notifications_enabled = !s.notifications_enabled)
                    .await?;
                log::info!("Chat {} notifications {}", chat_id, updated.notifications_enabled);
                Ok(Reply::rerender().with_viewer(Viewer::new(chat_id, updated)))
            }
        })
    }

    fn language_toggle(&self) -> Action {
        let settings = Arc::clone(&self.settings);
        Action::new(ids::LANGUAGE, |viewer: &Viewer| {
            let language = match viewer.locale() {
                Locale::ZhHk => "language-chinese",
                Locale::EnUk => "language-english",
            };
            t_arg(viewer.locale(), "button-language", "language", t(viewer.locale(), language))
        })
        .body_with(|viewer| t(viewer.locale(), "language-body"))
        .handler(move |interaction: Interaction| {
            let settings = Arc::clone(&settings);
            async move {
                let chat_id = interaction.viewer.id;
                let updated = settings.update(chat_id, |s| s.locale = s.locale.toggled()).await?;
                log::info!("Chat {} switched to {}", chat_id, updated.locale);
                Ok(Reply::rerender().with_viewer(Viewer::new(chat_id, updated)))
            }
        })
    }
}

/// Title and text of an inline-mode answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InlineArticle {
    pub title: String,
    pub text: String,
}

/// The current weather report, offered when the bot is used inline.
pub async fn current_weather_article(weather: &WeatherCache, locale: Locale) -> InlineArticle {
    let text = weather
        .current_report(locale)
        .await
        .map(|report| compose::current_weather(&report, locale));
    InlineArticle {
        title: t(locale, "button-current-weather"),
        text: or_unavailable(text, locale),
    }
}

fn or_unavailable(text: AppResult<String>, locale: Locale) -> String {
    text.unwrap_or_else(|e| {
        log::warn!("Weather data unavailable ({}): {}", locale, e);
        t(locale, "error-data-unavailable")
    })
}

fn or_unavailable_markdown(text: AppResult<String>, locale: Locale) -> String {
    text.unwrap_or_else(|e| {
        log::warn!("Weather data unavailable ({}): {}", locale, e);
        escape_markdown(&t(locale, "error-data-unavailable"))
    })
}
