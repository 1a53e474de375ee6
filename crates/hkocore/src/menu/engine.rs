//! Navigation state machine
//!
//! The engine itself is immutable and shared. Per-interaction state is a
//! [`NavigationSession`]: a current-page pointer that starts at the root and
//! is moved by [`NavigationSession::travel_to`] before the current page's
//! action is run by [`NavigationSession::react`].

use std::sync::Arc;

use thiserror::Error;

use crate::i18n::{self, Locale};
use crate::menu::action::{ActionRegistry, Interaction, Reply, ReplyStrategy, TextFn};
use crate::menu::page::{LayoutContext, Page, PageGraph, Viewer};
use crate::menu::render::{Keyboard, Outbound, ReplyRenderer, BACK_MARKER};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NavigationError {
    /// The target id is not in the tree as laid out for this viewer.
    #[error("no page with id '{0}'")]
    NotFound(String),
}

/// Page tree, action registry and the back button label.
pub struct NavigationEngine {
    graph: PageGraph,
    registry: Arc<ActionRegistry>,
    back_label: TextFn,
}

impl NavigationEngine {
    pub fn new(graph: PageGraph, registry: Arc<ActionRegistry>) -> Self {
        Self {
            graph,
            registry,
            back_label: Arc::new(|viewer: &Viewer| i18n::t(viewer.locale(), "button-back")),
        }
    }

    pub fn with_back_label<F>(mut self, label: F) -> Self
    where
        F: Fn(&Viewer) -> String + Send + Sync + 'static,
    {
        self.back_label = Arc::new(label);
        self
    }

    pub fn graph(&self) -> &PageGraph {
        &self.graph
    }

    pub fn registry(&self) -> &Arc<ActionRegistry> {
        &self.registry
    }

    pub fn renderer(&self) -> ReplyRenderer<'_> {
        ReplyRenderer::new(&self.graph, &self.registry, &self.back_label)
    }

    /// A session positioned at the root.
    pub fn session(&self) -> NavigationSession<'_> {
        NavigationSession {
            engine: self,
            current: self.graph.root().clone(),
        }
    }

    pub fn build_markup_buttons(&self, page: &Page, viewer: &Viewer) -> Keyboard {
        self.renderer().build_markup_buttons(page, viewer)
    }

    /// Full handling of one interaction.
    ///
    /// Commands reset to the root and send a fresh menu; button presses
    /// travel to their payload and run its action.
    pub async fn handle(&self, interaction: &Interaction) -> Result<Vec<Outbound>, NavigationError> {
        let mut session = self.session();
        match interaction.payload.as_deref() {
            None => {
                session.go_home();
                let reply_to = interaction.anchor.map(|a| a.message_id);
                Ok(vec![session.reply_new(&interaction.viewer, interaction.chat_id(), reply_to)])
            }
            Some(payload) => {
                session.travel_to(payload, &interaction.viewer)?;
                Ok(session.react(interaction).await)
            }
        }
    }
}

/// Current page pointer for one interaction.
pub struct NavigationSession<'e> {
    engine: &'e NavigationEngine,
    current: Page,
}

impl<'e> NavigationSession<'e> {
    pub fn current(&self) -> &Page {
        &self.current
    }

    pub fn go_home(&mut self) {
        self.current = self.engine.graph.root().clone();
    }

    /// Moves to `target`. Back payloads land on the parent of the page they
    /// name, or the root; unknown ids leave the session where it was.
    pub fn travel_to(&mut self, target: &str, viewer: &Viewer) -> Result<&Page, NavigationError> {
        let ctx = LayoutContext::new(viewer);
        let graph = &self.engine.graph;

        if let Some(stripped) = target.strip_prefix(BACK_MARKER) {
            self.current = graph
                .find_parent(stripped, &ctx)
                .unwrap_or_else(|| graph.root().clone());
            log::debug!("Back from '{}' to '{}'", stripped, self.current.id());
            return Ok(&self.current);
        }

        match graph.find_page(target, &ctx) {
            Some(page) => {
                self.current = page;
                Ok(&self.current)
            }
            None => {
                log::debug!("Rejected navigation to unknown page '{}'", target);
                Err(NavigationError::NotFound(target.to_string()))
            }
        }
    }

    /// Runs the current page's action and renders its reply.
    pub async fn react(&self, interaction: &Interaction) -> Vec<Outbound> {
        let action = self.engine.registry.resolve(self.current.id());
        let reply = match action.handle(interaction.clone()).await {
            Ok(reply) => reply,
            Err(e) => {
                log::error!("Action '{}' failed for chat {}: {}", action.id(), interaction.chat_id(), e);
                Reply::new(ReplyStrategy::NewMessageAndBack, generic_error(interaction.viewer.locale()))
            }
        };

        let viewer = reply.refreshed_viewer.as_ref().unwrap_or(&interaction.viewer);
        let parent = self
            .engine
            .graph
            .find_parent(self.current.id(), &LayoutContext::new(viewer));
        self.engine
            .renderer()
            .render(&reply, &self.current, parent.as_ref(), interaction)
    }

    /// A fresh menu message for the current page.
    pub fn reply_new(&self, viewer: &Viewer, chat_id: i64, reply_to: Option<i32>) -> Outbound {
        self.engine
            .renderer()
            .reply_new(&self.current, viewer, chat_id, reply_to)
    }
}

fn generic_error(locale: Locale) -> String {
    i18n::t(locale, "error-generic")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::AppError;
    use crate::menu::action::{Action, AnchorRef};
    use crate::menu::render::{Button, Formatting};
    use crate::settings::ChatSettings;
    use pretty_assertions::assert_eq;

    fn viewer() -> Viewer {
        Viewer::new(3, ChatSettings::default())
    }

    fn engine() -> NavigationEngine {
        let graph = PageGraph::new(
            Page::new("landing")
                .item(Page::new("weather"))
                .item(Page::new("settings").item(Page::new("language")))
                .item(Page::new("broken")),
        );
        let registry = ActionRegistry::new();
        registry.register(Action::new("landing", |_| "Home".to_string()).body("Welcome"));
        registry.register(
            Action::new("weather", |_| "Weather".to_string())
                .handler(|_| async { Ok(Reply::new(ReplyStrategy::NewMessageAndBack, "23°C")) }),
        );
        registry.register(Action::new("settings", |_| "Settings".to_string()).body("Choose"));
        registry.register(Action::new("language", |_| "Language".to_string()));
        registry.register(
            Action::new("broken", |_| "Broken".to_string())
                .handler(|_| async { Err(AppError::Feed("offline".to_string())) }),
        );
        NavigationEngine::new(graph, Arc::new(registry)).with_back_label(|_| "Back".to_string())
    }

    fn press(payload: &str) -> Interaction {
        Interaction::callback(
            viewer(),
            Some(AnchorRef {
                chat_id: 3,
                message_id: 77,
            }),
            payload,
        )
    }

    #[test]
    fn test_session_starts_at_root() {
        let engine = engine();
        assert_eq!(engine.session().current().id(), "landing");
    }

    #[test]
    fn test_travel_to_unknown_keeps_position() {
        let engine = engine();
        let mut session = engine.session();
        session.travel_to("settings", &viewer()).unwrap();

        let err = session.travel_to("nowhere", &viewer()).unwrap_err();
        assert_eq!(err, NavigationError::NotFound("nowhere".to_string()));
        assert_eq!(session.current().id(), "settings");
    }

    #[test]
    fn test_back_lands_on_parent_of_named_page() {
        let engine = engine();
        let mut session = engine.session();

        session.travel_to("__back__:language", &viewer()).unwrap();
        assert_eq!(session.current().id(), "settings");

        session.travel_to("__back__:settings", &viewer()).unwrap();
        assert_eq!(session.current().id(), "landing");

        session.travel_to("__back__:landing", &viewer()).unwrap();
        assert_eq!(session.current().id(), "landing");

        session.travel_to("language", &viewer()).unwrap();
        session.travel_to("__back__:unknown", &viewer()).unwrap();
        assert_eq!(session.current().id(), "landing");
    }

    #[test]
    fn test_go_home_resets() {
        let engine = engine();
        let mut session = engine.session();
        session.travel_to("language", &viewer()).unwrap();
        session.go_home();
        assert_eq!(session.current().id(), "landing");
    }

    #[tokio::test]
    async fn test_failing_handler_becomes_error_message() {
        let engine = engine();
        let out = engine.handle(&press("broken")).await.unwrap();
        assert_eq!(out.len(), 2);
        match &out[0] {
            Outbound::SendNew { text, formatting, .. } => {
                assert_eq!(text, &i18n::t(Locale::EnUk, "error-generic"));
                assert_eq!(*formatting, Formatting::Plain);
            }
            other => panic!("expected send, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_failing_leaf_handler_restores_parent_menu() {
        let engine = engine();
        let out = engine.handle(&press("broken")).await.unwrap();
        assert_eq!(
            out[1],
            Outbound::EditExisting {
                chat_id: 3,
                message_id: 77,
                text: Some("Welcome".to_string()),
                keyboard: Some(vec![
                    vec![Button::new("Weather", "weather")],
                    vec![Button::new("Settings", "settings")],
                    vec![Button::new("Broken", "broken")],
                ]),
                formatting: Formatting::Plain,
            }
        );
    }

    #[tokio::test]
    async fn test_handle_command_sends_menu() {
        let engine = engine();
        let interaction = Interaction::command(
            viewer(),
            Some(AnchorRef {
                chat_id: 3,
                message_id: 12,
            }),
            "/start",
        );
        let out = engine.handle(&interaction).await.unwrap();
        assert_eq!(
            out,
            vec![Outbound::SendNew {
                chat_id: 3,
                text: "Welcome".to_string(),
                keyboard: Some(vec![
                    vec![Button::new("Weather", "weather")],
                    vec![Button::new("Settings", "settings")],
                    vec![Button::new("Broken", "broken")],
                ]),
                formatting: Formatting::Plain,
                reply_to: Some(12),
            }]
        );
    }

    #[tokio::test]
    async fn test_handle_rejects_unknown_payload() {
        let engine = engine();
        let err = engine.handle(&press("ghost")).await.unwrap_err();
        assert!(matches!(err, NavigationError::NotFound(id) if id == "ghost"));
    }

    #[tokio::test]
    async fn test_refreshed_viewer_drives_labels() {
        let graph = PageGraph::new(Page::new("landing").item(Page::new("settings").item(Page::new("language"))));
        let registry = ActionRegistry::new();
        registry.register(Action::new("landing", |_| "Home".to_string()));
        registry.register(Action::new("settings", |_| "Settings".to_string()));
        registry.register(
            Action::new("language", |v: &Viewer| format!("Language: {}", v.locale())).handler(|interaction| async move {
                let mut viewer = interaction.viewer.clone();
                viewer.settings.locale = viewer.settings.locale.toggled();
                Ok(Reply::rerender().with_viewer(viewer))
            }),
        );
        let engine = NavigationEngine::new(graph, Arc::new(registry)).with_back_label(|_| "Back".to_string());

        let out = engine.handle(&press("language")).await.unwrap();
        let keyboard = out[0].keyboard().unwrap();
        assert_eq!(keyboard[0], vec![Button::new("Language: zh-HK", "language")]);
    }
}
