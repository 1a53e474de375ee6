//! Turns a handler reply into outbound message descriptors
//!
//! Rendering is pure: it reads the page tree and the registry and returns
//! [`Outbound`] values in the order the transport must dispatch them.

use crate::menu::action::{ActionRegistry, AnchorRef, Interaction, Reply, ReplyStrategy, TextFn};
use crate::menu::page::{LayoutContext, Page, PageGraph, Viewer};

/// Prefix of the back button payload; the rest is a page id.
pub const BACK_MARKER: &str = "__back__:";

/// One inline keyboard button.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Button {
    pub label: String,
    pub payload: String,
}

impl Button {
    pub fn new(label: impl Into<String>, payload: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            payload: payload.into(),
        }
    }
}

pub type Keyboard = Vec<Vec<Button>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Formatting {
    #[default]
    Plain,
    MarkdownV2,
}

/// A transport-agnostic instruction to send or edit a message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outbound {
    SendNew {
        chat_id: i64,
        text: String,
        keyboard: Option<Keyboard>,
        formatting: Formatting,
        reply_to: Option<i32>,
    },
    EditExisting {
        chat_id: i64,
        message_id: i32,
        /// `None` keeps the message text and only replaces the keyboard.
        text: Option<String>,
        keyboard: Option<Keyboard>,
        formatting: Formatting,
    },
}

impl Outbound {
    pub fn chat_id(&self) -> i64 {
        match self {
            Outbound::SendNew { chat_id, .. } | Outbound::EditExisting { chat_id, .. } => *chat_id,
        }
    }

    pub fn keyboard(&self) -> Option<&Keyboard> {
        match self {
            Outbound::SendNew { keyboard, .. } | Outbound::EditExisting { keyboard, .. } => keyboard.as_ref(),
        }
    }
}

/// Back payload pointing at `page_id`.
pub fn back_payload(page_id: &str) -> String {
    format!("{}{}", BACK_MARKER, page_id)
}

/// Builds keyboards and outbound descriptors.
pub struct ReplyRenderer<'a> {
    graph: &'a PageGraph,
    registry: &'a ActionRegistry,
    back_label: &'a TextFn,
}

impl<'a> ReplyRenderer<'a> {
    pub fn new(graph: &'a PageGraph, registry: &'a ActionRegistry, back_label: &'a TextFn) -> Self {
        Self {
            graph,
            registry,
            back_label,
        }
    }

    /// Child rows of `page` as buttons, plus a back row when it has a parent.
    pub fn build_markup_buttons(&self, page: &Page, viewer: &Viewer) -> Keyboard {
        let ctx = LayoutContext::new(viewer);
        let mut keyboard: Keyboard = page
            .layout(&ctx)
            .iter()
            .filter(|row| !row.is_empty())
            .map(|row| {
                row.iter()
                    .map(|child| Button::new(self.registry.resolve(child.id()).label(viewer), child.id()))
                    .collect()
            })
            .collect();

        if let Some(parent) = self.graph.find_parent(page.id(), &ctx) {
            keyboard.push(vec![Button::new((self.back_label)(viewer), back_payload(parent.id()))]);
        }
        keyboard
    }

    /// Fresh menu message showing `page`, used for `/start`.
    pub fn reply_new(&self, page: &Page, viewer: &Viewer, chat_id: i64, reply_to: Option<i32>) -> Outbound {
        Outbound::SendNew {
            chat_id,
            text: self.registry.resolve(page.id()).default_body(viewer),
            keyboard: non_empty(self.build_markup_buttons(page, viewer)),
            formatting: Formatting::Plain,
            reply_to,
        }
    }

    /// Descriptors for `reply` produced while `current` was the active page.
    pub fn render(
        &self,
        reply: &Reply,
        current: &Page,
        parent: Option<&Page>,
        interaction: &Interaction,
    ) -> Vec<Outbound> {
        let viewer = reply.refreshed_viewer.as_ref().unwrap_or(&interaction.viewer);
        let chat_id = interaction.chat_id();
        let formatting = if reply.strategy.is_markdown() {
            Formatting::MarkdownV2
        } else {
            Formatting::Plain
        };

        match reply.strategy {
            ReplyStrategy::NewMessage | ReplyStrategy::NewMessageMarkdown => vec![
                Outbound::SendNew {
                    chat_id,
                    text: reply.text.clone(),
                    keyboard: None,
                    formatting,
                    reply_to: None,
                },
                self.show_page(current, viewer, chat_id, interaction.anchor),
            ],
            ReplyStrategy::NewMessageAndBack | ReplyStrategy::NewMessageAndBackMarkdown => vec![
                Outbound::SendNew {
                    chat_id,
                    text: reply.text.clone(),
                    keyboard: None,
                    formatting,
                    reply_to: None,
                },
                self.show_page(parent.unwrap_or(current), viewer, chat_id, interaction.anchor),
            ],
            ReplyStrategy::UpdateQuery => {
                let keyboard = non_empty(self.build_markup_buttons(current, viewer));
                vec![self.edit_or_send(chat_id, interaction.anchor, Some(reply.text.clone()), keyboard)]
            }
            ReplyStrategy::RerenderQuery => {
                let shown = parent.unwrap_or(current);
                match interaction.anchor {
                    Some(anchor) => vec![Outbound::EditExisting {
                        chat_id: anchor.chat_id,
                        message_id: anchor.message_id,
                        text: None,
                        keyboard: non_empty(self.build_markup_buttons(shown, viewer)),
                        formatting: Formatting::Plain,
                    }],
                    None => {
                        log::debug!("Rerender without an anchor message for chat {}, sending a fresh menu", chat_id);
                        vec![self.show_page(shown, viewer, chat_id, None)]
                    }
                }
            }
        }
    }

    /// The anchor rewritten to `page`'s default body and keyboard.
    fn show_page(&self, page: &Page, viewer: &Viewer, chat_id: i64, anchor: Option<AnchorRef>) -> Outbound {
        let text = self.registry.resolve(page.id()).default_body(viewer);
        let keyboard = non_empty(self.build_markup_buttons(page, viewer));
        self.edit_or_send(chat_id, anchor, Some(text), keyboard)
    }

    fn edit_or_send(
        &self,
        chat_id: i64,
        anchor: Option<AnchorRef>,
        text: Option<String>,
        keyboard: Option<Keyboard>,
    ) -> Outbound {
        match anchor {
            Some(anchor) => Outbound::EditExisting {
                chat_id: anchor.chat_id,
                message_id: anchor.message_id,
                text,
                keyboard,
                formatting: Formatting::Plain,
            },
            None => Outbound::SendNew {
                chat_id,
                text: text.unwrap_or_default(),
                keyboard,
                formatting: Formatting::Plain,
                reply_to: None,
            },
        }
    }
}

fn non_empty(keyboard: Keyboard) -> Option<Keyboard> {
    if keyboard.is_empty() {
        None
    } else {
        Some(keyboard)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::menu::action::Action;
    use crate::settings::ChatSettings;
    use pretty_assertions::assert_eq;
    use std::sync::Arc;

    struct Fixture {
        graph: PageGraph,
        registry: ActionRegistry,
        back: TextFn,
    }

    impl Fixture {
        fn new() -> Self {
            let graph = PageGraph::new(
                Page::new("landing")
                    .item(Page::new("weather"))
                    .item(Page::new("settings").item(Page::new("language")))
                    .item(Page::new("about")),
            );
            let registry = ActionRegistry::new();
            registry.register(Action::new("landing", |_| "Home".to_string()).body("Welcome"));
            registry.register(Action::new("weather", |_| "Weather".to_string()));
            registry.register(Action::new("settings", |_| "Settings".to_string()).body("Pick one"));
            registry.register(Action::new("language", |_| "Language".to_string()));
            registry.register(Action::new("about", |_| "About".to_string()).body("v1.0"));
            Self {
                graph,
                registry,
                back: Arc::new(|_| "« Back".to_string()),
            }
        }

        fn renderer(&self) -> ReplyRenderer<'_> {
            ReplyRenderer::new(&self.graph, &self.registry, &self.back)
        }

        fn page(&self, id: &str) -> Page {
            let v = viewer();
            self.graph.find_page(id, &LayoutContext::new(&v)).unwrap()
        }
    }

    fn viewer() -> Viewer {
        Viewer::new(9, ChatSettings::default())
    }

    fn anchored(payload: &str) -> Interaction {
        Interaction::callback(
            viewer(),
            Some(AnchorRef {
                chat_id: 9,
                message_id: 100,
            }),
            payload,
        )
    }

    #[test]
    fn test_root_has_no_back_row() {
        let fx = Fixture::new();
        let keyboard = fx.renderer().build_markup_buttons(fx.graph.root(), &viewer());
        assert_eq!(
            keyboard,
            vec![
                vec![Button::new("Weather", "weather")],
                vec![Button::new("Settings", "settings")],
                vec![Button::new("About", "about")],
            ]
        );
    }

    #[test]
    fn test_child_gets_back_row() {
        let fx = Fixture::new();
        let keyboard = fx.renderer().build_markup_buttons(&fx.page("language"), &viewer());
        assert_eq!(keyboard, vec![vec![Button::new("« Back", "__back__:settings")]]);
    }

    #[test]
    fn test_update_query_edits_anchor() {
        let fx = Fixture::new();
        let out = fx.renderer().render(
            &Reply::update("v1.0"),
            &fx.page("about"),
            Some(fx.graph.root()),
            &anchored("about"),
        );
        assert_eq!(
            out,
            vec![Outbound::EditExisting {
                chat_id: 9,
                message_id: 100,
                text: Some("v1.0".to_string()),
                keyboard: Some(vec![vec![Button::new("« Back", "__back__:landing")]]),
                formatting: Formatting::Plain,
            }]
        );
    }

    #[test]
    fn test_new_message_and_back_pops_to_parent() {
        let fx = Fixture::new();
        let root = fx.graph.root().clone();
        let out = fx.renderer().render(
            &Reply::new(ReplyStrategy::NewMessageAndBackMarkdown, "*Sunny*"),
            &fx.page("weather"),
            Some(&root),
            &anchored("weather"),
        );
        assert_eq!(out.len(), 2);
        assert_eq!(
            out[0],
            Outbound::SendNew {
                chat_id: 9,
                text: "*Sunny*".to_string(),
                keyboard: None,
                formatting: Formatting::MarkdownV2,
                reply_to: None,
            }
        );
        match &out[1] {
            Outbound::EditExisting { text, keyboard, .. } => {
                assert_eq!(text.as_deref(), Some("Welcome"));
                assert_eq!(keyboard.as_ref().unwrap().len(), 3);
            }
            other => panic!("expected edit, got {:?}", other),
        }
    }

    #[test]
    fn test_new_message_keeps_current_page() {
        let fx = Fixture::new();
        let settings = fx.page("settings");
        let out = fx.renderer().render(
            &Reply::new(ReplyStrategy::NewMessage, "hello"),
            &settings,
            Some(fx.graph.root()),
            &anchored("settings"),
        );
        match &out[1] {
            Outbound::EditExisting { text, keyboard, .. } => {
                assert_eq!(text.as_deref(), Some("Pick one"));
                assert_eq!(keyboard.as_ref().unwrap()[0], vec![Button::new("Language", "language")]);
            }
            other => panic!("expected edit, got {:?}", other),
        }
    }

    #[test]
    fn test_rerender_uses_parent_keyboard_and_keeps_text() {
        let fx = Fixture::new();
        let settings = fx.page("settings");
        let out = fx.renderer().render(&Reply::rerender(), &fx.page("language"), Some(&settings), &anchored("language"));
        assert_eq!(
            out,
            vec![Outbound::EditExisting {
                chat_id: 9,
                message_id: 100,
                text: None,
                keyboard: Some(vec![
                    vec![Button::new("Language", "language")],
                    vec![Button::new("« Back", "__back__:landing")],
                ]),
                formatting: Formatting::Plain,
            }]
        );
    }

    #[test]
    fn test_empty_keyboard_is_omitted() {
        let graph = PageGraph::new(Page::new("solo"));
        let registry = ActionRegistry::new();
        registry.register(Action::new("solo", |_| "Solo".to_string()).body("alone"));
        let back: TextFn = Arc::new(|_| "Back".to_string());
        let renderer = ReplyRenderer::new(&graph, &registry, &back);

        let out = renderer.render(&Reply::update("alone"), graph.root(), None, &anchored("solo"));
        assert_eq!(out[0].keyboard(), None);
    }

    #[test]
    fn test_without_anchor_menu_is_sent_fresh() {
        let fx = Fixture::new();
        let interaction = Interaction::callback(viewer(), None, "about");
        let out = fx.renderer().render(&Reply::update("v1.0"), &fx.page("about"), None, &interaction);
        assert!(matches!(&out[0], Outbound::SendNew { text, .. } if text == "v1.0"));
    }

    #[test]
    fn test_rerender_without_anchor_sends_parent_menu() {
        let fx = Fixture::new();
        let settings = fx.page("settings");
        let interaction = Interaction::callback(viewer(), None, "language");
        let out = fx.renderer().render(&Reply::rerender(), &fx.page("language"), Some(&settings), &interaction);
        assert_eq!(
            out,
            vec![Outbound::SendNew {
                chat_id: 9,
                text: "Pick one".to_string(),
                keyboard: Some(vec![
                    vec![Button::new("Language", "language")],
                    vec![Button::new("« Back", "__back__:landing")],
                ]),
                formatting: Formatting::Plain,
                reply_to: None,
            }]
        );
    }

    #[test]
    fn test_reply_new_replies_to_command() {
        let fx = Fixture::new();
        let out = fx.renderer().reply_new(fx.graph.root(), &viewer(), 9, Some(5));
        match out {
            Outbound::SendNew {
                text,
                reply_to,
                keyboard,
                ..
            } => {
                assert_eq!(text, "Welcome");
                assert_eq!(reply_to, Some(5));
                assert_eq!(keyboard.unwrap().len(), 3);
            }
            other => panic!("expected send, got {:?}", other),
        }
    }
}
