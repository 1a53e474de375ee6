//! Actions bound to page ids
//!
//! Every page in the tree has exactly one [`Action`]: a button label, a
//! default body, and a handler that produces a [`Reply`] when the page is
//! visited. The [`ActionRegistry`] maps page ids to actions and is shared by
//! all concurrent handlers.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use futures_util::future::BoxFuture;
use futures_util::FutureExt;

use crate::core::AppResult;
use crate::menu::page::Viewer;

/// How a handler's text is delivered and which keyboard accompanies it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display, strum::EnumIter)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum ReplyStrategy {
    /// Send the text as a new message and refresh the anchor with the current page.
    NewMessage,
    NewMessageMarkdown,
    /// Send the text as a new message and pop the anchor back to the parent page.
    NewMessageAndBack,
    NewMessageAndBackMarkdown,
    /// Replace the anchor's text and keyboard in place.
    UpdateQuery,
    /// Keep the anchor's text, rebuild its keyboard from the parent page.
    RerenderQuery,
}

impl ReplyStrategy {
    pub fn is_markdown(self) -> bool {
        matches!(self, Self::NewMessageMarkdown | Self::NewMessageAndBackMarkdown)
    }

    pub fn sends_new_message(self) -> bool {
        matches!(
            self,
            Self::NewMessage | Self::NewMessageMarkdown | Self::NewMessageAndBack | Self::NewMessageAndBackMarkdown
        )
    }

    pub fn returns_to_parent(self) -> bool {
        matches!(self, Self::NewMessageAndBack | Self::NewMessageAndBackMarkdown)
    }
}

/// A handler's answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub strategy: ReplyStrategy,
    pub text: String,
    /// The viewer as it is after the handler ran, when the handler changed it.
    pub refreshed_viewer: Option<Viewer>,
}

impl Reply {
    pub fn new(strategy: ReplyStrategy, text: impl Into<String>) -> Self {
        Self {
            strategy,
            text: text.into(),
            refreshed_viewer: None,
        }
    }

    pub fn update(text: impl Into<String>) -> Self {
        Self::new(ReplyStrategy::UpdateQuery, text)
    }

    pub fn rerender() -> Self {
        Self::new(ReplyStrategy::RerenderQuery, String::new())
    }

    /// Labels rendered after this reply use `viewer` instead of the caller's snapshot.
    pub fn with_viewer(mut self, viewer: Viewer) -> Self {
        self.refreshed_viewer = Some(viewer);
        self
    }
}

/// The message an interaction is attached to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnchorRef {
    pub chat_id: i64,
    pub message_id: i32,
}

/// One user event: a command or a button press.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Interaction {
    pub viewer: Viewer,
    /// The menu message for button presses, the command message for `/start`.
    pub anchor: Option<AnchorRef>,
    /// Button callback payload.
    pub payload: Option<String>,
    pub raw_text: Option<String>,
}

impl Interaction {
    pub fn command(viewer: Viewer, anchor: Option<AnchorRef>, text: impl Into<String>) -> Self {
        Self {
            viewer,
            anchor,
            payload: None,
            raw_text: Some(text.into()),
        }
    }

    pub fn callback(viewer: Viewer, anchor: Option<AnchorRef>, payload: impl Into<String>) -> Self {
        Self {
            viewer,
            anchor,
            payload: Some(payload.into()),
            raw_text: None,
        }
    }

    pub fn chat_id(&self) -> i64 {
        self.anchor.map(|a| a.chat_id).unwrap_or(self.viewer.id)
    }
}

pub type TextFn = Arc<dyn Fn(&Viewer) -> String + Send + Sync>;
pub type Handler = Arc<dyn Fn(Interaction) -> BoxFuture<'static, AppResult<Reply>> + Send + Sync>;

/// Label, default body and handler for one page id.
#[derive(Clone)]
pub struct Action {
    id: String,
    label: TextFn,
    body: TextFn,
    handler: Option<Handler>,
    revision: Option<String>,
}

impl Action {
    pub fn new<L>(id: impl Into<String>, label: L) -> Self
    where
        L: Fn(&Viewer) -> String + Send + Sync + 'static,
    {
        let id = id.into();
        let placeholder = format!("Default message for [{}]", id);
        Self {
            id,
            label: Arc::new(label),
            body: Arc::new(move |_| placeholder.clone()),
            handler: None,
            revision: None,
        }
    }

    pub fn body(mut self, text: impl Into<String>) -> Self {
        let text = text.into();
        self.body = Arc::new(move |_| text.clone());
        self
    }

    pub fn body_with<B>(mut self, body: B) -> Self
    where
        B: Fn(&Viewer) -> String + Send + Sync + 'static,
    {
        self.body = Arc::new(body);
        self
    }

    pub fn handler<F, Fut>(mut self, handler: F) -> Self
    where
        F: Fn(Interaction) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = AppResult<Reply>> + Send + 'static,
    {
        self.handler = Some(Arc::new(move |interaction| handler(interaction).boxed()));
        self
    }

    /// Tags data-derived actions; re-registration with the same revision is a no-op.
    pub fn revision(mut self, revision: impl Into<String>) -> Self {
        self.revision = Some(revision.into());
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn label(&self, viewer: &Viewer) -> String {
        (self.label)(viewer)
    }

    pub fn default_body(&self, viewer: &Viewer) -> String {
        (self.body)(viewer)
    }

    pub fn current_revision(&self) -> Option<&str> {
        self.revision.as_deref()
    }

    /// Runs the handler, or answers with the default body in place.
    pub async fn handle(&self, interaction: Interaction) -> AppResult<Reply> {
        match &self.handler {
            Some(handler) => handler(interaction).await,
            None => Ok(Reply::update(self.default_body(&interaction.viewer))),
        }
    }
}

impl fmt::Debug for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Action")
            .field("id", &self.id)
            .field("custom_handler", &self.handler.is_some())
            .field("revision", &self.revision)
            .finish()
    }
}

/// Page id to action map.
#[derive(Debug, Default)]
pub struct ActionRegistry {
    actions: DashMap<String, Arc<Action>>,
}

impl ActionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds `action` to its id, replacing any previous binding.
    pub fn register(&self, action: Action) -> Arc<Action> {
        let action = Arc::new(action);
        if self.actions.insert(action.id.clone(), Arc::clone(&action)).is_some() {
            log::debug!("Replaced action '{}'", action.id);
        }
        action
    }

    pub fn register_all<I>(&self, actions: I)
    where
        I: IntoIterator<Item = Action>,
    {
        for action in actions {
            self.register(action);
        }
    }

    /// Registers a data-derived action unless one with the same revision exists.
    ///
    /// `build` runs under the map's shard lock and must not touch the registry.
    pub fn register_dynamic<F>(&self, id: &str, revision: &str, build: F) -> Arc<Action>
    where
        F: FnOnce() -> Action,
    {
        match self.actions.entry(id.to_string()) {
            Entry::Occupied(mut entry) => {
                if entry.get().current_revision() == Some(revision) {
                    return Arc::clone(entry.get());
                }
                let action = Arc::new(build().revision(revision));
                log::debug!("Refreshed dynamic action '{}' at revision {}", id, revision);
                entry.insert(Arc::clone(&action));
                action
            }
            Entry::Vacant(entry) => {
                let action = Arc::new(build().revision(revision));
                entry.insert(Arc::clone(&action));
                action
            }
        }
    }

    pub fn get(&self, id: &str) -> Option<Arc<Action>> {
        self.actions.get(id).map(|entry| Arc::clone(entry.value()))
    }

    /// The action bound to `id`.
    ///
    /// # Panics
    ///
    /// A page without an action means the menu was wired incorrectly.
    #[allow(clippy::panic)]
    pub fn resolve(&self, id: &str) -> Arc<Action> {
        match self.get(id) {
            Some(action) => action,
            None => {
                log::error!("No action registered for page '{}'", id);
                panic!("no action registered for page '{id}'");
            }
        }
    }

    pub fn contains(&self, id: &str) -> bool {
        self.actions.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }
}
