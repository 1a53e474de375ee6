//! Inline-keyboard menu navigation
//!
//! - [`page`]: the page tree and its structural queries
//! - [`action`]: per-page labels, bodies and handlers
//! - [`render`]: reply strategies to outbound message descriptors
//! - [`engine`]: goHome / travel / react over a per-interaction session

pub mod action;
pub mod engine;
pub mod page;
pub mod render;

pub use action::{Action, ActionRegistry, AnchorRef, Interaction, Reply, ReplyStrategy};
pub use engine::{NavigationEngine, NavigationError, NavigationSession};
pub use page::{Layout, LayoutContext, Page, PageGraph, Viewer};
pub use render::{back_payload, Button, Formatting, Keyboard, Outbound, ReplyRenderer, BACK_MARKER};
