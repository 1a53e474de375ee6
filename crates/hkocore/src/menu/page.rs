//! Page tree for the inline menu
//!
//! A [`Page`] is a node with an id and a layout: rows of child pages. The
//! layout is computed on every call so dynamic pages can reflect live data.
//! [`PageGraph`] answers the three structural queries the navigation engine
//! needs: find a page, find its parent, compute its current layout.

use std::fmt;
use std::sync::Arc;

use crate::settings::ChatSettings;

/// Ids nest at most this deep; anything deeper is treated as a cycle.
const MAX_DEPTH: usize = 16;

/// Who the menu is being rendered for.
///
/// Carries the chat's settings snapshot so labels and layouts stay pure
/// functions of the viewer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Viewer {
    pub id: i64,
    pub settings: ChatSettings,
}

impl Viewer {
    pub fn new(id: i64, settings: ChatSettings) -> Self {
        Self { id, settings }
    }

    pub fn locale(&self) -> crate::i18n::Locale {
        self.settings.locale
    }
}

/// Everything a layout function may look at.
#[derive(Debug, Clone, Copy)]
pub struct LayoutContext<'a> {
    pub viewer: &'a Viewer,
}

impl<'a> LayoutContext<'a> {
    pub fn new(viewer: &'a Viewer) -> Self {
        Self { viewer }
    }
}

/// Rows of child pages, top to bottom, left to right.
pub type Layout = Vec<Vec<Page>>;

type LayoutFn = dyn Fn(&LayoutContext<'_>) -> Layout + Send + Sync;

#[derive(Clone)]
enum LayoutSource {
    Static(Layout),
    Dynamic(Arc<LayoutFn>),
}

/// A node of the menu tree.
#[derive(Clone)]
pub struct Page {
    id: Arc<str>,
    source: LayoutSource,
}

impl Page {
    /// A page with a fixed layout, empty until rows are added.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: Arc::from(id.into()),
            source: LayoutSource::Static(Vec::new()),
        }
    }

    /// A page whose layout is recomputed from live data on every call.
    pub fn dynamic<F>(id: impl Into<String>, layout: F) -> Self
    where
        F: Fn(&LayoutContext<'_>) -> Layout + Send + Sync + 'static,
    {
        Self {
            id: Arc::from(id.into()),
            source: LayoutSource::Dynamic(Arc::new(layout)),
        }
    }

    /// Appends a row of children. Ignored (with a warning) on dynamic pages.
    pub fn row<I>(mut self, children: I) -> Self
    where
        I: IntoIterator<Item = Page>,
    {
        match &mut self.source {
            LayoutSource::Static(rows) => rows.push(children.into_iter().collect()),
            LayoutSource::Dynamic(_) => {
                log::warn!("Static row added to dynamic page '{}' is ignored", self.id);
            }
        }
        self
    }

    /// Appends a single-button row.
    pub fn item(self, child: Page) -> Self {
        self.row([child])
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn is_dynamic(&self) -> bool {
        matches!(self.source, LayoutSource::Dynamic(_))
    }

    /// Current layout of this page for the given viewer.
    pub fn layout(&self, ctx: &LayoutContext<'_>) -> Layout {
        match &self.source {
            LayoutSource::Static(rows) => rows.clone(),
            LayoutSource::Dynamic(f) => f(ctx),
        }
    }
}

impl fmt::Debug for Page {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Page")
            .field("id", &self.id)
            .field("dynamic", &self.is_dynamic())
            .finish()
    }
}

impl PartialEq for Page {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

/// The navigable tree, rooted at the landing page.
#[derive(Debug, Clone)]
pub struct PageGraph {
    root: Page,
}

impl PageGraph {
    pub fn new(root: Page) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &Page {
        &self.root
    }

    /// Depth-first search for the page with `id`; first structural match wins.
    pub fn find_page(&self, id: &str, ctx: &LayoutContext<'_>) -> Option<Page> {
        find_page_in(&self.root, id, ctx, 0)
    }

    /// The page whose current layout contains `id`.
    ///
    /// `None` for the root itself and for ids not in the tree.
    pub fn find_parent(&self, id: &str, ctx: &LayoutContext<'_>) -> Option<Page> {
        find_parent_in(&self.root, id, ctx, 0)
    }

    /// Child ids of `page` as currently laid out.
    pub fn compute_layout(&self, page: &Page, ctx: &LayoutContext<'_>) -> Vec<Vec<String>> {
        page.layout(ctx)
            .iter()
            .map(|row| row.iter().map(|child| child.id().to_string()).collect())
            .collect()
    }
}

fn find_page_in(page: &Page, id: &str, ctx: &LayoutContext<'_>, depth: usize) -> Option<Page> {
    if page.id() == id {
        return Some(page.clone());
    }
    if depth >= MAX_DEPTH {
        log::warn!("Page tree deeper than {} at '{}', stopping search", MAX_DEPTH, page.id());
        return None;
    }
    page.layout(ctx)
        .iter()
        .flatten()
        .find_map(|child| find_page_in(child, id, ctx, depth + 1))
}

fn find_parent_in(page: &Page, id: &str, ctx: &LayoutContext<'_>, depth: usize) -> Option<Page> {
    if page.id() == id || depth >= MAX_DEPTH {
        return None;
    }
    let layout = page.layout(ctx);
    if layout.iter().flatten().any(|child| child.id() == id) {
        return Some(page.clone());
    }
    layout
        .iter()
        .flatten()
        .find_map(|child| find_parent_in(child, id, ctx, depth + 1))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::i18n::Locale;
    use pretty_assertions::assert_eq;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn viewer() -> Viewer {
        Viewer::new(42, ChatSettings::default())
    }

    fn tree() -> PageGraph {
        PageGraph::new(
            Page::new("landing")
                .row([Page::new("current_weather"), Page::new("general_weather")])
                .item(
                    Page::new("settings")
                        .item(Page::new("notification"))
                        .item(Page::new("language")),
                )
                .item(Page::new("about")),
        )
    }

    #[test]
    fn test_find_page_round_trip() {
        let graph = tree();
        let v = viewer();
        let ctx = LayoutContext::new(&v);
        for id in ["landing", "current_weather", "general_weather", "settings", "notification", "language", "about"] {
            let page = graph.find_page(id, &ctx).unwrap();
            assert_eq!(page.id(), id);
        }
        assert!(graph.find_page("missing", &ctx).is_none());
    }

    #[test]
    fn test_find_parent() {
        let graph = tree();
        let v = viewer();
        let ctx = LayoutContext::new(&v);

        assert!(graph.find_parent("landing", &ctx).is_none());
        assert_eq!(graph.find_parent("about", &ctx).unwrap().id(), "landing");
        assert_eq!(graph.find_parent("general_weather", &ctx).unwrap().id(), "landing");
        assert_eq!(graph.find_parent("language", &ctx).unwrap().id(), "settings");
        assert!(graph.find_parent("missing", &ctx).is_none());
    }

    #[test]
    fn test_compute_layout_keeps_rows() {
        let graph = tree();
        let v = viewer();
        let ctx = LayoutContext::new(&v);
        let layout = graph.compute_layout(graph.root(), &ctx);
        assert_eq!(
            layout,
            vec![
                vec!["current_weather".to_string(), "general_weather".to_string()],
                vec!["settings".to_string()],
                vec!["about".to_string()],
            ]
        );
    }

    #[test]
    fn test_dynamic_layout_reflects_viewer() {
        let root = Page::dynamic("landing", |ctx| {
            let mut rows = vec![vec![Page::new("about")]];
            if ctx.viewer.locale() == Locale::ZhHk {
                rows.insert(0, vec![Page::new("chinese_only")]);
            }
            rows
        });
        let graph = PageGraph::new(root);

        let en = viewer();
        let zh = Viewer::new(
            7,
            ChatSettings {
                locale: Locale::ZhHk,
                ..ChatSettings::default()
            },
        );

        assert!(graph.find_page("chinese_only", &LayoutContext::new(&en)).is_none());
        assert_eq!(
            graph.find_parent("chinese_only", &LayoutContext::new(&zh)).unwrap().id(),
            "landing"
        );
    }

    #[test]
    fn test_layout_is_recomputed_each_call() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let page = Page::dynamic("events", move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            vec![vec![Page::new("a"), Page::new("b")]]
        });
        let graph = PageGraph::new(page.clone());
        let v = viewer();
        let ctx = LayoutContext::new(&v);

        let first = graph.compute_layout(&page, &ctx);
        let second = graph.compute_layout(&page, &ctx);
        assert_eq!(first, second);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_row_on_dynamic_page_is_ignored() {
        let page = Page::dynamic("events", |_| Vec::new()).item(Page::new("static"));
        let v = viewer();
        assert!(page.layout(&LayoutContext::new(&v)).is_empty());
    }

    #[test]
    fn test_self_referencing_layout_terminates() {
        fn looping() -> Page {
            Page::dynamic("loop", |_| vec![vec![looping()]])
        }
        let graph = PageGraph::new(Page::new("landing").item(looping()));
        let v = viewer();
        assert!(graph.find_page("never", &LayoutContext::new(&v)).is_none());
    }
}
