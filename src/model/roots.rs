use std::fmt;
use std::rc::Rc;

use crate::error::{AppError, Result};
use crate::model::dispatcher::Dispatcher;
use crate::model::object::Element;

/// A top-level window of the inspected application.
pub struct Window {
    title: String,
    visible: bool,
    root: Rc<Element>,
}

impl Window {
    pub fn new(title: impl Into<String>, visible: bool, root: Rc<Element>) -> Rc<Self> {
        Rc::new(Self {
            title: title.into(),
            visible,
            root,
        })
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn root(&self) -> Rc<Element> {
        self.root.clone()
    }
}

/// One independent UI context: its own dispatcher (thread) and window list.
/// Multiple contexts may be inspected at once without interfering.
pub struct UiContext {
    id: usize,
    dispatcher: Rc<Dispatcher>,
    windows: Vec<Rc<Window>>,
}

impl fmt::Debug for UiContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UiContext")
            .field("id", &self.id)
            .field("windows", &self.windows.len())
            .finish()
    }
}

impl UiContext {
    pub fn new(id: usize) -> Self {
        Self {
            id,
            dispatcher: Dispatcher::new(id),
            windows: Vec::new(),
        }
    }

    pub fn id(&self) -> usize {
        self.id
    }

    pub fn dispatcher(&self) -> &Rc<Dispatcher> {
        &self.dispatcher
    }

    pub fn add_window(&mut self, window: Rc<Window>) {
        self.windows.push(window);
    }

    pub fn windows(&self) -> &[Rc<Window>] {
        &self.windows
    }

    /// Pick exactly one visible root for this context.
    pub fn find_root(&self) -> Result<Rc<Element>> {
        self.windows
            .iter()
            .find(|w| w.is_visible())
            .map(|w| w.root())
            .ok_or(AppError::RootDiscovery(self.id))
    }
}

/// Discover one root per context. Failure in one context is non-fatal: it is
/// always logged, and only escalated to the caller (for a blocking
/// notification) when a single context is being inspected — with several
/// contexts, a root-less context is expected and benign.
pub fn discover_roots(contexts: &[UiContext]) -> (Vec<(usize, Rc<Element>)>, Vec<AppError>) {
    let single = contexts.len() == 1;
    let mut roots = Vec::new();
    let mut failures = Vec::new();

    for context in contexts {
        match context.find_root() {
            Ok(root) => {
                tracing::info!(context = context.id(), "discovered root visual");
                roots.push((context.id(), root));
            }
            Err(err) => {
                if single {
                    tracing::error!(context = context.id(), "no accessible root: {err}");
                } else {
                    tracing::warn!(context = context.id(), "no accessible root: {err}");
                }
                failures.push(err);
            }
        }
    }

    (roots, failures)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn element(ctx: &UiContext, type_name: &str) -> Rc<Element> {
        Element::new(type_name, "", ctx.dispatcher().clone())
    }

    #[test]
    fn first_visible_window_wins() {
        let mut ctx = UiContext::new(0);
        let hidden = element(&ctx, "SplashWindow");
        let shown = element(&ctx, "MainWindow");
        ctx.add_window(Window::new("splash", false, hidden));
        ctx.add_window(Window::new("main", true, shown.clone()));

        let root = ctx.find_root().unwrap();
        assert!(Rc::ptr_eq(&root, &shown));
    }

    #[test]
    fn no_visible_window_is_a_discovery_error() {
        let mut ctx = UiContext::new(3);
        let root = element(&ctx, "Window");
        ctx.add_window(Window::new("hidden", false, root));

        let err = ctx.find_root().unwrap_err();
        assert!(matches!(err, AppError::RootDiscovery(3)));
    }

    #[test]
    fn discovery_is_per_context() {
        let mut first = UiContext::new(0);
        let shown = element(&first, "MainWindow");
        first.add_window(Window::new("main", true, shown));
        let second = UiContext::new(1);

        let (roots, failures) = discover_roots(&[first, second]);
        assert_eq!(roots.len(), 1);
        assert_eq!(roots[0].0, 0);
        assert_eq!(failures.len(), 1);
    }
}
