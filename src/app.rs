use std::cell::RefCell;
use std::rc::Rc;

use crate::config::AppConfig;
use crate::diagnostics::{self, binding_helper, DiagnosticItem, DiagnosticProvider};
use crate::error::Result;
use crate::model::roots::{discover_roots, UiContext};
use crate::tree::item::{NodeKind, Target, TreeItem, TreeItemRef};

/// Which panel owns key input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Panel {
    Tree,
    Diagnostics,
}

/// Row coloring category, derived from the node kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowStyle {
    Element,
    Dictionary,
    Resource,
    ResourceError,
    Placeholder,
}

/// A flattened representation of one mirror-tree node for rendering.
pub struct FlatRow {
    pub item: TreeItemRef,
    pub label: String,
    pub depth: usize,
    pub is_expanded: bool,
    pub is_expandable: bool,
    pub is_last_sibling: bool,
    pub style: RowStyle,
}

/// Main application state.
pub struct App {
    contexts: Vec<UiContext>,
    roots: Vec<TreeItemRef>,
    pub flat_rows: Vec<FlatRow>,
    pub selected_index: usize,
    pub scroll_offset: usize,
    pub focus: Panel,
    pub findings: Vec<DiagnosticItem>,
    pub findings_selected: usize,
    providers: Vec<Box<dyn DiagnosticProvider>>,
    pub diagnostics_enabled: bool,
    show_types: bool,
    pub should_quit: bool,
    /// (message, is_error)
    pub status_message: Option<(String, bool)>,
}

impl App {
    /// Build the mirror tree over already-loaded contexts.
    ///
    /// Root discovery failure is fatal only when a single context is being
    /// inspected; with several contexts a root-less context is expected and
    /// only reported in the status line.
    pub fn new(contexts: Vec<UiContext>, config: &AppConfig) -> Result<Self> {
        let single = contexts.len() == 1;
        let (discovered, mut failures) = discover_roots(&contexts);
        if discovered.is_empty() {
            if single {
                if let Some(err) = failures.pop() {
                    return Err(err);
                }
            }
        }

        let mut roots = Vec::with_capacity(discovered.len());
        for (_, element) in discovered {
            let root = TreeItem::construct(Target::Element(element), None);
            TreeItem::reload(&root);
            TreeItem::set_expanded(&root, config.expand_roots());
            roots.push(root);
        }

        let diagnostics_enabled = config.diagnostics_enabled();
        if diagnostics_enabled {
            // keep the binding instrumentation hook alive for the session
            binding_helper::instance().increase_usage_count();
        }

        let mut app = Self {
            contexts,
            roots,
            flat_rows: Vec::new(),
            selected_index: 0,
            scroll_offset: 0,
            focus: Panel::Tree,
            findings: Vec::new(),
            findings_selected: 0,
            providers: diagnostics::default_providers(),
            diagnostics_enabled,
            show_types: config.show_types(),
            should_quit: false,
            status_message: None,
        };
        if !failures.is_empty() {
            app.set_status(format!("{} context(s) without a visible root", failures.len()), true);
        }
        app.flatten();
        Ok(app)
    }

    pub fn quit(&mut self) {
        self.should_quit = true;
    }

    /// Release the shared instrumentation hook. Called once on exit.
    pub fn shutdown(&mut self) {
        if self.diagnostics_enabled {
            binding_helper::instance().decrease_usage_count();
            self.diagnostics_enabled = false;
        }
    }

    /// Drain deferred work on every inspected context (binding evaluations,
    /// capture finalizers). Called once per event-loop turn.
    pub fn pump(&mut self) {
        for context in &self.contexts {
            context.dispatcher().run_until_idle();
        }
    }

    pub fn set_status(&mut self, message: String, is_error: bool) {
        self.status_message = Some((message, is_error));
    }

    pub fn toggle_focus(&mut self) {
        self.focus = match self.focus {
            Panel::Tree => Panel::Diagnostics,
            Panel::Diagnostics => Panel::Tree,
        };
    }

    /// Rebuild the flat row list from the mirror roots.
    pub fn flatten(&mut self) {
        self.flat_rows.clear();
        let roots = self.roots.clone();
        let last = roots.len().saturating_sub(1);
        for (i, root) in roots.iter().enumerate() {
            flatten_node(root, 0, i == last, self.show_types, &mut self.flat_rows);
        }
        if !self.flat_rows.is_empty() && self.selected_index >= self.flat_rows.len() {
            self.selected_index = self.flat_rows.len() - 1;
        }
    }

    pub fn select_next(&mut self) {
        if self.selected_index + 1 < self.flat_rows.len() {
            self.selected_index += 1;
        }
    }

    pub fn select_previous(&mut self) {
        self.selected_index = self.selected_index.saturating_sub(1);
    }

    pub fn select_first(&mut self) {
        self.selected_index = 0;
    }

    pub fn select_last(&mut self) {
        self.selected_index = self.flat_rows.len().saturating_sub(1);
    }

    pub fn next_finding(&mut self) {
        if self.findings_selected + 1 < self.findings.len() {
            self.findings_selected += 1;
        }
    }

    pub fn previous_finding(&mut self) {
        self.findings_selected = self.findings_selected.saturating_sub(1);
    }

    fn selected_item(&self) -> Option<TreeItemRef> {
        self.flat_rows
            .get(self.selected_index)
            .map(|row| row.item.clone())
    }

    /// Expand the selected node. For dictionary nodes this is the transition
    /// that materializes the real children.
    pub fn expand_selected(&mut self) {
        let Some(item) = self.selected_item() else {
            return;
        };
        if !item.borrow().is_expandable() {
            return;
        }
        TreeItem::set_expanded(&item, true);
        self.flatten();
    }

    /// Collapse the selected node, or jump to its parent when already
    /// collapsed.
    pub fn collapse_selected(&mut self) {
        let Some(item) = self.selected_item() else {
            return;
        };
        if item.borrow().is_expanded() {
            TreeItem::set_expanded(&item, false);
            self.flatten();
            return;
        }
        let Some(parent) = item.borrow().parent() else {
            return;
        };
        if let Some(index) = self
            .flat_rows
            .iter()
            .position(|row| Rc::ptr_eq(&row.item, &parent))
        {
            self.selected_index = index;
        }
    }

    /// Clear and rebuild every mirror root against the current model state.
    pub fn reload(&mut self) {
        for root in &self.roots {
            TreeItem::reload(root);
        }
        self.flatten();
        self.set_status("tree reloaded".into(), false);
    }

    /// Run all providers over the selected subtree.
    pub fn analyze_selected(&mut self) {
        if !self.diagnostics_enabled {
            self.set_status("diagnostics are disabled".into(), true);
            return;
        }
        let Some(item) = self.selected_item() else {
            return;
        };
        self.findings = diagnostics::analyze(&self.providers, &item);
        self.findings_selected = 0;
        self.set_status(format!("{} finding(s)", self.findings.len()), false);
    }

    /// Capture the failure text of the first bound property on the selected
    /// element and report it in the status line.
    pub fn probe_selected_binding(&mut self) {
        let Some(item) = self.selected_item() else {
            return;
        };
        let element = match item.borrow().target().as_element().cloned() {
            Some(element) => element,
            None => {
                self.set_status("selection is not an element".into(), true);
                return;
            }
        };
        let bound = element
            .properties()
            .into_iter()
            .find_map(|p| p.binding_expression().map(|e| (p, e)));
        let Some((property, expression)) = bound else {
            self.set_status("no binding on selection".into(), true);
            return;
        };

        let captured: Rc<RefCell<Option<Option<String>>>> = Rc::new(RefCell::new(None));
        let sink = captured.clone();
        let result = binding_helper::instance().try_set_binding_error(
            &element,
            &property,
            &expression,
            move |text| {
                *sink.borrow_mut() = Some(text);
            },
        );
        if let Err(err) = result {
            self.set_status(format!("binding probe failed: {err}"), true);
            return;
        }

        // the capture finalizes at idle priority; drain the context now
        element.dispatcher().run_until_idle();
        let outcome = captured.borrow_mut().take();
        match outcome {
            Some(Some(text)) => {
                let first_line = text.lines().next().unwrap_or(&text).to_string();
                self.set_status(first_line, true);
            }
            Some(None) => {
                self.set_status(format!("binding on '{}' is healthy", property.name()), false)
            }
            None => self.set_status("binding probe did not finish".into(), true),
        }
    }

    /// Breadcrumb of display names from the root down to the selection.
    pub fn selected_path(&self) -> String {
        let Some(item) = self.selected_item() else {
            return String::new();
        };
        let mut names = vec![item.borrow().display_name().to_string()];
        let mut current = item.borrow().parent();
        while let Some(parent) = current {
            names.push(parent.borrow().display_name().to_string());
            current = parent.borrow().parent();
        }
        names.reverse();
        names.join(" / ")
    }

    /// Update the scroll offset to ensure the selected row is visible.
    pub fn update_scroll(&mut self, visible_height: usize) {
        if visible_height == 0 {
            return;
        }
        if self.selected_index < self.scroll_offset {
            self.scroll_offset = self.selected_index;
        } else if self.selected_index >= self.scroll_offset + visible_height {
            self.scroll_offset = self.selected_index - visible_height + 1;
        }
    }
}

fn flatten_node(
    item: &TreeItemRef,
    depth: usize,
    is_last: bool,
    show_types: bool,
    rows: &mut Vec<FlatRow>,
) {
    let (label, style, is_expanded, is_expandable, children) = {
        let it = item.borrow();
        let style = match it.kind() {
            NodeKind::Element => RowStyle::Element,
            NodeKind::Dictionary { .. } => RowStyle::Dictionary,
            NodeKind::Resource { has_error, .. } => {
                if *has_error {
                    RowStyle::ResourceError
                } else {
                    RowStyle::Resource
                }
            }
            NodeKind::Placeholder => RowStyle::Placeholder,
        };
        let label = if style == RowStyle::Resource && !show_types {
            it.display_name().to_string()
        } else {
            it.to_string()
        };
        let children = if it.is_expanded() {
            it.children().to_vec()
        } else {
            Vec::new()
        };
        (label, style, it.is_expanded(), it.is_expandable(), children)
    };

    rows.push(FlatRow {
        item: item.clone(),
        label,
        depth,
        is_expanded,
        is_expandable,
        is_last_sibling: is_last,
        style,
    });

    let last = children.len().saturating_sub(1);
    for (i, child) in children.iter().enumerate() {
        flatten_node(child, depth + 1, i == last, show_types, rows);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene;

    const SCENE: &str = r##"{
        "contexts": [
            {
                "id": 0,
                "windows": [
                    {
                        "title": "Main",
                        "visible": true,
                        "root": {
                            "type": "Window",
                            "name": "main",
                            "data_context": { "title": "hello" },
                            "properties": [
                                { "name": "Background", "value": "#FF0000", "source": "local" },
                                { "name": "Title", "binding": "missing" }
                            ],
                            "resources": {
                                "source": "App.xaml",
                                "entries": [
                                    { "key": "Accent", "value": { "$brush": "#89B4FA" } },
                                    { "key": "Broken", "error": "bad definition" }
                                ]
                            },
                            "children": [ { "type": "Grid" } ]
                        }
                    }
                ]
            }
        ]
    }"##;

    fn make_app() -> App {
        let contexts = scene::parse(SCENE).unwrap();
        let mut app = App::new(contexts, &AppConfig::default()).unwrap();
        app.pump();
        app
    }

    fn dictionary_row(app: &App) -> usize {
        app.flat_rows
            .iter()
            .position(|row| row.style == RowStyle::Dictionary)
            .unwrap()
    }

    #[test]
    fn flatten_includes_expanded_root_children() {
        let mut app = make_app();
        app.shutdown();
        // Window + Grid + dictionary node (+ its placeholder stays hidden
        // while the dictionary is collapsed)
        assert_eq!(app.flat_rows.len(), 3);
        assert_eq!(app.flat_rows[0].depth, 0);
        assert!(app.flat_rows[0].label.contains("Window"));
    }

    #[test]
    fn expanding_the_dictionary_row_materializes_entries() {
        let mut app = make_app();
        let dict = dictionary_row(&app);
        assert_eq!(app.flat_rows[dict].label, "2 resources (App.xaml)");

        app.selected_index = dict;
        app.expand_selected();

        let labels: Vec<&str> = app.flat_rows.iter().map(|r| r.label.as_str()).collect();
        assert!(labels.contains(&"Accent (SolidColorBrush)"));
        assert!(labels.iter().any(|l| l.ends_with("(Invalid resource definition)")));
        app.shutdown();
    }

    #[test]
    fn collapse_on_a_leaf_jumps_to_parent() {
        let mut app = make_app();
        let dict = dictionary_row(&app);
        app.selected_index = dict;
        app.expand_selected();

        app.selected_index = dict + 1; // first resource leaf
        app.collapse_selected();
        assert_eq!(app.selected_index, dict);
        app.shutdown();
    }

    #[test]
    fn analyze_reports_the_local_literal() {
        let mut app = make_app();
        app.select_first();
        app.analyze_selected();
        assert!(app
            .findings
            .iter()
            .any(|f| f.code() == "LocalColor" && f.message().contains("Background")));
        app.shutdown();
    }

    #[test]
    fn binding_probe_surfaces_the_failure_text() {
        let mut app = make_app();
        app.select_first();
        app.probe_selected_binding();

        let (message, is_error) = app.status_message.clone().unwrap();
        assert!(is_error);
        assert!(message.contains("missing"));
        app.shutdown();
    }

    #[test]
    fn reload_keeps_the_row_count_stable() {
        let mut app = make_app();
        let before = app.flat_rows.len();
        app.reload();
        assert_eq!(app.flat_rows.len(), before);
        app.shutdown();
    }

    #[test]
    fn single_context_without_root_is_fatal() {
        let text = r#"{
            "contexts": [
                { "id": 0, "windows": [
                    { "title": "hidden", "visible": false,
                      "root": { "type": "Window" } } ] }
            ]
        }"#;
        let contexts = scene::parse(text).unwrap();
        assert!(App::new(contexts, &AppConfig::default()).is_err());
    }

    #[test]
    fn multi_context_failure_is_reported_not_fatal() {
        let text = r#"{
            "contexts": [
                { "id": 0, "windows": [
                    { "title": "main", "visible": true,
                      "root": { "type": "Window" } } ] },
                { "id": 1, "windows": [] }
            ]
        }"#;
        let contexts = scene::parse(text).unwrap();
        let mut app = App::new(contexts, &AppConfig::default()).unwrap();
        assert_eq!(app.flat_rows.len(), 1);
        let (message, is_error) = app.status_message.clone().unwrap();
        assert!(is_error);
        assert!(message.contains("without a visible root"));
        app.shutdown();
    }
}
