use std::cell::RefCell;
use std::fmt;
use std::rc::Weak;

use crate::tree::item::{Target, TreeItem, TreeItemRef};

pub mod binding_failures;
pub mod binding_helper;
pub mod local_values;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum DiagnosticLevel {
    Info,
    Warning,
    Error,
}

impl fmt::Display for DiagnosticLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            DiagnosticLevel::Info => "info",
            DiagnosticLevel::Warning => "warning",
            DiagnosticLevel::Error => "error",
        };
        write!(f, "{text}")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagnosticArea {
    Binding,
    Maintainability,
    Performance,
}

impl fmt::Display for DiagnosticArea {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            DiagnosticArea::Binding => "binding",
            DiagnosticArea::Maintainability => "maintainability",
            DiagnosticArea::Performance => "performance",
        };
        write!(f, "{text}")
    }
}

/// One finding emitted by a provider. Produced once, never mutated.
pub struct DiagnosticItem {
    provider: &'static str,
    code: &'static str,
    message: String,
    area: DiagnosticArea,
    level: DiagnosticLevel,
    tree_item: Weak<RefCell<TreeItem>>,
    source: Target,
    context_id: usize,
}

impl DiagnosticItem {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        provider: &'static str,
        code: &'static str,
        message: String,
        area: DiagnosticArea,
        level: DiagnosticLevel,
        tree_item: Weak<RefCell<TreeItem>>,
        source: Target,
        context_id: usize,
    ) -> Self {
        Self {
            provider,
            code,
            message,
            area,
            level,
            tree_item,
            source,
            context_id,
        }
    }

    pub fn provider(&self) -> &'static str {
        self.provider
    }

    pub fn code(&self) -> &'static str {
        self.code
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn area(&self) -> DiagnosticArea {
        self.area
    }

    pub fn level(&self) -> DiagnosticLevel {
        self.level
    }

    /// The node the finding was raised against; the node may since have been
    /// detached by a reload.
    pub fn tree_item(&self) -> Option<TreeItemRef> {
        self.tree_item.upgrade()
    }

    pub fn source(&self) -> &Target {
        &self.source
    }

    /// Which UI context (dispatcher) owns the source object.
    pub fn context_id(&self) -> usize {
        self.context_id
    }
}

impl fmt::Display for DiagnosticItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}/{}] {}", self.level, self.area, self.message)
    }
}

/// A pluggable diagnostic rule.
///
/// `diagnostic_items` yields a finite, single-pass sequence; re-invoke to
/// re-run. Providers only read the target: a target of the wrong kind yields
/// nothing, and a failure introspecting one property skips that property
/// without aborting the rest of the sequence.
pub trait DiagnosticProvider {
    fn name(&self) -> &'static str;
    fn description(&self) -> &'static str;
    fn diagnostic_items(&self, item: &TreeItemRef) -> Box<dyn Iterator<Item = DiagnosticItem>>;
}

pub fn default_providers() -> Vec<Box<dyn DiagnosticProvider>> {
    vec![
        Box::new(local_values::LocalValuesProvider),
        Box::new(binding_failures::BindingFailuresProvider),
    ]
}

/// Run every provider over the subtree, skipping nodes flagged as synthetic.
pub fn analyze(providers: &[Box<dyn DiagnosticProvider>], item: &TreeItemRef) -> Vec<DiagnosticItem> {
    let mut findings = Vec::new();
    collect(providers, item, &mut findings);
    tracing::debug!(count = findings.len(), "diagnostic pass finished");
    findings
}

fn collect(
    providers: &[Box<dyn DiagnosticProvider>],
    item: &TreeItemRef,
    findings: &mut Vec<DiagnosticItem>,
) {
    if item.borrow().should_be_analyzed() {
        for provider in providers {
            findings.extend(provider.diagnostic_items(item));
        }
    }
    let children: Vec<TreeItemRef> = item.borrow().children().to_vec();
    for child in &children {
        collect(providers, child, findings);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::dispatcher::Dispatcher;
    use crate::model::object::{Color, Element, Property, Value, ValueOrigin};
    use crate::model::resources::ResourceDictionary;
    use std::rc::Rc;

    #[test]
    fn analysis_skips_synthetic_nodes() {
        let dict = ResourceDictionary::runtime();
        dict.insert(
            Some(Rc::new(Value::Text("Accent".into()))),
            Rc::new(Value::Color(Color::rgb(10, 20, 30))),
        );
        let element = Element::new("Grid", "", Dispatcher::new(0));
        element.set_resources(dict);
        let local = Property::new(
            "Background",
            Value::Color(Color::rgb(1, 2, 3)),
            ValueOrigin::local(),
            false,
        );
        element.add_property(local);

        let root = TreeItem::construct(Target::Element(element), None);
        TreeItem::reload(&root);
        // materialize the dictionary leaves so only the analyzed-flag gates them
        let dict_node = root.borrow().children()[0].clone();
        TreeItem::set_expanded(&dict_node, true);

        let findings = analyze(&default_providers(), &root);
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].code(), "LocalColor");
    }

    #[test]
    fn findings_carry_node_and_context() {
        let element = Element::new("Border", "frame", Dispatcher::new(7));
        let local = Property::new(
            "BorderBrush",
            Value::Color(Color::rgb(0, 0, 1)),
            ValueOrigin::local(),
            false,
        );
        element.add_property(local);
        let root = TreeItem::construct(Target::Element(element), None);

        let findings = analyze(&default_providers(), &root);
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].context_id(), 7);
        let node = findings[0].tree_item().unwrap();
        assert!(Rc::ptr_eq(&node, &root));
    }
}
