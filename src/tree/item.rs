use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use crate::model::object::{Element, Value};
use crate::model::resources::{ResolveError, ResourceDictionary};
use crate::tree::dictionary;

pub type TreeItemRef = Rc<RefCell<TreeItem>>;

/// Rendered in place of a missing resource key.
pub const NULL_KEY_TOKEN: &str = "{null}";

const PLACEHOLDER_LABEL: &str = "\u{2026}";

/// Non-owning handle to one object in the inspected graph. The inspected
/// application owns its objects; the mirror tree only observes them, and
/// identity is pointer identity.
#[derive(Clone)]
pub enum Target {
    Element(Rc<Element>),
    Dictionary(Rc<ResourceDictionary>),
    Value(Rc<Value>),
    Error(Rc<ResolveError>),
}

impl Target {
    pub fn same_object(&self, other: &Target) -> bool {
        match (self, other) {
            (Target::Element(a), Target::Element(b)) => Rc::ptr_eq(a, b),
            (Target::Dictionary(a), Target::Dictionary(b)) => Rc::ptr_eq(a, b),
            (Target::Value(a), Target::Value(b)) => Rc::ptr_eq(a, b),
            (Target::Error(a), Target::Error(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }

    /// Runtime type name, used as the display fallback and for leaf suffixes.
    pub fn type_name(&self) -> String {
        match self {
            Target::Element(element) => element.type_name().to_string(),
            Target::Dictionary(_) => "ResourceDictionary".to_string(),
            Target::Value(value) => value.type_name().to_string(),
            Target::Error(_) => "ResolveError".to_string(),
        }
    }

    pub fn as_element(&self) -> Option<&Rc<Element>> {
        match self {
            Target::Element(element) => Some(element),
            _ => None,
        }
    }

    pub fn as_dictionary(&self) -> Option<&Rc<ResourceDictionary>> {
        match self {
            Target::Dictionary(dictionary) => Some(dictionary),
            _ => None,
        }
    }
}

/// Node kind tag. Behavior differences between kinds are dispatched on this
/// tag, not through trait objects.
pub enum NodeKind {
    Element,
    Dictionary {
        /// The single synthetic child marking a collapsed dictionary as
        /// expandable. At most one exists at a time.
        placeholder: Option<TreeItemRef>,
    },
    Resource {
        key: Option<Rc<Value>>,
        has_error: bool,
    },
    Placeholder,
}

/// One node of the mirror tree built over the inspected object graph.
///
/// Children are a live backing store kept sorted on `(sort_order,
/// display_name)` ascending; insertion is stable for equal keys. All mutation
/// happens on the thread owning the inspected context.
pub struct TreeItem {
    target: Target,
    parent: Option<Weak<RefCell<TreeItem>>>,
    children: Vec<TreeItemRef>,
    display_name: String,
    sort_order: i32,
    should_be_analyzed: bool,
    is_expanded: bool,
    kind: NodeKind,
}

impl TreeItem {
    /// Build the node kind matching the target.
    pub fn construct(target: Target, parent: Option<&TreeItemRef>) -> TreeItemRef {
        let kind = match &target {
            Target::Dictionary(_) => NodeKind::Dictionary { placeholder: None },
            _ => NodeKind::Element,
        };
        Self::with_kind(target, parent, kind, 0, true)
    }

    /// Leaf node for one resource entry. Always sorts after dictionary
    /// subtrees and is never analyzed by diagnostic providers.
    pub(crate) fn resource(
        target: Target,
        key: Option<Rc<Value>>,
        parent: &TreeItemRef,
        has_error: bool,
    ) -> TreeItemRef {
        Self::with_kind(
            target,
            Some(parent),
            NodeKind::Resource { key, has_error },
            i32::MAX,
            false,
        )
    }

    pub(crate) fn placeholder(parent: &TreeItemRef) -> TreeItemRef {
        let target = parent.borrow().target.clone();
        Self::with_kind(target, Some(parent), NodeKind::Placeholder, 0, false)
    }

    fn with_kind(
        target: Target,
        parent: Option<&TreeItemRef>,
        kind: NodeKind,
        sort_order: i32,
        should_be_analyzed: bool,
    ) -> TreeItemRef {
        let item = Rc::new(RefCell::new(TreeItem {
            target,
            parent: parent.map(Rc::downgrade),
            children: Vec::new(),
            display_name: String::new(),
            sort_order,
            should_be_analyzed,
            is_expanded: false,
            kind,
        }));
        let name = item.borrow().get_name();
        item.borrow_mut().display_name = name;
        item
    }

    pub fn target(&self) -> &Target {
        &self.target
    }

    pub fn kind(&self) -> &NodeKind {
        &self.kind
    }

    pub fn parent(&self) -> Option<TreeItemRef> {
        self.parent.as_ref().and_then(Weak::upgrade)
    }

    pub fn children(&self) -> &[TreeItemRef] {
        &self.children
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    pub fn sort_order(&self) -> i32 {
        self.sort_order
    }

    pub(crate) fn set_sort_order(&mut self, order: i32) {
        self.sort_order = order;
    }

    pub fn should_be_analyzed(&self) -> bool {
        self.should_be_analyzed
    }

    pub fn is_expanded(&self) -> bool {
        self.is_expanded
    }

    /// Whether the node can be expanded in the UI. A collapsed dictionary with
    /// pending content carries its placeholder child, so a non-empty child
    /// list is exactly the expandable condition.
    pub fn is_expandable(&self) -> bool {
        !self.children.is_empty()
    }

    pub(crate) fn current_placeholder(&self) -> Option<TreeItemRef> {
        match &self.kind {
            NodeKind::Dictionary { placeholder } => placeholder.clone(),
            _ => None,
        }
    }

    pub(crate) fn set_placeholder(&mut self, value: Option<TreeItemRef>) {
        if let NodeKind::Dictionary { placeholder } = &mut self.kind {
            *placeholder = value;
        }
    }

    /// Derive the human label for this node. Base behavior falls back to the
    /// runtime type name of the target.
    pub fn get_name(&self) -> String {
        match &self.kind {
            NodeKind::Element => match &self.target {
                Target::Element(element) if !element.name().is_empty() => {
                    format!("{} \"{}\"", element.type_name(), element.name())
                }
                other => other.type_name(),
            },
            NodeKind::Dictionary { .. } => match &self.target {
                Target::Dictionary(dictionary) => dictionary
                    .source()
                    .filter(|s| !s.is_empty())
                    .map(str::to_string)
                    .unwrap_or_else(|| self.target.type_name()),
                other => other.type_name(),
            },
            NodeKind::Resource { key, .. } => key
                .as_ref()
                .map(|k| k.to_string())
                .unwrap_or_else(|| NULL_KEY_TOKEN.to_string()),
            NodeKind::Placeholder => PLACEHOLDER_LABEL.to_string(),
        }
    }

    /// Insert preserving the `(sort_order, display_name)` invariant. Equal
    /// keys keep their insertion order.
    pub fn add_child(parent: &TreeItemRef, child: TreeItemRef) {
        child.borrow_mut().parent = Some(Rc::downgrade(parent));
        let (order, name) = {
            let c = child.borrow();
            (c.sort_order, c.display_name.clone())
        };
        let mut p = parent.borrow_mut();
        let pos = p.children.partition_point(|existing| {
            let e = existing.borrow();
            (e.sort_order, e.display_name.as_str()) <= (order, name.as_str())
        });
        p.children.insert(pos, child);
    }

    /// Remove by identity. `false` means the child was not present; callers
    /// must abort dependent work against that stale state rather than proceed.
    pub fn remove_child(parent: &TreeItemRef, child: &TreeItemRef) -> bool {
        let mut p = parent.borrow_mut();
        match p.children.iter().position(|c| Rc::ptr_eq(c, child)) {
            Some(pos) => {
                p.children.remove(pos);
                true
            }
            None => false,
        }
    }

    /// Clear and rebuild all descendants. Idempotent; safe to call on every
    /// external-state change notification.
    pub fn reload(item: &TreeItemRef) {
        {
            let mut it = item.borrow_mut();
            it.children.clear();
            if let NodeKind::Dictionary { placeholder } = &mut it.kind {
                *placeholder = None;
            }
            let name = it.get_name();
            it.display_name = name;
        }
        let is_dictionary = matches!(item.borrow().kind, NodeKind::Dictionary { .. });
        if is_dictionary {
            dictionary::reload_dictionary(item);
        } else if matches!(item.borrow().kind, NodeKind::Element) {
            Self::reload_element(item);
        }
        // Resource and placeholder leaves have no reload body.
    }

    fn reload_element(item: &TreeItemRef) {
        let element = {
            let it = item.borrow();
            it.target.as_element().cloned()
        };
        let Some(element) = element else {
            return;
        };

        let mut order = 0;
        for child in element.children() {
            let node = Self::construct(Target::Element(child), Some(item));
            node.borrow_mut().sort_order = order;
            Self::reload(&node);
            Self::add_child(item, node);
            order += 1;
        }

        let resources = element.resources();
        if resources.resource_count() > 0 {
            let node = Self::construct(Target::Dictionary(resources), Some(item));
            node.borrow_mut().sort_order = order;
            Self::reload(&node);
            Self::add_child(item, node);
        }
    }

    /// Locate the node wrapping `target` by identity, searching the subtree.
    ///
    /// Dictionary nodes opt out entirely: their contents are reachable only
    /// through materialized resource entries, so an unexpanded branch does not
    /// match. This asymmetry is deliberate and must stay.
    pub fn find_node(item: &TreeItemRef, target: &Target) -> Option<TreeItemRef> {
        let it = item.borrow();
        if matches!(it.kind, NodeKind::Dictionary { .. }) {
            return None;
        }
        if it.target.same_object(target) {
            drop(it);
            return Some(item.clone());
        }
        for child in &it.children {
            if let Some(found) = Self::find_node(child, target) {
                return Some(found);
            }
        }
        None
    }

    /// Two-way expansion state. The false-to-true transition is the trigger
    /// for lazy population of dictionary subtrees; invoking it twice does not
    /// double-populate.
    pub fn set_expanded(item: &TreeItemRef, expanded: bool) {
        let changed = {
            let mut it = item.borrow_mut();
            if it.is_expanded == expanded {
                false
            } else {
                it.is_expanded = expanded;
                true
            }
        };
        if changed && expanded && matches!(item.borrow().kind, NodeKind::Dictionary { .. }) {
            dictionary::really_load_children(item);
        }
    }
}

impl fmt::Display for TreeItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            NodeKind::Dictionary { .. } => match &self.target {
                Target::Dictionary(dict) => write!(f, "{}", dictionary::dictionary_label(dict)),
                _ => write!(f, "{}", self.display_name),
            },
            NodeKind::Resource { .. } => write!(f, "{}", dictionary::resource_label(self)),
            _ => write!(f, "{}", self.display_name),
        }
    }
}
