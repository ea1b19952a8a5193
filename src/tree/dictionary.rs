use std::rc::Rc;

use crate::model::resources::ResourceDictionary;
use crate::tree::item::{NodeKind, Target, TreeItem, TreeItemRef};

pub const INVALID_RESOURCE_SUFFIX: &str = "(Invalid resource definition)";
const RUNTIME_DICTIONARY_LABEL: &str = "Runtime Dictionary";

/// Reload body for dictionary nodes.
///
/// Resolving every key can be expensive or side-effecting, so a collapsed
/// dictionary gets a single placeholder child instead of real children; the
/// cost is deferred until the node is actually expanded. An already-expanded
/// node (reload after an external change) repopulates immediately.
pub(crate) fn reload_dictionary(item: &TreeItemRef) {
    let (dict, expanded) = {
        let it = item.borrow();
        (it.target().as_dictionary().cloned(), it.is_expanded())
    };
    let Some(dict) = dict else {
        return;
    };

    if expanded {
        populate(item, &dict);
        return;
    }
    if dict.resource_count() == 0 {
        return;
    }

    let placeholder = TreeItem::placeholder(item);
    TreeItem::add_child(item, placeholder.clone());
    item.borrow_mut().set_placeholder(Some(placeholder));
}

/// Real population, fired when `is_expanded` transitions to true.
///
/// The placeholder doubles as the re-entrancy guard: if it is gone, another
/// path already rebuilt the children and this cycle aborts without changes.
pub(crate) fn really_load_children(item: &TreeItemRef) {
    let placeholder = match item.borrow().current_placeholder() {
        Some(placeholder) => placeholder,
        None => return, // nothing pending: empty, or already loaded
    };
    if !TreeItem::remove_child(item, &placeholder) {
        return;
    }
    item.borrow_mut().set_placeholder(None);

    let dict = match item.borrow().target().as_dictionary().cloned() {
        Some(dict) => dict,
        None => return,
    };
    populate(item, &dict);
}

fn populate(item: &TreeItemRef, dict: &Rc<ResourceDictionary>) {
    // merged sub-dictionaries keep their declared order via sort_order
    for (order, merged) in dict.merged().into_iter().enumerate() {
        let child = TreeItem::construct(Target::Dictionary(merged), Some(item));
        child.borrow_mut().set_sort_order(order as i32);
        TreeItem::reload(&child);
        TreeItem::add_child(item, child);
    }

    for entry in dict.resolve_entries() {
        let has_error = entry.error.is_some();
        let target = if let Some(value) = entry.value {
            Some(Target::Value(value))
        } else if let Some(error) = entry.error {
            Some(Target::Error(error))
        } else {
            entry.key.clone().map(Target::Value)
        };
        let Some(target) = target else {
            continue; // neither a value nor a key: nothing to show
        };
        let leaf = TreeItem::resource(target, entry.key, item, has_error);
        TreeItem::add_child(item, leaf);
    }
}

/// `"<count> resources (<source>)"`, with a fixed marker for dictionaries
/// built in code. The count comes from the model, so it is correct before the
/// node has ever been expanded.
pub(crate) fn dictionary_label(dict: &Rc<ResourceDictionary>) -> String {
    let count = dict.resource_count();
    match dict.source() {
        Some(source) if !source.is_empty() => format!("{count} resources ({source})"),
        _ => format!("{count} resources ({RUNTIME_DICTIONARY_LABEL})"),
    }
}

/// Display contract for resource leaves: error suffix on failed resolution,
/// bare name when the key resolved to itself, type suffix otherwise.
pub(crate) fn resource_label(item: &TreeItem) -> String {
    let NodeKind::Resource { key, has_error } = item.kind() else {
        return item.display_name().to_string();
    };
    if *has_error {
        return format!("{} {INVALID_RESOURCE_SUFFIX}", item.display_name());
    }
    if let (Some(key), Target::Value(value)) = (key, item.target()) {
        if Rc::ptr_eq(key, value) {
            return item.display_name().to_string();
        }
    }
    format!("{} ({})", item.display_name(), item.target().type_name())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::object::{Brush, Color, Value};
    use crate::tree::item::NULL_KEY_TOKEN;

    fn key(s: &str) -> Option<Rc<Value>> {
        Some(Rc::new(Value::Text(s.into())))
    }

    fn brush() -> Rc<Value> {
        Rc::new(Value::Brush(Brush::Solid(Color::rgb(30, 30, 46))))
    }

    /// 2 merged dictionaries plus keys {"A" -> brush, "B" -> invalid}.
    fn theme_dictionary() -> Rc<ResourceDictionary> {
        let dict = ResourceDictionary::from_source("Theme.xaml");
        dict.add_merged(ResourceDictionary::runtime());
        dict.add_merged(ResourceDictionary::runtime());
        dict.insert(key("A"), brush());
        dict.insert_invalid(key("B"), "missing type converter");
        dict
    }

    fn dictionary_node(dict: Rc<ResourceDictionary>) -> TreeItemRef {
        let item = TreeItem::construct(Target::Dictionary(dict), None);
        TreeItem::reload(&item);
        item
    }

    #[test]
    fn collapsed_dictionary_has_exactly_the_placeholder() {
        let item = dictionary_node(theme_dictionary());
        let it = item.borrow();
        assert_eq!(it.children().len(), 1);
        assert!(matches!(
            *it.children()[0].borrow().kind(),
            NodeKind::Placeholder
        ));
        assert!(it.is_expandable());
    }

    #[test]
    fn empty_dictionary_has_no_children() {
        let item = dictionary_node(ResourceDictionary::runtime());
        assert!(item.borrow().children().is_empty());
        assert!(!item.borrow().is_expandable());
    }

    #[test]
    fn expansion_materializes_merged_plus_keys() {
        let item = dictionary_node(theme_dictionary());
        TreeItem::set_expanded(&item, true);

        let it = item.borrow();
        assert_eq!(it.children().len(), 4);
        // dictionary subtrees (sort_order 0, 1) precede resource leaves (max)
        assert!(matches!(
            *it.children()[0].borrow().kind(),
            NodeKind::Dictionary { .. }
        ));
        assert!(matches!(
            *it.children()[1].borrow().kind(),
            NodeKind::Dictionary { .. }
        ));
        assert_eq!(it.children()[0].borrow().sort_order(), 0);
        assert_eq!(it.children()[1].borrow().sort_order(), 1);
        assert_eq!(it.children()[2].borrow().sort_order(), i32::MAX);
        assert_eq!(it.children()[2].borrow().display_name(), "A");
        assert_eq!(it.children()[3].borrow().display_name(), "B");
    }

    #[test]
    fn count_label_is_correct_before_expansion() {
        let item = dictionary_node(theme_dictionary());
        assert_eq!(item.borrow().to_string(), "4 resources (Theme.xaml)");
    }

    #[test]
    fn count_label_is_stable_after_expansion() {
        let item = dictionary_node(theme_dictionary());
        TreeItem::set_expanded(&item, true);
        assert_eq!(item.borrow().to_string(), "4 resources (Theme.xaml)");
    }

    #[test]
    fn runtime_dictionary_label() {
        let dict = ResourceDictionary::runtime();
        dict.insert(key("X"), Rc::new(Value::Int(5)));
        let item = dictionary_node(dict);
        assert_eq!(item.borrow().to_string(), "1 resources (Runtime Dictionary)");
    }

    #[test]
    fn failed_resolution_gets_error_suffix() {
        let item = dictionary_node(theme_dictionary());
        TreeItem::set_expanded(&item, true);

        let it = item.borrow();
        let b = it.children()[3].borrow();
        assert!(b.to_string().ends_with(INVALID_RESOURCE_SUFFIX));
        assert!(!b.should_be_analyzed());
    }

    #[test]
    fn resolved_value_gets_type_suffix() {
        let item = dictionary_node(theme_dictionary());
        TreeItem::set_expanded(&item, true);

        let it = item.borrow();
        assert_eq!(it.children()[2].borrow().to_string(), "A (SolidColorBrush)");
    }

    #[test]
    fn key_identical_to_value_shows_bare_name() {
        let shared = Rc::new(Value::Text("SelfKeyed".into()));
        let dict = ResourceDictionary::runtime();
        dict.insert(Some(shared.clone()), shared);

        let item = dictionary_node(dict);
        TreeItem::set_expanded(&item, true);
        assert_eq!(item.borrow().children()[0].borrow().to_string(), "SelfKeyed");
    }

    #[test]
    fn null_key_renders_marker_token() {
        let dict = ResourceDictionary::runtime();
        dict.insert(None, Rc::new(Value::Int(9)));

        let item = dictionary_node(dict);
        TreeItem::set_expanded(&item, true);
        assert_eq!(
            item.borrow().children()[0].borrow().display_name(),
            NULL_KEY_TOKEN
        );
    }

    #[test]
    fn expanding_twice_does_not_duplicate_children() {
        let item = dictionary_node(theme_dictionary());
        TreeItem::set_expanded(&item, true);
        TreeItem::set_expanded(&item, false);
        TreeItem::set_expanded(&item, true);
        assert_eq!(item.borrow().children().len(), 4);
    }

    #[test]
    fn population_aborts_when_placeholder_was_already_removed() {
        let item = dictionary_node(theme_dictionary());
        let placeholder = item.borrow().current_placeholder().unwrap();
        assert!(TreeItem::remove_child(&item, &placeholder));

        TreeItem::set_expanded(&item, true);
        // the cycle aborted: no children were inserted
        assert!(item.borrow().children().is_empty());
    }

    #[test]
    fn merged_dictionaries_load_eagerly_once_parent_expands() {
        let inner = ResourceDictionary::runtime();
        inner.insert(key("deep"), Rc::new(Value::Int(1)));
        let outer = ResourceDictionary::runtime();
        outer.add_merged(inner);

        let item = dictionary_node(outer);
        TreeItem::set_expanded(&item, true);

        let it = item.borrow();
        let merged_node = it.children()[0].borrow();
        // the merged child was reloaded immediately: collapsed, so placeholder
        assert_eq!(merged_node.children().len(), 1);
        assert!(matches!(
            *merged_node.children()[0].borrow().kind(),
            NodeKind::Placeholder
        ));
    }

    #[test]
    fn reload_while_expanded_repopulates_without_placeholder() {
        let dict = theme_dictionary();
        let item = dictionary_node(dict.clone());
        TreeItem::set_expanded(&item, true);

        dict.insert(key("C"), Rc::new(Value::Int(3)));
        TreeItem::reload(&item);

        let it = item.borrow();
        assert_eq!(it.children().len(), 5);
        assert!(it
            .children()
            .iter()
            .all(|c| !matches!(*c.borrow().kind(), NodeKind::Placeholder)));
    }

    #[test]
    fn find_node_opts_out_for_dictionaries() {
        let shared = brush();
        let dict = ResourceDictionary::runtime();
        dict.insert(key("A"), shared.clone());

        let item = dictionary_node(dict);
        TreeItem::set_expanded(&item, true);
        // even fully materialized, identity search does not enter the dictionary
        assert!(TreeItem::find_node(&item, &Target::Value(shared)).is_none());
    }

    #[test]
    fn resource_leaves_sort_after_subtrees_then_by_name() {
        let dict = ResourceDictionary::runtime();
        dict.insert(key("zeta"), Rc::new(Value::Int(1)));
        dict.insert(key("alpha"), Rc::new(Value::Int(2)));
        dict.add_merged(ResourceDictionary::runtime());

        let item = dictionary_node(dict);
        TreeItem::set_expanded(&item, true);

        let it = item.borrow();
        let names: Vec<String> = it
            .children()
            .iter()
            .map(|c| c.borrow().display_name().to_string())
            .collect();
        assert!(matches!(
            *it.children()[0].borrow().kind(),
            NodeKind::Dictionary { .. }
        ));
        assert_eq!(names[1], "alpha");
        assert_eq!(names[2], "zeta");
    }
}
