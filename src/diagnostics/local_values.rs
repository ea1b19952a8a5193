use std::rc::Rc;

use crate::diagnostics::{DiagnosticArea, DiagnosticItem, DiagnosticLevel, DiagnosticProvider};
use crate::model::object::{Color, Value};
use crate::tree::item::{Target, TreeItemRef};

/// Flags color and brush literals set directly on an element instance.
///
/// Values that are inherited, styled, or produced by a binding are fine; a
/// literal hardcoded on the instance usually belongs in a resource dictionary.
/// Fully transparent values are a deliberate no-op and are never reported.
pub struct LocalValuesProvider;

const LOCAL_COLOR: &str = "LocalColor";
const LOCAL_BRUSH: &str = "LocalBrush";

impl DiagnosticProvider for LocalValuesProvider {
    fn name(&self) -> &'static str {
        "Local visual values"
    }

    fn description(&self) -> &'static str {
        "Finds brushes and colors hardcoded directly on an element instead of defined as resources."
    }

    fn diagnostic_items(&self, item: &TreeItemRef) -> Box<dyn Iterator<Item = DiagnosticItem>> {
        let element = match item.borrow().target().as_element().cloned() {
            Some(element) => element,
            None => return Box::new(std::iter::empty()),
        };
        let provider = self.name();
        let context_id = element.dispatcher().context_id();
        let tree_item = Rc::downgrade(item);
        let type_name = element.type_name().to_string();
        let source = Target::Element(element.clone());

        Box::new(element.properties().into_iter().filter_map(move |property| {
            // a value mutated mid-scan is skipped, never a panic
            let value = property.try_value().ok()?;
            if !property.origin().is_local_literal() {
                return None;
            }
            let code = match &*value {
                Value::Color(color) if *color != Color::TRANSPARENT => LOCAL_COLOR,
                Value::Brush(brush) if !brush.is_transparent() => LOCAL_BRUSH,
                _ => return None,
            };
            let message = format!(
                "'{}' on {} is the locally defined {} '{}'",
                property.name(),
                type_name,
                value.type_name(),
                value
            );
            Some(DiagnosticItem::new(
                provider,
                code,
                message,
                DiagnosticArea::Maintainability,
                DiagnosticLevel::Info,
                tree_item.clone(),
                source.clone(),
                context_id,
            ))
        }))
    }
}
