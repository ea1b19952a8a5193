use std::rc::Rc;

use crate::diagnostics::{DiagnosticArea, DiagnosticItem, DiagnosticLevel, DiagnosticProvider};
use crate::model::binding::BindingStatus;
use crate::tree::item::{Target, TreeItemRef};

/// Reports every property whose binding expression failed its last evaluation.
pub struct BindingFailuresProvider;

const BINDING_FAILED: &str = "BindingFailed";

impl DiagnosticProvider for BindingFailuresProvider {
    fn name(&self) -> &'static str {
        "Binding failures"
    }

    fn description(&self) -> &'static str {
        "Finds data bindings that could not resolve their path at evaluation time."
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
            let expression = property.binding_expression()?;
            if expression.status() != BindingStatus::PathError {
                return None;
            }
            let message = format!(
                "Binding '{}' on {}.{} failed to resolve",
                expression.binding().path(),
                type_name,
                property.name()
            );
            Some(DiagnosticItem::new(
                provider,
                BINDING_FAILED,
                message,
                DiagnosticArea::Binding,
                DiagnosticLevel::Error,
                tree_item.clone(),
                source.clone(),
                context_id,
            ))
        }))
    }
}
