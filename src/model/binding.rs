use std::cell::Cell;
use std::rc::{Rc, Weak};

use crate::error::{AppError, Result};
use crate::model::dispatcher::Priority;
use crate::model::object::{Element, Property, Value, ValueOrigin};
use crate::model::trace::{data_binding_source, TraceEvent, TraceLevel};

/// A binding declaration: a path evaluated against an element's data context.
#[derive(Debug)]
pub struct Binding {
    path: String,
}

impl Binding {
    pub fn new(path: impl Into<String>) -> Rc<Self> {
        Rc::new(Self { path: path.into() })
    }

    pub fn path(&self) -> &str {
        &self.path
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindingStatus {
    Unattached,
    Active,
    PathError,
}

/// A live binding instance connecting one property to the data context.
/// Failure text is only observable through the binding trace source, and only
/// at evaluation time.
pub struct BindingExpression {
    id: u64,
    binding: Rc<Binding>,
    element: Weak<Element>,
    property: Rc<Property>,
    status: Cell<BindingStatus>,
}

thread_local! {
    static NEXT_EXPRESSION_ID: Cell<u64> = const { Cell::new(1) };
}

fn next_expression_id() -> u64 {
    NEXT_EXPRESSION_ID.with(|next| {
        let id = next.get();
        next.set(id + 1);
        id
    })
}

impl BindingExpression {
    /// Stable identifier used to correlate trace events with this expression.
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn binding(&self) -> &Rc<Binding> {
        &self.binding
    }

    pub fn status(&self) -> BindingStatus {
        self.status.get()
    }

    pub fn property(&self) -> &Rc<Property> {
        &self.property
    }
}

/// Attach a binding to a property and schedule its first evaluation.
pub fn set_binding(
    element: &Rc<Element>,
    property: &Rc<Property>,
    binding: Rc<Binding>,
) -> Result<Rc<BindingExpression>> {
    if property.is_read_only() {
        return Err(AppError::ReadOnlyProperty(property.name().to_string()));
    }
    let expression = Rc::new(BindingExpression {
        id: next_expression_id(),
        binding,
        element: Rc::downgrade(element),
        property: property.clone(),
        status: Cell::new(BindingStatus::Unattached),
    });
    property.set_binding_expression(Some(expression.clone()));
    schedule_evaluation(&expression);
    Ok(expression)
}

/// Reattach an existing expression after its property was cleared, forcing a
/// fresh evaluation cycle. The expression keeps its identity, so trace events
/// from the re-evaluation carry the same id.
pub fn reapply(
    element: &Rc<Element>,
    property: &Rc<Property>,
    expression: &Rc<BindingExpression>,
) -> Result<()> {
    if property.is_read_only() {
        return Err(AppError::ReadOnlyProperty(property.name().to_string()));
    }
    let _ = element;
    property.set_binding_expression(Some(expression.clone()));
    expression.status.set(BindingStatus::Unattached);
    schedule_evaluation(expression);
    Ok(())
}

fn schedule_evaluation(expression: &Rc<BindingExpression>) {
    let Some(element) = expression.element.upgrade() else {
        return;
    };
    let expression = expression.clone();
    element
        .dispatcher()
        .post(Priority::DataBind, move || evaluate(&expression));
}

/// Evaluate the binding path against the owning element's data context.
///
/// On failure the property falls back to its default (still marked as
/// expression-produced) and an error event tagged with the expression id is
/// emitted on the binding trace source.
pub fn evaluate(expression: &Rc<BindingExpression>) {
    let Some(element) = expression.element.upgrade() else {
        return;
    };
    // A later rebind may have replaced this expression while it was queued.
    match expression.property.binding_expression() {
        Some(current) if Rc::ptr_eq(&current, expression) => {}
        _ => return,
    }

    match resolve_path(&element.data_context(), expression.binding.path()) {
        Ok(value) => {
            expression
                .property
                .set_value(value, ValueOrigin::expression());
            expression.status.set(BindingStatus::Active);
        }
        Err(reason) => {
            expression.status.set(BindingStatus::PathError);
            expression
                .property
                .set_value(Rc::new(Value::Null), ValueOrigin::expression());
            let message = format!(
                "Cannot resolve binding path '{}' on '{}' (property '{}'): {}",
                expression.binding.path(),
                element.type_name(),
                expression.property.name(),
                reason
            );
            data_binding_source().trace(TraceEvent {
                level: TraceLevel::Error,
                message,
                expression_id: Some(expression.id),
            });
        }
    }
}

fn resolve_path(context: &Rc<Value>, path: &str) -> std::result::Result<Rc<Value>, String> {
    let mut current = context.clone();
    for segment in path.split('.') {
        let next = match &*current {
            Value::Map(fields) => fields.get(segment).cloned(),
            Value::Null => return Err("the data context is null".into()),
            other => {
                return Err(format!(
                    "'{segment}' cannot be resolved on a {} value",
                    other.type_name()
                ))
            }
        };
        match next {
            Some(value) => current = value,
            None => return Err(format!("'{segment}' was not found on the data context")),
        }
    }
    Ok(current)
}
