use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

use crate::model::binding::BindingExpression;
use crate::model::dispatcher::Dispatcher;
use crate::model::resources::ResourceDictionary;

/// RGBA color value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    /// The no-op sentinel: a fully transparent value is never flagged as a
    /// hardcoded visual.
    pub const TRANSPARENT: Color = Color {
        r: 0,
        g: 0,
        b: 0,
        a: 0,
    };

    pub fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    /// Parse `#RRGGBB` or `#RRGGBBAA`.
    pub fn parse(s: &str) -> Option<Color> {
        let hex = s.strip_prefix('#')?;
        let byte = |i: usize| u8::from_str_radix(hex.get(i..i + 2)?, 16).ok();
        match hex.len() {
            6 => Some(Color {
                r: byte(0)?,
                g: byte(2)?,
                b: byte(4)?,
                a: 255,
            }),
            8 => Some(Color {
                r: byte(0)?,
                g: byte(2)?,
                b: byte(4)?,
                a: byte(6)?,
            }),
            _ => None,
        }
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.a == 255 {
            write!(f, "#{:02X}{:02X}{:02X}", self.r, self.g, self.b)
        } else {
            write!(
                f,
                "#{:02X}{:02X}{:02X}{:02X}",
                self.r, self.g, self.b, self.a
            )
        }
    }
}

/// Paint description used by visual properties.
#[derive(Debug, Clone, PartialEq)]
pub enum Brush {
    Solid(Color),
    LinearGradient(Vec<Color>),
}

impl Brush {
    pub fn is_transparent(&self) -> bool {
        match self {
            Brush::Solid(color) => *color == Color::TRANSPARENT,
            Brush::LinearGradient(stops) => stops.iter().all(|c| *c == Color::TRANSPARENT),
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Brush::Solid(_) => "SolidColorBrush",
            Brush::LinearGradient(_) => "LinearGradientBrush",
        }
    }
}

impl fmt::Display for Brush {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Brush::Solid(color) => write!(f, "{color}"),
            Brush::LinearGradient(stops) => {
                let parts: Vec<String> = stops.iter().map(|c| c.to_string()).collect();
                write!(f, "gradient({})", parts.join(", "))
            }
        }
    }
}

/// A value living in the inspected object graph: a property value, a resource,
/// or a data-context record for binding paths.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Color(Color),
    Brush(Brush),
    Map(BTreeMap<String, Rc<Value>>),
}

impl Value {
    /// Runtime type name used for display suffixes.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "Null",
            Value::Bool(_) => "Bool",
            Value::Int(_) => "Int",
            Value::Float(_) => "Float",
            Value::Text(_) => "String",
            Value::Color(_) => "Color",
            Value::Brush(brush) => brush.type_name(),
            Value::Map(_) => "Record",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "{{null}}"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(i) => write!(f, "{i}"),
            Value::Float(x) => write!(f, "{x}"),
            Value::Text(s) => write!(f, "{s}"),
            Value::Color(c) => write!(f, "{c}"),
            Value::Brush(b) => write!(f, "{b}"),
            Value::Map(fields) => write!(f, "{{{} fields}}", fields.len()),
        }
    }
}

/// Where a property's effective value came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BaseValueSource {
    Default,
    Inherited,
    Style,
    Local,
}

/// Provenance of a property value: the base source plus whether the value is
/// currently produced by an expression (binding) rather than a literal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValueOrigin {
    pub base: BaseValueSource,
    pub is_expression: bool,
}

impl ValueOrigin {
    pub fn unset() -> Self {
        Self {
            base: BaseValueSource::Default,
            is_expression: false,
        }
    }

    pub fn inherited() -> Self {
        Self {
            base: BaseValueSource::Inherited,
            is_expression: false,
        }
    }

    pub fn style() -> Self {
        Self {
            base: BaseValueSource::Style,
            is_expression: false,
        }
    }

    pub fn local() -> Self {
        Self {
            base: BaseValueSource::Local,
            is_expression: false,
        }
    }

    pub fn expression() -> Self {
        Self {
            base: BaseValueSource::Local,
            is_expression: true,
        }
    }

    /// A literal set directly on the instance: not inherited, not styled, and
    /// not the output of a binding.
    pub fn is_local_literal(&self) -> bool {
        self.base == BaseValueSource::Local && !self.is_expression
    }
}

/// One externally-settable property on an element.
pub struct Property {
    name: String,
    default: Rc<Value>,
    value: RefCell<Rc<Value>>,
    origin: Cell<ValueOrigin>,
    read_only: bool,
    binding: RefCell<Option<Rc<BindingExpression>>>,
}

impl Property {
    pub fn new(
        name: impl Into<String>,
        value: Value,
        origin: ValueOrigin,
        read_only: bool,
    ) -> Rc<Self> {
        Rc::new(Self {
            name: name.into(),
            default: Rc::new(Value::Null),
            value: RefCell::new(Rc::new(value)),
            origin: Cell::new(origin),
            read_only,
            binding: RefCell::new(None),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_read_only(&self) -> bool {
        self.read_only
    }

    pub fn value(&self) -> Rc<Value> {
        self.value.borrow().clone()
    }

    /// Fallible read used by diagnostic providers: a value mutated mid-scan
    /// must be skipped, not panic the scan.
    pub fn try_value(&self) -> Result<Rc<Value>, std::cell::BorrowError> {
        Ok(self.value.try_borrow()?.clone())
    }

    pub fn origin(&self) -> ValueOrigin {
        self.origin.get()
    }

    pub(crate) fn set_value(&self, value: Rc<Value>, origin: ValueOrigin) {
        *self.value.borrow_mut() = value;
        self.origin.set(origin);
    }

    pub(crate) fn reset(&self) {
        *self.value.borrow_mut() = self.default.clone();
        self.origin.set(ValueOrigin::unset());
    }

    pub fn binding_expression(&self) -> Option<Rc<BindingExpression>> {
        self.binding.borrow().clone()
    }

    pub(crate) fn set_binding_expression(&self, expression: Option<Rc<BindingExpression>>) {
        *self.binding.borrow_mut() = expression;
    }
}

/// One element of the inspected visual tree. Owned by the inspected
/// application; the inspector holds non-owning handles only.
pub struct Element {
    name: String,
    type_name: String,
    properties: RefCell<Vec<Rc<Property>>>,
    children: RefCell<Vec<Rc<Element>>>,
    resources: RefCell<Rc<ResourceDictionary>>,
    data_context: RefCell<Rc<Value>>,
    dispatcher: Rc<Dispatcher>,
}

impl fmt::Debug for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Element")
            .field("type_name", &self.type_name)
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

impl Element {
    pub fn new(
        type_name: impl Into<String>,
        name: impl Into<String>,
        dispatcher: Rc<Dispatcher>,
    ) -> Rc<Self> {
        Rc::new(Self {
            name: name.into(),
            type_name: type_name.into(),
            properties: RefCell::new(Vec::new()),
            children: RefCell::new(Vec::new()),
            resources: RefCell::new(ResourceDictionary::runtime()),
            data_context: RefCell::new(Rc::new(Value::Null)),
            dispatcher,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn dispatcher(&self) -> &Rc<Dispatcher> {
        &self.dispatcher
    }

    pub fn add_property(&self, property: Rc<Property>) {
        self.properties.borrow_mut().push(property);
    }

    pub fn properties(&self) -> Vec<Rc<Property>> {
        self.properties.borrow().clone()
    }

    pub fn property(&self, name: &str) -> Option<Rc<Property>> {
        self.properties
            .borrow()
            .iter()
            .find(|p| p.name() == name)
            .cloned()
    }

    pub fn add_child(&self, child: Rc<Element>) {
        self.children.borrow_mut().push(child);
    }

    pub fn children(&self) -> Vec<Rc<Element>> {
        self.children.borrow().clone()
    }

    pub fn resources(&self) -> Rc<ResourceDictionary> {
        self.resources.borrow().clone()
    }

    pub fn set_resources(&self, resources: Rc<ResourceDictionary>) {
        *self.resources.borrow_mut() = resources;
    }

    pub fn data_context(&self) -> Rc<Value> {
        self.data_context.borrow().clone()
    }

    pub fn set_data_context(&self, context: Rc<Value>) {
        *self.data_context.borrow_mut() = context;
    }

    /// Set a literal directly on the instance.
    pub fn set_local_value(&self, property: &Rc<Property>, value: Value) {
        property.set_value(Rc::new(value), ValueOrigin::local());
    }

    /// Clear a property back to its default: local value gone, binding detached.
    pub fn clear_value(&self, property: &Rc<Property>) {
        property.set_binding_expression(None);
        property.reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn color_parse_rgb() {
        assert_eq!(Color::parse("#FF8000"), Some(Color::rgb(255, 128, 0)));
    }

    #[test]
    fn color_parse_rgba() {
        let c = Color::parse("#00000000").unwrap();
        assert_eq!(c, Color::TRANSPARENT);
    }

    #[test]
    fn color_parse_rejects_garbage() {
        assert_eq!(Color::parse("red"), None);
        assert_eq!(Color::parse("#12"), None);
        assert_eq!(Color::parse("#GGGGGG"), None);
    }

    #[test]
    fn color_display_round_trips() {
        let c = Color::rgb(1, 2, 3);
        assert_eq!(c.to_string(), "#010203");
        assert_eq!(Color::parse(&c.to_string()), Some(c));
    }

    #[test]
    fn transparent_brush_detection() {
        assert!(Brush::Solid(Color::TRANSPARENT).is_transparent());
        assert!(!Brush::Solid(Color::rgb(255, 0, 0)).is_transparent());
        assert!(Brush::LinearGradient(vec![Color::TRANSPARENT, Color::TRANSPARENT]).is_transparent());
    }

    #[test]
    fn value_type_names() {
        assert_eq!(Value::Text("x".into()).type_name(), "String");
        assert_eq!(
            Value::Brush(Brush::Solid(Color::TRANSPARENT)).type_name(),
            "SolidColorBrush"
        );
        assert_eq!(Value::Null.type_name(), "Null");
    }

    #[test]
    fn clear_value_restores_default_and_detaches() {
        let dispatcher = Dispatcher::new(0);
        let element = Element::new("Button", "ok", dispatcher);
        let property = Property::new(
            "Background",
            Value::Color(Color::rgb(9, 9, 9)),
            ValueOrigin::local(),
            false,
        );
        element.add_property(property.clone());

        element.clear_value(&property);
        assert!(property.value().is_null());
        assert_eq!(property.origin(), ValueOrigin::unset());
        assert!(property.binding_expression().is_none());
    }

    #[test]
    fn local_literal_provenance() {
        assert!(ValueOrigin::local().is_local_literal());
        assert!(!ValueOrigin::expression().is_local_literal());
        assert!(!ValueOrigin::inherited().is_local_literal());
        assert!(!ValueOrigin::style().is_local_literal());
    }
}
