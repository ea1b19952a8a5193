//! Scene snapshots: a JSON description of the inspected object graph.
//!
//! Process attach is handled by an external collaborator; what this crate
//! receives is a snapshot of the application's UI contexts, windows, elements,
//! resource dictionaries, bindings and data contexts, which it rebuilds into
//! the live model the mirror tree inspects.

use std::path::Path;
use std::rc::Rc;

use serde::Deserialize;
use serde_json::Value as JsonValue;

use crate::error::Result;
use crate::model::binding::{set_binding, Binding};
use crate::model::object::{BaseValueSource, Brush, Color, Element, Property, Value, ValueOrigin};
use crate::model::resources::ResourceDictionary;
use crate::model::roots::{UiContext, Window};

#[derive(Debug, Deserialize)]
pub struct SceneDoc {
    pub contexts: Vec<ContextDoc>,
}

#[derive(Debug, Deserialize)]
pub struct ContextDoc {
    pub id: usize,
    #[serde(default)]
    pub windows: Vec<WindowDoc>,
}

#[derive(Debug, Deserialize)]
pub struct WindowDoc {
    #[serde(default)]
    pub title: String,
    #[serde(default = "default_true")]
    pub visible: bool,
    pub root: ElementDoc,
}

#[derive(Debug, Deserialize)]
pub struct ElementDoc {
    #[serde(rename = "type")]
    pub type_name: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub properties: Vec<PropertyDoc>,
    #[serde(default)]
    pub children: Vec<ElementDoc>,
    #[serde(default)]
    pub resources: Option<DictionaryDoc>,
    #[serde(default)]
    pub data_context: Option<JsonValue>,
}

#[derive(Debug, Deserialize)]
pub struct PropertyDoc {
    pub name: String,
    #[serde(default)]
    pub value: JsonValue,
    /// "default", "inherited", "style" or "local".
    #[serde(default)]
    pub source: Option<String>,
    /// Binding path evaluated against the element's data context.
    #[serde(default)]
    pub binding: Option<String>,
    #[serde(default)]
    pub read_only: bool,
}

#[derive(Debug, Deserialize)]
pub struct DictionaryDoc {
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub merged: Vec<DictionaryDoc>,
    #[serde(default)]
    pub entries: Vec<EntryDoc>,
}

#[derive(Debug, Deserialize)]
pub struct EntryDoc {
    #[serde(default)]
    pub key: Option<String>,
    #[serde(default)]
    pub value: JsonValue,
    /// Set when the entry's definition is broken in the source document.
    #[serde(default)]
    pub error: Option<String>,
}

fn default_true() -> bool {
    true
}

/// Load a scene file and rebuild the inspected contexts from it.
pub fn load(path: &Path) -> Result<Vec<UiContext>> {
    let text = std::fs::read_to_string(path)?;
    let contexts = parse(&text)?;
    tracing::info!(
        scene = %path.display(),
        contexts = contexts.len(),
        "scene loaded"
    );
    Ok(contexts)
}

/// Parse a scene document and build one `UiContext` per declared context.
pub fn parse(text: &str) -> Result<Vec<UiContext>> {
    let doc: SceneDoc = serde_json::from_str(text)?;
    let mut contexts = Vec::with_capacity(doc.contexts.len());
    for context_doc in &doc.contexts {
        let mut context = UiContext::new(context_doc.id);
        for window_doc in &context_doc.windows {
            let root = build_element(&window_doc.root, &context);
            context.add_window(Window::new(
                window_doc.title.clone(),
                window_doc.visible,
                root,
            ));
        }
        contexts.push(context);
    }
    Ok(contexts)
}

fn build_element(doc: &ElementDoc, context: &UiContext) -> Rc<Element> {
    let element = Element::new(&doc.type_name, &doc.name, context.dispatcher().clone());

    if let Some(data_context) = &doc.data_context {
        element.set_data_context(Rc::new(convert(data_context)));
    }
    if let Some(resources) = &doc.resources {
        element.set_resources(build_dictionary(resources));
    }

    for property_doc in &doc.properties {
        let origin = parse_origin(property_doc.source.as_deref());
        let property = Property::new(
            &property_doc.name,
            convert(&property_doc.value),
            origin,
            property_doc.read_only,
        );
        element.add_property(property.clone());

        if let Some(path) = &property_doc.binding {
            match set_binding(&element, &property, Binding::new(path.clone())) {
                Ok(_) => {}
                Err(err) => tracing::warn!(
                    property = property_doc.name,
                    "binding skipped: {err}"
                ),
            }
        }
    }

    for child_doc in &doc.children {
        element.add_child(build_element(child_doc, context));
    }
    element
}

fn build_dictionary(doc: &DictionaryDoc) -> Rc<ResourceDictionary> {
    let dict = match doc.source.as_deref() {
        Some(source) if !source.is_empty() => ResourceDictionary::from_source(source),
        _ => ResourceDictionary::runtime(),
    };
    for merged in &doc.merged {
        dict.add_merged(build_dictionary(merged));
    }
    for entry in &doc.entries {
        let key = entry.key.as_ref().map(|k| Rc::new(Value::Text(k.clone())));
        match &entry.error {
            Some(reason) => dict.insert_invalid(key, reason),
            None => dict.insert(key, Rc::new(convert(&entry.value))),
        }
    }
    dict
}

fn parse_origin(source: Option<&str>) -> ValueOrigin {
    let base = match source {
        Some("local") => BaseValueSource::Local,
        Some("inherited") => BaseValueSource::Inherited,
        Some("style") => BaseValueSource::Style,
        _ => BaseValueSource::Default,
    };
    ValueOrigin {
        base,
        is_expression: false,
    }
}

/// Map a JSON value onto the inspected-model value space. Strings in hex color
/// notation become colors, `{"$brush": …}` objects become brushes, plain
/// objects become data-context records.
fn convert(value: &JsonValue) -> Value {
    match value {
        JsonValue::Null => Value::Null,
        JsonValue::Bool(b) => Value::Bool(*b),
        JsonValue::Number(n) => match n.as_i64() {
            Some(i) => Value::Int(i),
            None => Value::Float(n.as_f64().unwrap_or(0.0)),
        },
        JsonValue::String(s) => match Color::parse(s) {
            Some(color) => Value::Color(color),
            None => Value::Text(s.clone()),
        },
        JsonValue::Array(items) => {
            let stops: Option<Vec<Color>> = items
                .iter()
                .map(|item| item.as_str().and_then(Color::parse))
                .collect();
            match stops {
                Some(stops) if !stops.is_empty() => Value::Brush(Brush::LinearGradient(stops)),
                _ => {
                    tracing::warn!("unsupported array value in scene, treated as null");
                    Value::Null
                }
            }
        }
        JsonValue::Object(fields) => {
            if let Some(JsonValue::String(hex)) = fields.get("$brush") {
                if let Some(color) = Color::parse(hex) {
                    return Value::Brush(Brush::Solid(color));
                }
            }
            let map = fields
                .iter()
                .map(|(name, value)| (name.clone(), Rc::new(convert(value))))
                .collect();
            Value::Map(map)
        }
    }
}
