use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use crate::model::object::Value;

/// Failure raised while materializing one resource. Captured as data and hung
/// off the leaf node; never thrown past the tree builder.
#[derive(Debug)]
pub struct ResolveError {
    pub key: String,
    pub reason: String,
}

impl fmt::Display for ResolveError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "resource '{}' failed to resolve: {}", self.key, self.reason)
    }
}

enum EntryPayload {
    Value(Rc<Value>),
    /// A deferred definition that fails on materialization, with the reason.
    Invalid(String),
}

struct DictionaryEntry {
    key: Option<Rc<Value>>,
    payload: EntryPayload,
}

/// One fully-resolved dictionary entry: resolution failure is data, not an error.
pub struct ResolvedEntry {
    pub key: Option<Rc<Value>>,
    pub value: Option<Rc<Value>>,
    pub error: Option<Rc<ResolveError>>,
}

/// A resource container from the inspected application: an unordered keyed
/// entry space plus merged sub-dictionaries in declared order.
pub struct ResourceDictionary {
    source: Option<String>,
    merged: RefCell<Vec<Rc<ResourceDictionary>>>,
    entries: RefCell<Vec<DictionaryEntry>>,
}

impl ResourceDictionary {
    /// A dictionary built in code, with no backing source.
    pub fn runtime() -> Rc<Self> {
        Rc::new(Self {
            source: None,
            merged: RefCell::new(Vec::new()),
            entries: RefCell::new(Vec::new()),
        })
    }

    /// A dictionary loaded from an external source (file or URI).
    pub fn from_source(source: impl Into<String>) -> Rc<Self> {
        Rc::new(Self {
            source: Some(source.into()),
            merged: RefCell::new(Vec::new()),
            entries: RefCell::new(Vec::new()),
        })
    }

    pub fn source(&self) -> Option<&str> {
        self.source.as_deref()
    }

    pub fn add_merged(&self, dictionary: Rc<ResourceDictionary>) {
        self.merged.borrow_mut().push(dictionary);
    }

    /// Merged sub-dictionaries in their declared order.
    pub fn merged(&self) -> Vec<Rc<ResourceDictionary>> {
        self.merged.borrow().clone()
    }

    pub fn insert(&self, key: Option<Rc<Value>>, value: Rc<Value>) {
        self.entries.borrow_mut().push(DictionaryEntry {
            key,
            payload: EntryPayload::Value(value),
        });
    }

    pub fn insert_invalid(&self, key: Option<Rc<Value>>, reason: impl Into<String>) {
        self.entries.borrow_mut().push(DictionaryEntry {
            key,
            payload: EntryPayload::Invalid(reason.into()),
        });
    }

    pub fn merged_count(&self) -> usize {
        self.merged.borrow().len()
    }

    pub fn key_count(&self) -> usize {
        self.entries.borrow().len()
    }

    /// Total resource count: merged sub-dictionaries plus keyed entries. This
    /// is derived from the model, so it is correct before any expansion.
    pub fn resource_count(&self) -> usize {
        self.merged_count() + self.key_count()
    }

    /// Resolve every entry, capturing per-key failures instead of propagating.
    pub fn resolve_entries(&self) -> Vec<ResolvedEntry> {
        self.entries
            .borrow()
            .iter()
            .map(|entry| match &entry.payload {
                EntryPayload::Value(value) => ResolvedEntry {
                    key: entry.key.clone(),
                    value: Some(value.clone()),
                    error: None,
                },
                EntryPayload::Invalid(reason) => ResolvedEntry {
                    key: entry.key.clone(),
                    value: None,
                    error: Some(Rc::new(ResolveError {
                        key: entry
                            .key
                            .as_ref()
                            .map(|k| k.to_string())
                            .unwrap_or_else(|| "{null}".into()),
                        reason: reason.clone(),
                    })),
                },
            })
            .collect()
    }
}
