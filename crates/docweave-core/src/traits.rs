use crate::{model::DocumentModel, value::Value};
use std::collections::BTreeMap;

///
/// Document
///
/// A host type with a declared runtime model.
/// Usually implemented through `document!`.
///

pub trait Document: 'static {
    const MODEL: &'static DocumentModel;

    /// Fully-qualified type path of the model.
    #[must_use]
    fn path() -> &'static str {
        Self::MODEL.path
    }
}

///
/// Record
///
/// A materialized row as seen by parent-filter binding.
/// Field lookups use model field names, not storage names.
///

pub trait Record {
    fn value(&self, field: &str) -> Option<Value>;
}

impl Record for BTreeMap<String, Value> {
    fn value(&self, field: &str) -> Option<Value> {
        self.get(field).cloned()
    }
}

impl Record for BTreeMap<&'static str, Value> {
    fn value(&self, field: &str) -> Option<Value> {
        self.get(field).cloned()
    }
}
