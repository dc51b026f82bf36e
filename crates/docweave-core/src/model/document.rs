use crate::model::field::{FieldModel, FieldRole};
use std::fmt;

///
/// DocumentModel
/// Declarative runtime model for one document type.
///

pub struct DocumentModel {
    /// Fully-qualified Rust type path (identity for dispatch and diagnostics).
    pub path: &'static str,
    /// Stable external name.
    pub name: &'static str,
    /// Default storage object (table / view) name.
    pub storage_name: &'static str,
    /// Ordered field list.
    pub fields: &'static [FieldModel],
}

impl DocumentModel {
    /// Look up a field by name (exact match).
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&'static FieldModel> {
        self.fields.iter().find(|field| field.name == name)
    }

    /// Return the first field carrying `role`.
    #[must_use]
    pub fn field_with_role(&self, role: FieldRole) -> Option<&'static FieldModel> {
        self.fields.iter().find(|field| field.has_role(role))
    }

    #[must_use]
    pub fn identifier(&self) -> Option<&'static FieldModel> {
        self.field_with_role(FieldRole::Identifier)
    }

    #[must_use]
    pub fn created_field(&self) -> Option<&'static FieldModel> {
        self.field_with_role(FieldRole::Created)
    }

    #[must_use]
    pub fn updated_field(&self) -> Option<&'static FieldModel> {
        self.field_with_role(FieldRole::Updated)
    }

    #[must_use]
    pub fn deleted_field(&self) -> Option<&'static FieldModel> {
        self.field_with_role(FieldRole::Deleted)
    }

    /// Two models are the same document when their type paths match.
    #[must_use]
    pub fn same_document(&self, other: &Self) -> bool {
        std::ptr::eq(self, other) || self.path == other.path
    }
}

impl fmt::Debug for DocumentModel {
    // Embedded kinds may reference models cyclically; print identity only.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DocumentModel")
            .field("path", &self.path)
            .field("storage_name", &self.storage_name)
            .field("fields", &self.fields.len())
            .finish()
    }
}
