use crate::path::FieldPath;
use serde::Serialize;

///
/// FieldMarker
///

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
pub enum FieldMarker {
    Include,
    Exclude,
    /// Projected when the backend has it; absence is not an error.
    Optional,
}

///
/// Projection
/// Maps one projected name to a source field on a container alias.
///

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Projection {
    pub marker: FieldMarker,
    pub name: String,
    pub alias: String,
    pub field: FieldPath,
}

impl Projection {
    #[must_use]
    pub fn new(marker: FieldMarker, alias: impl Into<String>, field: FieldPath) -> Self {
        Self {
            marker,
            name: field.dotted(),
            alias: alias.into(),
            field,
        }
    }

    #[must_use]
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }
}
