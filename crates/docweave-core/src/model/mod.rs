//! Declarative document metadata.
//!
//! Models are plain statics produced by `document!` or written by hand.
//! Nothing in the crate introspects host types; every lookup goes through
//! these name → descriptor tables.

pub mod document;
pub mod field;

pub use document::DocumentModel;
pub use field::{FieldKind, FieldModel, FieldRole, FieldRoles};
