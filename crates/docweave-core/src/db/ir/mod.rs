//! Declarative operation IR.
//!
//! A `Builder` accumulates everything one CRUD operation needs: containers,
//! filter and connect conditions, projection, parameters, sort and paging.
//! It is mutable until `normalize()`, which validates exactly once; after
//! that it is frozen and may be shared behind an `Arc`.

mod builder;
mod container;
mod order;
mod param;
mod projection;
pub(crate) mod validate;


use crate::{db::condition::CompareOp, model::DocumentModel};
use derive_more::Display;
use serde::Serialize;
use thiserror::Error as ThisError;

// re-exports
pub use builder::{Builder, CompiledContainer, CompiledOperation};
pub use container::{Container, ContainerKind, JoinKind, Operation};
pub use order::{AggregateOp, Aggregation, Page, SortDirection, SortOrder};
pub use param::{ParamDirection, ParamSet, Parameter};
pub use projection::{FieldMarker, Projection};

///
/// CommandKind
/// The six operations a builder can describe.
///

#[derive(Clone, Copy, Debug, Display, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub enum CommandKind {
    #[display("insert")]
    Insert,
    #[display("select")]
    Select,
    #[display("update")]
    Update,
    #[display("delete")]
    Delete,
    #[display("soft_delete")]
    SoftDelete,
    #[display("restore")]
    Restore,
}

impl CommandKind {
    pub const ALL: [Self; 6] = [
        Self::Insert,
        Self::Select,
        Self::Update,
        Self::Delete,
        Self::SoftDelete,
        Self::Restore,
    ];

    /// Keyed mutations must carry at least one filter condition.
    #[must_use]
    pub const fn requires_filter(self) -> bool {
        matches!(
            self,
            Self::Update | Self::Delete | Self::SoftDelete | Self::Restore
        )
    }

    /// Operation the primary container performs.
    #[must_use]
    pub const fn operation(self) -> Operation {
        match self {
            Self::Insert => Operation::Insert,
            Self::Select => Operation::Select,
            Self::Update | Self::SoftDelete | Self::Restore => Operation::Update,
            Self::Delete => Operation::Delete,
        }
    }
}

///
/// ConfigError
///
/// Build-time configuration failure. Raised while an operation is declared
/// or normalized, never at request time. Every variant names the document.
///

#[derive(Clone, Debug, Eq, PartialEq, ThisError)]
pub enum ConfigError {
    #[error("{document}: unknown field '{field}'")]
    UnknownField { document: String, field: String },

    #[error("{document}: field '{field}' is declared on '{owner}'")]
    ForeignField {
        document: String,
        field: String,
        owner: String,
    },

    #[error("{document}: field '{field}' has no storage and cannot be referenced")]
    NotQueryable { document: String, field: String },

    #[error("{document}: unknown container alias '{alias}'")]
    UnknownAlias { document: String, alias: String },

    #[error("{document}: container alias '{alias}' is declared twice")]
    DuplicateAlias { document: String, alias: String },

    #[error("{document}: operation has no primary container")]
    MissingPrimary { document: String },

    #[error("{document}: container '{alias}' is a second primary container")]
    DuplicatePrimary { document: String, alias: String },

    #[error("{document}: {command} requires at least one filter condition")]
    MissingFilter {
        document: String,
        command: CommandKind,
    },

    #[error("{document}: builder is normalized and can no longer be modified")]
    Frozen { document: String },

    #[error("{document}: operator {op} cannot compare field '{field}' with another field")]
    IllegalFieldComparison {
        document: String,
        field: String,
        op: CompareOp,
    },

    #[error("{document}: field '{field}' is not comparable with '{other}'")]
    IncompatibleFields {
        document: String,
        field: String,
        other: String,
    },

    #[error("{document}: operator {op} is not supported on field '{field}' of kind {kind}")]
    OperatorNotSupported {
        document: String,
        field: String,
        op: CompareOp,
        kind: String,
    },

    #[error("{document}: field '{field}' cannot be sorted")]
    NotOrderable { document: String, field: String },

    #[error("{document}: aggregate {op:?} is not supported on field '{field}'")]
    NotAggregatable {
        document: String,
        field: String,
        op: AggregateOp,
    },

    #[error("{document}: null compared against non-nullable field '{field}'")]
    NullOnNonNullable { document: String, field: String },

    #[error("{document}: operator {op} on field '{field}' does not accept null")]
    NullOperand {
        document: String,
        field: String,
        op: CompareOp,
    },

    #[error("{document}: range on field '{field}' needs an even, non-zero value count, got {count}")]
    MalformedBetween {
        document: String,
        field: String,
        count: usize,
    },

    #[error("{document}: case-insensitive {op} is not supported on field '{field}'")]
    CaseInsensitive {
        document: String,
        field: String,
        op: CompareOp,
    },

    #[error("{document}: {value} literal does not match field '{field}' of kind {kind}")]
    InvalidLiteral {
        document: String,
        field: String,
        value: String,
        kind: String,
    },

    #[error("{document}: unknown parameter '{name}'")]
    UnknownParameter { document: String, name: String },

    #[error("{document}: parameter '{name}' is declared twice")]
    DuplicateParameter { document: String, name: String },

    #[error("{document}: begin()/end() groups are unbalanced")]
    UnbalancedGroup { document: String },

    #[error("{document}: document declares no field with the {role} role")]
    MissingRoleField { document: String, role: String },

    #[error("{document}: joined container '{alias}' has no connect condition")]
    MissingConnect { document: String, alias: String },

    #[error("{document}: container '{alias}' cannot execute a {kind:?}")]
    NotExecutable {
        document: String,
        alias: String,
        kind: ContainerKind,
    },

    #[error("{document}: {clause} is only valid on select operations")]
    SelectOnly {
        document: String,
        clause: &'static str,
    },
}

impl ConfigError {
    pub(crate) fn unknown_field(model: &DocumentModel, field: &str) -> Self {
        Self::UnknownField {
            document: model.path.to_string(),
            field: field.to_string(),
        }
    }
}
