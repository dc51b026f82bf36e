use crate::{db::condition::Condition, model::DocumentModel, traits::Document};
use serde::Serialize;

///
/// ContainerKind
/// Storage object a container is bound to.
///

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize)]
pub enum ContainerKind {
    #[default]
    Table,
    View,
    Function,
    Procedure,
}

impl ContainerKind {
    /// Only routines can run an `Exec` operation.
    #[must_use]
    pub const fn is_executable(self) -> bool {
        matches!(self, Self::Function | Self::Procedure)
    }
}

///
/// Operation
///

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
pub enum Operation {
    Insert,
    Select,
    Update,
    Delete,
    Exec,
}

///
/// JoinKind
/// How a non-primary container attaches to the operation.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
pub enum JoinKind {
    Join,
    LeftJoin,
    CrossJoin,
    Unwind,
}

impl JoinKind {
    /// Join kinds that need an `ON` predicate.
    #[must_use]
    pub const fn requires_connect(self) -> bool {
        matches!(self, Self::Join | Self::LeftJoin)
    }
}

///
/// Container
///
/// One named source or target relation of an operation. A container with
/// no join modifier is the primary container.
///

#[derive(Clone, Debug)]
pub struct Container {
    pub model: &'static DocumentModel,
    pub alias: String,
    pub storage_name: String,
    pub kind: ContainerKind,
    pub operation: Operation,
    pub join: Option<JoinKind>,
    pub(crate) connect: Vec<Condition>,
}

impl Container {
    #[must_use]
    pub fn new(model: &'static DocumentModel, operation: Operation) -> Self {
        Self {
            model,
            alias: String::new(),
            storage_name: model.storage_name.to_string(),
            kind: ContainerKind::Table,
            operation,
            join: None,
            connect: Vec::new(),
        }
    }

    /// Primary container for document `D`, unaliased.
    #[must_use]
    pub fn primary<D: Document>(operation: Operation) -> Self {
        Self::new(D::MODEL, operation)
    }

    /// Joined (read-only) container for document `D`.
    #[must_use]
    pub fn joined<D: Document>(join: JoinKind, alias: impl Into<String>) -> Self {
        let mut container = Self::new(D::MODEL, Operation::Select);
        container.join = Some(join);
        container.alias = alias.into();
        container
    }

    #[must_use]
    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = alias.into();
        self
    }

    /// Override the physical storage name.
    #[must_use]
    pub fn named(mut self, storage_name: impl Into<String>) -> Self {
        self.storage_name = storage_name.into();
        self
    }

    #[must_use]
    pub const fn kind(mut self, kind: ContainerKind) -> Self {
        self.kind = kind;
        self
    }

    #[must_use]
    pub const fn is_primary(&self) -> bool {
        self.join.is_none()
    }

    /// Flat connect-condition list as declared.
    #[must_use]
    pub fn connect_conditions(&self) -> &[Condition] {
        &self.connect
    }
}
