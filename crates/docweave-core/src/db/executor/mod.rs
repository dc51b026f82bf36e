//! Storage executor seam.
//!
//! The core never performs I/O. A backend implements `Executor` over
//! `CompiledOperation`s; `execute` dispatches by command and applies the
//! keyed-mutation not-found rule uniformly.

#[cfg(test)]
mod tests;

use crate::{
    db::ir::{CommandKind, CompiledOperation},
    error::{ErrorClass, ErrorOrigin},
    value::Value,
};
use chrono::Utc;
use thiserror::Error as ThisError;
use tracing::trace;

///
/// ExecuteError
///

#[derive(Clone, Debug, Eq, PartialEq, ThisError)]
pub enum ExecuteError {
    #[error("{document}: no row matched the operation filter")]
    NotFound { document: String },

    #[error("{document}: {command} needs a deleted-role field")]
    MissingDeletedField {
        document: String,
        command: CommandKind,
    },

    #[error("backend failure: {0}")]
    Backend(String),
}

impl ExecuteError {
    pub fn backend(source: impl std::fmt::Display) -> Self {
        Self::Backend(source.to_string())
    }

    #[must_use]
    pub const fn class(&self) -> ErrorClass {
        match self {
            Self::NotFound { .. } => ErrorClass::NotFound,
            Self::MissingDeletedField { .. } => ErrorClass::InvariantViolation,
            Self::Backend(_) => ErrorClass::Backend,
        }
    }

    #[must_use]
    pub const fn origin(&self) -> ErrorOrigin {
        ErrorOrigin::Executor
    }
}

///
/// Executor
///
/// Backend collaborator. Mutations report the affected row count; `execute`
/// turns a zero count on a keyed mutation into `ExecuteError::NotFound`.
///

pub trait Executor {
    type Row;
    type Cursor: Iterator<Item = Result<Self::Row, ExecuteError>>;

    fn insert(&mut self, op: &CompiledOperation) -> Result<Self::Row, ExecuteError>;

    fn select(&mut self, op: &CompiledOperation) -> Result<Self::Cursor, ExecuteError>;

    fn update(&mut self, op: &CompiledOperation) -> Result<u64, ExecuteError>;

    fn delete(&mut self, op: &CompiledOperation) -> Result<u64, ExecuteError>;

    /// Stamp `op.deleted_field` with `deleted_at` on every matching row.
    fn soft_delete(
        &mut self,
        op: &CompiledOperation,
        deleted_at: &Value,
    ) -> Result<u64, ExecuteError>;

    /// Clear `op.deleted_field` on every matching row.
    fn restore(&mut self, op: &CompiledOperation) -> Result<u64, ExecuteError>;
}

///
/// Outcome
///

#[derive(Debug)]
pub enum Outcome<R, C> {
    Row(R),
    Cursor(C),
    Affected(u64),
}

impl<R, C> Outcome<R, C> {
    #[must_use]
    pub const fn affected(&self) -> Option<u64> {
        match self {
            Self::Affected(count) => Some(*count),
            _ => None,
        }
    }
}

/// Keyed mutations that touch nothing are a not-found, not a silent success.
pub fn ensure_affected(document: &str, affected: u64) -> Result<u64, ExecuteError> {
    if affected == 0 {
        return Err(ExecuteError::NotFound {
            document: document.to_string(),
        });
    }

    Ok(affected)
}

/// Value written into the deleted-role field by a soft delete.
#[must_use]
pub fn deletion_stamp() -> Value {
    Value::Timestamp(Utc::now())
}

/// Run `op` against `executor` according to its command.
pub fn execute<E>(
    executor: &mut E,
    op: &CompiledOperation,
) -> Result<Outcome<E::Row, E::Cursor>, ExecuteError>
where
    E: Executor + ?Sized,
{
    let outcome = match op.command {
        CommandKind::Insert => Outcome::Row(executor.insert(op)?),
        CommandKind::Select => Outcome::Cursor(executor.select(op)?),
        CommandKind::Update => Outcome::Affected(executor.update(op)?),
        CommandKind::Delete => Outcome::Affected(executor.delete(op)?),
        CommandKind::SoftDelete => {
            ensure_deleted_field(op)?;
            Outcome::Affected(executor.soft_delete(op, &deletion_stamp())?)
        }
        CommandKind::Restore => {
            ensure_deleted_field(op)?;
            Outcome::Affected(executor.restore(op)?)
        }
    };

    if let Outcome::Affected(affected) = outcome
        && op.keyed
    {
        ensure_affected(op.document, affected)?;
    }
    trace!(
        document = op.document,
        command = %op.command,
        affected = ?outcome.affected(),
        "executed operation"
    );

    Ok(outcome)
}

fn ensure_deleted_field(op: &CompiledOperation) -> Result<(), ExecuteError> {
    if op.deleted_field.is_none() {
        return Err(ExecuteError::MissingDeletedField {
            document: op.document.to_string(),
            command: op.command,
        });
    }

    Ok(())
}
