//! Core of docweave: document models, the declarative operation IR, the
//! condition compiler and slicer, composition trees, and observability.
#![warn(unreachable_pub)]

#[macro_use]
mod macros;

// public exports are one module level down
pub mod config;
pub mod db;
pub mod error;
pub mod model;
pub mod obs;
pub mod path;
pub mod traits;
pub mod value;

// test
#[cfg(test)]
pub(crate) mod test_fixtures;

///
/// Prelude
///
/// Vocabulary for declaring documents and operations.
/// Errors, executors and the registry stay behind their module paths.
///

pub mod prelude {
    pub use crate::{
        db::{
            condition::CompareOp,
            hierarchy::CompositionTree,
            ir::{Builder, CommandKind, JoinKind, Parameter, SortDirection},
        },
        model::{DocumentModel, FieldKind, FieldRole},
        path::FieldRef,
        traits::{Document, Record},
        value::Value,
    };
}
