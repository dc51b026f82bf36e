//! ## Crate layout
//! - `core`: document models, the operation IR, the condition compiler and
//!   slicer, composition trees, the registry, and observability.
//!
//! Declare documents with `document!`, describe operations with
//! `Builder`, freeze them into a `Registry`, and hand compiled operations
//! to an `Executor`. The `prelude` covers the declaration vocabulary.

pub use docweave_core as core;

//
// Consts
//

/// Workspace version re-export for downstream tooling/tests.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

//
// Macros
//

pub use docweave_core::document;

// re-exports
pub use docweave_core::{config, db, error, model, obs, path, traits, value};

///
/// Prelude
/// using _ brings traits into scope and avoids name conflicts
///

pub mod prelude {
    pub use crate::core::{
        config::CompilerConfig,
        db::{
            compile::{Dialect, Postgres},
            condition::CompareOp,
            executor::{Executor, Outcome, execute},
            hierarchy::CompositionTree,
            ir::{Builder, CommandKind, JoinKind, Parameter, SortDirection},
            registry::{Registry, RegistryBuilder},
        },
        model::{DocumentModel, FieldKind, FieldRole},
        path::FieldRef,
        traits::{Document as _, Record},
        value::Value,
    };
}
