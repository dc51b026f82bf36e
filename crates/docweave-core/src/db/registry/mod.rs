//! Operation registry.
//!
//! One immutable map from (document, command) to a normalized builder, plus
//! document → composition tree. Built once at startup and passed by
//! reference; nothing here is global.


use crate::{
    db::{
        compile::{CompileError, Dialect},
        hierarchy::CompositionTree,
        ir::{Builder, CommandKind, CompiledOperation, ConfigError, ParamSet},
    },
    path::FieldPath,
    traits::Document,
};
use std::{collections::BTreeMap, sync::Arc};
use thiserror::Error as ThisError;
use tracing::debug;

///
/// RegistryError
///

#[derive(Clone, Debug, Eq, PartialEq, ThisError)]
pub enum RegistryError {
    #[error("{document}: a {command} builder is already registered")]
    DuplicateBuilder {
        document: String,
        command: CommandKind,
    },

    #[error("{document}: a composition tree is already registered")]
    DuplicateTree { document: String },

    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Commands whose shape may stand in for `command`, in lookup order.
#[must_use]
pub const fn fallbacks(command: CommandKind) -> &'static [CommandKind] {
    match command {
        CommandKind::SoftDelete => &[CommandKind::Delete, CommandKind::Update],
        CommandKind::Restore => &[CommandKind::SoftDelete, CommandKind::Update],
        _ => &[],
    }
}

///
/// Resolved
///
/// Registry hit. When `source != requested` the builder was borrowed from a
/// fallback: only its containers and filter shape apply, and the caller
/// still executes `requested`.
///

#[derive(Clone, Debug)]
pub struct Resolved {
    pub builder: Arc<Builder>,
    pub requested: CommandKind,
    pub source: CommandKind,
}

impl Resolved {
    #[must_use]
    pub fn is_fallback(&self) -> bool {
        self.requested != self.source
    }

    /// Compile the builder as the requested command.
    ///
    /// A fallback keeps the builder's containers and conditions; the primary
    /// container takes the requested operation and the deleted-role field
    /// comes from the document model.
    pub fn compile(
        &self,
        params: &ParamSet,
        dialect: &dyn Dialect,
    ) -> Result<CompiledOperation, CompileError> {
        let mut op = self.builder.compile(params, dialect)?;
        if !self.is_fallback() {
            return Ok(op);
        }

        op.command = self.requested;
        if let Some(primary) = op.containers.iter_mut().find(|c| c.join.is_none()) {
            primary.operation = self.requested.operation();
        }
        if op.deleted_field.is_none() {
            let model = self.builder.model();
            op.deleted_field = model
                .deleted_field()
                .and_then(|field| FieldPath::resolve(model, field.name).ok());
        }

        Ok(op)
    }
}

///
/// RegistryBuilder
///

#[derive(Debug, Default)]
pub struct RegistryBuilder {
    builders: BTreeMap<(&'static str, CommandKind), Arc<Builder>>,
    trees: BTreeMap<&'static str, Arc<CompositionTree>>,
}

impl RegistryBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Normalize and register a builder under its document and command.
    pub fn register(&mut self, builder: Builder) -> Result<&mut Self, RegistryError> {
        builder.normalize()?;

        let key = (builder.model().path, builder.command());
        if self.builders.contains_key(&key) {
            return Err(RegistryError::DuplicateBuilder {
                document: key.0.to_string(),
                command: key.1,
            });
        }
        self.builders.insert(key, Arc::new(builder));

        Ok(self)
    }

    /// Register a tree under the document its root is bound to.
    pub fn register_tree(&mut self, tree: CompositionTree) -> Result<&mut Self, RegistryError> {
        let path = tree.root_model().path;
        if self.trees.contains_key(path) {
            return Err(RegistryError::DuplicateTree {
                document: path.to_string(),
            });
        }
        self.trees.insert(path, Arc::new(tree));

        Ok(self)
    }

    /// Freeze, computing every fallback resolution once.
    #[must_use]
    pub fn build(self) -> Registry {
        let mut resolved: BTreeMap<&'static str, BTreeMap<CommandKind, Resolved>> =
            BTreeMap::new();
        let mut documents: Vec<&'static str> =
            self.builders.keys().map(|(path, _)| *path).collect();
        documents.dedup();

        for path in documents {
            let entries = resolved.entry(path).or_default();
            for command in CommandKind::ALL {
                let hit = std::iter::once(command)
                    .chain(fallbacks(command).iter().copied())
                    .find_map(|source| {
                        self.builders
                            .get(&(path, source))
                            .map(|builder| (source, builder))
                    });

                if let Some((source, builder)) = hit {
                    entries.insert(
                        command,
                        Resolved {
                            builder: Arc::clone(builder),
                            requested: command,
                            source,
                        },
                    );
                }
            }
        }

        debug!(
            builders = self.builders.len(),
            resolved = resolved.values().map(BTreeMap::len).sum::<usize>(),
            trees = self.trees.len(),
            "registry built"
        );

        Registry {
            resolved,
            trees: self.trees,
        }
    }
}

///
/// Registry
///

#[derive(Debug)]
pub struct Registry {
    resolved: BTreeMap<&'static str, BTreeMap<CommandKind, Resolved>>,
    trees: BTreeMap<&'static str, Arc<CompositionTree>>,
}

impl Registry {
    /// Explicit builder or its first registered fallback.
    #[must_use]
    pub fn resolve(&self, document_path: &str, command: CommandKind) -> Option<&Resolved> {
        self.resolved.get(document_path)?.get(&command)
    }

    #[must_use]
    pub fn resolve_for<D: Document>(&self, command: CommandKind) -> Option<&Resolved> {
        self.resolve(D::MODEL.path, command)
    }

    /// Builder registered for exactly this command, ignoring fallbacks.
    #[must_use]
    pub fn builder(&self, document_path: &str, command: CommandKind) -> Option<&Arc<Builder>> {
        self.resolve(document_path, command)
            .filter(|resolved| !resolved.is_fallback())
            .map(|resolved| &resolved.builder)
    }

    #[must_use]
    pub fn tree(&self, document_path: &str) -> Option<&Arc<CompositionTree>> {
        self.trees.get(document_path)
    }

    #[must_use]
    pub fn tree_for<D: Document>(&self) -> Option<&Arc<CompositionTree>> {
        self.tree(D::MODEL.path)
    }

    /// Document paths with at least one builder, sorted.
    pub fn documents(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.resolved.keys().copied()
    }
}
