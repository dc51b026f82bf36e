//! Hierarchical composition tree.
//!
//! A tree of named data-source slots. Every node binds one document model;
//! child nodes carry conditions that reference fields of their ancestors.
//! The tree is declared by a single registration callback and is read-only
//! once `CompositionTree::build` returns.

mod node;
mod scope;

#[cfg(test)]
mod tests;

use crate::{
    db::ir::ConfigError,
    model::DocumentModel,
    obs::sink::{self, MetricsEvent},
    traits::Document,
};
use std::collections::BTreeMap;
use thiserror::Error as ThisError;
use tracing::debug;

// re-exports
pub use node::{Link, NodeCondition, NodeRef};
pub use scope::NodeScope;

///
/// TreeError
///

#[derive(Clone, Debug, Eq, PartialEq, ThisError)]
pub enum TreeError {
    #[error("node name '{name}' is already used in this tree")]
    DuplicateNode { name: String },

    #[error("node '{node}': no ancestor is bound to {document}")]
    NoMatchingAncestor { node: String, document: String },

    #[error("node '{node}': several ancestors are bound to {document}: {candidates:?}")]
    AmbiguousAncestor {
        node: String,
        document: String,
        candidates: Vec<String>,
    },

    #[error("node '{node}': '{ancestor}' is not an ancestor")]
    UnknownAncestor { node: String, ancestor: String },

    #[error("node '{node}': ancestor field '{field}' must be a typed field reference")]
    UntypedAncestorField { node: String, field: String },

    #[error("node '{node}': parent record has no value for '{field}' and no default is set")]
    MissingParentValue { node: String, field: String },

    #[error(transparent)]
    Config(#[from] ConfigError),
}

///
/// NodeEntry
/// Arena slot; index 0 is the root.
///

#[derive(Debug)]
pub(crate) struct NodeEntry {
    pub(crate) name: String,
    pub(crate) model: &'static DocumentModel,
    pub(crate) parent: Option<usize>,
    pub(crate) children: Vec<usize>,
    pub(crate) conditions: Vec<NodeCondition>,
}

///
/// CompositionTree
///

#[derive(Debug)]
pub struct CompositionTree {
    nodes: Vec<NodeEntry>,
    by_name: BTreeMap<String, usize>,
}

impl CompositionTree {
    /// Run the registration callback against a fresh root bound to `D`.
    pub fn build<D: Document>(
        name: &str,
        register: impl FnOnce(&mut NodeScope<'_>) -> Result<(), TreeError>,
    ) -> Result<Self, TreeError> {
        let mut tree = Self {
            nodes: Vec::new(),
            by_name: BTreeMap::new(),
        };
        tree.insert(name, D::MODEL, None)?;

        register(&mut NodeScope::new(&mut tree, 0))?;

        debug!(
            root = name,
            document = D::MODEL.path,
            nodes = tree.nodes.len(),
            "composition tree built"
        );
        sink::record(MetricsEvent::TreeBuilt {
            root_path: D::MODEL.path,
        });

        Ok(tree)
    }

    #[must_use]
    pub fn root(&self) -> NodeRef<'_> {
        NodeRef::new(self, 0)
    }

    /// Document the root node is bound to.
    #[must_use]
    pub fn root_model(&self) -> &'static DocumentModel {
        self.nodes[0].model
    }

    /// Case-insensitive node lookup.
    #[must_use]
    pub fn node(&self, name: &str) -> Option<NodeRef<'_>> {
        self.by_name
            .get(&name_key(name))
            .map(|&index| NodeRef::new(self, index))
    }

    /// Nodes in declaration order, root first.
    pub fn nodes(&self) -> impl Iterator<Item = NodeRef<'_>> {
        (0..self.nodes.len()).map(|index| NodeRef::new(self, index))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub(crate) fn entry(&self, index: usize) -> &NodeEntry {
        &self.nodes[index]
    }

    pub(crate) fn entry_mut(&mut self, index: usize) -> &mut NodeEntry {
        &mut self.nodes[index]
    }

    /// Strict ancestors of `index`, nearest first.
    pub(crate) fn ancestor_indexes(&self, index: usize) -> Vec<usize> {
        let mut out = Vec::new();
        let mut current = self.nodes[index].parent;

        while let Some(parent) = current {
            out.push(parent);
            current = self.nodes[parent].parent;
        }

        out
    }

    pub(crate) fn insert(
        &mut self,
        name: &str,
        model: &'static DocumentModel,
        parent: Option<usize>,
    ) -> Result<usize, TreeError> {
        let key = name_key(name);
        if self.by_name.contains_key(&key) {
            return Err(TreeError::DuplicateNode {
                name: name.to_string(),
            });
        }

        let index = self.nodes.len();
        self.nodes.push(NodeEntry {
            name: name.to_string(),
            model,
            parent,
            children: Vec::new(),
            conditions: Vec::new(),
        });
        self.by_name.insert(key, index);
        if let Some(parent) = parent {
            self.nodes[parent].children.push(index);
        }

        Ok(index)
    }
}

fn name_key(name: &str) -> String {
    name.to_lowercase()
}

pub(crate) fn same_name(a: &str, b: &str) -> bool {
    name_key(a) == name_key(b)
}
