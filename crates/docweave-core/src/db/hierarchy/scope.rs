use crate::{
    db::{
        condition::CompareOp,
        hierarchy::{CompositionTree, Link, NodeCondition, TreeError, same_name},
        ir::validate,
    },
    model::DocumentModel,
    path::{FieldSelector, IntoFieldSelector},
    traits::Document,
    value::Value,
};

///
/// NodeScope
///
/// Mutable view of one node, only handed out while the registration
/// callback runs.
///

pub struct NodeScope<'t> {
    tree: &'t mut CompositionTree,
    index: usize,
}

impl<'t> NodeScope<'t> {
    pub(crate) const fn new(tree: &'t mut CompositionTree, index: usize) -> Self {
        Self { tree, index }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.tree.entry(self.index).name
    }

    #[must_use]
    pub fn model(&self) -> &'static DocumentModel {
        self.tree.entry(self.index).model
    }

    /// Append a child bound to `D` and run `register` against it.
    pub fn add_node<D: Document>(
        &mut self,
        name: &str,
        register: impl FnOnce(&mut NodeScope<'_>) -> Result<(), TreeError>,
    ) -> Result<&mut Self, TreeError> {
        let index = self.tree.insert(name, D::MODEL, Some(self.index))?;
        register(&mut NodeScope::new(&mut *self.tree, index))?;

        Ok(self)
    }

    // ------------------------------------------------------------------
    // Ancestor links
    // ------------------------------------------------------------------

    /// `field <op> ancestor.ancestor_field` against a named ancestor.
    pub fn join(
        &mut self,
        ancestor: &str,
        field: impl IntoFieldSelector,
        op: CompareOp,
        ancestor_field: impl IntoFieldSelector,
    ) -> Result<&mut Self, TreeError> {
        let ancestor = self.named_ancestor(ancestor)?;

        self.link(ancestor, field, op, ancestor_field.into_selector(), None)
    }

    /// Equality link to the one ancestor bound to `ancestor_field`'s document.
    pub fn connect(
        &mut self,
        field: impl IntoFieldSelector,
        ancestor_field: impl IntoFieldSelector,
    ) -> Result<&mut Self, TreeError> {
        self.connect_with(field, CompareOp::Equal, ancestor_field, None)
    }

    pub fn connect_with(
        &mut self,
        field: impl IntoFieldSelector,
        op: CompareOp,
        ancestor_field: impl IntoFieldSelector,
        default: Option<Value>,
    ) -> Result<&mut Self, TreeError> {
        let selector = ancestor_field.into_selector();
        let owner = selector
            .owner()
            .ok_or_else(|| TreeError::UntypedAncestorField {
                node: self.name().to_string(),
                field: selector.dotted(),
            })?;
        let ancestor = self.resolve_ancestor(owner)?;

        self.link(ancestor, field, op, selector, default)
    }

    // ------------------------------------------------------------------
    // Local filters
    // ------------------------------------------------------------------

    pub fn filter_const(
        &mut self,
        field: impl IntoFieldSelector,
        op: CompareOp,
        value: impl Into<Value>,
    ) -> Result<&mut Self, TreeError> {
        let field = field.into_selector().resolve(self.model())?;
        let value = value.into();
        validate::ensure_operator(&field, op, false)?;
        validate::ensure_literal(&field, op, &value)?;

        self.push(NodeCondition {
            field,
            op,
            link: Link::Const(value),
            default: None,
        });

        Ok(self)
    }

    pub fn filter_param(
        &mut self,
        field: impl IntoFieldSelector,
        op: CompareOp,
        param: &str,
    ) -> Result<&mut Self, TreeError> {
        let field = field.into_selector().resolve(self.model())?;
        validate::ensure_operator(&field, op, false)?;

        self.push(NodeCondition {
            field,
            op,
            link: Link::Param(param.to_string()),
            default: None,
        });

        Ok(self)
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    fn push(&mut self, condition: NodeCondition) {
        self.tree.entry_mut(self.index).conditions.push(condition);
    }

    fn link(
        &mut self,
        ancestor: usize,
        field: impl IntoFieldSelector,
        op: CompareOp,
        ancestor_field: FieldSelector,
        default: Option<Value>,
    ) -> Result<&mut Self, TreeError> {
        let field = field.into_selector().resolve(self.model())?;
        let entry = self.tree.entry(ancestor);
        let ancestor_field = ancestor_field.resolve(entry.model)?;
        let name = entry.name.clone();

        validate::ensure_field_pair(&field, op, &ancestor_field)?;
        if let Some(default) = &default {
            validate::ensure_literal(&field, op, default)?;
        }

        self.push(NodeCondition {
            field,
            op,
            link: Link::Ancestor {
                name,
                field: ancestor_field,
            },
            default,
        });

        Ok(self)
    }

    fn named_ancestor(&self, name: &str) -> Result<usize, TreeError> {
        self.tree
            .ancestor_indexes(self.index)
            .into_iter()
            .find(|&index| same_name(&self.tree.entry(index).name, name))
            .ok_or_else(|| TreeError::UnknownAncestor {
                node: self.name().to_string(),
                ancestor: name.to_string(),
            })
    }

    /// Exactly one strict ancestor must be bound to `owner`.
    fn resolve_ancestor(&self, owner: &'static DocumentModel) -> Result<usize, TreeError> {
        let matches: Vec<usize> = self
            .tree
            .ancestor_indexes(self.index)
            .into_iter()
            .filter(|&index| self.tree.entry(index).model.same_document(owner))
            .collect();

        match matches.as_slice() {
            [index] => Ok(*index),
            [] => Err(TreeError::NoMatchingAncestor {
                node: self.name().to_string(),
                document: owner.path.to_string(),
            }),
            _ => Err(TreeError::AmbiguousAncestor {
                node: self.name().to_string(),
                document: owner.path.to_string(),
                candidates: matches
                    .iter()
                    .map(|&index| self.tree.entry(index).name.clone())
                    .collect(),
            }),
        }
    }
}
