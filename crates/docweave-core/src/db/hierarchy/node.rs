use crate::{
    db::{
        condition::{CompareOp, ConditionTree, Operand, Predicate},
        hierarchy::{CompositionTree, TreeError, same_name},
    },
    model::DocumentModel,
    path::FieldPath,
    traits::Record,
    value::Value,
};

///
/// Link
/// Right-hand side of a node condition.
///

#[derive(Clone, Debug, PartialEq)]
pub enum Link {
    Ancestor { name: String, field: FieldPath },
    Const(Value),
    Param(String),
}

///
/// NodeCondition
///
/// One condition on a child node. Ancestor links carry everything a
/// listener needs to turn a materialized ancestor record into a filter.
///

#[derive(Clone, Debug, PartialEq)]
pub struct NodeCondition {
    pub field: FieldPath,
    pub op: CompareOp,
    pub link: Link,
    /// Used by `bind_parent` when the ancestor record lacks the key.
    pub default: Option<Value>,
}

impl NodeCondition {
    /// Name of the linked ancestor node, if any.
    #[must_use]
    pub fn ancestor(&self) -> Option<&str> {
        match &self.link {
            Link::Ancestor { name, .. } => Some(name),
            _ => None,
        }
    }

    #[must_use]
    pub const fn ancestor_field(&self) -> Option<&FieldPath> {
        match &self.link {
            Link::Ancestor { field, .. } => Some(field),
            _ => None,
        }
    }

    fn predicate(&self, node: &str) -> Predicate {
        let operand = match &self.link {
            Link::Ancestor { name, field } => Operand::Field {
                alias: name.clone(),
                field: field.clone(),
            },
            Link::Const(value) => Operand::Const(value.clone()),
            Link::Param(name) => Operand::Param(name.clone()),
        };

        Predicate::new(node, self.field.clone(), self.op, operand)
    }
}

///
/// NodeRef
/// Read-only handle to one node of a built tree.
///

#[derive(Clone, Copy, Debug)]
pub struct NodeRef<'a> {
    tree: &'a CompositionTree,
    index: usize,
}

impl<'a> NodeRef<'a> {
    pub(crate) const fn new(tree: &'a CompositionTree, index: usize) -> Self {
        Self { tree, index }
    }

    #[must_use]
    pub fn name(&self) -> &'a str {
        &self.tree.entry(self.index).name
    }

    #[must_use]
    pub fn model(&self) -> &'static DocumentModel {
        self.tree.entry(self.index).model
    }

    #[must_use]
    pub fn is_root(&self) -> bool {
        self.tree.entry(self.index).parent.is_none()
    }

    #[must_use]
    pub fn parent(&self) -> Option<Self> {
        self.tree
            .entry(self.index)
            .parent
            .map(|index| Self::new(self.tree, index))
    }

    pub fn children(&self) -> impl Iterator<Item = NodeRef<'a>> + 'a {
        let tree = self.tree;
        tree.entry(self.index)
            .children
            .iter()
            .map(move |&index| NodeRef::new(tree, index))
    }

    /// Strict ancestors, nearest first.
    #[must_use]
    pub fn ancestors(&self) -> Vec<Self> {
        self.tree
            .ancestor_indexes(self.index)
            .into_iter()
            .map(|index| Self::new(self.tree, index))
            .collect()
    }

    #[must_use]
    pub fn conditions(&self) -> &'a [NodeCondition] {
        &self.tree.entry(self.index).conditions
    }

    /// AND of every condition, aliased by node name. `None` on the root or
    /// on a node without conditions.
    #[must_use]
    pub fn condition_tree(&self) -> Option<ConditionTree> {
        let leaves: Vec<_> = self
            .conditions()
            .iter()
            .map(|condition| ConditionTree::Leaf(condition.predicate(self.name())))
            .collect();

        (!leaves.is_empty()).then(|| ConditionTree::and(leaves))
    }

    /// Turn a materialized ancestor record into child-only constant
    /// conditions, one per condition linked to `ancestor`.
    pub fn bind_parent(
        &self,
        ancestor: &str,
        record: &dyn Record,
    ) -> Result<Option<ConditionTree>, TreeError> {
        if !self.ancestors().iter().any(|a| same_name(a.name(), ancestor)) {
            return Err(TreeError::UnknownAncestor {
                node: self.name().to_string(),
                ancestor: ancestor.to_string(),
            });
        }

        let mut leaves = Vec::new();
        for condition in self.conditions() {
            let Link::Ancestor { name, field } = &condition.link else {
                continue;
            };
            if !same_name(name, ancestor) {
                continue;
            }

            let value = record
                .value(&field.dotted())
                .or_else(|| condition.default.clone())
                .ok_or_else(|| TreeError::MissingParentValue {
                    node: self.name().to_string(),
                    field: field.dotted(),
                })?;

            leaves.push(ConditionTree::Leaf(Predicate::new(
                self.name(),
                condition.field.clone(),
                condition.op,
                Operand::Const(value),
            )));
        }

        Ok((!leaves.is_empty()).then(|| ConditionTree::and(leaves)))
    }
}
