//! Condition slicer.
//!
//! Decomposes a condition tree into OR-joined groups that are each a pure
//! AND conjunction (disjunctive normal form). AND binds tighter than OR, so
//! `a AND (b OR c)` distributes into `[a, b] | [a, c]`.
//!
//! Distribution multiplies: an AND of `n` two-way ORs yields `2^n` groups.
//! The group count is computed before expanding and checked against a cap.


use crate::db::condition::{CodecError, Condition, ConditionTree, Predicate};
use derive_more::{Deref, IntoIterator};
use thiserror::Error as ThisError;

/// Group cap used by `slice` and by `CompilerConfig::default()`.
pub const DEFAULT_MAX_GROUPS: usize = 1024;

///
/// SliceError
///

#[derive(Clone, Debug, Eq, PartialEq, ThisError)]
pub enum SliceError {
    #[error("condition expands to {groups} AND groups, above the limit of {limit}")]
    TooManyGroups { groups: usize, limit: usize },

    #[error(transparent)]
    Codec(#[from] CodecError),
}

///
/// AndGroup
/// One conjunction of predicates; an empty group is vacuously true.
///

#[derive(Clone, Debug, Default, Deref, IntoIterator, PartialEq)]
#[into_iterator(owned, ref)]
pub struct AndGroup(Vec<Predicate>);

impl AndGroup {
    #[must_use]
    pub const fn new(predicates: Vec<Predicate>) -> Self {
        Self(predicates)
    }

    #[must_use]
    pub fn into_predicates(self) -> Vec<Predicate> {
        self.0
    }

    pub fn evaluate(&self, truth: &mut impl FnMut(&Predicate) -> bool) -> bool {
        self.0.iter().all(|predicate| truth(predicate))
    }

    /// Group as a tree: a single leaf, or one flat AND.
    #[must_use]
    pub fn to_tree(&self) -> ConditionTree {
        ConditionTree::and(self.0.iter().cloned().map(ConditionTree::Leaf).collect())
    }
}

/// Slice a tree into OR-joined AND groups under `DEFAULT_MAX_GROUPS`.
pub fn slice(tree: &ConditionTree) -> Result<Vec<AndGroup>, SliceError> {
    slice_bounded(tree, DEFAULT_MAX_GROUPS)
}

/// Slice a tree into at most `max_groups` OR-joined AND groups.
///
/// Predicates keep their left-to-right order inside each group; groups are
/// ordered by the first branch they take through every OR.
pub fn slice_bounded(tree: &ConditionTree, max_groups: usize) -> Result<Vec<AndGroup>, SliceError> {
    let tree = tree.clone().normalize();
    if tree.is_empty() {
        return Ok(Vec::new());
    }

    let groups = group_count(&tree);
    if groups > max_groups {
        return Err(SliceError::TooManyGroups {
            groups,
            limit: max_groups,
        });
    }

    Ok(expand(&tree).into_iter().map(AndGroup).collect())
}

/// Slice a flat condition list into at most `max_groups` groups.
pub fn slice_conditions(
    conditions: &[Condition],
    max_groups: usize,
) -> Result<Vec<AndGroup>, SliceError> {
    match ConditionTree::from_conditions(conditions)? {
        Some(tree) => slice_bounded(&tree, max_groups),
        None => Ok(Vec::new()),
    }
}

/// OR the groups back into one normalized tree.
#[must_use]
pub fn rejoin(groups: &[AndGroup]) -> Option<ConditionTree> {
    let tree = ConditionTree::or(groups.iter().map(AndGroup::to_tree).collect());

    (!tree.is_empty()).then_some(tree)
}

/// Number of groups `expand` would produce; saturates at `usize::MAX`.
fn group_count(tree: &ConditionTree) -> usize {
    match tree {
        ConditionTree::Leaf(_) => 1,
        ConditionTree::Group(inner) => group_count(inner),
        ConditionTree::Or(children) => children
            .iter()
            .fold(0, |total, child| total.saturating_add(group_count(child))),
        ConditionTree::And(children) => children
            .iter()
            .fold(1, |total, child| total.saturating_mul(group_count(child))),
    }
}

fn expand(tree: &ConditionTree) -> Vec<Vec<Predicate>> {
    match tree {
        ConditionTree::Leaf(predicate) => vec![vec![predicate.clone()]],
        ConditionTree::Group(inner) => expand(inner),
        ConditionTree::Or(children) => children.iter().flat_map(expand).collect(),
        ConditionTree::And(children) => {
            let mut groups = vec![Vec::new()];

            for child in children {
                let branches = expand(child);
                let mut next = Vec::with_capacity(groups.len() * branches.len());
                for group in &groups {
                    for branch in &branches {
                        let mut combined = group.clone();
                        combined.extend(branch.iter().cloned());
                        next.push(combined);
                    }
                }
                groups = next;
            }

            groups
        }
    }
}
