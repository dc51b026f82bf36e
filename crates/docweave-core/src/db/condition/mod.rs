//! Condition trees.
//!
//! Conditions are held as an explicit `Leaf / And / Or` tree. The flat
//! "term list + parenthesis delta" encoding survives only as an
//! interchange format (`codec`), decoded into a tree before anything
//! compiles or slices it.

pub mod codec;
mod op;

#[cfg(test)]
mod tests;

use crate::{path::FieldPath, value::Value};
use std::fmt;

// re-exports
pub use codec::{CodecError, Condition, ConditionFlags};
pub use op::CompareOp;

///
/// Operand
/// Right-hand side of a predicate.
///

#[derive(Clone, Debug, PartialEq)]
pub enum Operand {
    /// `IsNull` / `IsNotNull` take no operand.
    None,
    /// Another container's (or ancestor node's) field.
    Field { alias: String, field: FieldPath },
    Const(Value),
    /// Named parameter resolved at compile time.
    Param(String),
}

impl Operand {
    #[must_use]
    pub const fn is_field(&self) -> bool {
        matches!(self, Self::Field { .. })
    }

    #[must_use]
    pub const fn is_const(&self) -> bool {
        matches!(self, Self::Const(_))
    }

    #[must_use]
    pub const fn is_param(&self) -> bool {
        matches!(self, Self::Param(_))
    }

    #[must_use]
    pub fn param_name(&self) -> Option<&str> {
        match self {
            Self::Param(name) => Some(name),
            _ => None,
        }
    }
}

///
/// Predicate
/// One atomic comparison; the leaf of a condition tree.
///

#[derive(Clone, Debug, PartialEq)]
pub struct Predicate {
    /// Owning container alias (or node name). Empty renders unqualified.
    pub alias: String,
    pub field: FieldPath,
    pub op: CompareOp,
    pub operand: Operand,
    pub case_insensitive: bool,
}

impl Predicate {
    #[must_use]
    pub fn new(alias: impl Into<String>, field: FieldPath, op: CompareOp, operand: Operand) -> Self {
        Self {
            alias: alias.into(),
            field,
            op,
            operand,
            case_insensitive: false,
        }
    }

    #[must_use]
    pub const fn case_insensitive(mut self) -> Self {
        self.case_insensitive = true;
        self
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.alias.is_empty() {
            write!(f, "{}.", self.alias)?;
        }
        write!(f, "{} {}", self.field, self.op)?;

        match &self.operand {
            Operand::None => Ok(()),
            Operand::Field { alias, field } => write!(f, " {alias}.{field}"),
            Operand::Const(value) => write!(f, " {value:?}"),
            Operand::Param(name) => write!(f, " @{name}"),
        }
    }
}

///
/// Connective
///

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum Connective {
    #[default]
    And,
    Or,
}

///
/// ConditionTree
///
/// n-ary boolean tree. Normalized trees never hold empty groups, single-child
/// groups, or a group nested directly inside a group of the same kind.
///
/// `Group` is an explicit parenthesis pair carried over from a flat list.
/// It is logically transparent but renders as written, so `(a AND b) OR c`
/// keeps its parentheses through decode and compile.
///

#[derive(Clone, Debug, PartialEq)]
pub enum ConditionTree {
    Leaf(Predicate),
    And(Vec<Self>),
    Or(Vec<Self>),
    Group(Box<Self>),
}

impl ConditionTree {
    #[must_use]
    pub fn and(children: Vec<Self>) -> Self {
        Self::And(children).normalize()
    }

    #[must_use]
    pub fn or(children: Vec<Self>) -> Self {
        Self::Or(children).normalize()
    }

    #[must_use]
    pub fn group(inner: Self) -> Self {
        Self::Group(Box::new(inner)).normalize()
    }

    /// Build a tree from a connective-tagged sequence where AND binds tighter
    /// than OR. The first entry's connective is ignored.
    #[must_use]
    pub fn from_sequence(items: Vec<(Connective, Self)>) -> Option<Self> {
        let mut runs: Vec<Vec<Self>> = Vec::new();
        let mut current: Vec<Self> = Vec::new();

        for (index, (connective, tree)) in items.into_iter().enumerate() {
            if index > 0 && connective == Connective::Or {
                runs.push(std::mem::take(&mut current));
            }
            current.push(tree);
        }

        if current.is_empty() {
            return None;
        }
        runs.push(current);

        let runs = runs.into_iter().map(|run| {
            if run.len() > 1 {
                Self::And(run.into_iter().map(Self::without_implied_group).collect())
            } else {
                Self::And(run)
            }
        });
        let tree = Self::Or(runs.collect()).normalize();

        Some(tree)
    }

    /// An OR group inside an AND is parenthesized anyway, so its explicit
    /// marker adds nothing.
    fn without_implied_group(self) -> Self {
        match self {
            Self::Group(inner) if matches!(*inner, Self::Or(_)) => *inner,
            other => other,
        }
    }

    /// Canonicalize structure without reordering terms.
    ///
    /// Rules:
    /// - AND(AND(a, b), c) → AND(a, b, c), likewise for OR
    /// - single-child groups collapse into their child
    /// - empty groups disappear
    /// - explicit groups are kept unless they wrap a single term
    ///
    /// An empty top-level group stays empty; callers treat it as "no condition".
    #[must_use]
    pub fn normalize(self) -> Self {
        match self {
            Self::Leaf(predicate) => Self::Leaf(predicate),
            Self::And(children) => Self::normalize_group(children, true),
            Self::Or(children) => Self::normalize_group(children, false),
            Self::Group(inner) => match (*inner).normalize() {
                inner @ Self::Leaf(_) => inner,
                inner if inner.is_empty() => inner,
                inner => Self::Group(Box::new(inner)),
            },
        }
    }

    fn normalize_group(children: Vec<Self>, is_and: bool) -> Self {
        let mut out = Vec::with_capacity(children.len());

        for child in children {
            match child.normalize() {
                Self::And(grandchildren) if is_and => out.extend(grandchildren),
                Self::Or(grandchildren) if !is_and => out.extend(grandchildren),
                Self::And(empty) | Self::Or(empty) if empty.is_empty() => {}
                other => out.push(other),
            }
        }

        if out.len() == 1 {
            return out.remove(0);
        }

        if is_and { Self::And(out) } else { Self::Or(out) }
    }

    #[must_use]
    pub const fn is_leaf(&self) -> bool {
        matches!(self, Self::Leaf(_))
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Leaf(_) => false,
            Self::And(children) | Self::Or(children) => children.is_empty(),
            Self::Group(inner) => inner.is_empty(),
        }
    }

    /// Leaves in left-to-right order.
    #[must_use]
    pub fn leaves(&self) -> Vec<&Predicate> {
        let mut out = Vec::new();
        self.collect_leaves(&mut out);
        out
    }

    fn collect_leaves<'a>(&'a self, out: &mut Vec<&'a Predicate>) {
        match self {
            Self::Leaf(predicate) => out.push(predicate),
            Self::And(children) | Self::Or(children) => {
                for child in children {
                    child.collect_leaves(out);
                }
            }
            Self::Group(inner) => inner.collect_leaves(out),
        }
    }

    /// Rewrite every leaf in place, keeping tree shape.
    #[must_use]
    pub fn map_leaves(self, f: &mut impl FnMut(Predicate) -> Predicate) -> Self {
        match self {
            Self::Leaf(predicate) => Self::Leaf(f(predicate)),
            Self::And(children) => {
                Self::And(children.into_iter().map(|c| c.map_leaves(f)).collect())
            }
            Self::Or(children) => Self::Or(children.into_iter().map(|c| c.map_leaves(f)).collect()),
            Self::Group(inner) => Self::Group(Box::new((*inner).map_leaves(f))),
        }
    }

    /// Evaluate with a caller-supplied truth function per leaf.
    pub fn evaluate(&self, truth: &mut impl FnMut(&Predicate) -> bool) -> bool {
        match self {
            Self::Leaf(predicate) => truth(predicate),
            Self::And(children) => children.iter().all(|child| child.evaluate(truth)),
            Self::Or(children) => children.iter().any(|child| child.evaluate(truth)),
            Self::Group(inner) => inner.evaluate(truth),
        }
    }

    /// Flat encoding of this tree (see `codec`).
    #[must_use]
    pub fn to_conditions(&self) -> Vec<Condition> {
        codec::encode(self)
    }

    /// Decode a flat condition list.
    pub fn from_conditions(conditions: &[Condition]) -> Result<Option<Self>, CodecError> {
        codec::decode(conditions)
    }
}
