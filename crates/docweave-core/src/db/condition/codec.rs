//! Flat condition encoding.
//!
//! A condition list is a sequence of predicates, each tagged with the
//! connective joining it to the previous term (`by_or`) and a signed
//! parenthesis delta: `+n` opens `n` groups before the term, `-n` closes
//! `n` groups after it. The running sum of deltas is the nesting depth.
//!
//! Encoding emits parentheses for OR groups nested inside AND groups and
//! for explicit `Group` markers; AND binds tighter than OR everywhere
//! else. Decoding accepts any balanced list, including redundant groups and
//! groups that close several levels at once, and keeps every group the
//! precedence rule would not restore on its own as a `Group` marker. A
//! decoded list therefore re-encodes to the same deltas.

use crate::db::condition::{CompareOp, ConditionTree, Connective, Operand, Predicate};
use thiserror::Error as ThisError;

///
/// ConditionFlags
///

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct ConditionFlags {
    pub on_field: bool,
    pub on_const: bool,
    pub on_param: bool,
    pub by_or: bool,
    pub connect: bool,
}

///
/// Condition
/// One term of the flat encoding.
///

#[derive(Clone, Debug, PartialEq)]
pub struct Condition {
    pub predicate: Predicate,
    pub by_or: bool,
    /// Term belongs to a container's connect (join) predicate.
    pub connect: bool,
    pub paren_delta: i32,
}

impl Condition {
    #[must_use]
    pub const fn new(predicate: Predicate) -> Self {
        Self {
            predicate,
            by_or: false,
            connect: false,
            paren_delta: 0,
        }
    }

    #[must_use]
    pub const fn or(mut self) -> Self {
        self.by_or = true;
        self
    }

    #[must_use]
    pub const fn delta(mut self, paren_delta: i32) -> Self {
        self.paren_delta = paren_delta;
        self
    }

    #[must_use]
    pub const fn flags(&self) -> ConditionFlags {
        ConditionFlags {
            on_field: self.predicate.operand.is_field(),
            on_const: self.predicate.operand.is_const(),
            on_param: self.predicate.operand.is_param(),
            by_or: self.by_or,
            connect: self.connect,
        }
    }

    #[must_use]
    pub const fn op(&self) -> CompareOp {
        self.predicate.op
    }

    #[must_use]
    pub const fn operand(&self) -> &Operand {
        &self.predicate.operand
    }
}

///
/// CodecError
///

#[derive(Clone, Debug, Eq, PartialEq, ThisError)]
pub enum CodecError {
    #[error("condition {index} closes a group that was never opened")]
    UnexpectedClose { index: usize },

    #[error("condition list leaves {open} group(s) open")]
    UnclosedGroup { open: i32 },

    #[error("condition {index} opens a group that closes without any term")]
    EmptyGroup { index: usize },
}

/// Encode a tree into its canonical flat form.
#[must_use]
pub(crate) fn encode(tree: &ConditionTree) -> Vec<Condition> {
    let mut out = Vec::new();
    let tree = tree.clone().normalize();

    if !tree.is_empty() {
        emit(&tree, false, false, &mut out);
    }

    out
}

fn emit(tree: &ConditionTree, by_or: bool, parenthesize: bool, out: &mut Vec<Condition>) {
    let start = out.len();

    match tree {
        ConditionTree::Leaf(predicate) => {
            let mut condition = Condition::new(predicate.clone());
            condition.by_or = by_or;
            out.push(condition);
        }
        ConditionTree::And(children) | ConditionTree::Or(children) => {
            let is_or = matches!(tree, ConditionTree::Or(_));

            for (index, child) in children.iter().enumerate() {
                let child_by_or = if index == 0 { by_or } else { is_or };
                let child_parens = needs_parens(is_or, child);
                emit(child, child_by_or, child_parens, out);
            }
        }
        ConditionTree::Group(inner) => emit(inner, by_or, true, out),
    }

    if parenthesize && out.len() > start {
        out[start].paren_delta += 1;
        if let Some(last) = out.last_mut() {
            last.paren_delta -= 1;
        }
    }
}

/// Whether `child` needs explicit grouping inside a parent group.
pub(crate) const fn needs_parens(parent_is_or: bool, child: &ConditionTree) -> bool {
    match child {
        // groups carry their own parentheses
        ConditionTree::Leaf(_) | ConditionTree::Group(_) => false,
        // AND already binds tighter than OR
        ConditionTree::And(_) => !parent_is_or,
        ConditionTree::Or(_) => !parent_is_or,
    }
}

///
/// Token
///

#[derive(Clone, Copy, Debug)]
enum Token {
    Connective(Connective),
    Open(usize),
    Close(usize),
    Term(usize),
}

/// Decode a flat list into a tree. Returns `None` for an empty list.
pub(crate) fn decode(conditions: &[Condition]) -> Result<Option<ConditionTree>, CodecError> {
    let tokens = tokenize(conditions)?;
    let mut parser = Parser {
        conditions,
        tokens: &tokens,
        pos: 0,
    };

    let tree = parser.group()?;
    if let Some(Token::Close(index)) = parser.peek() {
        return Err(CodecError::UnexpectedClose { index });
    }

    Ok(tree)
}

fn tokenize(conditions: &[Condition]) -> Result<Vec<Token>, CodecError> {
    let mut tokens = Vec::with_capacity(conditions.len() * 2);
    let mut depth: i32 = 0;

    for (index, condition) in conditions.iter().enumerate() {
        if index > 0 {
            tokens.push(Token::Connective(if condition.by_or {
                Connective::Or
            } else {
                Connective::And
            }));
        }

        let delta = condition.paren_delta;
        for _ in 0..delta.max(0) {
            tokens.push(Token::Open(index));
        }
        tokens.push(Token::Term(index));
        for _ in 0..(-delta).max(0) {
            tokens.push(Token::Close(index));
        }

        depth += delta;
        if depth < 0 {
            return Err(CodecError::UnexpectedClose { index });
        }
    }

    if depth > 0 {
        return Err(CodecError::UnclosedGroup { open: depth });
    }

    Ok(tokens)
}

///
/// Parser
/// Recursive descent over the token stream; one call per group level.
///

struct Parser<'a> {
    conditions: &'a [Condition],
    tokens: &'a [Token],
    pos: usize,
}

impl Parser<'_> {
    fn peek(&self) -> Option<Token> {
        self.tokens.get(self.pos).copied()
    }

    fn group(&mut self) -> Result<Option<ConditionTree>, CodecError> {
        let mut items = Vec::new();
        let mut connective = Connective::And;

        loop {
            let operand = match self.peek() {
                Some(Token::Open(index)) => {
                    self.pos += 1;
                    let inner = self.group()?;
                    // tokenize guarantees the matching close exists
                    if matches!(self.peek(), Some(Token::Close(_))) {
                        self.pos += 1;
                    }
                    ConditionTree::Group(Box::new(
                        inner.ok_or(CodecError::EmptyGroup { index })?,
                    ))
                }
                Some(Token::Term(index)) => {
                    self.pos += 1;
                    ConditionTree::Leaf(self.conditions[index].predicate.clone())
                }
                _ => break,
            };
            items.push((connective, operand));

            match self.peek() {
                Some(Token::Connective(next)) => {
                    self.pos += 1;
                    connective = next;
                }
                _ => break,
            }
        }

        Ok(ConditionTree::from_sequence(items))
    }
}
