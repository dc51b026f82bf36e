//! Condition-tree compiler.
//!
//! Renders a `ConditionTree` into boolean-expression text plus an ordered
//! list of bound parameter values. Rendering is a structural recursion; the
//! only parentheses emitted are explicit `Group` pairs, the ones precedence
//! requires, and one pair around a multi-term OR chain that sits inside an
//! AND. A flat list therefore renders one pair per opened group.

mod dialect;


use crate::{
    db::{
        condition::{
            CodecError, CompareOp, Condition, ConditionTree, Connective, Operand, Predicate,
            codec::needs_parens,
        },
        ir::ParamSet,
    },
    model::FieldKind,
    path::FieldPath,
    value::{Value, ValueShape, bit_or_mask},
};
use derive_more::{Deref, IntoIterator};
use serde::{Deserialize, Serialize};
use thiserror::Error as ThisError;

// re-exports
pub use dialect::{ConfiguredDialect, Dialect, Postgres};

///
/// CompileError
///
/// Raised while rendering. Field-shape errors mirror the build-time checks
/// for trees that never went through a builder.
///

#[derive(Clone, Debug, Eq, PartialEq, ThisError)]
pub enum CompileError {
    #[error("parameter '{name}' has no value")]
    UnsetParameter { name: String },

    #[error("unknown parameter '{name}'")]
    UnknownParameter { name: String },

    #[error("parameter '{name}' is not nullable")]
    NullParameter { name: String },

    #[error("{document}: null compared against non-nullable field '{field}'")]
    NullOnNonNullable { document: String, field: String },

    #[error("{document}: operator {op} on field '{field}' does not accept null")]
    NullOperand {
        document: String,
        field: String,
        op: CompareOp,
    },

    #[error("{document}: range on field '{field}' needs an even, non-zero value count, got {count}")]
    MalformedBetween {
        document: String,
        field: String,
        count: usize,
    },

    #[error("{document}: operator {op} cannot compare field '{field}' with another field")]
    IllegalFieldComparison {
        document: String,
        field: String,
        op: CompareOp,
    },

    #[error("{document}: operator {op} has no rendering for field '{field}' with this operand")]
    UnsupportedOperand {
        document: String,
        field: String,
        op: CompareOp,
    },

    #[error("{document}: invalid literal for field '{field}': {message}")]
    InvalidLiteral {
        document: String,
        field: String,
        message: String,
    },

    #[error("condition tree is empty")]
    EmptyCondition,

    #[error("{document}: builder must be normalized before compiling")]
    NotNormalized { document: String },

    #[error(transparent)]
    Codec(#[from] CodecError),
}

///
/// BoundParams
/// Parameter values in placeholder order.
///

#[derive(Clone, Debug, Default, Deref, Deserialize, IntoIterator, PartialEq, Serialize)]
#[into_iterator(owned, ref)]
#[serde(transparent)]
pub struct BoundParams(Vec<Value>);

impl BoundParams {
    #[must_use]
    pub fn into_vec(self) -> Vec<Value> {
        self.0
    }
}

///
/// CompiledCondition
///

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct CompiledCondition {
    pub text: String,
    pub params: BoundParams,
}

/// Compile one tree with its own placeholder sequence.
pub fn compile_tree(
    tree: &ConditionTree,
    params: &ParamSet,
    dialect: &dyn Dialect,
) -> Result<CompiledCondition, CompileError> {
    let mut compiler = Compiler::new(dialect, params);
    let text = compiler.condition(tree)?;

    Ok(CompiledCondition {
        text,
        params: compiler.finish(),
    })
}

/// Compile a flat condition list. An empty list compiles to `None`.
pub fn compile_conditions(
    conditions: &[Condition],
    params: &ParamSet,
    dialect: &dyn Dialect,
) -> Result<Option<CompiledCondition>, CompileError> {
    ConditionTree::from_conditions(conditions)?
        .map(|tree| compile_tree(&tree, params, dialect))
        .transpose()
}

///
/// Context
/// Where a rendered fragment lands.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum Context {
    Top,
    InAnd,
    InOr,
}

///
/// Fragment
/// Rendered predicate: one term, or a chain of terms sharing a joiner.
///

struct Fragment {
    text: String,
    terms: usize,
    joiner: Connective,
}

impl Fragment {
    const fn single(text: String) -> Self {
        Self {
            text,
            terms: 1,
            joiner: Connective::And,
        }
    }

    fn chain(parts: Vec<String>, joiner: Connective) -> Self {
        let separator = match joiner {
            Connective::And => " AND ",
            Connective::Or => " OR ",
        };

        Self {
            text: parts.join(separator),
            terms: parts.len(),
            joiner,
        }
    }

    fn render(self, context: Context) -> String {
        if self.terms > 1 && self.joiner == Connective::Or && context == Context::InAnd {
            format!("({})", self.text)
        } else {
            self.text
        }
    }
}

///
/// Compiler
///
/// Stateful only in its parameter list: trees compiled through the same
/// instance share one placeholder sequence.
///

pub struct Compiler<'a> {
    dialect: &'a dyn Dialect,
    params: &'a ParamSet,
    bound: Vec<Value>,
}

impl<'a> Compiler<'a> {
    #[must_use]
    pub fn new(dialect: &'a dyn Dialect, params: &'a ParamSet) -> Self {
        Self {
            dialect,
            params,
            bound: Vec::new(),
        }
    }

    /// Render one tree, appending its values to the shared parameter list.
    pub fn condition(&mut self, tree: &ConditionTree) -> Result<String, CompileError> {
        let tree = tree.clone().normalize();
        if tree.is_empty() {
            return Err(CompileError::EmptyCondition);
        }

        self.node(&tree, Context::Top)
    }

    #[must_use]
    pub fn finish(self) -> BoundParams {
        BoundParams(self.bound)
    }

    fn node(&mut self, tree: &ConditionTree, context: Context) -> Result<String, CompileError> {
        match tree {
            ConditionTree::Leaf(predicate) => Ok(self.predicate(predicate)?.render(context)),
            ConditionTree::And(children) => self.group(children, Connective::And),
            ConditionTree::Or(children) => self.group(children, Connective::Or),
            ConditionTree::Group(inner) => Ok(format!("({})", self.node(inner, Context::Top)?)),
        }
    }

    fn group(
        &mut self,
        children: &[ConditionTree],
        joiner: Connective,
    ) -> Result<String, CompileError> {
        let (context, separator) = match joiner {
            Connective::And => (Context::InAnd, " AND "),
            Connective::Or => (Context::InOr, " OR "),
        };

        let mut parts = Vec::with_capacity(children.len());
        for child in children {
            let text = self.node(child, context)?;
            if needs_parens(joiner == Connective::Or, child) {
                parts.push(format!("({text})"));
            } else {
                parts.push(text);
            }
        }

        Ok(parts.join(separator))
    }

    // ------------------------------------------------------------------
    // Terms
    // ------------------------------------------------------------------

    fn bind(&mut self, value: Value) -> String {
        self.bound.push(value);
        self.dialect.placeholder(self.bound.len())
    }

    fn column(&self, alias: &str, field: &FieldPath) -> String {
        let path = field
            .storage_names()
            .map(|name| self.dialect.quote_ident(name))
            .collect::<Vec<_>>()
            .join(".");

        if alias.is_empty() {
            path
        } else {
            format!("{alias}.{path}")
        }
    }

    fn predicate(&mut self, predicate: &Predicate) -> Result<Fragment, CompileError> {
        let column = self.column(&predicate.alias, &predicate.field);

        match &predicate.operand {
            Operand::None => nullary(predicate, &column),
            Operand::Field { alias, field } => {
                let other = self.column(alias, field);
                field_pair(predicate, &column, &other)
            }
            Operand::Const(value) => self.value(predicate, &column, value),
            Operand::Param(name) => {
                let params = self.params;
                let value = params
                    .value(name)
                    .ok_or_else(|| CompileError::UnsetParameter { name: name.clone() })?;
                self.value(predicate, &column, value)
            }
        }
    }

    fn value(
        &mut self,
        predicate: &Predicate,
        column: &str,
        value: &Value,
    ) -> Result<Fragment, CompileError> {
        if predicate.op.is_nullary() {
            return nullary(predicate, column);
        }

        match value.shape() {
            ValueShape::Scalar(Value::Null) => scalar_null(predicate, column),
            ValueShape::Scalar(scalar) => self.scalar(predicate, column, scalar.clone()),

            // list fields compare whole lists with = / <>
            ValueShape::Collection(_)
                if matches!(predicate.field.kind(), FieldKind::List(_))
                    && matches!(predicate.op, CompareOp::Equal | CompareOp::NotEqual) =>
            {
                self.scalar(predicate, column, value.clone())
            }

            ValueShape::Collection(items) => self.collection(predicate, column, items),
        }
    }

    fn scalar(
        &mut self,
        predicate: &Predicate,
        column: &str,
        value: Value,
    ) -> Result<Fragment, CompileError> {
        let text = match predicate.op {
            CompareOp::Between | CompareOp::NotBetween => {
                return Err(CompileError::MalformedBetween {
                    document: document(predicate),
                    field: predicate.field.dotted(),
                    count: 1,
                });
            }
            CompareOp::BitsAnd => self.bits_and(column, value),
            CompareOp::BitsOr => {
                let mask = self.bind(value);
                format!("({column} & {mask}) <> 0")
            }
            op => {
                let symbol = match op {
                    CompareOp::In => "=",
                    CompareOp::NotIn => "<>",
                    other => other.symbol().ok_or_else(|| unsupported(predicate))?,
                };

                if predicate.case_insensitive {
                    let lower = self.dialect.lower_fn().to_string();
                    let placeholder = self.bind(value);
                    format!("{lower}({column}) {symbol} {lower}({placeholder})")
                } else {
                    let placeholder = self.bind(value);
                    format!("{column} {symbol} {placeholder}")
                }
            }
        };

        Ok(Fragment::single(text))
    }

    /// `(col & $n) = $n`; positional dialects bind the mask twice.
    fn bits_and(&mut self, column: &str, value: Value) -> String {
        let first = self.bind(value.clone());
        let second = if self.dialect.numbered_placeholders() {
            first.clone()
        } else {
            self.bind(value)
        };

        format!("({column} & {first}) = {second}")
    }

    fn collection(
        &mut self,
        predicate: &Predicate,
        column: &str,
        items: &[Value],
    ) -> Result<Fragment, CompileError> {
        match predicate.op {
            CompareOp::Equal | CompareOp::In => self.membership(predicate, column, items, true),
            CompareOp::NotEqual | CompareOp::NotIn => {
                self.membership(predicate, column, items, false)
            }
            CompareOp::Between | CompareOp::NotBetween => self.range(predicate, column, items),
            CompareOp::BitsOr => {
                if items.iter().any(Value::is_null) {
                    return Err(null_operand(predicate));
                }
                let mask = bit_or_mask(items).map_err(|err| CompileError::InvalidLiteral {
                    document: document(predicate),
                    field: predicate.field.dotted(),
                    message: err.to_string(),
                })?;
                let placeholder = self.bind(mask);

                Ok(Fragment::single(format!("({column} & {placeholder}) <> 0")))
            }
            op if op.chains_collections() => self.chain(predicate, column, items),
            _ => Err(unsupported(predicate)),
        }
    }

    /// One array-membership term, plus a null test when the list holds null.
    fn membership(
        &mut self,
        predicate: &Predicate,
        column: &str,
        items: &[Value],
        positive: bool,
    ) -> Result<Fragment, CompileError> {
        let has_null = items.iter().any(Value::is_null);
        if has_null && !predicate.field.is_nullable() {
            return Err(null_on_non_nullable(predicate));
        }

        let values: Vec<Value> = items
            .iter()
            .filter(|item| !item.is_null())
            .map(|item| {
                if predicate.case_insensitive {
                    item.casefold()
                } else {
                    item.clone()
                }
            })
            .collect();
        let target = if predicate.case_insensitive {
            format!("{}({column})", self.dialect.lower_fn())
        } else {
            column.to_string()
        };

        let mut parts = Vec::with_capacity(2);
        if !values.is_empty() || !has_null {
            let placeholder = self.bind(Value::List(values));
            parts.push(if positive {
                format!("{target} = ANY(ARRAY[{placeholder}])")
            } else {
                format!("NOT ({target} = ANY(ARRAY[{placeholder}]))")
            });
        }
        if has_null {
            parts.push(if positive {
                format!("{column} IS NULL")
            } else {
                format!("{column} IS NOT NULL")
            });
        }

        let joiner = if positive {
            Connective::Or
        } else {
            Connective::And
        };

        Ok(Fragment::chain(parts, joiner))
    }

    /// OR-chain of per-value comparisons. Duplicates are kept as given.
    fn chain(
        &mut self,
        predicate: &Predicate,
        column: &str,
        items: &[Value],
    ) -> Result<Fragment, CompileError> {
        if items.is_empty() {
            return Ok(Fragment::single(self.dialect.false_literal().to_string()));
        }

        let mut parts = Vec::with_capacity(items.len());
        for item in items {
            let fragment = if item.is_null() {
                scalar_null(predicate, column)?
            } else {
                self.scalar(predicate, column, item.clone())?
            };
            parts.push(fragment.text);
        }

        Ok(Fragment::chain(parts, Connective::Or))
    }

    /// Consecutive pairs; `Between` ORs them, `NotBetween` ANDs them.
    fn range(
        &mut self,
        predicate: &Predicate,
        column: &str,
        items: &[Value],
    ) -> Result<Fragment, CompileError> {
        if items.is_empty() || items.len() % 2 != 0 {
            return Err(CompileError::MalformedBetween {
                document: document(predicate),
                field: predicate.field.dotted(),
                count: items.len(),
            });
        }
        if items.iter().any(Value::is_null) {
            return Err(null_operand(predicate));
        }

        let negated = predicate.op == CompareOp::NotBetween;
        let keyword = if negated { "NOT BETWEEN" } else { "BETWEEN" };
        let pairs = items.len() / 2;

        let mut parts = Vec::with_capacity(pairs);
        for pair in items.chunks_exact(2) {
            let low = self.bind(pair[0].clone());
            let high = self.bind(pair[1].clone());
            let term = format!("{column} {keyword} {low} AND {high}");

            parts.push(if pairs > 1 { format!("({term})") } else { term });
        }

        let joiner = if negated {
            Connective::And
        } else {
            Connective::Or
        };

        Ok(Fragment::chain(parts, joiner))
    }
}

// ----------------------------------------------------------------------
// Parameter-free renderings
// ----------------------------------------------------------------------

fn nullary(predicate: &Predicate, column: &str) -> Result<Fragment, CompileError> {
    let text = match predicate.op {
        CompareOp::IsNull => format!("{column} IS NULL"),
        CompareOp::IsNotNull => format!("{column} IS NOT NULL"),
        _ => return Err(unsupported(predicate)),
    };

    Ok(Fragment::single(text))
}

fn scalar_null(predicate: &Predicate, column: &str) -> Result<Fragment, CompileError> {
    let text = match predicate.op {
        CompareOp::Equal | CompareOp::Like | CompareOp::In => format!("{column} IS NULL"),
        CompareOp::NotEqual | CompareOp::NotLike | CompareOp::NotIn => {
            format!("{column} IS NOT NULL")
        }
        _ => return Err(null_operand(predicate)),
    };

    if !predicate.field.is_nullable() {
        return Err(null_on_non_nullable(predicate));
    }

    Ok(Fragment::single(text))
}

fn field_pair(predicate: &Predicate, left: &str, right: &str) -> Result<Fragment, CompileError> {
    let illegal = || CompileError::IllegalFieldComparison {
        document: document(predicate),
        field: predicate.field.dotted(),
        op: predicate.op,
    };
    if predicate.case_insensitive {
        return Err(illegal());
    }

    let text = match predicate.op {
        CompareOp::In => format!("{left} = ANY({right})"),
        CompareOp::NotIn => format!("NOT ({left} = ANY({right}))"),
        CompareOp::BitsAnd => format!("({left} & {right}) = {right}"),
        CompareOp::BitsOr => format!("({left} & {right}) <> 0"),
        op => {
            let symbol = op.symbol().ok_or_else(illegal)?;
            format!("{left} {symbol} {right}")
        }
    };

    Ok(Fragment::single(text))
}

fn document(predicate: &Predicate) -> String {
    predicate.field.root().path.to_string()
}

fn null_operand(predicate: &Predicate) -> CompileError {
    CompileError::NullOperand {
        document: document(predicate),
        field: predicate.field.dotted(),
        op: predicate.op,
    }
}

fn null_on_non_nullable(predicate: &Predicate) -> CompileError {
    CompileError::NullOnNonNullable {
        document: document(predicate),
        field: predicate.field.dotted(),
    }
}

fn unsupported(predicate: &Predicate) -> CompileError {
    CompileError::UnsupportedOperand {
        document: document(predicate),
        field: predicate.field.dotted(),
        op: predicate.op,
    }
}
