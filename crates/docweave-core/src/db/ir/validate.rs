//! Eager per-condition validation.
//!
//! Every rule here runs while the condition is declared, so a bad operation
//! fails at registration with the document and field named.

use crate::{
    db::{condition::CompareOp, ir::ConfigError},
    model::FieldKind,
    path::FieldPath,
    value::{Value, ValueShape},
};

fn document(path: &FieldPath) -> String {
    path.root().path.to_string()
}

fn field(path: &FieldPath) -> String {
    path.dotted()
}

/// Element kind for collection-typed fields and parameters.
pub(crate) const fn element_kind(kind: FieldKind) -> FieldKind {
    match kind {
        FieldKind::List(inner) => *inner,
        other => other,
    }
}

/// Field must reach storage and be a comparable leaf.
pub(crate) fn ensure_queryable(path: &FieldPath) -> Result<(), ConfigError> {
    if !path.is_stored() || path.kind().is_embedded() {
        return Err(ConfigError::NotQueryable {
            document: document(path),
            field: field(path),
        });
    }

    Ok(())
}

/// Operator against the field's kind and nullability, independent of operand.
pub(crate) fn ensure_operator(
    path: &FieldPath,
    op: CompareOp,
    case_insensitive: bool,
) -> Result<(), ConfigError> {
    ensure_queryable(path)?;
    let kind = path.kind();

    let supported = if op.requires_ordering() {
        kind.is_orderable()
    } else if op.is_pattern() {
        kind.is_text()
    } else if op.is_bitwise() {
        kind.is_bitwise()
    } else {
        true
    };
    if !supported {
        return Err(ConfigError::OperatorNotSupported {
            document: document(path),
            field: field(path),
            op,
            kind: kind.to_string(),
        });
    }

    if op.is_nullary() && !path.is_nullable() {
        return Err(ConfigError::NullOnNonNullable {
            document: document(path),
            field: field(path),
        });
    }

    if case_insensitive && !(op.supports_case_insensitive() && kind.is_text()) {
        return Err(ConfigError::CaseInsensitive {
            document: document(path),
            field: field(path),
            op,
        });
    }

    Ok(())
}

/// Operators whose null operand renders as a null test.
const fn accepts_null(op: CompareOp) -> bool {
    matches!(
        op,
        CompareOp::Equal
            | CompareOp::NotEqual
            | CompareOp::In
            | CompareOp::NotIn
            | CompareOp::Like
            | CompareOp::NotLike
    )
}

fn ensure_null(path: &FieldPath, op: CompareOp) -> Result<(), ConfigError> {
    if !accepts_null(op) {
        return Err(ConfigError::NullOperand {
            document: document(path),
            field: field(path),
            op,
        });
    }
    if !path.is_nullable() {
        return Err(ConfigError::NullOnNonNullable {
            document: document(path),
            field: field(path),
        });
    }

    Ok(())
}

fn ensure_literal_kind(path: &FieldPath, value: &Value, kind: &FieldKind) -> Result<(), ConfigError> {
    if value.matches_kind(kind) {
        Ok(())
    } else {
        Err(ConfigError::InvalidLiteral {
            document: document(path),
            field: field(path),
            value: value.label().to_string(),
            kind: kind.to_string(),
        })
    }
}

/// Literal operand against the operator and field.
pub(crate) fn ensure_literal(path: &FieldPath, op: CompareOp, value: &Value) -> Result<(), ConfigError> {
    let kind = path.kind();

    if op.is_nullary() {
        // the operand is ignored; a non-null one is almost certainly a mistake
        return if value.is_null() {
            Ok(())
        } else {
            Err(ConfigError::InvalidLiteral {
                document: document(path),
                field: field(path),
                value: value.label().to_string(),
                kind: kind.to_string(),
            })
        };
    }

    match value.shape() {
        ValueShape::Scalar(Value::Null) => ensure_null(path, op),
        ValueShape::Scalar(scalar) => {
            if op.is_range() {
                return Err(ConfigError::MalformedBetween {
                    document: document(path),
                    field: field(path),
                    count: 1,
                });
            }
            ensure_literal_kind(path, scalar, &kind)
        }

        // a list-typed field compares whole lists with = / <>
        ValueShape::Collection(_)
            if matches!(kind, FieldKind::List(_))
                && matches!(op, CompareOp::Equal | CompareOp::NotEqual) =>
        {
            ensure_literal_kind(path, value, &kind)
        }

        ValueShape::Collection(items) => {
            if op.is_range() && (items.is_empty() || items.len() % 2 != 0) {
                return Err(ConfigError::MalformedBetween {
                    document: document(path),
                    field: field(path),
                    count: items.len(),
                });
            }

            let element = element_kind(kind);
            for item in items {
                if item.is_null() {
                    if op.is_range() {
                        return Err(ConfigError::NullOperand {
                            document: document(path),
                            field: field(path),
                            op,
                        });
                    }
                    ensure_null(path, op)?;
                } else {
                    ensure_literal_kind(path, item, &element)?;
                }
            }

            Ok(())
        }
    }
}

/// Field-to-field comparison legality.
pub(crate) fn ensure_field_pair(
    left: &FieldPath,
    op: CompareOp,
    right: &FieldPath,
) -> Result<(), ConfigError> {
    if !op.supports_field_operand() {
        return Err(ConfigError::IllegalFieldComparison {
            document: document(left),
            field: field(left),
            op,
        });
    }
    ensure_operator(left, op, false)?;
    ensure_queryable(right)?;

    let right_kind = if op.is_membership() {
        match right.kind() {
            FieldKind::List(inner) => *inner,
            _ => {
                return Err(ConfigError::IncompatibleFields {
                    document: document(left),
                    field: field(left),
                    other: field(right),
                });
            }
        }
    } else {
        right.kind()
    };

    if !left.kind().is_comparable_with(&right_kind) {
        return Err(ConfigError::IncompatibleFields {
            document: document(left),
            field: field(left),
            other: field(right),
        });
    }

    Ok(())
}

/// Declared parameter kind against the field it is compared with.
pub(crate) fn ensure_param_kind(
    path: &FieldPath,
    param: &str,
    kind: FieldKind,
) -> Result<(), ConfigError> {
    // list fields compare whole lists; everything else compares elements
    let (field_kind, param_kind) = match path.kind() {
        list @ FieldKind::List(_) => (list, kind),
        scalar => (scalar, element_kind(kind)),
    };

    if field_kind.is_comparable_with(&param_kind) {
        Ok(())
    } else {
        Err(ConfigError::IncompatibleFields {
            document: document(path),
            field: field(path),
            other: param.to_string(),
        })
    }
}
