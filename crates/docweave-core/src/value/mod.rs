
use crate::model::FieldKind;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error as ThisError;
use ulid::Ulid;

///
/// Value
/// Literal operand of a condition, and the unit of parameter binding.
///
/// Null → the storage NULL; never bound as a parameter by the compiler.
///

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Uint(u64),
    Float(f64),
    Text(String),
    Bytes(Vec<u8>),
    Timestamp(DateTime<Utc>),
    Ulid(Ulid),
    List(Vec<Self>),
}

///
/// ValueShape
///
/// Value normalized for compilation: lists are collections, everything
/// else is a scalar.
///

#[derive(Clone, Copy, Debug)]
pub enum ValueShape<'a> {
    Scalar(&'a Value),
    Collection(&'a [Value]),
}

impl Value {
    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    #[must_use]
    pub fn shape(&self) -> ValueShape<'_> {
        match self {
            Self::List(items) => ValueShape::Collection(items.as_slice()),
            other => ValueShape::Scalar(other),
        }
    }

    /// Build a list value from anything convertible.
    pub fn list<I, T>(items: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<Self>,
    {
        Self::List(items.into_iter().map(Into::into).collect())
    }

    /// Lower-case text values; other variants (and list members) pass through.
    #[must_use]
    pub fn casefold(&self) -> Self {
        match self {
            Self::Text(text) => Self::Text(text.to_lowercase()),
            Self::List(items) => Self::List(items.iter().map(Self::casefold).collect()),
            other => other.clone(),
        }
    }

    /// Whether a non-null literal can be compared against a field of `kind`.
    #[must_use]
    pub fn matches_kind(&self, kind: &FieldKind) -> bool {
        match (self, kind) {
            (Self::Null, _) => true,
            (Self::List(items), FieldKind::List(inner)) => {
                items.iter().all(|item| item.matches_kind(inner))
            }
            (Self::Bool(_), FieldKind::Bool)
            | (Self::Text(_), FieldKind::Text)
            | (Self::Bytes(_), FieldKind::Bytes)
            | (Self::Timestamp(_), FieldKind::Timestamp)
            | (Self::Ulid(_), FieldKind::Ulid)
            | (
                Self::Int(_) | Self::Uint(_),
                FieldKind::Bits
                | FieldKind::Decimal
                | FieldKind::Float
                | FieldKind::Int
                | FieldKind::Uint,
            )
            | (Self::Float(_), FieldKind::Decimal | FieldKind::Float) => true,
            _ => false,
        }
    }

    /// Short variant label used in diagnostics.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Uint(_) => "uint",
            Self::Float(_) => "float",
            Self::Text(_) => "text",
            Self::Bytes(_) => "bytes",
            Self::Timestamp(_) => "timestamp",
            Self::Ulid(_) => "ulid",
            Self::List(_) => "list",
        }
    }
}

///
/// BitMaskError
///

#[derive(Clone, Debug, Eq, PartialEq, ThisError)]
#[error("bit mask requires integer values, found {label}")]
pub struct BitMaskError {
    pub label: &'static str,
}

/// Reduce a collection to one accumulated OR-mask.
///
/// Signed and unsigned members may be mixed; the result is signed only when
/// every member is signed. Nulls are skipped.
pub fn bit_or_mask(values: &[Value]) -> Result<Value, BitMaskError> {
    let mut mask: u64 = 0;
    let mut all_signed = true;

    for value in values {
        match value {
            Value::Null => {}
            Value::Int(v) => mask |= v.cast_unsigned(),
            Value::Uint(v) => {
                all_signed = false;
                mask |= v;
            }
            other => {
                return Err(BitMaskError {
                    label: other.label(),
                });
            }
        }
    }

    Ok(if all_signed {
        Value::Int(mask.cast_signed())
    } else {
        Value::Uint(mask)
    })
}

// ---------------------------------------------------------------------
// Conversions
// ---------------------------------------------------------------------

macro_rules! impl_from {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for Value {
                fn from(v: $ty) -> Self {
                    Self::$variant(v.into())
                }
            }
        )*
    };
}

impl_from! {
    bool => Bool,
    i8 => Int,
    i16 => Int,
    i32 => Int,
    i64 => Int,
    u8 => Uint,
    u16 => Uint,
    u32 => Uint,
    u64 => Uint,
    f64 => Float,
    String => Text,
    DateTime<Utc> => Timestamp,
    Ulid => Ulid,
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::Text(v.to_string())
    }
}

impl<T: Into<Self>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Self::Null, Into::into)
    }
}

impl<T: Into<Self>> From<Vec<T>> for Value {
    fn from(v: Vec<T>) -> Self {
        Self::list(v)
    }
}

impl<T: Into<Self>, const N: usize> From<[T; N]> for Value {
    fn from(v: [T; N]) -> Self {
        Self::list(v)
    }
}
