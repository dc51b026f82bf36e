use crate::model::document::DocumentModel;
use std::fmt;

///
/// FieldModel
/// Runtime field descriptor consumed by path resolution, validation, and compilation.
///

#[derive(Debug)]
pub struct FieldModel {
    /// Field name as used in conditions and projections.
    pub name: &'static str,
    /// Physical column / attribute name in the storage engine.
    pub storage_name: &'static str,
    /// Host type shape.
    pub kind: FieldKind,
    pub nullable: bool,
    pub roles: FieldRoles,
    /// Fields a composite or computed identifier is derived from.
    pub depends_on: &'static [&'static str],
}

impl FieldModel {
    /// Build a non-nullable plain field whose storage name equals its name.
    #[must_use]
    pub const fn new(name: &'static str, kind: FieldKind) -> Self {
        Self {
            name,
            storage_name: name,
            kind,
            nullable: false,
            roles: FieldRoles::NONE,
            depends_on: &[],
        }
    }

    #[must_use]
    pub const fn storage(mut self, storage_name: &'static str) -> Self {
        self.storage_name = storage_name;
        self
    }

    #[must_use]
    pub const fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    #[must_use]
    pub const fn role(mut self, role: FieldRole) -> Self {
        self.roles = self.roles.with(role);
        self
    }

    #[must_use]
    pub const fn depends_on(mut self, fields: &'static [&'static str]) -> Self {
        self.depends_on = fields;
        self
    }

    #[must_use]
    pub const fn has_role(&self, role: FieldRole) -> bool {
        self.roles.contains(role)
    }

    /// Fields that never reach storage cannot be filtered on.
    #[must_use]
    pub const fn is_stored(&self) -> bool {
        !self.roles.contains(FieldRole::NoStorage)
    }
}

///
/// FieldKind
///
/// Lossy projection of host types onto the shapes the compiler cares about.
///

#[derive(Clone, Copy, Debug)]
pub enum FieldKind {
    Bits,
    Bool,
    Bytes,
    Decimal,
    Float,
    Int,
    Text,
    Timestamp,
    Uint,
    Ulid,

    List(&'static Self),
    Embedded(&'static DocumentModel),
}

impl FieldKind {
    #[must_use]
    pub const fn is_text(&self) -> bool {
        matches!(self, Self::Text)
    }

    #[must_use]
    pub const fn is_numeric(&self) -> bool {
        matches!(
            self,
            Self::Bits | Self::Decimal | Self::Float | Self::Int | Self::Uint
        )
    }

    /// Kinds with a total order usable by `<`, `>`, and `BETWEEN`.
    #[must_use]
    pub const fn is_orderable(&self) -> bool {
        matches!(
            self,
            Self::Bits
                | Self::Decimal
                | Self::Float
                | Self::Int
                | Self::Text
                | Self::Timestamp
                | Self::Uint
                | Self::Ulid
        )
    }

    /// Kinds that accept bitwise mask operators.
    #[must_use]
    pub const fn is_bitwise(&self) -> bool {
        matches!(self, Self::Bits | Self::Int | Self::Uint)
    }

    #[must_use]
    pub const fn is_embedded(&self) -> bool {
        matches!(self, Self::Embedded(_))
    }

    /// Return whether two kinds can be compared field-to-field.
    #[must_use]
    pub const fn is_comparable_with(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::List(left), Self::List(right)) => left.is_comparable_with(right),
            (Self::Embedded(_), _) | (_, Self::Embedded(_)) => false,
            (left, right) if left.is_numeric() && right.is_numeric() => true,
            (Self::Bool, Self::Bool)
            | (Self::Bytes, Self::Bytes)
            | (Self::Text, Self::Text)
            | (Self::Timestamp, Self::Timestamp)
            | (Self::Ulid, Self::Ulid) => true,
            _ => false,
        }
    }
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bits => write!(f, "bits"),
            Self::Bool => write!(f, "bool"),
            Self::Bytes => write!(f, "bytes"),
            Self::Decimal => write!(f, "decimal"),
            Self::Float => write!(f, "float"),
            Self::Int => write!(f, "int"),
            Self::Text => write!(f, "text"),
            Self::Timestamp => write!(f, "timestamp"),
            Self::Uint => write!(f, "uint"),
            Self::Ulid => write!(f, "ulid"),
            Self::List(inner) => write!(f, "list<{inner}>"),
            Self::Embedded(model) => write!(f, "embedded<{}>", model.name),
        }
    }
}

///
/// FieldRole
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[repr(u8)]
pub enum FieldRole {
    Identifier = 0x01,
    Created = 0x02,
    Updated = 0x04,
    Deleted = 0x08,
    ReadOnly = 0x10,
    NoStorage = 0x20,
}

///
/// FieldRoles
/// Compact role set; roles are independent flags.
///

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct FieldRoles(u8);

impl FieldRoles {
    pub const NONE: Self = Self(0);

    #[must_use]
    pub const fn with(self, role: FieldRole) -> Self {
        Self(self.0 | role as u8)
    }

    #[must_use]
    pub const fn contains(self, role: FieldRole) -> bool {
        self.0 & role as u8 != 0
    }

    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }
}
