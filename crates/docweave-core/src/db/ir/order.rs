use crate::path::FieldPath;
use serde::Serialize;

///
/// SortDirection
///

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize)]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

///
/// SortOrder
///

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SortOrder {
    pub alias: String,
    pub field: FieldPath,
    pub direction: SortDirection,
}

///
/// AggregateOp
///

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
pub enum AggregateOp {
    Count,
    Sum,
    Min,
    Max,
    Avg,
}

impl AggregateOp {
    /// Operators that need a numeric input field.
    #[must_use]
    pub const fn requires_numeric(self) -> bool {
        matches!(self, Self::Sum | Self::Avg)
    }
}

///
/// Aggregation
///

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Aggregation {
    pub alias: String,
    pub field: FieldPath,
    pub op: AggregateOp,
    pub name: Option<String>,
}

///
/// Page
/// Select paging window; both bounds optional.
///

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize)]
pub struct Page {
    pub skip: Option<u64>,
    pub take: Option<u64>,
}

impl Page {
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.skip.is_none() && self.take.is_none()
    }
}
