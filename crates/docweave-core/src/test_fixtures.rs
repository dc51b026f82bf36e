//! Shared document fixtures for unit tests.

use crate::{
    db::condition::{CompareOp, Condition, ConditionTree, Operand, Predicate},
    model::{DocumentModel, FieldKind, FieldModel, FieldRole},
    path::FieldRef,
    traits::Document,
    value::Value,
};
use proptest::prelude::*;

document! {
    pub(crate) Store as "Store" in "stores" {
        ID: "Id" => Ulid (Identifier),
        NAME: "Name" => Text,
        DELETED: "Deleted" => Timestamp (nullable, Deleted),
    }
}

document! {
    pub(crate) Order as "Order" in "orders" {
        ID: "Id" => Ulid (Identifier),
        STORE_ID: "StoreId" as "store_id" => Ulid,
        NUMBER: "Number" => Int,
        STATUS: "Status" => Text,
        NOTE: "Note" => Text (nullable),
        FLAGS: "Flags" => Bits,
        TOTAL: "Total" => Decimal,
        CREATED: "Created" => Timestamp (Created, ReadOnly),
        DELETED: "Deleted" => Timestamp (nullable, Deleted),
        SUMMARY: "Summary" => Text (NoStorage),
    }
}

document! {
    pub(crate) Position as "Position" in "positions" {
        ID: "Id" => Ulid (Identifier),
        ORDER_ID: "OrderId" => Ulid,
        SKU: "Sku" => Text,
        QUANTITY: "Quantity" => Int,
        DISCOUNT: "Discount" => Int (nullable),
    }
}

document! {
    pub(crate) Audit as "Audit" in "audits" {
        ID: "Id" => Ulid (Identifier),
        ENTRY: "Entry" => Text,
    }
}

///
/// Customer
/// Hand-written model with an embedded address and a list field.
///

#[derive(Clone, Copy, Debug, Default)]
pub(crate) struct Customer;

#[derive(Clone, Copy, Debug, Default)]
pub(crate) struct Address;

pub(crate) static ADDRESS_MODEL: DocumentModel = DocumentModel {
    path: "docweave_core::test_fixtures::Address",
    name: "Address",
    storage_name: "addresses",
    fields: &[
        FieldModel::new("City", FieldKind::Text),
        FieldModel::new("Zip", FieldKind::Text).nullable(),
    ],
};

pub(crate) static CUSTOMER_MODEL: DocumentModel = DocumentModel {
    path: "docweave_core::test_fixtures::Customer",
    name: "Customer",
    storage_name: "customers",
    fields: &[
        FieldModel::new("Id", FieldKind::Ulid)
            .role(FieldRole::Identifier)
            .depends_on(&["Region", "Code"]),
        FieldModel::new("Region", FieldKind::Text),
        FieldModel::new("Code", FieldKind::Int),
        FieldModel::new("Address", FieldKind::Embedded(&ADDRESS_MODEL))
            .storage("address")
            .nullable(),
        FieldModel::new("Tags", FieldKind::List(&FieldKind::Text)),
    ],
};

impl Document for Customer {
    const MODEL: &'static DocumentModel = &CUSTOMER_MODEL;
}

impl Document for Address {
    const MODEL: &'static DocumentModel = &ADDRESS_MODEL;
}

impl Customer {
    pub(crate) const ID: FieldRef<Self> = FieldRef::new("Id");
    pub(crate) const ADDRESS: FieldRef<Self> = FieldRef::new("Address");
    pub(crate) const TAGS: FieldRef<Self> = FieldRef::new("Tags");
}

impl Address {
    pub(crate) const CITY: FieldRef<Self> = FieldRef::new("City");
    pub(crate) const ZIP: FieldRef<Self> = FieldRef::new("Zip");
}

// ---------------------------------------------------------------------
// Boolean atoms
// ---------------------------------------------------------------------

/// Atomic predicate `o.Number = <id>`; the id doubles as the atom index.
pub(crate) fn atom(id: i64) -> Predicate {
    Predicate::new(
        "o",
        Order::NUMBER.path().unwrap(),
        CompareOp::Equal,
        Operand::Const(Value::Int(id)),
    )
}

pub(crate) fn leaf(id: i64) -> ConditionTree {
    ConditionTree::Leaf(atom(id))
}

/// Atom index of a predicate built by `atom`.
pub(crate) fn atom_id(predicate: &Predicate) -> u32 {
    match predicate.operand {
        Operand::Const(Value::Int(id)) => u32::try_from(id).unwrap(),
        _ => panic!("not an atom: {predicate}"),
    }
}

/// Truth of an atom under a bitmask assignment.
pub(crate) fn truth(assignment: u8) -> impl FnMut(&Predicate) -> bool {
    move |predicate| assignment & (1 << atom_id(predicate)) != 0
}

/// Trees of up to six distinct atoms, nested at most three levels deep.
pub(crate) fn arb_tree() -> impl Strategy<Value = ConditionTree> {
    let leaf = (0..6i64).prop_map(leaf);

    leaf.prop_recursive(3, 6, 3, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 1..4).prop_map(ConditionTree::And),
            prop::collection::vec(inner, 1..4).prop_map(ConditionTree::Or),
        ]
    })
}

/// Balanced flat lists over up to six atoms. Deltas range over -2..=2, so
/// redundant, doubled and multi-level groups all appear; the last term
/// closes whatever is still open.
pub(crate) fn arb_flat_conditions() -> impl Strategy<Value = Vec<Condition>> {
    prop::collection::vec((any::<bool>(), -2..=2i32), 1..=6).prop_map(|terms| {
        let last = terms.len() - 1;
        let mut depth = 0;

        terms
            .into_iter()
            .enumerate()
            .map(|(index, (by_or, delta))| {
                let delta = if index == last { -depth } else { delta.max(-depth) };
                depth += delta;

                let condition = Condition::new(atom(i64::try_from(index).unwrap())).delta(delta);
                if by_or { condition.or() } else { condition }
            })
            .collect()
    })
}
