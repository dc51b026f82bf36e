use super::*;
use crate::{
    db::condition::{CompareOp, ConditionTree, Operand, Predicate},
    test_fixtures::{Audit, Order, Position, Store},
    value::Value,
};
use std::collections::BTreeMap;
use ulid::Ulid;

/// Stores → Orders → Positions, each child connected to its parent's id.
fn store_tree() -> CompositionTree {
    CompositionTree::build::<Store>("Stores", |stores| {
        stores.add_node::<Order>("Orders", |orders| {
            orders.connect(Order::STORE_ID, Store::ID)?;
            orders.add_node::<Position>("Positions", |positions| {
                positions.connect(Position::ORDER_ID, Order::ID)?;
                Ok(())
            })?;
            Ok(())
        })?;
        stores.add_node::<Audit>("Audits", |_| Ok(()))?;
        Ok(())
    })
    .unwrap()
}

fn names(nodes: &[NodeRef<'_>]) -> Vec<String> {
    nodes.iter().map(|node| node.name().to_string()).collect()
}

///
/// Structure
///

#[test]
fn nodes_are_found_case_insensitively() {
    let tree = store_tree();

    let positions = tree.node("POSITIONS").unwrap();
    assert_eq!(positions.name(), "Positions");
    assert_eq!(positions.parent().unwrap().name(), "Orders");
    assert_eq!(names(&positions.ancestors()), vec!["Orders", "Stores"]);
    assert!(tree.node("customers").is_none());
    assert_eq!(tree.len(), 4);
}

#[test]
fn children_keep_declaration_order() {
    let tree = store_tree();
    let children: Vec<_> = tree.root().children().map(|c| c.name().to_string()).collect();

    assert_eq!(children, vec!["Orders", "Audits"]);
    assert!(tree.root().is_root());
    assert!(tree.root().parent().is_none());
    assert!(tree.root().condition_tree().is_none());
    assert!(tree.root_model().same_document(Store::MODEL));
}

#[test]
fn duplicate_names_are_rejected_in_any_case() {
    let err = CompositionTree::build::<Store>("Stores", |stores| {
        stores.add_node::<Order>("Orders", |_| Ok(()))?;
        stores.add_node::<Order>("ORDERS", |_| Ok(()))?;
        Ok(())
    })
    .unwrap_err();

    assert_eq!(
        err,
        TreeError::DuplicateNode {
            name: "ORDERS".to_string()
        }
    );
}

#[test]
fn duplicate_names_are_tree_wide() {
    let err = CompositionTree::build::<Store>("Stores", |stores| {
        stores.add_node::<Order>("Orders", |orders| {
            orders.add_node::<Store>("stores", |_| Ok(()))?;
            Ok(())
        })?;
        Ok(())
    })
    .unwrap_err();

    assert!(matches!(err, TreeError::DuplicateNode { .. }));
}

///
/// Ancestor resolution
///

#[test]
fn connect_resolves_the_single_matching_ancestor() {
    let tree = store_tree();
    let positions = tree.node("Positions").unwrap();
    let conditions = positions.conditions();

    assert_eq!(conditions.len(), 1);
    assert_eq!(conditions[0].ancestor(), Some("Orders"));
    assert_eq!(conditions[0].ancestor_field().unwrap().dotted(), "Id");
    assert_eq!(conditions[0].field.dotted(), "OrderId");
    assert_eq!(conditions[0].op, CompareOp::Equal);
    assert_eq!(conditions[0].default, None);
}

#[test]
fn two_ancestors_of_the_same_document_are_ambiguous() {
    let err = CompositionTree::build::<Store>("Stores", |stores| {
        stores.add_node::<Store>("Branch", |branch| {
            branch.add_node::<Order>("Orders", |orders| {
                orders.connect(Order::STORE_ID, Store::ID)?;
                Ok(())
            })?;
            Ok(())
        })?;
        Ok(())
    })
    .unwrap_err();

    assert_eq!(
        err,
        TreeError::AmbiguousAncestor {
            node: "Orders".to_string(),
            document: Store::MODEL.path.to_string(),
            candidates: vec!["Branch".to_string(), "Stores".to_string()],
        }
    );
}

#[test]
fn ambiguity_is_avoided_with_an_explicit_join() {
    let tree = CompositionTree::build::<Store>("Stores", |stores| {
        stores.add_node::<Store>("Branch", |branch| {
            branch.add_node::<Order>("Orders", |orders| {
                orders.join("branch", Order::STORE_ID, CompareOp::Equal, Store::ID)?;
                Ok(())
            })?;
            Ok(())
        })?;
        Ok(())
    })
    .unwrap();

    let orders = tree.node("orders").unwrap();
    assert_eq!(orders.conditions()[0].ancestor(), Some("Branch"));
}

#[test]
fn missing_ancestor_document_is_rejected() {
    let err = CompositionTree::build::<Store>("Stores", |stores| {
        stores.add_node::<Position>("Positions", |positions| {
            positions.connect(Position::ORDER_ID, Order::ID)?;
            Ok(())
        })?;
        Ok(())
    })
    .unwrap_err();

    assert!(matches!(err, TreeError::NoMatchingAncestor { ref node, .. } if node == "Positions"));
}

#[test]
fn siblings_are_not_ancestors() {
    let err = CompositionTree::build::<Store>("Stores", |stores| {
        stores.add_node::<Audit>("Audits", |_| Ok(()))?;
        stores.add_node::<Order>("Orders", |orders| {
            orders.join("Audits", Order::STATUS, CompareOp::Equal, Audit::ENTRY)?;
            Ok(())
        })?;
        Ok(())
    })
    .unwrap_err();

    assert_eq!(
        err,
        TreeError::UnknownAncestor {
            node: "Orders".to_string(),
            ancestor: "Audits".to_string(),
        }
    );
}

#[test]
fn untyped_ancestor_field_cannot_auto_resolve() {
    let err = CompositionTree::build::<Store>("Stores", |stores| {
        stores.add_node::<Order>("Orders", |orders| {
            orders.connect(Order::STORE_ID, "Id")?;
            Ok(())
        })?;
        Ok(())
    })
    .unwrap_err();

    assert!(matches!(err, TreeError::UntypedAncestorField { .. }));
}

#[test]
fn incompatible_link_fields_are_config_errors() {
    let err = CompositionTree::build::<Store>("Stores", |stores| {
        stores.add_node::<Order>("Orders", |orders| {
            orders.connect(Order::STORE_ID, Store::NAME)?;
            Ok(())
        })?;
        Ok(())
    })
    .unwrap_err();

    assert!(matches!(
        err,
        TreeError::Config(ConfigError::IncompatibleFields { .. })
    ));
}

#[test]
fn invalid_local_filter_is_a_config_error() {
    let err = CompositionTree::build::<Store>("Stores", |stores| {
        stores.add_node::<Position>("Positions", |positions| {
            positions.filter_const(Position::QUANTITY, CompareOp::Greater, "many")?;
            Ok(())
        })?;
        Ok(())
    })
    .unwrap_err();

    assert!(matches!(
        err,
        TreeError::Config(ConfigError::InvalidLiteral { .. })
    ));
}

///
/// Condition trees
///

#[test]
fn condition_tree_aliases_by_node_name() {
    let tree = store_tree();
    let positions = tree.node("positions").unwrap();

    let expected = ConditionTree::Leaf(Predicate::new(
        "Positions",
        Position::ORDER_ID.path().unwrap(),
        CompareOp::Equal,
        Operand::Field {
            alias: "Orders".to_string(),
            field: Order::ID.path().unwrap(),
        },
    ));
    assert_eq!(positions.condition_tree(), Some(expected));
}

#[test]
fn local_filters_join_the_condition_tree() {
    let tree = CompositionTree::build::<Order>("Orders", |orders| {
        orders.add_node::<Position>("Positions", |positions| {
            positions
                .connect(Position::ORDER_ID, Order::ID)?
                .filter_const(Position::QUANTITY, CompareOp::Greater, 0)?
                .filter_param(Position::SKU, CompareOp::Like, "sku")?;
            Ok(())
        })?;
        Ok(())
    })
    .unwrap();

    let condition_tree = tree.node("Positions").unwrap().condition_tree().unwrap();
    let ConditionTree::And(children) = condition_tree else {
        panic!("expected an AND of three leaves");
    };
    assert_eq!(children.len(), 3);
    assert!(matches!(
        &children[2],
        ConditionTree::Leaf(Predicate { operand: Operand::Param(name), .. }) if name == "sku"
    ));
}

///
/// Parent binding
///

#[test]
fn bind_parent_injects_the_ancestor_key() {
    let tree = store_tree();
    let order_id = Ulid::from_parts(1, 2);
    let record: BTreeMap<&'static str, Value> = BTreeMap::from([("Id", Value::Ulid(order_id))]);

    let bound = tree
        .node("Positions")
        .unwrap()
        .bind_parent("orders", &record)
        .unwrap();

    assert_eq!(
        bound,
        Some(ConditionTree::Leaf(Predicate::new(
            "Positions",
            Position::ORDER_ID.path().unwrap(),
            CompareOp::Equal,
            Operand::Const(Value::Ulid(order_id)),
        )))
    );
}

#[test]
fn bind_parent_falls_back_to_the_default() {
    let tree = CompositionTree::build::<Order>("Orders", |orders| {
        orders.add_node::<Position>("Positions", |positions| {
            positions.connect_with(
                Position::ORDER_ID,
                CompareOp::Equal,
                Order::ID,
                Some(Value::Ulid(Ulid::nil())),
            )?;
            Ok(())
        })?;
        Ok(())
    })
    .unwrap();
    let record: BTreeMap<&'static str, Value> = BTreeMap::new();

    let bound = tree
        .node("Positions")
        .unwrap()
        .bind_parent("Orders", &record)
        .unwrap()
        .unwrap();

    assert_eq!(bound.leaves()[0].operand, Operand::Const(Value::Ulid(Ulid::nil())));
}

#[test]
fn bind_parent_without_value_or_default_fails() {
    let tree = store_tree();
    let record: BTreeMap<String, Value> = BTreeMap::new();

    let err = tree
        .node("Positions")
        .unwrap()
        .bind_parent("Orders", &record)
        .unwrap_err();

    assert_eq!(
        err,
        TreeError::MissingParentValue {
            node: "Positions".to_string(),
            field: "Id".to_string(),
        }
    );
}

#[test]
fn bind_parent_ignores_other_ancestors() {
    let tree = store_tree();
    let record: BTreeMap<String, Value> = BTreeMap::new();
    let positions = tree.node("Positions").unwrap();

    assert_eq!(positions.bind_parent("Stores", &record), Ok(None));
    assert!(matches!(
        positions.bind_parent("Audits", &record),
        Err(TreeError::UnknownAncestor { .. })
    ));
}
