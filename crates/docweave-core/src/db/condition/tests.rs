use super::*;
use crate::test_fixtures::{arb_flat_conditions, arb_tree, atom, leaf, truth};
use proptest::prelude::*;

fn deltas(conditions: &[Condition]) -> Vec<i32> {
    conditions.iter().map(|c| c.paren_delta).collect()
}

fn connectives(conditions: &[Condition]) -> Vec<bool> {
    conditions.iter().map(|c| c.by_or).collect()
}

///
/// Tree shape
///

#[test]
fn and_binds_tighter_than_or() {
    // a AND b OR c
    let tree = ConditionTree::from_sequence(vec![
        (Connective::And, leaf(0)),
        (Connective::And, leaf(1)),
        (Connective::Or, leaf(2)),
    ])
    .unwrap();

    assert_eq!(
        tree,
        ConditionTree::Or(vec![ConditionTree::And(vec![leaf(0), leaf(1)]), leaf(2)])
    );
}

#[test]
fn first_connective_is_ignored() {
    let tree = ConditionTree::from_sequence(vec![(Connective::Or, leaf(0)), (Connective::And, leaf(1))]);

    assert_eq!(tree, Some(ConditionTree::And(vec![leaf(0), leaf(1)])));
    assert_eq!(ConditionTree::from_sequence(Vec::new()), None);
}

#[test]
fn normalize_flattens_and_collapses_without_reordering() {
    let tree = ConditionTree::And(vec![
        ConditionTree::And(vec![leaf(2), leaf(0)]),
        ConditionTree::Or(vec![leaf(1)]),
        ConditionTree::Or(Vec::new()),
    ])
    .normalize();

    assert_eq!(tree, ConditionTree::And(vec![leaf(2), leaf(0), leaf(1)]));
}

#[test]
fn normalize_is_idempotent() {
    let tree = ConditionTree::Or(vec![
        ConditionTree::Or(vec![leaf(0), ConditionTree::And(vec![leaf(1)])]),
        leaf(2),
    ]);
    let once = tree.normalize();

    assert_eq!(once.clone().normalize(), once);
}

#[test]
fn leaves_are_left_to_right() {
    let tree = ConditionTree::or(vec![
        ConditionTree::and(vec![leaf(3), leaf(1)]),
        leaf(4),
    ]);
    let ids: Vec<_> = tree
        .leaves()
        .into_iter()
        .map(|p| p.operand.clone())
        .collect();

    assert_eq!(
        ids,
        vec![
            Operand::Const(3.into()),
            Operand::Const(1.into()),
            Operand::Const(4.into())
        ]
    );
}

#[test]
fn predicate_display_names_alias_field_and_operand() {
    assert_eq!(atom(7).to_string(), "o.Number Equal Int(7)");
}

///
/// Codec
///

#[test]
fn canonical_encoding_groups_only_or_inside_and() {
    // a AND (b OR c)
    let tree = ConditionTree::and(vec![leaf(0), ConditionTree::or(vec![leaf(1), leaf(2)])]);
    let flat = tree.to_conditions();

    assert_eq!(deltas(&flat), vec![0, 1, -1]);
    assert_eq!(connectives(&flat), vec![false, false, true]);

    // a AND b OR c needs no parens
    let tree = ConditionTree::or(vec![ConditionTree::and(vec![leaf(0), leaf(1)]), leaf(2)]);
    let flat = tree.to_conditions();

    assert_eq!(deltas(&flat), vec![0, 0, 0]);
    assert_eq!(connectives(&flat), vec![false, false, true]);
}

#[test]
fn nested_groups_accumulate_deltas_on_one_term() {
    // ((a OR b) AND c OR d) AND e
    let tree = ConditionTree::and(vec![
        ConditionTree::or(vec![
            ConditionTree::and(vec![ConditionTree::or(vec![leaf(0), leaf(1)]), leaf(2)]),
            leaf(3),
        ]),
        leaf(4),
    ]);
    let flat = tree.to_conditions();

    assert_eq!(deltas(&flat), vec![2, -1, 0, -1, 0]);
    assert_eq!(ConditionTree::from_conditions(&flat).unwrap(), Some(tree));
}

#[test]
fn decode_keeps_redundant_groups() {
    // (a AND b) OR c
    let flat = vec![
        Condition::new(atom(0)).delta(1),
        Condition::new(atom(1)).delta(-1),
        Condition::new(atom(2)).or(),
    ];
    let tree = ConditionTree::from_conditions(&flat).unwrap().unwrap();

    assert_eq!(
        tree,
        ConditionTree::Or(vec![
            ConditionTree::group(ConditionTree::And(vec![leaf(0), leaf(1)])),
            leaf(2),
        ])
    );
    assert_eq!(deltas(&tree.to_conditions()), vec![1, -1, 0]);
}

#[test]
fn or_group_inside_and_needs_no_marker() {
    // (a OR b) AND c
    let flat = vec![
        Condition::new(atom(0)).delta(1),
        Condition::new(atom(1)).or().delta(-1),
        Condition::new(atom(2)),
    ];
    let tree = ConditionTree::from_conditions(&flat).unwrap().unwrap();

    assert_eq!(
        tree,
        ConditionTree::And(vec![ConditionTree::Or(vec![leaf(0), leaf(1)]), leaf(2)])
    );
    assert_eq!(tree.to_conditions(), flat);
}

#[test]
fn single_term_groups_collapse() {
    assert_eq!(ConditionTree::group(leaf(0)), leaf(0));
    assert_eq!(ConditionTree::group(ConditionTree::group(leaf(1))), leaf(1));
    assert!(ConditionTree::group(ConditionTree::And(Vec::new())).is_empty());
}

#[test]
fn groups_are_logically_transparent() {
    let grouped = ConditionTree::Or(vec![
        ConditionTree::group(ConditionTree::And(vec![leaf(0), leaf(1)])),
        leaf(2),
    ]);
    let plain = ConditionTree::or(vec![ConditionTree::and(vec![leaf(0), leaf(1)]), leaf(2)]);

    for assignment in 0..8u8 {
        assert_eq!(
            grouped.evaluate(&mut truth(assignment)),
            plain.evaluate(&mut truth(assignment))
        );
    }
    assert_eq!(grouped.leaves().len(), 3);
}

#[test]
fn decode_closes_several_groups_on_one_term() {
    // a AND (b OR (c AND d))
    let flat = vec![
        Condition::new(atom(0)),
        Condition::new(atom(1)).delta(1),
        Condition::new(atom(2)).or().delta(1),
        Condition::new(atom(3)).delta(-2),
    ];
    let tree = ConditionTree::from_conditions(&flat).unwrap().unwrap();

    assert_eq!(
        tree,
        ConditionTree::And(vec![
            leaf(0),
            ConditionTree::Or(vec![
                leaf(1),
                ConditionTree::group(ConditionTree::And(vec![leaf(2), leaf(3)])),
            ]),
        ])
    );
    assert_eq!(tree.to_conditions(), flat);
}

#[test]
fn redundant_double_groups_are_kept() {
    // a OR ((b AND c))
    let flat = vec![
        Condition::new(atom(0)),
        Condition::new(atom(1)).or().delta(2),
        Condition::new(atom(2)).delta(-2),
    ];
    let tree = ConditionTree::from_conditions(&flat).unwrap().unwrap();

    assert_eq!(
        tree,
        ConditionTree::Or(vec![
            leaf(0),
            ConditionTree::Group(Box::new(ConditionTree::group(ConditionTree::And(vec![
                leaf(1),
                leaf(2),
            ])))),
        ])
    );
    assert_eq!(deltas(&tree.to_conditions()), vec![0, 2, -2]);
}

#[test]
fn decode_rejects_unbalanced_lists() {
    let extra_close = vec![Condition::new(atom(0)), Condition::new(atom(1)).delta(-1)];
    assert_eq!(
        ConditionTree::from_conditions(&extra_close),
        Err(CodecError::UnexpectedClose { index: 1 })
    );

    let unclosed = vec![Condition::new(atom(0)).delta(2), Condition::new(atom(1)).delta(-1)];
    assert_eq!(
        ConditionTree::from_conditions(&unclosed),
        Err(CodecError::UnclosedGroup { open: 1 })
    );

    assert_eq!(ConditionTree::from_conditions(&[]), Ok(None));
}

#[test]
fn flags_reflect_operand_and_connective() {
    let mut condition = Condition::new(atom(0)).or();
    condition.connect = true;
    let flags = condition.flags();

    assert!(flags.on_const && flags.by_or && flags.connect);
    assert!(!flags.on_field && !flags.on_param);
    assert_eq!(condition.op(), CompareOp::Equal);
}

#[test]
fn capability_table_is_consistent() {
    for op in CompareOp::ALL {
        if op.is_nullary() || op.is_range() {
            assert!(!op.supports_field_operand(), "{op}");
        }
        if op.supports_case_insensitive() {
            assert!(!op.requires_ordering() && !op.is_bitwise(), "{op}");
        }
    }
    assert_eq!(CompareOp::NotLike.symbol(), Some("NOT LIKE"));
    assert_eq!(CompareOp::Between.symbol(), None);
}

proptest! {
    #[test]
    fn canonical_round_trip(tree in arb_tree()) {
        let canonical = tree.normalize();
        let decoded = ConditionTree::from_conditions(&canonical.to_conditions()).unwrap();

        prop_assert_eq!(decoded, Some(canonical));
    }

    #[test]
    fn canonical_deltas_sum_to_zero(tree in arb_tree()) {
        let flat = tree.to_conditions();
        let mut depth = 0;
        for condition in &flat {
            depth += condition.paren_delta;
            prop_assert!(depth >= 0);
        }
        prop_assert_eq!(depth, 0);
    }

    #[test]
    fn flat_lists_re_encode_unchanged(flat in arb_flat_conditions()) {
        let tree = ConditionTree::from_conditions(&flat).unwrap().unwrap();

        prop_assert_eq!(deltas(&tree.to_conditions()), deltas(&flat));
    }

    #[test]
    fn decoding_preserves_truth(tree in arb_tree(), assignment in any::<u8>()) {
        let decoded = ConditionTree::from_conditions(&tree.to_conditions()).unwrap().unwrap();

        prop_assert_eq!(
            tree.evaluate(&mut truth(assignment)),
            decoded.evaluate(&mut truth(assignment))
        );
    }
}
