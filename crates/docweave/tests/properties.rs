use docweave::{
    db::{
        compile::compile_conditions,
        condition::{Condition, ConditionTree, Operand, Predicate},
        ir::ParamSet,
        slice::{DEFAULT_MAX_GROUPS, rejoin, slice_conditions},
    },
    document,
    prelude::*,
};
use proptest::prelude::*;

document! {
    pub Flag as "Flag" in "flags" {
        SLOT: "Slot" => Int,
    }
}

/// Atom `Slot = <id>`; the id indexes the truth assignment.
fn atom(id: i64) -> Predicate {
    Predicate::new(
        "f",
        Flag::SLOT.path().unwrap(),
        CompareOp::Equal,
        Operand::Const(Value::Int(id)),
    )
}

fn truth(assignment: u8) -> impl FnMut(&Predicate) -> bool {
    move |predicate| match predicate.operand {
        Operand::Const(Value::Int(id)) => assignment & (1 << id) != 0,
        _ => false,
    }
}

/// Any balanced flat list over up to six atoms. Deltas span -2..=2, so
/// redundant and doubled groups appear alongside the canonical ones.
fn arb_conditions() -> impl Strategy<Value = Vec<Condition>> {
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

proptest! {
    #[test]
    fn slicing_preserves_truth(conditions in arb_conditions()) {
        let original = ConditionTree::from_conditions(&conditions).unwrap().unwrap();
        let groups = slice_conditions(&conditions, DEFAULT_MAX_GROUPS).unwrap();
        let rejoined = rejoin(&groups).unwrap();

        for assignment in 0..64u8 {
            prop_assert_eq!(
                rejoined.evaluate(&mut truth(assignment)),
                original.evaluate(&mut truth(assignment))
            );
        }
    }

    #[test]
    fn parentheses_balance_with_group_deltas(conditions in arb_conditions()) {
        let opened: i32 = conditions.iter().map(|c| c.paren_delta.max(0)).sum();
        let compiled = compile_conditions(&conditions, &ParamSet::new(), &Postgres)
            .unwrap()
            .unwrap();

        let opens = compiled.text.matches('(').count();
        prop_assert_eq!(opens, compiled.text.matches(')').count());
        prop_assert_eq!(opens, usize::try_from(opened).unwrap());
        prop_assert_eq!(compiled.params.len(), conditions.len());
    }

    #[test]
    fn compilation_is_idempotent(conditions in arb_conditions()) {
        let params = ParamSet::new();
        let first = compile_conditions(&conditions, &params, &Postgres).unwrap();
        let second = compile_conditions(&conditions, &params, &Postgres).unwrap();

        prop_assert_eq!(first, second);
    }
}
