use super::*;
use crate::{
    db::{
        compile::Postgres,
        condition::CompareOp,
        ir::{Builder, ParamSet, Parameter},
    },
    model::FieldKind,
    test_fixtures::{Order, Position},
    traits::Document,
};
use std::vec::IntoIter;
use ulid::Ulid;

///
/// MockExecutor
/// Records every call and answers with a fixed affected count.
///

#[derive(Debug, Default)]
struct MockExecutor {
    affected: u64,
    rows: Vec<String>,
    calls: Vec<(CommandKind, Option<String>)>,
    stamps: Vec<Value>,
    fail: Option<String>,
}

impl MockExecutor {
    fn affecting(affected: u64) -> Self {
        Self {
            affected,
            ..Self::default()
        }
    }

    fn record(&mut self, op: &CompiledOperation) -> Result<(), ExecuteError> {
        self.calls.push((op.command, op.filter.clone()));

        match &self.fail {
            Some(message) => Err(ExecuteError::backend(message)),
            None => Ok(()),
        }
    }
}

impl Executor for MockExecutor {
    type Row = String;
    type Cursor = IntoIter<Result<String, ExecuteError>>;

    fn insert(&mut self, op: &CompiledOperation) -> Result<String, ExecuteError> {
        self.record(op)?;
        Ok(format!("{} row", op.document))
    }

    fn select(&mut self, op: &CompiledOperation) -> Result<Self::Cursor, ExecuteError> {
        self.record(op)?;
        let rows: Vec<_> = self.rows.iter().cloned().map(Ok).collect();
        Ok(rows.into_iter())
    }

    fn update(&mut self, op: &CompiledOperation) -> Result<u64, ExecuteError> {
        self.record(op)?;
        Ok(self.affected)
    }

    fn delete(&mut self, op: &CompiledOperation) -> Result<u64, ExecuteError> {
        self.record(op)?;
        Ok(self.affected)
    }

    fn soft_delete(
        &mut self,
        op: &CompiledOperation,
        deleted_at: &Value,
    ) -> Result<u64, ExecuteError> {
        self.record(op)?;
        self.stamps.push(deleted_at.clone());
        Ok(self.affected)
    }

    fn restore(&mut self, op: &CompiledOperation) -> Result<u64, ExecuteError> {
        self.record(op)?;
        Ok(self.affected)
    }
}

fn compiled(mut builder: Builder) -> CompiledOperation {
    if builder.command().requires_filter() {
        builder
            .declare_param(Parameter::new("id", FieldKind::Ulid))
            .unwrap()
            .where_param("", "Id", CompareOp::Equal, "id")
            .unwrap();
    }
    builder.normalize().unwrap();

    let mut params: ParamSet = builder.params();
    if builder.command().requires_filter() {
        params.set("id", Ulid::nil()).unwrap();
    }

    builder.compile(&params, &Postgres).unwrap()
}

#[test]
fn insert_returns_the_backend_row() {
    let mut executor = MockExecutor::default();
    let op = compiled(Builder::insert::<Order>());

    let outcome = execute(&mut executor, &op).unwrap();

    assert!(matches!(outcome, Outcome::Row(ref row) if row.ends_with("Order row")));
    assert_eq!(executor.calls, vec![(CommandKind::Insert, None)]);
}

#[test]
fn select_streams_rows_from_the_cursor() {
    let mut executor = MockExecutor {
        rows: vec!["a".to_string(), "b".to_string()],
        ..MockExecutor::default()
    };
    let op = compiled(Builder::select::<Order>());

    let Outcome::Cursor(cursor) = execute(&mut executor, &op).unwrap() else {
        panic!("select must yield a cursor");
    };
    let rows: Vec<_> = cursor.collect::<Result<_, _>>().unwrap();

    assert_eq!(rows, vec!["a", "b"]);
}

#[test]
fn empty_select_is_not_a_not_found() {
    let mut executor = MockExecutor::default();
    let op = compiled(Builder::select::<Order>());

    let Outcome::Cursor(mut cursor) = execute(&mut executor, &op).unwrap() else {
        panic!("select must yield a cursor");
    };
    assert!(cursor.next().is_none());
}

#[test]
fn keyed_mutation_reports_affected_rows() {
    let mut executor = MockExecutor::affecting(1);
    let op = compiled(Builder::update::<Order>());

    let outcome = execute(&mut executor, &op).unwrap();

    assert_eq!(outcome.affected(), Some(1));
    assert_eq!(
        executor.calls,
        vec![(CommandKind::Update, Some(r#""Id" = $1"#.to_string()))]
    );
}

#[test]
fn zero_affected_rows_is_not_found() {
    let mut executor = MockExecutor::affecting(0);

    for builder in [
        Builder::update::<Order>(),
        Builder::delete::<Order>(),
        Builder::soft_delete::<Order>().unwrap(),
        Builder::restore::<Order>().unwrap(),
    ] {
        let op = compiled(builder);
        let err = execute(&mut executor, &op).unwrap_err();

        assert_eq!(
            err,
            ExecuteError::NotFound {
                document: Order::MODEL.path.to_string()
            }
        );
    }
}

#[test]
fn unkeyed_mutation_touching_nothing_succeeds() {
    let mut executor = MockExecutor::affecting(0);
    let mut builder = Builder::update::<Order>();
    builder
        .where_const("", "Status", CompareOp::Equal, "stale")
        .unwrap();
    builder.normalize().unwrap();
    let op = builder.compile(&builder.params(), &Postgres).unwrap();

    assert!(!op.keyed);
    let outcome = execute(&mut executor, &op).unwrap();
    assert_eq!(outcome.affected(), Some(0));
}

#[test]
fn identifier_filters_mark_the_operation_keyed() {
    let keyed = |declare: fn(&mut Builder)| {
        let mut builder = Builder::delete::<Order>();
        declare(&mut builder);
        builder.normalize().unwrap();
        builder.compile(&builder.params(), &Postgres).unwrap().keyed
    };

    assert!(keyed(|b: &mut Builder| {
        b.where_const("", "Id", CompareOp::Equal, Value::Ulid(Ulid::nil()))
            .unwrap();
    }));
    assert!(keyed(|b: &mut Builder| {
        b.where_const("", "Status", CompareOp::Equal, "open")
            .unwrap()
            .where_const("", "Id", CompareOp::In, Value::List(vec![Value::Ulid(Ulid::nil())]))
            .unwrap();
    }));
    assert!(!keyed(|b: &mut Builder| {
        b.where_const("", "Id", CompareOp::Equal, Value::Ulid(Ulid::nil()))
            .unwrap()
            .or()
            .unwrap()
            .where_const("", "Status", CompareOp::Equal, "open")
            .unwrap();
    }));
    assert!(!keyed(|b: &mut Builder| {
        b.where_const("", "Id", CompareOp::NotEqual, Value::Ulid(Ulid::nil()))
            .unwrap();
    }));
}

#[test]
fn soft_delete_stamps_a_timestamp() {
    let mut executor = MockExecutor::affecting(2);
    let op = compiled(Builder::soft_delete::<Order>().unwrap());

    let outcome = execute(&mut executor, &op).unwrap();

    assert_eq!(outcome.affected(), Some(2));
    assert_eq!(executor.stamps.len(), 1);
    assert!(matches!(executor.stamps[0], Value::Timestamp(_)));
}

#[test]
fn soft_delete_without_deleted_field_never_reaches_the_backend() {
    let mut executor = MockExecutor::affecting(1);
    let mut op = compiled(Builder::update::<Position>());
    op.command = CommandKind::SoftDelete;

    let err = execute(&mut executor, &op).unwrap_err();

    assert!(matches!(err, ExecuteError::MissingDeletedField { .. }));
    assert!(executor.calls.is_empty());
}

#[test]
fn backend_errors_pass_through() {
    let mut executor = MockExecutor {
        fail: Some("disk full".to_string()),
        ..MockExecutor::affecting(1)
    };
    let op = compiled(Builder::delete::<Order>());

    let err = execute(&mut executor, &op).unwrap_err();

    assert_eq!(err, ExecuteError::Backend("disk full".to_string()));
    assert_eq!(err.class(), ErrorClass::Backend);
}

#[test]
fn ensure_affected_passes_positive_counts() {
    assert_eq!(ensure_affected("test::Order", 3), Ok(3));
    assert!(ensure_affected("test::Order", 0).is_err());
}

#[test]
fn deletion_stamp_is_a_timestamp() {
    assert!(matches!(deletion_stamp(), Value::Timestamp(_)));
}
