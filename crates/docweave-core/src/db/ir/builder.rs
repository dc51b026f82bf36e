use crate::{
    db::{
        compile::{BoundParams, CompileError, Compiler, Dialect},
        condition::{CompareOp, Condition, ConditionTree, Operand, Predicate},
        ir::{
            AggregateOp, Aggregation, CommandKind, ConfigError, Container, ContainerKind,
            FieldMarker, JoinKind, Operation, Page, ParamSet, Parameter, Projection,
            SortDirection, SortOrder, validate,
        },
    },
    model::DocumentModel,
    obs::sink::{self, MetricsEvent},
    path::{FieldPath, IntoFieldSelector},
    traits::Document,
    value::Value,
};
use serde::Serialize;
use std::{collections::BTreeSet, sync::OnceLock};
use tracing::{debug, trace};

///
/// Target
/// Condition list a declared condition lands in.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum Target {
    Filter,
    Connect(usize),
}

///
/// Cursor
/// Connective and group state waiting for the next declared condition.
///

#[derive(Clone, Copy, Debug, Default)]
struct Cursor {
    by_or: bool,
    opens: i32,
    last: Option<Target>,
}

///
/// NormalizedPlan
///

#[derive(Clone, Debug)]
struct NormalizedPlan {
    filter: Option<ConditionTree>,
    connects: Vec<Option<ConditionTree>>,
    used: BTreeSet<String>,
}

///
/// Builder
///
/// Declarative description of one operation on one document.
///
/// Mutators validate eagerly and return `ConfigError` naming the document
/// and field. `normalize()` runs the cross-cutting checks exactly once,
/// even under concurrent callers, and freezes the builder.
///

#[derive(Debug)]
pub struct Builder {
    model: &'static DocumentModel,
    command: CommandKind,
    containers: Vec<Container>,
    filter: Vec<Condition>,
    params: Vec<Parameter>,
    projection: Vec<Projection>,
    sort: Vec<SortOrder>,
    aggregates: Vec<Aggregation>,
    page: Page,
    deleted_field: Option<FieldPath>,
    cursor: Cursor,
    plan: OnceLock<Result<NormalizedPlan, ConfigError>>,
}

impl Builder {
    /// Empty builder; containers are added explicitly.
    #[must_use]
    pub fn new(model: &'static DocumentModel, command: CommandKind) -> Self {
        Self {
            model,
            command,
            containers: Vec::new(),
            filter: Vec::new(),
            params: Vec::new(),
            projection: Vec::new(),
            sort: Vec::new(),
            aggregates: Vec::new(),
            page: Page::default(),
            deleted_field: None,
            cursor: Cursor::default(),
            plan: OnceLock::new(),
        }
    }

    /// Builder with an unaliased primary container for `D`.
    #[must_use]
    pub fn for_document<D: Document>(command: CommandKind) -> Self {
        let mut builder = Self::new(D::MODEL, command);
        builder
            .containers
            .push(Container::primary::<D>(command.operation()));
        builder
    }

    #[must_use]
    pub fn insert<D: Document>() -> Self {
        Self::for_document::<D>(CommandKind::Insert)
    }

    #[must_use]
    pub fn select<D: Document>() -> Self {
        Self::for_document::<D>(CommandKind::Select)
    }

    #[must_use]
    pub fn update<D: Document>() -> Self {
        Self::for_document::<D>(CommandKind::Update)
    }

    #[must_use]
    pub fn delete<D: Document>() -> Self {
        Self::for_document::<D>(CommandKind::Delete)
    }

    /// Update that stamps the document's deleted-role field.
    pub fn soft_delete<D: Document>() -> Result<Self, ConfigError> {
        Self::with_deleted_field::<D>(CommandKind::SoftDelete)
    }

    /// Update that clears the document's deleted-role field.
    pub fn restore<D: Document>() -> Result<Self, ConfigError> {
        Self::with_deleted_field::<D>(CommandKind::Restore)
    }

    fn with_deleted_field<D: Document>(command: CommandKind) -> Result<Self, ConfigError> {
        let field = D::MODEL
            .deleted_field()
            .ok_or_else(|| ConfigError::MissingRoleField {
                document: D::MODEL.path.to_string(),
                role: "deleted".to_string(),
            })?;

        let mut builder = Self::for_document::<D>(command);
        builder.deleted_field = Some(FieldPath::resolve(D::MODEL, field.name)?);

        Ok(builder)
    }

    // ------------------------------------------------------------------
    // Containers
    // ------------------------------------------------------------------

    pub fn add_container(&mut self, container: Container) -> Result<&mut Self, ConfigError> {
        self.ensure_mutable()?;

        if self.containers.iter().any(|c| c.alias == container.alias) {
            return Err(ConfigError::DuplicateAlias {
                document: self.document(),
                alias: container.alias,
            });
        }
        self.containers.push(container);

        Ok(self)
    }

    /// Shorthand for a joined container of document `D`.
    pub fn join<D: Document>(
        &mut self,
        join: JoinKind,
        alias: impl Into<String>,
    ) -> Result<&mut Self, ConfigError> {
        self.add_container(Container::joined::<D>(join, alias))
    }

    // ------------------------------------------------------------------
    // Filter conditions
    // ------------------------------------------------------------------

    /// `alias.field <op> other_alias.other_field`
    pub fn where_field(
        &mut self,
        alias: &str,
        field: impl IntoFieldSelector,
        op: CompareOp,
        other_alias: &str,
        other_field: impl IntoFieldSelector,
    ) -> Result<&mut Self, ConfigError> {
        self.add_field(Target::Filter, alias, field, op, other_alias, other_field)
    }

    /// `alias.field <op> value`
    pub fn where_const(
        &mut self,
        alias: &str,
        field: impl IntoFieldSelector,
        op: CompareOp,
        value: impl Into<Value>,
    ) -> Result<&mut Self, ConfigError> {
        self.add_const(Target::Filter, alias, field, op, value.into(), false)
    }

    pub fn where_const_ci(
        &mut self,
        alias: &str,
        field: impl IntoFieldSelector,
        op: CompareOp,
        value: impl Into<Value>,
    ) -> Result<&mut Self, ConfigError> {
        self.add_const(Target::Filter, alias, field, op, value.into(), true)
    }

    /// `alias.field <op> @param`
    pub fn where_param(
        &mut self,
        alias: &str,
        field: impl IntoFieldSelector,
        op: CompareOp,
        param: &str,
    ) -> Result<&mut Self, ConfigError> {
        self.add_param(Target::Filter, alias, field, op, param, false)
    }

    pub fn where_param_ci(
        &mut self,
        alias: &str,
        field: impl IntoFieldSelector,
        op: CompareOp,
        param: &str,
    ) -> Result<&mut Self, ConfigError> {
        self.add_param(Target::Filter, alias, field, op, param, true)
    }

    pub fn where_null(
        &mut self,
        alias: &str,
        field: impl IntoFieldSelector,
    ) -> Result<&mut Self, ConfigError> {
        self.add_const(Target::Filter, alias, field, CompareOp::IsNull, Value::Null, false)
    }

    pub fn where_not_null(
        &mut self,
        alias: &str,
        field: impl IntoFieldSelector,
    ) -> Result<&mut Self, ConfigError> {
        self.add_const(
            Target::Filter,
            alias,
            field,
            CompareOp::IsNotNull,
            Value::Null,
            false,
        )
    }

    // ------------------------------------------------------------------
    // Connect conditions
    // ------------------------------------------------------------------

    /// Append to the `ON` predicate of container `alias`.
    pub fn connect_field(
        &mut self,
        alias: &str,
        field: impl IntoFieldSelector,
        op: CompareOp,
        other_alias: &str,
        other_field: impl IntoFieldSelector,
    ) -> Result<&mut Self, ConfigError> {
        let index = self.container_index(alias)?;
        self.add_field(Target::Connect(index), alias, field, op, other_alias, other_field)
    }

    pub fn connect_const(
        &mut self,
        alias: &str,
        field: impl IntoFieldSelector,
        op: CompareOp,
        value: impl Into<Value>,
    ) -> Result<&mut Self, ConfigError> {
        let index = self.container_index(alias)?;
        self.add_const(Target::Connect(index), alias, field, op, value.into(), false)
    }

    pub fn connect_param(
        &mut self,
        alias: &str,
        field: impl IntoFieldSelector,
        op: CompareOp,
        param: &str,
    ) -> Result<&mut Self, ConfigError> {
        let index = self.container_index(alias)?;
        self.add_param(Target::Connect(index), alias, field, op, param, false)
    }

    // ------------------------------------------------------------------
    // Connectives and grouping
    // ------------------------------------------------------------------

    /// Join the next condition with AND (the default).
    pub fn and(&mut self) -> Result<&mut Self, ConfigError> {
        self.ensure_mutable()?;
        self.cursor.by_or = false;

        Ok(self)
    }

    /// Join the next condition with OR.
    pub fn or(&mut self) -> Result<&mut Self, ConfigError> {
        self.ensure_mutable()?;
        self.cursor.by_or = true;

        Ok(self)
    }

    /// Open a group before the next condition.
    pub fn begin(&mut self) -> Result<&mut Self, ConfigError> {
        self.ensure_mutable()?;
        self.cursor.opens += 1;

        Ok(self)
    }

    /// Close the innermost open group after the last condition.
    pub fn end(&mut self) -> Result<&mut Self, ConfigError> {
        self.ensure_mutable()?;
        let unbalanced = ConfigError::UnbalancedGroup {
            document: self.document(),
        };

        // begin() directly followed by end() opens an empty group
        if self.cursor.opens > 0 {
            return Err(unbalanced);
        }

        let list = match self.cursor.last {
            None => return Err(unbalanced),
            Some(Target::Filter) => &mut self.filter,
            Some(Target::Connect(index)) => &mut self.containers[index].connect,
        };

        let depth: i32 = list.iter().map(|c| c.paren_delta).sum();
        match list.last_mut() {
            Some(last) if depth > 0 => last.paren_delta -= 1,
            _ => return Err(unbalanced),
        }

        Ok(self)
    }

    // ------------------------------------------------------------------
    // Parameters, projection, ordering
    // ------------------------------------------------------------------

    pub fn declare_param(&mut self, param: Parameter) -> Result<&mut Self, ConfigError> {
        self.ensure_mutable()?;

        if self.params.iter().any(|p| p.name == param.name) {
            return Err(ConfigError::DuplicateParameter {
                document: self.document(),
                name: param.name,
            });
        }
        self.params.push(param);

        Ok(self)
    }

    /// Project a primary-container field.
    pub fn include(&mut self, field: impl IntoFieldSelector) -> Result<&mut Self, ConfigError> {
        let alias = self.primary_alias()?;
        self.project(FieldMarker::Include, &alias, field, None)
    }

    /// Project a field from another container under its own name.
    pub fn include_from(
        &mut self,
        alias: &str,
        field: impl IntoFieldSelector,
    ) -> Result<&mut Self, ConfigError> {
        self.project(FieldMarker::Include, alias, field, None)
    }

    /// Project a field under a different name.
    pub fn include_as(
        &mut self,
        alias: &str,
        field: impl IntoFieldSelector,
        name: &str,
    ) -> Result<&mut Self, ConfigError> {
        self.project(FieldMarker::Include, alias, field, Some(name))
    }

    pub fn exclude(&mut self, field: impl IntoFieldSelector) -> Result<&mut Self, ConfigError> {
        let alias = self.primary_alias()?;
        self.project(FieldMarker::Exclude, &alias, field, None)
    }

    pub fn exclude_from(
        &mut self,
        alias: &str,
        field: impl IntoFieldSelector,
    ) -> Result<&mut Self, ConfigError> {
        self.project(FieldMarker::Exclude, alias, field, None)
    }

    pub fn optional(&mut self, field: impl IntoFieldSelector) -> Result<&mut Self, ConfigError> {
        let alias = self.primary_alias()?;
        self.project(FieldMarker::Optional, &alias, field, None)
    }

    pub fn optional_from(
        &mut self,
        alias: &str,
        field: impl IntoFieldSelector,
    ) -> Result<&mut Self, ConfigError> {
        self.project(FieldMarker::Optional, alias, field, None)
    }

    pub fn sort_by(
        &mut self,
        alias: &str,
        field: impl IntoFieldSelector,
        direction: SortDirection,
    ) -> Result<&mut Self, ConfigError> {
        self.ensure_mutable()?;
        let (_, path) = self.resolve(alias, field)?;

        validate::ensure_queryable(&path)?;
        if !path.kind().is_orderable() {
            return Err(ConfigError::NotOrderable {
                document: self.document(),
                field: path.dotted(),
            });
        }

        self.sort.push(SortOrder {
            alias: alias.to_string(),
            field: path,
            direction,
        });

        Ok(self)
    }

    pub fn aggregate(
        &mut self,
        alias: &str,
        field: impl IntoFieldSelector,
        op: AggregateOp,
        name: Option<&str>,
    ) -> Result<&mut Self, ConfigError> {
        self.ensure_mutable()?;
        let (_, path) = self.resolve(alias, field)?;

        validate::ensure_queryable(&path)?;
        let kind = path.kind();
        let supported = match op {
            AggregateOp::Count => true,
            AggregateOp::Min | AggregateOp::Max => kind.is_orderable(),
            AggregateOp::Sum | AggregateOp::Avg => kind.is_numeric(),
        };
        if !supported {
            return Err(ConfigError::NotAggregatable {
                document: self.document(),
                field: path.dotted(),
                op,
            });
        }

        self.aggregates.push(Aggregation {
            alias: alias.to_string(),
            field: path,
            op,
            name: name.map(str::to_string),
        });

        Ok(self)
    }

    pub fn skip(&mut self, skip: u64) -> Result<&mut Self, ConfigError> {
        self.ensure_mutable()?;
        self.page.skip = Some(skip);

        Ok(self)
    }

    pub fn take(&mut self, take: u64) -> Result<&mut Self, ConfigError> {
        self.ensure_mutable()?;
        self.page.take = Some(take);

        Ok(self)
    }

    // ------------------------------------------------------------------
    // Normalization
    // ------------------------------------------------------------------

    /// Validate and freeze. Idempotent: later calls return the first result.
    pub fn normalize(&self) -> Result<(), ConfigError> {
        let plan = self.plan.get_or_init(|| {
            let result = self.build_plan();

            match &result {
                Ok(plan) => {
                    let unused: Vec<_> = self
                        .params
                        .iter()
                        .filter(|p| !plan.used.contains(&p.name))
                        .map(|p| p.name.as_str())
                        .collect();
                    debug!(
                        document = self.model.path,
                        command = %self.command,
                        conditions = self.condition_count(),
                        ?unused,
                        "normalized builder"
                    );
                }
                Err(err) => {
                    debug!(document = self.model.path, error = %err, "builder rejected");
                }
            }
            sink::record(MetricsEvent::Normalized {
                document_path: self.model.path,
                ok: result.is_ok(),
            });

            result
        });

        plan.as_ref().map(|_| ()).map_err(Clone::clone)
    }

    fn build_plan(&self) -> Result<NormalizedPlan, ConfigError> {
        let document = self.document();

        let mut primaries = self.containers.iter().filter(|c| c.is_primary());
        if primaries.next().is_none() {
            return Err(ConfigError::MissingPrimary { document });
        }
        if let Some(second) = primaries.next() {
            return Err(ConfigError::DuplicatePrimary {
                document,
                alias: second.alias.clone(),
            });
        }

        for container in &self.containers {
            if container.operation == Operation::Exec && !container.kind.is_executable() {
                return Err(ConfigError::NotExecutable {
                    document,
                    alias: container.alias.clone(),
                    kind: container.kind,
                });
            }
            if container.join.is_some_and(JoinKind::requires_connect)
                && container.connect.is_empty()
            {
                return Err(ConfigError::MissingConnect {
                    document,
                    alias: container.alias.clone(),
                });
            }
        }

        if self.cursor.opens != 0 {
            return Err(ConfigError::UnbalancedGroup { document });
        }
        let decode = |list: &[Condition]| {
            ConditionTree::from_conditions(list).map_err(|_| ConfigError::UnbalancedGroup {
                document: self.document(),
            })
        };
        let filter = decode(&self.filter)?;
        let connects = self
            .containers
            .iter()
            .map(|c| decode(&c.connect))
            .collect::<Result<Vec<_>, _>>()?;

        if self.command.requires_filter() && filter.is_none() {
            return Err(ConfigError::MissingFilter {
                document,
                command: self.command,
            });
        }

        let mut used = BTreeSet::new();
        for tree in filter.iter().chain(connects.iter().flatten()) {
            for predicate in tree.leaves() {
                let Operand::Param(name) = &predicate.operand else {
                    continue;
                };
                let param = self
                    .params
                    .iter()
                    .find(|p| &p.name == name)
                    .ok_or_else(|| ConfigError::UnknownParameter {
                        document: self.document(),
                        name: name.clone(),
                    })?;
                validate::ensure_param_kind(&predicate.field, name, param.kind)?;
                used.insert(name.clone());
            }
        }

        if self.command != CommandKind::Select {
            let clause = if !self.page.is_empty() {
                Some("skip/take")
            } else if !self.sort.is_empty() {
                Some("sort")
            } else if !self.aggregates.is_empty() {
                Some("aggregate")
            } else {
                None
            };
            if let Some(clause) = clause {
                return Err(ConfigError::SelectOnly { document, clause });
            }
        }

        Ok(NormalizedPlan {
            filter,
            connects,
            used,
        })
    }

    // ------------------------------------------------------------------
    // Compilation
    // ------------------------------------------------------------------

    /// Per-call parameter snapshot with this builder's declarations.
    #[must_use]
    pub fn params(&self) -> ParamSet {
        let used = self.plan_ref().map(|plan| &plan.used);
        let mut set = ParamSet::new();

        for param in &self.params {
            let mut param = param.clone();
            param.used = used.is_some_and(|used| used.contains(&param.name));
            set.declare(param);
        }

        set
    }

    /// Render every condition tree of a normalized builder.
    ///
    /// Connect trees are emitted first, in container order, then the filter,
    /// sharing one placeholder sequence.
    pub fn compile(
        &self,
        params: &ParamSet,
        dialect: &dyn Dialect,
    ) -> Result<CompiledOperation, CompileError> {
        let plan = self.plan_ref().ok_or_else(|| CompileError::NotNormalized {
            document: self.document(),
        })?;

        let result = self.compile_plan(plan, params, dialect);
        sink::record(MetricsEvent::Compiled {
            document_path: self.model.path,
            ok: result.is_ok(),
        });

        match &result {
            Ok(compiled) => trace!(
                document = self.model.path,
                command = %self.command,
                params = compiled.params.len(),
                "compiled operation"
            ),
            Err(err) => debug!(document = self.model.path, error = %err, "compile failed"),
        }

        result
    }

    fn compile_plan(
        &self,
        plan: &NormalizedPlan,
        params: &ParamSet,
        dialect: &dyn Dialect,
    ) -> Result<CompiledOperation, CompileError> {
        let mut compiler = Compiler::new(dialect, params);

        let mut containers = Vec::with_capacity(self.containers.len());
        for (container, connect) in self.containers.iter().zip(&plan.connects) {
            let connect = connect
                .as_ref()
                .map(|tree| compiler.condition(tree))
                .transpose()?;

            containers.push(CompiledContainer {
                alias: container.alias.clone(),
                storage_name: container.storage_name.clone(),
                kind: container.kind,
                operation: container.operation,
                join: container.join,
                connect,
            });
        }

        let filter = plan
            .filter
            .as_ref()
            .map(|tree| compiler.condition(tree))
            .transpose()?;

        Ok(CompiledOperation {
            document: self.model.path,
            command: self.command,
            containers,
            filter,
            params: compiler.finish(),
            projection: self.projection.clone(),
            sort: self.sort.clone(),
            aggregates: self.aggregates.clone(),
            page: self.page,
            deleted_field: self.deleted_field.clone(),
            keyed: self.is_keyed(plan.filter.as_ref()),
        })
    }

    /// A filter is keyed when every match must agree with an `=` or `IN`
    /// on the primary container's identifier.
    fn is_keyed(&self, filter: Option<&ConditionTree>) -> bool {
        match (filter, self.model.identifier(), self.primary()) {
            (Some(tree), Some(identifier), Some(primary)) => {
                pins_identifier(tree, self.model, identifier.name, &primary.alias)
            }
            _ => false,
        }
    }

    // ------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------

    #[must_use]
    pub const fn model(&self) -> &'static DocumentModel {
        self.model
    }

    #[must_use]
    pub const fn command(&self) -> CommandKind {
        self.command
    }

    #[must_use]
    pub fn containers(&self) -> &[Container] {
        &self.containers
    }

    #[must_use]
    pub fn primary(&self) -> Option<&Container> {
        self.containers.iter().find(|c| c.is_primary())
    }

    /// Flat filter list as declared.
    #[must_use]
    pub fn filter_conditions(&self) -> &[Condition] {
        &self.filter
    }

    /// Filter tree; `None` before a successful `normalize()` or when empty.
    #[must_use]
    pub fn filter_tree(&self) -> Option<&ConditionTree> {
        self.plan_ref().and_then(|plan| plan.filter.as_ref())
    }

    #[must_use]
    pub fn connect_tree(&self, alias: &str) -> Option<&ConditionTree> {
        let index = self.containers.iter().position(|c| c.alias == alias)?;
        self.plan_ref()
            .and_then(|plan| plan.connects.get(index))
            .and_then(Option::as_ref)
    }

    #[must_use]
    pub fn declared_params(&self) -> &[Parameter] {
        &self.params
    }

    #[must_use]
    pub fn projection(&self) -> &[Projection] {
        &self.projection
    }

    #[must_use]
    pub fn sort(&self) -> &[SortOrder] {
        &self.sort
    }

    #[must_use]
    pub fn aggregates(&self) -> &[Aggregation] {
        &self.aggregates
    }

    #[must_use]
    pub const fn page(&self) -> Page {
        self.page
    }

    #[must_use]
    pub const fn deleted_field(&self) -> Option<&FieldPath> {
        self.deleted_field.as_ref()
    }

    #[must_use]
    pub fn is_normalized(&self) -> bool {
        self.plan.get().is_some()
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    fn document(&self) -> String {
        self.model.path.to_string()
    }

    fn plan_ref(&self) -> Option<&NormalizedPlan> {
        self.plan.get().and_then(|result| result.as_ref().ok())
    }

    fn condition_count(&self) -> usize {
        self.filter.len()
            + self
                .containers
                .iter()
                .map(|c| c.connect.len())
                .sum::<usize>()
    }

    fn ensure_mutable(&self) -> Result<(), ConfigError> {
        if self.is_normalized() {
            return Err(ConfigError::Frozen {
                document: self.document(),
            });
        }

        Ok(())
    }

    fn container_index(&self, alias: &str) -> Result<usize, ConfigError> {
        self.containers
            .iter()
            .position(|c| c.alias == alias)
            .ok_or_else(|| ConfigError::UnknownAlias {
                document: self.document(),
                alias: alias.to_string(),
            })
    }

    fn primary_alias(&self) -> Result<String, ConfigError> {
        self.primary()
            .map(|c| c.alias.clone())
            .ok_or_else(|| ConfigError::MissingPrimary {
                document: self.document(),
            })
    }

    fn resolve(
        &self,
        alias: &str,
        field: impl IntoFieldSelector,
    ) -> Result<(usize, FieldPath), ConfigError> {
        let index = self.container_index(alias)?;
        let path = field
            .into_selector()
            .resolve(self.containers[index].model)?;

        Ok((index, path))
    }

    fn push(&mut self, target: Target, predicate: Predicate) {
        let mut condition = Condition::new(predicate);
        condition.by_or = std::mem::take(&mut self.cursor.by_or);
        condition.paren_delta = std::mem::take(&mut self.cursor.opens);
        condition.connect = matches!(target, Target::Connect(_));

        match target {
            Target::Filter => self.filter.push(condition),
            Target::Connect(index) => self.containers[index].connect.push(condition),
        }
        self.cursor.last = Some(target);
    }

    fn add_const(
        &mut self,
        target: Target,
        alias: &str,
        field: impl IntoFieldSelector,
        op: CompareOp,
        value: Value,
        case_insensitive: bool,
    ) -> Result<&mut Self, ConfigError> {
        self.ensure_mutable()?;
        let (_, path) = self.resolve(alias, field)?;

        validate::ensure_operator(&path, op, case_insensitive)?;
        validate::ensure_literal(&path, op, &value)?;

        let operand = if op.is_nullary() {
            Operand::None
        } else {
            Operand::Const(value)
        };
        let mut predicate = Predicate::new(alias, path, op, operand);
        predicate.case_insensitive = case_insensitive;
        self.push(target, predicate);

        Ok(self)
    }

    fn add_param(
        &mut self,
        target: Target,
        alias: &str,
        field: impl IntoFieldSelector,
        op: CompareOp,
        param: &str,
        case_insensitive: bool,
    ) -> Result<&mut Self, ConfigError> {
        self.ensure_mutable()?;
        let (_, path) = self.resolve(alias, field)?;

        validate::ensure_operator(&path, op, case_insensitive)?;
        if op.is_nullary() {
            return Err(ConfigError::OperatorNotSupported {
                document: self.document(),
                field: path.dotted(),
                op,
                kind: "parameter".to_string(),
            });
        }

        let mut predicate = Predicate::new(alias, path, op, Operand::Param(param.to_string()));
        predicate.case_insensitive = case_insensitive;
        self.push(target, predicate);

        Ok(self)
    }

    fn add_field(
        &mut self,
        target: Target,
        alias: &str,
        field: impl IntoFieldSelector,
        op: CompareOp,
        other_alias: &str,
        other_field: impl IntoFieldSelector,
    ) -> Result<&mut Self, ConfigError> {
        self.ensure_mutable()?;
        let (_, left) = self.resolve(alias, field)?;
        let (_, right) = self.resolve(other_alias, other_field)?;

        validate::ensure_field_pair(&left, op, &right)?;

        let operand = Operand::Field {
            alias: other_alias.to_string(),
            field: right,
        };
        self.push(target, Predicate::new(alias, left, op, operand));

        Ok(self)
    }

    fn project(
        &mut self,
        marker: FieldMarker,
        alias: &str,
        field: impl IntoFieldSelector,
        name: Option<&str>,
    ) -> Result<&mut Self, ConfigError> {
        self.ensure_mutable()?;
        let (_, path) = self.resolve(alias, field)?;

        validate::ensure_queryable(&path)?;
        let mut projection = Projection::new(marker, alias, path);
        if let Some(name) = name {
            projection = projection.named(name);
        }
        self.projection.push(projection);

        Ok(self)
    }
}

///
/// CompiledContainer
///

#[derive(Clone, Debug, Serialize)]
pub struct CompiledContainer {
    pub alias: String,
    pub storage_name: String,
    pub kind: ContainerKind,
    pub operation: Operation,
    pub join: Option<JoinKind>,
    /// Rendered `ON` predicate.
    pub connect: Option<String>,
}

/// Whether `tree` holds an identifier equality on every path to a match:
/// a leaf, or one conjunct of an AND, seen through explicit groups.
fn pins_identifier(
    tree: &ConditionTree,
    model: &DocumentModel,
    identifier: &str,
    primary_alias: &str,
) -> bool {
    match tree {
        ConditionTree::Leaf(predicate) => {
            matches!(predicate.op, CompareOp::Equal | CompareOp::In)
                && (predicate.alias.is_empty() || predicate.alias == primary_alias)
                && predicate.field.elements().len() == 1
                && predicate.field.root().same_document(model)
                && predicate.field.leaf().name == identifier
        }
        ConditionTree::Group(inner) => pins_identifier(inner, model, identifier, primary_alias),
        ConditionTree::And(children) => children
            .iter()
            .any(|child| pins_identifier(child, model, identifier, primary_alias)),
        ConditionTree::Or(_) => false,
    }
}

///
/// CompiledOperation
///
/// Backend-ready description of one operation: rendered condition text,
/// bound parameters in placeholder order, and the declarative clauses an
/// executor needs to assemble the statement.
///

#[derive(Clone, Debug, Serialize)]
pub struct CompiledOperation {
    pub document: &'static str,
    pub command: CommandKind,
    pub containers: Vec<CompiledContainer>,
    pub filter: Option<String>,
    pub params: BoundParams,
    pub projection: Vec<Projection>,
    pub sort: Vec<SortOrder>,
    pub aggregates: Vec<Aggregation>,
    pub page: Page,
    pub deleted_field: Option<FieldPath>,
    /// Filter pins the primary identifier; a zero-row mutation is a not-found.
    pub keyed: bool,
}

impl CompiledOperation {
    #[must_use]
    pub fn primary(&self) -> Option<&CompiledContainer> {
        self.containers.iter().find(|c| c.join.is_none())
    }
}
