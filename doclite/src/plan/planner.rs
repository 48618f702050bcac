// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Plan assembly
//!
//! [`SelectPlanner`] turns a statement into the step chain:
//! target resolution → union of index/scan branches → residual filter →
//! LET → UNWIND → EXPAND → GROUP BY → projection → DISTINCT → ORDER BY
//! (elided when the access path already yields the requested order) →
//! SKIP → LIMIT. Statement validation (aggregate mixing, unknown
//! classes/indexes) happens here, before any row is produced.

use crate::ast::{
    Expression, LetBinding, OrderItem, OrderKey, Projection, SelectStatement, Target,
};
use crate::ast::{ClusterTarget, IndexTargetMode, MetadataTarget};
use crate::eval::aggregates::AggregateFunction;
use crate::eval::expression::resolve_parameter;
use crate::exec::context::ExecutionContext;
use crate::exec::error::ExecutionError;
use crate::exec::result::{ResultRow, ResultSet};
use crate::exec::steps::aggregate::{AggregateSpec, GroupByStep};
use crate::exec::steps::index_scan::{IndexEntriesStep, IndexScanStep};
use crate::exec::steps::order::OrderByStep;
use crate::exec::steps::paging::{LimitStep, SkipStep};
use crate::exec::steps::project::{DistinctStep, ProjectStep, ProjectionItem};
use crate::exec::steps::source::{FetchRidsStep, MetadataKind, MetadataStep, ScanStep, SubqueryTargetStep};
use crate::exec::steps::transform::{ExpandStep, FilterStep, LetStep, UnwindStep};
use crate::exec::steps::union::ParallelUnionStep;
use crate::exec::steps::{EmptyResultStep, ExecutionStep, NoTargetStep, StepKind};
use crate::plan::index_planner::{self, ClassAccess, IndexCandidate, IndexTargetAccess};
use crate::plan::{PlanDescription, SelectExecutionPlan, StepDescription};
use crate::storage::{ClusterId, ScanOrder};
use crate::types::Value;
use std::sync::Arc;

/// Builds executable plans for SELECT statements
pub struct SelectPlanner {
    ctx: Arc<ExecutionContext>,
}

/// What the source planning produced besides the steps themselves
struct SourceOutcome {
    /// Predicate portion not consumed by the access path
    residual: Option<crate::ast::BooleanExpression>,
    /// The access path already yields the requested ORDER BY
    order_elided: bool,
}

/// Linear step chain under construction, with its description
struct Chain {
    root: Option<Box<dyn ExecutionStep>>,
    steps: Vec<StepDescription>,
}

impl Chain {
    fn new() -> Self {
        Self {
            root: None,
            steps: Vec::new(),
        }
    }

    fn set_source(&mut self, step: Box<dyn ExecutionStep>, description: StepDescription) {
        self.root = Some(step);
        self.steps.push(description);
    }

    fn add(
        &mut self,
        description: StepDescription,
        build: impl FnOnce(Box<dyn ExecutionStep>) -> Box<dyn ExecutionStep>,
    ) -> Result<(), ExecutionError> {
        let upstream = self.root.take().ok_or_else(|| {
            ExecutionError::PlanningError("step chain has no source".to_string())
        })?;
        self.root = Some(build(upstream));
        self.steps.push(description);
        Ok(())
    }

    fn finish(self) -> Result<SelectExecutionPlan, ExecutionError> {
        let root = self.root.ok_or_else(|| {
            ExecutionError::PlanningError("step chain has no source".to_string())
        })?;
        Ok(SelectExecutionPlan {
            root,
            description: PlanDescription { steps: self.steps },
        })
    }
}

/// Statement analysis performed before assembly
struct Analysis {
    has_aggregates: bool,
    /// The argument of a sole `expand(...)` projection
    expand: Option<Expression>,
}

impl SelectPlanner {
    pub fn new(ctx: Arc<ExecutionContext>) -> Self {
        Self { ctx }
    }

    /// Build the execution plan; all plan-time validation happens here
    pub fn plan(&self, statement: &SelectStatement) -> Result<SelectExecutionPlan, ExecutionError> {
        let analysis = self.analyze(statement)?;
        let aggregating = analysis.has_aggregates || !statement.group_by.is_empty();

        // sort elision only applies when nothing between the source and
        // the sort position reorders or reshapes rows
        let elision_allowed = statement.unwind.is_empty()
            && analysis.expand.is_none()
            && !aggregating
            && !statement.distinct
            && statement.projections.is_empty();
        let order_hint: &[OrderItem] = if elision_allowed {
            &statement.order_by
        } else {
            &[]
        };

        let mut chain = Chain::new();
        let outcome = self.build_source(statement, order_hint, &mut chain)?;

        if let Some(residual) = outcome.residual {
            let detail = residual.to_string();
            let ctx = self.ctx.clone();
            chain.add(StepDescription::new(StepKind::Filter, detail), move |up| {
                Box::new(FilterStep::new(up, residual, ctx))
            })?;
        }

        if !statement.let_bindings.is_empty() {
            let bindings: Vec<LetBinding> = statement.let_bindings.clone();
            let detail = bindings
                .iter()
                .map(|binding| binding.name.clone())
                .collect::<Vec<_>>()
                .join(", ");
            let ctx = self.ctx.clone();
            chain.add(StepDescription::new(StepKind::Let, detail), move |up| {
                Box::new(LetStep::new(up, bindings, ctx))
            })?;
        }

        if !statement.unwind.is_empty() {
            let fields = statement.unwind.clone();
            let detail = fields.join(", ");
            chain.add(StepDescription::new(StepKind::Unwind, detail), move |up| {
                Box::new(UnwindStep::new(up, fields))
            })?;
        }

        if let Some(expand) = analysis.expand.clone() {
            let detail = expand.to_string();
            let ctx = self.ctx.clone();
            chain.add(StepDescription::new(StepKind::Expand, detail), move |up| {
                Box::new(ExpandStep::new(up, expand, ctx))
            })?;
        }

        let skip = self.resolve_skip(statement)?;
        let limit = self.resolve_limit(statement)?;
        let sort_needed = !statement.order_by.is_empty() && !outcome.order_elided;

        let output_names: Vec<String> = statement
            .projections
            .iter()
            .map(Projection::output_name)
            .collect();
        let sort_before_projection = sort_needed
            && !statement.projections.is_empty()
            && analysis.expand.is_none()
            && !aggregating
            && statement.order_by.iter().any(|item| match &item.key {
                OrderKey::Rid => true,
                OrderKey::Expression(Expression::Field(name)) => !output_names.contains(name),
                OrderKey::Expression(_) => false,
            });

        if sort_needed && sort_before_projection {
            self.add_order(&mut chain, &statement.order_by, skip, limit)?;
        }

        if aggregating {
            let mut specs: Vec<AggregateSpec> = Vec::new();
            let items = self.projection_items(statement, true, &mut specs)?;
            let group_by = statement.group_by.clone();
            let detail = group_by
                .iter()
                .map(Expression::to_string)
                .collect::<Vec<_>>()
                .join(", ");
            let ctx = self.ctx.clone();
            chain.add(StepDescription::new(StepKind::GroupBy, detail), move |up| {
                Box::new(GroupByStep::new(up, group_by, specs, ctx))
            })?;
            if !items.is_empty() {
                self.add_projection(&mut chain, items)?;
            }
        } else if !statement.projections.is_empty() && analysis.expand.is_none() {
            let items = self.projection_items(statement, false, &mut Vec::new())?;
            self.add_projection(&mut chain, items)?;
        }

        if statement.distinct {
            chain.add(StepDescription::new(StepKind::Distinct, ""), |up| {
                Box::new(DistinctStep::new(up))
            })?;
        }

        if sort_needed && !sort_before_projection {
            self.add_order(&mut chain, &statement.order_by, skip, limit)?;
        }

        if let Some(skip) = skip.filter(|count| *count > 0) {
            chain.add(
                StepDescription::new(StepKind::Skip, skip.to_string()),
                move |up| Box::new(SkipStep::new(up, skip)),
            )?;
        }
        if let Some(limit) = limit {
            chain.add(
                StepDescription::new(StepKind::Limit, limit.to_string()),
                move |up| Box::new(LimitStep::new(up, limit)),
            )?;
        }

        chain.finish()
    }

    fn analyze(&self, statement: &SelectStatement) -> Result<Analysis, ExecutionError> {
        if let Some(predicate) = &statement.predicate {
            if predicate.contains_aggregate() {
                return Err(ExecutionError::InvalidQuery(
                    "aggregate functions are not allowed in the filter predicate".to_string(),
                ));
            }
        }

        let mut expand = None;
        let mut has_aggregates = false;
        for projection in &statement.projections {
            if let Expression::FunctionCall { name, args } = &projection.expression {
                if name.eq_ignore_ascii_case("expand") {
                    if statement.projections.len() != 1 {
                        return Err(ExecutionError::InvalidQuery(
                            "expand() cannot be combined with other projections".to_string(),
                        ));
                    }
                    if args.len() != 1 {
                        return Err(ExecutionError::InvalidQuery(
                            "expand() takes exactly one argument".to_string(),
                        ));
                    }
                    expand = Some(args[0].clone());
                    continue;
                }
            }
            let usage = projection.expression.aggregate_usage();
            // mixing is judged per expression: a separate plain-field
            // projection next to aggregates is legal, a single expression
            // combining both (outside constants) is not
            if usage.has_aggregate
                && usage.has_field_outside_aggregate
                && statement.group_by.is_empty()
            {
                return Err(ExecutionError::InvalidQuery(format!(
                    "cannot mix aggregate and non-aggregate values in '{}' without GROUP BY",
                    projection.expression
                )));
            }
            has_aggregates |= usage.has_aggregate;
        }

        Ok(Analysis {
            has_aggregates,
            expand,
        })
    }

    fn build_source(
        &self,
        statement: &SelectStatement,
        order_hint: &[OrderItem],
        chain: &mut Chain,
    ) -> Result<SourceOutcome, ExecutionError> {
        let predicate = statement.predicate.as_ref();
        let target = match &statement.target {
            Some(Target::Parameter(parameter)) => {
                let value = resolve_parameter(parameter, &self.ctx)?;
                match value {
                    Value::String(name) => Some(Target::Class(name)),
                    other => {
                        return Err(ExecutionError::InvalidQuery(format!(
                            "cannot resolve {} as a query target",
                            other
                        )))
                    }
                }
            }
            other => other.clone(),
        };

        match target {
            None => {
                chain.set_source(
                    Box::new(NoTargetStep::new()),
                    StepDescription::new(StepKind::NoTarget, ""),
                );
                Ok(SourceOutcome {
                    residual: predicate.cloned(),
                    order_elided: false,
                })
            }
            Some(Target::Class(name)) => self.build_class_source(statement, &name, order_hint, chain),
            Some(Target::Clusters(targets)) => {
                let mut clusters: Vec<ClusterId> = Vec::with_capacity(targets.len());
                for target in &targets {
                    match target {
                        ClusterTarget::Id(id) => clusters.push(*id),
                        ClusterTarget::Name(name) => {
                            let id = self
                                .ctx
                                .schema()
                                .cluster_by_name(&name.to_lowercase())
                                .ok_or_else(|| {
                                    ExecutionError::NotFound(format!("cluster {}", name))
                                })?;
                            clusters.push(id);
                        }
                    }
                }
                let (order, elided) = match index_planner::order_satisfied_by_rid(order_hint) {
                    Some(order) => (order, true),
                    None => (ScanOrder::Ascending, false),
                };
                let detail = format!("clusters {:?}", clusters);
                chain.set_source(
                    Box::new(ScanStep::cluster_scan(
                        self.ctx.store().clone(),
                        clusters,
                        order,
                    )),
                    StepDescription::new(StepKind::ClusterScan, detail),
                );
                Ok(SourceOutcome {
                    residual: predicate.cloned(),
                    order_elided: elided,
                })
            }
            Some(Target::Rids(rids)) => {
                chain.set_source(
                    Box::new(FetchRidsStep::new(self.ctx.store().clone(), rids)),
                    StepDescription::new(StepKind::FetchRids, ""),
                );
                Ok(SourceOutcome {
                    residual: predicate.cloned(),
                    order_elided: false,
                })
            }
            Some(Target::Subquery(inner)) => {
                let inner_plan = self.plan(&inner)?;
                let mut description = StepDescription::new(StepKind::SubqueryTarget, "");
                description.sub_plans.push(inner_plan.description);
                chain.set_source(
                    Box::new(SubqueryTargetStep::new(inner_plan.root)),
                    description,
                );
                Ok(SourceOutcome {
                    residual: predicate.cloned(),
                    order_elided: false,
                })
            }
            Some(Target::Metadata(target)) => {
                let kind = match target {
                    MetadataTarget::Schema => MetadataKind::Schema,
                    MetadataTarget::IndexManager => MetadataKind::IndexManager,
                };
                let detail = match target {
                    MetadataTarget::Schema => "schema",
                    MetadataTarget::IndexManager => "indexmanager",
                };
                chain.set_source(
                    Box::new(MetadataStep::new(kind, self.ctx.schema())),
                    StepDescription::new(StepKind::Metadata, detail),
                );
                Ok(SourceOutcome {
                    residual: predicate.cloned(),
                    order_elided: false,
                })
            }
            Some(Target::Index { name, mode }) => {
                let descriptor = self
                    .ctx
                    .schema()
                    .index(&name)
                    .ok_or_else(|| ExecutionError::NotFound(format!("index {}", name)))?
                    .clone();
                match mode {
                    IndexTargetMode::Entries => {
                        match index_planner::plan_index_target(&self.ctx, &descriptor, predicate)? {
                            IndexTargetAccess::Empty => {
                                chain.set_source(
                                    Box::new(EmptyResultStep),
                                    StepDescription::new(StepKind::EmptyResult, name),
                                );
                                Ok(SourceOutcome {
                                    residual: None,
                                    order_elided: true,
                                })
                            }
                            IndexTargetAccess::Scan { range, residual } => {
                                let reader = self.ctx.index_reader(&name)?;
                                chain.set_source(
                                    Box::new(IndexEntriesStep::new(
                                        reader,
                                        range,
                                        ScanOrder::Ascending,
                                    )),
                                    StepDescription::new(StepKind::IndexEntries, name),
                                );
                                Ok(SourceOutcome {
                                    residual,
                                    order_elided: false,
                                })
                            }
                        }
                    }
                    IndexTargetMode::Values(order) => {
                        let reader = self.ctx.index_reader(&name)?;
                        chain.set_source(
                            Box::new(IndexScanStep::values(
                                reader,
                                self.ctx.store().clone(),
                                order,
                            )),
                            StepDescription::new(StepKind::IndexValues, name),
                        );
                        Ok(SourceOutcome {
                            residual: predicate.cloned(),
                            order_elided: false,
                        })
                    }
                }
            }
            Some(Target::Parameter(_)) => unreachable!("parameter target resolved above"),
        }
    }

    fn build_class_source(
        &self,
        statement: &SelectStatement,
        class: &str,
        order_hint: &[OrderItem],
        chain: &mut Chain,
    ) -> Result<SourceOutcome, ExecutionError> {
        let schema = self.ctx.schema().clone();
        if schema.class(class).is_none() {
            return Err(ExecutionError::NotFound(format!("class {}", class)));
        }
        let predicate = statement.predicate.as_ref();

        match index_planner::plan_class_access(&self.ctx, class, predicate)? {
            ClassAccess::Empty => {
                chain.set_source(
                    Box::new(EmptyResultStep),
                    StepDescription::new(StepKind::EmptyResult, class),
                );
                Ok(SourceOutcome {
                    residual: None,
                    order_elided: true,
                })
            }
            ClassAccess::Branches(mut candidates) if candidates.len() == 1 => {
                let candidate = candidates.remove(0);
                let (order, elided) =
                    match index_planner::order_satisfied_by_candidate(&candidate, order_hint) {
                        Some(order) => (order, true),
                        None => (ScanOrder::Ascending, false),
                    };
                if elided {
                    log::debug!(
                        "ORDER BY satisfied by index {}; sort step elided",
                        candidate.index.name
                    );
                }
                self.push_candidate(chain, candidate, order)?;
                Ok(SourceOutcome {
                    residual: None,
                    order_elided: elided,
                })
            }
            ClassAccess::Branches(candidates) => {
                let mut branches: Vec<Box<dyn ExecutionStep>> = Vec::with_capacity(candidates.len());
                let mut sub_plans = Vec::with_capacity(candidates.len());
                for candidate in candidates {
                    let (step, description) =
                        self.build_branch(candidate, ScanOrder::Ascending)?;
                    branches.push(step);
                    sub_plans.push(description);
                }
                let mut description =
                    StepDescription::new(StepKind::ParallelUnion, class.to_string());
                description.sub_plans = sub_plans;
                chain.set_source(Box::new(ParallelUnionStep::new(branches)), description);
                Ok(SourceOutcome {
                    residual: None,
                    order_elided: false,
                })
            }
            ClassAccess::FullScan => {
                if let Some(order) = index_planner::order_satisfied_by_rid(order_hint) {
                    let clusters = schema.polymorphic_clusters(class);
                    chain.set_source(
                        Box::new(ScanStep::class_scan(
                            self.ctx.store().clone(),
                            clusters,
                            order,
                        )),
                        StepDescription::new(StepKind::ClassScan, class),
                    );
                    return Ok(SourceOutcome {
                        residual: predicate.cloned(),
                        order_elided: true,
                    });
                }
                if predicate.is_none() && !order_hint.is_empty() {
                    if let Some((index, order)) =
                        index_planner::find_order_index(&schema, class, order_hint)
                    {
                        log::debug!(
                            "conditionless scan of index {} satisfies ORDER BY",
                            index.name
                        );
                        let reader = self.ctx.index_reader(&index.name)?;
                        chain.set_source(
                            Box::new(IndexScanStep::new(
                                reader,
                                self.ctx.store().clone(),
                                crate::storage::KeyRange::all(),
                                order,
                            )),
                            StepDescription::new(StepKind::IndexScan, index.name.clone()),
                        );
                        return Ok(SourceOutcome {
                            residual: None,
                            order_elided: true,
                        });
                    }
                }
                let clusters = schema.polymorphic_clusters(class);
                chain.set_source(
                    Box::new(ScanStep::class_scan(
                        self.ctx.store().clone(),
                        clusters,
                        ScanOrder::Ascending,
                    )),
                    StepDescription::new(StepKind::ClassScan, class),
                );
                Ok(SourceOutcome {
                    residual: predicate.cloned(),
                    order_elided: false,
                })
            }
        }
    }

    /// Push a single index candidate (plus its residual filter) onto the
    /// main chain
    fn push_candidate(
        &self,
        chain: &mut Chain,
        candidate: IndexCandidate,
        order: ScanOrder,
    ) -> Result<(), ExecutionError> {
        let reader = self.ctx.index_reader(&candidate.index.name)?;
        chain.set_source(
            Box::new(IndexScanStep::new(
                reader,
                self.ctx.store().clone(),
                candidate.range.clone(),
                order,
            )),
            StepDescription::new(StepKind::IndexScan, candidate.index.name.clone()),
        );
        if let Some(residual) = candidate.residual {
            let detail = residual.to_string();
            let ctx = self.ctx.clone();
            chain.add(StepDescription::new(StepKind::Filter, detail), move |up| {
                Box::new(FilterStep::new(up, residual, ctx))
            })?;
        }
        Ok(())
    }

    /// Build one union branch as its own sub-chain
    fn build_branch(
        &self,
        candidate: IndexCandidate,
        order: ScanOrder,
    ) -> Result<(Box<dyn ExecutionStep>, PlanDescription), ExecutionError> {
        let mut chain = Chain::new();
        self.push_candidate(&mut chain, candidate, order)?;
        let plan = chain.finish()?;
        Ok((plan.root, plan.description))
    }

    fn add_projection(
        &self,
        chain: &mut Chain,
        items: Vec<ProjectionItem>,
    ) -> Result<(), ExecutionError> {
        let detail = items
            .iter()
            .map(|item| item.name.clone())
            .collect::<Vec<_>>()
            .join(", ");
        let ctx = self.ctx.clone();
        chain.add(StepDescription::new(StepKind::Project, detail), move |up| {
            Box::new(ProjectStep::new(up, items, ctx))
        })
    }

    fn add_order(
        &self,
        chain: &mut Chain,
        order_by: &[OrderItem],
        skip: Option<usize>,
        limit: Option<usize>,
    ) -> Result<(), ExecutionError> {
        let detail = order_by
            .iter()
            .map(|item| {
                let key = match &item.key {
                    OrderKey::Expression(expression) => expression.to_string(),
                    OrderKey::Rid => "@rid".to_string(),
                };
                let direction = match item.direction {
                    crate::ast::SortDirection::Ascending => "asc",
                    crate::ast::SortDirection::Descending => "desc",
                };
                format!("{} {}", key, direction)
            })
            .collect::<Vec<_>>()
            .join(", ");
        let items = order_by.to_vec();
        let ctx = self.ctx.clone();
        // a LIMIT right after ORDER BY bounds the sort buffer to skip+limit
        let keep = limit.map(|limit| limit.saturating_add(skip.unwrap_or(0)));
        chain.add(StepDescription::new(StepKind::OrderBy, detail), move |up| {
            let step = OrderByStep::new(up, items, ctx);
            let step = match keep {
                Some(keep) => step.with_limit(keep),
                None => step,
            };
            Box::new(step)
        })
    }

    /// Rewrite aggregate calls into `$aggN` slot references, collecting
    /// the accumulator specs
    fn rewrite_aggregates(
        &self,
        expression: &Expression,
        specs: &mut Vec<AggregateSpec>,
    ) -> Result<Expression, ExecutionError> {
        if expression.is_aggregate_call() {
            if let Expression::FunctionCall { name, args } = expression {
                let function = AggregateFunction::parse(name).ok_or_else(|| {
                    ExecutionError::PlanningError(format!("unknown aggregate {}", name))
                })?;
                let argument = match args.as_slice() {
                    [] | [Expression::Star] => None,
                    [argument] => Some(argument.clone()),
                    _ => {
                        return Err(ExecutionError::InvalidQuery(format!(
                            "{}() takes one argument",
                            name
                        )))
                    }
                };
                if function != AggregateFunction::Count && argument.is_none() {
                    return Err(ExecutionError::InvalidQuery(format!(
                        "{}() requires an argument",
                        name
                    )));
                }
                let slot = specs.len();
                specs.push(AggregateSpec { function, argument });
                return Ok(Expression::Variable(format!("$agg{}", slot)));
            }
        }
        Ok(match expression {
            Expression::Binary {
                left,
                operator,
                right,
            } => Expression::Binary {
                left: Box::new(self.rewrite_aggregates(left, specs)?),
                operator: *operator,
                right: Box::new(self.rewrite_aggregates(right, specs)?),
            },
            Expression::Neg(inner) => {
                Expression::Neg(Box::new(self.rewrite_aggregates(inner, specs)?))
            }
            Expression::List(items) => {
                let mut rewritten = Vec::with_capacity(items.len());
                for item in items {
                    rewritten.push(self.rewrite_aggregates(item, specs)?);
                }
                Expression::List(rewritten)
            }
            Expression::Index { base, index } => Expression::Index {
                base: Box::new(self.rewrite_aggregates(base, specs)?),
                index: Box::new(self.rewrite_aggregates(index, specs)?),
            },
            Expression::MethodCall { base, name, args } => {
                let mut rewritten = Vec::with_capacity(args.len());
                for arg in args {
                    rewritten.push(self.rewrite_aggregates(arg, specs)?);
                }
                Expression::MethodCall {
                    base: Box::new(self.rewrite_aggregates(base, specs)?),
                    name: name.clone(),
                    args: rewritten,
                }
            }
            other => other.clone(),
        })
    }

    fn projection_items(
        &self,
        statement: &SelectStatement,
        aggregating: bool,
        specs: &mut Vec<AggregateSpec>,
    ) -> Result<Vec<ProjectionItem>, ExecutionError> {
        let mut items = Vec::with_capacity(statement.projections.len());
        for projection in &statement.projections {
            let name = projection.output_name();
            let expression = if aggregating {
                self.rewrite_aggregates(&projection.expression, specs)?
            } else {
                projection.expression.clone()
            };
            items.push(ProjectionItem {
                expression,
                name,
                nested: projection.nested.clone(),
            });
        }
        Ok(items)
    }

    /// SKIP resolves at plan time; negative values clamp to zero
    fn resolve_skip(&self, statement: &SelectStatement) -> Result<Option<usize>, ExecutionError> {
        match &statement.skip {
            None => Ok(None),
            Some(expression) => {
                let value = self.plan_time_integer(expression, "SKIP")?;
                Ok(Some(value.max(0) as usize))
            }
        }
    }

    /// LIMIT resolves at plan time; negative means unbounded
    fn resolve_limit(&self, statement: &SelectStatement) -> Result<Option<usize>, ExecutionError> {
        match &statement.limit {
            None => Ok(None),
            Some(expression) => {
                let value = self.plan_time_integer(expression, "LIMIT")?;
                if value < 0 {
                    Ok(None)
                } else {
                    Ok(Some(value as usize))
                }
            }
        }
    }

    fn plan_time_integer(
        &self,
        expression: &Expression,
        clause: &str,
    ) -> Result<i64, ExecutionError> {
        let empty = ResultRow::new();
        let value = crate::eval::expression::evaluate(expression, &empty, &self.ctx)?;
        value.as_integer().ok_or_else(|| {
            ExecutionError::InvalidQuery(format!("{} requires an integer, got {}", clause, value))
        })
    }
}

/// Plan and fully materialize a nested statement (LET / IN subqueries,
/// scalar subqueries). The child context carries the parent scope.
pub(crate) fn execute_to_rows(
    statement: &SelectStatement,
    ctx: Arc<ExecutionContext>,
) -> Result<Vec<ResultRow>, ExecutionError> {
    let plan = SelectPlanner::new(ctx).plan(statement)?;
    let mut result = ResultSet::new(plan);
    let mut rows = Vec::new();
    while let Some(row) = result.next_row()? {
        rows.push(row);
    }
    Ok(rows)
}
