// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Row-transforming steps: residual filter, LET bindings, UNWIND fan-out
//! and EXPAND dereferencing

use crate::ast::{BooleanExpression, Expression, LetBinding, LetValue};
use crate::eval::expression::evaluate;
use crate::eval::predicate::test_predicate;
use crate::exec::context::ExecutionContext;
use crate::exec::error::ExecutionError;
use crate::exec::result::ResultRow;
use crate::exec::steps::{ExecutionStep, StepKind};
use crate::plan::planner;
use crate::types::Value;
use std::collections::VecDeque;
use std::sync::Arc;

/// Residual predicate applied after the access path
pub struct FilterStep {
    upstream: Box<dyn ExecutionStep>,
    predicate: BooleanExpression,
    ctx: Arc<ExecutionContext>,
}

impl FilterStep {
    pub fn new(
        upstream: Box<dyn ExecutionStep>,
        predicate: BooleanExpression,
        ctx: Arc<ExecutionContext>,
    ) -> Self {
        Self {
            upstream,
            predicate,
            ctx,
        }
    }
}

impl ExecutionStep for FilterStep {
    fn kind(&self) -> StepKind {
        StepKind::Filter
    }

    fn next(&mut self) -> Result<Option<ResultRow>, ExecutionError> {
        while let Some(row) = self.upstream.next()? {
            // unknown filters as false
            if test_predicate(&self.predicate, &row, &self.ctx)? == Some(true) {
                return Ok(Some(row));
            }
        }
        Ok(None)
    }

    fn close(&mut self) {
        self.upstream.close();
    }
}

/// Per-row LET bindings, evaluated left-to-right; subquery right-hand
/// sides re-execute per outer row with `$parent.$current` bound.
pub struct LetStep {
    upstream: Box<dyn ExecutionStep>,
    bindings: Vec<LetBinding>,
    ctx: Arc<ExecutionContext>,
}

impl LetStep {
    pub fn new(
        upstream: Box<dyn ExecutionStep>,
        bindings: Vec<LetBinding>,
        ctx: Arc<ExecutionContext>,
    ) -> Self {
        Self {
            upstream,
            bindings,
            ctx,
        }
    }
}

impl ExecutionStep for LetStep {
    fn kind(&self) -> StepKind {
        StepKind::Let
    }

    fn next(&mut self) -> Result<Option<ResultRow>, ExecutionError> {
        let mut row = match self.upstream.next()? {
            Some(row) => row,
            None => return Ok(None),
        };
        for binding in &self.bindings {
            let value = match &binding.value {
                LetValue::Expression(expression) => evaluate(expression, &row, &self.ctx)?,
                LetValue::Subquery(statement) => {
                    let child = self.ctx.child_scope(row.clone());
                    let rows = planner::execute_to_rows(statement, child)?;
                    Value::List(rows.iter().map(ResultRow::to_map).collect())
                }
            };
            row.set_variable(binding.name.clone(), value);
        }
        Ok(Some(row))
    }

    fn close(&mut self) {
        self.upstream.close();
    }
}

/// Fans one input row out into one row per element of a collection-valued
/// field, all other fields unchanged. Null or scalar fields pass the row
/// through untouched.
pub struct UnwindStep {
    upstream: Box<dyn ExecutionStep>,
    fields: Vec<String>,
    pending: VecDeque<ResultRow>,
}

impl UnwindStep {
    pub fn new(upstream: Box<dyn ExecutionStep>, fields: Vec<String>) -> Self {
        Self {
            upstream,
            fields,
            pending: VecDeque::new(),
        }
    }

    fn fan_out(&self, row: ResultRow) -> VecDeque<ResultRow> {
        let mut rows = VecDeque::new();
        rows.push_back(row);
        for field in &self.fields {
            let mut expanded = VecDeque::new();
            for row in rows {
                match row.get(field) {
                    Some(Value::List(items)) => {
                        for item in items.clone() {
                            let mut fanned = row.clone();
                            fanned.set(field.clone(), item);
                            expanded.push_back(fanned);
                        }
                    }
                    _ => expanded.push_back(row),
                }
            }
            rows = expanded;
        }
        rows
    }
}

impl ExecutionStep for UnwindStep {
    fn kind(&self) -> StepKind {
        StepKind::Unwind
    }

    fn next(&mut self) -> Result<Option<ResultRow>, ExecutionError> {
        loop {
            if let Some(row) = self.pending.pop_front() {
                return Ok(Some(row));
            }
            match self.upstream.next()? {
                Some(row) => self.pending = self.fan_out(row),
                None => return Ok(None),
            }
        }
    }

    fn close(&mut self) {
        self.pending.clear();
        self.upstream.close();
    }
}

/// Replaces each row with the dereferenced element(s) of a field value:
/// links load their record, maps become rows, collections fan out.
pub struct ExpandStep {
    upstream: Box<dyn ExecutionStep>,
    expression: Expression,
    ctx: Arc<ExecutionContext>,
    pending: VecDeque<ResultRow>,
}

impl ExpandStep {
    pub fn new(
        upstream: Box<dyn ExecutionStep>,
        expression: Expression,
        ctx: Arc<ExecutionContext>,
    ) -> Self {
        Self {
            upstream,
            expression,
            ctx,
            pending: VecDeque::new(),
        }
    }

    fn expand_value(&self, value: Value, out: &mut VecDeque<ResultRow>) {
        match value {
            Value::Link(rid) => {
                if let Some(record) = self.ctx.store().read(&rid) {
                    out.push_back(ResultRow::from_record(rid, &record));
                }
            }
            Value::Map(map) => out.push_back(ResultRow::from_map(&map)),
            Value::List(items) => {
                for item in items {
                    self.expand_value(item, out);
                }
            }
            // nulls and scalars have nothing to expand into
            _ => {}
        }
    }
}

impl ExecutionStep for ExpandStep {
    fn kind(&self) -> StepKind {
        StepKind::Expand
    }

    fn next(&mut self) -> Result<Option<ResultRow>, ExecutionError> {
        loop {
            if let Some(row) = self.pending.pop_front() {
                return Ok(Some(row));
            }
            match self.upstream.next()? {
                Some(row) => {
                    let value = evaluate(&self.expression, &row, &self.ctx)?;
                    let mut out = VecDeque::new();
                    self.expand_value(value, &mut out);
                    self.pending = out;
                }
                None => return Ok(None),
            }
        }
    }

    fn close(&mut self) {
        self.pending.clear();
        self.upstream.close();
    }
}
