// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! GROUP BY / aggregate accumulation
//!
//! Materializes incrementally into per-group accumulator state keyed by
//! the GROUP BY expressions' per-row values, draining only once upstream
//! is exhausted. With no GROUP BY the whole input is one implicit group,
//! which exists even over empty input (`count(*)` returns one row).
//!
//! Output rows are the group's first input row plus one pipeline variable
//! `$aggN` per aggregate call; the downstream projection step evaluates
//! rewritten projections against them.

use crate::ast::Expression;
use crate::eval::aggregates::{Accumulator, AggregateFunction};
use crate::eval::expression::evaluate;
use crate::exec::context::ExecutionContext;
use crate::exec::error::ExecutionError;
use crate::exec::result::ResultRow;
use crate::exec::steps::{ExecutionStep, StepKind, StepState};
use crate::types::Value;
use std::collections::HashMap;
use std::sync::Arc;

/// One aggregate call extracted from the projection list
#[derive(Debug, Clone)]
pub struct AggregateSpec {
    pub function: AggregateFunction,
    /// `None` for `count(*)`
    pub argument: Option<Expression>,
}

struct GroupState {
    representative: Option<ResultRow>,
    accumulators: Vec<Accumulator>,
}

pub struct GroupByStep {
    upstream: Box<dyn ExecutionStep>,
    group_by: Vec<Expression>,
    aggregates: Vec<AggregateSpec>,
    ctx: Arc<ExecutionContext>,
    state: StepState,
    drained: std::vec::IntoIter<ResultRow>,
}

impl GroupByStep {
    pub fn new(
        upstream: Box<dyn ExecutionStep>,
        group_by: Vec<Expression>,
        aggregates: Vec<AggregateSpec>,
        ctx: Arc<ExecutionContext>,
    ) -> Self {
        Self {
            upstream,
            group_by,
            aggregates,
            ctx,
            state: StepState::NotStarted,
            drained: Vec::new().into_iter(),
        }
    }

    fn new_accumulators(&self) -> Vec<Accumulator> {
        self.aggregates
            .iter()
            .map(|spec| Accumulator::new(spec.function))
            .collect()
    }

    fn materialize(&mut self) -> Result<(), ExecutionError> {
        let mut order: Vec<Vec<Value>> = Vec::new();
        let mut groups: HashMap<Vec<Value>, GroupState> = HashMap::new();

        if self.group_by.is_empty() {
            // implicit single group, present even with no input rows; it
            // adopts the first input row as its representative
            order.push(Vec::new());
            groups.insert(
                Vec::new(),
                GroupState {
                    representative: None,
                    accumulators: self.new_accumulators(),
                },
            );
        }

        while let Some(row) = self.upstream.next()? {
            let mut key = Vec::with_capacity(self.group_by.len());
            for expression in &self.group_by {
                key.push(evaluate(expression, &row, &self.ctx)?);
            }
            if !groups.contains_key(&key) {
                order.push(key.clone());
                groups.insert(
                    key.clone(),
                    GroupState {
                        representative: Some(row.clone()),
                        accumulators: self.new_accumulators(),
                    },
                );
            }
            let mut accumulated = Vec::with_capacity(self.aggregates.len());
            for spec in &self.aggregates {
                accumulated.push(match &spec.argument {
                    Some(expression) => Some(evaluate(expression, &row, &self.ctx)?),
                    None => None,
                });
            }
            if let Some(group) = groups.get_mut(&key) {
                if group.representative.is_none() {
                    group.representative = Some(row.clone());
                }
                for (value, accumulator) in
                    accumulated.into_iter().zip(group.accumulators.iter_mut())
                {
                    match value {
                        Some(value) => accumulator.add(&value),
                        None => accumulator.add_row(),
                    }
                }
            }
        }
        self.upstream.close();

        let mut output = Vec::with_capacity(order.len());
        for key in order {
            if let Some(group) = groups.remove(&key) {
                let mut row = group.representative.unwrap_or_default();
                for (i, accumulator) in group.accumulators.into_iter().enumerate() {
                    row.set_variable(format!("$agg{}", i), accumulator.finish());
                }
                output.push(row);
            }
        }
        self.drained = output.into_iter();
        Ok(())
    }
}

impl ExecutionStep for GroupByStep {
    fn kind(&self) -> StepKind {
        StepKind::GroupBy
    }

    fn next(&mut self) -> Result<Option<ResultRow>, ExecutionError> {
        if self.state == StepState::NotStarted {
            self.state = StepState::Active;
            self.materialize()?;
        }
        match self.drained.next() {
            Some(row) => Ok(Some(row)),
            None => {
                self.state = StepState::Exhausted;
                Ok(None)
            }
        }
    }

    fn close(&mut self) {
        self.drained = Vec::new().into_iter();
        self.state = StepState::Exhausted;
        self.upstream.close();
    }
}
