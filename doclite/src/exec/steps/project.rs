// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Projection and DISTINCT steps

use crate::ast::{Expression, NestedProjection};
use crate::eval::expression::evaluate;
use crate::exec::context::ExecutionContext;
use crate::exec::error::ExecutionError;
use crate::exec::result::ResultRow;
use crate::exec::steps::{ExecutionStep, StepKind};
use crate::types::Value;
use std::collections::HashSet;
use std::sync::Arc;

/// One output column of the projection step
#[derive(Debug, Clone)]
pub struct ProjectionItem {
    pub expression: Expression,
    pub name: String,
    pub nested: Option<NestedProjection>,
}

/// Shapes each row into the projected columns. Projection-only rows carry
/// no backing element.
pub struct ProjectStep {
    upstream: Box<dyn ExecutionStep>,
    items: Vec<ProjectionItem>,
    ctx: Arc<ExecutionContext>,
}

impl ProjectStep {
    pub fn new(
        upstream: Box<dyn ExecutionStep>,
        items: Vec<ProjectionItem>,
        ctx: Arc<ExecutionContext>,
    ) -> Self {
        Self {
            upstream,
            items,
            ctx,
        }
    }

    fn shape(&self, value: Value, nested: &NestedProjection) -> Value {
        match value {
            Value::Link(rid) => match self.ctx.store().read(&rid) {
                Some(record) => self.shape(Value::Map(record.fields), nested),
                None => Value::Null,
            },
            Value::Map(mut map) => {
                if let NestedProjection::Exclude(excluded) = nested {
                    for name in excluded {
                        map.remove(name);
                    }
                }
                Value::Map(map)
            }
            Value::List(items) => Value::List(
                items
                    .into_iter()
                    .map(|item| self.shape(item, nested))
                    .collect(),
            ),
            other => other,
        }
    }
}

impl ExecutionStep for ProjectStep {
    fn kind(&self) -> StepKind {
        StepKind::Project
    }

    fn next(&mut self) -> Result<Option<ResultRow>, ExecutionError> {
        let row = match self.upstream.next()? {
            Some(row) => row,
            None => return Ok(None),
        };
        let mut projected = ResultRow::new();
        for item in &self.items {
            let mut value = evaluate(&item.expression, &row, &self.ctx)?;
            if let Some(nested) = &item.nested {
                value = self.shape(value, nested);
            }
            projected.set(item.name.clone(), value);
        }
        Ok(Some(projected))
    }

    fn close(&mut self) {
        self.upstream.close();
    }
}

/// Deduplication by full projected-row equality. Keys accumulate
/// incrementally; the first occurrence streams through immediately.
pub struct DistinctStep {
    upstream: Box<dyn ExecutionStep>,
    seen: HashSet<ResultRow>,
}

impl DistinctStep {
    pub fn new(upstream: Box<dyn ExecutionStep>) -> Self {
        Self {
            upstream,
            seen: HashSet::new(),
        }
    }
}

impl ExecutionStep for DistinctStep {
    fn kind(&self) -> StepKind {
        StepKind::Distinct
    }

    fn next(&mut self) -> Result<Option<ResultRow>, ExecutionError> {
        while let Some(row) = self.upstream.next()? {
            if self.seen.insert(row.clone()) {
                return Ok(Some(row));
            }
        }
        Ok(None)
    }

    fn close(&mut self) {
        self.seen.clear();
        self.upstream.close();
    }
}
