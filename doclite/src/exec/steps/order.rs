// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! ORDER BY with optional top-K bounding
//!
//! Materializes rows with pre-computed sort keys and drains after
//! upstream exhaustion. When a LIMIT is pushed down, the buffer is
//! periodically re-sorted and truncated so at most `2 * k` rows are held.

use crate::ast::{OrderItem, OrderKey, SortDirection};
use crate::eval::expression::evaluate;
use crate::exec::context::ExecutionContext;
use crate::exec::error::ExecutionError;
use crate::exec::result::ResultRow;
use crate::exec::steps::{ExecutionStep, StepKind, StepState};
use crate::types::coercion::total_compare;
use crate::types::Value;
use std::cmp::Ordering;
use std::sync::Arc;

pub struct OrderByStep {
    upstream: Box<dyn ExecutionStep>,
    items: Vec<OrderItem>,
    ctx: Arc<ExecutionContext>,
    /// Top-K bound from a pushed-down SKIP+LIMIT
    keep: Option<usize>,
    buffer: Vec<(Vec<Value>, ResultRow)>,
    drained: std::vec::IntoIter<ResultRow>,
    state: StepState,
}

impl OrderByStep {
    pub fn new(
        upstream: Box<dyn ExecutionStep>,
        items: Vec<OrderItem>,
        ctx: Arc<ExecutionContext>,
    ) -> Self {
        Self {
            upstream,
            items,
            ctx,
            keep: None,
            buffer: Vec::new(),
            drained: Vec::new().into_iter(),
            state: StepState::NotStarted,
        }
    }

    pub fn with_limit(mut self, keep: usize) -> Self {
        self.keep = Some(keep);
        self
    }

    /// Whether the sort buffer is bounded (observable for testing)
    pub fn is_bounded(&self) -> bool {
        self.keep.is_some()
    }

    fn sort_key(&self, row: &ResultRow) -> Result<Vec<Value>, ExecutionError> {
        let mut key = Vec::with_capacity(self.items.len());
        for item in &self.items {
            let value = match &item.key {
                OrderKey::Expression(expression) => evaluate(expression, row, &self.ctx)?,
                OrderKey::Rid => row.identity().map(Value::Link).unwrap_or(Value::Null),
            };
            key.push(value);
        }
        Ok(key)
    }

    fn compare_keys(items: &[OrderItem], left: &[Value], right: &[Value]) -> Ordering {
        for (i, item) in items.iter().enumerate() {
            let ordering = total_compare(&left[i], &right[i]);
            let ordering = match item.direction {
                SortDirection::Ascending => ordering,
                SortDirection::Descending => ordering.reverse(),
            };
            if ordering != Ordering::Equal {
                return ordering;
            }
        }
        Ordering::Equal
    }

    fn sort_buffer(&mut self) {
        let items = std::mem::take(&mut self.items);
        self.buffer
            .sort_by(|a, b| Self::compare_keys(&items, &a.0, &b.0));
        self.items = items;
    }

    fn materialize(&mut self) -> Result<(), ExecutionError> {
        while let Some(row) = self.upstream.next()? {
            let key = self.sort_key(&row)?;
            self.buffer.push((key, row));
            if let Some(keep) = self.keep {
                let bound = (keep.max(32)) * 2;
                if self.buffer.len() >= bound {
                    self.sort_buffer();
                    self.buffer.truncate(keep);
                }
            }
        }
        self.upstream.close();
        self.sort_buffer();
        if let Some(keep) = self.keep {
            self.buffer.truncate(keep);
        }
        let rows: Vec<ResultRow> = std::mem::take(&mut self.buffer)
            .into_iter()
            .map(|(_, row)| row)
            .collect();
        self.drained = rows.into_iter();
        Ok(())
    }
}

impl ExecutionStep for OrderByStep {
    fn kind(&self) -> StepKind {
        StepKind::OrderBy
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
        self.buffer.clear();
        self.drained = Vec::new().into_iter();
        self.state = StepState::Exhausted;
        self.upstream.close();
    }
}
