// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Parallel union of structurally-independent sub-plans
//!
//! Branches are driven sequentially by the union step; "parallel" is the
//! structural independence of the sub-plans, not multi-threading. A record
//! surfaced by an earlier branch suppresses the same identity from later
//! branches; rows without a backing identity pass through undeduplicated.

use crate::exec::error::ExecutionError;
use crate::exec::result::ResultRow;
use crate::exec::steps::{ExecutionStep, StepKind, StepState};
use crate::storage::Rid;
use std::collections::HashSet;

pub struct ParallelUnionStep {
    branches: Vec<Box<dyn ExecutionStep>>,
    current: usize,
    seen: HashSet<Rid>,
    state: StepState,
}

impl ParallelUnionStep {
    pub fn new(branches: Vec<Box<dyn ExecutionStep>>) -> Self {
        Self {
            branches,
            current: 0,
            seen: HashSet::new(),
            state: StepState::NotStarted,
        }
    }
}

impl ExecutionStep for ParallelUnionStep {
    fn kind(&self) -> StepKind {
        StepKind::ParallelUnion
    }

    fn next(&mut self) -> Result<Option<ResultRow>, ExecutionError> {
        if self.state == StepState::Exhausted {
            return Ok(None);
        }
        self.state = StepState::Active;
        while self.current < self.branches.len() {
            match self.branches[self.current].next()? {
                Some(row) => {
                    if let Some(rid) = row.identity() {
                        if !self.seen.insert(rid) {
                            continue;
                        }
                    }
                    return Ok(Some(row));
                }
                None => {
                    self.branches[self.current].close();
                    self.current += 1;
                }
            }
        }
        self.state = StepState::Exhausted;
        Ok(None)
    }

    fn close(&mut self) {
        for branch in &mut self.branches {
            branch.close();
        }
        self.state = StepState::Exhausted;
    }
}
