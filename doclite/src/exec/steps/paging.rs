// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! SKIP and LIMIT steps
//!
//! SKIP discards leading rows without buffering them. LIMIT exhausts
//! itself after the Nth row and closes upstream immediately so early
//! termination releases cursors without waiting for the caller.

use crate::exec::error::ExecutionError;
use crate::exec::result::ResultRow;
use crate::exec::steps::{ExecutionStep, StepKind, StepState};

pub struct SkipStep {
    upstream: Box<dyn ExecutionStep>,
    remaining: usize,
}

impl SkipStep {
    pub fn new(upstream: Box<dyn ExecutionStep>, count: usize) -> Self {
        Self {
            upstream,
            remaining: count,
        }
    }
}

impl ExecutionStep for SkipStep {
    fn kind(&self) -> StepKind {
        StepKind::Skip
    }

    fn next(&mut self) -> Result<Option<ResultRow>, ExecutionError> {
        while self.remaining > 0 {
            self.remaining -= 1;
            if self.upstream.next()?.is_none() {
                return Ok(None);
            }
        }
        self.upstream.next()
    }

    fn close(&mut self) {
        self.upstream.close();
    }
}

pub struct LimitStep {
    upstream: Box<dyn ExecutionStep>,
    remaining: usize,
    state: StepState,
}

impl LimitStep {
    pub fn new(upstream: Box<dyn ExecutionStep>, count: usize) -> Self {
        Self {
            upstream,
            remaining: count,
            state: StepState::NotStarted,
        }
    }
}

impl ExecutionStep for LimitStep {
    fn kind(&self) -> StepKind {
        StepKind::Limit
    }

    fn next(&mut self) -> Result<Option<ResultRow>, ExecutionError> {
        if self.state == StepState::Exhausted {
            return Ok(None);
        }
        self.state = StepState::Active;
        if self.remaining == 0 {
            self.state = StepState::Exhausted;
            self.upstream.close();
            return Ok(None);
        }
        match self.upstream.next()? {
            Some(row) => {
                self.remaining -= 1;
                if self.remaining == 0 {
                    // signal upstream to stop producing further rows
                    self.upstream.close();
                }
                Ok(Some(row))
            }
            None => {
                self.state = StepState::Exhausted;
                Ok(None)
            }
        }
    }

    fn close(&mut self) {
        self.state = StepState::Exhausted;
        self.upstream.close();
    }
}
