// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Pull-iterator execution steps
//!
//! Every operator is an [`ExecutionStep`]: stateful, single-pass, owning
//! its upstream. `next()` after exhaustion keeps returning `Ok(None)`;
//! `close()` is transitive over the chain and idempotent. The step set is
//! closed — [`StepKind`] enumerates it — since plan shapes are an
//! observable contract, not an extension point.

pub mod aggregate;
pub mod index_scan;
pub mod order;
pub mod paging;
pub mod project;
pub mod source;
pub mod transform;
pub mod union;

use crate::exec::error::ExecutionError;
use crate::exec::result::ResultRow;
use serde::{Deserialize, Serialize};

/// Closed enumeration of step kinds, exposed through plan descriptions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StepKind {
    NoTarget,
    ClassScan,
    ClusterScan,
    FetchRids,
    SubqueryTarget,
    Metadata,
    IndexScan,
    IndexEntries,
    IndexValues,
    EmptyResult,
    ParallelUnion,
    Filter,
    Let,
    Unwind,
    Expand,
    GroupBy,
    Project,
    Distinct,
    OrderBy,
    Skip,
    Limit,
}

/// Lifecycle of a step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepState {
    NotStarted,
    Active,
    Exhausted,
}

/// A pull-iterator operator node
pub trait ExecutionStep {
    fn kind(&self) -> StepKind;

    /// Produce the next row; `Ok(None)` once exhausted, forever after
    fn next(&mut self) -> Result<Option<ResultRow>, ExecutionError>;

    /// Release cursors and close upstream steps; safe to call repeatedly
    fn close(&mut self);
}

/// Step planned for a statically-unsatisfiable access path: exhausted
/// from the start, nothing is ever scanned.
pub struct EmptyResultStep;

impl ExecutionStep for EmptyResultStep {
    fn kind(&self) -> StepKind {
        StepKind::EmptyResult
    }

    fn next(&mut self) -> Result<Option<ResultRow>, ExecutionError> {
        Ok(None)
    }

    fn close(&mut self) {}
}

/// Source for statements without a FROM target: one synthetic empty row
pub struct NoTargetStep {
    emitted: bool,
}

impl NoTargetStep {
    pub fn new() -> Self {
        Self { emitted: false }
    }
}

impl Default for NoTargetStep {
    fn default() -> Self {
        Self::new()
    }
}

impl ExecutionStep for NoTargetStep {
    fn kind(&self) -> StepKind {
        StepKind::NoTarget
    }

    fn next(&mut self) -> Result<Option<ResultRow>, ExecutionError> {
        if self.emitted {
            return Ok(None);
        }
        self.emitted = true;
        Ok(Some(ResultRow::new()))
    }

    fn close(&mut self) {
        self.emitted = true;
    }
}
