// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Execution error types
//!
//! Plan-time errors (`PlanningError`, `InvalidQuery`, `NotFound`) surface
//! from plan building, before any row is produced. Execution-time errors
//! abort the in-progress result sequence; rows already emitted remain
//! valid. Nothing here is retried.

use thiserror::Error;

/// Errors raised while planning or executing a SELECT statement
#[derive(Error, Debug)]
pub enum ExecutionError {
    #[error("Planning error: {0}")]
    PlanningError(String),

    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Expression evaluation error: {0}")]
    ExpressionError(String),

    #[error("Type error: {0}")]
    TypeError(String),

    #[error("Storage error: {0}")]
    StorageError(String),
}

impl ExecutionError {
    /// Whether the error was raised at plan-build time
    pub fn is_plan_time(&self) -> bool {
        matches!(
            self,
            ExecutionError::PlanningError(_)
                | ExecutionError::InvalidQuery(_)
                | ExecutionError::NotFound(_)
        )
    }
}
