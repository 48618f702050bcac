// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Query executor entry point
//!
//! [`QueryExecutor`] is the crate's front door: it snapshots the source,
//! plans the statement and hands back a lazy [`ResultSet`]. Plan-time
//! errors surface here, before the first row.

use crate::ast::SelectStatement;
use crate::exec::context::ExecutionContext;
use crate::exec::error::ExecutionError;
use crate::exec::result::ResultSet;
use crate::plan::SelectPlanner;
use crate::storage::QuerySource;
use crate::types::Value;
use std::collections::HashMap;
use std::sync::Arc;

pub struct QueryExecutor {
    source: Arc<dyn QuerySource>,
}

impl QueryExecutor {
    pub fn new(source: Arc<dyn QuerySource>) -> Self {
        Self { source }
    }

    /// Plan and execute a statement with no parameters
    pub fn query(&self, statement: &SelectStatement) -> Result<ResultSet, ExecutionError> {
        self.execute(statement, Vec::new(), HashMap::new())
    }

    /// Plan and execute with positional parameters (`?0`, `?1`, ...)
    pub fn query_with_params(
        &self,
        statement: &SelectStatement,
        parameters: Vec<Value>,
    ) -> Result<ResultSet, ExecutionError> {
        self.execute(statement, parameters, HashMap::new())
    }

    /// Plan and execute with named parameters (`:name`)
    pub fn query_with_named_params(
        &self,
        statement: &SelectStatement,
        parameters: HashMap<String, Value>,
    ) -> Result<ResultSet, ExecutionError> {
        self.execute(statement, Vec::new(), parameters)
    }

    fn execute(
        &self,
        statement: &SelectStatement,
        positional: Vec<Value>,
        named: HashMap<String, Value>,
    ) -> Result<ResultSet, ExecutionError> {
        let ctx = Arc::new(
            ExecutionContext::new(self.source.clone())
                .with_positional_parameters(positional)
                .with_named_parameters(named),
        );
        let plan = SelectPlanner::new(ctx).plan(statement)?;
        log::debug!(
            "planned {} with steps {:?}",
            statement,
            plan.description.step_kinds()
        );
        Ok(ResultSet::new(plan))
    }
}
