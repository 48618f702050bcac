// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Execution context: parameters, catalog handles and subquery scoping
//!
//! A context is created when a statement begins execution. Correlated
//! subqueries get a child context whose [`ParentScope`] links back to the
//! outer context and the outer row currently being evaluated
//! (`$parent.$current`); the chain is walked by reference, never through
//! mutable global state.

use crate::ast::Parameter;
use crate::exec::error::ExecutionError;
use crate::exec::result::ResultRow;
use crate::schema::SchemaSnapshot;
use crate::storage::{IndexReader, QuerySource, RecordStore};
use crate::types::Value;
use std::collections::HashMap;
use std::sync::Arc;

/// Scope link for correlated subqueries
pub struct ParentScope {
    pub context: Arc<ExecutionContext>,
    /// The outer row being evaluated when the subquery started
    pub row: ResultRow,
}

/// Per-execution state shared by the planner and every step
pub struct ExecutionContext {
    source: Arc<dyn QuerySource>,
    schema: Arc<SchemaSnapshot>,
    store: Arc<dyn RecordStore>,
    positional: Vec<Value>,
    named: HashMap<String, Value>,
    parent: Option<Arc<ParentScope>>,
}

impl ExecutionContext {
    /// Context over a snapshot of the given source, with no parameters
    pub fn new(source: Arc<dyn QuerySource>) -> Self {
        let schema = source.schema();
        let store = source.store();
        Self {
            source,
            schema,
            store,
            positional: Vec::new(),
            named: HashMap::new(),
            parent: None,
        }
    }

    pub fn with_positional_parameters(mut self, parameters: Vec<Value>) -> Self {
        self.positional = parameters;
        self
    }

    pub fn with_named_parameters(mut self, parameters: HashMap<String, Value>) -> Self {
        self.named = parameters;
        self
    }

    /// Child context for a correlated subquery over `row`
    pub fn child_scope(self: &Arc<Self>, row: ResultRow) -> Arc<ExecutionContext> {
        Arc::new(ExecutionContext {
            source: self.source.clone(),
            schema: self.schema.clone(),
            store: self.store.clone(),
            positional: self.positional.clone(),
            named: self.named.clone(),
            parent: Some(Arc::new(ParentScope {
                context: self.clone(),
                row,
            })),
        })
    }

    pub fn schema(&self) -> &Arc<SchemaSnapshot> {
        &self.schema
    }

    pub fn store(&self) -> &Arc<dyn RecordStore> {
        &self.store
    }

    pub fn parent(&self) -> Option<&Arc<ParentScope>> {
        self.parent.as_ref()
    }

    /// Resolve a statement parameter
    pub fn parameter(&self, parameter: &Parameter) -> Option<&Value> {
        match parameter {
            Parameter::Positional(index) => self.positional.get(*index),
            Parameter::Named(name) => self.named.get(name),
        }
    }

    /// Cursor factory for a declared index
    pub fn index_reader(&self, name: &str) -> Result<Arc<dyn IndexReader>, ExecutionError> {
        self.source
            .index_reader(name)
            .ok_or_else(|| ExecutionError::NotFound(format!("index {}", name)))
    }
}
