// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Result rows and the pull-style result sequence

use crate::exec::error::ExecutionError;
use crate::plan::{PlanDescription, SelectExecutionPlan};
use crate::storage::{Record, Rid};
use crate::types::Value;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::hash::{Hash, Hasher};

/// Backing storage element of a row produced by `SELECT *` / `expand(...)`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElementRef {
    pub rid: Rid,
    pub class: Option<String>,
}

/// One result row: an ordered projection-name → value mapping, optionally
/// backed by a stored element. Immutable once emitted downstream.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResultRow {
    order: Vec<String>,
    values: HashMap<String, Value>,
    element: Option<ElementRef>,
    /// LET bindings and other pipeline-internal values; not part of the
    /// projected row
    #[serde(skip)]
    variables: HashMap<String, Value>,
}

impl ResultRow {
    pub fn new() -> Self {
        Self::default()
    }

    /// Row backed by a stored record
    pub fn from_record(rid: Rid, record: &Record) -> Self {
        let mut row = Self::new();
        for (name, value) in &record.fields {
            row.set(name.clone(), value.clone());
        }
        row.element = Some(ElementRef {
            rid,
            class: record.class.clone(),
        });
        row
    }

    /// Projection-only row from ordered name/value pairs
    pub fn from_pairs(pairs: Vec<(String, Value)>) -> Self {
        let mut row = Self::new();
        for (name, value) in pairs {
            row.set(name, value);
        }
        row
    }

    /// Row from an embedded document value
    pub fn from_map(map: &BTreeMap<String, Value>) -> Self {
        let mut row = Self::new();
        for (name, value) in map {
            row.set(name.clone(), value.clone());
        }
        row
    }

    /// Set a field, preserving first-insertion order
    pub fn set(&mut self, name: String, value: Value) {
        if !self.values.contains_key(&name) {
            self.order.push(name.clone());
        }
        self.values.insert(name, value);
    }

    /// Field lookup without the `@`-prefixed pseudo-properties
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    /// Property lookup as the caller sees it: fields plus `@rid`/`@class`
    /// for element-backed rows; missing properties are null.
    pub fn property(&self, name: &str) -> Value {
        match name {
            "@rid" => self
                .element
                .as_ref()
                .map(|element| Value::Link(element.rid))
                .unwrap_or(Value::Null),
            "@class" => self
                .element
                .as_ref()
                .and_then(|element| element.class.clone())
                .map(Value::String)
                .unwrap_or(Value::Null),
            _ => self.values.get(name).cloned().unwrap_or(Value::Null),
        }
    }

    /// Projection names in output order
    pub fn field_names(&self) -> &[String] {
        &self.order
    }

    pub fn element(&self) -> Option<&ElementRef> {
        self.element.as_ref()
    }

    /// Identity of the backing element, when there is one
    pub fn identity(&self) -> Option<Rid> {
        self.element.as_ref().map(|element| element.rid)
    }

    pub fn set_variable(&mut self, name: String, value: Value) {
        self.variables.insert(name, value);
    }

    pub fn variable(&self, name: &str) -> Option<&Value> {
        self.variables.get(name)
    }

    /// The row's fields as an embedded document value
    pub fn to_map(&self) -> Value {
        let mut map = BTreeMap::new();
        for name in &self.order {
            if let Some(value) = self.values.get(name) {
                map.insert(name.clone(), value.clone());
            }
        }
        Value::Map(map)
    }
}

impl PartialEq for ResultRow {
    fn eq(&self, other: &Self) -> bool {
        if self.order != other.order {
            return false;
        }
        self.order
            .iter()
            .all(|name| self.values.get(name) == other.values.get(name))
    }
}

impl Eq for ResultRow {}

impl Hash for ResultRow {
    fn hash<H: Hasher>(&self, state: &mut H) {
        for name in &self.order {
            name.hash(state);
            if let Some(value) = self.values.get(name) {
                value.hash(state);
            }
        }
    }
}

/// Lazy, single-pass sequence of result rows.
///
/// The caller drives iteration (`has_next`/`next_row` or the `Iterator`
/// impl). Closing is transitive over the step chain, idempotent, and
/// happens automatically on drop. An execution error marks the sequence
/// finished; rows already delivered remain valid.
pub struct ResultSet {
    plan: SelectExecutionPlan,
    lookahead: Option<ResultRow>,
    finished: bool,
    closed: bool,
}

impl ResultSet {
    pub(crate) fn new(plan: SelectExecutionPlan) -> Self {
        Self {
            plan,
            lookahead: None,
            finished: false,
            closed: false,
        }
    }

    /// Whether another row is available; may trigger upstream production
    pub fn has_next(&mut self) -> Result<bool, ExecutionError> {
        if self.lookahead.is_some() {
            return Ok(true);
        }
        if self.finished {
            return Ok(false);
        }
        match self.plan.root.next() {
            Ok(Some(row)) => {
                self.lookahead = Some(row);
                Ok(true)
            }
            Ok(None) => {
                self.finished = true;
                self.close();
                Ok(false)
            }
            Err(error) => {
                self.finished = true;
                self.close();
                Err(error)
            }
        }
    }

    /// Produce the next row, or `None` once exhausted
    pub fn next_row(&mut self) -> Result<Option<ResultRow>, ExecutionError> {
        if !self.has_next()? {
            return Ok(None);
        }
        Ok(self.lookahead.take())
    }

    /// Close every still-open step and release cursors. Safe to call
    /// multiple times and after natural exhaustion.
    pub fn close(&mut self) {
        if !self.closed {
            self.closed = true;
            self.plan.root.close();
        }
        self.lookahead = None;
        self.finished = true;
    }

    /// The plan descriptor for introspection and testing
    pub fn execution_plan(&self) -> &PlanDescription {
        &self.plan.description
    }
}

impl Iterator for ResultSet {
    type Item = Result<ResultRow, ExecutionError>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.next_row() {
            Ok(Some(row)) => Some(Ok(row)),
            Ok(None) => None,
            Err(error) => Some(Err(error)),
        }
    }
}

impl Drop for ResultSet {
    fn drop(&mut self) {
        self.close();
    }
}
