// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Index-backed source steps
//!
//! [`IndexScanStep`] drives a bounded cursor and loads the referenced
//! records (also in `IndexValues` mode for `indexvalues:` targets, where
//! the whole index is walked in key order). [`IndexEntriesStep`] surfaces
//! raw `{key, rid}` entries for `index:` targets.

use crate::exec::error::ExecutionError;
use crate::exec::result::ResultRow;
use crate::exec::steps::{ExecutionStep, StepKind, StepState};
use crate::storage::{EntryCursor, IndexReader, KeyRange, RecordStore, ScanOrder};
use crate::types::Value;
use std::sync::Arc;

/// Bounded index cursor dereferencing entries into records
pub struct IndexScanStep {
    kind: StepKind,
    reader: Arc<dyn IndexReader>,
    store: Arc<dyn RecordStore>,
    range: KeyRange,
    order: ScanOrder,
    cursor: Option<EntryCursor>,
    state: StepState,
}

impl IndexScanStep {
    pub fn new(
        reader: Arc<dyn IndexReader>,
        store: Arc<dyn RecordStore>,
        range: KeyRange,
        order: ScanOrder,
    ) -> Self {
        Self {
            kind: StepKind::IndexScan,
            reader,
            store,
            range,
            order,
            cursor: None,
            state: StepState::NotStarted,
        }
    }

    /// Full walk of the index in key order (`indexvalues:` target)
    pub fn values(
        reader: Arc<dyn IndexReader>,
        store: Arc<dyn RecordStore>,
        order: ScanOrder,
    ) -> Self {
        let mut step = Self::new(reader, store, KeyRange::all(), order);
        step.kind = StepKind::IndexValues;
        step
    }
}

impl ExecutionStep for IndexScanStep {
    fn kind(&self) -> StepKind {
        self.kind
    }

    fn next(&mut self) -> Result<Option<ResultRow>, ExecutionError> {
        if self.state == StepState::Exhausted {
            return Ok(None);
        }
        if self.state == StepState::NotStarted {
            self.state = StepState::Active;
            self.cursor = Some(self.reader.scan(&self.range, self.order));
        }
        if let Some(cursor) = self.cursor.as_mut() {
            for entry in cursor.by_ref() {
                // a dangling entry no longer resolves to a record; skip it
                if let Some(record) = self.store.read(&entry.rid) {
                    return Ok(Some(ResultRow::from_record(entry.rid, &record)));
                }
            }
        }
        self.state = StepState::Exhausted;
        self.cursor = None;
        Ok(None)
    }

    fn close(&mut self) {
        self.cursor = None;
        self.state = StepState::Exhausted;
    }
}

/// Raw `{key, rid}` entry rows for `index:` targets
pub struct IndexEntriesStep {
    reader: Arc<dyn IndexReader>,
    range: KeyRange,
    order: ScanOrder,
    cursor: Option<EntryCursor>,
    state: StepState,
}

impl IndexEntriesStep {
    pub fn new(reader: Arc<dyn IndexReader>, range: KeyRange, order: ScanOrder) -> Self {
        Self {
            reader,
            range,
            order,
            cursor: None,
            state: StepState::NotStarted,
        }
    }
}

impl ExecutionStep for IndexEntriesStep {
    fn kind(&self) -> StepKind {
        StepKind::IndexEntries
    }

    fn next(&mut self) -> Result<Option<ResultRow>, ExecutionError> {
        if self.state == StepState::Exhausted {
            return Ok(None);
        }
        if self.state == StepState::NotStarted {
            self.state = StepState::Active;
            self.cursor = Some(self.reader.scan(&self.range, self.order));
        }
        if let Some(cursor) = self.cursor.as_mut() {
            if let Some(mut entry) = cursor.next() {
                let key = if entry.key.len() == 1 {
                    entry.key.pop().unwrap_or(Value::Null)
                } else {
                    Value::List(entry.key)
                };
                let mut row = ResultRow::new();
                row.set("key".to_string(), key);
                row.set("rid".to_string(), Value::Link(entry.rid));
                return Ok(Some(row));
            }
        }
        self.state = StepState::Exhausted;
        self.cursor = None;
        Ok(None)
    }

    fn close(&mut self) {
        self.cursor = None;
        self.state = StepState::Exhausted;
    }
}
