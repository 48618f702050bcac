// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Source steps: cluster/class scans, RID fetches, subquery targets and
//! metadata pseudo-collections

use crate::exec::error::ExecutionError;
use crate::exec::result::ResultRow;
use crate::exec::steps::{ExecutionStep, StepKind, StepState};
use crate::schema::SchemaSnapshot;
use crate::storage::{ClusterId, RecordCursor, RecordStore, Rid, ScanOrder};
use crate::types::Value;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Sequential scan over a list of clusters in RID order. Serves both
/// polymorphic class scans and explicit `cluster:` targets; the planner
/// passes the cluster sequence already ordered for the requested
/// direction.
pub struct ScanStep {
    kind: StepKind,
    store: Arc<dyn RecordStore>,
    clusters: Vec<ClusterId>,
    order: ScanOrder,
    next_cluster: usize,
    cursor: Option<RecordCursor>,
    state: StepState,
}

impl ScanStep {
    pub fn class_scan(
        store: Arc<dyn RecordStore>,
        clusters: Vec<ClusterId>,
        order: ScanOrder,
    ) -> Self {
        Self::new(StepKind::ClassScan, store, clusters, order)
    }

    pub fn cluster_scan(
        store: Arc<dyn RecordStore>,
        clusters: Vec<ClusterId>,
        order: ScanOrder,
    ) -> Self {
        Self::new(StepKind::ClusterScan, store, clusters, order)
    }

    fn new(
        kind: StepKind,
        store: Arc<dyn RecordStore>,
        mut clusters: Vec<ClusterId>,
        order: ScanOrder,
    ) -> Self {
        clusters.sort_unstable();
        if order == ScanOrder::Descending {
            clusters.reverse();
        }
        Self {
            kind,
            store,
            clusters,
            order,
            next_cluster: 0,
            cursor: None,
            state: StepState::NotStarted,
        }
    }
}

impl ExecutionStep for ScanStep {
    fn kind(&self) -> StepKind {
        self.kind
    }

    fn next(&mut self) -> Result<Option<ResultRow>, ExecutionError> {
        if self.state == StepState::Exhausted {
            return Ok(None);
        }
        self.state = StepState::Active;
        loop {
            if self.cursor.is_none() {
                if self.next_cluster >= self.clusters.len() {
                    self.state = StepState::Exhausted;
                    self.cursor = None;
                    return Ok(None);
                }
                let cluster = self.clusters[self.next_cluster];
                self.next_cluster += 1;
                self.cursor = Some(self.store.scan_cluster(cluster, self.order));
            }
            if let Some(cursor) = self.cursor.as_mut() {
                match cursor.next() {
                    Some((rid, record)) => {
                        return Ok(Some(ResultRow::from_record(rid, &record)))
                    }
                    None => {
                        self.cursor = None;
                    }
                }
            }
        }
    }

    fn close(&mut self) {
        self.cursor = None;
        self.state = StepState::Exhausted;
    }
}

/// Point fetches over an explicit RID list; non-existent RIDs are skipped
pub struct FetchRidsStep {
    store: Arc<dyn RecordStore>,
    rids: Vec<Rid>,
    position: usize,
}

impl FetchRidsStep {
    pub fn new(store: Arc<dyn RecordStore>, rids: Vec<Rid>) -> Self {
        Self {
            store,
            rids,
            position: 0,
        }
    }
}

impl ExecutionStep for FetchRidsStep {
    fn kind(&self) -> StepKind {
        StepKind::FetchRids
    }

    fn next(&mut self) -> Result<Option<ResultRow>, ExecutionError> {
        while self.position < self.rids.len() {
            let rid = self.rids[self.position];
            self.position += 1;
            if let Some(record) = self.store.read(&rid) {
                return Ok(Some(ResultRow::from_record(rid, &record)));
            }
        }
        Ok(None)
    }

    fn close(&mut self) {
        self.position = self.rids.len();
    }
}

/// Adapter making a nested statement's plan the source of the outer one
pub struct SubqueryTargetStep {
    inner: Box<dyn ExecutionStep>,
}

impl SubqueryTargetStep {
    pub fn new(inner: Box<dyn ExecutionStep>) -> Self {
        Self { inner }
    }
}

impl ExecutionStep for SubqueryTargetStep {
    fn kind(&self) -> StepKind {
        StepKind::SubqueryTarget
    }

    fn next(&mut self) -> Result<Option<ResultRow>, ExecutionError> {
        self.inner.next()
    }

    fn close(&mut self) {
        self.inner.close();
    }
}

/// Which metadata pseudo-collection to surface
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetadataKind {
    Schema,
    IndexManager,
}

/// One-row snapshot of the schema or index catalog
pub struct MetadataStep {
    row: Option<ResultRow>,
}

impl MetadataStep {
    pub fn new(kind: MetadataKind, schema: &SchemaSnapshot) -> Self {
        let mut row = ResultRow::new();
        match kind {
            MetadataKind::Schema => {
                let mut classes: Vec<Value> = Vec::new();
                let mut names: Vec<&String> = schema.classes.keys().collect();
                names.sort();
                for name in names {
                    if let Some(descriptor) = schema.classes.get(name) {
                        let mut map = BTreeMap::new();
                        map.insert("name".to_string(), Value::from(descriptor.name.clone()));
                        map.insert(
                            "clusters".to_string(),
                            Value::List(
                                descriptor
                                    .clusters
                                    .iter()
                                    .map(|cluster| Value::Integer(*cluster as i64))
                                    .collect(),
                            ),
                        );
                        map.insert(
                            "superclasses".to_string(),
                            Value::List(
                                descriptor
                                    .superclasses
                                    .iter()
                                    .map(|s| Value::from(s.clone()))
                                    .collect(),
                            ),
                        );
                        map.insert(
                            "subclasses".to_string(),
                            Value::List(
                                descriptor
                                    .subclasses
                                    .iter()
                                    .map(|s| Value::from(s.clone()))
                                    .collect(),
                            ),
                        );
                        classes.push(Value::Map(map));
                    }
                }
                row.set("classes".to_string(), Value::List(classes));
            }
            MetadataKind::IndexManager => {
                let mut indexes: Vec<Value> = Vec::new();
                let mut names: Vec<&String> = schema.indexes.keys().collect();
                names.sort();
                for name in names {
                    if let Some(descriptor) = schema.indexes.get(name) {
                        let mut map = BTreeMap::new();
                        map.insert("name".to_string(), Value::from(descriptor.name.clone()));
                        map.insert("class".to_string(), Value::from(descriptor.class.clone()));
                        map.insert(
                            "properties".to_string(),
                            Value::List(
                                descriptor
                                    .properties
                                    .iter()
                                    .map(|p| Value::from(p.clone()))
                                    .collect(),
                            ),
                        );
                        map.insert("unique".to_string(), Value::Boolean(descriptor.unique));
                        indexes.push(Value::Map(map));
                    }
                }
                row.set("indexes".to_string(), Value::List(indexes));
            }
        }
        Self { row: Some(row) }
    }
}

impl ExecutionStep for MetadataStep {
    fn kind(&self) -> StepKind {
        StepKind::Metadata
    }

    fn next(&mut self) -> Result<Option<ResultRow>, ExecutionError> {
        Ok(self.row.take())
    }

    fn close(&mut self) {
        self.row = None;
    }
}
