// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! In-memory reference backend
//!
//! [`MemoryDatabase`] implements the storage and catalog seams the
//! executor consumes: clusters as position-ordered maps, secondary
//! indexes as ordered key maps, and a schema snapshot builder. Hash
//! indexes share the ordered representation; [`IndexKind::Hash`] only
//! constrains planning.

use crate::schema::{ClassDescriptor, IndexDescriptor, IndexKind, NullPolicy, SchemaSnapshot};
use crate::storage::{
    ClusterId, EntryCursor, IndexEntry, IndexKey, IndexReader, KeyRange, QuerySource, Record,
    RecordCursor, RecordStore, Rid, ScanOrder,
};
use crate::types::Value;
use parking_lot::RwLock;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

#[derive(Debug, Default)]
struct Cluster {
    records: BTreeMap<i64, Record>,
    next_position: i64,
}

#[derive(Debug)]
struct IndexState {
    descriptor: IndexDescriptor,
    entries: BTreeMap<IndexKey, Vec<Rid>>,
}

#[derive(Debug, Default)]
struct State {
    next_cluster: ClusterId,
    clusters: BTreeMap<ClusterId, Cluster>,
    cluster_names: HashMap<String, ClusterId>,
    classes: HashMap<String, ClassDescriptor>,
    indexes: HashMap<String, IndexState>,
}

/// In-memory document/graph store with a class hierarchy and secondary
/// indexes. Cheap to clone; clones share the underlying state.
#[derive(Clone, Default)]
pub struct MemoryDatabase {
    state: Arc<RwLock<State>>,
}

impl MemoryDatabase {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a class with one cluster named after it (lowercased)
    pub fn create_class(&self, name: &str) -> ClusterId {
        self.create_class_with_superclasses(name, &[])
    }

    /// Create a class under one or more superclasses
    pub fn create_class_with_superclasses(&self, name: &str, superclasses: &[&str]) -> ClusterId {
        let mut state = self.state.write();
        let cluster = state.next_cluster;
        state.next_cluster += 1;
        state.clusters.insert(cluster, Cluster::default());
        state.cluster_names.insert(name.to_lowercase(), cluster);
        state.classes.insert(
            name.to_string(),
            ClassDescriptor {
                name: name.to_string(),
                clusters: vec![cluster],
                superclasses: superclasses.iter().map(|s| s.to_string()).collect(),
                subclasses: Vec::new(),
                indexes: Vec::new(),
            },
        );
        for superclass in superclasses {
            if let Some(parent) = state.classes.get_mut(*superclass) {
                parent.subclasses.push(name.to_string());
            }
        }
        cluster
    }

    /// Attach an additional cluster to an existing class
    pub fn add_cluster(&self, class: &str, cluster_name: &str) -> ClusterId {
        let mut state = self.state.write();
        let cluster = state.next_cluster;
        state.next_cluster += 1;
        state.clusters.insert(cluster, Cluster::default());
        state
            .cluster_names
            .insert(cluster_name.to_lowercase(), cluster);
        if let Some(descriptor) = state.classes.get_mut(class) {
            descriptor.clusters.push(cluster);
        }
        cluster
    }

    /// Declare an index over class properties; existing records are
    /// back-filled.
    pub fn create_index(
        &self,
        name: &str,
        class: &str,
        properties: &[&str],
        kind: IndexKind,
        unique: bool,
        null_policy: NullPolicy,
    ) {
        let descriptor = IndexDescriptor {
            name: name.to_string(),
            class: class.to_string(),
            properties: properties.iter().map(|p| p.to_string()).collect(),
            unique,
            kind,
            null_policy,
        };
        let mut state = self.state.write();
        if let Some(class_descriptor) = state.classes.get_mut(class) {
            class_descriptor.indexes.push(name.to_string());
        }
        let mut index = IndexState {
            descriptor,
            entries: BTreeMap::new(),
        };
        let clusters = state
            .classes
            .get(class)
            .map(|c| c.clusters.clone())
            .unwrap_or_default();
        for cluster in clusters {
            if let Some(cluster_state) = state.clusters.get(&cluster) {
                for (position, record) in &cluster_state.records {
                    let rid = Rid::new(cluster, *position);
                    index_record(&mut index, &rid, record);
                }
            }
        }
        state.indexes.insert(name.to_string(), index);
    }

    /// Insert a record into the first cluster of its class
    pub fn insert(&self, class: &str, fields: Vec<(&str, Value)>) -> Rid {
        let cluster = {
            let state = self.state.read();
            state
                .classes
                .get(class)
                .and_then(|descriptor| descriptor.clusters.first().copied())
                .unwrap_or_default()
        };
        self.insert_into_cluster(Some(class), cluster, fields)
    }

    /// Insert a record into a specific cluster
    pub fn insert_into_cluster(
        &self,
        class: Option<&str>,
        cluster: ClusterId,
        fields: Vec<(&str, Value)>,
    ) -> Rid {
        let mut record = Record::new(class.map(String::from));
        for (name, value) in fields {
            record.fields.insert(name.to_string(), value);
        }
        let mut state = self.state.write();
        let position = {
            let cluster_state = state.clusters.entry(cluster).or_default();
            let position = cluster_state.next_position;
            cluster_state.next_position += 1;
            cluster_state.records.insert(position, record.clone());
            position
        };
        let rid = Rid::new(cluster, position);
        if let Some(class) = &record.class {
            let index_names: Vec<String> = state
                .classes
                .get(class.as_str())
                .map(|descriptor| descriptor.indexes.clone())
                .unwrap_or_default();
            for index_name in index_names {
                if let Some(index) = state.indexes.get_mut(&index_name) {
                    index_record(index, &rid, &record);
                }
            }
        }
        rid
    }
}

fn index_record(index: &mut IndexState, rid: &Rid, record: &Record) {
    let key: Vec<Value> = index
        .descriptor
        .properties
        .iter()
        .map(|property| record.get(property).cloned().unwrap_or(Value::Null))
        .collect();
    if index.descriptor.null_policy == NullPolicy::Ignore && key.iter().any(Value::is_null) {
        return;
    }
    index.entries.entry(IndexKey(key)).or_default().push(*rid);
}

impl RecordStore for MemoryDatabase {
    fn scan_cluster(&self, cluster: ClusterId, order: ScanOrder) -> RecordCursor {
        let state = self.state.read();
        let mut rows: Vec<(Rid, Record)> = state
            .clusters
            .get(&cluster)
            .map(|cluster_state| {
                cluster_state
                    .records
                    .iter()
                    .map(|(position, record)| (Rid::new(cluster, *position), record.clone()))
                    .collect()
            })
            .unwrap_or_default();
        if order == ScanOrder::Descending {
            rows.reverse();
        }
        Box::new(rows.into_iter())
    }

    fn read(&self, rid: &Rid) -> Option<Record> {
        let state = self.state.read();
        state
            .clusters
            .get(&rid.cluster)
            .and_then(|cluster_state| cluster_state.records.get(&rid.position))
            .cloned()
    }

    fn cluster_record_count(&self, cluster: ClusterId) -> u64 {
        let state = self.state.read();
        state
            .clusters
            .get(&cluster)
            .map(|cluster_state| cluster_state.records.len() as u64)
            .unwrap_or(0)
    }
}

impl QuerySource for MemoryDatabase {
    fn schema(&self) -> Arc<SchemaSnapshot> {
        let state = self.state.read();
        Arc::new(SchemaSnapshot {
            classes: state.classes.clone(),
            indexes: state
                .indexes
                .iter()
                .map(|(name, index)| (name.clone(), index.descriptor.clone()))
                .collect(),
            cluster_names: state.cluster_names.clone(),
        })
    }

    fn store(&self) -> Arc<dyn RecordStore> {
        Arc::new(self.clone())
    }

    fn index_reader(&self, name: &str) -> Option<Arc<dyn IndexReader>> {
        let state = self.state.read();
        if !state.indexes.contains_key(name) {
            return None;
        }
        Some(Arc::new(MemoryIndexReader {
            state: self.state.clone(),
            name: name.to_string(),
        }))
    }
}

struct MemoryIndexReader {
    state: Arc<RwLock<State>>,
    name: String,
}

impl IndexReader for MemoryIndexReader {
    fn scan(&self, range: &KeyRange, order: ScanOrder) -> EntryCursor {
        let state = self.state.read();
        let mut entries: Vec<IndexEntry> = state
            .indexes
            .get(&self.name)
            .map(|index| {
                index
                    .entries
                    .iter()
                    .filter(|(key, _)| range.contains(&key.0))
                    .flat_map(|(key, rids)| {
                        rids.iter().map(|rid| IndexEntry {
                            key: key.0.clone(),
                            rid: *rid,
                        })
                    })
                    .collect()
            })
            .unwrap_or_default();
        if order == ScanOrder::Descending {
            entries.reverse();
        }
        Box::new(entries.into_iter())
    }
}
