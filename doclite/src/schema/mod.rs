// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Read-only schema and index catalog view
//!
//! The executor consumes the catalog through [`SchemaSnapshot`]: class
//! descriptors with their cluster lists and subclass links, and index
//! descriptors with key properties, uniqueness, kind and null policy.
//! Catalog maintenance (class/index creation) belongs to the storage
//! layer; the snapshot is immutable for the duration of a plan.

use crate::storage::ClusterId;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// How an index is probed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IndexKind {
    /// Range-capable, scanned forward or backward in key order
    Ordered,
    /// Equality-only probes over the full key
    Hash,
}

/// What the index does with null-valued keys
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NullPolicy {
    /// Null keys are indexed like any other value
    Include,
    /// Records whose indexed property is null are absent from the index
    Ignore,
}

/// Declared secondary index
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexDescriptor {
    pub name: String,
    pub class: String,
    pub properties: Vec<String>,
    pub unique: bool,
    pub kind: IndexKind,
    pub null_policy: NullPolicy,
}

/// Class descriptor: clusters holding its own records plus hierarchy links
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassDescriptor {
    pub name: String,
    pub clusters: Vec<ClusterId>,
    pub superclasses: Vec<String>,
    pub subclasses: Vec<String>,
    /// Names of indexes declared on this class
    pub indexes: Vec<String>,
}

/// Immutable catalog view handed to the planner and executor
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SchemaSnapshot {
    pub classes: HashMap<String, ClassDescriptor>,
    pub indexes: HashMap<String, IndexDescriptor>,
    pub cluster_names: HashMap<String, ClusterId>,
}

impl SchemaSnapshot {
    pub fn class(&self, name: &str) -> Option<&ClassDescriptor> {
        self.classes.get(name)
    }

    pub fn index(&self, name: &str) -> Option<&IndexDescriptor> {
        self.indexes.get(name)
    }

    pub fn cluster_by_name(&self, name: &str) -> Option<ClusterId> {
        self.cluster_names.get(name).copied()
    }

    /// Indexes declared on one class (not its subclasses)
    pub fn class_indexes(&self, class: &str) -> Vec<&IndexDescriptor> {
        self.class(class)
            .map(|descriptor| {
                descriptor
                    .indexes
                    .iter()
                    .filter_map(|name| self.indexes.get(name))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// The class plus all transitive subclasses, each visited once.
    /// Diamond hierarchies are flattened by the visited set.
    pub fn subtree(&self, class: &str) -> Vec<&ClassDescriptor> {
        let mut visited = HashSet::new();
        let mut result = Vec::new();
        let mut pending = vec![class.to_string()];
        while let Some(name) = pending.pop() {
            if !visited.insert(name.clone()) {
                continue;
            }
            if let Some(descriptor) = self.classes.get(&name) {
                pending.extend(descriptor.subclasses.iter().cloned());
                result.push(descriptor);
            }
        }
        result
    }

    /// All clusters of a class subtree, sorted: the physical extent of a
    /// polymorphic class scan
    pub fn polymorphic_clusters(&self, class: &str) -> Vec<ClusterId> {
        let mut clusters: Vec<ClusterId> = self
            .subtree(class)
            .iter()
            .flat_map(|descriptor| descriptor.clusters.iter().copied())
            .collect();
        clusters.sort_unstable();
        clusters.dedup();
        clusters
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn class(name: &str, clusters: Vec<ClusterId>, subclasses: Vec<&str>) -> ClassDescriptor {
        ClassDescriptor {
            name: name.to_string(),
            clusters,
            superclasses: Vec::new(),
            subclasses: subclasses.into_iter().map(String::from).collect(),
            indexes: Vec::new(),
        }
    }

    #[test]
    fn test_subtree_visits_diamond_once() {
        let mut snapshot = SchemaSnapshot::default();
        snapshot
            .classes
            .insert("P".into(), class("P", vec![1], vec!["A", "B"]));
        snapshot
            .classes
            .insert("A".into(), class("A", vec![2], vec!["D"]));
        snapshot
            .classes
            .insert("B".into(), class("B", vec![3], vec!["D"]));
        snapshot.classes.insert("D".into(), class("D", vec![4], vec![]));

        let subtree = snapshot.subtree("P");
        assert_eq!(subtree.len(), 4);
        assert_eq!(snapshot.polymorphic_clusters("P"), vec![1, 2, 3, 4]);
    }
}
