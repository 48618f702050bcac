// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Query planning: index-access selection and plan assembly
//!
//! The planner turns a parsed SELECT statement into a linear chain of
//! pull-iterator steps plus a serializable [`PlanDescription`] — the
//! ordered list of step kinds (with sub-plans for union steps) that
//! callers and tests introspect. Step count and kinds are an observable
//! contract.

pub mod index_planner;
pub mod planner;

pub use planner::SelectPlanner;

use crate::exec::steps::{ExecutionStep, StepKind};
use serde::{Deserialize, Serialize};

/// One step entry of a plan description
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepDescription {
    pub kind: StepKind,
    pub detail: String,
    /// Sub-plan descriptions; non-empty only for union and subquery steps
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sub_plans: Vec<PlanDescription>,
}

impl StepDescription {
    pub fn new(kind: StepKind, detail: impl Into<String>) -> Self {
        Self {
            kind,
            detail: detail.into(),
            sub_plans: Vec::new(),
        }
    }
}

/// Ordered list of step kinds forming the pipeline, for introspection
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PlanDescription {
    pub steps: Vec<StepDescription>,
}

impl PlanDescription {
    pub fn step_kinds(&self) -> Vec<StepKind> {
        self.steps.iter().map(|step| step.kind).collect()
    }

    /// Whether a step of this kind appears anywhere in the chain,
    /// including union sub-plans
    pub fn contains(&self, kind: StepKind) -> bool {
        self.steps.iter().any(|step| {
            step.kind == kind || step.sub_plans.iter().any(|plan| plan.contains(kind))
        })
    }
}

/// An executable plan: the composed root step and its description
pub struct SelectExecutionPlan {
    pub(crate) root: Box<dyn ExecutionStep>,
    pub description: PlanDescription,
}
