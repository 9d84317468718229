// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Per-stage outcome reporting.
//!
//! Outcomes never trigger rollback; the summary is the contract with the
//! operator who follows up on degraded stages manually.

use std::fmt;

use tracing::{info, warn};

/// A named unit of rollout/teardown, in fixed ordinal order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Namespace,
    Operator,
    Datastores,
    FeatureStore,
    PostApply,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Namespace => "namespace",
            Stage::Operator => "operator",
            Stage::Datastores => "datastores",
            Stage::FeatureStore => "feature-store",
            Stage::PostApply => "post-apply-job",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// Outcome of one stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageOutcome {
    /// Resources were applied/deleted; no readiness condition was waited on
    Applied,
    /// The stage performed no cluster calls
    Skipped,
    /// The readiness condition was met
    Ready,
    /// The attempt budget expired without success or explicit failure
    TimedOut,
    /// The distinguished failure condition matched
    Failed,
}

impl fmt::Display for StageOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            StageOutcome::Applied => "applied",
            StageOutcome::Skipped => "skipped",
            StageOutcome::Ready => "ready",
            StageOutcome::TimedOut => "timed-out",
            StageOutcome::Failed => "failed",
        };
        f.pad(s)
    }
}

#[derive(Debug, Clone)]
pub struct StageReport {
    pub stage: Stage,
    pub outcome: StageOutcome,
    pub detail: Option<String>,
}

/// Aggregated per-stage outcomes of one run.
#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    reports: Vec<StageReport>,
}

impl RunSummary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, stage: Stage, outcome: StageOutcome, detail: Option<String>) {
        self.reports.push(StageReport {
            stage,
            outcome,
            detail,
        });
    }

    pub fn reports(&self) -> &[StageReport] {
        &self.reports
    }

    pub fn outcome_of(&self, stage: Stage) -> Option<StageOutcome> {
        self.reports
            .iter()
            .find(|r| r.stage == stage)
            .map(|r| r.outcome)
    }

    /// True when any stage hit its distinguished failure condition.
    /// Timeouts are soft and do not count.
    pub fn has_failure(&self) -> bool {
        self.reports
            .iter()
            .any(|r| r.outcome == StageOutcome::Failed)
    }

    /// Emit one line per stage at a level matching its outcome.
    pub fn log(&self) {
        info!("Run summary:");
        for report in &self.reports {
            let detail = report.detail.as_deref().unwrap_or("");
            match report.outcome {
                StageOutcome::TimedOut | StageOutcome::Failed => {
                    warn!("  {:<16} {:<9} {}", report.stage, report.outcome, detail)
                }
                _ => info!("  {:<16} {:<9} {}", report.stage, report.outcome, detail),
            }
        }
    }
}
