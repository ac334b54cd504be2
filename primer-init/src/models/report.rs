//! ReadinessReport: the terminal, immutable output of a run

use super::{ConsistencyCheckResult, HealthStatus, ModuleKind, ModuleStatus};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

/// Outcome of the credential check as seen by the report
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SecurityStatus {
    Secure,
    IssuesDetected,
    /// Verification never ran (cancelled run)
    NotVerified,
}

impl SecurityStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SecurityStatus::Secure => "secure",
            SecurityStatus::IssuesDetected => "issues_detected",
            SecurityStatus::NotVerified => "not_verified",
        }
    }
}

/// The four scoring factors, each in [0, 1]
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreFactors {
    pub files_processed_ratio: f64,
    pub modules_initialized_ratio: f64,
    pub consistency_factor: f64,
    pub security_factor: f64,
}

impl ScoreFactors {
    pub fn mean(&self) -> f64 {
        (self.files_processed_ratio
            + self.modules_initialized_ratio
            + self.consistency_factor
            + self.security_factor)
            / 4.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ModuleSummary {
    pub status: ModuleStatus,
    pub health: HealthStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadinessReport {
    pub run_id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub total_files_discovered: usize,
    pub files_processed: usize,
    pub module_health_summary: BTreeMap<ModuleKind, ModuleSummary>,
    /// Modules initialized and healthy
    pub pipelines_ready: Vec<ModuleKind>,
    pub identified_gaps: Vec<String>,
    pub security_status: SecurityStatus,
    pub recommendations: Vec<String>,
    pub overall_score: f64,
    pub approval_required: bool,
    /// True when cancellation cut the run short
    pub incomplete: bool,
    pub factors: ScoreFactors,
    pub total_issues: usize,
    pub approval_threshold: f64,
    pub max_issues: usize,
    pub consistency_results: Vec<ConsistencyCheckResult>,
}
