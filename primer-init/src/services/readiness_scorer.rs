//! Readiness scoring
//!
//! ```text
//! filesProcessedRatio     = processed / discovered      (1.0 when nothing was discovered)
//! modulesInitializedRatio = initialized / registrySize     (1.0 for an empty registry)
//! consistencyFactor       = 1 - n / (n + 1)                (n = total issues)
//! securityFactor          = 1.0 if credentials passed, else 0.7
//! overallScore            = mean of the four, in [0, 1]
//! approvalRequired        = score < threshold || n > maxIssues || incomplete
//! ```

use super::module_initializer::InitializationOutcome;
use super::module_registry::ModuleRegistry;
use crate::models::{
    ConsistencyCheckResult, HealthStatus, ModuleKind, ModuleStatus, ModuleSummary, ReadinessReport, ScoreFactors,
    SecurityStatus,
};
use crate::validators::CredentialSanityCheck;
use crate::validators::ConsistencyCheck;
use std::collections::BTreeMap;
use uuid::Uuid;

pub const DEFAULT_APPROVAL_THRESHOLD: f64 = 0.90;
pub const DEFAULT_MAX_ISSUES: usize = 5;

/// Security factor when credentials are malformed or were never verified
pub const SECURITY_PENALTY_FACTOR: f64 = 0.7;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoringPolicy {
    pub approval_threshold: f64,
    pub max_issues: usize,
}

impl Default for ScoringPolicy {
    fn default() -> Self {
        Self {
            approval_threshold: DEFAULT_APPROVAL_THRESHOLD,
            max_issues: DEFAULT_MAX_ISSUES,
        }
    }
}

/// Counts that feed the four factors
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoreInputs {
    pub files_discovered: usize,
    pub files_processed: usize,
    pub modules_initialized: usize,
    pub registry_size: usize,
    pub total_issues: usize,
    pub security_status: SecurityStatus,
}

pub fn compute_factors(inputs: &ScoreInputs) -> ScoreFactors {
    let files_processed_ratio = if inputs.files_discovered == 0 {
        1.0
    } else {
        (inputs.files_processed as f64 / inputs.files_discovered as f64).clamp(0.0, 1.0)
    };
    let modules_initialized_ratio = if inputs.registry_size == 0 {
        1.0
    } else {
        (inputs.modules_initialized as f64 / inputs.registry_size as f64).clamp(0.0, 1.0)
    };
    let n = inputs.total_issues as f64;
    let consistency_factor = 1.0 - n / (n + 1.0);
    let security_factor = match inputs.security_status {
        SecurityStatus::Secure => 1.0,
        SecurityStatus::IssuesDetected | SecurityStatus::NotVerified => SECURITY_PENALTY_FACTOR,
    };

    ScoreFactors {
        files_processed_ratio,
        modules_initialized_ratio,
        consistency_factor,
        security_factor,
    }
}

pub fn overall_score(factors: &ScoreFactors) -> f64 {
    factors.mean().clamp(0.0, 1.0)
}

pub fn approval_required(score: f64, total_issues: usize, incomplete: bool, policy: &ScoringPolicy) -> bool {
    score < policy.approval_threshold || total_issues > policy.max_issues || incomplete
}

/// Security status as seen by the report
pub fn security_status(results: &[ConsistencyCheckResult]) -> SecurityStatus {
    let credential_type = CredentialSanityCheck::new().check_type();
    match results.iter().find(|r| r.check_type == credential_type) {
        Some(result) if result.passed() => SecurityStatus::Secure,
        Some(_) => SecurityStatus::IssuesDetected,
        None => SecurityStatus::NotVerified,
    }
}

/// Everything a report is built from
pub struct ReportInputs<'a> {
    pub run_id: Uuid,
    pub files_discovered: usize,
    pub files_processed: usize,
    pub files_unprocessed: usize,
    pub registry: &'a ModuleRegistry,
    /// `None` when initialization never ran
    pub initialization: Option<&'a InitializationOutcome>,
    pub check_results: &'a [ConsistencyCheckResult],
    pub incomplete: bool,
}

pub struct ReadinessScorer {
    policy: ScoringPolicy,
}

impl ReadinessScorer {
    pub fn new(policy: ScoringPolicy) -> Self {
        Self { policy }
    }

    pub fn build_report(&self, inputs: &ReportInputs<'_>) -> ReadinessReport {
        let module_health_summary = module_summary(inputs.registry, inputs.initialization);
        let pipelines_ready: Vec<ModuleKind> = module_health_summary
            .iter()
            .filter(|(_, s)| s.status == ModuleStatus::Initialized && s.health == HealthStatus::Healthy)
            .map(|(id, _)| *id)
            .collect();

        let identified_gaps: Vec<String> = match inputs.initialization {
            Some(outcome) => outcome.gaps.iter().map(|g| g.to_string()).collect(),
            None => inputs
                .registry
                .modules()
                .iter()
                .map(|m| format!("{} not initialized: run ended before initialization", m.id))
                .collect(),
        };

        let total_issues: usize = inputs.check_results.iter().map(|r| r.issues_found.len()).sum();
        let security_status = security_status(inputs.check_results);

        let factors = compute_factors(&ScoreInputs {
            files_discovered: inputs.files_discovered,
            files_processed: inputs.files_processed,
            modules_initialized: pipelines_ready.len(),
            registry_size: inputs.registry.len(),
            total_issues,
            security_status,
        });
        let overall_score = overall_score(&factors);
        let approval_required = approval_required(overall_score, total_issues, inputs.incomplete, &self.policy);

        let recommendations = self.recommendations(
            inputs,
            &identified_gaps,
            security_status,
            overall_score,
            total_issues,
            approval_required,
        );

        ReadinessReport {
            run_id: inputs.run_id,
            timestamp: primer_common::time::now(),
            total_files_discovered: inputs.files_discovered,
            files_processed: inputs.files_processed,
            module_health_summary,
            pipelines_ready,
            identified_gaps,
            security_status,
            recommendations,
            overall_score,
            approval_required,
            incomplete: inputs.incomplete,
            factors,
            total_issues,
            approval_threshold: self.policy.approval_threshold,
            max_issues: self.policy.max_issues,
            consistency_results: inputs.check_results.to_vec(),
        }
    }

    fn recommendations(
        &self,
        inputs: &ReportInputs<'_>,
        gaps: &[String],
        security_status: SecurityStatus,
        score: f64,
        total_issues: usize,
        approval_required: bool,
    ) -> Vec<String> {
        let mut recommendations = Vec::new();

        if inputs.incomplete {
            recommendations.push("Run was cancelled before completion; re-run to obtain a full report".to_string());
        }
        if inputs.files_unprocessed > 0 {
            recommendations.push(format!(
                "Review {} file(s) that were skipped or failed extraction",
                inputs.files_unprocessed
            ));
        }
        if !gaps.is_empty() && inputs.initialization.is_some() {
            recommendations.push(format!("Resolve {} module dependency gap(s)", gaps.len()));
        }
        for result in inputs.check_results.iter().filter(|r| !r.passed()) {
            recommendations.push(format!(
                "Address {} {} finding(s)",
                result.issues_found.len(),
                result.check_type
            ));
        }
        if security_status == SecurityStatus::IssuesDetected {
            recommendations.push("Fix malformed credentials before activation".to_string());
        }

        if approval_required {
            let mut reasons = Vec::new();
            if score < self.policy.approval_threshold {
                reasons.push(format!(
                    "score {:.2} below threshold {:.2}",
                    score, self.policy.approval_threshold
                ));
            }
            if total_issues > self.policy.max_issues {
                reasons.push(format!("{} issues exceed limit {}", total_issues, self.policy.max_issues));
            }
            if inputs.incomplete {
                reasons.push("run incomplete".to_string());
            }
            recommendations.push(format!("Operator approval required: {}", reasons.join("; ")));
        } else {
            recommendations.push("System is ready for autonomous activation".to_string());
        }

        recommendations
    }
}

impl Default for ReadinessScorer {
    fn default() -> Self {
        Self::new(ScoringPolicy::default())
    }
}

fn module_summary(
    registry: &ModuleRegistry,
    initialization: Option<&InitializationOutcome>,
) -> BTreeMap<ModuleKind, ModuleSummary> {
    registry
        .modules()
        .iter()
        .map(|m| {
            let state = initialization.and_then(|o| o.states.iter().find(|s| s.module_id == m.id));
            let summary = match state {
                Some(state) => ModuleSummary {
                    status: state.status,
                    health: state.health.status,
                },
                None => ModuleSummary {
                    status: ModuleStatus::Uninitialized,
                    health: HealthStatus::Unknown,
                },
            };
            (m.id, summary)
        })
        .collect()
}
