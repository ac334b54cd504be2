//! Consistency checks
//!
//! Each check inspects a read-only snapshot of the run and returns findings.
//! Findings are data and never abort the run. A check with no issues is
//! `resolved`, one with issues is `pending`, and only a check that cannot
//! run at all is `failed`; the remaining checks still run. Only `resolved`
//! counts as passed.

pub mod config_conflict;
pub mod credential_sanity;
pub mod dependency_integrity;
pub mod file_completeness;
pub mod plausibility;

pub use config_conflict::ConfigConflictCheck;
pub use credential_sanity::{CredentialFile, CredentialSanityCheck};
pub use dependency_integrity::DependencyIntegrityCheck;
pub use file_completeness::FileCompletenessCheck;
pub use plausibility::PlausibilityCheck;

use crate::db;
use crate::models::{ConsistencyCheckResult, ConsistencyIssue, FileRecord, ModuleState, ResolutionStatus};
use crate::services::memory_aggregator::AggregateSet;
use crate::services::module_registry::ModuleRegistry;
use sqlx::SqlitePool;
use std::collections::BTreeSet;
use thiserror::Error;
use uuid::Uuid;

/// A check could not run
#[derive(Debug, Error)]
#[error("{0}")]
pub struct CheckError(pub String);

/// Everything a check may look at
pub struct VerificationInput<'a> {
    /// Paths discovered by this run's walk
    pub walked_paths: &'a BTreeSet<String>,
    /// Stored records, path order
    pub file_records: &'a [FileRecord],
    pub module_states: &'a [ModuleState],
    pub registry: &'a ModuleRegistry,
    pub aggregates: &'a AggregateSet,
    pub credential_files: &'a [CredentialFile],
}

pub trait ConsistencyCheck: Send + Sync {
    /// Stable name stored as `check_type`
    fn check_type(&self) -> &'static str;

    fn run(&self, input: &VerificationInput<'_>) -> Result<Vec<ConsistencyIssue>, CheckError>;
}

/// Runs the check battery and records one result per check
pub struct ConsistencyVerifier {
    checks: Vec<Box<dyn ConsistencyCheck>>,
}

impl ConsistencyVerifier {
    /// The standard battery
    pub fn standard(expected_files: Vec<String>, plausibility_variance: f64) -> Self {
        Self::with_checks(vec![
            Box::new(FileCompletenessCheck::new(expected_files)),
            Box::new(ConfigConflictCheck),
            Box::new(CredentialSanityCheck::new()),
            Box::new(DependencyIntegrityCheck),
            Box::new(PlausibilityCheck::new(plausibility_variance)),
        ])
    }

    pub fn with_checks(checks: Vec<Box<dyn ConsistencyCheck>>) -> Self {
        Self { checks }
    }

    /// Run every check; never fails
    pub fn run_all(&self, input: &VerificationInput<'_>) -> Vec<ConsistencyCheckResult> {
        self.checks
            .iter()
            .map(|check| {
                let timestamp = primer_common::time::now();
                match check.run(input) {
                    Ok(issues) => {
                        let resolution_status = if issues.is_empty() {
                            ResolutionStatus::Resolved
                        } else {
                            ResolutionStatus::Pending
                        };
                        tracing::debug!(check = check.check_type(), issues = issues.len(), "Consistency check finished");
                        ConsistencyCheckResult {
                            check_type: check.check_type().to_string(),
                            issues_found: issues,
                            resolution_status,
                            timestamp,
                        }
                    }
                    Err(e) => {
                        tracing::warn!(check = check.check_type(), error = %e, "Consistency check could not run");
                        ConsistencyCheckResult {
                            check_type: check.check_type().to_string(),
                            issues_found: vec![ConsistencyIssue::new(format!("check could not run: {}", e))],
                            resolution_status: ResolutionStatus::Failed,
                            timestamp,
                        }
                    }
                }
            })
            .collect()
    }

    /// Run every check and persist one row per check for `run_id`
    pub async fn verify_and_persist(
        &self,
        pool: &SqlitePool,
        run_id: Uuid,
        input: &VerificationInput<'_>,
    ) -> primer_common::Result<Vec<ConsistencyCheckResult>> {
        let results = self.run_all(input);
        for result in &results {
            db::insert_check_result(pool, run_id, result).await?;
        }
        Ok(results)
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;

    /// Owned backing data for a [`VerificationInput`]
    pub struct Fixture {
        pub walked_paths: BTreeSet<String>,
        pub file_records: Vec<FileRecord>,
        pub module_states: Vec<ModuleState>,
        pub registry: ModuleRegistry,
        pub aggregates: AggregateSet,
        pub credential_files: Vec<CredentialFile>,
    }

    impl Default for Fixture {
        fn default() -> Self {
            Self {
                walked_paths: BTreeSet::new(),
                file_records: Vec::new(),
                module_states: Vec::new(),
                registry: ModuleRegistry::builtin(),
                aggregates: AggregateSet::default(),
                credential_files: Vec::new(),
            }
        }
    }

    impl Fixture {
        pub fn input(&self) -> VerificationInput<'_> {
            VerificationInput {
                walked_paths: &self.walked_paths,
                file_records: &self.file_records,
                module_states: &self.module_states,
                registry: &self.registry,
                aggregates: &self.aggregates,
                credential_files: &self.credential_files,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::Fixture;
    use super::*;

    struct BrokenCheck;

    impl ConsistencyCheck for BrokenCheck {
        fn check_type(&self) -> &'static str {
            "broken"
        }

        fn run(&self, _input: &VerificationInput<'_>) -> Result<Vec<ConsistencyIssue>, CheckError> {
            Err(CheckError("index unavailable".to_string()))
        }
    }

    #[test]
    fn test_standard_battery_names() {
        let verifier = ConsistencyVerifier::standard(Vec::new(), 0.5);
        let results = verifier.run_all(&Fixture::default().input());
        let names: Vec<&str> = results.iter().map(|r| r.check_type.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "file_completeness",
                "config_conflict",
                "credential_sanity",
                "dependency_integrity",
                "plausibility"
            ]
        );
    }

    #[test]
    fn test_failing_check_does_not_stop_the_battery() {
        let verifier = ConsistencyVerifier::with_checks(vec![
            Box::new(BrokenCheck),
            Box::new(FileCompletenessCheck::new(Vec::new())),
        ]);
        let fixture = Fixture::default();
        let results = verifier.run_all(&fixture.input());

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].resolution_status, ResolutionStatus::Failed);
        assert_eq!(results[0].issues_found.len(), 1);
        assert_eq!(results[1].resolution_status, ResolutionStatus::Resolved);
        assert!(results[1].passed());
    }
}
