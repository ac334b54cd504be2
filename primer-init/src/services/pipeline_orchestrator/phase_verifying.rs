//! Phase: VERIFYING
//!
//! Runs the consistency battery over a snapshot of the store and persists
//! one result row per check for this run.

use super::{PipelineOrchestrator, RunContext};
use crate::db;
use crate::error::PipelineResult;
use crate::models::{PipelineRun, PipelineState};
use crate::services::memory_aggregator::AggregateSet;
use crate::validators::VerificationInput;

impl PipelineOrchestrator {
    pub(super) async fn phase_verifying(&self, run: &mut PipelineRun, ctx: &mut RunContext) -> PipelineResult<()> {
        self.advance(run, PipelineState::Verifying).await?;

        let file_records = db::load_all_file_records(&self.db).await?;
        let module_states = ctx
            .initialization
            .as_ref()
            .map(|outcome| outcome.states.clone())
            .unwrap_or_default();
        let empty = AggregateSet::default();
        let aggregates = ctx.aggregates.as_ref().unwrap_or(&empty);

        let input = VerificationInput {
            walked_paths: &ctx.walked_paths,
            file_records: &file_records,
            module_states: &module_states,
            registry: &self.registry,
            aggregates,
            credential_files: &ctx.credential_files,
        };
        let results = self.verifier.verify_and_persist(&self.db, run.run_id, &input).await?;

        let issues: usize = results.iter().map(|r| r.issues_found.len()).sum();
        tracing::info!(
            run_id = %run.run_id,
            checks = results.len(),
            issues,
            "Consistency verification finished"
        );

        ctx.check_results = results;
        Ok(())
    }
}
