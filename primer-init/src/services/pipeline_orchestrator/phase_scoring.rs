//! Phase: SCORING

use super::{PipelineOrchestrator, RunContext};
use crate::error::PipelineResult;
use crate::models::{PipelineRun, PipelineState, ReadinessReport};
use crate::services::readiness_scorer::ReportInputs;

impl PipelineOrchestrator {
    /// Build the report from whatever the run produced so far
    pub(super) async fn phase_scoring(&self, run: &mut PipelineRun, ctx: &RunContext) -> PipelineResult<ReadinessReport> {
        self.advance(run, PipelineState::Scoring).await?;

        let report = self.scorer.build_report(&ReportInputs {
            run_id: run.run_id,
            files_discovered: ctx.walked_paths.len(),
            files_processed: ctx.files_processed,
            files_unprocessed: ctx.files_unprocessed,
            registry: &self.registry,
            initialization: ctx.initialization.as_ref(),
            check_results: &ctx.check_results,
            incomplete: run.incomplete,
        });

        tracing::debug!(
            run_id = %run.run_id,
            files = report.factors.files_processed_ratio,
            modules = report.factors.modules_initialized_ratio,
            consistency = report.factors.consistency_factor,
            security = report.factors.security_factor,
            "Score factors"
        );
        Ok(report)
    }
}
