//! Phase: INITIALIZING

use super::{PipelineOrchestrator, RunContext};
use crate::error::PipelineResult;
use crate::models::{PipelineRun, PipelineState};

impl PipelineOrchestrator {
    pub(super) async fn phase_initializing(&self, run: &mut PipelineRun, ctx: &mut RunContext) -> PipelineResult<()> {
        self.advance(run, PipelineState::Initializing).await?;

        let config = ctx
            .aggregates
            .as_ref()
            .map(|aggregates| aggregates.config_map())
            .unwrap_or_default();
        let outcome = self.initializer.initialize(&config).await?;

        if !outcome.gaps.is_empty() {
            tracing::warn!(
                run_id = %run.run_id,
                gaps = outcome.gaps.len(),
                "Some modules could not be initialized"
            );
        }

        ctx.initialization = Some(outcome);
        Ok(())
    }
}
