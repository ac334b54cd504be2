//! Phase: AGGREGATING

use super::{PipelineOrchestrator, RunContext};
use crate::error::PipelineResult;
use crate::models::{PipelineRun, PipelineState};

impl PipelineOrchestrator {
    /// Full recompute of the memory aggregates from every stored record
    pub(super) async fn phase_aggregating(&self, run: &mut PipelineRun, ctx: &mut RunContext) -> PipelineResult<()> {
        self.advance(run, PipelineState::Aggregating).await?;

        let aggregates = self.aggregator.recompute().await?;
        tracing::debug!(
            run_id = %run.run_id,
            strategies = aggregates.strategies().len(),
            config_keys = aggregates.config_map().len(),
            "Aggregates ready"
        );

        ctx.aggregates = Some(aggregates);
        Ok(())
    }
}
