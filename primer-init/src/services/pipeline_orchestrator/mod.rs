//! Pipeline orchestrator
//!
//! Drives one run through the state machine:
//!
//! ```text
//! Idle → Walking → Extracting → Aggregating → Initializing → Verifying → Scoring → Reported
//! ```
//!
//! Each state is handled by a `phase_*` method in its own file. Every
//! transition is persisted and broadcast before the phase does any work.
//!
//! Cancellation is cooperative: the walk stops early, extraction stops
//! dispatching new files (in-flight calls finish or time out), and the run
//! jumps straight to Scoring with an incomplete report. Only store failures
//! and an unusable root abort a run.

use super::content_extractor::ContentExtractor;
use super::file_walker::{FileCatalogWalker, FileDraft};
use super::memory_aggregator::{AggregateSet, MemoryAggregator};
use super::module_initializer::{InitializationOutcome, ModuleDependencyInitializer};
use super::module_registry::ModuleRegistry;
use super::readiness_scorer::ReadinessScorer;
use crate::config::PipelineSettings;
use crate::db;
use crate::error::PipelineResult;
use crate::models::{ConsistencyCheckResult, PipelineRun, PipelineState, ReadinessReport};
use crate::validators::{ConsistencyVerifier, CredentialFile};
use primer_common::events::{EventBus, PipelineEvent};
use sqlx::SqlitePool;
use std::collections::BTreeSet;
use std::path::Path;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

mod phase_aggregating;
mod phase_extracting;
mod phase_initializing;
mod phase_scoring;
mod phase_verifying;
mod phase_walking;

/// Working data handed from phase to phase within one run
#[derive(Default)]
struct RunContext {
    /// Walked files awaiting extraction (credential text already removed)
    drafts: Vec<FileDraft>,
    walked_paths: BTreeSet<String>,
    credential_files: Vec<CredentialFile>,
    files_processed: usize,
    /// Skipped during the walk or failed extraction
    files_unprocessed: usize,
    aggregates: Option<AggregateSet>,
    initialization: Option<InitializationOutcome>,
    check_results: Vec<ConsistencyCheckResult>,
}

pub struct PipelineOrchestrator {
    db: SqlitePool,
    event_bus: EventBus,
    settings: PipelineSettings,
    walker: FileCatalogWalker,
    extractor: Arc<dyn ContentExtractor>,
    registry: Arc<ModuleRegistry>,
    aggregator: MemoryAggregator,
    initializer: ModuleDependencyInitializer,
    verifier: ConsistencyVerifier,
    scorer: ReadinessScorer,
}

impl PipelineOrchestrator {
    pub fn new(
        db: SqlitePool,
        event_bus: EventBus,
        settings: PipelineSettings,
        extractor: Arc<dyn ContentExtractor>,
        registry: Arc<ModuleRegistry>,
    ) -> Self {
        let walker = FileCatalogWalker::new(
            settings.exclude.iter().cloned(),
            settings.max_file_size,
            settings.data_prefix_bytes,
        );
        let verifier =
            ConsistencyVerifier::standard(settings.expected_files.clone(), settings.plausibility_variance);
        let scorer = ReadinessScorer::new(settings.scoring_policy());

        Self {
            aggregator: MemoryAggregator::new(db.clone()),
            initializer: ModuleDependencyInitializer::new(db.clone(), Arc::clone(&registry)),
            db,
            event_bus,
            settings,
            walker,
            extractor,
            registry,
            verifier,
            scorer,
        }
    }

    /// Execute one complete run over `root`
    ///
    /// Returns the persisted report. A cancelled run still returns a report,
    /// marked incomplete.
    pub async fn execute_run(&self, root: &Path, cancel_token: CancellationToken) -> PipelineResult<ReadinessReport> {
        let start_time = std::time::Instant::now();
        FileCatalogWalker::check_root(root)?;

        let mut run = PipelineRun::new(root.display().to_string());
        db::save_run(&self.db, &run).await?;

        tracing::info!(
            run_id = %run.run_id,
            root = %run.root,
            extractor = self.extractor.name(),
            registry = self.registry.version(),
            "Starting initialization run"
        );
        self.event_bus.emit_lossy(PipelineEvent::RunStarted {
            run_id: run.run_id,
            root: run.root.clone(),
            timestamp: primer_common::time::now(),
        });

        let mut ctx = RunContext::default();

        self.phase_walking(&mut run, &mut ctx, root, &cancel_token).await?;
        if !cancel_token.is_cancelled() {
            self.phase_extracting(&mut run, &mut ctx, &cancel_token).await?;
        }
        if !cancel_token.is_cancelled() {
            self.phase_aggregating(&mut run, &mut ctx).await?;
        }
        if !cancel_token.is_cancelled() {
            self.phase_initializing(&mut run, &mut ctx).await?;
        }
        if !cancel_token.is_cancelled() {
            self.phase_verifying(&mut run, &mut ctx).await?;
        }

        if cancel_token.is_cancelled() {
            tracing::warn!(run_id = %run.run_id, state = %run.state, "Run cancelled, producing partial report");
            run.mark_incomplete();
        }

        let report = self.phase_scoring(&mut run, &ctx).await?;

        db::insert_report(&self.db, &report).await?;
        self.advance(&mut run, PipelineState::Reported).await?;

        tracing::info!(
            run_id = %run.run_id,
            score = report.overall_score,
            approval_required = report.approval_required,
            incomplete = report.incomplete,
            duration_ms = start_time.elapsed().as_millis() as u64,
            "Initialization run reported"
        );
        self.event_bus.emit_lossy(PipelineEvent::RunReported {
            run_id: run.run_id,
            overall_score: report.overall_score,
            approval_required: report.approval_required,
            incomplete: report.incomplete,
            timestamp: primer_common::time::now(),
        });

        Ok(report)
    }

    /// Forward transition, persisted then broadcast
    async fn advance(&self, run: &mut PipelineRun, to: PipelineState) -> PipelineResult<()> {
        let transition = run.transition_to(to)?;
        db::save_run(&self.db, run).await?;

        tracing::info!(
            run_id = %run.run_id,
            from = %transition.old_state,
            to = %transition.new_state,
            "Pipeline phase changed"
        );
        self.event_bus.emit_lossy(PipelineEvent::PhaseChanged {
            run_id: run.run_id,
            from: transition.old_state,
            to: transition.new_state,
            timestamp: transition.transitioned_at,
        });
        Ok(())
    }
}
