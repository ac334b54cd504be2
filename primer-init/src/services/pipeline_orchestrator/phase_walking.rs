//! Phase: WALKING
//!
//! Discovers files, persists one record per path (pending or skipped) and
//! pulls credential text out of the drafts so it never reaches extraction.
//! Other text is dropped as the walk goes; extraction reads each file again,
//! so each worker holds only one file's text at a time.

use super::{PipelineOrchestrator, RunContext};
use crate::db;
use crate::error::PipelineResult;
use crate::models::{FileCategory, PipelineRun, PipelineState};
use crate::services::file_walker::FileDraft;
use crate::validators::CredentialFile;
use std::path::Path;
use tokio_util::sync::CancellationToken;

impl PipelineOrchestrator {
    pub(super) async fn phase_walking(
        &self,
        run: &mut PipelineRun,
        ctx: &mut RunContext,
        root: &Path,
        cancel_token: &CancellationToken,
    ) -> PipelineResult<()> {
        self.advance(run, PipelineState::Walking).await?;

        let walker = self.walker.clone();
        let root_path = root.to_path_buf();
        let token = cancel_token.clone();
        let drafts: Vec<FileDraft> = tokio::task::spawn_blocking(move || {
            walker
                .walk(&root_path)
                .map(|walk| {
                    walk.take_while(|_| !token.is_cancelled())
                        .map(|mut draft| {
                            if draft.category != FileCategory::Credentials {
                                draft.content = None;
                            }
                            draft
                        })
                        .collect::<Vec<_>>()
                })
        })
        .await??;

        let now = primer_common::time::now();
        let mut skipped = 0usize;

        for mut draft in drafts {
            db::save_file_record(&self.db, &draft.to_record(now), self.settings.store_lock_wait_ms).await?;
            ctx.walked_paths.insert(draft.path.clone());

            if draft.is_skipped() {
                skipped += 1;
                continue;
            }

            if draft.category == FileCategory::Credentials {
                if let Some(content) = draft.content.take() {
                    ctx.credential_files.push(CredentialFile {
                        path: draft.path.clone(),
                        content,
                    });
                }
            }
            ctx.drafts.push(draft);
        }

        ctx.files_unprocessed += skipped;

        tracing::info!(
            run_id = %run.run_id,
            discovered = ctx.walked_paths.len(),
            skipped,
            credential_files = ctx.credential_files.len(),
            "Walk finished"
        );
        Ok(())
    }
}
