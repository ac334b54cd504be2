//! Phase: EXTRACTING
//!
//! Bounded-concurrency extraction. Each worker owns exactly one path and
//! writes that path's record once, complete. Extractor errors are soft
//! (empty facts, record still completed); a timeout marks the record
//! `extraction_failed`. Once cancellation is requested no new file starts.
//!
//! Text is read again here rather than kept from the walk. A file that
//! changed since the walk is extracted as it is now and its record carries
//! the new hash. A file that can no longer be read is marked `skipped`.

use super::{PipelineOrchestrator, RunContext};
use crate::db;
use crate::error::PipelineResult;
use crate::models::{ExtractedFacts, FileCategory, FileRecord, FileStatus, PipelineRun, PipelineState};
use crate::services::content_extractor::ExtractionRequest;
use crate::services::file_walker::{self, FileDraft, FileRead};
use futures::stream::{self, StreamExt, TryStreamExt};
use primer_common::events::PipelineEvent;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ExtractionOutcome {
    Completed,
    Failed,
    Skipped,
    NotStarted,
}

impl PipelineOrchestrator {
    pub(super) async fn phase_extracting(
        &self,
        run: &mut PipelineRun,
        ctx: &mut RunContext,
        cancel_token: &CancellationToken,
    ) -> PipelineResult<()> {
        self.advance(run, PipelineState::Extracting).await?;

        let drafts = std::mem::take(&mut ctx.drafts);
        let total = drafts.len();
        let run_id = run.run_id;

        tracing::info!(
            run_id = %run_id,
            files = total,
            concurrency = self.settings.concurrency,
            extractor = self.extractor.name(),
            "Extracting facts"
        );

        let outcomes: Vec<ExtractionOutcome> = stream::iter(drafts)
            .map(|draft| self.extract_one(run_id, draft, cancel_token))
            .buffer_unordered(self.settings.concurrency.max(1))
            .try_collect()
            .await?;

        let count = |outcome: ExtractionOutcome| outcomes.iter().filter(|o| **o == outcome).count();
        let completed = count(ExtractionOutcome::Completed);
        let failed = count(ExtractionOutcome::Failed);
        let skipped = count(ExtractionOutcome::Skipped);
        let not_started = count(ExtractionOutcome::NotStarted);

        ctx.files_processed += completed;
        ctx.files_unprocessed += failed + skipped;

        tracing::info!(
            run_id = %run_id,
            completed,
            failed,
            skipped,
            not_started,
            "Extraction finished"
        );
        Ok(())
    }

    async fn extract_one(
        &self,
        run_id: Uuid,
        draft: FileDraft,
        cancel_token: &CancellationToken,
    ) -> primer_common::Result<ExtractionOutcome> {
        if cancel_token.is_cancelled() {
            return Ok(ExtractionOutcome::NotStarted);
        }

        let mut content_hash = draft.content_hash.clone();
        let (status, facts) = if draft.category == FileCategory::Credentials {
            (FileStatus::Completed, ExtractedFacts::default())
        } else {
            match self.reread(&draft).await? {
                Some(read) => {
                    if read.content_hash != content_hash {
                        tracing::warn!(file = %draft.path, "File changed since the walk, extracting current content");
                        content_hash = read.content_hash;
                    }
                    if read.truncated {
                        tracing::debug!(file = %draft.path, size = draft.size, "Extracting from a prefix only");
                    }
                    match read.content {
                        Some(content) => self.run_extractor(&draft.path, content.into_string()).await,
                        None => (FileStatus::Completed, ExtractedFacts::default()),
                    }
                }
                None => (FileStatus::Skipped, ExtractedFacts::default()),
            }
        };

        let record = FileRecord {
            path: draft.path,
            size: draft.size,
            category: draft.category,
            content_hash,
            extracted_facts: facts,
            status,
            timestamp: primer_common::time::now(),
        };
        db::save_file_record(&self.db, &record, self.settings.store_lock_wait_ms).await?;

        tracing::debug!(file = %record.path, status = %record.status, "File extracted");
        self.event_bus.emit_lossy(PipelineEvent::FileExtracted {
            run_id,
            path: record.path.clone(),
            status: record.status.as_str().to_string(),
            timestamp: record.timestamp,
        });

        Ok(match status {
            FileStatus::ExtractionFailed => ExtractionOutcome::Failed,
            FileStatus::Skipped => ExtractionOutcome::Skipped,
            _ => ExtractionOutcome::Completed,
        })
    }

    /// Read the file again off the runtime; `None` when it is gone, unreadable or now oversized
    async fn reread(&self, draft: &FileDraft) -> primer_common::Result<Option<FileRead>> {
        let path = draft.absolute_path.clone();
        let category = draft.category;
        let max_file_size = self.settings.max_file_size;
        let data_prefix_bytes = self.settings.data_prefix_bytes;

        let read = tokio::task::spawn_blocking(move || {
            let size = std::fs::metadata(&path)?.len();
            if size > max_file_size {
                return Err(std::io::Error::new(
                    std::io::ErrorKind::InvalidData,
                    format!("size {} exceeds limit {}", size, max_file_size),
                ));
            }
            file_walker::read_file(&path, category, size, data_prefix_bytes)
        })
        .await
        .map_err(|e| primer_common::Error::Internal(format!("File read task failed: {}", e)))?;

        match read {
            Ok(read) => Ok(Some(read)),
            Err(e) => {
                tracing::warn!(file = %draft.path, error = %e, "Failed to re-read file, skipping");
                Ok(None)
            }
        }
    }

    /// Hand `content` to the extractor under the per-file timeout
    async fn run_extractor(&self, path: &str, content: String) -> (FileStatus, ExtractedFacts) {
        let request = ExtractionRequest {
            path: path.to_string(),
            content,
            max_length: self.settings.extractor.max_length,
        };
        match tokio::time::timeout(self.settings.extract_timeout, self.extractor.extract(request)).await {
            Ok(Ok(facts)) => (FileStatus::Completed, facts),
            Ok(Err(e)) => {
                tracing::warn!(file = %path, error = %e, "Extraction failed, keeping empty facts");
                (FileStatus::Completed, ExtractedFacts::default())
            }
            Err(_) => {
                tracing::warn!(
                    file = %path,
                    timeout_secs = self.settings.extract_timeout.as_secs(),
                    "Extraction timed out"
                );
                (FileStatus::ExtractionFailed, ExtractedFacts::default())
            }
        }
    }
}
