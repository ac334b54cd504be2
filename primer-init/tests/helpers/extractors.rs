//! Test-double content extractors

use async_trait::async_trait;
use primer_init::models::ExtractedFacts;
use primer_init::services::{ContentExtractor, ExtractionError, ExtractionRequest};
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Returns the same facts for every file
pub struct StaticExtractor {
    pub facts: ExtractedFacts,
}

#[async_trait]
impl ContentExtractor for StaticExtractor {
    fn name(&self) -> &'static str {
        "static"
    }

    async fn extract(&self, _request: ExtractionRequest) -> Result<ExtractedFacts, ExtractionError> {
        Ok(self.facts.clone())
    }
}

/// Sleeps before answering; paths containing `slow_marker` sleep for `delay`
pub struct SlowExtractor {
    pub slow_marker: String,
    pub delay: Duration,
}

#[async_trait]
impl ContentExtractor for SlowExtractor {
    fn name(&self) -> &'static str {
        "slow"
    }

    async fn extract(&self, request: ExtractionRequest) -> Result<ExtractedFacts, ExtractionError> {
        if request.path.contains(&self.slow_marker) {
            tokio::time::sleep(self.delay).await;
        }
        Ok(ExtractedFacts {
            requirements: vec![format!("{} must be indexed", request.path)],
            ..Default::default()
        })
    }
}

/// Every call fails the way an unreachable service would
pub struct FailingExtractor;

#[async_trait]
impl ContentExtractor for FailingExtractor {
    fn name(&self) -> &'static str {
        "failing"
    }

    async fn extract(&self, _request: ExtractionRequest) -> Result<ExtractedFacts, ExtractionError> {
        Err(ExtractionError::Api(503, "service unavailable".to_string()))
    }
}

/// Requests cancellation once `after` extractions have started
pub struct CancellingExtractor {
    pub token: CancellationToken,
    pub after: usize,
    pub calls: AtomicUsize,
}

impl CancellingExtractor {
    pub fn new(token: CancellationToken, after: usize) -> Self {
        Self {
            token,
            after,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ContentExtractor for CancellingExtractor {
    fn name(&self) -> &'static str {
        "cancelling"
    }

    async fn extract(&self, request: ExtractionRequest) -> Result<ExtractedFacts, ExtractionError> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if n >= self.after {
            self.token.cancel();
        }
        Ok(ExtractedFacts {
            requirements: vec![format!("{} must be indexed", request.path)],
            ..Default::default()
        })
    }
}

/// On its first call rewrites `rewrite` with `new_text` and deletes `delete`,
/// then echoes each file's requirement lines
pub struct TreeMutatingExtractor {
    pub rewrite: PathBuf,
    pub new_text: String,
    pub delete: PathBuf,
    pub calls: AtomicUsize,
}

#[async_trait]
impl ContentExtractor for TreeMutatingExtractor {
    fn name(&self) -> &'static str {
        "tree-mutating"
    }

    async fn extract(&self, request: ExtractionRequest) -> Result<ExtractedFacts, ExtractionError> {
        if self.calls.fetch_add(1, Ordering::SeqCst) == 0 {
            std::fs::write(&self.rewrite, &self.new_text).map_err(|e| ExtractionError::Network(e.to_string()))?;
            std::fs::remove_file(&self.delete).map_err(|e| ExtractionError::Network(e.to_string()))?;
        }
        Ok(ExtractedFacts {
            requirements: request.content.lines().map(str::to_string).collect(),
            ..Default::default()
        })
    }
}
