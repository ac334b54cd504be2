//! Pipeline services

pub mod content_extractor;
pub mod file_walker;
pub mod http_extractor;
pub mod memory_aggregator;
pub mod module_initializer;
pub mod module_registry;
pub mod pipeline_orchestrator;
pub mod readiness_scorer;
pub mod report_presenter;

pub use content_extractor::{ContentExtractor, ExtractionError, ExtractionRequest, NoopExtractor, RuleExtractor};
pub use file_walker::{CatalogWalk, FileCatalogWalker, FileContent, FileDraft, ScanError};
pub use http_extractor::HttpExtractor;
pub use memory_aggregator::{AggregateSet, MemoryAggregator};
pub use module_initializer::{InitializationOutcome, ModuleDependencyInitializer, ModuleGap};
pub use module_registry::{ModuleRegistry, ModuleSpec, RegistryDefect};
pub use pipeline_orchestrator::PipelineOrchestrator;
pub use readiness_scorer::{ReadinessScorer, ScoringPolicy};

use crate::config::{ExtractorKind, ExtractorSettings};
use primer_common::{Error, Result};
use std::sync::Arc;
use std::time::Duration;

/// Extractor selected by configuration
pub fn build_extractor(settings: &ExtractorSettings, timeout: Duration) -> Result<Arc<dyn ContentExtractor>> {
    let extractor: Arc<dyn ContentExtractor> = match settings.kind {
        ExtractorKind::Noop => Arc::new(NoopExtractor),
        ExtractorKind::Rule => Arc::new(RuleExtractor),
        ExtractorKind::Http => {
            let endpoint = settings
                .endpoint
                .clone()
                .ok_or_else(|| Error::Config("the http extractor requires an endpoint".to_string()))?;
            let client = HttpExtractor::new(endpoint, timeout)
                .map_err(|e| Error::Config(format!("Failed to build http extractor: {}", e)))?;
            Arc::new(client)
        }
    };
    tracing::debug!(extractor = extractor.name(), "Content extractor selected");
    Ok(extractor)
}
