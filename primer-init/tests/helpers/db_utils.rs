//! Database Test Utilities

use primer_common::events::EventBus;
use primer_init::services::{ContentExtractor, ModuleRegistry, PipelineOrchestrator};
use primer_init::PipelineSettings;
use sqlx::SqlitePool;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

/// Temporary store with the schema applied
///
/// Returns (TempDir, SqlitePool) - TempDir must be kept alive for duration of test
pub async fn create_test_db() -> anyhow::Result<(TempDir, SqlitePool)> {
    let temp_dir = TempDir::new()?;
    let db_path = temp_dir.path().join("test_primer.db");
    let pool = primer_init::db::init_database_pool(&db_path).await?;
    Ok((temp_dir, pool))
}

/// Defaults with a short extraction timeout and a fixed worker count
pub fn test_settings() -> PipelineSettings {
    PipelineSettings {
        concurrency: 4,
        extract_timeout: Duration::from_secs(5),
        ..PipelineSettings::default()
    }
}

pub fn test_orchestrator(
    pool: SqlitePool,
    settings: PipelineSettings,
    extractor: Arc<dyn ContentExtractor>,
    registry: ModuleRegistry,
) -> (PipelineOrchestrator, EventBus) {
    let event_bus = EventBus::new(1024);
    let orchestrator = PipelineOrchestrator::new(pool, event_bus.clone(), settings, extractor, Arc::new(registry));
    (orchestrator, event_bus)
}
