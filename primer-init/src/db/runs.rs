//! Pipeline run bookkeeping

use crate::models::PipelineRun;
use primer_common::events::PipelineState;
use primer_common::time::{from_storage, to_storage};
use primer_common::{Error, Result};
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

/// Insert or update the run row
pub async fn save_run(pool: &SqlitePool, run: &PipelineRun) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO pipeline_runs (run_id, state, root, started_at, ended_at, incomplete)
        VALUES (?, ?, ?, ?, ?, ?)
        ON CONFLICT(run_id) DO UPDATE SET
            state = excluded.state,
            ended_at = excluded.ended_at,
            incomplete = excluded.incomplete
        "#,
    )
    .bind(run.run_id.to_string())
    .bind(run.state.as_str())
    .bind(&run.root)
    .bind(to_storage(&run.started_at))
    .bind(run.ended_at.as_ref().map(to_storage))
    .bind(run.incomplete)
    .execute(pool)
    .await?;

    Ok(())
}

pub async fn load_run(pool: &SqlitePool, run_id: Uuid) -> Result<Option<PipelineRun>> {
    let row = sqlx::query(
        "SELECT run_id, state, root, started_at, ended_at, incomplete FROM pipeline_runs WHERE run_id = ?",
    )
    .bind(run_id.to_string())
    .fetch_optional(pool)
    .await?;

    let Some(row) = row else {
        return Ok(None);
    };

    let state: String = row.get("state");
    let state = PipelineState::parse(&state)
        .ok_or_else(|| Error::Internal(format!("Unknown pipeline state '{}'", state)))?;
    let started_at: String = row.get("started_at");
    let ended_at: Option<String> = row.get("ended_at");

    Ok(Some(PipelineRun {
        run_id,
        state,
        root: row.get("root"),
        started_at: from_storage(&started_at)?,
        ended_at: ended_at.as_deref().map(from_storage).transpose()?,
        incomplete: row.get("incomplete"),
    }))
}
