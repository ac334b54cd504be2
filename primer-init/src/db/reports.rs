//! ReadinessReport persistence
//!
//! Reports are insert-only: a second insert for the same run id fails.

use super::{from_json, to_json};
use crate::models::ReadinessReport;
use primer_common::time::to_storage;
use primer_common::Result;
use sqlx::SqlitePool;
use uuid::Uuid;

pub async fn insert_report(pool: &SqlitePool, report: &ReadinessReport) -> Result<()> {
    let body = to_json(report, "readiness report")?;

    sqlx::query("INSERT INTO readiness_reports (run_id, report, created_at) VALUES (?, ?, ?)")
        .bind(report.run_id.to_string())
        .bind(&body)
        .bind(to_storage(&report.timestamp))
        .execute(pool)
        .await?;

    Ok(())
}

pub async fn load_report(pool: &SqlitePool, run_id: Uuid) -> Result<Option<ReadinessReport>> {
    let body: Option<String> = sqlx::query_scalar("SELECT report FROM readiness_reports WHERE run_id = ?")
        .bind(run_id.to_string())
        .fetch_optional(pool)
        .await?;

    body.map(|b| from_json(&b, "readiness report")).transpose()
}

/// Most recently created report, if any
pub async fn load_latest_report(pool: &SqlitePool) -> Result<Option<ReadinessReport>> {
    let body: Option<String> = sqlx::query_scalar(
        "SELECT report FROM readiness_reports ORDER BY created_at DESC, rowid DESC LIMIT 1",
    )
    .fetch_optional(pool)
    .await?;

    body.map(|b| from_json(&b, "readiness report")).transpose()
}
