//! ConsistencyCheckResult persistence (one row per check per run)

use super::{from_json, to_json};
use crate::models::{ConsistencyCheckResult, ResolutionStatus};
use primer_common::time::{from_storage, to_storage};
use primer_common::{Error, Result};
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

pub async fn insert_check_result(
    pool: &SqlitePool,
    run_id: Uuid,
    result: &ConsistencyCheckResult,
) -> Result<()> {
    let issues = to_json(&result.issues_found, "consistency issues")?;

    sqlx::query(
        r#"
        INSERT INTO consistency_checks (run_id, check_type, issues, resolution_status, timestamp)
        VALUES (?, ?, ?, ?, ?)
        "#,
    )
    .bind(run_id.to_string())
    .bind(&result.check_type)
    .bind(&issues)
    .bind(result.resolution_status.as_str())
    .bind(to_storage(&result.timestamp))
    .execute(pool)
    .await?;

    Ok(())
}

/// Results of one run in execution order
pub async fn load_check_results(pool: &SqlitePool, run_id: Uuid) -> Result<Vec<ConsistencyCheckResult>> {
    let rows = sqlx::query(
        r#"
        SELECT check_type, issues, resolution_status, timestamp
        FROM consistency_checks
        WHERE run_id = ?
        ORDER BY id
        "#,
    )
    .bind(run_id.to_string())
    .fetch_all(pool)
    .await?;

    rows.iter()
        .map(|row| {
            let status: String = row.get("resolution_status");
            let resolution_status = ResolutionStatus::parse(&status)
                .ok_or_else(|| Error::Internal(format!("Unknown resolution status '{}'", status)))?;
            let issues: String = row.get("issues");
            let timestamp: String = row.get("timestamp");
            Ok(ConsistencyCheckResult {
                check_type: row.get("check_type"),
                issues_found: from_json(&issues, "consistency issues")?,
                resolution_status,
                timestamp: from_storage(&timestamp)?,
            })
        })
        .collect()
}
