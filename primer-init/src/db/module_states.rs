//! ModuleState persistence

use super::{from_json, to_json};
use crate::models::{ModuleKind, ModuleState, ModuleStatus};
use primer_common::time::{from_storage, to_storage};
use primer_common::{Error, Result};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};

/// Insert or overwrite the state row for `state.module_id`
pub async fn save_module_state(pool: &SqlitePool, state: &ModuleState) -> Result<()> {
    let dependencies = to_json(&state.dependencies, "module dependencies")?;
    let config = to_json(&state.config, "module config")?;
    let health = to_json(&state.health, "module health")?;

    sqlx::query(
        r#"
        INSERT INTO module_states (module_id, status, dependencies, config, health, last_updated)
        VALUES (?, ?, ?, ?, ?, ?)
        ON CONFLICT(module_id) DO UPDATE SET
            status = excluded.status,
            dependencies = excluded.dependencies,
            config = excluded.config,
            health = excluded.health,
            last_updated = excluded.last_updated
        "#,
    )
    .bind(state.module_id.as_str())
    .bind(state.status.as_str())
    .bind(&dependencies)
    .bind(&config)
    .bind(&health)
    .bind(to_storage(&state.last_updated))
    .execute(pool)
    .await?;

    Ok(())
}

pub async fn load_module_state(pool: &SqlitePool, module_id: ModuleKind) -> Result<Option<ModuleState>> {
    let row = sqlx::query(
        "SELECT module_id, status, dependencies, config, health, last_updated FROM module_states WHERE module_id = ?",
    )
    .bind(module_id.as_str())
    .fetch_optional(pool)
    .await?;

    row.map(|r| state_from_row(&r)).transpose()
}

pub async fn load_module_states(pool: &SqlitePool) -> Result<Vec<ModuleState>> {
    let rows = sqlx::query(
        "SELECT module_id, status, dependencies, config, health, last_updated FROM module_states ORDER BY module_id",
    )
    .fetch_all(pool)
    .await?;

    rows.iter().map(state_from_row).collect()
}

fn state_from_row(row: &SqliteRow) -> Result<ModuleState> {
    let module_id: String = row.get("module_id");
    let module_id = ModuleKind::parse(&module_id)
        .ok_or_else(|| Error::Internal(format!("Unknown module id '{}'", module_id)))?;

    let status: String = row.get("status");
    let status = ModuleStatus::parse(&status)
        .ok_or_else(|| Error::Internal(format!("Unknown module status '{}'", status)))?;

    let dependencies: String = row.get("dependencies");
    let config: String = row.get("config");
    let health: String = row.get("health");
    let last_updated: String = row.get("last_updated");

    Ok(ModuleState {
        module_id,
        status,
        dependencies: from_json(&dependencies, "module dependencies")?,
        config: from_json(&config, "module config")?,
        health: from_json(&health, "module health")?,
        last_updated: from_storage(&last_updated)?,
    })
}
