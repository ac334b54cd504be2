//! MemoryStructure persistence
//!
//! The aggregate set is replaced as a whole inside one transaction so a
//! reader never observes a half-recomputed set.

use super::{from_json, to_json};
use crate::models::{MemoryStructure, StructureType};
use chrono::{DateTime, Utc};
use primer_common::time::{from_storage, to_storage};
use primer_common::{Error, Result};
use serde_json::Value;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use std::collections::HashSet;

/// Replace the full aggregate set
///
/// Existing `(type, name)` rows keep their `created_at`; rows not present in
/// `structures` are removed.
pub async fn replace_all_structures(
    pool: &SqlitePool,
    structures: &[(StructureType, String, Value)],
    now: DateTime<Utc>,
) -> Result<()> {
    let stamp = to_storage(&now);
    let mut tx = pool.begin().await?;

    for (structure_type, name, payload) in structures {
        let payload = to_json(payload, "memory structure payload")?;
        sqlx::query(
            r#"
            INSERT INTO memory_structures (type, name, payload, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?)
            ON CONFLICT(type, name) DO UPDATE SET
                payload = excluded.payload,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(structure_type.as_str())
        .bind(name)
        .bind(&payload)
        .bind(&stamp)
        .bind(&stamp)
        .execute(&mut *tx)
        .await?;
    }

    let keep: HashSet<(String, String)> = structures
        .iter()
        .map(|(t, n, _)| (t.as_str().to_string(), n.clone()))
        .collect();

    let existing: Vec<(String, String)> = sqlx::query_as("SELECT type, name FROM memory_structures")
        .fetch_all(&mut *tx)
        .await?;

    for key in existing {
        if !keep.contains(&key) {
            let (structure_type, name) = key;
            sqlx::query("DELETE FROM memory_structures WHERE type = ? AND name = ?")
                .bind(&structure_type)
                .bind(&name)
                .execute(&mut *tx)
                .await?;
        }
    }

    tx.commit().await?;
    Ok(())
}

pub async fn load_structure(
    pool: &SqlitePool,
    structure_type: StructureType,
    name: &str,
) -> Result<Option<MemoryStructure>> {
    let row = sqlx::query(
        "SELECT type, name, payload, created_at, updated_at FROM memory_structures WHERE type = ? AND name = ?",
    )
    .bind(structure_type.as_str())
    .bind(name)
    .fetch_optional(pool)
    .await?;

    row.map(|r| structure_from_row(&r)).transpose()
}

/// All aggregates ordered by `(type, name)`
pub async fn load_all_structures(pool: &SqlitePool) -> Result<Vec<MemoryStructure>> {
    let rows = sqlx::query(
        "SELECT type, name, payload, created_at, updated_at FROM memory_structures ORDER BY type, name",
    )
    .fetch_all(pool)
    .await?;

    rows.iter().map(structure_from_row).collect()
}

fn structure_from_row(row: &SqliteRow) -> Result<MemoryStructure> {
    let structure_type: String = row.get("type");
    let structure_type = StructureType::parse(&structure_type)
        .ok_or_else(|| Error::Internal(format!("Unknown structure type '{}'", structure_type)))?;
    let payload: String = row.get("payload");
    let created_at: String = row.get("created_at");
    let updated_at: String = row.get("updated_at");

    Ok(MemoryStructure {
        structure_type,
        name: row.get("name"),
        payload: from_json(&payload, "memory structure payload")?,
        created_at: from_storage(&created_at)?,
        updated_at: from_storage(&updated_at)?,
    })
}
