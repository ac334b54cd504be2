//! FileRecord persistence
//!
//! Records are upserted by path and never deleted: a file that disappears
//! keeps its last record.

use super::{from_json, to_json};
use crate::models::{FileCategory, FileRecord, FileStatus};
use crate::utils::retry_on_lock;
use primer_common::time::{from_storage, to_storage};
use primer_common::{Error, Result};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};

/// Insert or overwrite the record for `record.path`
pub async fn upsert_file_record(pool: &SqlitePool, record: &FileRecord) -> Result<()> {
    let facts = to_json(&record.extracted_facts, "extracted facts")?;

    sqlx::query(
        r#"
        INSERT INTO file_records (path, size, category, content_hash, extracted_facts, status, timestamp)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT(path) DO UPDATE SET
            size = excluded.size,
            category = excluded.category,
            content_hash = excluded.content_hash,
            extracted_facts = excluded.extracted_facts,
            status = excluded.status,
            timestamp = excluded.timestamp
        "#,
    )
    .bind(&record.path)
    .bind(record.size as i64)
    .bind(record.category.as_str())
    .bind(&record.content_hash)
    .bind(&facts)
    .bind(record.status.as_str())
    .bind(to_storage(&record.timestamp))
    .execute(pool)
    .await?;

    Ok(())
}

/// Upsert with lock-contention retry, used by concurrent extraction workers
pub async fn save_file_record(pool: &SqlitePool, record: &FileRecord, max_wait_ms: u64) -> Result<()> {
    retry_on_lock("save_file_record", max_wait_ms, || upsert_file_record(pool, record)).await
}

/// Load one record by path
pub async fn load_file_record(pool: &SqlitePool, path: &str) -> Result<Option<FileRecord>> {
    let row = sqlx::query(
        r#"
        SELECT path, size, category, content_hash, extracted_facts, status, timestamp
        FROM file_records
        WHERE path = ?
        "#,
    )
    .bind(path)
    .fetch_optional(pool)
    .await?;

    row.map(|r| record_from_row(&r)).transpose()
}

/// Load every persisted record in path order
pub async fn load_all_file_records(pool: &SqlitePool) -> Result<Vec<FileRecord>> {
    let rows = sqlx::query(
        r#"
        SELECT path, size, category, content_hash, extracted_facts, status, timestamp
        FROM file_records
        ORDER BY path
        "#,
    )
    .fetch_all(pool)
    .await?;

    rows.iter().map(record_from_row).collect()
}

/// Number of persisted records
pub async fn count_file_records(pool: &SqlitePool) -> Result<i64> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM file_records")
        .fetch_one(pool)
        .await?;
    Ok(count)
}

fn record_from_row(row: &SqliteRow) -> Result<FileRecord> {
    let category: String = row.get("category");
    let category = FileCategory::parse(&category)
        .ok_or_else(|| Error::Internal(format!("Unknown file category '{}'", category)))?;

    let status: String = row.get("status");
    let status = FileStatus::parse(&status)
        .ok_or_else(|| Error::Internal(format!("Unknown file status '{}'", status)))?;

    let facts: String = row.get("extracted_facts");
    let timestamp: String = row.get("timestamp");
    let size: i64 = row.get("size");

    Ok(FileRecord {
        path: row.get("path"),
        size: size.max(0) as u64,
        category,
        content_hash: row.get("content_hash"),
        extracted_facts: from_json(&facts, "extracted facts")?,
        status,
        timestamp: from_storage(&timestamp)?,
    })
}
