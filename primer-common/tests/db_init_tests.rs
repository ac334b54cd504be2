//! Database bootstrap tests

use primer_common::db::{create_schema, init_database, SCHEMA_VERSION};
use tempfile::TempDir;

async fn table_names(pool: &sqlx::SqlitePool) -> Vec<String> {
    sqlx::query_scalar::<_, String>(
        "SELECT name FROM sqlite_master WHERE type='table' AND name NOT LIKE 'sqlite_%' ORDER BY name",
    )
    .fetch_all(pool)
    .await
    .unwrap()
}

#[tokio::test]
async fn test_init_creates_database_and_all_tables() {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("nested").join("primer.db");

    let pool = init_database(&db_path).await.unwrap();
    assert!(db_path.exists());

    let tables = table_names(&pool).await;
    for expected in [
        "consistency_checks",
        "file_records",
        "memory_structures",
        "module_states",
        "pipeline_runs",
        "readiness_reports",
        "schema_version",
    ] {
        assert!(tables.contains(&expected.to_string()), "missing table {}", expected);
    }

    let version: i64 = sqlx::query_scalar("SELECT MAX(version) FROM schema_version")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(version, SCHEMA_VERSION);
}

#[tokio::test]
async fn test_init_is_idempotent() {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("primer.db");

    let pool = init_database(&db_path).await.unwrap();
    sqlx::query(
        "INSERT INTO file_records (path, size, category, content_hash, status, timestamp) VALUES ('a.md', 1, 'documentation', 'h', 'completed', 't')",
    )
    .execute(&pool)
    .await
    .unwrap();

    create_schema(&pool).await.unwrap();
    drop(pool);

    let reopened = init_database(&db_path).await.unwrap();
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM file_records")
        .fetch_one(&reopened)
        .await
        .unwrap();
    assert_eq!(count, 1, "re-initialization must not drop data");
}
