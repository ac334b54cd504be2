//! Store access for primer-init
//!
//! Four pipeline tables (file_records, module_states, memory_structures,
//! consistency_checks) plus run bookkeeping (pipeline_runs,
//! readiness_reports). Every write is a single statement or a short
//! transaction.

pub mod consistency_checks;
pub mod file_records;
pub mod memory_structures;
pub mod module_states;
pub mod reports;
pub mod runs;

pub use consistency_checks::{insert_check_result, load_check_results};
pub use file_records::{
    count_file_records, load_all_file_records, load_file_record, save_file_record,
    upsert_file_record,
};
pub use memory_structures::{load_all_structures, load_structure, replace_all_structures};
pub use module_states::{load_module_state, load_module_states, save_module_state};
pub use reports::{insert_report, load_latest_report, load_report};
pub use runs::{load_run, save_run};

use primer_common::{Error, Result};
use sqlx::SqlitePool;
use std::path::Path;

/// Open (or create) the store and ensure the schema exists
pub async fn init_database_pool(db_path: &Path) -> Result<SqlitePool> {
    primer_common::db::init_database(db_path).await
}

pub(crate) fn to_json<T: serde::Serialize>(value: &T, what: &str) -> Result<String> {
    serde_json::to_string(value)
        .map_err(|e| Error::Internal(format!("Failed to serialize {}: {}", what, e)))
}

pub(crate) fn from_json<T: serde::de::DeserializeOwned>(value: &str, what: &str) -> Result<T> {
    serde_json::from_str(value)
        .map_err(|e| Error::Internal(format!("Failed to deserialize {}: {}", what, e)))
}
