//! Memory aggregation
//!
//! Folds every [`FileRecord`]'s facts into named aggregates keyed by
//! `(type, name)`:
//! - `all`: union across every file
//! - one per contributing [`FileCategory`] (by its snake_case name)
//!
//! List aggregates are sorted, de-duplicated string arrays. The configuration
//! aggregate is a key→value map where the last file in path order wins.
//! Recomputing from the same records always yields the same set.

use crate::db;
use crate::models::{FileCategory, FileRecord, StructureType, ALL_FILES};
use once_cell::sync::Lazy;
use primer_common::Result;
use serde_json::Value;
use sqlx::SqlitePool;
use std::collections::{BTreeMap, BTreeSet};
use tokio::sync::Mutex;

/// Serializes aggregate rewrites within the process
static AGGREGATE_WRITE_LOCK: Lazy<Mutex<()>> = Lazy::new(|| Mutex::new(()));

/// Read-only view of one computed aggregate set
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AggregateSet {
    entries: BTreeMap<(StructureType, String), Value>,
}

impl AggregateSet {
    pub fn get(&self, structure_type: StructureType, name: &str) -> Option<&Value> {
        self.entries.get(&(structure_type, name.to_string()))
    }

    /// Names present for a type, `all` included
    pub fn names(&self, structure_type: StructureType) -> Vec<&str> {
        self.entries
            .keys()
            .filter(|(t, _)| *t == structure_type)
            .map(|(_, name)| name.as_str())
            .collect()
    }

    /// String list for a list-typed aggregate; empty when absent
    pub fn list(&self, structure_type: StructureType, name: &str) -> Vec<String> {
        self.get(structure_type, name)
            .and_then(Value::as_array)
            .map(|items| items.iter().filter_map(|v| v.as_str().map(str::to_string)).collect())
            .unwrap_or_default()
    }

    /// The merged configuration map across all files
    pub fn config_map(&self) -> BTreeMap<String, Value> {
        self.get(StructureType::Configuration, ALL_FILES)
            .and_then(Value::as_object)
            .map(|map| map.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
            .unwrap_or_default()
    }

    pub fn strategies(&self) -> Vec<String> {
        self.list(StructureType::Strategies, ALL_FILES)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn to_rows(&self) -> Vec<(StructureType, String, Value)> {
        self.entries
            .iter()
            .map(|((t, name), payload)| (*t, name.clone(), payload.clone()))
            .collect()
    }
}

#[derive(Default)]
struct Accumulator {
    lists: BTreeMap<(StructureType, String), BTreeSet<String>>,
    configs: BTreeMap<String, BTreeMap<String, Value>>,
}

impl Accumulator {
    fn add_list(&mut self, structure_type: StructureType, category: FileCategory, items: &[String]) {
        if items.is_empty() {
            return;
        }
        for name in [ALL_FILES, category.as_str()] {
            self.lists
                .entry((structure_type, name.to_string()))
                .or_default()
                .extend(items.iter().cloned());
        }
    }

    fn add_configs(&mut self, category: FileCategory, configs: &BTreeMap<String, Value>) {
        if configs.is_empty() {
            return;
        }
        for name in [ALL_FILES, category.as_str()] {
            let target = self.configs.entry(name.to_string()).or_default();
            for (key, value) in configs {
                target.insert(key.clone(), value.clone());
            }
        }
    }
}

/// Pure fold over records; callers pass records in path order
pub fn compute_aggregates(records: &[FileRecord]) -> AggregateSet {
    let mut sorted: Vec<&FileRecord> = records.iter().collect();
    sorted.sort_by(|a, b| a.path.cmp(&b.path));

    let mut acc = Accumulator::default();
    for record in sorted {
        let facts = &record.extracted_facts;
        acc.add_list(StructureType::Requirements, record.category, &facts.requirements);
        acc.add_list(StructureType::Strategies, record.category, &facts.strategies);
        acc.add_list(StructureType::IntegrationPoints, record.category, &facts.integration_points);
        acc.add_configs(record.category, &facts.configs);
    }

    let mut entries = BTreeMap::new();

    // `all` always exists so readers never special-case an empty store
    for structure_type in [
        StructureType::Requirements,
        StructureType::Strategies,
        StructureType::IntegrationPoints,
    ] {
        entries.insert((structure_type, ALL_FILES.to_string()), Value::Array(Vec::new()));
    }
    entries.insert(
        (StructureType::Configuration, ALL_FILES.to_string()),
        Value::Object(serde_json::Map::new()),
    );

    for (key, items) in acc.lists {
        entries.insert(key, Value::Array(items.into_iter().map(Value::String).collect()));
    }
    for (name, map) in acc.configs {
        entries.insert(
            (StructureType::Configuration, name),
            Value::Object(map.into_iter().collect()),
        );
    }

    AggregateSet { entries }
}

/// Recomputes and persists the aggregate set
pub struct MemoryAggregator {
    db: SqlitePool,
}

impl MemoryAggregator {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    /// Full recompute from every stored record
    ///
    /// Holds the process-wide write lock for the whole read-compute-write
    /// cycle; the rewrite itself is a single transaction.
    pub async fn recompute(&self) -> Result<AggregateSet> {
        let _guard = AGGREGATE_WRITE_LOCK.lock().await;

        let records = db::load_all_file_records(&self.db).await?;
        let aggregates = compute_aggregates(&records);
        db::replace_all_structures(&self.db, &aggregates.to_rows(), primer_common::time::now()).await?;

        tracing::info!(
            files = records.len(),
            aggregates = aggregates.len(),
            "Recomputed memory aggregates"
        );
        Ok(aggregates)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ExtractedFacts, FileStatus};
    use chrono::Utc;
    use serde_json::json;

    fn record(path: &str, category: FileCategory, facts: ExtractedFacts) -> FileRecord {
        FileRecord {
            path: path.to_string(),
            size: 1,
            category,
            content_hash: String::new(),
            extracted_facts: facts,
            status: FileStatus::Completed,
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn test_empty_input_still_has_all_entries() {
        let set = compute_aggregates(&[]);
        assert_eq!(set.len(), 4);
        assert!(set.strategies().is_empty());
        assert!(set.config_map().is_empty());
        assert_eq!(set.names(StructureType::Requirements), vec!["all"]);
    }

    #[test]
    fn test_lists_are_unioned_sorted_and_deduplicated() {
        let a = record(
            "a.md",
            FileCategory::Documentation,
            ExtractedFacts {
                requirements: vec!["must b".into(), "must a".into()],
                ..Default::default()
            },
        );
        let b = record(
            "src/b.rs",
            FileCategory::SourceCode,
            ExtractedFacts {
                requirements: vec!["must a".into(), "must c".into()],
                ..Default::default()
            },
        );

        let set = compute_aggregates(&[b, a]);
        assert_eq!(
            set.list(StructureType::Requirements, ALL_FILES),
            vec!["must a", "must b", "must c"]
        );
        assert_eq!(
            set.list(StructureType::Requirements, "documentation"),
            vec!["must a", "must b"]
        );
        assert_eq!(
            set.names(StructureType::Requirements),
            vec!["all", "documentation", "source_code"]
        );
        // categories without facts do not produce an aggregate
        assert!(set.get(StructureType::Strategies, "documentation").is_none());
    }

    #[test]
    fn test_config_last_path_wins() {
        let first = record(
            "a/app.json",
            FileCategory::Configuration,
            ExtractedFacts {
                configs: [("port".to_string(), json!(8080))].into_iter().collect(),
                ..Default::default()
            },
        );
        let second = record(
            "b/app.json",
            FileCategory::Configuration,
            ExtractedFacts {
                configs: [("port".to_string(), json!(9090))].into_iter().collect(),
                ..Default::default()
            },
        );

        let forward = compute_aggregates(&[first.clone(), second.clone()]);
        let reversed = compute_aggregates(&[second, first]);
        assert_eq!(forward, reversed);
        assert_eq!(forward.config_map().get("port"), Some(&json!(9090)));
    }
}
