//! Config conflicts: the same key with different values in different files
//!
//! For each key the first path (in path order) sets the baseline. Every
//! further distinct value yields one issue naming both paths. Values of
//! secret-looking keys are redacted.

use super::{CheckError, ConsistencyCheck, VerificationInput};
use crate::models::ConsistencyIssue;
use crate::services::content_extractor::is_secret_key;
use serde_json::Value;
use std::collections::BTreeMap;

pub struct ConfigConflictCheck;

const REDACTED: &str = "<redacted>";

fn display_value(key: &str, value: &Value) -> String {
    if is_secret_key(key) {
        return REDACTED.to_string();
    }
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

impl ConsistencyCheck for ConfigConflictCheck {
    fn check_type(&self) -> &'static str {
        "config_conflict"
    }

    fn run(&self, input: &VerificationInput<'_>) -> Result<Vec<ConsistencyIssue>, CheckError> {
        let mut records: Vec<_> = input.file_records.iter().collect();
        records.sort_by(|a, b| a.path.cmp(&b.path));

        // key -> distinct values with the first path that declared each
        let mut seen: BTreeMap<&str, Vec<(&Value, &str)>> = BTreeMap::new();
        for record in records {
            for (key, value) in &record.extracted_facts.configs {
                let values = seen.entry(key.as_str()).or_default();
                if !values.iter().any(|(v, _)| *v == value) {
                    values.push((value, record.path.as_str()));
                }
            }
        }

        let mut issues = Vec::new();
        for (key, values) in seen {
            let Some(((baseline_value, baseline_path), others)) = values.split_first() else {
                continue;
            };
            for (value, path) in others {
                issues.push(ConsistencyIssue::with_subjects(
                    format!(
                        "config key '{}' is {} in {} but {} in {}",
                        key,
                        display_value(key, baseline_value),
                        baseline_path,
                        display_value(key, value),
                        path
                    ),
                    vec![key.to_string(), baseline_path.to_string(), path.to_string()],
                ));
            }
        }

        Ok(issues)
    }
}
