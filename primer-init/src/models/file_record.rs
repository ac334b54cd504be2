//! FileRecord: persisted metadata and extracted facts for one walked path

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

/// File classification derived from name/extension
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileCategory {
    SourceCode,
    Configuration,
    Documentation,
    Data,
    Credentials,
    Logs,
    Assets,
    Build,
    Other,
}

impl FileCategory {
    pub const ALL: [FileCategory; 9] = [
        FileCategory::SourceCode,
        FileCategory::Configuration,
        FileCategory::Documentation,
        FileCategory::Data,
        FileCategory::Credentials,
        FileCategory::Logs,
        FileCategory::Assets,
        FileCategory::Build,
        FileCategory::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FileCategory::SourceCode => "source_code",
            FileCategory::Configuration => "configuration",
            FileCategory::Documentation => "documentation",
            FileCategory::Data => "data",
            FileCategory::Credentials => "credentials",
            FileCategory::Logs => "logs",
            FileCategory::Assets => "assets",
            FileCategory::Build => "build",
            FileCategory::Other => "other",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|c| c.as_str() == value)
    }

    /// Categories whose full text is read during the walk
    pub fn reads_full_text(&self) -> bool {
        matches!(
            self,
            FileCategory::SourceCode
                | FileCategory::Configuration
                | FileCategory::Documentation
                | FileCategory::Credentials
                | FileCategory::Logs
                | FileCategory::Build
        )
    }
}

impl fmt::Display for FileCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-file processing status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileStatus {
    Pending,
    Completed,
    ExtractionFailed,
    Skipped,
}

impl FileStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            FileStatus::Pending => "pending",
            FileStatus::Completed => "completed",
            FileStatus::ExtractionFailed => "extraction_failed",
            FileStatus::Skipped => "skipped",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "pending" => Some(FileStatus::Pending),
            "completed" => Some(FileStatus::Completed),
            "extraction_failed" => Some(FileStatus::ExtractionFailed),
            "skipped" => Some(FileStatus::Skipped),
            _ => None,
        }
    }
}

impl fmt::Display for FileStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Structured facts produced by a ContentExtractor
///
/// Field names on the wire follow the extractor contract
/// (`integrationPoints` in camelCase).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractedFacts {
    #[serde(default)]
    pub requirements: Vec<String>,
    #[serde(default)]
    pub strategies: Vec<String>,
    #[serde(default)]
    pub configs: BTreeMap<String, Value>,
    #[serde(default, alias = "integration_points")]
    pub integration_points: Vec<String>,
}

impl ExtractedFacts {
    pub fn is_empty(&self) -> bool {
        self.requirements.is_empty()
            && self.strategies.is_empty()
            && self.configs.is_empty()
            && self.integration_points.is_empty()
    }
}

/// Persisted record for one root-relative path
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileRecord {
    /// Root-relative path with `/` separators (unique key)
    pub path: String,
    pub size: u64,
    pub category: FileCategory,
    /// Hex SHA-256 over whatever bytes were read; empty when nothing was read
    pub content_hash: String,
    pub extracted_facts: ExtractedFacts,
    pub status: FileStatus,
    pub timestamp: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_names_round_trip() {
        for category in FileCategory::ALL {
            assert_eq!(FileCategory::parse(category.as_str()), Some(category));
        }
        assert_eq!(FileCategory::parse("spreadsheets"), None);
    }

    #[test]
    fn test_full_text_categories() {
        assert!(FileCategory::Credentials.reads_full_text());
        assert!(FileCategory::Build.reads_full_text());
        assert!(!FileCategory::Data.reads_full_text());
        assert!(!FileCategory::Assets.reads_full_text());
        assert!(!FileCategory::Other.reads_full_text());
    }

    #[test]
    fn test_facts_wire_format_uses_camel_case() {
        let facts = ExtractedFacts {
            integration_points: vec!["https://api.example.com".to_string()],
            ..Default::default()
        };
        let json = serde_json::to_value(&facts).unwrap();
        assert!(json.get("integrationPoints").is_some());

        let parsed: ExtractedFacts =
            serde_json::from_str(r#"{"integration_points": ["x"], "requirements": ["r"]}"#).unwrap();
        assert_eq!(parsed.integration_points, vec!["x".to_string()]);
        assert!(parsed.strategies.is_empty());
    }

    #[test]
    fn test_missing_fields_default_to_empty() {
        let parsed: ExtractedFacts = serde_json::from_str("{}").unwrap();
        assert!(parsed.is_empty());
    }
}
