//! MemoryStructure: a named, typed aggregate over all FileRecords

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Aggregate type (first half of the `(type, name)` key)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StructureType {
    Requirements,
    Strategies,
    IntegrationPoints,
    Configuration,
}

impl StructureType {
    pub const ALL: [StructureType; 4] = [
        StructureType::Requirements,
        StructureType::Strategies,
        StructureType::IntegrationPoints,
        StructureType::Configuration,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            StructureType::Requirements => "requirements",
            StructureType::Strategies => "strategies",
            StructureType::IntegrationPoints => "integration_points",
            StructureType::Configuration => "configuration",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|t| t.as_str() == value)
    }
}

impl fmt::Display for StructureType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Name of the aggregate spanning every file
pub const ALL_FILES: &str = "all";

/// Persisted aggregate
///
/// List types carry a sorted JSON array of unique strings, `configuration`
/// carries a JSON object keyed by config key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryStructure {
    pub structure_type: StructureType,
    pub name: String,
    pub payload: Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
