//! ModuleState: lifecycle record for one registry entry

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

/// Closed set of subsystem modules the pipeline can bring up
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModuleKind {
    Storage,
    Security,
    MemoryCore,
    KnowledgeIndex,
    Integrations,
    Orchestrator,
    Reporting,
}

impl ModuleKind {
    pub const ALL: [ModuleKind; 7] = [
        ModuleKind::Storage,
        ModuleKind::Security,
        ModuleKind::MemoryCore,
        ModuleKind::KnowledgeIndex,
        ModuleKind::Integrations,
        ModuleKind::Orchestrator,
        ModuleKind::Reporting,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ModuleKind::Storage => "storage",
            ModuleKind::Security => "security",
            ModuleKind::MemoryCore => "memory_core",
            ModuleKind::KnowledgeIndex => "knowledge_index",
            ModuleKind::Integrations => "integrations",
            ModuleKind::Orchestrator => "orchestrator",
            ModuleKind::Reporting => "reporting",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|k| k.as_str() == value)
    }
}

impl fmt::Display for ModuleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModuleStatus {
    Uninitialized,
    Initializing,
    Initialized,
    Failed,
}

impl ModuleStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ModuleStatus::Uninitialized => "uninitialized",
            ModuleStatus::Initializing => "initializing",
            ModuleStatus::Initialized => "initialized",
            ModuleStatus::Failed => "failed",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "uninitialized" => Some(ModuleStatus::Uninitialized),
            "initializing" => Some(ModuleStatus::Initializing),
            "initialized" => Some(ModuleStatus::Initialized),
            "failed" => Some(ModuleStatus::Failed),
            _ => None,
        }
    }
}

impl fmt::Display for ModuleStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthStatus {
    Healthy,
    Unknown,
}

/// Static health snapshot taken at initialization time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthSnapshot {
    pub status: HealthStatus,
    pub last_checked_at: Option<DateTime<Utc>>,
}

impl HealthSnapshot {
    pub fn unknown() -> Self {
        Self {
            status: HealthStatus::Unknown,
            last_checked_at: None,
        }
    }

    pub fn healthy_at(timestamp: DateTime<Utc>) -> Self {
        Self {
            status: HealthStatus::Healthy,
            last_checked_at: Some(timestamp),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModuleState {
    pub module_id: ModuleKind,
    pub status: ModuleStatus,
    pub dependencies: Vec<ModuleKind>,
    pub config: BTreeMap<String, Value>,
    pub health: HealthSnapshot,
    pub last_updated: DateTime<Utc>,
}

impl ModuleState {
    /// Fresh state for a run: uninitialized, no config, unknown health
    pub fn uninitialized(module_id: ModuleKind, dependencies: Vec<ModuleKind>) -> Self {
        Self {
            module_id,
            status: ModuleStatus::Uninitialized,
            dependencies,
            config: BTreeMap::new(),
            health: HealthSnapshot::unknown(),
            last_updated: Utc::now(),
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.status == ModuleStatus::Initialized
    }
}
