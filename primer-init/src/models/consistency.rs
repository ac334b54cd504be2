//! Consistency check results

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// One finding. A finding is data, never an error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsistencyIssue {
    pub message: String,
    /// Paths, module ids or keys the finding refers to
    #[serde(default)]
    pub subjects: Vec<String>,
}

impl ConsistencyIssue {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            subjects: Vec::new(),
        }
    }

    pub fn with_subjects(message: impl Into<String>, subjects: Vec<String>) -> Self {
        Self {
            message: message.into(),
            subjects,
        }
    }
}

impl fmt::Display for ConsistencyIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionStatus {
    /// Check ran and found nothing
    Resolved,
    /// Check ran and found issues that need attention
    Pending,
    /// Check could not run
    Failed,
}

impl ResolutionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResolutionStatus::Resolved => "resolved",
            ResolutionStatus::Pending => "pending",
            ResolutionStatus::Failed => "failed",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "resolved" => Some(ResolutionStatus::Resolved),
            "pending" => Some(ResolutionStatus::Pending),
            "failed" => Some(ResolutionStatus::Failed),
            _ => None,
        }
    }
}

/// One row per check per run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsistencyCheckResult {
    pub check_type: String,
    pub issues_found: Vec<ConsistencyIssue>,
    pub resolution_status: ResolutionStatus,
    pub timestamp: DateTime<Utc>,
}

impl ConsistencyCheckResult {
    pub fn passed(&self) -> bool {
        self.resolution_status == ResolutionStatus::Resolved
    }
}
