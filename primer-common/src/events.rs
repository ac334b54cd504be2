//! Pipeline event types and broadcast bus
//!
//! The coordinator emits an event on every phase transition and per finished
//! file. Observers (CLI progress, tests) subscribe; having no subscriber is
//! never an error.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::sync::broadcast;
use uuid::Uuid;

/// Pipeline state machine
///
/// `Idle → Walking → Extracting → Aggregating → Initializing → Verifying → Scoring → Reported`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineState {
    Idle,
    Walking,
    Extracting,
    Aggregating,
    Initializing,
    Verifying,
    Scoring,
    Reported,
}

impl PipelineState {
    /// Stable storage/display name
    pub fn as_str(&self) -> &'static str {
        match self {
            PipelineState::Idle => "idle",
            PipelineState::Walking => "walking",
            PipelineState::Extracting => "extracting",
            PipelineState::Aggregating => "aggregating",
            PipelineState::Initializing => "initializing",
            PipelineState::Verifying => "verifying",
            PipelineState::Scoring => "scoring",
            PipelineState::Reported => "reported",
        }
    }

    /// Parse a stored name
    pub fn parse(value: &str) -> Option<Self> {
        let state = match value {
            "idle" => PipelineState::Idle,
            "walking" => PipelineState::Walking,
            "extracting" => PipelineState::Extracting,
            "aggregating" => PipelineState::Aggregating,
            "initializing" => PipelineState::Initializing,
            "verifying" => PipelineState::Verifying,
            "scoring" => PipelineState::Scoring,
            "reported" => PipelineState::Reported,
            _ => return None,
        };
        Some(state)
    }

    /// `Reported` is the only terminal state
    pub fn is_terminal(&self) -> bool {
        matches!(self, PipelineState::Reported)
    }
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Events emitted while a run progresses
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum PipelineEvent {
    RunStarted {
        run_id: Uuid,
        root: String,
        timestamp: DateTime<Utc>,
    },
    PhaseChanged {
        run_id: Uuid,
        from: PipelineState,
        to: PipelineState,
        timestamp: DateTime<Utc>,
    },
    FileExtracted {
        run_id: Uuid,
        path: String,
        status: String,
        timestamp: DateTime<Utc>,
    },
    RunReported {
        run_id: Uuid,
        overall_score: f64,
        approval_required: bool,
        incomplete: bool,
        timestamp: DateTime<Utc>,
    },
}

/// Broadcast bus for [`PipelineEvent`]s
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<PipelineEvent>,
}

impl EventBus {
    /// Creates a new EventBus buffering up to `capacity` events per slow subscriber
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Subscribe to all future events
    pub fn subscribe(&self) -> broadcast::Receiver<PipelineEvent> {
        self.tx.subscribe()
    }

    /// Emit an event, ignoring the absence of subscribers
    pub fn emit_lossy(&self, event: PipelineEvent) {
        let _ = self.tx.send(event);
    }
}
