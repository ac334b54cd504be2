//! Pipeline run state machine
//!
//! `Idle → Walking → Extracting → Aggregating → Initializing → Verifying → Scoring → Reported`
//!
//! Transitions only move forward. A cancelled run may jump ahead (straight to
//! Scoring) but can never go back, and nothing leaves `Reported`.

use crate::error::{PipelineError, PipelineResult};
use chrono::{DateTime, Utc};
use primer_common::events::PipelineState;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Recorded state change
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateTransition {
    pub run_id: Uuid,
    pub old_state: PipelineState,
    pub new_state: PipelineState,
    pub transitioned_at: DateTime<Utc>,
}

/// One invocation of the pipeline
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineRun {
    pub run_id: Uuid,
    pub state: PipelineState,
    pub root: String,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
    /// Set when cancellation cut the run short
    pub incomplete: bool,
}

impl PipelineRun {
    /// Fresh run with a new run id
    pub fn new(root: String) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            state: PipelineState::Idle,
            root,
            started_at: Utc::now(),
            ended_at: None,
            incomplete: false,
        }
    }

    /// Move forward to `new_state`
    pub fn transition_to(&mut self, new_state: PipelineState) -> PipelineResult<StateTransition> {
        if self.state.is_terminal() || new_state <= self.state {
            return Err(PipelineError::InvalidTransition {
                from: self.state,
                to: new_state,
            });
        }

        let transition = StateTransition {
            run_id: self.run_id,
            old_state: self.state,
            new_state,
            transitioned_at: Utc::now(),
        };
        self.state = new_state;

        if new_state.is_terminal() {
            self.ended_at = Some(transition.transitioned_at);
        }

        Ok(transition)
    }

    pub fn mark_incomplete(&mut self) {
        self.incomplete = true;
    }

    pub fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_run_starts_idle_with_unique_id() {
        let a = PipelineRun::new("/repo".to_string());
        let b = PipelineRun::new("/repo".to_string());
        assert_eq!(a.state, PipelineState::Idle);
        assert_ne!(a.run_id, b.run_id);
        assert!(a.ended_at.is_none());
    }

    #[test]
    fn test_full_forward_sequence() {
        let mut run = PipelineRun::new("/repo".to_string());
        for state in [
            PipelineState::Walking,
            PipelineState::Extracting,
            PipelineState::Aggregating,
            PipelineState::Initializing,
            PipelineState::Verifying,
            PipelineState::Scoring,
            PipelineState::Reported,
        ] {
            let transition = run.transition_to(state).unwrap();
            assert_eq!(transition.new_state, state);
        }
        assert!(run.is_terminal());
        assert!(run.ended_at.is_some());
    }

    #[test]
    fn test_backward_transition_rejected() {
        let mut run = PipelineRun::new("/repo".to_string());
        run.transition_to(PipelineState::Walking).unwrap();
        run.transition_to(PipelineState::Extracting).unwrap();
        let err = run.transition_to(PipelineState::Walking).unwrap_err();
        assert!(matches!(err, PipelineError::InvalidTransition { .. }));
        assert_eq!(run.state, PipelineState::Extracting);
    }

    #[test]
    fn test_self_transition_rejected() {
        let mut run = PipelineRun::new("/repo".to_string());
        run.transition_to(PipelineState::Walking).unwrap();
        assert!(run.transition_to(PipelineState::Walking).is_err());
    }

    #[test]
    fn test_forward_skip_allowed_for_cancellation() {
        let mut run = PipelineRun::new("/repo".to_string());
        run.transition_to(PipelineState::Walking).unwrap();
        run.transition_to(PipelineState::Extracting).unwrap();
        run.mark_incomplete();
        run.transition_to(PipelineState::Scoring).unwrap();
        run.transition_to(PipelineState::Reported).unwrap();
        assert!(run.incomplete);
    }

    #[test]
    fn test_reported_is_terminal() {
        let mut run = PipelineRun::new("/repo".to_string());
        run.transition_to(PipelineState::Reported).unwrap();
        assert!(run.transition_to(PipelineState::Reported).is_err());
    }
}
