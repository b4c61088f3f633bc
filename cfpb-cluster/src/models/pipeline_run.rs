//! Clustering pipeline state machine
//!
//! A run progresses forward only:
//! RAW → CACHED_OR_NORMALIZED → VECTORIZED → K_SELECTED → CLUSTERED →
//! SUMMARIZED → LABELED → PERSISTED
//!
//! Any state may move to FAILED. PERSISTED and FAILED are terminal.

use crate::error::{ClusterError, ClusterResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

/// Pipeline stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PipelineState {
    /// Raw complaint table loaded (or about to be)
    Raw,
    /// Lemmas loaded from cache or freshly computed
    CachedOrNormalized,
    /// TF-IDF matrix built
    Vectorized,
    /// Cluster count chosen
    KSelected,
    /// Final k-means model fitted
    Clustered,
    /// Keywords and examples derived per cluster
    Summarized,
    /// Every cluster named
    Labeled,
    /// Output table written
    Persisted,
    /// Run aborted
    Failed,
}

impl PipelineState {
    /// Check if state is terminal
    pub fn is_terminal(self) -> bool {
        matches!(self, PipelineState::Persisted | PipelineState::Failed)
    }

    /// The single forward successor, if any
    pub fn next(self) -> Option<PipelineState> {
        match self {
            PipelineState::Raw => Some(PipelineState::CachedOrNormalized),
            PipelineState::CachedOrNormalized => Some(PipelineState::Vectorized),
            PipelineState::Vectorized => Some(PipelineState::KSelected),
            PipelineState::KSelected => Some(PipelineState::Clustered),
            PipelineState::Clustered => Some(PipelineState::Summarized),
            PipelineState::Summarized => Some(PipelineState::Labeled),
            PipelineState::Labeled => Some(PipelineState::Persisted),
            PipelineState::Persisted | PipelineState::Failed => None,
        }
    }
}

/// State transition event
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateTransition {
    pub run_id: Uuid,
    pub old_state: PipelineState,
    pub new_state: PipelineState,
    pub transitioned_at: DateTime<Utc>,
}

/// One pipeline execution
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineRun {
    pub run_id: Uuid,
    pub state: PipelineState,
    pub history: Vec<StateTransition>,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
}

impl PipelineRun {
    pub fn new() -> Self {
        Self {
            run_id: Uuid::new_v4(),
            state: PipelineState::Raw,
            history: Vec::new(),
            started_at: Utc::now(),
            ended_at: None,
        }
    }

    /// Advance to `new_state`
    ///
    /// Only the immediate successor or FAILED is accepted.
    pub fn transition_to(&mut self, new_state: PipelineState) -> ClusterResult<StateTransition> {
        let allowed = (new_state == PipelineState::Failed && !self.state.is_terminal())
            || self.state.next() == Some(new_state);
        if !allowed {
            return Err(ClusterError::InvalidStateTransition {
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

        info!(run_id = %self.run_id, from = ?transition.old_state, to = ?new_state, "Pipeline state transition");
        self.history.push(transition.clone());
        Ok(transition)
    }

    /// Mark the run failed (no-op once terminal)
    pub fn fail(&mut self) {
        if !self.state.is_terminal() {
            // Cannot fail: FAILED is reachable from every non-terminal state
            let _ = self.transition_to(PipelineState::Failed);
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }
}

impl Default for PipelineRun {
    fn default() -> Self {
        Self::new()
    }
}
