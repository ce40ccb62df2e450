// Run Domain Model - one supervised migration execution

use crate::domain::error::{DomainError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Run State
///
/// `NotStarted -> Running -> AwaitingConfirmation -> Committed | RolledBack`,
/// with `Running -> Committed` when no transaction wraps the run and
/// `Running | AwaitingConfirmation -> Failed` on errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RunState {
    NotStarted,
    Running,
    AwaitingConfirmation,
    Committed,
    RolledBack,
    Failed,
}

impl RunState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            RunState::Committed | RunState::RolledBack | RunState::Failed
        )
    }
}

impl std::fmt::Display for RunState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RunState::NotStarted => write!(f, "NOT_STARTED"),
            RunState::Running => write!(f, "RUNNING"),
            RunState::AwaitingConfirmation => write!(f, "AWAITING_CONFIRMATION"),
            RunState::Committed => write!(f, "COMMITTED"),
            RunState::RolledBack => write!(f, "ROLLED_BACK"),
            RunState::Failed => write!(f, "FAILED"),
        }
    }
}

/// How a finished run ended
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Outcome {
    Committed,
    /// Declined at the confirmation prompt
    Canceled,
    /// A transaction was already open, nothing ran
    NestedTransaction,
    Failed { message: String },
}

/// Run Entity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Run {
    pub title: String,
    pub state: RunState,
    pub started_at: Option<DateTime<Utc>>,
    pub ended_at: Option<DateTime<Utc>>,
    pub outcome: Option<Outcome>,
}

impl Run {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            state: RunState::NotStarted,
            started_at: None,
            ended_at: None,
            outcome: None,
        }
    }

    /// `Some(true)` once committed, `Some(false)` once rolled back or failed
    pub fn result(&self) -> Option<bool> {
        self.outcome
            .as_ref()
            .map(|outcome| matches!(outcome, Outcome::Committed))
    }

    /// Elapsed seconds, measured against `now` while the run is still open
    pub fn duration_secs(&self, now: DateTime<Utc>) -> f64 {
        let Some(started_at) = self.started_at else {
            return 0.0;
        };
        let end = self.ended_at.unwrap_or(now);
        let micros = (end - started_at).num_microseconds().unwrap_or(i64::MAX);
        micros.max(0) as f64 / 1_000_000.0
    }

    /// Transition to Running with explicit timestamp
    pub fn start(&mut self, now: DateTime<Utc>) -> Result<()> {
        self.transition(RunState::NotStarted, RunState::Running)?;
        self.started_at = Some(now);
        Ok(())
    }

    /// Routine finished inside the transaction, waiting on the operator
    pub fn await_confirmation(&mut self) -> Result<()> {
        self.transition(RunState::Running, RunState::AwaitingConfirmation)
    }

    /// Record the terminal outcome and end timestamp
    ///
    /// `ended_at` never precedes `started_at`, even if the clock stepped back.
    pub fn finish(&mut self, outcome: Outcome, now: DateTime<Utc>) -> Result<()> {
        let to = match outcome {
            Outcome::Committed => RunState::Committed,
            Outcome::Canceled => RunState::RolledBack,
            Outcome::NestedTransaction | Outcome::Failed { .. } => RunState::Failed,
        };
        if !matches!(
            self.state,
            RunState::Running | RunState::AwaitingConfirmation
        ) {
            return Err(DomainError::InvalidStateTransition {
                from: self.state.to_string(),
                to: to.to_string(),
            });
        }
        self.state = to;
        self.ended_at = Some(match self.started_at {
            Some(started_at) if now < started_at => started_at,
            _ => now,
        });
        self.outcome = Some(outcome);
        Ok(())
    }

    fn transition(&mut self, from: RunState, to: RunState) -> Result<()> {
        if self.state != from {
            return Err(DomainError::InvalidStateTransition {
                from: self.state.to_string(),
                to: to.to_string(),
            });
        }
        self.state = to;
        Ok(())
    }
}
