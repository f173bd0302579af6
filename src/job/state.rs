use std::fmt;

use serde::{Deserialize, Serialize};

/// The lifecycle states of a background job.
///
/// Each job flows through: PENDING → RUNNING → {COMPLETED | CANCELLED | ERROR},
/// with an optional RUNNING ⇄ PAUSED detour. The three right-hand states are
/// terminal; nothing transitions out of them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JobState {
    Pending,
    Running,
    Paused,
    Completed,
    Cancelled,
    Error,
}

impl JobState {
    /// True for `Completed`, `Cancelled` and `Error`.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            JobState::Completed | JobState::Cancelled | JobState::Error
        )
    }

    /// Whether the state machine allows moving from `self` to `next`.
    ///
    /// Paused can only be entered from Running, and can only go back to
    /// Running or unwind into Cancelled. Terminal states allow nothing.
    pub fn can_transition_to(self, next: JobState) -> bool {
        match self {
            JobState::Pending => next == JobState::Running,
            JobState::Running => matches!(
                next,
                JobState::Paused | JobState::Completed | JobState::Cancelled | JobState::Error
            ),
            JobState::Paused => matches!(next, JobState::Running | JobState::Cancelled),
            JobState::Completed | JobState::Cancelled | JobState::Error => false,
        }
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobState::Pending => write!(f, "PENDING"),
            JobState::Running => write!(f, "RUNNING"),
            JobState::Paused => write!(f, "PAUSED"),
            JobState::Completed => write!(f, "COMPLETED"),
            JobState::Cancelled => write!(f, "CANCELLED"),
            JobState::Error => write!(f, "ERROR"),
        }
    }
}
