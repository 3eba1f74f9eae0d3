//! Illustration task state machine.

use super::ParseTaskValueError;
use crate::story::domain::IllustrationStatus;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Illustration task lifecycle status.
///
/// Valid edges are `pending -> scheduled -> generating -> {ready | failed}`,
/// `failed -> scheduled` for retries, and `abandoned` from any non-terminal
/// status. `ready` and `abandoned` are terminal.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// Waiting for dependencies or a free worker.
    #[default]
    Pending,
    /// Queued for dispatch; retries re-enter here.
    Scheduled,
    /// A backend call is in flight.
    Generating,
    /// Generation finished and the result was written back.
    Ready,
    /// The latest attempt failed.
    Failed,
    /// Cancelled by the user; distinct from a backend failure.
    Abandoned,
}

impl TaskStatus {
    /// Returns the canonical storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Scheduled => "scheduled",
            Self::Generating => "generating",
            Self::Ready => "ready",
            Self::Failed => "failed",
            Self::Abandoned => "abandoned",
        }
    }

    /// Returns `true` when no further transition is possible.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Ready | Self::Abandoned)
    }

    /// Returns `true` when `next` is a valid successor of this status.
    #[must_use]
    pub const fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Pending | Self::Failed, Self::Scheduled)
                | (Self::Scheduled, Self::Generating)
                | (Self::Generating, Self::Ready | Self::Failed)
                | (
                    Self::Pending | Self::Scheduled | Self::Generating | Self::Failed,
                    Self::Abandoned
                )
        )
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for TaskStatus {
    type Error = ParseTaskValueError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let normalized = value.trim().to_ascii_lowercase();
        match normalized.as_str() {
            "pending" => Ok(Self::Pending),
            "scheduled" => Ok(Self::Scheduled),
            "generating" => Ok(Self::Generating),
            "ready" => Ok(Self::Ready),
            "failed" => Ok(Self::Failed),
            "abandoned" => Ok(Self::Abandoned),
            _ => Err(ParseTaskValueError {
                kind: "status",
                value: value.to_owned(),
            }),
        }
    }
}

impl From<TaskStatus> for IllustrationStatus {
    fn from(status: TaskStatus) -> Self {
        match status {
            TaskStatus::Pending => Self::Pending,
            TaskStatus::Scheduled => Self::Scheduled,
            TaskStatus::Generating => Self::Generating,
            TaskStatus::Ready => Self::Ready,
            TaskStatus::Failed => Self::Failed,
            TaskStatus::Abandoned => Self::Abandoned,
        }
    }
}
