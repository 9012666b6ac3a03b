//! Per-invocation lifecycle state machine.

use std::fmt;

/// Lifecycle of a single worker invocation.
///
/// Transitions only move forward; terminal states accept nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvocationState {
    Idle,
    Spawning,
    SpawnFailed,
    Running,
    /// The process exited; `None` means it was killed by a signal.
    Exited(Option<i32>),
    TimedOut,
    /// Reading the process streams or its exit status failed.
    Aborted,
    Parsed,
    ExitRejected,
    ParseFailed,
}

impl InvocationState {
    /// Whether the invocation has produced its one outcome.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            Self::SpawnFailed
                | Self::TimedOut
                | Self::Aborted
                | Self::Parsed
                | Self::ExitRejected
                | Self::ParseFailed
        )
    }

    /// Whether `next` is a legal successor of this state.
    #[must_use]
    pub fn can_transition_to(self, next: Self) -> bool {
        match (self, next) {
            (Self::Idle, Self::Spawning)
            | (Self::Spawning, Self::SpawnFailed | Self::Running)
            | (Self::Running, Self::Exited(_) | Self::TimedOut | Self::Aborted) => true,
            (Self::Exited(code), Self::ExitRejected) => code != Some(0),
            (Self::Exited(code), Self::Parsed | Self::ParseFailed) => code == Some(0),
            _ => false,
        }
    }

    /// Returns the string representation used in logs.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Spawning => "spawning",
            Self::SpawnFailed => "spawn_failed",
            Self::Running => "running",
            Self::Exited(_) => "exited",
            Self::TimedOut => "timed_out",
            Self::Aborted => "aborted",
            Self::Parsed => "parsed",
            Self::ExitRejected => "exit_rejected",
            Self::ParseFailed => "parse_failed",
        }
    }
}

impl fmt::Display for InvocationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exited(Some(code)) => write!(f, "exited({code})"),
            Self::Exited(None) => f.write_str("exited(signal)"),
            other => f.write_str(other.as_str()),
        }
    }
}

/// Error returned for an out-of-order transition.
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("Illegal invocation transition {from} -> {to}")]
pub struct IllegalTransition {
    pub from: InvocationState,
    pub to: InvocationState,
}

/// Tracks one invocation's position in the lifecycle.
#[derive(Debug)]
pub struct InvocationTracker {
    state: InvocationState,
    history: Vec<InvocationState>,
}

impl Default for InvocationTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl InvocationTracker {
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: InvocationState::Idle,
            history: vec![InvocationState::Idle],
        }
    }

    #[must_use]
    pub fn state(&self) -> InvocationState {
        self.state
    }

    /// Every state visited so far, in order.
    #[must_use]
    pub fn history(&self) -> &[InvocationState] {
        &self.history
    }

    /// Move to `next`.
    ///
    /// # Errors
    ///
    /// Returns `IllegalTransition` if `next` does not follow the current state.
    pub fn advance(&mut self, next: InvocationState) -> Result<(), IllegalTransition> {
        if !self.state.can_transition_to(next) {
            return Err(IllegalTransition {
                from: self.state,
                to: next,
            });
        }
        tracing::debug!(from = %self.state, to = %next, "Invocation state change");
        self.state = next;
        self.history.push(next);
        Ok(())
    }

    /// Like [`advance`](Self::advance), but an illegal step is logged and ignored.
    pub fn enter(&mut self, next: InvocationState) {
        if let Err(e) = self.advance(next) {
            tracing::error!(error = %e, "Invocation state machine violated");
        }
    }
}
