//! Run state machine
//!
//! `Absent → Building → Created → Starting → Running | Completed`, with
//! `Failed` reachable from every non-terminal state.

use serde::{Deserialize, Serialize};

/// Possible states of one container run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunState {
    /// Nothing built or launched yet
    Absent,

    /// Build spec written, image build in progress
    Building,

    /// Container launched under the logical name
    Created,

    /// Start issued, waiting for the container to run
    Starting,

    /// Container observed running
    Running,

    /// Script finished with exit code 0
    Completed,

    /// Run aborted with an error
    Failed(String),
}

impl RunState {
    /// Check if this is a terminal state (cannot transition further)
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            RunState::Running | RunState::Completed | RunState::Failed(_)
        )
    }

    /// Whether `next` is a legal transition from this state
    pub fn can_transition_to(&self, next: &RunState) -> bool {
        match (self, next) {
            (s, RunState::Failed(_)) => !s.is_terminal(),
            (RunState::Absent, RunState::Building) => true,
            (RunState::Building, RunState::Created) => true,
            (RunState::Created, RunState::Starting) => true,
            (RunState::Created, RunState::Running) => true,
            (RunState::Created, RunState::Completed) => true,
            (RunState::Starting, RunState::Running) => true,
            (RunState::Starting, RunState::Completed) => true,
            _ => false,
        }
    }

    /// Get display name for the state
    pub fn display_name(&self) -> &'static str {
        match self {
            RunState::Absent => "Absent",
            RunState::Building => "Building",
            RunState::Created => "Created",
            RunState::Starting => "Starting",
            RunState::Running => "Running",
            RunState::Completed => "Completed",
            RunState::Failed(_) => "Failed",
        }
    }

    /// Get a symbol for the state
    pub fn symbol(&self) -> &'static str {
        match self {
            RunState::Absent => "◯",
            RunState::Building => "⚙",
            RunState::Created => "◎",
            RunState::Starting => "⟳",
            RunState::Running => "▶",
            RunState::Completed => "✓",
            RunState::Failed(_) => "✗",
        }
    }
}

impl std::fmt::Display for RunState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_happy_path_transitions() {
        let path = [
            RunState::Absent,
            RunState::Building,
            RunState::Created,
            RunState::Starting,
            RunState::Running,
        ];
        for pair in path.windows(2) {
            assert!(pair[0].can_transition_to(&pair[1]), "{} -> {}", pair[0], pair[1]);
        }
    }

    #[test]
    fn test_terminal_states() {
        assert!(RunState::Running.is_terminal());
        assert!(RunState::Completed.is_terminal());
        assert!(RunState::Failed("x".into()).is_terminal());
        assert!(!RunState::Starting.is_terminal());

        // no way out of a terminal state
        assert!(!RunState::Completed.can_transition_to(&RunState::Failed("late".into())));
        assert!(!RunState::Running.can_transition_to(&RunState::Building));
    }

    #[test]
    fn test_invalid_skips() {
        assert!(!RunState::Absent.can_transition_to(&RunState::Running));
        assert!(!RunState::Building.can_transition_to(&RunState::Starting));
        assert!(RunState::Building.can_transition_to(&RunState::Failed("build".into())));
    }
}
