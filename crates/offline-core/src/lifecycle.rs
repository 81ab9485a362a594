//! Worker lifecycle states.

use std::fmt;

/// Lifecycle states of a worker instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WorkerState {
    /// Created, no lifecycle event handled yet.
    Parsed,
    /// Install event in progress.
    Installing,
    /// Install finished, waiting to activate.
    Installed,
    /// Activate event in progress.
    Activating,
    /// Active and controlling clients.
    Activated,
    /// Replaced or failed to install.
    Redundant,
}

/// Attempted lifecycle transition that the state machine does not allow.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid lifecycle transition from {from} to {to}")]
pub struct InvalidTransition {
    pub from: WorkerState,
    pub to: WorkerState,
}

impl WorkerState {
    /// Check whether `self -> next` is a legal transition.
    pub fn can_transition_to(self, next: WorkerState) -> bool {
        use WorkerState::*;
        matches!(
            (self, next),
            (Parsed, Installing)
                | (Installed, Installing)
                | (Activated, Installing)
                | (Installing, Installed)
                | (Installed, Activating)
                | (Activated, Activating)
                | (Activating, Activated)
                | (_, Redundant)
        )
    }

    /// Perform a transition, returning the new state.
    pub fn transition(self, next: WorkerState) -> Result<WorkerState, InvalidTransition> {
        if self.can_transition_to(next) {
            Ok(next)
        } else {
            Err(InvalidTransition { from: self, to: next })
        }
    }

    /// Lowercase state name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Parsed => "parsed",
            Self::Installing => "installing",
            Self::Installed => "installed",
            Self::Activating => "activating",
            Self::Activated => "activated",
            Self::Redundant => "redundant",
        }
    }
}

impl fmt::Display for WorkerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_happy_path() {
        let state = WorkerState::Parsed
            .transition(WorkerState::Installing)
            .and_then(|s| s.transition(WorkerState::Installed))
            .and_then(|s| s.transition(WorkerState::Activating))
            .and_then(|s| s.transition(WorkerState::Activated))
            .unwrap();
        assert_eq!(state, WorkerState::Activated);
    }

    #[test]
    fn test_activate_before_install_rejected() {
        let err = WorkerState::Parsed.transition(WorkerState::Activating).unwrap_err();
        assert_eq!(err.from, WorkerState::Parsed);
        assert_eq!(err.to, WorkerState::Activating);
        assert_eq!(err.to_string(), "invalid lifecycle transition from parsed to activating");
    }

    #[test]
    fn test_reinstall_and_reactivate_allowed() {
        assert!(WorkerState::Activated.can_transition_to(WorkerState::Installing));
        assert!(WorkerState::Activated.can_transition_to(WorkerState::Activating));
        assert!(WorkerState::Installed.can_transition_to(WorkerState::Installing));
    }

    #[test]
    fn test_any_state_can_become_redundant() {
        for state in [
            WorkerState::Parsed,
            WorkerState::Installing,
            WorkerState::Installed,
            WorkerState::Activating,
            WorkerState::Activated,
        ] {
            assert!(state.can_transition_to(WorkerState::Redundant));
        }
    }
}
