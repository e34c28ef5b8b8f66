//! State machine for tracking a single publish invocation
//!
//! States are kept in memory only; a publish run never resumes.

use chrono::{DateTime, Utc};

/// Publishing state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublishState {
    Idle,
    ConfirmingRebuild,
    Building,
    CheckingArtifacts,
    ResolvingCredentials,
    Publishing,
    Done,
    Aborted,
    Failed,
}

impl PublishState {
    /// Terminal states end the invocation
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Done | Self::Aborted | Self::Failed)
    }

    /// Check whether `to` may follow `self`
    pub fn can_transition_to(self, to: PublishState) -> bool {
        use PublishState::*;

        match (self, to) {
            (Idle, ConfirmingRebuild | Building | CheckingArtifacts) => true,
            (ConfirmingRebuild, Building | Aborted) => true,
            (Building, CheckingArtifacts) => true,
            (CheckingArtifacts, ResolvingCredentials | Publishing) => true,
            (ResolvingCredentials, Publishing) => true,
            (Publishing, Done) => true,
            (from, Failed) => !from.is_terminal(),
            _ => false,
        }
    }
}

/// State transition
#[derive(Debug, Clone, PartialEq)]
pub struct StateTransition {
    pub from: PublishState,
    pub to: PublishState,
    pub timestamp: DateTime<Utc>,
}

/// Tracks the states a publish run moves through
#[derive(Debug)]
pub struct PublishStateMachine {
    current_state: PublishState,
    transitions: Vec<StateTransition>,
}

impl Default for PublishStateMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl PublishStateMachine {
    pub fn new() -> Self {
        Self {
            current_state: PublishState::Idle,
            transitions: Vec::new(),
        }
    }

    /// Transition to a new state
    pub fn transition(&mut self, to: PublishState) {
        let from = self.current_state;
        debug_assert!(
            from.can_transition_to(to),
            "illegal publish state transition {:?} -> {:?}",
            from,
            to
        );
        tracing::debug!(?from, ?to, "publish state transition");

        self.transitions.push(StateTransition {
            from,
            to,
            timestamp: Utc::now(),
        });
        self.current_state = to;
    }

    pub fn get_state(&self) -> PublishState {
        self.current_state
    }

    pub fn transitions(&self) -> &[StateTransition] {
        &self.transitions
    }

    /// Get elapsed time between the first and last transition, in milliseconds
    pub fn get_elapsed_time(&self) -> i64 {
        match (self.transitions.first(), self.transitions.last()) {
            (Some(first), Some(last)) => (last.timestamp - first.timestamp).num_milliseconds(),
            _ => 0,
        }
    }

    /// Get transition history as human-readable string
    pub fn get_history(&self) -> String {
        self.transitions
            .iter()
            .map(|t| format!("{}: {:?} → {:?}", t.timestamp.to_rfc3339(), t.from, t.to))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_state_machine() {
        let state_machine = PublishStateMachine::new();

        assert_eq!(state_machine.get_state(), PublishState::Idle);
        assert!(state_machine.transitions().is_empty());
        assert_eq!(state_machine.get_elapsed_time(), 0);
    }

    #[test]
    fn test_transition() {
        let mut state_machine = PublishStateMachine::new();

        state_machine.transition(PublishState::CheckingArtifacts);

        assert_eq!(state_machine.get_state(), PublishState::CheckingArtifacts);
        assert_eq!(state_machine.transitions().len(), 1);
        assert_eq!(state_machine.transitions()[0].from, PublishState::Idle);
    }

    #[test]
    fn test_terminal_states() {
        assert!(PublishState::Done.is_terminal());
        assert!(PublishState::Aborted.is_terminal());
        assert!(PublishState::Failed.is_terminal());
        assert!(!PublishState::Publishing.is_terminal());
    }

    #[test]
    fn test_allowed_transitions() {
        use PublishState::*;

        assert!(Idle.can_transition_to(ConfirmingRebuild));
        assert!(ConfirmingRebuild.can_transition_to(Aborted));
        assert!(CheckingArtifacts.can_transition_to(Publishing));
        assert!(Publishing.can_transition_to(Failed));

        assert!(!Idle.can_transition_to(Publishing));
        assert!(!Building.can_transition_to(Aborted));
        assert!(!Done.can_transition_to(Failed));
    }

    #[test]
    fn test_get_history() {
        let mut state_machine = PublishStateMachine::new();

        state_machine.transition(PublishState::Building);
        state_machine.transition(PublishState::CheckingArtifacts);

        let history = state_machine.get_history();
        assert!(history.contains("Idle → Building"));
        assert!(history.contains("Building → CheckingArtifacts"));
    }
}
