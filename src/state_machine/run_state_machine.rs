use super::{
    errors::{StateMachineError, StateMachineResult},
    events::RunTransition,
    states::RunState,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

/// One applied transition, kept for the run's audit trail
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransitionEntry {
    pub from: RunState,
    pub to: RunState,
    pub event: RunTransition,
    pub at: DateTime<Utc>,
}

/// In-memory state machine owned by a single scheduler
#[derive(Debug, Clone)]
pub struct RunStateMachine {
    run_id: Uuid,
    state: RunState,
    history: Vec<TransitionEntry>,
}

impl RunStateMachine {
    pub fn new(run_id: Uuid) -> Self {
        Self {
            run_id,
            state: RunState::Idle,
            history: Vec::new(),
        }
    }

    pub fn current_state(&self) -> RunState {
        self.state
    }

    pub fn history(&self) -> &[TransitionEntry] {
        &self.history
    }

    /// Attempt to transition the run state
    pub fn transition(&mut self, event: RunTransition) -> StateMachineResult<RunState> {
        let from = self.state;
        let to = Self::determine_target_state(from, &event)?;

        debug!(
            run_id = %self.run_id,
            from = %from,
            to = %to,
            event = event.event_type(),
            "Run state transition"
        );

        self.history.push(TransitionEntry {
            from,
            to,
            event,
            at: Utc::now(),
        });
        self.state = to;
        Ok(to)
    }

    /// Determine the target state based on current state and event
    fn determine_target_state(
        current_state: RunState,
        event: &RunTransition,
    ) -> StateMachineResult<RunState> {
        let target = match (current_state, event) {
            (RunState::Idle, RunTransition::Plan) => RunState::Planning,
            (RunState::Planning, RunTransition::Start { .. }) => RunState::Running,
            (RunState::Running, RunTransition::Complete) => RunState::Completed,

            // Any non-terminal state can abort
            (from, RunTransition::Abort(_)) if !from.is_terminal() => RunState::Aborted,

            (from_state, _) => {
                return Err(StateMachineError::InvalidTransition {
                    from: from_state.to_string(),
                    event: event.event_type().to_string(),
                })
            }
        };

        Ok(target)
    }

    pub fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn happy_path_reaches_completed() {
        let mut sm = RunStateMachine::new(Uuid::new_v4());
        assert_eq!(sm.transition(RunTransition::Plan).unwrap(), RunState::Planning);
        assert_eq!(
            sm.transition(RunTransition::Start { total_tiles: 3 }).unwrap(),
            RunState::Running
        );
        assert_eq!(sm.transition(RunTransition::Complete).unwrap(), RunState::Completed);
        assert_eq!(sm.history().len(), 3);
        assert!(sm.is_terminal());
    }

    #[test]
    fn abort_allowed_from_every_non_terminal_state() {
        let mut idle = RunStateMachine::new(Uuid::new_v4());
        assert_eq!(
            idle.transition(RunTransition::Abort("session".into())).unwrap(),
            RunState::Aborted
        );

        let mut planning = RunStateMachine::new(Uuid::new_v4());
        planning.transition(RunTransition::Plan).unwrap();
        assert_eq!(
            planning.transition(RunTransition::Abort("catalog".into())).unwrap(),
            RunState::Aborted
        );
    }

    #[test]
    fn invalid_transitions_are_rejected() {
        let mut sm = RunStateMachine::new(Uuid::new_v4());
        assert!(sm.transition(RunTransition::Complete).is_err());
        assert!(sm.transition(RunTransition::Start { total_tiles: 1 }).is_err());
        assert_eq!(sm.current_state(), RunState::Idle);

        sm.transition(RunTransition::Abort("x".into())).unwrap();
        assert!(sm.transition(RunTransition::Abort("again".into())).is_err());
        assert!(sm.transition(RunTransition::Plan).is_err());
    }
}
