// Run lifecycle state machine: Idle -> Planning -> Running -> {Completed, Aborted}

pub mod errors;
pub mod events;
pub mod run_state_machine;
pub mod states;

pub use errors::{StateMachineError, StateMachineResult};
pub use events::RunTransition;
pub use run_state_machine::{RunStateMachine, TransitionEntry};
pub use states::RunState;
