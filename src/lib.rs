//=========================================================================
// Mode Stack — Library Root
//
// Stack-based controller for the high-level modes of a real-time
// application (menu, loading screen, gameplay, pause overlay...).
//
// Responsibilities:
// - Define the `Mode` contract every stacked screen implements
// - Own the mode stack and sequence push/pop/pause/resume transitions
// - Forward per-frame work and events to the active mode only
// - Broadcast application sleep/wakeup to every resident mode
//
// Typical usage:
// ```no_run
// use mode_stack::prelude::*;
//
// let run_state = RunState::new();
// let mut machine = StateMachine::<()>::new();
// machine.push(BootMode::new(run_state.clone(), || MainMenu));
//
// loop {
//     machine.pump_events();
//     machine.tick();
// }
// ```
//
//=========================================================================

//--- Public Modules ------------------------------------------------------
//
// `core` contains the mode contract, the state machine and the small
// collaborators it is wired to (run state, event channel).
//
pub mod core;
pub mod prelude;

//--- Public Exports ------------------------------------------------------
//
// Re-exports the state machine and its builder so applications can
// simply `use mode_stack::StateMachine;`.
//
pub use crate::core::{StateMachine, StateMachineBuilder};
