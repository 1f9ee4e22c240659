//=========================================================================
// Core
//
// Everything the outer frame loop talks to.
//
// Components (leaves first):
// - `mode`: the Mode contract, its context handle and the boot mode
// - `run_state`: shared "application is running" flag
// - `events`: bounded event channel feeding the active mode
// - `stack`: the state machine owning and driving the mode stack
//
// Notes:
// Everything here runs on the logic thread. Only `EventSender` and
// `RunState` are meant to be handed to other threads.
//
//=========================================================================

//=== Module Declarations =================================================

pub mod events;
pub mod mode;
pub mod stack;

mod run_state;

//=== Public API ==========================================================

pub use events::{EventError, EventSender};
pub use mode::{BootMode, Event, Mode, ModeContext, ModeId, ModeInfo, ModeStatus, Wakefulness};
pub use run_state::RunState;
pub use stack::{StackError, StateMachine, StateMachineBuilder};
