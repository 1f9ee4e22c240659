//=========================================================================
// Mode Stack
//=========================================================================
//
// Stack controller, its deferred transition queue and its errors.
//
// Architecture:
//   StateMachine
//     ├─ stack: Vec<Slot>             (Box<dyn Mode> + status)
//     └─ transitions: TransitionQueue  (filled through ModeContext)
//
// Flow:
//   tick() → apply → update → draw → draw2d → apply
//
//=========================================================================

//=== Module Declarations =================================================

mod builder;
mod error;
mod state_machine;
mod transition_queue;

//=== Public API ==========================================================

pub use builder::StateMachineBuilder;
pub use error::StackError;
pub use state_machine::StateMachine;
pub use transition_queue::{StackTransition, TransitionQueue};
