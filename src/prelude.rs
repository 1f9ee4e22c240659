//=========================================================================
// Prelude
//=========================================================================
//
// Convenience module that re-exports commonly used types and traits.
//
// Usage:
//   use mode_stack::prelude::*;
//
//=========================================================================

//=== Public API ==========================================================

// State machine
pub use crate::core::stack::{StackError, StateMachine, StateMachineBuilder};

// Modes
pub use crate::core::mode::{BootMode, Event, Mode, ModeContext, ModeId, ModeInfo, ModeStatus, Wakefulness};

// Collaborators
pub use crate::core::events::{EventError, EventSender};
pub use crate::core::RunState;
