//=========================================================================
// Stack Errors
//=========================================================================
//
// Caller and mode failures surfaced by the state machine.
//
// None of these are fatal: the machine logs them, leaves the stack in its
// last stable configuration and keeps ticking.
//
//=========================================================================

//=== External Dependencies ===============================================

use thiserror::Error;

//=== Internal Dependencies ===============================================

use crate::core::mode::ModeId;

//=== StackError ==========================================================

/// Refused stack operations and reported mode failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StackError {
    /// Pop (or replace) requested while no mode is resident.
    #[error("mode stack is empty")]
    EmptyStack,

    /// A mode asked for its own removal but is not the top of the stack.
    #[error("mode {id} is not on top of the stack ({})", top_label(.top))]
    NotOnTop { id: ModeId, top: Option<ModeId> },

    /// A mode reported an internal failure through its context.
    #[error("mode {id} ({name}) failed: {reason}")]
    ModeFailed {
        id: ModeId,
        name: String,
        reason: String,
    },

    /// A hook panicked and was contained at the controller boundary.
    #[error("mode {id} ({name}) panicked in {hook}")]
    HookPanicked {
        id: ModeId,
        name: String,
        hook: &'static str,
    },
}

fn top_label(top: &Option<ModeId>) -> String {
    match top {
        Some(id) => format!("top is {}", id),
        None => "stack is empty".to_string(),
    }
}

//=========================================================================
// Unit Tests
//=========================================================================
