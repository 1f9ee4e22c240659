//=========================================================================
// Mode Context
//=========================================================================
//
// Handle passed to every mode hook.
//
// Modes never touch the stack directly. Requests land in the transition
// queue and are applied by the state machine at the next safe point.
//
//=========================================================================

//=== External Dependencies ===============================================

use log::error;

//=== Internal Dependencies ===============================================

use super::{Event, Mode, ModeId};
use crate::core::stack::{StackError, StackTransition, TransitionQueue};

//=== ModeContext =========================================================

/// Deferred access to the state machine from inside a hook.
pub struct ModeContext<'a, E: Event> {
    id: ModeId,
    name: &'a str,
    transitions: &'a mut TransitionQueue<E>,
    diagnostics: &'a mut Vec<StackError>,
}

impl<'a, E: Event> ModeContext<'a, E> {
    pub(crate) fn new(
        id: ModeId,
        name: &'a str,
        transitions: &'a mut TransitionQueue<E>,
        diagnostics: &'a mut Vec<StackError>,
    ) -> Self {
        Self {
            id,
            name,
            transitions,
            diagnostics,
        }
    }

    //--- Identity ---------------------------------------------------------

    /// Id of the mode whose hook is running.
    pub fn mode_id(&self) -> ModeId {
        self.id
    }

    /// Name of the mode whose hook is running.
    pub fn mode_name(&self) -> &str {
        self.name
    }

    //--- Stack Requests ---------------------------------------------------

    /// Pushes `mode` on top once the current hook returns.
    pub fn request_push<M>(&mut self, mode: M)
    where
        M: Mode<E> + 'static,
    {
        self.request_push_boxed(Box::new(mode));
    }

    /// Boxed variant of [`ModeContext::request_push`].
    pub fn request_push_boxed(&mut self, mode: Box<dyn Mode<E>>) {
        self.transitions.push(StackTransition::Push(mode));
    }

    /// Pops whatever is on top once the current hook returns.
    pub fn request_pop(&mut self) {
        self.transitions.push(StackTransition::Pop);
    }

    /// Pops this mode, refused if it is no longer on top when applied.
    pub fn request_pop_self(&mut self) {
        self.transitions.push(StackTransition::PopMode(self.id));
    }

    /// Swaps the top mode for `mode`.
    pub fn request_replace<M>(&mut self, mode: M)
    where
        M: Mode<E> + 'static,
    {
        self.request_replace_boxed(Box::new(mode));
    }

    /// Boxed variant of [`ModeContext::request_replace`].
    pub fn request_replace_boxed(&mut self, mode: Box<dyn Mode<E>>) {
        self.transitions.push(StackTransition::Replace(mode));
    }

    /// Destroys every resident mode, top to bottom.
    pub fn request_clear(&mut self) {
        self.transitions.push(StackTransition::Clear);
    }

    //--- Failure Reporting ------------------------------------------------

    /// Records an internal failure for the driver to inspect.
    ///
    /// Does not remove the mode; pair with [`ModeContext::request_pop_self`]
    /// when the failure is unrecoverable.
    pub fn report_failure(&mut self, reason: impl Into<String>) {
        let failure = StackError::ModeFailed {
            id: self.id,
            name: self.name.to_string(),
            reason: reason.into(),
        };
        error!("{}", failure);
        self.diagnostics.push(failure);
    }
}

//=========================================================================
// Unit Tests
//=========================================================================
