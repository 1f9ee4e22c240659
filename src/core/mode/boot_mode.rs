//=========================================================================
// Boot Mode
//=========================================================================
//
// Bottom-of-stack placeholder that waits for the application to start.
//
// Polls the run state each update. The first time it reads `true` it
// pushes the first real mode and latches, so the push happens once.
// Every other hook only traces.
//
//=========================================================================

//=== External Dependencies ===============================================

use log::{debug, info};

//=== Internal Dependencies ===============================================

use super::{Event, Mode, ModeContext};
use crate::core::RunState;

//=== BootMode ============================================================

type ModeFactory<E> = Box<dyn FnOnce() -> Box<dyn Mode<E>> + Send>;

/// Waits on [`RunState`] and then starts the real mode sequence.
///
/// # Example
///
/// ```rust
/// # use mode_stack::prelude::*;
/// struct Menu;
/// impl Mode<()> for Menu {
///     fn name(&self) -> &str { "Menu" }
/// }
///
/// let run_state = RunState::new();
/// let mut machine = StateMachineBuilder::<()>::new().build();
/// machine.push(BootMode::new(run_state.clone(), || Menu));
///
/// machine.tick();
/// assert_eq!(machine.len(), 1);
///
/// run_state.set_running(true);
/// machine.tick();
/// assert_eq!(machine.len(), 2);
/// ```
pub struct BootMode<E: Event> {
    run_state: RunState,
    first_mode: Option<ModeFactory<E>>,
}

impl<E: Event> BootMode<E> {
    /// Creates a boot mode that builds its successor with `first_mode`.
    pub fn new<M, F>(run_state: RunState, first_mode: F) -> Self
    where
        M: Mode<E> + 'static,
        F: FnOnce() -> M + Send + 'static,
    {
        Self {
            run_state,
            first_mode: Some(Box::new(move || Box::new(first_mode()) as Box<dyn Mode<E>>)),
        }
    }

    /// Returns `true` once the first real mode has been requested.
    pub fn has_started(&self) -> bool {
        self.first_mode.is_none()
    }
}

impl<E: Event> Mode<E> for BootMode<E> {
    fn name(&self) -> &str {
        "BootMode"
    }

    fn on_construct(&mut self, _ctx: &mut ModeContext<'_, E>) {
        debug!("BootMode::on_construct");
    }

    fn on_destruct(&mut self, _ctx: &mut ModeContext<'_, E>) {
        debug!("BootMode::on_destruct");
    }

    fn on_pause(&mut self, _ctx: &mut ModeContext<'_, E>) {
        debug!("BootMode::on_pause");
    }

    fn on_resume(&mut self, _ctx: &mut ModeContext<'_, E>) {
        debug!("BootMode::on_resume");
    }

    fn update(&mut self, ctx: &mut ModeContext<'_, E>) {
        if !self.run_state.is_running() {
            return;
        }

        if let Some(factory) = self.first_mode.take() {
            let first = factory();
            info!("Application running, starting with mode {}", first.name());
            ctx.request_push_boxed(first);
        }
    }

    fn draw(&mut self, _ctx: &mut ModeContext<'_, E>) {
        debug!("BootMode::draw");
    }

    fn draw2d(&mut self, _ctx: &mut ModeContext<'_, E>) {
        debug!("BootMode::draw2d");
    }

    fn on_sleep(&mut self, _ctx: &mut ModeContext<'_, E>) {
        debug!("BootMode::on_sleep");
    }

    fn on_wakeup(&mut self, _ctx: &mut ModeContext<'_, E>) {
        debug!("BootMode::on_wakeup");
    }

    fn on_event(&mut self, _event: &E, _ctx: &mut ModeContext<'_, E>) {
        debug!("BootMode::on_event");
    }
}

//=========================================================================
// Unit Tests
//=========================================================================
