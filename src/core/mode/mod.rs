//=========================================================================
// Mode System
//=========================================================================
//
// The contract every stacked application mode implements.
//
// Lifecycle:
//   push ──► on_construct ──► Active ⇄ Paused ──► on_destruct
//                              │   ▲
//                      on_pause│   │on_resume
//
//   sleep/wakeup toggle Awake/Asleep on every resident mode, independent
//   of Active/Paused.
//
//=========================================================================

//=== External Dependencies ===============================================

use std::fmt;

//=== Module Declarations =================================================

mod boot_mode;
mod context;

//=== Public API ==========================================================

pub use boot_mode::BootMode;
pub use context::ModeContext;

//=== Event Trait =========================================================

/// Marker trait for values routable to a mode's `on_event` hook.
///
/// Automatically implemented for all types that are Send + 'static.
pub trait Event: Send + 'static {}

// Blanket implementation
impl<T: Send + 'static> Event for T {}

//=== ModeId ==============================================================

/// Identifier handed out by the state machine when a mode is pushed.
///
/// Unique for the lifetime of one state machine. Never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ModeId(u64);

impl ModeId {
    pub(crate) fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    /// Returns the raw numeric value.
    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ModeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

//=== ModeStatus ==========================================================

/// Position of a mode in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModeStatus {
    /// `on_construct` is running; never observed between calls.
    Constructed,

    /// Top of the stack, receiving per-frame work.
    Active,

    /// Resident below the top.
    Paused,

    /// `on_destruct` is running; the mode is dropped right after.
    Destroyed,
}

//=== Wakefulness =========================================================

/// Application suspend state, tracked per resident mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Wakefulness {
    #[default]
    Awake,
    Asleep,
}

//=== ModeInfo ============================================================

/// Read-only snapshot of a resident mode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModeInfo {
    pub id: ModeId,
    pub name: String,
    pub status: ModeStatus,
    pub wakefulness: Wakefulness,
}

//=== Mode Trait ==========================================================

/// One screen or phase of the application (menu, loading, gameplay...).
///
/// Every hook has an empty default, so a mode overrides only what it
/// cares about. Hooks run on the logic thread and must return promptly;
/// long work is polled from `update` instead of blocked on.
///
/// Stack changes are requested through the [`ModeContext`] handed to each
/// hook and applied by the state machine once the hook has returned.
///
/// # Minimal Implementation
///
/// ```rust
/// # use mode_stack::prelude::*;
/// struct Splash {
///     frames: u32,
/// }
///
/// impl Mode<()> for Splash {
///     fn name(&self) -> &str {
///         "Splash"
///     }
///
///     fn update(&mut self, ctx: &mut ModeContext<'_, ()>) {
///         self.frames += 1;
///         if self.frames == 120 {
///             ctx.request_pop_self();
///         }
///     }
/// }
/// ```
pub trait Mode<E: Event>: Send {
    /// Diagnostic name. Not required to be unique.
    fn name(&self) -> &str;

    /// Called once, right after the mode is placed on the stack.
    fn on_construct(&mut self, _ctx: &mut ModeContext<'_, E>) {}

    /// Called once, right before the mode is dropped.
    fn on_destruct(&mut self, _ctx: &mut ModeContext<'_, E>) {}

    /// Another mode was pushed above this one.
    fn on_pause(&mut self, _ctx: &mut ModeContext<'_, E>) {}

    /// The mode above this one was popped.
    fn on_resume(&mut self, _ctx: &mut ModeContext<'_, E>) {}

    /// Per-tick logic.
    fn update(&mut self, _ctx: &mut ModeContext<'_, E>) {}

    /// Per-frame scene content.
    fn draw(&mut self, _ctx: &mut ModeContext<'_, E>) {}

    /// Per-frame 2D overlay, drawn after [`Mode::draw`].
    fn draw2d(&mut self, _ctx: &mut ModeContext<'_, E>) {}

    /// The application is being suspended.
    fn on_sleep(&mut self, _ctx: &mut ModeContext<'_, E>) {}

    /// The application is being resumed.
    fn on_wakeup(&mut self, _ctx: &mut ModeContext<'_, E>) {}

    /// An event was routed to this mode while it was active.
    fn on_event(&mut self, _event: &E, _ctx: &mut ModeContext<'_, E>) {}

    /// Keep receiving `update`/`draw`/`draw2d` while paused.
    fn works_in_parallel(&self) -> bool {
        false
    }

    /// Suppress the loading indicator while this mode is on top.
    fn disables_loading_screen(&self) -> bool {
        false
    }
}
