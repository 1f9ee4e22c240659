//=========================================================================
// Run State
//=========================================================================
//
// Process-wide "application is running" flag, passed around as a handle.
//
// The outer application owns the flag and flips it once initialization
// is done. Modes receive a clone at construction and only ever read it.
//
//=========================================================================

//=== External Dependencies ===============================================

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use log::info;

//=== RunState ============================================================

/// Shared run/initializing flag.
///
/// Cloning yields another handle to the same flag.
#[derive(Debug, Clone, Default)]
pub struct RunState {
    running: Arc<AtomicBool>,
}

impl RunState {
    /// Creates a flag in the "not running" state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` once the application has left its bootstrap phase.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Sets the flag. Only the outer application should call this.
    pub fn set_running(&self, running: bool) {
        let previous = self.running.swap(running, Ordering::AcqRel);
        if previous != running {
            info!("Run state changed: running = {}", running);
        }
    }
}

//=========================================================================
// Unit Tests
//=========================================================================
