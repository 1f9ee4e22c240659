//=========================================================================
// State Machine Builder
//
// Fluent configuration for a [`StateMachine`].
//
// ```text
//     StateMachineBuilder ──build()──> StateMachine ──tick()──> [Modes]
//         │
//         ├─ with_event_capacity()
//         └─ with_panic_containment()
// ```
//
//=========================================================================

//=== External Dependencies ===============================================

use std::marker::PhantomData;

use log::info;

//=== Internal Dependencies ===============================================

use super::StateMachine;
use crate::core::mode::Event;

//=== StateMachineBuilder =================================================

/// Builder for configuring and constructing a [`StateMachine`].
///
/// # Default Values
///
/// - **Event capacity**: 128 queued events
/// - **Panic containment**: enabled
///
/// # Examples
///
/// ```rust
/// use mode_stack::StateMachineBuilder;
///
/// #[derive(Debug)]
/// enum InputEvent { Tap { x: f32, y: f32 } }
///
/// let machine = StateMachineBuilder::<InputEvent>::new()
///     .with_event_capacity(256)
///     .build();
/// assert!(machine.is_empty());
/// ```
pub struct StateMachineBuilder<E: Event> {
    event_capacity: usize,
    contain_panics: bool,
    _phantom: PhantomData<fn() -> E>,
}

impl<E: Event> StateMachineBuilder<E> {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self {
            event_capacity: 128,
            contain_panics: true,
            _phantom: PhantomData,
        }
    }

    /// Sets how many events may wait in the channel between pumps.
    ///
    /// Sends beyond this are rejected with `EventError::Full`.
    ///
    /// Default: 128
    ///
    /// # Panics
    ///
    /// Panics if `capacity == 0`.
    pub fn with_event_capacity(mut self, capacity: usize) -> Self {
        assert!(capacity > 0, "Event capacity must be positive");
        self.event_capacity = capacity;
        self
    }

    /// Controls whether a panicking hook is caught at the machine boundary.
    ///
    /// When enabled, the panic is recorded as a diagnostic and the mode
    /// is queued for removal if it is on top. When disabled, the panic
    /// unwinds through the caller.
    ///
    /// Default: true
    pub fn with_panic_containment(mut self, enabled: bool) -> Self {
        self.contain_panics = enabled;
        self
    }

    /// Builds an empty state machine.
    pub fn build(self) -> StateMachine<E> {
        info!(
            "Building state machine (event capacity: {}, panic containment: {})",
            self.event_capacity, self.contain_panics
        );

        StateMachine::with_config(self.event_capacity, self.contain_panics)
    }
}

impl<E: Event> Default for StateMachineBuilder<E> {
    fn default() -> Self {
        Self::new()
    }
}

//=========================================================================
// Unit Tests
//=========================================================================
