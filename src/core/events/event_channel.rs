//=========================================================================
// Event Channel
//=========================================================================
//
// Bounded event delivery from external sources to the state machine.
//
// Architecture:
//   EventSender<E> (any thread) ──try_send──► Receiver<E>
//                                                 │
//   StateMachine::pump_events() ◄── drain() ──────┘
//
// Sending never blocks. Draining is bounded per pump to avoid starving
// the frame loop.
//
//=========================================================================

//=== External Dependencies ===============================================

use crossbeam_channel::{bounded, Receiver, Sender, TryRecvError, TrySendError};
use log::warn;
use thiserror::Error;

//=== Internal Dependencies ===============================================

use crate::core::mode::Event;

//=== Constants ===========================================================

/// Upper bound on events forwarded by a single pump.
pub const MAX_EVENTS_PER_PUMP: usize = 100;

//=== EventError ==========================================================

/// Reasons an event could not be queued.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum EventError {
    /// The channel is at capacity; the event was dropped.
    #[error("event channel is full")]
    Full,

    /// The state machine owning the channel is gone.
    #[error("event channel is disconnected")]
    Disconnected,
}

//=== EventSender =========================================================

/// Cloneable handle for feeding events to a state machine.
pub struct EventSender<E: Event> {
    sender: Sender<E>,
}

impl<E: Event> EventSender<E> {
    /// Queues `event` for the next pump. Never blocks.
    pub fn send(&self, event: E) -> Result<(), EventError> {
        self.sender.try_send(event).map_err(|e| match e {
            TrySendError::Full(_) => EventError::Full,
            TrySendError::Disconnected(_) => EventError::Disconnected,
        })
    }
}

impl<E: Event> Clone for EventSender<E> {
    fn clone(&self) -> Self {
        Self {
            sender: self.sender.clone(),
        }
    }
}

//=== EventInbox ==========================================================

/// Receiving end owned by the state machine.
pub(crate) struct EventInbox<E: Event> {
    sender: Sender<E>,
    receiver: Receiver<E>,
}

impl<E: Event> EventInbox<E> {
    pub(crate) fn new(capacity: usize) -> Self {
        let (sender, receiver) = bounded(capacity);
        Self { sender, receiver }
    }

    pub(crate) fn sender(&self) -> EventSender<E> {
        EventSender {
            sender: self.sender.clone(),
        }
    }

    /// Takes up to [`MAX_EVENTS_PER_PUMP`] queued events, oldest first.
    pub(crate) fn drain(&self) -> Vec<E> {
        let mut events = Vec::new();

        while events.len() < MAX_EVENTS_PER_PUMP {
            match self.receiver.try_recv() {
                Ok(event) => events.push(event),
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
            }
        }

        if events.len() >= MAX_EVENTS_PER_PUMP {
            warn!("Event queue backlog: drained {} events this pump", events.len());
        }

        events
    }
}

//=========================================================================
// Unit Tests
//=========================================================================
