//=========================================================================
// Event Delivery
//=========================================================================
//
// Routes external events to whichever mode is active.
//
// Subscription follows stack membership: only the active mode hears an
// event, and a popped mode never hears another. Events that arrive with
// nobody listening are dropped.
//
//=========================================================================

//=== Module Declarations =================================================

mod event_channel;

//=== Public API ==========================================================

pub use event_channel::{EventError, EventSender, MAX_EVENTS_PER_PUMP};

pub(crate) use event_channel::EventInbox;
