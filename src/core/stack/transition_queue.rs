//=========================================================================
// Transition Queue
//=========================================================================
//
// Queue for deferred stack mutations.
//
// Modes queue transitions here from inside their hooks. The state machine
// drains the queue once the dispatch that raised them has unwound.
//
//=========================================================================

//=== Internal Dependencies ===============================================

use crate::core::mode::{Event, Mode, ModeId};

//=== Stack Transition ====================================================

/// A requested change to the mode stack.
pub enum StackTransition<E: Event> {
    /// Pauses the top mode and pushes a new one above it.
    Push(Box<dyn Mode<E>>),

    /// Destroys the top mode and resumes the one below.
    Pop,

    /// Like `Pop`, but only if the given mode is still on top.
    PopMode(ModeId),

    /// Destroys the top mode and constructs a new one in its place.
    Replace(Box<dyn Mode<E>>),

    /// Destroys every mode, top to bottom.
    Clear,
}

impl<E: Event> StackTransition<E> {
    /// Short label used in diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Push(_) => "push",
            Self::Pop => "pop",
            Self::PopMode(_) => "pop_mode",
            Self::Replace(_) => "replace",
            Self::Clear => "clear",
        }
    }
}

//=== Transition Queue ====================================================

/// FIFO of pending stack transitions.
pub struct TransitionQueue<E: Event> {
    queue: Vec<StackTransition<E>>,
}

impl<E: Event> TransitionQueue<E> {
    /// Creates a new empty transition queue.
    pub fn new() -> Self {
        Self { queue: Vec::new() }
    }

    /// Queues a transition to be applied at the next safe point.
    pub fn push(&mut self, transition: StackTransition<E>) {
        self.queue.push(transition);
    }

    /// Returns an iterator over the queued transitions.
    pub fn iter(&self) -> impl Iterator<Item = &StackTransition<E>> {
        self.queue.iter()
    }

    /// Returns true if the queue is empty.
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Returns the number of queued transitions.
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    /// Takes all transitions from the queue, leaving it empty.
    pub fn take(&mut self) -> Vec<StackTransition<E>> {
        std::mem::take(&mut self.queue)
    }

    /// Counts how many resident modes applying the queue would remove.
    ///
    /// `resident` lists the ids on the stack, bottom to top. Pushes raise
    /// a virtual depth above the top, so a later pop consumes the pushed
    /// mode first. The removed modes are always the topmost ones.
    pub fn evicted(&self, resident: &[ModeId]) -> usize {
        let mut removed = 0usize;
        let mut above = 0usize;

        for transition in &self.queue {
            match transition {
                StackTransition::Push(_) => above += 1,
                StackTransition::Pop => {
                    if above > 0 {
                        above -= 1;
                    } else if removed < resident.len() {
                        removed += 1;
                    }
                }
                StackTransition::Replace(_) => {
                    if above == 0 && removed < resident.len() {
                        removed += 1;
                        above += 1;
                    }
                }
                StackTransition::PopMode(id) => {
                    let top = resident.len().checked_sub(removed + 1).map(|index| resident[index]);
                    if above == 0 && top == Some(*id) {
                        removed += 1;
                    }
                }
                StackTransition::Clear => {
                    removed = resident.len();
                    above = 0;
                }
            }
        }

        removed
    }
}

impl<E: Event> Default for TransitionQueue<E> {
    fn default() -> Self {
        Self::new()
    }
}

//=========================================================================
// Unit Tests
//=========================================================================
