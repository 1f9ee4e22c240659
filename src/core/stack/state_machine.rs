//=========================================================================
// State Machine
//=========================================================================
//
// Owns the mode stack and drives every lifecycle hook.
//
// Architecture:
//   StateMachine
//     ├─ stack: Vec<Slot>            (index 0 = bottom, last = active)
//     ├─ transitions: TransitionQueue (requests raised inside hooks)
//     ├─ diagnostics: Vec<StackError>
//     └─ inbox: EventInbox           (external event source)
//
// Flow per tick:
//   apply pending → update → draw → draw2d → apply pending
//
// Hooks never see the machine itself, only a ModeContext, so the stack
// cannot change while it is being walked.
//
//=========================================================================

//=== External Dependencies ===============================================

use std::panic::{self, AssertUnwindSafe};

use log::{debug, error, warn};

//=== Internal Dependencies ===============================================

use super::{StackError, StackTransition, TransitionQueue};
use crate::core::events::{EventInbox, EventSender};
use crate::core::mode::{Event, Mode, ModeContext, ModeId, ModeInfo, ModeStatus, Wakefulness};

//=== Constants ===========================================================

/// Bound on apply rounds when hooks keep queueing new transitions.
const MAX_TRANSITION_ROUNDS: usize = 16;

//=== Slot ================================================================

/// A resident mode plus the bookkeeping the machine keeps for it.
struct Slot<E: Event> {
    id: ModeId,
    name: String,
    mode: Box<dyn Mode<E>>,
    status: ModeStatus,
    wakefulness: Wakefulness,
}

impl<E: Event> Slot<E> {
    fn info(&self) -> ModeInfo {
        ModeInfo {
            id: self.id,
            name: self.name.clone(),
            status: self.status,
            wakefulness: self.wakefulness,
        }
    }
}

//=== FramePhase ==========================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FramePhase {
    Update,
    Draw,
    Draw2d,
}

//=== StateMachine ========================================================

/// Stack-based controller deciding which mode receives per-frame work.
///
/// Only the top mode is `Active`; every mode below it is `Paused`.
/// `update`, `draw`, `draw2d` and events go to the active mode (plus any
/// paused mode that [works in parallel](Mode::works_in_parallel)), while
/// sleep and wakeup are broadcast to the whole stack.
///
/// Mutations requested from inside a hook are queued and applied once
/// the dispatch that raised them is over. Inside [`StateMachine::tick`]
/// that means after `draw2d`.
///
/// # Examples
///
/// ```rust
/// # use mode_stack::prelude::*;
/// struct Gameplay;
/// impl Mode<()> for Gameplay {
///     fn name(&self) -> &str { "Gameplay" }
/// }
///
/// struct PauseMenu;
/// impl Mode<()> for PauseMenu {
///     fn name(&self) -> &str { "PauseMenu" }
/// }
///
/// let mut machine = StateMachine::<()>::new();
/// machine.push(Gameplay);
/// machine.push(PauseMenu);
/// assert_eq!(machine.top().unwrap().name, "PauseMenu");
///
/// machine.pop().unwrap();
/// assert_eq!(machine.top().unwrap().status, ModeStatus::Active);
/// ```
pub struct StateMachine<E: Event> {
    stack: Vec<Slot<E>>,
    transitions: TransitionQueue<E>,
    diagnostics: Vec<StackError>,
    inbox: EventInbox<E>,
    next_id: u64,
    asleep: bool,
    contain_panics: bool,
}

impl<E: Event> StateMachine<E> {
    //--- Construction -----------------------------------------------------

    /// Creates an empty machine with default settings.
    ///
    /// Use [`super::StateMachineBuilder`] to change them.
    pub fn new() -> Self {
        super::StateMachineBuilder::new().build()
    }

    pub(crate) fn with_config(event_capacity: usize, contain_panics: bool) -> Self {
        Self {
            stack: Vec::new(),
            transitions: TransitionQueue::new(),
            diagnostics: Vec::new(),
            inbox: EventInbox::new(event_capacity),
            next_id: 0,
            asleep: false,
            contain_panics,
        }
    }

    //--- Immediate Stack Operations ---------------------------------------

    /// Pauses the current top and pushes `mode` as the new active mode.
    ///
    /// Requests raised by the hooks involved are applied before returning.
    pub fn push<M>(&mut self, mode: M) -> ModeId
    where
        M: Mode<E> + 'static,
    {
        self.push_boxed(Box::new(mode))
    }

    /// Boxed variant of [`StateMachine::push`].
    pub fn push_boxed(&mut self, mode: Box<dyn Mode<E>>) -> ModeId {
        let id = self.push_internal(mode);
        self.apply_transitions();
        id
    }

    /// Destroys the top mode and resumes the one below it.
    ///
    /// # Errors
    ///
    /// [`StackError::EmptyStack`] if nothing is resident. The stack is
    /// left untouched.
    pub fn pop(&mut self) -> Result<(), StackError> {
        let result = self.pop_internal();
        if let Err(err) = &result {
            warn!("Refused pop: {}", err);
        }
        self.apply_transitions();
        result
    }

    /// Destroys the top mode and constructs `mode` in its place.
    ///
    /// The mode below is neither paused nor resumed.
    ///
    /// # Errors
    ///
    /// [`StackError::EmptyStack`] if nothing is resident; `mode` is
    /// dropped without being constructed.
    pub fn replace<M>(&mut self, mode: M) -> Result<ModeId, StackError>
    where
        M: Mode<E> + 'static,
    {
        let result = self.replace_internal(Box::new(mode));
        if let Err(err) = &result {
            warn!("Refused replace: {}", err);
        }
        self.apply_transitions();
        result
    }

    /// Destroys every resident mode, top to bottom.
    pub fn clear(&mut self) {
        self.clear_internal();
        self.apply_transitions();
    }

    //--- Deferred Stack Operations ----------------------------------------

    /// Queues a push for the next safe point.
    pub fn request_push<M>(&mut self, mode: M)
    where
        M: Mode<E> + 'static,
    {
        self.transitions.push(StackTransition::Push(Box::new(mode)));
    }

    /// Queues a pop for the next safe point.
    pub fn request_pop(&mut self) {
        self.transitions.push(StackTransition::Pop);
    }

    /// Queues a full teardown for the next safe point.
    pub fn request_clear(&mut self) {
        self.transitions.push(StackTransition::Clear);
    }

    //--- Frame Driver -----------------------------------------------------

    /// Runs one frame: pending transitions, `update`, `draw`, `draw2d`.
    ///
    /// Transitions requested during the frame are applied after `draw2d`.
    /// A mode whose removal was requested earlier in the frame is not
    /// drawn again.
    pub fn tick(&mut self) {
        self.apply_transitions();

        self.run_phase(FramePhase::Update);
        self.run_phase(FramePhase::Draw);
        self.run_phase(FramePhase::Draw2d);

        self.apply_transitions();
    }

    /// Runs the logic phase on its own.
    pub fn update(&mut self) {
        self.run_phase(FramePhase::Update);
        self.apply_transitions();
    }

    /// Runs the scene draw phase on its own.
    pub fn draw(&mut self) {
        self.run_phase(FramePhase::Draw);
        self.apply_transitions();
    }

    /// Runs the overlay draw phase on its own.
    pub fn draw2d(&mut self) {
        self.run_phase(FramePhase::Draw2d);
        self.apply_transitions();
    }

    //--- Suspend / Resume -------------------------------------------------

    /// Broadcasts `on_sleep` to every awake mode, top to bottom.
    pub fn notify_sleep(&mut self) {
        if self.asleep {
            debug!("Sleep requested while already asleep");
        }
        self.asleep = true;

        for index in (0..self.stack.len()).rev() {
            if self.stack[index].wakefulness == Wakefulness::Asleep {
                continue;
            }
            self.stack[index].wakefulness = Wakefulness::Asleep;
            self.dispatch(index, "on_sleep", |mode, ctx| mode.on_sleep(ctx));
        }

        self.apply_transitions();
    }

    /// Broadcasts `on_wakeup` to every sleeping mode, bottom to top.
    pub fn notify_wakeup(&mut self) {
        if !self.asleep {
            debug!("Wakeup requested while already awake");
        }
        self.asleep = false;

        for index in 0..self.stack.len() {
            if self.stack[index].wakefulness == Wakefulness::Awake {
                continue;
            }
            self.stack[index].wakefulness = Wakefulness::Awake;
            self.dispatch(index, "on_wakeup", |mode, ctx| mode.on_wakeup(ctx));
        }

        self.apply_transitions();
    }

    //--- Events -----------------------------------------------------------

    /// Delivers `event` to the active mode.
    ///
    /// Returns `false` if the stack is empty; the event is dropped.
    pub fn forward_event(&mut self, event: E) -> bool {
        let Some(top) = self.stack.len().checked_sub(1) else {
            debug!("No active mode, dropping event");
            return false;
        };

        self.dispatch(top, "on_event", |mode, ctx| mode.on_event(&event, ctx));
        self.apply_transitions();
        true
    }

    /// Forwards events queued through [`EventSender`]s, oldest first.
    ///
    /// Each event goes to whichever mode is active once the previous one
    /// has been handled. Returns how many were delivered.
    pub fn pump_events(&mut self) -> usize {
        let mut delivered = 0;
        for event in self.inbox.drain() {
            if self.forward_event(event) {
                delivered += 1;
            }
        }
        delivered
    }

    /// Returns a handle external sources use to queue events.
    pub fn event_sender(&self) -> EventSender<E> {
        self.inbox.sender()
    }

    //--- Queries ----------------------------------------------------------

    /// Number of resident modes.
    pub fn len(&self) -> usize {
        self.stack.len()
    }

    /// Returns true if no mode is resident.
    pub fn is_empty(&self) -> bool {
        self.stack.is_empty()
    }

    /// Snapshot of the active mode.
    pub fn top(&self) -> Option<ModeInfo> {
        self.stack.last().map(Slot::info)
    }

    /// Id of the active mode.
    pub fn top_id(&self) -> Option<ModeId> {
        self.stack.last().map(|slot| slot.id)
    }

    /// Snapshots of every resident mode, bottom to top.
    pub fn modes(&self) -> Vec<ModeInfo> {
        self.stack.iter().map(Slot::info).collect()
    }

    /// Returns true between `notify_sleep` and `notify_wakeup`.
    pub fn is_asleep(&self) -> bool {
        self.asleep
    }

    /// Returns false while the active mode disables the loading indicator.
    pub fn loading_screen_enabled(&self) -> bool {
        self.stack
            .last()
            .map_or(true, |slot| !slot.mode.disables_loading_screen())
    }

    /// Number of transitions waiting for the next safe point.
    pub fn pending_transitions(&self) -> usize {
        self.transitions.len()
    }

    /// Takes refused operations and mode failures recorded so far.
    pub fn take_diagnostics(&mut self) -> Vec<StackError> {
        std::mem::take(&mut self.diagnostics)
    }

    //--- Transition Processing --------------------------------------------

    /// Applies queued transitions in FIFO order.
    ///
    /// Hooks fired while applying may queue more; those are applied in
    /// further rounds, up to a fixed bound.
    fn apply_transitions(&mut self) {
        let mut rounds = 0;

        while !self.transitions.is_empty() {
            if rounds == MAX_TRANSITION_ROUNDS {
                warn!(
                    "Transition cascade exceeded {} rounds, deferring {} transitions",
                    MAX_TRANSITION_ROUNDS,
                    self.transitions.len()
                );
                break;
            }
            rounds += 1;

            for transition in self.transitions.take() {
                let kind = transition.kind();
                let result = match transition {
                    StackTransition::Push(mode) => {
                        self.push_internal(mode);
                        Ok(())
                    }
                    StackTransition::Pop => self.pop_internal(),
                    StackTransition::PopMode(id) => self.pop_mode_internal(id),
                    StackTransition::Replace(mode) => self.replace_internal(mode).map(|_| ()),
                    StackTransition::Clear => {
                        self.clear_internal();
                        Ok(())
                    }
                };

                if let Err(err) = result {
                    warn!("Refused deferred {}: {}", kind, err);
                    self.diagnostics.push(err);
                }
            }
        }
    }

    //--- Internal Helpers -------------------------------------------------

    fn push_internal(&mut self, mode: Box<dyn Mode<E>>) -> ModeId {
        if let Some(top) = self.stack.len().checked_sub(1) {
            self.stack[top].status = ModeStatus::Paused;
            self.dispatch(top, "on_pause", |mode, ctx| mode.on_pause(ctx));
        }

        self.attach(mode)
    }

    fn pop_internal(&mut self) -> Result<(), StackError> {
        let slot = self.stack.pop().ok_or(StackError::EmptyStack)?;
        self.destroy(slot);

        if let Some(top) = self.stack.len().checked_sub(1) {
            self.stack[top].status = ModeStatus::Active;
            self.dispatch(top, "on_resume", |mode, ctx| mode.on_resume(ctx));
        }

        Ok(())
    }

    fn pop_mode_internal(&mut self, id: ModeId) -> Result<(), StackError> {
        let top = self.top_id();
        if top != Some(id) {
            return Err(StackError::NotOnTop { id, top });
        }

        self.pop_internal()
    }

    fn replace_internal(&mut self, mode: Box<dyn Mode<E>>) -> Result<ModeId, StackError> {
        let slot = self.stack.pop().ok_or(StackError::EmptyStack)?;
        self.destroy(slot);

        Ok(self.attach(mode))
    }

    fn clear_internal(&mut self) {
        debug!("Clearing {} modes from stack", self.stack.len());

        while let Some(slot) = self.stack.pop() {
            self.destroy(slot);
        }
    }

    /// Places `mode` on top, constructs it and makes it active.
    fn attach(&mut self, mode: Box<dyn Mode<E>>) -> ModeId {
        let id = ModeId::from_raw(self.next_id);
        self.next_id += 1;

        let name = mode.name().to_string();
        debug!("Pushing mode {} ({}) at depth {}", name, id, self.stack.len());

        self.stack.push(Slot {
            id,
            name,
            mode,
            status: ModeStatus::Constructed,
            wakefulness: Wakefulness::Awake,
        });

        let index = self.stack.len() - 1;
        self.dispatch(index, "on_construct", |mode, ctx| mode.on_construct(ctx));
        self.stack[index].status = ModeStatus::Active;

        id
    }

    /// Runs `on_destruct` on a slot already detached from the stack.
    fn destroy(&mut self, mut slot: Slot<E>) {
        debug!("Destroying mode {} ({})", slot.name, slot.id);
        slot.status = ModeStatus::Destroyed;

        call_hook(
            &mut slot,
            &mut self.transitions,
            &mut self.diagnostics,
            self.contain_panics,
            "on_destruct",
            |mode, ctx| mode.on_destruct(ctx),
        );
    }

    fn run_phase(&mut self, phase: FramePhase) {
        let Some(top) = self.stack.len().checked_sub(1) else {
            return;
        };

        let resident: Vec<ModeId> = self.stack.iter().map(|slot| slot.id).collect();

        for index in 0..=top {
            if index != top && !self.stack[index].mode.works_in_parallel() {
                continue;
            }

            // Modes at or above this depth are already on their way out.
            if index >= resident.len() - self.transitions.evicted(&resident) {
                return;
            }

            match phase {
                FramePhase::Update => self.dispatch(index, "update", |mode, ctx| mode.update(ctx)),
                FramePhase::Draw => self.dispatch(index, "draw", |mode, ctx| mode.draw(ctx)),
                FramePhase::Draw2d => self.dispatch(index, "draw2d", |mode, ctx| mode.draw2d(ctx)),
            }
        }
    }

    /// Calls a hook on a resident mode.
    ///
    /// A contained panic in the top mode queues its removal.
    fn dispatch<F>(&mut self, index: usize, hook: &'static str, f: F)
    where
        F: FnOnce(&mut dyn Mode<E>, &mut ModeContext<'_, E>),
    {
        let is_top = index + 1 == self.stack.len();
        let slot = &mut self.stack[index];
        let id = slot.id;

        let panicked = call_hook(
            slot,
            &mut self.transitions,
            &mut self.diagnostics,
            self.contain_panics,
            hook,
            f,
        );

        if panicked && is_top {
            self.transitions.push(StackTransition::PopMode(id));
        }
    }
}

impl<E: Event> Default for StateMachine<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: Event> Drop for StateMachine<E> {
    fn drop(&mut self) {
        if !self.stack.is_empty() {
            debug!("Tearing down state machine with {} modes", self.stack.len());
        }

        self.clear_internal();

        // Nothing is left to receive these.
        self.transitions.take();
    }
}

//=== Hook Invocation =====================================================

/// Runs `f` against the slot's mode with a fresh context.
///
/// Returns true if the hook panicked and the panic was contained.
fn call_hook<E, F>(
    slot: &mut Slot<E>,
    transitions: &mut TransitionQueue<E>,
    diagnostics: &mut Vec<StackError>,
    contain_panics: bool,
    hook: &'static str,
    f: F,
) -> bool
where
    E: Event,
    F: FnOnce(&mut dyn Mode<E>, &mut ModeContext<'_, E>),
{
    let mut ctx = ModeContext::new(slot.id, &slot.name, transitions, diagnostics);
    let mode = slot.mode.as_mut();

    if !contain_panics {
        f(mode, &mut ctx);
        return false;
    }

    if panic::catch_unwind(AssertUnwindSafe(|| f(mode, &mut ctx))).is_ok() {
        return false;
    }

    let failure = StackError::HookPanicked {
        id: slot.id,
        name: slot.name.clone(),
        hook,
    };
    error!("{}", failure);
    diagnostics.push(failure);
    true
}

//=========================================================================
// Unit Tests
//=========================================================================

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::*;
    use crate::core::mode::BootMode;
    use crate::core::stack::StateMachineBuilder;
    use crate::core::RunState;

    //--- Test Helpers -----------------------------------------------------

    type Log = Arc<Mutex<Vec<String>>>;
    type Script = Box<dyn FnMut(&mut ModeContext<'_, u32>) + Send>;

    /// Records every hook call as `"<name>.<hook>"`.
    struct Recorder {
        name: &'static str,
        log: Log,
        parallel: bool,
        no_loading: bool,
        on_update: Option<Script>,
        on_event: Option<Script>,
        on_sleep: Option<Script>,
        panic_on_construct: bool,
    }

    impl Recorder {
        fn new(name: &'static str, log: &Log) -> Self {
            Self {
                name,
                log: Arc::clone(log),
                parallel: false,
                no_loading: false,
                on_update: None,
                on_event: None,
                on_sleep: None,
                panic_on_construct: false,
            }
        }

        fn parallel(mut self) -> Self {
            self.parallel = true;
            self
        }

        fn without_loading_screen(mut self) -> Self {
            self.no_loading = true;
            self
        }

        fn with_update(mut self, script: impl FnMut(&mut ModeContext<'_, u32>) + Send + 'static) -> Self {
            self.on_update = Some(Box::new(script));
            self
        }

        fn with_event(mut self, script: impl FnMut(&mut ModeContext<'_, u32>) + Send + 'static) -> Self {
            self.on_event = Some(Box::new(script));
            self
        }

        fn with_sleep(mut self, script: impl FnMut(&mut ModeContext<'_, u32>) + Send + 'static) -> Self {
            self.on_sleep = Some(Box::new(script));
            self
        }

        fn panicking_on_construct(mut self) -> Self {
            self.panic_on_construct = true;
            self
        }

        fn record(&self, hook: &str) {
            self.log.lock().unwrap().push(format!("{}.{}", self.name, hook));
        }
    }

    impl Mode<u32> for Recorder {
        fn name(&self) -> &str {
            self.name
        }

        fn on_construct(&mut self, _ctx: &mut ModeContext<'_, u32>) {
            self.record("construct");
            if self.panic_on_construct {
                panic!("construct failed");
            }
        }

        fn on_destruct(&mut self, _ctx: &mut ModeContext<'_, u32>) {
            self.record("destruct");
        }

        fn on_pause(&mut self, _ctx: &mut ModeContext<'_, u32>) {
            self.record("pause");
        }

        fn on_resume(&mut self, _ctx: &mut ModeContext<'_, u32>) {
            self.record("resume");
        }

        fn update(&mut self, ctx: &mut ModeContext<'_, u32>) {
            self.record("update");
            if let Some(script) = self.on_update.as_mut() {
                script(ctx);
            }
        }

        fn draw(&mut self, _ctx: &mut ModeContext<'_, u32>) {
            self.record("draw");
        }

        fn draw2d(&mut self, _ctx: &mut ModeContext<'_, u32>) {
            self.record("draw2d");
        }

        fn on_sleep(&mut self, ctx: &mut ModeContext<'_, u32>) {
            self.record("sleep");
            if let Some(script) = self.on_sleep.as_mut() {
                script(ctx);
            }
        }

        fn on_wakeup(&mut self, _ctx: &mut ModeContext<'_, u32>) {
            self.record("wakeup");
        }

        fn on_event(&mut self, event: &u32, ctx: &mut ModeContext<'_, u32>) {
            self.record(&format!("event({})", event));
            if let Some(script) = self.on_event.as_mut() {
                script(ctx);
            }
        }

        fn works_in_parallel(&self) -> bool {
            self.parallel
        }

        fn disables_loading_screen(&self) -> bool {
            self.no_loading
        }
    }

    fn new_log() -> Log {
        Arc::new(Mutex::new(Vec::new()))
    }

    fn drain(log: &Log) -> Vec<String> {
        std::mem::take(&mut *log.lock().unwrap())
    }

    fn names(machine: &StateMachine<u32>) -> Vec<String> {
        machine.modes().into_iter().map(|info| info.name).collect()
    }

    /// Exactly one active mode, on top; everything below paused.
    fn assert_stack_invariants(machine: &StateMachine<u32>) {
        let modes = machine.modes();
        if let Some((top, below)) = modes.split_last() {
            assert_eq!(top.status, ModeStatus::Active, "top must be active");
            for info in below {
                assert_eq!(info.status, ModeStatus::Paused, "{} must be paused", info.name);
            }
        }
    }

    //--- Push / Pop -------------------------------------------------------

    #[test]
    fn push_pauses_previous_top_before_constructing() {
        let log = new_log();
        let mut machine = StateMachine::<u32>::new();

        machine.push(Recorder::new("A", &log));
        machine.push(Recorder::new("B", &log));

        assert_eq!(drain(&log), ["A.construct", "A.pause", "B.construct"]);
        assert_stack_invariants(&machine);

        machine.pop().unwrap();

        assert_eq!(drain(&log), ["B.destruct", "A.resume"]);
        assert_stack_invariants(&machine);
    }

    #[test]
    fn push_then_pop_restores_previous_stack() {
        let log = new_log();
        let mut machine = StateMachine::<u32>::new();
        machine.push(Recorder::new("Base", &log));
        let before = machine.modes();
        drain(&log);

        machine.push(Recorder::new("Overlay", &log));
        machine.pop().unwrap();

        assert_eq!(machine.modes(), before);
        let destructs = drain(&log)
            .into_iter()
            .filter(|entry| entry == "Overlay.destruct")
            .count();
        assert_eq!(destructs, 1);
    }

    #[test]
    fn ids_are_unique_and_monotonic() {
        let log = new_log();
        let mut machine = StateMachine::<u32>::new();

        let a = machine.push(Recorder::new("A", &log));
        machine.pop().unwrap();
        let b = machine.push(Recorder::new("A", &log));

        assert_ne!(a, b);
        assert!(b > a);
        assert_eq!(machine.top_id(), Some(b));
    }

    #[test]
    fn pop_on_empty_stack_is_refused() {
        let mut machine = StateMachine::<u32>::new();

        assert_eq!(machine.pop(), Err(StackError::EmptyStack));
        assert!(machine.is_empty());
    }

    #[test]
    fn deferred_pop_on_empty_stack_is_reported() {
        let mut machine = StateMachine::<u32>::new();

        machine.request_pop();
        machine.tick();

        assert_eq!(machine.take_diagnostics(), vec![StackError::EmptyStack]);
        assert!(machine.take_diagnostics().is_empty());
    }

    #[test]
    fn replace_swaps_top_without_resuming_below() {
        let log = new_log();
        let mut machine = StateMachine::<u32>::new();
        machine.push(Recorder::new("A", &log));
        machine.push(Recorder::new("B", &log));
        drain(&log);

        machine.replace(Recorder::new("C", &log)).unwrap();

        assert_eq!(drain(&log), ["B.destruct", "C.construct"]);
        assert_eq!(names(&machine), ["A", "C"]);
        assert_stack_invariants(&machine);
    }

    #[test]
    fn replace_on_empty_stack_is_refused() {
        let log = new_log();
        let mut machine = StateMachine::<u32>::new();

        assert_eq!(machine.replace(Recorder::new("A", &log)), Err(StackError::EmptyStack));
        assert!(machine.is_empty());
        assert!(drain(&log).is_empty());
    }

    #[test]
    fn clear_destroys_top_to_bottom() {
        let log = new_log();
        let mut machine = StateMachine::<u32>::new();
        machine.push(Recorder::new("A", &log));
        machine.push(Recorder::new("B", &log));
        machine.push(Recorder::new("C", &log));
        drain(&log);

        machine.clear();

        assert_eq!(drain(&log), ["C.destruct", "B.destruct", "A.destruct"]);
        assert!(machine.is_empty());
    }

    #[test]
    fn drop_tears_down_every_mode_once() {
        let log = new_log();
        {
            let mut machine = StateMachine::<u32>::new();
            machine.push(Recorder::new("A", &log));
            machine.push(Recorder::new("B", &log));
            drain(&log);
        }

        assert_eq!(drain(&log), ["B.destruct", "A.destruct"]);
    }

    //--- Frame Dispatch ---------------------------------------------------

    #[test]
    fn tick_drives_only_the_top_mode() {
        let log = new_log();
        let mut machine = StateMachine::<u32>::new();
        machine.push(Recorder::new("A", &log));
        machine.push(Recorder::new("B", &log));
        drain(&log);

        machine.tick();

        assert_eq!(drain(&log), ["B.update", "B.draw", "B.draw2d"]);
    }

    #[test]
    fn parallel_modes_keep_running_while_paused() {
        let log = new_log();
        let mut machine = StateMachine::<u32>::new();
        machine.push(Recorder::new("World", &log).parallel());
        machine.push(Recorder::new("Hud", &log));
        drain(&log);

        machine.tick();

        assert_eq!(
            drain(&log),
            ["World.update", "Hud.update", "World.draw", "Hud.draw", "World.draw2d", "Hud.draw2d"]
        );
        assert_stack_invariants(&machine);
    }

    #[test]
    fn push_from_update_lands_after_the_frame() {
        let log = new_log();
        let mut machine = StateMachine::<u32>::new();
        let child_log = Arc::clone(&log);
        let mut pushed = false;
        machine.push(Recorder::new("A", &log).with_update(move |ctx| {
            if !pushed {
                ctx.request_push(Recorder::new("B", &child_log));
                pushed = true;
            }
        }));
        drain(&log);

        machine.tick();

        assert_eq!(
            drain(&log),
            ["A.update", "A.draw", "A.draw2d", "A.pause", "B.construct"]
        );
        assert_eq!(machine.len(), 2);
        assert_stack_invariants(&machine);

        machine.tick();
        assert_eq!(drain(&log), ["B.update", "B.draw", "B.draw2d"]);
    }

    #[test]
    fn mode_popping_itself_is_not_drawn_again() {
        let log = new_log();
        let mut machine = StateMachine::<u32>::new();
        machine.push(Recorder::new("A", &log));
        machine.push(Recorder::new("B", &log).with_update(|ctx| ctx.request_pop_self()));
        drain(&log);

        machine.tick();

        assert_eq!(drain(&log), ["B.update", "B.destruct", "A.resume"]);
        assert_eq!(names(&machine), ["A"]);
        assert_stack_invariants(&machine);
    }

    #[test]
    fn parallel_mode_below_a_double_pop_is_not_drawn() {
        let log = new_log();
        let mut machine = StateMachine::<u32>::new();
        machine.push(Recorder::new("Base", &log));
        machine.push(Recorder::new("A", &log).parallel());
        machine.push(Recorder::new("B", &log).with_update(|ctx| {
            ctx.request_pop();
            ctx.request_pop();
        }));
        drain(&log);

        machine.tick();

        assert_eq!(
            drain(&log),
            ["A.update", "B.update", "B.destruct", "A.resume", "A.destruct", "Base.resume"]
        );
        assert_eq!(names(&machine), ["Base"]);
        assert_stack_invariants(&machine);
    }

    #[test]
    fn deferred_replace_swaps_top_after_the_frame() {
        let log = new_log();
        let mut machine = StateMachine::<u32>::new();
        machine.push(Recorder::new("A", &log));
        let next_log = Arc::clone(&log);
        let mut replaced = false;
        machine.push(Recorder::new("B", &log).with_update(move |ctx| {
            if !replaced {
                ctx.request_replace(Recorder::new("C", &next_log));
                replaced = true;
            }
        }));
        drain(&log);

        machine.tick();

        assert_eq!(drain(&log), ["B.update", "B.destruct", "C.construct"]);
        assert_eq!(names(&machine), ["A", "C"]);
        assert_stack_invariants(&machine);
    }

    #[test]
    fn pop_self_from_below_top_is_refused() {
        let log = new_log();
        let mut machine = StateMachine::<u32>::new();
        let a = machine.push(Recorder::new("A", &log).parallel().with_update(|ctx| ctx.request_pop_self()));
        let b = machine.push(Recorder::new("B", &log));

        machine.tick();

        assert_eq!(names(&machine), ["A", "B"]);
        assert_eq!(
            machine.take_diagnostics(),
            vec![StackError::NotOnTop { id: a, top: Some(b) }]
        );
    }

    #[test]
    fn external_requests_apply_at_start_of_tick() {
        let log = new_log();
        let mut machine = StateMachine::<u32>::new();
        machine.push(Recorder::new("A", &log));
        drain(&log);

        machine.request_push(Recorder::new("B", &log));
        assert_eq!(machine.pending_transitions(), 1);
        assert_eq!(machine.len(), 1);

        machine.tick();

        assert_eq!(
            drain(&log),
            ["A.pause", "B.construct", "B.update", "B.draw", "B.draw2d"]
        );
        assert_eq!(machine.pending_transitions(), 0);
    }

    #[test]
    fn deferred_clear_stops_drawing_everything() {
        let log = new_log();
        let mut machine = StateMachine::<u32>::new();
        machine.push(Recorder::new("World", &log).parallel());
        machine.push(Recorder::new("Menu", &log).with_update(|ctx| ctx.request_clear()));
        drain(&log);

        machine.tick();

        assert_eq!(
            drain(&log),
            ["World.update", "Menu.update", "Menu.destruct", "World.destruct"]
        );
        assert!(machine.is_empty());
    }

    #[test]
    fn tick_on_empty_stack_does_nothing() {
        let mut machine = StateMachine::<u32>::new();
        machine.tick();
        machine.update();
        machine.draw();
        machine.draw2d();
        assert!(machine.is_empty());
        assert!(machine.take_diagnostics().is_empty());
    }

    //--- Sleep / Wakeup ---------------------------------------------------

    #[test]
    fn sleep_and_wakeup_are_broadcast_in_opposite_orders() {
        let log = new_log();
        let mut machine = StateMachine::<u32>::new();
        machine.push(Recorder::new("A", &log));
        machine.push(Recorder::new("B", &log));
        drain(&log);

        machine.notify_sleep();
        assert_eq!(drain(&log), ["B.sleep", "A.sleep"]);
        assert!(machine.is_asleep());
        assert!(machine
            .modes()
            .iter()
            .all(|info| info.wakefulness == Wakefulness::Asleep));
        assert_stack_invariants(&machine);

        machine.notify_wakeup();
        assert_eq!(drain(&log), ["A.wakeup", "B.wakeup"]);
        assert!(!machine.is_asleep());
    }

    #[test]
    fn clear_requested_during_sleep_applies_after_broadcast() {
        let log = new_log();
        let mut machine = StateMachine::<u32>::new();
        machine.push(Recorder::new("A", &log));
        machine.push(Recorder::new("B", &log).with_sleep(|ctx| ctx.request_clear()));
        drain(&log);

        machine.notify_sleep();

        assert_eq!(drain(&log), ["B.sleep", "A.sleep", "B.destruct", "A.destruct"]);
        assert!(machine.is_empty());
    }

    #[test]
    fn repeated_sleep_is_not_rebroadcast() {
        let log = new_log();
        let mut machine = StateMachine::<u32>::new();
        machine.push(Recorder::new("A", &log));
        drain(&log);

        machine.notify_sleep();
        machine.notify_sleep();
        assert_eq!(drain(&log), ["A.sleep"]);

        machine.push(Recorder::new("B", &log));
        drain(&log);
        machine.notify_wakeup();
        assert_eq!(drain(&log), ["A.wakeup"]);
    }

    //--- Events -----------------------------------------------------------

    #[test]
    fn events_reach_only_the_active_mode() {
        let log = new_log();
        let mut machine = StateMachine::<u32>::new();
        machine.push(Recorder::new("A", &log).parallel());
        machine.push(Recorder::new("B", &log));
        drain(&log);

        assert!(machine.forward_event(7));

        assert_eq!(drain(&log), ["B.event(7)"]);
    }

    #[test]
    fn events_without_listener_are_dropped() {
        let mut machine = StateMachine::<u32>::new();
        let sender = machine.event_sender();
        sender.send(1).unwrap();

        assert!(!machine.forward_event(2));
        assert_eq!(machine.pump_events(), 0);
        assert_eq!(machine.pump_events(), 0);
    }

    #[test]
    fn pumped_events_follow_stack_membership() {
        let log = new_log();
        let mut machine = StateMachine::<u32>::new();
        machine.push(Recorder::new("A", &log));
        machine.push(Recorder::new("B", &log).with_event(|ctx| ctx.request_pop_self()));
        drain(&log);

        let sender = machine.event_sender();
        sender.send(1).unwrap();
        sender.send(2).unwrap();

        assert_eq!(machine.pump_events(), 2);
        assert_eq!(
            drain(&log),
            ["B.event(1)", "B.destruct", "A.resume", "A.event(2)"]
        );
    }

    #[test]
    fn clear_requested_from_event_applies_before_next_event() {
        let log = new_log();
        let mut machine = StateMachine::<u32>::new();
        machine.push(Recorder::new("A", &log));
        machine.push(Recorder::new("B", &log).with_event(|ctx| ctx.request_clear()));
        drain(&log);

        assert!(machine.forward_event(1));
        assert_eq!(drain(&log), ["B.event(1)", "B.destruct", "A.destruct"]);
        assert!(machine.is_empty());

        assert!(!machine.forward_event(2));
        assert!(drain(&log).is_empty());
    }

    //--- Failures ---------------------------------------------------------

    #[test]
    fn reported_failure_is_kept_as_diagnostic() {
        let log = new_log();
        let mut machine = StateMachine::<u32>::new();
        let id = machine.push(Recorder::new("Loader", &log).with_update(|ctx| ctx.report_failure("disk")));

        machine.tick();

        assert_eq!(
            machine.take_diagnostics(),
            vec![StackError::ModeFailed {
                id,
                name: "Loader".to_string(),
                reason: "disk".to_string(),
            }]
        );
        assert_eq!(machine.len(), 1);
    }

    #[test]
    fn panicking_hook_is_contained_and_mode_removed() {
        let log = new_log();
        let mut machine = StateMachine::<u32>::new();
        machine.push(Recorder::new("Stable", &log));
        let id = machine.push(Recorder::new("Broken", &log).with_update(|_| panic!("boom")));
        drain(&log);

        machine.tick();

        assert_eq!(drain(&log), ["Broken.update", "Broken.destruct", "Stable.resume"]);
        assert_eq!(
            machine.take_diagnostics(),
            vec![StackError::HookPanicked {
                id,
                name: "Broken".to_string(),
                hook: "update",
            }]
        );
        assert_eq!(names(&machine), ["Stable"]);

        machine.tick();
        assert_eq!(drain(&log), ["Stable.update", "Stable.draw", "Stable.draw2d"]);
    }

    #[test]
    fn panic_in_construct_removes_the_new_mode() {
        let log = new_log();
        let mut machine = StateMachine::<u32>::new();
        machine.push(Recorder::new("Stable", &log));
        drain(&log);

        let id = machine.push(Recorder::new("Broken", &log).panicking_on_construct());

        assert_eq!(
            drain(&log),
            ["Stable.pause", "Broken.construct", "Broken.destruct", "Stable.resume"]
        );
        assert_eq!(
            machine.take_diagnostics(),
            vec![StackError::HookPanicked {
                id,
                name: "Broken".to_string(),
                hook: "on_construct",
            }]
        );
        assert_eq!(names(&machine), ["Stable"]);
        assert_stack_invariants(&machine);
    }

    #[test]
    fn uncontained_panic_unwinds_to_the_caller() {
        let log = new_log();
        let mut machine = StateMachineBuilder::<u32>::new()
            .with_panic_containment(false)
            .build();
        machine.push(Recorder::new("Stable", &log));
        machine.push(Recorder::new("Broken", &log).with_update(|_| panic!("boom")));

        let outcome = panic::catch_unwind(AssertUnwindSafe(|| machine.tick()));

        assert!(outcome.is_err());
        assert!(machine.take_diagnostics().is_empty());
        assert_eq!(machine.pending_transitions(), 0);
        assert_eq!(names(&machine), ["Stable", "Broken"]);
    }

    //--- Configuration Flags ----------------------------------------------

    #[test]
    fn loading_screen_follows_top_mode() {
        let log = new_log();
        let mut machine = StateMachine::<u32>::new();
        assert!(machine.loading_screen_enabled());

        machine.push(Recorder::new("Menu", &log));
        assert!(machine.loading_screen_enabled());

        machine.push(Recorder::new("Cutscene", &log).without_loading_screen());
        assert!(!machine.loading_screen_enabled());

        machine.pop().unwrap();
        assert!(machine.loading_screen_enabled());
    }

    //--- Bootstrap --------------------------------------------------------

    #[test]
    fn boot_mode_starts_first_mode_once_running() {
        let log = new_log();
        let run_state = RunState::new();
        let mut machine = StateMachine::<u32>::new();
        let menu_log = Arc::clone(&log);
        machine.push(BootMode::new(run_state.clone(), move || Recorder::new("Menu", &menu_log)));

        for _ in 0..10 {
            machine.tick();
        }
        assert_eq!(machine.len(), 1);

        run_state.set_running(true);
        machine.tick();
        assert_eq!(names(&machine), ["BootMode", "Menu"]);

        for _ in 0..10 {
            machine.tick();
        }
        assert_eq!(machine.len(), 2);
        assert_stack_invariants(&machine);

        machine.pop().unwrap();
        machine.tick();
        assert_eq!(names(&machine), ["BootMode"]);
    }
}
