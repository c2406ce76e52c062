//! View and Mode activation management
//!
//! Both managers are the same machine: a registry of handlers, one active id,
//! a single-slot previous id and a temporary-activation flag. Views decide
//! the full-surface interaction mapping (pad grid + buttons); modes decide
//! what the knob row edits and what the display shows.
//!
//! History is deliberately one level deep: `restore` swaps the active and
//! previous slots, so two consecutive restores toggle between the last two
//! ids instead of unwinding further. Nested temporary activations can
//! therefore lose the base id they started from.

use crate::canvas::{GridBuffer, LightState};
use crate::config::{ControlId, PadIndex};
use crate::host::HostState;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::fmt::Debug;
use std::hash::Hash;
use std::sync::Arc;
use tracing::{debug, warn};

/// Workflow view identifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ViewId {
    /// Clip/scene launching
    Session,
    /// Melodic note playing
    Play,
    /// Drum pads
    Drum,
    /// Step sequencing
    Sequencer,
    /// Content browsing
    Browser,
    /// Shift overlay view
    Shift,
}

/// Knob-row mode identifiers.
///
/// Send levels are a tagged variant rather than `Send1`/`Send2`/... so a
/// send index can never be fabricated by id arithmetic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModeId {
    Track,
    Volume,
    Pan,
    /// Send level, by send slot index
    Send(u8),
    Device,
    Scale,
}

/// Scene-button capability, implemented by views that use the scene column
pub trait SceneButtons: Send + Sync {
    fn scene_light(&self, index: usize) -> LightState;
    fn launch_scene(&self, index: usize);
}

/// Horizontal paging capability, implemented by views that scroll sideways
pub trait HorizontalScroll: Send + Sync {
    fn can_scroll_left(&self) -> bool;
    fn can_scroll_right(&self) -> bool;
    fn scroll_left(&self);
    fn scroll_right(&self);
}

/// A full-surface interaction mapping.
///
/// Registered once at setup time and alive for the process lifetime. The
/// reconciler calls `draw_grid` and `button_light` every flush tick, so both
/// must be cheap snapshot reads.
pub trait View: Send + Sync {
    fn name(&self) -> &str;

    /// Produce the desired pad-color matrix
    fn draw_grid(&self, grid: &mut GridBuffer);

    /// Note-mapping table for pad grids; None = pad sends no note
    fn note_for_pad(&self, _pad: PadIndex) -> Option<u8> {
        None
    }

    /// A pad was hit while this view is active
    fn on_grid_note(&self, _pad: PadIndex, _velocity: u8) {}

    /// Desired LED state for a primary button, combining the view's own
    /// state with the observed application snapshot; None renders off
    fn button_light(&self, _control: ControlId, _host: &dyn HostState) -> Option<LightState> {
        None
    }

    /// Capability accessors replace downcasting: variants that support the
    /// feature return Some(self).
    fn scene_buttons(&self) -> Option<&dyn SceneButtons> {
        None
    }

    fn horizontal_scroll(&self) -> Option<&dyn HorizontalScroll> {
        None
    }
}

/// A knob-row parameter mapping
pub trait Mode: Send + Sync {
    fn name(&self) -> &str;

    /// Current value of knob `index` for LED-ring rendering; None renders off
    fn knob_value(&self, index: usize) -> Option<u8>;

    /// Knob `index` was turned by `delta` detents
    fn on_knob(&self, _index: usize, _delta: i32) {}

    /// Text for one display cell; None renders blank
    fn display_cell(&self, _row: usize, _index: usize) -> Option<String> {
        None
    }
}

type Listener<I> = Arc<dyn Fn(Option<I>, I) + Send + Sync>;

struct ManagerState<I, H: ?Sized> {
    handlers: HashMap<I, Arc<H>>,
    active: Option<I>,
    previous: Option<I>,
    temporary: bool,
}

/// One-level-of-history activation state machine, shared by views and modes
pub struct ActivationManager<I, H: ?Sized> {
    /// "view" or "mode", for logging only
    label: &'static str,
    state: RwLock<ManagerState<I, H>>,
    listeners: RwLock<Vec<Listener<I>>>,
}

pub type ViewManager = ActivationManager<ViewId, dyn View>;
pub type ModeManager = ActivationManager<ModeId, dyn Mode>;

impl<I, H> ActivationManager<I, H>
where
    I: Copy + Eq + Hash + Debug + Send + Sync + 'static,
    H: ?Sized + Send + Sync,
{
    pub fn new(label: &'static str) -> Self {
        Self {
            label,
            state: RwLock::new(ManagerState {
                handlers: HashMap::new(),
                active: None,
                previous: None,
                temporary: false,
            }),
            listeners: RwLock::new(Vec::new()),
        }
    }

    /// Register a handler. The first registration becomes active without
    /// notifying listeners (setup time).
    pub fn register(&self, id: I, handler: Arc<H>) {
        let mut state = self.state.write();
        if state.handlers.insert(id, handler).is_some() {
            warn!("{} {:?} registered twice, replacing handler", self.label, id);
        }
        if state.active.is_none() {
            state.active = Some(id);
        }
    }

    /// Subscribe to activation changes; called with (previous, active)
    pub fn add_listener<F>(&self, listener: F)
    where
        F: Fn(Option<I>, I) + Send + Sync + 'static,
    {
        self.listeners.write().push(Arc::new(listener));
    }

    /// Activate `id`. No-op when it is already active; rejected with a warn
    /// when the id was never registered.
    pub fn set_active(&self, id: I) {
        let previous = {
            let mut state = self.state.write();
            if !state.handlers.contains_key(&id) {
                warn!("{} {:?} not registered, ignoring activation", self.label, id);
                return;
            }
            if state.active == Some(id) {
                return;
            }
            let previous = state.active;
            state.previous = previous;
            state.active = Some(id);
            state.temporary = false;
            previous
        };
        debug!("{}: {:?} -> {:?}", self.label, previous, id);
        self.notify(previous, id);
    }

    /// Swap back to the previous id. A second consecutive restore toggles
    /// forward again; it never walks deeper. No-op without history.
    pub fn restore(&self) {
        let (left, entered) = {
            let mut state = self.state.write();
            let Some(previous) = state.previous else {
                return;
            };
            let left = state.active;
            state.active = Some(previous);
            state.previous = left;
            state.temporary = false;
            (left, previous)
        };
        debug!("{} restore: {:?} -> {:?}", self.label, left, entered);
        self.notify(left, entered);
    }

    /// Mark the current activation temporary ("hold to preview"). Set when a
    /// long press fires while the control is still held.
    pub fn mark_temporary(&self) {
        self.state.write().temporary = true;
    }

    pub fn is_temporary(&self) -> bool {
        self.state.read().temporary
    }

    /// Release half of the temporary pattern: restore if the activation was
    /// marked temporary, otherwise leave the new id sticky.
    pub fn restore_if_temporary(&self) {
        let marked = {
            let state = self.state.read();
            state.temporary
        };
        if marked {
            self.restore();
        }
    }

    /// False for unregistered ids, never panics
    pub fn is_active(&self, id: I) -> bool {
        self.state.read().active == Some(id)
    }

    /// True when `id` is active, or when `id` is the id a temporary
    /// activation will restore to
    pub fn is_active_or_temporary(&self, id: I) -> bool {
        let state = self.state.read();
        state.active == Some(id) || (state.temporary && state.previous == Some(id))
    }

    pub fn active(&self) -> Option<I> {
        self.state.read().active
    }

    pub fn previous(&self) -> Option<I> {
        self.state.read().previous
    }

    /// Handler of the active id, if any
    pub fn active_handler(&self) -> Option<Arc<H>> {
        let state = self.state.read();
        let id = state.active?;
        state.handlers.get(&id).cloned()
    }

    /// Handler registered for `id`
    pub fn handler(&self, id: I) -> Option<Arc<H>> {
        self.state.read().handlers.get(&id).cloned()
    }

    fn notify(&self, previous: Option<I>, active: I) {
        // Snapshot first: a callback may itself register listeners
        let listeners = self.listeners.read().clone();
        for listener in &listeners {
            listener(previous, active);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct DummyView;

    impl View for DummyView {
        fn name(&self) -> &str {
            "dummy"
        }
        fn draw_grid(&self, _grid: &mut GridBuffer) {}
    }

    fn manager_with(ids: &[ViewId]) -> ViewManager {
        let manager = ViewManager::new("view");
        for &id in ids {
            manager.register(id, Arc::new(DummyView));
        }
        manager
    }

    #[test]
    fn first_registration_becomes_active() {
        let manager = manager_with(&[ViewId::Session, ViewId::Play]);
        assert!(manager.is_active(ViewId::Session));
        assert_eq!(manager.previous(), None);
    }

    #[test]
    fn set_active_records_previous() {
        let manager = manager_with(&[ViewId::Session, ViewId::Play]);

        manager.set_active(ViewId::Play);
        assert_eq!(manager.previous(), Some(ViewId::Session));
        assert!(manager.is_active(ViewId::Play));

        manager.restore();
        assert!(manager.is_active(ViewId::Session));
    }

    #[test]
    fn restore_toggles_between_last_two_only() {
        let manager = manager_with(&[ViewId::Session, ViewId::Play, ViewId::Drum]);
        manager.set_active(ViewId::Play);
        manager.set_active(ViewId::Drum);

        manager.restore();
        assert!(manager.is_active(ViewId::Play));

        // Second restore toggles forward again, not back to Session
        manager.restore();
        assert!(manager.is_active(ViewId::Drum));

        manager.restore();
        assert!(manager.is_active(ViewId::Play));
    }

    #[test]
    fn restore_without_history_is_noop() {
        let manager = manager_with(&[ViewId::Session]);
        manager.restore();
        assert!(manager.is_active(ViewId::Session));
    }

    #[test]
    fn set_active_same_id_is_noop() {
        let manager = manager_with(&[ViewId::Session, ViewId::Play]);
        let fired = Arc::new(AtomicUsize::new(0));
        let fired2 = fired.clone();
        manager.add_listener(move |_, _| {
            fired2.fetch_add(1, Ordering::SeqCst);
        });

        manager.set_active(ViewId::Session);
        assert_eq!(fired.load(Ordering::SeqCst), 0);
        assert_eq!(manager.previous(), None);

        manager.set_active(ViewId::Play);
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn unregistered_id_is_rejected() {
        let manager = manager_with(&[ViewId::Session]);
        manager.set_active(ViewId::Browser);
        assert!(manager.is_active(ViewId::Session));
        assert!(!manager.is_active(ViewId::Browser));
    }

    #[test]
    fn listener_receives_previous_and_active() {
        let manager = manager_with(&[ViewId::Session, ViewId::Play]);
        let seen: Arc<parking_lot::Mutex<Vec<(Option<ViewId>, ViewId)>>> =
            Arc::new(parking_lot::Mutex::new(Vec::new()));
        let seen2 = seen.clone();
        manager.add_listener(move |prev, active| {
            seen2.lock().push((prev, active));
        });

        manager.set_active(ViewId::Play);
        manager.restore();

        let seen = seen.lock();
        assert_eq!(seen[0], (Some(ViewId::Session), ViewId::Play));
        assert_eq!(seen[1], (Some(ViewId::Play), ViewId::Session));
    }

    #[test]
    fn listener_may_register_further_listeners() {
        let manager = Arc::new(manager_with(&[ViewId::Session, ViewId::Play]));
        let nested_fired = Arc::new(AtomicUsize::new(0));

        let inner_manager = manager.clone();
        let fired = nested_fired.clone();
        manager.add_listener(move |_, _| {
            let fired = fired.clone();
            inner_manager.add_listener(move |_, _| {
                fired.fetch_add(1, Ordering::SeqCst);
            });
        });

        // Registers the nested listener without deadlocking
        manager.set_active(ViewId::Play);
        assert_eq!(nested_fired.load(Ordering::SeqCst), 0);

        // The listener added mid-notification fires from here on
        manager.set_active(ViewId::Session);
        assert_eq!(nested_fired.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn temporary_activation_restores_on_release() {
        // DOWN -> LONG -> UP: preview, then back
        let manager = manager_with(&[ViewId::Session, ViewId::Shift]);
        manager.set_active(ViewId::Shift); // DOWN
        manager.mark_temporary(); // LONG
        manager.restore_if_temporary(); // UP
        assert!(manager.is_active(ViewId::Session));
        assert!(!manager.is_temporary());
    }

    #[test]
    fn sticky_activation_stays_on_release() {
        // DOWN -> UP without LONG: the new id sticks
        let manager = manager_with(&[ViewId::Session, ViewId::Shift]);
        manager.set_active(ViewId::Shift); // DOWN
        manager.restore_if_temporary(); // UP, no LONG happened
        assert!(manager.is_active(ViewId::Shift));
    }

    #[test]
    fn is_active_or_temporary_covers_restore_target() {
        let manager = manager_with(&[ViewId::Session, ViewId::Shift]);
        manager.set_active(ViewId::Shift);
        manager.mark_temporary();

        assert!(manager.is_active_or_temporary(ViewId::Shift));
        assert!(manager.is_active_or_temporary(ViewId::Session));
        assert!(!manager.is_active_or_temporary(ViewId::Drum));
    }

    #[test]
    fn mode_send_ids_are_distinct() {
        assert_ne!(ModeId::Send(0), ModeId::Send(1));
        assert_ne!(ModeId::Send(0), ModeId::Volume);
    }

    proptest! {
        /// After any sequence of activations, is_active reflects exactly the
        /// last registered id passed to set_active.
        #[test]
        fn last_set_active_wins(choices in prop::collection::vec(0usize..4, 1..32)) {
            let registered = [ViewId::Session, ViewId::Play, ViewId::Drum];
            let manager = manager_with(&registered);

            let mut expected = ViewId::Session;
            for choice in choices {
                // Index 3 is an unregistered id that must be rejected
                let id = match choice {
                    0 => ViewId::Session,
                    1 => ViewId::Play,
                    2 => ViewId::Drum,
                    _ => ViewId::Browser,
                };
                manager.set_active(id);
                if registered.contains(&id) {
                    expected = id;
                }
            }

            prop_assert!(manager.is_active(expected));
            for id in registered {
                if id != expected {
                    prop_assert!(!manager.is_active(id));
                }
            }
        }
    }
}
