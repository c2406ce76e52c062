//! External application boundary
//!
//! The core consumes these traits, it never implements them. All reads are
//! non-blocking snapshot reads; mutations complete asynchronously in the
//! application and surface back through observer callbacks. Observer
//! callbacks must only flag state (mark dirty, stamp timestamps), never
//! perform I/O.

/// Callback fired when the observed selection changes
pub type SelectionObserver = Box<dyn Fn(Option<usize>) + Send + Sync>;

/// Callback fired when any observed value changes
pub type StateObserver = Box<dyn Fn() + Send + Sync>;

/// Access to one indexed selection in the external application (the
/// secondary selection the follower keeps consistent, e.g. a clip slot).
pub trait SelectionApi: Send + Sync {
    /// Currently selected index, None when nothing is selected
    fn selected_index(&self) -> Option<usize>;

    /// Whether an entity exists at `index`
    fn exists(&self, index: usize) -> bool;

    /// Request selection of `index`. Takes effect asynchronously; the
    /// application may ignore requests for nonexistent indices.
    fn select(&self, index: usize);

    /// Register for selection-changed notifications
    fn add_selection_observer(&self, observer: SelectionObserver);
}

/// Snapshot reads of application state, handed to the active view during
/// the reconciler's light pass so observed transport/track flags can feed
/// the desired LED state.
///
/// Every accessor is total: out-of-range indices answer false/None, which
/// renders as the empty/off default.
pub trait HostState: Send + Sync {
    fn is_playing(&self) -> bool {
        false
    }

    fn is_recording(&self) -> bool {
        false
    }

    fn track_count(&self) -> usize {
        0
    }

    fn track_exists(&self, index: usize) -> bool {
        index < self.track_count()
    }

    fn is_track_muted(&self, _index: usize) -> bool {
        false
    }

    fn is_track_selected(&self, _index: usize) -> bool {
        false
    }

    /// Register for value-changed notifications
    fn add_state_observer(&self, _observer: StateObserver) {}
}
