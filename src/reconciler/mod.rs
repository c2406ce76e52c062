//! Output reconciliation
//!
//! The hardware is synchronized by a fixed-rate tick, not by change events:
//! listeners and host observers only mark a dirty flag, and the next tick
//! recomputes the full desired output state and diffs it against the
//! last-sent caches. Ticking at a fixed rate bounds wire traffic no matter
//! how fast the application state churns. On quiet ticks only the display
//! keep-alive runs, so an idle surface costs one timestamp check per row.

mod caches;
mod flush;


use crate::host::HostState;
use crate::surface::Surface;
use crate::transport::Transport;
use caches::Caches;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tracing::trace;

pub struct Reconciler {
    surface: Arc<Surface>,
    host: Arc<dyn HostState>,
    transport: Arc<dyn Transport>,
    /// Shared with the listener closures registered on the managers and the
    /// host, which must not hold the reconciler alive
    dirty: Arc<AtomicBool>,
    caches: Mutex<Caches>,
}

impl Reconciler {
    /// Build a reconciler and subscribe it to view/mode changes and host
    /// state notifications. Starts dirty so the first tick paints everything.
    pub fn new(
        surface: Arc<Surface>,
        host: Arc<dyn HostState>,
        transport: Arc<dyn Transport>,
    ) -> Self {
        let dirty = Arc::new(AtomicBool::new(true));

        let flag = dirty.clone();
        surface.views().add_listener(move |_, _| {
            flag.store(true, Ordering::Release);
        });
        let flag = dirty.clone();
        surface.modes().add_listener(move |_, _| {
            flag.store(true, Ordering::Release);
        });
        let flag = dirty.clone();
        host.add_state_observer(Box::new(move || {
            flag.store(true, Ordering::Release);
        }));

        Self {
            caches: Mutex::new(Caches::new(surface.layout())),
            surface,
            host,
            transport,
            dirty,
        }
    }

    /// Force a full recompute on the next tick. The caches are untouched, so
    /// unchanged elements still diff to zero writes.
    pub fn mark_dirty(&self) {
        self.dirty.store(true, Ordering::Release);
    }

    /// One tick: full flush when something changed since the last tick,
    /// otherwise only the display keep-alive.
    pub fn tick(&self) {
        if self.dirty.swap(false, Ordering::AcqRel) {
            trace!("flush tick");
            self.flush();
        } else {
            self.keep_alive();
        }
    }

    /// Fixed-rate tick loop; runs until the task is dropped.
    pub async fn run(self: Arc<Self>) {
        let period = Duration::from_millis(self.surface.layout().timing.flush_interval_ms);
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            ticker.tick().await;
            self.tick();
        }
    }
}
