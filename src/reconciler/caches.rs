//! Last-sent hardware state
//!
//! Every cache stores what was actually written to the wire, never the
//! desired state: an entry is only updated after a successful transport
//! write, so a failed send keeps the element stale and the next flush tick
//! re-sends it. `None` means the element has never been written.

use crate::canvas::LightState;
use crate::config::{ControlId, SurfaceLayout};
use std::collections::HashMap;
use tokio::time::Instant;

/// Per-pad last-sent colors, row-major like the scratch buffer
pub(super) struct GridCache {
    cells: Vec<Option<LightState>>,
}

impl GridCache {
    fn new(count: usize) -> Self {
        Self {
            cells: vec![None; count],
        }
    }

    pub fn get(&self, index: usize) -> Option<LightState> {
        self.cells.get(index).copied().flatten()
    }

    pub fn store(&mut self, index: usize, light: LightState) {
        if let Some(cell) = self.cells.get_mut(index) {
            *cell = Some(light);
        }
    }
}

/// Per-button last-sent LED state; absent = never written
pub(super) struct LightCache {
    sent: HashMap<ControlId, LightState>,
}

impl LightCache {
    pub fn get(&self, control: ControlId) -> Option<LightState> {
        self.sent.get(&control).copied()
    }

    pub fn store(&mut self, control: ControlId, light: LightState) {
        self.sent.insert(control, light);
    }
}

/// Per-knob last-sent LED ring value
pub(super) struct RingCache {
    values: Vec<Option<u8>>,
}

impl RingCache {
    pub fn get(&self, index: usize) -> Option<u8> {
        self.values.get(index).copied().flatten()
    }

    pub fn store(&mut self, index: usize, value: u8) {
        if let Some(slot) = self.values.get_mut(index) {
            *slot = Some(value);
        }
    }
}

pub(super) struct DisplayRow {
    /// Last text actually written, None before the first successful write
    pub text: Option<String>,
    /// When the row last went out, for the keep-alive resend
    pub last_sent: Option<Instant>,
}

/// Per-row last-sent display text plus keep-alive timestamps
pub(super) struct DisplayCache {
    pub rows: Vec<DisplayRow>,
}

pub(super) struct Caches {
    pub grid: GridCache,
    pub lights: LightCache,
    pub rings: RingCache,
    pub display: DisplayCache,
}

impl Caches {
    pub fn new(layout: &SurfaceLayout) -> Self {
        Self {
            grid: GridCache::new(layout.grid.pad_count()),
            lights: LightCache {
                sent: HashMap::new(),
            },
            rings: RingCache {
                values: vec![None; layout.rings.count as usize],
            },
            display: DisplayCache {
                rows: (0..layout.display.rows)
                    .map(|_| DisplayRow {
                        text: None,
                        last_sent: None,
                    })
                    .collect(),
            },
        }
    }
}
