//! Surface layout configuration
//!
//! Maps logical control identifiers to wire addresses and carries the
//! per-device geometry (pad grid, LED rings, text display) plus the timing
//! constants the dispatch and flush paths use. Loaded from YAML; a
//! compiled-in sample layout is available for tests and quick starts.

use once_cell::sync::Lazy;
use serde::Deserialize;
use std::collections::HashSet;
use thiserror::Error;

/// Identifier of a physical control (button, knob, fader)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(transparent)]
pub struct ControlId(pub u16);

impl std::fmt::Display for ControlId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Position of a pad within the grid (0,0 = bottom-left)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PadIndex {
    pub x: u8,
    pub y: u8,
}

/// Physical control category, decides event classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ControlKind {
    /// Momentary button: DOWN/UP/LONG classification applies
    Button,
    /// Relative encoder: signed deltas, no classification
    Knob,
    /// Absolute fader: normalized values, no classification
    Fader,
}

/// Wire address of a control or output element
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "lowercase", tag = "type")]
pub enum WireAddr {
    /// Note message (buttons and their LEDs)
    Note { channel: u8, note: u8 },
    /// Control change (encoders)
    Cc { channel: u8, cc: u8 },
    /// Pitch bend (absolute faders), one per channel
    #[serde(rename = "pb")]
    PitchBend { channel: u8 },
}

/// One named control entry in the layout table
#[derive(Debug, Clone, Deserialize)]
pub struct ControlSpec {
    pub name: String,
    pub id: ControlId,
    pub kind: ControlKind,
    pub wire: WireAddr,
}

/// Pad grid geometry and wire encoding
#[derive(Debug, Clone, Deserialize)]
pub struct GridLayout {
    pub width: u8,
    pub height: u8,
    /// Channel for steady pad colors
    pub channel: u8,
    /// Note number of pad (0,0); pads are numbered row-major upward
    pub base_note: u8,
    /// Channel that carries the slow-blink color layer
    pub blink_channel: u8,
    /// Channel that carries the fast-blink color layer
    pub fast_blink_channel: u8,
}

impl GridLayout {
    /// Note number for a pad position. Layout validation guarantees the
    /// whole grid fits the 0-127 note range, so this cannot wrap.
    pub fn pad_note(&self, pad: PadIndex) -> u8 {
        self.base_note + pad.y * self.width + pad.x
    }

    /// Reverse lookup: pad position for a note, if it falls inside the grid
    pub fn pad_at(&self, note: u8) -> Option<PadIndex> {
        let count = self.width as u16 * self.height as u16;
        let offset = (note as u16).checked_sub(self.base_note as u16)?;
        if offset >= count {
            return None;
        }
        Some(PadIndex {
            x: (offset % self.width as u16) as u8,
            y: (offset / self.width as u16) as u8,
        })
    }

    pub fn pad_count(&self) -> usize {
        self.width as usize * self.height as usize
    }
}

/// LED ring bank above the knob row
#[derive(Debug, Clone, Deserialize)]
pub struct RingLayout {
    pub count: u8,
    pub channel: u8,
    pub base_cc: u8,
}

/// Text display geometry
#[derive(Debug, Clone, Deserialize)]
pub struct DisplayLayout {
    pub rows: u8,
    pub cells: u8,
    pub cell_width: u8,
    /// Manufacturer/device sysex prefix for display writes
    pub sysex_header: Vec<u8>,
    /// Pixel displays sleep without traffic; unchanged rows are re-sent at
    /// this interval
    #[serde(default = "default_keepalive_ms")]
    pub keepalive_ms: u64,
}

impl DisplayLayout {
    pub fn row_width(&self) -> usize {
        self.cells as usize * self.cell_width as usize
    }
}

/// Timing constants for dispatch, flush and follower
#[derive(Debug, Clone, Deserialize)]
pub struct Timing {
    #[serde(default = "default_long_press_ms")]
    pub long_press_ms: u64,
    #[serde(default = "default_flush_interval_ms")]
    pub flush_interval_ms: u64,
    #[serde(default = "default_follower_poll_ms")]
    pub follower_poll_ms: u64,
    #[serde(default = "default_follower_settle_ms")]
    pub follower_settle_ms: u64,
    #[serde(default = "default_follower_give_up_ms")]
    pub follower_give_up_ms: u64,
}

fn default_long_press_ms() -> u64 {
    350
}
fn default_flush_interval_ms() -> u64 {
    100
}
fn default_follower_poll_ms() -> u64 {
    50
}
fn default_follower_settle_ms() -> u64 {
    200
}
fn default_follower_give_up_ms() -> u64 {
    2000
}
fn default_keepalive_ms() -> u64 {
    3000
}

impl Default for Timing {
    fn default() -> Self {
        Self {
            long_press_ms: default_long_press_ms(),
            flush_interval_ms: default_flush_interval_ms(),
            follower_poll_ms: default_follower_poll_ms(),
            follower_settle_ms: default_follower_settle_ms(),
            follower_give_up_ms: default_follower_give_up_ms(),
        }
    }
}

/// Layout validation and parse errors
#[derive(Debug, Error)]
pub enum LayoutError {
    #[error("failed to parse layout YAML: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("duplicate control id {0}")]
    DuplicateControlId(ControlId),
    #[error("duplicate wire address for control '{0}'")]
    DuplicateWire(String),
    #[error("shift control {0} not present in control table")]
    UnknownShiftControl(ControlId),
    #[error("pad grid overruns the note range: base note {base} with {count} pads")]
    GridNoteOverflow { base: u8, count: usize },
    #[error("LED rings overrun the CC range: base cc {base} with {count} rings")]
    RingCcOverflow { base: u8, count: u8 },
}

/// Full surface layout
#[derive(Debug, Clone, Deserialize)]
pub struct SurfaceLayout {
    pub controls: Vec<ControlSpec>,
    pub grid: GridLayout,
    pub rings: RingLayout,
    pub display: DisplayLayout,
    /// Control that activates the shift layer while held
    pub shift_control: ControlId,
    #[serde(default)]
    pub timing: Timing,
}

impl SurfaceLayout {
    /// Parse a layout from YAML and validate it
    pub fn from_yaml(yaml: &str) -> Result<Self, LayoutError> {
        let layout: SurfaceLayout = serde_yaml::from_str(yaml)?;
        layout.validate()?;
        Ok(layout)
    }

    fn validate(&self) -> Result<(), LayoutError> {
        let mut ids = HashSet::new();
        let mut wires = HashSet::new();
        for spec in &self.controls {
            if !ids.insert(spec.id) {
                return Err(LayoutError::DuplicateControlId(spec.id));
            }
            if !wires.insert(spec.wire) {
                return Err(LayoutError::DuplicateWire(spec.name.clone()));
            }
        }
        if !ids.contains(&self.shift_control) {
            return Err(LayoutError::UnknownShiftControl(self.shift_control));
        }
        // Notes and CCs are 7-bit; the whole grid and ring bank must fit
        if self.grid.base_note as usize + self.grid.pad_count() > 128 {
            return Err(LayoutError::GridNoteOverflow {
                base: self.grid.base_note,
                count: self.grid.pad_count(),
            });
        }
        if self.rings.base_cc as u16 + self.rings.count as u16 > 128 {
            return Err(LayoutError::RingCcOverflow {
                base: self.rings.base_cc,
                count: self.rings.count,
            });
        }
        Ok(())
    }

    /// Look up a control by id
    pub fn control(&self, id: ControlId) -> Option<&ControlSpec> {
        self.controls.iter().find(|c| c.id == id)
    }

    /// Reverse lookup: control owning a wire address
    pub fn control_by_wire(&self, wire: &WireAddr) -> Option<&ControlSpec> {
        self.controls.iter().find(|c| c.wire == *wire)
    }

    /// Controls of a given kind, in table order
    pub fn controls_of_kind(&self, kind: ControlKind) -> impl Iterator<Item = &ControlSpec> {
        self.controls.iter().filter(move |c| c.kind == kind)
    }
}

/// Compiled-in sample layout: 8x8 pad grid, 8 knobs with LED rings, one
/// fader, a 2x8-cell display and a handful of function buttons.
pub static DEFAULT_LAYOUT: Lazy<SurfaceLayout> = Lazy::new(|| {
    SurfaceLayout::from_yaml(include_str!("default_layout.yaml"))
        .expect("embedded default layout is valid")
});
