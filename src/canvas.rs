//! Desired visual state building blocks
//!
//! Views render into a [`GridBuffer`] each flush tick; the reconciler diffs
//! the buffer against what the hardware last received. Colors are palette
//! indices - the per-device palette tables live outside this core.

use crate::config::PadIndex;

/// Desired state of one lit element (pad or button LED).
///
/// Blink timing is the hardware's job: the two colors and the speed flag are
/// encoded into the wire messages, the reconciler never animates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LightState {
    /// Steady palette color index; 0 = off
    pub steady: u8,
    /// Secondary color the element alternates to, if blinking
    pub blink: Option<u8>,
    /// Fast blink instead of slow; meaningless when `blink` is None
    pub fast: bool,
}

impl LightState {
    pub const OFF: LightState = LightState {
        steady: 0,
        blink: None,
        fast: false,
    };

    /// Steady color, no blinking
    pub fn solid(color: u8) -> Self {
        Self {
            steady: color,
            blink: None,
            fast: false,
        }
    }

    /// Alternate between `steady` and `blink`
    pub fn blinking(steady: u8, blink: u8, fast: bool) -> Self {
        Self {
            steady,
            blink: Some(blink),
            fast,
        }
    }

    pub fn is_off(&self) -> bool {
        self.steady == 0 && self.blink.is_none()
    }
}

/// Scratch buffer a view draws its desired pad-color matrix into
#[derive(Debug, Clone)]
pub struct GridBuffer {
    width: u8,
    height: u8,
    cells: Vec<LightState>,
}

impl GridBuffer {
    pub fn new(width: u8, height: u8) -> Self {
        Self {
            width,
            height,
            cells: vec![LightState::OFF; width as usize * height as usize],
        }
    }

    pub fn width(&self) -> u8 {
        self.width
    }

    pub fn height(&self) -> u8 {
        self.height
    }

    fn offset(&self, pad: PadIndex) -> Option<usize> {
        if pad.x >= self.width || pad.y >= self.height {
            return None;
        }
        Some(pad.y as usize * self.width as usize + pad.x as usize)
    }

    /// Set a pad's desired state; out-of-range positions are ignored
    pub fn set(&mut self, pad: PadIndex, light: LightState) {
        if let Some(i) = self.offset(pad) {
            self.cells[i] = light;
        }
    }

    /// Desired state of a pad; OFF for out-of-range positions
    pub fn get(&self, pad: PadIndex) -> LightState {
        self.offset(pad)
            .map(|i| self.cells[i])
            .unwrap_or(LightState::OFF)
    }

    /// Reset every cell to OFF
    pub fn clear(&mut self) {
        self.cells.fill(LightState::OFF);
    }

    /// Iterate over all cells with their positions, row-major from (0,0)
    pub fn iter(&self) -> impl Iterator<Item = (PadIndex, LightState)> + '_ {
        self.cells.iter().enumerate().map(move |(i, &light)| {
            (
                PadIndex {
                    x: (i % self.width as usize) as u8,
                    y: (i / self.width as usize) as u8,
                },
                light,
            )
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn out_of_range_set_is_ignored() {
        let mut buf = GridBuffer::new(4, 4);
        buf.set(PadIndex { x: 9, y: 0 }, LightState::solid(5));
        assert!(buf.iter().all(|(_, l)| l.is_off()));
    }

    #[test]
    fn set_and_get() {
        let mut buf = GridBuffer::new(4, 4);
        let pad = PadIndex { x: 1, y: 3 };
        buf.set(pad, LightState::blinking(2, 7, true));
        assert_eq!(buf.get(pad), LightState::blinking(2, 7, true));
        buf.clear();
        assert_eq!(buf.get(pad), LightState::OFF);
    }
}
