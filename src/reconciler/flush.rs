//! Flush passes: desired state computation, diff and wire writes

use super::caches::{DisplayCache, GridCache, LightCache, RingCache};
use crate::canvas::{GridBuffer, LightState};
use crate::config::{ControlKind, DisplayLayout, WireAddr};
use crate::manager::Mode;
use std::time::Duration;
use tokio::time::Instant;
use tracing::warn;

impl super::Reconciler {
    /// One full reconciliation pass. Total: every element either matches its
    /// cache (skip) or gets a write attempt; a failed write leaves the cache
    /// stale so the next pass retries. Never returns an error.
    pub fn flush(&self) {
        let mut caches = self.caches.lock();
        self.flush_grid(&mut caches.grid);
        self.flush_rings(&mut caches.rings);
        self.flush_lights(&mut caches.lights);
        self.flush_display(&mut caches.display);
        self.resend_stale_rows(&mut caches.display, Instant::now());
    }

    /// Display keep-alive only, for ticks with no pending change. Pixel
    /// displays blank themselves without traffic, so unchanged rows are
    /// re-sent on a timestamp gate rather than a content diff.
    pub fn keep_alive(&self) {
        let mut caches = self.caches.lock();
        self.resend_stale_rows(&mut caches.display, Instant::now());
    }

    fn flush_grid(&self, cache: &mut GridCache) {
        let grid = &self.surface.layout().grid;
        let mut desired = GridBuffer::new(grid.width, grid.height);
        // No registered or active view renders as an all-off grid
        if let Some(view) = self.surface.views().active_handler() {
            view.draw_grid(&mut desired);
        }

        for (index, (pad, light)) in desired.iter().enumerate() {
            let cached = cache.get(index);
            if cached == Some(light) || (cached.is_none() && light.is_off()) {
                continue;
            }
            if self.write_pad(grid.pad_note(pad), cached, light) {
                cache.store(index, light);
            }
        }
    }

    /// Write the changed layers of one pad. The steady color goes on the
    /// grid channel; the blink color rides the slow or fast blink channel,
    /// and a dropped blink layer is cleared with velocity 0.
    fn write_pad(&self, note: u8, cached: Option<LightState>, desired: LightState) -> bool {
        let grid = &self.surface.layout().grid;
        let mut ok = true;

        if cached.map(|c| c.steady) != Some(desired.steady) {
            ok &= self.send_note(grid.channel, note, desired.steady);
        }

        let cached_layer = cached.and_then(|c| c.blink.map(|color| (color, c.fast)));
        let desired_layer = desired.blink.map(|color| (color, desired.fast));
        if cached_layer != desired_layer {
            if let Some((_, was_fast)) = cached_layer {
                // Clear the old layer unless the new one lands on the same channel
                if desired_layer.map(|(_, fast)| fast) != Some(was_fast) {
                    ok &= self.send_note(self.blink_channel(was_fast), note, 0);
                }
            }
            if let Some((color, fast)) = desired_layer {
                ok &= self.send_note(self.blink_channel(fast), note, color);
            }
        }
        ok
    }

    fn blink_channel(&self, fast: bool) -> u8 {
        let grid = &self.surface.layout().grid;
        if fast {
            grid.fast_blink_channel
        } else {
            grid.blink_channel
        }
    }

    fn flush_rings(&self, cache: &mut RingCache) {
        let rings = &self.surface.layout().rings;
        let mode = self.surface.modes().active_handler();
        for index in 0..rings.count as usize {
            // No mode, or an index the mode has no value for, renders as 0
            let desired = mode
                .as_deref()
                .and_then(|m| m.knob_value(index))
                .unwrap_or(0);
            let cached = cache.get(index);
            if cached == Some(desired) || (cached.is_none() && desired == 0) {
                continue;
            }
            if self.send_cc(rings.channel, rings.base_cc + index as u8, desired) {
                cache.store(index, desired);
            }
        }
    }

    fn flush_lights(&self, cache: &mut LightCache) {
        let layout = self.surface.layout().clone();
        let view = self.surface.views().active_handler();
        for spec in layout.controls_of_kind(ControlKind::Button) {
            let desired = view
                .as_ref()
                .and_then(|v| v.button_light(spec.id, self.host.as_ref()))
                .unwrap_or(LightState::OFF);
            // Button LEDs have no blink layers on the wire; the steady color wins
            let desired = LightState::solid(desired.steady);

            let cached = cache.get(spec.id);
            if cached == Some(desired) || (cached.is_none() && desired.is_off()) {
                continue;
            }
            let sent = match spec.wire {
                WireAddr::Note { channel, note } => self.send_note(channel, note, desired.steady),
                WireAddr::Cc { channel, cc } => self.send_cc(channel, cc, desired.steady),
                WireAddr::PitchBend { .. } => continue,
            };
            if sent {
                cache.store(spec.id, desired);
            }
        }
    }

    fn flush_display(&self, cache: &mut DisplayCache) {
        let display = &self.surface.layout().display;
        let mode = self.surface.modes().active_handler();
        let now = Instant::now();
        for (row, cached) in cache.rows.iter_mut().enumerate() {
            let desired = compose_row(mode.as_deref(), display, row);
            let unchanged = cached.text.as_deref() == Some(desired.as_str());
            // A row that was never written and has nothing to say stays silent
            let blank_and_virgin = cached.text.is_none() && desired.trim().is_empty();
            if unchanged || blank_and_virgin {
                continue;
            }
            if self.send_display_row(row, &desired) {
                cached.text = Some(desired);
                cached.last_sent = Some(now);
            }
        }
    }

    fn resend_stale_rows(&self, cache: &mut DisplayCache, now: Instant) {
        let interval = Duration::from_millis(self.surface.layout().display.keepalive_ms);
        for (row, cached) in cache.rows.iter_mut().enumerate() {
            let Some(text) = cached.text.clone() else {
                continue;
            };
            let due = cached
                .last_sent
                .map_or(true, |sent| now.duration_since(sent) >= interval);
            if due && self.send_display_row(row, &text) {
                cached.last_sent = Some(now);
            }
        }
    }

    fn send_display_row(&self, row: usize, text: &str) -> bool {
        let display = &self.surface.layout().display;
        let mut payload = display.sysex_header.clone();
        payload.push(row as u8);
        payload.extend(text.chars().map(|c| {
            if c.is_ascii() && !c.is_ascii_control() {
                c as u8
            } else {
                b'?'
            }
        }));
        match self.transport.send_sysex(&payload) {
            Ok(()) => true,
            Err(e) => {
                warn!("display row {} write failed: {}", row, e);
                false
            }
        }
    }

    fn send_note(&self, channel: u8, note: u8, velocity: u8) -> bool {
        match self.transport.send_note(channel, note, velocity) {
            Ok(()) => true,
            Err(e) => {
                warn!("note write failed ch={} n={}: {}", channel, note, e);
                false
            }
        }
    }

    fn send_cc(&self, channel: u8, cc: u8, value: u8) -> bool {
        match self.transport.send_control_change(channel, cc, value) {
            Ok(()) => true,
            Err(e) => {
                warn!("cc write failed ch={} cc={}: {}", channel, cc, e);
                false
            }
        }
    }
}

/// Assemble one display row from the mode's cells, each clipped or padded to
/// the cell width. A missing cell renders blank.
fn compose_row(mode: Option<&dyn Mode>, display: &DisplayLayout, row: usize) -> String {
    let width = display.cell_width as usize;
    let mut line = String::with_capacity(display.row_width());
    for cell in 0..display.cells as usize {
        let text = mode
            .and_then(|m| m.display_cell(row, cell))
            .unwrap_or_default();
        let mut written = 0;
        for c in text.chars().take(width) {
            line.push(c);
            written += 1;
        }
        for _ in written..width {
            line.push(' ');
        }
    }
    line
}
