//! Hardware event classification and command dispatch

use super::Layer;
use crate::command::{ButtonEvent, ControlValue};
use crate::config::{ControlId, ControlKind, WireAddr};
use crate::midi::{convert, format_hex, MidiMessage};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, trace};

impl super::Surface {
    /// Process a button state change from the hardware.
    ///
    /// DOWN arms a long-press timer; if the control stays held past the
    /// threshold with no intervening UP, a single LONG event fires. The
    /// shift layer is resolved per event at dispatch time, not captured at
    /// press time.
    pub async fn on_button(self: &Arc<Self>, control: ControlId, is_down: bool) {
        if is_down {
            let epoch = self.press_counter.fetch_add(1, Ordering::AcqRel) + 1;
            self.pressed.lock().insert(control, epoch);

            if control == self.layout.shift_control {
                self.shift_pressed.store(true, Ordering::Release);
            }

            self.arm_long_press(control, epoch);
            self.dispatch_trigger(control, ButtonEvent::Down).await;
        } else {
            self.pressed.lock().remove(&control);

            if control == self.layout.shift_control {
                self.shift_pressed.store(false, Ordering::Release);
            }

            if let Some(timer) = self.long_tasks.lock().remove(&control) {
                timer.abort();
            }

            self.dispatch_trigger(control, ButtonEvent::Up).await;
        }
    }

    /// Process a value change from a knob or fader. No DOWN/UP/LONG
    /// classification applies.
    pub async fn on_continuous(&self, control: ControlId, value: ControlValue) {
        let shifted = self.is_shift_pressed();
        let (shift_binding, normal_binding) = {
            let bindings = self.continuous.read();
            (
                bindings.get(&(control, Layer::Shift)).cloned(),
                bindings.get(&(control, Layer::Normal)).cloned(),
            )
        };

        if shifted {
            if let Some(command) = shift_binding {
                command.value_change(value).await;
                return;
            }
            if let Some(command) = normal_binding {
                command.value_change_shifted(value).await;
                return;
            }
        } else if let Some(command) = normal_binding {
            command.value_change(value).await;
            return;
        }

        trace!("continuous control {} unbound, dropping {:?}", control, value);
    }

    /// Route raw MIDI from the hardware to the matching control or, for
    /// grid notes, to the active view's note handler.
    pub async fn on_midi(self: &Arc<Self>, raw: &[u8]) {
        let Some(message) = MidiMessage::parse(raw) else {
            trace!("unparseable MIDI from surface: {}", format_hex(raw));
            return;
        };

        match message {
            MidiMessage::NoteOn {
                channel,
                note,
                velocity,
            } => self.route_note(channel, note, velocity).await,
            MidiMessage::NoteOff { channel, note, .. } => {
                self.route_note(channel, note, 0).await
            }
            MidiMessage::ControlChange { channel, cc, value } => {
                let spec = self
                    .layout
                    .control_by_wire(&WireAddr::Cc { channel, cc })
                    .cloned();
                match spec {
                    Some(spec) => match spec.kind {
                        ControlKind::Knob => {
                            let delta = convert::relative_delta(value);
                            if delta != 0 {
                                self.on_continuous(spec.id, ControlValue::Relative(delta))
                                    .await;
                            }
                        }
                        ControlKind::Fader => {
                            self.on_continuous(
                                spec.id,
                                ControlValue::Absolute(convert::normalize_7bit(value)),
                            )
                            .await;
                        }
                        ControlKind::Button => {
                            self.on_button(spec.id, value > 0).await;
                        }
                    },
                    None => trace!("unmapped CC ch={} cc={}", channel, cc),
                }
            }
            MidiMessage::PitchBend { channel, value } => {
                let spec = self
                    .layout
                    .control_by_wire(&WireAddr::PitchBend { channel })
                    .cloned();
                match spec {
                    Some(spec) => {
                        self.on_continuous(
                            spec.id,
                            ControlValue::Absolute(convert::normalize_14bit(value)),
                        )
                        .await;
                    }
                    None => trace!("unmapped pitch bend ch={}", channel),
                }
            }
            // Pressure and sysex (handshake) are the transport layer's business
            MidiMessage::PolyPressure { .. } | MidiMessage::SysEx { .. } => {}
        }
    }

    async fn route_note(self: &Arc<Self>, channel: u8, note: u8, velocity: u8) {
        // Grid notes go to the active view's note-mapping, everything else
        // resolves through the control table.
        if channel == self.layout.grid.channel {
            if let Some(pad) = self.layout.grid.pad_at(note) {
                if let Some(view) = self.views.active_handler() {
                    view.on_grid_note(pad, velocity);
                }
                return;
            }
        }

        let spec = self
            .layout
            .control_by_wire(&WireAddr::Note { channel, note })
            .cloned();
        match spec {
            Some(spec) => self.on_button(spec.id, velocity > 0).await,
            None => trace!("unmapped note ch={} n={}", channel, note),
        }
    }

    fn arm_long_press(self: &Arc<Self>, control: ControlId, epoch: u64) {
        let threshold = Duration::from_millis(self.layout.timing.long_press_ms);
        let surface = self.clone();
        let timer = tokio::spawn(async move {
            tokio::time::sleep(threshold).await;
            // Still the same press? A release (or re-press) invalidates the
            // epoch and the timer must stay silent.
            let still_held = surface.pressed.lock().get(&control) == Some(&epoch);
            if still_held {
                debug!("long press on control {}", control);
                surface.dispatch_trigger(control, ButtonEvent::Long).await;
            }
        });

        if let Some(previous) = self.long_tasks.lock().insert(control, timer) {
            previous.abort();
        }
    }

    pub(crate) async fn dispatch_trigger(&self, control: ControlId, event: ButtonEvent) {
        let shifted = self.is_shift_pressed();
        let (shift_binding, normal_binding) = {
            let bindings = self.triggers.read();
            (
                bindings.get(&(control, Layer::Shift)).cloned(),
                bindings.get(&(control, Layer::Normal)).cloned(),
            )
        };

        if shifted {
            if let Some(command) = shift_binding {
                command.execute(event).await;
                return;
            }
            if let Some(command) = normal_binding {
                command.execute_shifted(event).await;
                return;
            }
        } else if let Some(command) = normal_binding {
            command.execute(event).await;
            return;
        }

        // Unbound controls are dropped silently, never an error
        trace!("control {} unbound, dropping {:?}", control, event);
    }
}
