//! MIDI utilities and message types
//!
//! Parsing, encoding and value conversions for the message families the
//! surface wire protocol actually speaks: notes (buttons, pads), control
//! changes (encoders, LED rings), pitch bend (faders) and sysex (displays,
//! handshake).

use std::fmt;

/// MIDI message types used on the surface wire
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MidiMessage {
    /// Note Off: channel (0-15), note (0-127), velocity (0-127)
    NoteOff { channel: u8, note: u8, velocity: u8 },

    /// Note On: channel (0-15), note (0-127), velocity (0-127)
    NoteOn { channel: u8, note: u8, velocity: u8 },

    /// Polyphonic Key Pressure: channel (0-15), note (0-127), pressure (0-127)
    PolyPressure { channel: u8, note: u8, pressure: u8 },

    /// Control Change: channel (0-15), cc (0-127), value (0-127)
    ControlChange { channel: u8, cc: u8, value: u8 },

    /// Pitch Bend: channel (0-15), value (0-16383, 14-bit)
    PitchBend { channel: u8, value: u16 },

    /// System Exclusive payload (without the 0xF0/0xF7 framing)
    SysEx { data: Vec<u8> },
}

impl MidiMessage {
    /// Parse a MIDI message from raw bytes.
    ///
    /// Returns `None` for truncated messages and for message families the
    /// surface does not use (clock, song position, running status).
    pub fn parse(data: &[u8]) -> Option<Self> {
        let status = *data.first()?;

        // Running status (data byte first) is never produced by the devices
        // this core talks to.
        if status < 0x80 {
            return None;
        }

        if status == 0xF0 {
            // SysEx - payload runs until the 0xF7 terminator
            let end = data.iter().position(|&b| b == 0xF7)?;
            return Some(MidiMessage::SysEx {
                data: data[1..end].to_vec(),
            });
        }
        if status >= 0xF0 {
            return None;
        }

        let channel = status & 0x0F;
        match status & 0xF0 {
            0x80 => {
                if data.len() < 3 {
                    return None;
                }
                Some(MidiMessage::NoteOff {
                    channel,
                    note: data[1] & 0x7F,
                    velocity: data[2] & 0x7F,
                })
            }
            0x90 => {
                if data.len() < 3 {
                    return None;
                }
                let note = data[1] & 0x7F;
                let velocity = data[2] & 0x7F;
                // Note On with velocity 0 is a release on the wire
                if velocity == 0 {
                    Some(MidiMessage::NoteOff {
                        channel,
                        note,
                        velocity: 0,
                    })
                } else {
                    Some(MidiMessage::NoteOn {
                        channel,
                        note,
                        velocity,
                    })
                }
            }
            0xA0 => {
                if data.len() < 3 {
                    return None;
                }
                Some(MidiMessage::PolyPressure {
                    channel,
                    note: data[1] & 0x7F,
                    pressure: data[2] & 0x7F,
                })
            }
            0xB0 => {
                if data.len() < 3 {
                    return None;
                }
                Some(MidiMessage::ControlChange {
                    channel,
                    cc: data[1] & 0x7F,
                    value: data[2] & 0x7F,
                })
            }
            0xE0 => {
                if data.len() < 3 {
                    return None;
                }
                let lsb = (data[1] & 0x7F) as u16;
                let msb = (data[2] & 0x7F) as u16;
                Some(MidiMessage::PitchBend {
                    channel,
                    value: (msb << 7) | lsb,
                })
            }
            _ => None,
        }
    }

    /// Encode the message to MIDI bytes
    pub fn encode(&self) -> Vec<u8> {
        match *self {
            MidiMessage::NoteOff {
                channel,
                note,
                velocity,
            } => vec![0x80 | (channel & 0x0F), note & 0x7F, velocity & 0x7F],
            MidiMessage::NoteOn {
                channel,
                note,
                velocity,
            } => vec![0x90 | (channel & 0x0F), note & 0x7F, velocity & 0x7F],
            MidiMessage::PolyPressure {
                channel,
                note,
                pressure,
            } => vec![0xA0 | (channel & 0x0F), note & 0x7F, pressure & 0x7F],
            MidiMessage::ControlChange { channel, cc, value } => {
                vec![0xB0 | (channel & 0x0F), cc & 0x7F, value & 0x7F]
            }
            MidiMessage::PitchBend { channel, value } => {
                let lsb = (value & 0x7F) as u8;
                let msb = ((value >> 7) & 0x7F) as u8;
                vec![0xE0 | (channel & 0x0F), lsb, msb]
            }
            MidiMessage::SysEx { ref data } => {
                let mut bytes = Vec::with_capacity(data.len() + 2);
                bytes.push(0xF0);
                bytes.extend_from_slice(data);
                bytes.push(0xF7);
                bytes
            }
        }
    }
}

impl fmt::Display for MidiMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            MidiMessage::NoteOff {
                channel,
                note,
                velocity,
            } => write!(f, "NoteOff ch:{} n:{} v:{}", channel + 1, note, velocity),
            MidiMessage::NoteOn {
                channel,
                note,
                velocity,
            } => write!(f, "NoteOn ch:{} n:{} v:{}", channel + 1, note, velocity),
            MidiMessage::PolyPressure {
                channel,
                note,
                pressure,
            } => write!(f, "PolyPressure ch:{} n:{} p:{}", channel + 1, note, pressure),
            MidiMessage::ControlChange { channel, cc, value } => {
                write!(f, "CC ch:{} cc:{} v:{}", channel + 1, cc, value)
            }
            MidiMessage::PitchBend { channel, value } => {
                write!(f, "PitchBend ch:{} v:{}", channel + 1, value)
            }
            MidiMessage::SysEx { ref data } => write!(f, "SysEx {} bytes", data.len()),
        }
    }
}

/// MIDI value conversion utilities
pub mod convert {
    /// Convert 14-bit value (0-16383) to 7-bit value (0-127)
    pub fn to_7bit(value_14bit: u16) -> u8 {
        ((value_14bit >> 7) & 0x7F) as u8
    }

    /// Convert 7-bit value (0-127) to 14-bit value (0-16383)
    pub fn to_14bit(value_7bit: u8) -> u16 {
        ((value_7bit as u16) << 7) | (value_7bit as u16)
    }

    /// Normalize a 7-bit value to 0.0-1.0
    pub fn normalize_7bit(value: u8) -> f32 {
        value.min(127) as f32 / 127.0
    }

    /// Normalize a 14-bit value to 0.0-1.0
    pub fn normalize_14bit(value: u16) -> f32 {
        value.min(16383) as f32 / 16383.0
    }

    /// Decode a relative-encoder CC value as a signed delta.
    ///
    /// Two's-complement style: 1-63 increment, 65-127 decrement (value - 128).
    /// 0 and 64 decode as no movement.
    pub fn relative_delta(value: u8) -> i32 {
        let value = value & 0x7F;
        if value == 0 || value == 64 {
            0
        } else if value < 64 {
            value as i32
        } else {
            value as i32 - 128
        }
    }
}

/// Format MIDI bytes as hex string for debugging
pub fn format_hex(data: &[u8]) -> String {
    data.iter()
        .map(|b| format!("{:02X}", b))
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn note_on_parses() {
        let msg = MidiMessage::parse(&[0x90, 36, 100]).unwrap();
        assert_eq!(
            msg,
            MidiMessage::NoteOn {
                channel: 0,
                note: 36,
                velocity: 100,
            }
        );
    }

    #[test]
    fn note_on_velocity_zero_is_release() {
        let msg = MidiMessage::parse(&[0x90, 36, 0]).unwrap();
        assert_eq!(
            msg,
            MidiMessage::NoteOff {
                channel: 0,
                note: 36,
                velocity: 0,
            }
        );
    }

    #[test]
    fn pitch_bend_is_14bit() {
        let msg = MidiMessage::parse(&[0xE2, 0x00, 0x40]).unwrap();
        assert_eq!(
            msg,
            MidiMessage::PitchBend {
                channel: 2,
                value: 8192,
            }
        );
    }

    #[test]
    fn sysex_payload_excludes_framing() {
        let msg = MidiMessage::parse(&[0xF0, 0x7E, 0x06, 0x02, 0xF7]).unwrap();
        assert_eq!(
            msg,
            MidiMessage::SysEx {
                data: vec![0x7E, 0x06, 0x02],
            }
        );
        assert_eq!(msg.encode(), vec![0xF0, 0x7E, 0x06, 0x02, 0xF7]);
    }

    #[test]
    fn truncated_messages_are_rejected() {
        assert_eq!(MidiMessage::parse(&[]), None);
        assert_eq!(MidiMessage::parse(&[0x90, 36]), None);
        assert_eq!(MidiMessage::parse(&[0xF0, 0x01, 0x02]), None); // no terminator
    }

    #[test]
    fn relative_delta_decoding() {
        assert_eq!(convert::relative_delta(0), 0);
        assert_eq!(convert::relative_delta(1), 1);
        assert_eq!(convert::relative_delta(3), 3);
        assert_eq!(convert::relative_delta(64), 0);
        assert_eq!(convert::relative_delta(127), -1);
        assert_eq!(convert::relative_delta(125), -3);
    }

    #[test]
    fn bit_width_conversions() {
        assert_eq!(convert::to_7bit(16383), 127);
        assert_eq!(convert::to_14bit(127), 16383);
        assert_eq!(convert::to_14bit(0), 0);
        assert!((convert::normalize_14bit(8192) - 0.5).abs() < 0.001);
    }
}
