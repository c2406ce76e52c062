//! Hardware transport abstraction
//!
//! The reconciler writes through [`Transport`] and never retries itself: a
//! failed send is logged and the corresponding cache entry stays stale, so
//! the next flush tick re-sends the element. The `midir` backend is the real
//! hardware connection; tests substitute a recording double.

pub mod handshake;
mod midir;

pub use self::midir::MidirTransport;

use thiserror::Error;

/// Transport failures. Callers log and drop these; the reconciler's diff
/// cycle is the retry mechanism.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("MIDI port matching '{0}' not found")]
    PortNotFound(String),
    #[error("failed to open MIDI connection: {0}")]
    Connect(String),
    #[error("failed to send MIDI message: {0}")]
    Send(String),
}

/// Fire-and-forget MIDI output to the surface hardware.
pub trait Transport: Send + Sync {
    fn send_note(&self, channel: u8, note: u8, velocity: u8) -> Result<(), TransportError>;

    fn send_control_change(&self, channel: u8, cc: u8, value: u8) -> Result<(), TransportError>;

    /// Send a sysex message; `payload` excludes the 0xF0/0xF7 framing.
    fn send_sysex(&self, payload: &[u8]) -> Result<(), TransportError>;
}
