//! Device handshake sysex
//!
//! Identity probing and remote-mode switching are opportunistic: the request
//! goes out at connect time, and if the device never answers (or answers
//! something unexpected) it simply stays in whatever mode it was in. Nothing
//! downstream depends on the handshake having succeeded.

use tracing::debug;

/// Universal device-identity request payload (sysex, unframed)
pub const IDENTITY_REQUEST: [u8; 4] = [0x7E, 0x7F, 0x06, 0x01];

/// Parsed universal identity reply
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceIdentity {
    pub manufacturer: u8,
    pub family: u16,
    pub model: u16,
    pub firmware: [u8; 4],
}

/// Handshake-relevant incoming sysex
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandshakeEvent {
    Identity(DeviceIdentity),
    /// Device acknowledged entering (true) or leaving (false) remote mode
    RemoteMode(bool),
}

/// Classify an incoming sysex payload (unframed). Returns None for anything
/// that is not part of the handshake, which callers ignore.
pub fn classify(payload: &[u8], device_header: &[u8]) -> Option<HandshakeEvent> {
    if let Some(identity) = parse_identity_reply(payload) {
        debug!(
            "identity reply: manufacturer={:#04X} family={} model={}",
            identity.manufacturer, identity.family, identity.model
        );
        return Some(HandshakeEvent::Identity(identity));
    }
    if let Some(rest) = payload.strip_prefix(device_header) {
        if let [0x0E, state] = rest {
            return Some(HandshakeEvent::RemoteMode(*state == 0x01));
        }
    }
    None
}

/// Parse a universal identity reply: 7E <dev> 06 02 <mfr> <family lo/hi>
/// <model lo/hi> <fw x4>.
pub fn parse_identity_reply(payload: &[u8]) -> Option<DeviceIdentity> {
    if payload.len() < 13 {
        return None;
    }
    if payload[0] != 0x7E || payload[2] != 0x06 || payload[3] != 0x02 {
        return None;
    }
    Some(DeviceIdentity {
        manufacturer: payload[4],
        family: payload[5] as u16 | ((payload[6] as u16) << 7),
        model: payload[7] as u16 | ((payload[8] as u16) << 7),
        firmware: [payload[9], payload[10], payload[11], payload[12]],
    })
}

/// Build the remote-mode switch payload: device header, opcode 0x0E, then
/// 0x01 to take over the surface or 0x00 to hand it back.
pub fn remote_mode_payload(device_header: &[u8], enter: bool) -> Vec<u8> {
    let mut payload = Vec::with_capacity(device_header.len() + 2);
    payload.extend_from_slice(device_header);
    payload.push(0x0E);
    payload.push(if enter { 0x01 } else { 0x00 });
    payload
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: [u8; 5] = [0x00, 0x20, 0x29, 0x02, 0x18];

    #[test]
    fn identity_reply_round_trip() {
        // 7E 00 06 02, manufacturer 0x29, family 0x113, model 0x69, fw 1.0.0.5
        let payload = [
            0x7E, 0x00, 0x06, 0x02, 0x29, 0x13, 0x02, 0x69, 0x00, 0x01, 0x00, 0x00, 0x05,
        ];
        let identity = parse_identity_reply(&payload).unwrap();
        assert_eq!(identity.manufacturer, 0x29);
        assert_eq!(identity.family, 0x113);
        assert_eq!(identity.model, 0x69);
        assert_eq!(identity.firmware, [0x01, 0x00, 0x00, 0x05]);
        assert_eq!(
            classify(&payload, &HEADER),
            Some(HandshakeEvent::Identity(identity))
        );
    }

    #[test]
    fn truncated_or_foreign_sysex_is_ignored() {
        assert_eq!(parse_identity_reply(&[0x7E, 0x00, 0x06]), None);
        assert_eq!(classify(&[0x7D, 0x01, 0x02], &HEADER), None);
        // Right header, unknown opcode
        let mut unknown = HEADER.to_vec();
        unknown.extend_from_slice(&[0x55, 0x01]);
        assert_eq!(classify(&unknown, &HEADER), None);
    }

    #[test]
    fn remote_mode_build_and_classify() {
        let enter = remote_mode_payload(&HEADER, true);
        assert_eq!(&enter[..HEADER.len()], &HEADER);
        assert_eq!(&enter[HEADER.len()..], &[0x0E, 0x01]);
        assert_eq!(
            classify(&enter, &HEADER),
            Some(HandshakeEvent::RemoteMode(true))
        );

        let exit = remote_mode_payload(&HEADER, false);
        assert_eq!(
            classify(&exit, &HEADER),
            Some(HandshakeEvent::RemoteMode(false))
        );
    }
}
