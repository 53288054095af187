//! Fixed-layout packet codec for the HMI link.
//!
//! Every packet on the wire is exactly [`PACKET_LEN`] bytes, little-endian:
//!
//! | offset | size | field            |
//! |--------|------|------------------|
//! | 0      | 4    | magic `POLA`     |
//! | 4      | 2    | message id (109) |
//! | 6      | 2    | payload length   |
//! | 8      | 1    | activate status  |
//! | 9      | 1    | door status      |
//! | 10     | 1    | boarding status  |
//! | 11     | 1    | crowdedness      |
//! | 12     | 4    | reserved (zero)  |

use thiserror::Error;

use crate::Decision;

/// Literal start marker of every packet.
pub const MAGIC: [u8; 4] = *b"POLA";

/// "EV recognition info", the only message type this link carries.
pub const MSG_EV_RECOGNITION_INFO: u16 = 109;

/// Size of the status payload in bytes (padding excluded).
pub const PAYLOAD_LEN: u16 = 4;

/// Total size of a packet on the wire.
pub const PACKET_LEN: usize = 16;

/// Activate status carried by every command this system sends.
pub const ACTIVATE_STATUS: u8 = 5;

const HEADER_LEN: usize = 8;

/// Decoding failures. Each one rejects a single datagram only.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseError {
    #[error("packet too short: {0} bytes, need 16")]
    ShortBuffer(usize),
    #[error("bad magic {0:02x?}, expected \"POLA\"")]
    BadMagic([u8; 4]),
    #[error("unknown message id {0}")]
    UnknownId(u16),
}

/// The four status bytes carried in every packet.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct StatusPayload {
    pub activate: u8,
    pub door: u8,
    pub boarding: u8,
    pub crowdedness: u8,
}

impl StatusPayload {
    /// The only payload accepted as a cycle trigger.
    pub const TRIGGER: StatusPayload = StatusPayload {
        activate: ACTIVATE_STATUS,
        door: 0,
        boarding: 0,
        crowdedness: 0,
    };

    pub fn new(activate: u8, door: u8, boarding: u8, crowdedness: u8) -> Self {
        Self {
            activate,
            door,
            boarding,
            crowdedness,
        }
    }

    /// Payload of the command reporting a crowdedness verdict.
    pub fn command(decision: Decision) -> Self {
        Self {
            activate: ACTIVATE_STATUS,
            door: 1,
            boarding: 1,
            crowdedness: decision.wire_value(),
        }
    }
}

/// A decoded or about-to-be-encoded packet. Built fresh for every send and
/// every receive; fields are read-only.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ControlPacket {
    message_id: u16,
    declared_len: u16,
    payload: StatusPayload,
}

impl ControlPacket {
    /// Packet with the canonical header for `payload`.
    pub fn new(payload: StatusPayload) -> Self {
        Self {
            message_id: MSG_EV_RECOGNITION_INFO,
            declared_len: PAYLOAD_LEN,
            payload,
        }
    }

    /// Outbound crowdedness command.
    pub fn command(decision: Decision) -> Self {
        Self::new(StatusPayload::command(decision))
    }

    /// Trigger packet as sent by the HMI.
    pub fn trigger() -> Self {
        Self::new(StatusPayload::TRIGGER)
    }

    pub fn message_id(&self) -> u16 {
        self.message_id
    }

    /// Payload length as declared in the header.
    pub fn declared_len(&self) -> u16 {
        self.declared_len
    }

    pub fn payload(&self) -> StatusPayload {
        self.payload
    }

    /// True only for the exact trigger tuple (5, 0, 0, 0).
    pub fn is_trigger(&self) -> bool {
        self.payload == StatusPayload::TRIGGER
    }

    /// Crowdedness verdict carried by this packet, if it is a valid one.
    pub fn decision(&self) -> Option<Decision> {
        Decision::from_wire(self.payload.crowdedness)
    }

    pub fn encode(&self) -> [u8; PACKET_LEN] {
        let mut buf = [0u8; PACKET_LEN];
        buf[0..4].copy_from_slice(&MAGIC);
        buf[4..6].copy_from_slice(&self.message_id.to_le_bytes());
        buf[6..8].copy_from_slice(&self.declared_len.to_le_bytes());
        buf[8] = self.payload.activate;
        buf[9] = self.payload.door;
        buf[10] = self.payload.boarding;
        buf[11] = self.payload.crowdedness;
        // 12..16 reserved, left zero
        buf
    }
}

/// Encode a status payload into a complete wire packet.
pub fn encode(payload: StatusPayload) -> [u8; PACKET_LEN] {
    ControlPacket::new(payload).encode()
}

/// Parse one datagram. Bytes beyond the first 16 are ignored.
pub fn decode(buf: &[u8]) -> Result<ControlPacket, ParseError> {
    if buf.len() < PACKET_LEN {
        return Err(ParseError::ShortBuffer(buf.len()));
    }
    let magic = [buf[0], buf[1], buf[2], buf[3]];
    if magic != MAGIC {
        return Err(ParseError::BadMagic(magic));
    }
    let message_id = u16::from_le_bytes([buf[4], buf[5]]);
    if message_id != MSG_EV_RECOGNITION_INFO {
        return Err(ParseError::UnknownId(message_id));
    }
    let declared_len = u16::from_le_bytes([buf[6], buf[7]]);
    let p = &buf[HEADER_LEN..];
    Ok(ControlPacket {
        message_id,
        declared_len,
        payload: StatusPayload::new(p[0], p[1], p[2], p[3]),
    })
}
