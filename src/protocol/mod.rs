//! HMI command protocol.
//!
//! - `codec`: the 16-byte `POLA` packet format (pure, no I/O)
//! - `link`: datagram transport and the trigger acceptance policy

pub mod codec;
pub mod link;

pub use codec::{
    decode, encode, ControlPacket, ParseError, StatusPayload, ACTIVATE_STATUS, MAGIC,
    MSG_EV_RECOGNITION_INFO, PACKET_LEN, PAYLOAD_LEN,
};
pub use link::{check_trigger, HmiLink, Inbound, TriggerCheck, UdpHmiLink, UdpLinkConfig};
