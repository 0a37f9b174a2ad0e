//! Wire codec for the bank-over-UDP protocol.
//!
//! Every datagram shares a fixed, packed, 18-byte layout with all multi-byte
//! fields in network byte order. This crate is the only place that touches
//! those bytes directly; everything above it works with [`Packet`] and
//! [`ClientId`] values.
//!
//! ```text
//! offset  size  field
//! 0       2     type        (unsigned 16)
//! 2       4     seqn        (unsigned 32)
//! 6       4     dest_addr   (IPv4, network order)  -- REQ/ACK_REQ
//! 10      4     value       (unsigned 32)          -- REQ/ACK_REQ
//! 14      4     balance     (unsigned 32)          -- ACK_REQ only
//! ```

use std::fmt::{self, Debug, Display, Formatter};
use std::net::Ipv4Addr;

/// Total size of a full-length datagram (DISCOVERY/DISCOVERY_ACK/ERROR_REQ may
/// arrive shorter; REQ and ACK_REQ require this many bytes).
pub const PACKET_LEN: usize = 18;

/// Minimum size the server accepts for a datagram at all: enough for `type` + `seqn`.
pub const MIN_HEADER_LEN: usize = 6;

#[repr(u16)]
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum RawType {
    Discovery = 1,
    DiscoveryAck = 2,
    Req = 3,
    AckReq = 4,
    ErrorReq = 5,
}

impl RawType {
    fn from_u16(v: u16) -> Option<Self> {
        match v {
            1 => Some(RawType::Discovery),
            2 => Some(RawType::DiscoveryAck),
            3 => Some(RawType::Req),
            4 => Some(RawType::AckReq),
            5 => Some(RawType::ErrorReq),
            _ => None,
        }
    }
}

/// Identifies a client by its IPv4 address, stored in network byte order.
///
/// This is the one identity type the protocol carries above the codec layer;
/// no code outside this module reasons about network byte order directly.
#[derive(Clone, Copy, Default, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct ClientId(u32);

impl ClientId {
    /// Constructs a `ClientId` from a 32-bit value already in network order.
    pub fn from_be_u32(v: u32) -> Self {
        ClientId(v)
    }

    /// Returns the underlying 32-bit value in network order.
    pub fn to_be_u32(self) -> u32 {
        self.0
    }
}

impl From<Ipv4Addr> for ClientId {
    fn from(ip: Ipv4Addr) -> Self {
        ClientId(u32::from_be_bytes(ip.octets()))
    }
}

impl From<ClientId> for Ipv4Addr {
    fn from(id: ClientId) -> Self {
        Ipv4Addr::from(id.0.to_be_bytes())
    }
}

impl Debug for ClientId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "ClientId({})", Ipv4Addr::from(*self))
    }
}

impl Display for ClientId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        Display::fmt(&Ipv4Addr::from(*self), f)
    }
}

/// A decoded datagram.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Packet {
    /// Sent by a client on startup to the broadcast address.
    Discovery,
    /// Sent by the server in reply to a `Discovery`.
    DiscoveryAck,
    /// A transfer (or balance-query, when `value == 0`) request.
    Req { seqn: u32, dest: ClientId, value: u32 },
    /// Acknowledges a `Req`, echoing the sequence it applies to and the
    /// origin's resulting balance.
    AckReq { seqn: u32, new_balance: u32 },
    /// A protocol-level rejection, sent only when the origin is unknown.
    ErrorReq { seqn: u32 },
}

impl Packet {
    /// Encodes this packet as a fixed 18-byte buffer. Fields the variant does
    /// not use are zeroed, matching the source protocol's habit of reusing one
    /// packed struct for every message type.
    pub fn encode(&self) -> [u8; PACKET_LEN] {
        let mut buf = [0u8; PACKET_LEN];
        let (ty, seqn, dest, value, balance) = match *self {
            Packet::Discovery => (RawType::Discovery, 0, 0, 0, 0),
            Packet::DiscoveryAck => (RawType::DiscoveryAck, 0, 0, 0, 0),
            Packet::Req { seqn, dest, value } => (RawType::Req, seqn, dest.to_be_u32(), value, 0),
            Packet::AckReq { seqn, new_balance } => (RawType::AckReq, seqn, 0, 0, new_balance),
            Packet::ErrorReq { seqn } => (RawType::ErrorReq, seqn, 0, 0, 0),
        };
        buf[0..2].copy_from_slice(&(ty as u16).to_be_bytes());
        buf[2..6].copy_from_slice(&seqn.to_be_bytes());
        buf[6..10].copy_from_slice(&dest.to_be_bytes());
        buf[10..14].copy_from_slice(&value.to_be_bytes());
        buf[14..18].copy_from_slice(&balance.to_be_bytes());
        buf
    }

    /// Decodes a received datagram, enforcing the length each message type
    /// requires: short datagrams are only ever valid for discovery.
    pub fn decode(buf: &[u8]) -> Result<Packet, CodecError> {
        if buf.len() < MIN_HEADER_LEN {
            return Err(CodecError::TooShort { got: buf.len(), need: MIN_HEADER_LEN });
        }
        let raw_type = u16::from_be_bytes([buf[0], buf[1]]);
        let seqn = u32::from_be_bytes([buf[2], buf[3], buf[4], buf[5]]);
        let ty = RawType::from_u16(raw_type).ok_or(CodecError::UnknownType(raw_type))?;

        match ty {
            RawType::Discovery => Ok(Packet::Discovery),
            RawType::DiscoveryAck => Ok(Packet::DiscoveryAck),
            RawType::ErrorReq => Ok(Packet::ErrorReq { seqn }),
            RawType::Req => {
                if buf.len() < PACKET_LEN {
                    return Err(CodecError::TooShort { got: buf.len(), need: PACKET_LEN });
                }
                let dest = u32::from_be_bytes([buf[6], buf[7], buf[8], buf[9]]);
                let value = u32::from_be_bytes([buf[10], buf[11], buf[12], buf[13]]);
                Ok(Packet::Req { seqn, dest: ClientId::from_be_u32(dest), value })
            }
            RawType::AckReq => {
                if buf.len() < PACKET_LEN {
                    return Err(CodecError::TooShort { got: buf.len(), need: PACKET_LEN });
                }
                let new_balance = u32::from_be_bytes([buf[14], buf[15], buf[16], buf[17]]);
                Ok(Packet::AckReq { seqn, new_balance })
            }
        }
    }
}

/// Why a received datagram could not be decoded. Both variants are silently
/// dropped by callers — they are named here so the drop is a deliberate
/// branch rather than a collapsed `None`.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum CodecError {
    TooShort { got: usize, need: usize },
    UnknownType(u16),
}

impl Display for CodecError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            CodecError::TooShort { got, need } => {
                write!(f, "datagram too short: got {got} bytes, need at least {need}")
            }
            CodecError::UnknownType(t) => write!(f, "unknown packet type {t}"),
        }
    }
}

impl std::error::Error for CodecError {}
