use std::fmt::{self, Display, Formatter};
use std::io;

/// Fatal startup failures. Per-request timeouts and `ERROR_REQ` rejections
/// are not represented here — they are ordinary outcomes of the request
/// loop, diagnosed and then the client moves on.
#[derive(Debug)]
pub enum BankError {
    InvalidPort(String),
    SocketBind(io::Error),
    SocketConfig(io::Error),
    /// No `DISCOVERY_ACK` arrived before the timeout, or the first datagram
    /// received was of the wrong type.
    Discovery,
}

impl Display for BankError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            BankError::InvalidPort(raw) => write!(f, "invalid port: {raw:?}"),
            BankError::SocketBind(e) => write!(f, "failed to bind UDP socket: {e}"),
            BankError::SocketConfig(e) => write!(f, "failed to configure UDP socket: {e}"),
            BankError::Discovery => write!(f, "discovery failed: no server responded in time"),
        }
    }
}

impl std::error::Error for BankError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            BankError::InvalidPort(_) | BankError::Discovery => None,
            BankError::SocketBind(e) | BankError::SocketConfig(e) => Some(e),
        }
    }
}
