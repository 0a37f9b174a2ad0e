use std::fmt::{self, Display, Formatter};
use std::io;

/// Fatal startup failures. There is no variant for anything past startup:
/// malformed datagrams and policy rejects are ordinary branches of
/// `bank-core`'s decision table, not errors.
#[derive(Debug)]
pub enum BankError {
    InvalidPort(String),
    SocketBind(io::Error),
}

impl Display for BankError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            BankError::InvalidPort(raw) => write!(f, "invalid port: {raw:?}"),
            BankError::SocketBind(e) => write!(f, "failed to bind UDP socket: {e}"),
        }
    }
}

impl std::error::Error for BankError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            BankError::InvalidPort(_) => None,
            BankError::SocketBind(e) => Some(e),
        }
    }
}
