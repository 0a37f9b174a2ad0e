//! The pure, I/O-free half of the bank service: the client registry and the
//! bank state machine. Nothing in this crate touches a socket, a lock, or a
//! clock — that separation is what lets the decision table be unit-tested
//! one branch at a time and fuzzed for its arithmetic invariants.

mod registry;
mod state;

pub use registry::{ClientRecord, ClientRegistry, LastLog, INITIAL_BALANCE};
pub use state::{BankState, Outcome, Snapshot, UnknownOrigin};

#[cfg(test)]
mod invariant_fuzz;
