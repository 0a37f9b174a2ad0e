//! The protocol-contract line emitter.
//!
//! These lines are part of the server's documented output, not a diagnostic,
//! so they never go through the `log` facade: a dedicated thread owns stdout
//! and drains a single-consumer channel of fully-formed strings, printing
//! each as it arrives. Formatting happens in the caller, while the state
//! lock is still held, so line order matches processing order.

use std::sync::mpsc::{self, Receiver, Sender};
use std::thread::{self, JoinHandle};

use bank_proto::ClientId;
use bank_core::Snapshot;
use chrono::Local;

fn timestamp() -> String {
    Local::now().format("%Y-%m-%d %H:%M:%S").to_string()
}

/// The line printed once at startup, before any datagram is processed.
pub fn startup_line() -> String {
    format!("{} num_transactions 0 total_transferred 0 total_balance 0", timestamp())
}

/// The line for a processed or duplicate `REQ`. `duplicate` inserts `DUP!!`
/// between `client <orig>` and `id req`, matching the required grammar
/// exactly.
pub fn req_line(
    orig: ClientId,
    duplicate: bool,
    seqn: u32,
    dest: ClientId,
    value: u32,
    snapshot: Snapshot,
) -> String {
    let dup = if duplicate { "DUP!! " } else { "" };
    format!(
        "{} client {orig} {dup}id req {seqn} dest {dest} value {value} num_transactions {} total_transferred {} total_balance {}",
        timestamp(),
        snapshot.num_transactions,
        snapshot.total_transferred,
        snapshot.total_balance,
    )
}

/// A cloneable handle onto the emitter thread's queue. `mpsc::Sender` is
/// `Send` but not guaranteed `Sync`, so each worker gets its own cloned
/// handle at spawn time rather than sharing one across threads by
/// reference — the idiomatic multi-producer shape for this channel.
#[derive(Clone)]
pub struct EmitterHandle {
    tx: Sender<String>,
}

impl EmitterHandle {
    /// Enqueues a line for printing. The emitter thread never blocks a
    /// worker past this send.
    pub fn send(&self, line: String) {
        // The receiver only disappears if the emitter thread panicked; there
        // is nothing a worker can usefully do about that but drop the line.
        let _ = self.tx.send(line);
    }
}

/// Owns the dedicated stdout-printing thread. Kept alive for the process's
/// lifetime; [`Emitter::handle`] hands out the per-worker senders.
pub struct Emitter {
    tx: Sender<String>,
    handle: JoinHandle<()>,
}

impl Emitter {
    /// Spawns the dedicated stdout-owning thread.
    pub fn spawn() -> Self {
        let (tx, rx): (Sender<String>, Receiver<String>) = mpsc::channel();
        let handle = thread::spawn(move || {
            for line in rx {
                println!("{line}");
            }
        });
        Emitter { tx, handle }
    }

    /// Enqueues a line directly, for one-off sends (the startup line) that
    /// don't need a dedicated handle.
    pub fn send(&self, line: String) {
        let _ = self.tx.send(line);
    }

    /// Returns a cloned, independently ownable sender for a worker thread.
    pub fn handle(&self) -> EmitterHandle {
        EmitterHandle { tx: self.tx.clone() }
    }

    pub fn join(self) {
        drop(self.tx);
        let _ = self.handle.join();
    }
}
