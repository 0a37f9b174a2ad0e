//! The concurrency shell: socket I/O, the worker pool, and lock discipline
//! around [`BankState`]. The coarse scheme is a single `RwLock<BankState>`
//! shared across a fixed pool of worker threads.

use std::net::{SocketAddr, SocketAddrV4, UdpSocket};
use std::sync::mpsc::{self, Receiver, SyncSender};
use std::sync::{Arc, RwLock};
use std::thread;

use bank_core::BankState;
use bank_proto::{ClientId, Packet, PACKET_LEN};

use crate::emitter::{self, EmitterHandle};

/// Number of worker threads consuming the task queue.
pub const WORKER_COUNT: usize = 4;

/// Capacity of the bounded queue between the receive loop and the workers;
/// the receive loop blocks on push once it is full, which is the shell's
/// only backpressure mechanism.
pub const TASK_QUEUE_CAP: usize = 256;

type Task = (Vec<u8>, SocketAddrV4);

/// Runs the receive loop and worker pool until the socket errors out. Never
/// returns under normal operation — the server has no shutdown path.
pub fn run(socket: UdpSocket, state: Arc<RwLock<BankState>>, emitter: EmitterHandle) {
    let (tx, rx): (SyncSender<Task>, Receiver<Task>) = mpsc::sync_channel(TASK_QUEUE_CAP);
    let rx = Arc::new(std::sync::Mutex::new(rx));

    let mut workers = Vec::with_capacity(WORKER_COUNT);
    for id in 0..WORKER_COUNT {
        let rx = Arc::clone(&rx);
        let state = Arc::clone(&state);
        let emitter = emitter.clone();
        let socket = socket.try_clone().expect("failed to clone UDP socket for worker");
        workers.push(thread::spawn(move || {
            log::debug!("worker {id} started");
            worker_loop(rx, state, emitter, socket);
        }));
    }

    let mut buf = [0u8; PACKET_LEN];
    loop {
        let (n, src) = match socket.recv_from(&mut buf) {
            Ok(pair) => pair,
            Err(e) => {
                log::warn!("recv_from failed: {e}");
                continue;
            }
        };
        let src = match src {
            SocketAddr::V4(addr) => addr,
            SocketAddr::V6(addr) => {
                log::debug!("dropping IPv6 datagram from {addr}: no IPv6 support");
                continue;
            }
        };
        if tx.send((buf[..n].to_vec(), src)).is_err() {
            log::error!("all workers gone, dropping datagram from {src}");
        }
    }
}

fn worker_loop(
    rx: Arc<std::sync::Mutex<Receiver<Task>>>,
    state: Arc<RwLock<BankState>>,
    emitter: EmitterHandle,
    socket: UdpSocket,
) {
    loop {
        let task = {
            let rx = rx.lock().unwrap();
            rx.recv()
        };
        let Ok((buf, src)) = task else {
            return; // sender dropped: process is shutting down
        };
        dispatch(&buf, src, &state, &emitter, &socket);
    }
}

/// Decodes one datagram, classifies it, applies the decision table, and
/// formats any required log line, replying on `socket` outside the lock
/// wherever the lock isn't needed to preserve log ordering.
fn dispatch(
    buf: &[u8],
    src: SocketAddrV4,
    state: &RwLock<BankState>,
    emitter: &EmitterHandle,
    socket: &UdpSocket,
) {
    let packet = match Packet::decode(buf) {
        Ok(p) => p,
        Err(e) => {
            log::debug!("dropping malformed datagram from {src}: {e}");
            return;
        }
    };
    let orig = ClientId::from(*src.ip());

    match packet {
        Packet::Discovery => {
            {
                let mut st = state.write().unwrap();
                st.handle_discovery(orig);
            }
            log::info!("discovery from {src}");
            reply(socket, src, Packet::DiscoveryAck);
        }
        Packet::Req { seqn, dest, value } => {
            let mut st = state.write().unwrap();
            match st.process_request(orig, seqn, dest, value) {
                Err(_unknown_origin) => {
                    drop(st);
                    log::warn!("REQ from unknown origin {src}, seqn {seqn}");
                    reply(socket, src, Packet::ErrorReq { seqn });
                }
                Ok(outcome) => {
                    // Format and enqueue the line while still holding the
                    // write lock: that is what makes the emitter's arrival
                    // order match processing order across workers.
                    if outcome.processed || outcome.duplicate {
                        let line =
                            emitter::req_line(orig, outcome.duplicate, outcome.ack_seq, dest, value, outcome.snapshot);
                        emitter.send(line);
                    }
                    drop(st);
                    reply(socket, src, Packet::AckReq { seqn: outcome.ack_seq, new_balance: outcome.new_balance });
                }
            }
        }
        Packet::DiscoveryAck | Packet::AckReq { .. } | Packet::ErrorReq { .. } => {
            log::debug!("dropping client-directed packet type received by the server from {src}");
        }
    }
}

fn reply(socket: &UdpSocket, dst: SocketAddrV4, packet: Packet) {
    let buf = packet.encode();
    if let Err(e) = socket.send_to(&buf, dst) {
        log::warn!("send_to {dst} failed: {e}");
    }
}
