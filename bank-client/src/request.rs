//! The client request loop: sequence numbering, timed retransmission, and
//! ACK validation.

use std::net::{SocketAddr, SocketAddrV4, UdpSocket};
use std::time::{Duration, Instant};

use bank_proto::{ClientId, Packet, PACKET_LEN};

/// Up to this many send attempts per request before giving up.
pub const MAX_RETRIES: u32 = 3;

/// Per-attempt receive timeout.
pub const TIMEOUT: Duration = Duration::from_millis(10);

/// What came of one `(dest, value)` request after the retry loop ran out of
/// options or got a conclusive answer.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum RequestResult {
    Acked { new_balance: u32 },
    Errored,
    GaveUp,
}

/// Runs the retransmission loop for one request: builds the `REQ` once, then
/// resends it up to [`MAX_RETRIES`] times, each attempt bounded by
/// [`TIMEOUT`] and tracked against an absolute deadline so that datagrams
/// from addresses other than `bound_server` are ignored without burning the
/// attempt.
pub fn send_request(
    socket: &UdpSocket,
    bound_server: SocketAddrV4,
    seqn: u32,
    dest: ClientId,
    value: u32,
) -> RequestResult {
    let datagram = Packet::Req { seqn, dest, value }.encode();
    let bound_server_addr = SocketAddr::V4(bound_server);
    let mut buf = [0u8; PACKET_LEN];

    for attempt in 1..=MAX_RETRIES {
        if let Err(e) = socket.send_to(&datagram, bound_server) {
            log::warn!("send attempt {attempt} for seqn {seqn} failed: {e}");
            continue;
        }

        let deadline = Instant::now() + TIMEOUT;
        loop {
            let remaining = match deadline.checked_duration_since(Instant::now()) {
                Some(d) if d > Duration::ZERO => d,
                _ => break, // this attempt's window has closed
            };
            if socket.set_read_timeout(Some(remaining)).is_err() {
                break;
            }

            match socket.recv_from(&mut buf) {
                Ok((n, src)) => {
                    if src != bound_server_addr {
                        // Foreign datagram: keep waiting in this same
                        // attempt, no retry consumed.
                        continue;
                    }
                    match Packet::decode(&buf[..n]) {
                        Ok(Packet::AckReq { seqn: acked, new_balance }) if acked == seqn => {
                            return RequestResult::Acked { new_balance };
                        }
                        Ok(Packet::ErrorReq { .. }) => return RequestResult::Errored,
                        // Any other payload (wrong seqn, wrong type,
                        // malformed): treat this attempt as timed out.
                        _ => break,
                    }
                }
                Err(e) if e.kind() == std::io::ErrorKind::WouldBlock || e.kind() == std::io::ErrorKind::TimedOut => {
                    break;
                }
                Err(e) => {
                    log::warn!("recv_from failed during request seqn {seqn}: {e}");
                    break;
                }
            }
        }
    }

    RequestResult::GaveUp
}
