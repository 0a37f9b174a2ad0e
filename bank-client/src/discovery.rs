//! Client discovery: broadcast a `DISCOVERY`, accept the first
//! `DISCOVERY_ACK` as the bound server for the rest of the session.

use std::net::{SocketAddr, SocketAddrV4, UdpSocket};
use std::time::Duration;

use bank_proto::{Packet, PACKET_LEN};

use crate::error::BankError;

const BROADCAST_ADDR: &str = "255.255.255.255";

/// Long enough that a LAN broadcast round trip is never mistaken for
/// failure, short enough that an absent server is diagnosed promptly.
pub const DISCOVERY_TIMEOUT: Duration = Duration::from_secs(2);

/// Sends `DISCOVERY` to the broadcast address on `port` and blocks for one
/// reply. Returns the address of the first `DISCOVERY_ACK` received, which
/// becomes the bound server for the rest of the session.
pub fn discover(socket: &UdpSocket, port: u16) -> Result<SocketAddrV4, BankError> {
    let broadcast = SocketAddrV4::new(BROADCAST_ADDR.parse().unwrap(), port);
    let datagram = Packet::Discovery.encode();
    socket.send_to(&datagram, broadcast).map_err(BankError::SocketConfig)?;
    log::info!("discovery sent to {broadcast}");

    socket.set_read_timeout(Some(DISCOVERY_TIMEOUT)).map_err(BankError::SocketConfig)?;

    let mut buf = [0u8; PACKET_LEN];
    let (n, src) = socket.recv_from(&mut buf).map_err(|_| BankError::Discovery)?;
    let src = match src {
        SocketAddr::V4(addr) => addr,
        SocketAddr::V6(_) => return Err(BankError::Discovery),
    };

    match Packet::decode(&buf[..n]) {
        Ok(Packet::DiscoveryAck) => {
            log::info!("bound to server {src}");
            Ok(src)
        }
        _ => Err(BankError::Discovery),
    }
}
