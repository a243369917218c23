//! UDP probe send/receive. Grounded on
//! `original_source/scan.go`'s `udpSend`/`ScanUdp`: UDP has no connection
//! handshake, so "connect" here only associates the remote address with
//! the socket (so `recv` filters out datagrams from anyone else and
//! ICMP port-unreachable surfaces as a normal I/O error instead of silent
//! data loss).

use std::time::Duration;

use tokio::net::UdpSocket;
use tokio::time::timeout;

use crate::error::ProbeOutcome;

const MAX_DATAGRAM_BYTES: usize = 8192;

/// Send `payload` to `address` over a fresh UDP socket and wait `wait` for
/// a single reply datagram.
pub async fn udp_send(
    address: &str,
    payload: &[u8],
    wait: Duration,
) -> Result<Vec<u8>, ProbeOutcome> {
    let socket = UdpSocket::bind("0.0.0.0:0")
        .await
        .map_err(|_| ProbeOutcome::Close)?;
    socket
        .connect(address)
        .await
        .map_err(|_| ProbeOutcome::Close)?;

    if !payload.is_empty() {
        match timeout(wait, socket.send(payload)).await {
            Ok(Ok(_)) => {}
            Ok(Err(_)) => return Err(ProbeOutcome::Close),
            Err(_) => return Err(ProbeOutcome::WriteTimeout),
        }
    }

    let mut buf = [0u8; MAX_DATAGRAM_BYTES];
    match timeout(wait, socket.recv(&mut buf)).await {
        Ok(Ok(n)) => Ok(buf[..n].to_vec()),
        // A connected UDP socket surfaces an ICMP port-unreachable as
        // ECONNREFUSED on the next syscall — treat that the same as a
        // closed TCP port.
        Ok(Err(_)) => Err(ProbeOutcome::Close),
        Err(_) => Err(ProbeOutcome::ReadTimeout),
    }
}
