//! End-to-end scan behavior against real local sockets. Grounded on the
//! pack's own practice of driving scanners against `tokio::net`
//! listeners rather than mocking the transport (see the
//! `doublegate-ProRT-IP` and `abzcoding-easm` crates' `tests/` trees).

use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, UdpSocket};

use probefinch::{Engine, EngineOptions, Protocol, ServiceCatalog, Status};

fn engine_with_catalog(text: &str) -> Engine {
    let catalog = ServiceCatalog::parse(text, 9).expect("catalog parses");
    let options = EngineOptions {
        timeout_seconds: 2,
        ..Default::default()
    };
    Engine::new(catalog, options)
}

const HTTP_CATALOG: &str = "\
Probe TCP GetRequest q|GET / HTTP/1.0\\r\\n\\r\\n|
rarity 1
match http m|^HTTP/1\\.[01] \\d\\d\\d.*\\r\\nServer: ([^\\r\\n]+)|s p/generic http/ i/$1/
";

#[tokio::test]
async fn plain_http_banner_is_matched_with_extracted_server_header() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut buf = [0u8; 256];
        let _ = socket.read(&mut buf).await;
        socket
            .write_all(b"HTTP/1.1 200 OK\r\nServer: TestServer/1.0\r\n\r\n")
            .await
            .unwrap();
    });

    let engine = engine_with_catalog(HTTP_CATALOG);
    let response = engine
        .scan_address(Protocol::Tcp, &format!("127.0.0.1:{port}"))
        .await
        .unwrap();

    assert_eq!(response.status, Status::Matched);
    let service = response.service.expect("service present");
    assert_eq!(service.service, "http");
    assert_eq!(service.info, "TestServer/1.0");
}

#[tokio::test]
async fn refused_connection_yields_close_status() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);

    let engine = engine_with_catalog(HTTP_CATALOG);
    let response = engine
        .scan_address(Protocol::Tcp, &format!("127.0.0.1:{port}"))
        .await
        .unwrap();

    assert_eq!(response.status, Status::Close);
}

const TWO_NULL_PROBE_CATALOG: &str = "\
Probe TCP First q||
rarity 1
match nothing m/NEVER_MATCHES/

Probe TCP Second q||
rarity 1
match nothing m/NEVER_MATCHES/
";

#[tokio::test]
async fn stale_close_status_from_an_earlier_probe_does_not_leak_into_final_unknown() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    tokio::spawn(async move {
        // First connection: accept and hang up immediately with no data,
        // which the I/O layer reports as a probe-local `Close`.
        let (socket, _) = listener.accept().await.unwrap();
        drop(socket);
        // Second connection: accept, send a banner that matches nothing,
        // then hang up.
        let (mut socket, _) = listener.accept().await.unwrap();
        socket.write_all(b"JUNK").await.unwrap();
        drop(socket);
    });

    let engine = engine_with_catalog(TWO_NULL_PROBE_CATALOG);
    let response = engine
        .scan_address(Protocol::Tcp, &format!("127.0.0.1:{port}"))
        .await
        .unwrap();

    // A single transient `Close` on the first probe must not survive to
    // the final result once a later probe comes back open-but-unmatched.
    assert_eq!(response.status, Status::Unknown);
}

const SSH_CATALOG: &str = "\
Probe TCP NULL q||
rarity 1
match ssh m/^SSH-([\\d.]+)-OpenSSH[_-]([\\w.]+)/ p/OpenSSH/ v/$2/ i/protocol $1/
";

#[tokio::test]
async fn null_probe_matches_a_volunteered_banner() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        socket
            .write_all(b"SSH-2.0-OpenSSH_9.2p1\r\n")
            .await
            .unwrap();
        // Keep the socket open briefly so the engine's read has time to land.
        tokio::time::sleep(Duration::from_millis(100)).await;
    });

    let engine = engine_with_catalog(SSH_CATALOG);
    let response = engine
        .scan_address(Protocol::Tcp, &format!("127.0.0.1:{port}"))
        .await
        .unwrap();

    assert_eq!(response.status, Status::Matched);
    let service = response.service.expect("service present");
    assert_eq!(service.service, "ssh");
    assert_eq!(service.version, "9.2p1");
    assert_eq!(service.info, "protocol 2.0");
}

const TCPWRAPPED_CATALOG: &str = "\
Probe TCP NULL q||
rarity 1
totalwaitms 150
tcpwrappedms 5000
match nothing m/ZZZ_NEVER_MATCHES_ZZZ/
";

#[tokio::test]
async fn silent_peer_within_tcpwrapped_window_is_reported_as_tcpwrapped() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    tokio::spawn(async move {
        let (_socket, _) = listener.accept().await.unwrap();
        // Accept and then say nothing at all for the lifetime of the test.
        tokio::time::sleep(Duration::from_secs(2)).await;
    });

    let engine = engine_with_catalog(TCPWRAPPED_CATALOG);
    let response = engine
        .scan_address(Protocol::Tcp, &format!("127.0.0.1:{port}"))
        .await
        .unwrap();

    assert_eq!(response.status, Status::Tcpwrapped);
}

const DNS_CATALOG: &str = "\
Probe UDP DNSStatusRequest q|\\0\\0\\x10\\0\\0\\0\\0\\0\\0\\0\\0\\0|
rarity 1
ports 53
match domain m/^..\\x10[\\x00\\x80-\\x8f]/ p/DNS/
";

#[tokio::test]
async fn udp_probe_matches_a_reply_datagram() {
    let socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    let port = socket.local_addr().unwrap().port();

    tokio::spawn(async move {
        let mut buf = [0u8; 64];
        let (_n, peer) = socket.recv_from(&mut buf).await.unwrap();
        socket
            .send_to(b"\x00\x00\x10\x80\x00\x00\x00\x00\x00\x00\x00\x00", peer)
            .await
            .unwrap();
    });

    let engine = engine_with_catalog(DNS_CATALOG);
    let response = engine
        .scan_address(Protocol::Udp, &format!("127.0.0.1:{port}"))
        .await
        .unwrap();

    assert_eq!(response.status, Status::Matched);
    assert_eq!(response.service.unwrap().service, "dns");
}

#[tokio::test]
async fn port_53_forces_udp_even_when_tcp_is_requested() {
    // No listener needed: sending a UDP datagram to an unbound port
    // doesn't require binding port 53 ourselves, and `scan_address` only
    // needs to reach the protocol-selection branch, not get a reply.
    let engine = engine_with_catalog(DNS_CATALOG);
    let response = engine
        .scan_address(Protocol::Tcp, "127.0.0.1:53")
        .await
        .unwrap();

    assert_eq!(response.protocol, Protocol::Udp);
}
