//! Transport I/O. Grounded on `seeyarh-radar`'s
//! `scan.rs` (`AsyncReadWrite` trait alias, `connect_with_timeout`,
//! `run_service_probe`) and `original_source/scan.go` (`tcpSend`,
//! `udpSend`, `ScanAddress`) for the bounded-read-loop and UDP-connect
//! semantics, and `original_source/dialer.go` for the proxy-vs-direct
//! dialer split.

pub mod dialer;
pub mod tcp;
pub mod udp;

use tokio::io::{AsyncRead, AsyncWrite};

pub use dialer::{Dialer, DirectDialer, Socks5Dialer};

/// Any duplex transport the probe senders can write to and read from,
/// generalized to a trait object so TLS-wrapped and plain streams can
/// share one call site.
pub trait AsyncReadWrite: AsyncRead + AsyncWrite + Unpin + Send {}
impl<T: AsyncRead + AsyncWrite + Unpin + Send> AsyncReadWrite for T {}
