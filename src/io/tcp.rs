//! TCP probe send/receive. Grounded on `seeyarh-radar`'s
//! `run_service_probe` (write-then-bounded-read shape) and
//! `original_source/scan.go`'s `tcpSend`, which keeps reading in a loop
//! until either the deadline expires or a read returns nothing new —
//! important for probes like `NULL` that send nothing and simply wait to
//! see whether the service volunteers a banner. After the first read,
//! subsequent reads are bounded by `DRAIN_GRACE` rather than stopping on
//! the first short read: a short read on a non-blocking socket doesn't
//! reliably mean "no more data coming" the way it does for a scratch-sized
//! blocking read, so this waits a small grace window for a follow-up
//! packet instead of risking a truncated multi-packet banner.

use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::time::timeout;

use crate::error::ProbeOutcome;
use crate::io::AsyncReadWrite;

const MAX_BANNER_BYTES: usize = 4096;
/// Once an initial read has produced data, give the peer this much extra
/// time to finish a multi-packet banner before treating the connection as
/// drained. Keeps a chatty server's reply from being truncated mid-line
/// without blocking a quiet one for the full probe timeout.
const DRAIN_GRACE: Duration = Duration::from_millis(200);

/// Write `payload` (if non-empty) and read back whatever the peer sends
/// within `wait`. Returns the accumulated banner bytes, or the
/// `ProbeOutcome` that ended the attempt early.
pub async fn tcp_send(
    stream: &mut Box<dyn AsyncReadWrite>,
    payload: &[u8],
    wait: Duration,
) -> Result<Vec<u8>, ProbeOutcome> {
    if !payload.is_empty() {
        match timeout(wait, stream.write_all(payload)).await {
            Ok(Ok(())) => {}
            Ok(Err(_)) => return Err(ProbeOutcome::Close),
            Err(_) => return Err(ProbeOutcome::WriteTimeout),
        }
    }

    let mut banner = Vec::new();
    let mut buf = [0u8; 1024];

    let first_read = timeout(wait, stream.read(&mut buf)).await;
    match first_read {
        Ok(Ok(0)) => return Err(ProbeOutcome::Close),
        Ok(Ok(n)) => banner.extend_from_slice(&buf[..n]),
        Ok(Err(_)) => return Err(ProbeOutcome::Close),
        Err(_) => return Err(ProbeOutcome::ReadTimeout),
    }

    while banner.len() < MAX_BANNER_BYTES {
        match timeout(DRAIN_GRACE, stream.read(&mut buf)).await {
            Ok(Ok(0)) | Err(_) => break,
            Ok(Ok(n)) => banner.extend_from_slice(&buf[..n]),
            Ok(Err(_)) => break,
        }
    }

    let _ = stream.shutdown().await;
    Ok(banner)
}
