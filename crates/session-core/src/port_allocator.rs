//! RTP port allocator (spec §4.G: "allocate a local UDP port ... by
//! probe-open-close"; §5: "stateless — each allocation is an independent
//! probe against the OS; no shared counter needed"; §8 scenario 6: "retry
//! up to `max_port_attempts`, then fall back to one final random choice").

use std::net::IpAddr;

use rand::Rng;
use rtp_core::RtpSocket;
use tracing::warn;

use crate::error::{Error, Result};

/// Binds a socket at a random port inside `range`, retrying up to
/// `max_attempts` times on bind failure (port already in use), then making
/// one final attempt at an OS-assigned ephemeral port before giving up.
pub async fn allocate(local_addr: IpAddr, range: (u16, u16), max_attempts: u32) -> Result<RtpSocket> {
    let (low, high) = range;
    for attempt in 0..max_attempts {
        let candidate = rand::thread_rng().gen_range(low..high);
        match RtpSocket::bind(local_addr, candidate).await {
            Ok(socket) => return Ok(socket),
            Err(e) => {
                warn!(attempt, port = candidate, error = %e, "RTP port probe failed, retrying");
            }
        }
    }
    // Fallback: let the OS pick, per spec §8 scenario 6.
    RtpSocket::bind(local_addr, 0).await.map_err(|_| Error::Media(media_core::Error::PortAllocationFailed { attempts: max_attempts }))
}
