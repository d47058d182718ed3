//! RFC 3261 §17 timer table and derived values.

use std::time::Duration;

/// Retransmission base interval, unreliable transports.
pub const T1: Duration = Duration::from_millis(500);
/// Cap for non-INVITE and INVITE-response retransmission backoff.
pub const T2: Duration = Duration::from_secs(4);
/// Non-INVITE server "wait for retransmits" interval, unreliable transports.
pub const T4: Duration = Duration::from_secs(5);

/// Timer B/F/H: 64 * T1.
pub fn timer_64t1() -> Duration {
    T1 * 64
}

/// Timer D: client INVITE Completed -> Terminated, at least 32s on
/// unreliable transports.
pub fn timer_d() -> Duration {
    Duration::from_secs(32)
}

/// Timer I: server INVITE Confirmed -> Terminated, unreliable transports.
pub fn timer_i() -> Duration {
    T4
}

/// Timer J: server non-INVITE Completed -> Terminated, unreliable transports.
pub fn timer_j() -> Duration {
    timer_64t1()
}

/// Timer K: client non-INVITE Completed -> Terminated, unreliable transports.
pub fn timer_k() -> Duration {
    T4
}

/// The server INVITE transaction's "send 100 Trying if the TU hasn't
/// responded yet" grace period (RFC 3261 §17.2.1).
pub fn provisional_100_delay() -> Duration {
    Duration::from_millis(200)
}

/// Doubles an interval, capping at `cap`. Timer E caps at T4, Timer G caps
/// at T2; Timer A (client INVITE retransmit) doubles uncapped until Timer B
/// terminates the transaction.
pub fn double_capped(current: Duration, cap: Duration) -> Duration {
    std::cmp::min(current * 2, cap)
}

/// Every timer a transaction state machine can have outstanding. At most one
/// is ever armed per transaction; arming a new one replaces the old one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimerName {
    /// Client INVITE request retransmit.
    A,
    /// Client INVITE timeout (Calling/Proceeding -> Terminated).
    B,
    /// Client INVITE Completed -> Terminated.
    D,
    /// Client non-INVITE request retransmit.
    E,
    /// Client non-INVITE timeout (Trying/Proceeding -> Terminated).
    F,
    /// Server INVITE final-response retransmit.
    G,
    /// Server INVITE Completed -> Terminated without ACK.
    H,
    /// Server INVITE Confirmed -> Terminated.
    I,
    /// Server non-INVITE Completed -> Terminated.
    J,
    /// Client non-INVITE Completed -> Terminated.
    K,
    /// Server INVITE auto-100-Trying grace period.
    Provisional100,
}
