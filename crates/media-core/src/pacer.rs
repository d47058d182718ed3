//! The realtimer (spec §4.G pacer stage): releases one frame every frame
//! period so the outbound send rate tracks wall-clock time instead of
//! however fast the encoder happens to run. Grounded on the teacher's
//! `rtp-core::session::scheduling::RtpScheduler`, but scoped down to just
//! the periodic-release half — this workspace keeps sequencing in
//! `payloader.rs` instead of folding it into the pacer.

use std::time::Duration;

use tokio::time::{self, Interval, MissedTickBehavior};

pub struct Pacer {
    interval: Interval,
}

impl Pacer {
    /// `frame_duration` is the wall-clock period one frame represents (20 ms
    /// for both G.711 and Opus at this spec's fixed frame size).
    pub fn new(frame_duration: Duration) -> Self {
        let mut interval = time::interval(frame_duration);
        // A slow consumer should not get a burst of catch-up ticks; it
        // should just fall behind real time, same as a dropped deadline on
        // a live call would.
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        Pacer { interval }
    }

    /// Blocks until the next frame's send slot arrives. The first call
    /// returns immediately (tokio's `Interval` fires its first tick with no
    /// delay), matching "send the first frame as soon as it's ready."
    pub async fn wait_for_slot(&mut self) {
        self.interval.tick().await;
    }
}
