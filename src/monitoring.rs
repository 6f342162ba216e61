//! Runtime counters for the frame synchronizers.
//! None of these are errors, they only tell the operator how noisy the link is.

use tracing::{debug, info};

/// How often (in emitted frames) the counters get logged
pub const REPORT_INTERVAL: u64 = 100;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CaptureStats {
    /// Frames handed to the decoder
    pub frames: u64,
    /// Bytes thrown away while hunting for the header marker
    pub noise_bytes: u64,
    /// Candidate frames dropped because the payload read came up short
    pub short_reads: u64,
    /// Datagram bytes past a frame boundary that were dropped
    pub surplus_bytes: u64,
}

impl CaptureStats {
    pub(crate) fn record_frame(&mut self) {
        self.frames += 1;
        if self.frames % REPORT_INTERVAL == 0 {
            debug!(
                frames = self.frames,
                noise_bytes = self.noise_bytes,
                short_reads = self.short_reads,
                surplus_bytes = self.surplus_bytes,
                "Capture stats"
            );
        }
    }

    /// One line summary for shutdown
    pub fn report(&self) {
        info!(
            frames = self.frames,
            noise_bytes = self.noise_bytes,
            short_reads = self.short_reads,
            surplus_bytes = self.surplus_bytes,
            "Capture finished"
        );
    }
}
