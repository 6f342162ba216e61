use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

pub mod capture;
pub mod decode;
pub mod error;
pub mod exfil;
pub mod f_engine;
pub mod monitoring;
pub mod peaks;
pub mod pipeline;
pub mod transport;

pub use error::{Error, Result};

/// Samples per frame
pub const SAMPLES: usize = 4096;
/// Bytes per sample on the wire (both `<f4` and `<i4`)
pub const WORD_SIZE: usize = 4;
/// Bytes in one frame payload
pub const FRAME_BYTES: usize = SAMPLES * WORD_SIZE;
/// Out-of-band byte announcing a frame on the streaming serial protocol
pub const HEADER_MARKER: u8 = 0x02;
/// Sample rate of the reference sensor in Hz
pub const SAMPLE_RATE: f32 = 8000.0;
pub const UDP_PORT: u16 = 5005;
pub const UDP_RECV_BUFFER: usize = 65536;
/// Per-call UDP read buffer, large enough that no datagram gets truncated
pub const DATAGRAM_SIZE: usize = 65536;

/// Cancellation flag shared between the ctrl-c handler and the synchronizers
#[derive(Clone, Debug, Default)]
pub struct Stop(Arc<AtomicBool>);

impl Stop {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn trigger(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_set(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Analysis parameters applied to every frame
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PipelineConfig {
    pub samples: usize,
    pub sample_rate: f32,
    pub peaks: peaks::PeakConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            samples: SAMPLES,
            sample_rate: SAMPLE_RATE,
            peaks: peaks::PeakConfig::default(),
        }
    }
}

impl PipelineConfig {
    /// Payload size in bytes for one frame under this configuration
    pub fn frame_bytes(&self) -> usize {
        self.samples * WORD_SIZE
    }
}
