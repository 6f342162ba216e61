//! Error type shared by every stage of the pipeline

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("failed to open serial port {path}")]
    SerialOpen {
        path: String,
        #[source]
        source: serialport::Error,
    },
    #[error("failed to bind UDP port {port}")]
    UdpBind {
        port: u16,
        #[source]
        source: std::io::Error,
    },
    /// The device stopped sending before a counted acquisition completed
    #[error("expected {expected} bytes from the device, received {received}")]
    InsufficientData { expected: usize, received: usize },
    #[error("frames must hold at least one sample")]
    EmptyFrame,
    #[error("frame holds {got} samples, analyzer expects {expected}")]
    FrameLength { expected: usize, got: usize },
    #[error("transport I/O failed")]
    Io(#[from] std::io::Error),
    #[error("FFT failed")]
    Fft(#[from] realfft::FftError),
    #[error("visualization sink hung up")]
    SinkClosed,
}

pub type Result<T> = std::result::Result<T, Error>;
