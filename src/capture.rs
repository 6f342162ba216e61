//! This module contains all the frame synchronization logic

// The synchronizers do one thing: turn an unstructured byte or datagram
// stream into whole frames. A frame only ever leaves this module once every
// one of its bytes has arrived, partial frames are dropped right here.

use std::io::{ErrorKind, Read};

use tracing::{debug, trace};

use crate::{
    decode::{decode_le, decode_word},
    monitoring::CaptureStats,
    transport::{is_timeout, read_up_to, CommandPort, DatagramSource},
    Error, Result, Stop, DATAGRAM_SIZE, HEADER_MARKER, WORD_SIZE,
};

/// The raw payload of one frame, `samples * 4` bytes of little-endian `f32`
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Frame {
    bytes: Vec<u8>,
}

impl Frame {
    fn new(bytes: Vec<u8>) -> Self {
        debug_assert_eq!(bytes.len() % WORD_SIZE, 0);
        Self { bytes }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Decode the payload into time-domain samples
    pub fn samples(&self) -> Vec<f32> {
        decode_le(&self.bytes)
    }
}

/// Anything that produces a stream of whole frames
pub trait FrameSource {
    /// Block until the next frame is assembled. `None` means the capture was
    /// stopped or the underlying stream ended.
    fn next_frame(&mut self) -> Result<Option<Frame>>;

    fn stats(&self) -> CaptureStats;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SyncState {
    SearchingHeader,
    CollectingPayload,
}

/// Frames on a serial link, each announced by a single marker byte
pub struct MarkerSync<R> {
    reader: R,
    marker: u8,
    frame_bytes: usize,
    state: SyncState,
    stop: Stop,
    stats: CaptureStats,
}

impl<R: Read> MarkerSync<R> {
    pub fn new(reader: R, frame_bytes: usize, stop: Stop) -> Self {
        Self {
            reader,
            marker: HEADER_MARKER,
            frame_bytes,
            state: SyncState::SearchingHeader,
            stop,
            stats: CaptureStats::default(),
        }
    }

    pub fn with_marker(mut self, marker: u8) -> Self {
        self.marker = marker;
        self
    }

    pub fn state(&self) -> SyncState {
        self.state
    }
}

impl<R: Read> FrameSource for MarkerSync<R> {
    fn next_frame(&mut self) -> Result<Option<Frame>> {
        let mut byte = [0u8; 1];
        loop {
            if self.stop.is_set() {
                return Ok(None);
            }
            match self.state {
                SyncState::SearchingHeader => match self.reader.read(&mut byte) {
                    Ok(0) => {
                        debug!("Serial stream ended");
                        return Ok(None);
                    }
                    Ok(_) if byte[0] == self.marker => self.state = SyncState::CollectingPayload,
                    Ok(_) => self.stats.noise_bytes += 1,
                    Err(e) if e.kind() == ErrorKind::Interrupted || is_timeout(&e) => continue,
                    Err(e) => return Err(e.into()),
                },
                SyncState::CollectingPayload => {
                    let mut payload = vec![0u8; self.frame_bytes];
                    let received = read_up_to(&mut self.reader, &mut payload)?;
                    // Whatever happened, the next byte we care about is a marker
                    self.state = SyncState::SearchingHeader;
                    if received == self.frame_bytes {
                        self.stats.record_frame();
                        return Ok(Some(Frame::new(payload)));
                    }
                    self.stats.short_reads += 1;
                    debug!(
                        expected = self.frame_bytes,
                        received, "Short read, dropping candidate frame"
                    );
                }
            }
        }
    }

    fn stats(&self) -> CaptureStats {
        self.stats
    }
}

/// Frames split across UDP datagrams with no framing of their own
pub struct DatagramAssembler<S> {
    source: S,
    frame_bytes: usize,
    datagram: Vec<u8>,
    stop: Stop,
    stats: CaptureStats,
}

impl<S: DatagramSource> DatagramAssembler<S> {
    pub fn new(source: S, frame_bytes: usize, stop: Stop) -> Self {
        Self {
            source,
            frame_bytes,
            datagram: vec![0u8; DATAGRAM_SIZE],
            stop,
            stats: CaptureStats::default(),
        }
    }
}

impl<S: DatagramSource> FrameSource for DatagramAssembler<S> {
    fn next_frame(&mut self) -> Result<Option<Frame>> {
        // Every frame starts from an empty accumulator
        let mut acc = Vec::with_capacity(self.frame_bytes + self.datagram.len());
        // At least one datagram per frame, so the stop flag is always polled
        while acc.is_empty() || acc.len() < self.frame_bytes {
            if self.stop.is_set() {
                return Ok(None);
            }
            match self.source.receive(&mut self.datagram) {
                Ok(n) => acc.extend_from_slice(&self.datagram[..n]),
                Err(e) if e.kind() == ErrorKind::Interrupted || is_timeout(&e) => continue,
                Err(e) => return Err(e.into()),
            }
        }
        // No sequence numbers on the wire, so whatever overhangs the boundary is lost
        let surplus = acc.len() - self.frame_bytes;
        if surplus > 0 {
            self.stats.surplus_bytes += surplus as u64;
            trace!(surplus, "Dropping bytes past the frame boundary");
        }
        acc.truncate(self.frame_bytes);
        self.stats.record_frame();
        Ok(Some(Frame::new(acc)))
    }

    fn stats(&self) -> CaptureStats {
        self.stats
    }
}

/// Result of one counted acquisition
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CountedCapture {
    pub samples: Vec<i32>,
    /// Trailing word the device appends, acquisition time in device units
    pub elapsed: i32,
}

impl CountedCapture {
    /// Drop the first sample, the device always leads with a stale conversion
    pub fn trimmed(mut self) -> Self {
        if !self.samples.is_empty() {
            self.samples.remove(0);
        }
        self
    }

    /// Sample index times `step`
    pub fn time_axis(&self, step: f32) -> Vec<f32> {
        (0..self.samples.len()).map(|i| i as f32 * step).collect()
    }
}

/// Ask the device for `count` samples and read them back, one word at a time.
/// Every read is bounded by the port's timeout, a silent device is an
/// [`Error::InsufficientData`] rather than a hang.
pub fn acquire_counted<P: CommandPort + ?Sized>(
    port: &mut P,
    count: usize,
) -> Result<CountedCapture> {
    port.discard_input()?;
    port.write_all(count.to_string().as_bytes())?;
    port.flush()?;
    debug!(count, "Requested counted acquisition");

    let expected = (count + 1) * WORD_SIZE;
    let mut received = 0;
    let mut next_word = |port: &mut P| -> Result<i32> {
        let mut word = [0u8; WORD_SIZE];
        let n = read_up_to(port, &mut word)?;
        received += n;
        if n < WORD_SIZE {
            return Err(Error::InsufficientData { expected, received });
        }
        Ok(decode_word(word))
    };

    let mut samples = Vec::with_capacity(count);
    for _ in 0..count {
        samples.push(next_word(port)?);
    }
    let elapsed = next_word(port)?;
    Ok(CountedCapture { samples, elapsed })
}
