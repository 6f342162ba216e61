//! This module is responsible for handing analyzed frames to whatever displays them.
//! Rendering itself lives outside this crate, a [`Sink`] only has to accept one
//! [`Update`] per frame and keep whatever redraw state it needs to itself.

use crossbeam_channel::{bounded, Receiver, Sender};
use tracing::{debug, info, trace};

use crate::{f_engine::Spectrum, peaks::Peak, Error, Result};

/// Upper edge of the frequency axis the reference display shows
pub const DISPLAY_MAX_HZ: f32 = 2000.0;
/// Width of the time-domain window the reference display shows
pub const DISPLAY_WINDOW_MS: f32 = 20.0;

/// Everything the display needs for one frame
#[derive(Clone, Debug, PartialEq)]
pub struct Update {
    /// Position of this frame in acquisition order, starting at zero
    pub index: u64,
    pub samples: Vec<f32>,
    pub spectrum: Spectrum,
    pub peaks: Vec<Peak>,
}

pub trait Sink {
    /// Called once per frame, in acquisition order. The pipeline does not
    /// acquire the next frame until this returns.
    fn render(&mut self, update: Update) -> Result<()>;
}

/// Text annotation for a peak, whole hertz
pub fn peak_label(peak: &Peak) -> String {
    format!("{:.0}Hz", peak.frequency)
}

/// Sample times in milliseconds, evenly spread from zero to `n / sample_rate` inclusive
pub fn time_axis_ms(n: usize, sample_rate: f32) -> Vec<f32> {
    if n < 2 {
        return vec![0.0; n];
    }
    let span_ms = n as f32 / sample_rate * 1000.0;
    (0..n)
        .map(|i| span_ms * i as f32 / (n - 1) as f32)
        .collect()
}

/// Logs the peak annotations, re-announcing them only when they change
#[derive(Debug)]
pub struct LogSink {
    sample_rate: f32,
    max_hz: f32,
    labels: Vec<String>,
}

impl LogSink {
    pub fn new(sample_rate: f32) -> Self {
        Self {
            sample_rate,
            max_hz: DISPLAY_MAX_HZ,
            labels: Vec::new(),
        }
    }

    pub fn with_max_hz(mut self, max_hz: f32) -> Self {
        self.max_hz = max_hz;
        self
    }

    /// Annotations currently on display
    pub fn labels(&self) -> &[String] {
        &self.labels
    }
}

impl Sink for LogSink {
    fn render(&mut self, update: Update) -> Result<()> {
        let labels: Vec<String> = update
            .peaks
            .iter()
            .filter(|p| p.frequency <= self.max_hz)
            .map(peak_label)
            .collect();

        let visible = time_axis_ms(update.samples.len(), self.sample_rate)
            .iter()
            .take_while(|&&t| t <= DISPLAY_WINDOW_MS)
            .count();
        let (lo, hi) = update.samples[..visible]
            .iter()
            .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), &s| {
                (lo.min(s), hi.max(s))
            });
        debug!(
            frame = update.index,
            min = lo,
            max = hi,
            peaks = update.peaks.len(),
            "Frame"
        );

        // Old annotations go away wholesale, the new set replaces them
        if labels != self.labels {
            info!(frame = update.index, "Peaks: {}", labels.join(" "));
            self.labels = labels;
        } else {
            trace!(frame = update.index, "Peaks unchanged");
        }
        Ok(())
    }
}

/// Hands updates to another thread. The default capacity of zero makes every
/// hand-off a rendezvous, so the pipeline never runs ahead of the display.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    sender: Sender<Update>,
}

impl ChannelSink {
    pub fn new() -> (Self, Receiver<Update>) {
        Self::with_capacity(0)
    }

    pub fn with_capacity(capacity: usize) -> (Self, Receiver<Update>) {
        let (sender, receiver) = bounded(capacity);
        (Self { sender }, receiver)
    }
}

impl Sink for ChannelSink {
    fn render(&mut self, update: Update) -> Result<()> {
        self.sender.send(update).map_err(|_| Error::SinkClosed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    fn update(index: u64, peaks: &[f32]) -> Update {
        Update {
            index,
            samples: vec![0.5; 400],
            spectrum: Spectrum {
                frequencies: vec![0.0, 5.0, 10.0],
                magnitudes: vec![0.0, 1.0, 0.0],
                bin_width: 5.0,
            },
            peaks: peaks
                .iter()
                .map(|&frequency| Peak {
                    bin: 1,
                    frequency,
                    magnitude: 1.0,
                })
                .collect(),
        }
    }

    #[test]
    fn test_labels() {
        let peak = Peak {
            bin: 3,
            frequency: 1499.6,
            magnitude: 2.0,
        };
        assert_eq!(peak_label(&peak), "1500Hz");
    }

    #[test]
    fn test_time_axis_spans_frame() {
        let axis = time_axis_ms(4096, 8000.0);
        assert_eq!(axis[0], 0.0);
        assert!((axis[4095] - 512.0).abs() < 1e-3);
        assert!(time_axis_ms(1, 8000.0) == vec![0.0]);
    }

    #[test]
    fn test_log_sink_replaces_labels() {
        let mut sink = LogSink::new(8000.0);
        sink.render(update(0, &[440.0, 880.0, 2500.0])).unwrap();
        assert_eq!(sink.labels(), ["440Hz", "880Hz"]);
        sink.render(update(1, &[1000.0])).unwrap();
        assert_eq!(sink.labels(), ["1000Hz"]);
        sink.render(update(2, &[])).unwrap();
        assert!(sink.labels().is_empty());

        let mut wide = LogSink::new(8000.0).with_max_hz(4000.0);
        wide.render(update(0, &[2500.0])).unwrap();
        assert_eq!(wide.labels(), ["2500Hz"]);
    }

    #[test]
    fn test_channel_sink_rendezvous() {
        let (mut sink, receiver) = ChannelSink::new();
        let display = thread::spawn(move || receiver.iter().map(|u| u.index).collect::<Vec<_>>());
        for i in 0..3 {
            sink.render(update(i, &[100.0])).unwrap();
        }
        drop(sink);
        assert_eq!(display.join().unwrap(), vec![0, 1, 2]);
    }

    #[test]
    fn test_channel_sink_hung_up() {
        let (mut sink, receiver) = ChannelSink::with_capacity(1);
        drop(receiver);
        assert!(matches!(sink.render(update(0, &[])), Err(Error::SinkClosed)));
    }
}
