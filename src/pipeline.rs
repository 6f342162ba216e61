//! The acquire → decode → analyze → extract → hand off loop

use tracing::{info, warn};

use crate::{
    capture::{Frame, FrameSource},
    exfil::{Sink, Update},
    f_engine::SpectralAnalyzer,
    peaks::{extract_with, PeakConfig},
    PipelineConfig, Result,
};

/// Per-frame processing, everything after the synchronizer and before the sink
pub struct Pipeline {
    analyzer: SpectralAnalyzer,
    peaks: PeakConfig,
    processed: u64,
}

impl Pipeline {
    pub fn new(config: &PipelineConfig) -> Result<Self> {
        Ok(Self {
            analyzer: SpectralAnalyzer::new(config.samples, config.sample_rate)?,
            peaks: config.peaks,
            processed: 0,
        })
    }

    pub fn process(&mut self, frame: &Frame) -> Result<Update> {
        let samples = frame.samples();
        let spectrum = self.analyzer.analyze(&samples)?;
        let peaks = extract_with(&spectrum, &self.peaks);
        let update = Update {
            index: self.processed,
            samples,
            spectrum,
            peaks,
        };
        self.processed += 1;
        Ok(update)
    }
}

/// Drive `source` until it runs dry or is stopped, handing every frame to `sink`.
/// A frame that fails analysis is skipped, transport and sink failures end the loop.
/// Returns how many frames reached the sink.
pub fn run<F, S>(source: &mut F, sink: &mut S, config: &PipelineConfig) -> Result<u64>
where
    F: FrameSource + ?Sized,
    S: Sink + ?Sized,
{
    let mut pipeline = Pipeline::new(config)?;
    let mut rendered = 0u64;
    info!(
        samples = config.samples,
        sample_rate = config.sample_rate,
        "Streaming started"
    );
    while let Some(frame) = source.next_frame()? {
        let update = match pipeline.process(&frame) {
            Ok(update) => update,
            Err(e) => {
                warn!("Skipping frame: {}", e);
                continue;
            }
        };
        sink.render(update)?;
        rendered += 1;
    }
    source.stats().report();
    Ok(rendered)
}
