use std::sync::Arc;

use realfft::{num_complex::Complex, RealFftPlanner, RealToComplex};

use crate::{Error, Result};

// For each frame of N real samples we
// * multiply with a Hann window
// * real-input FFT (only the N/2 + 1 non-negative bins)
// * take the magnitude
//
// The FFT plan, window and scratch space are built once and reused for every frame.

/// Magnitude spectrum of one frame
#[derive(Clone, Debug, PartialEq)]
pub struct Spectrum {
    /// Bin centers in Hz
    pub frequencies: Vec<f32>,
    pub magnitudes: Vec<f32>,
    /// Spacing between bins in Hz
    pub bin_width: f32,
}

impl Spectrum {
    pub fn len(&self) -> usize {
        self.magnitudes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.magnitudes.is_empty()
    }

    pub fn max_magnitude(&self) -> f32 {
        self.magnitudes.iter().copied().fold(0f32, f32::max)
    }
}

/// Symmetric raised-cosine window
pub fn hann_window(size: usize) -> Vec<f32> {
    if size < 2 {
        return vec![1.0; size];
    }
    (0..size)
        .map(|i| 0.5 * (1.0 - (2.0 * std::f32::consts::PI * i as f32 / (size - 1) as f32).cos()))
        .collect()
}

/// Bin centers for an `n` point real FFT, empty for `n == 0`
pub fn bin_frequencies(n: usize, sample_rate: f32) -> Vec<f32> {
    if n == 0 {
        return Vec::new();
    }
    (0..=n / 2)
        .map(|k| k as f32 * sample_rate / n as f32)
        .collect()
}

pub struct SpectralAnalyzer {
    fft: Arc<dyn RealToComplex<f32>>,
    window: Vec<f32>,
    sample_rate: f32,
    frequencies: Vec<f32>,
    input: Vec<f32>,
    output: Vec<Complex<f32>>,
    scratch: Vec<Complex<f32>>,
}

impl SpectralAnalyzer {
    /// Plan an analyzer for frames of `len` samples, which must not be zero
    pub fn new(len: usize, sample_rate: f32) -> Result<Self> {
        if len == 0 {
            return Err(Error::EmptyFrame);
        }
        let mut planner = RealFftPlanner::<f32>::new();
        let fft = planner.plan_fft_forward(len);
        let output = fft.make_output_vec();
        let scratch = fft.make_scratch_vec();
        Ok(Self {
            window: hann_window(len),
            sample_rate,
            frequencies: bin_frequencies(len, sample_rate),
            input: vec![0f32; len],
            output,
            scratch,
            fft,
        })
    }

    pub fn len(&self) -> usize {
        self.window.len()
    }

    pub fn is_empty(&self) -> bool {
        self.window.is_empty()
    }

    /// Windowed magnitude spectrum of `samples`, which must be exactly `len()` long
    pub fn analyze(&mut self, samples: &[f32]) -> Result<Spectrum> {
        if samples.len() != self.window.len() {
            return Err(Error::FrameLength {
                expected: self.window.len(),
                got: samples.len(),
            });
        }
        for ((x, s), w) in self.input.iter_mut().zip(samples).zip(&self.window) {
            *x = s * w;
        }
        // The FFT uses `input` as scratch too, it is rewritten on every call anyway
        self.fft
            .process_with_scratch(&mut self.input, &mut self.output, &mut self.scratch)?;
        Ok(Spectrum {
            frequencies: self.frequencies.clone(),
            magnitudes: self.output.iter().map(|c| c.norm()).collect(),
            bin_width: self.sample_rate / self.window.len() as f32,
        })
    }
}
