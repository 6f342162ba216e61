//! Picking the dominant frequencies out of a magnitude spectrum

use crate::f_engine::Spectrum;

/// Minimum separation used by the streaming serial tool
pub const SERIAL_MIN_BIN_DISTANCE: usize = 20;
pub const MIN_HEIGHT_FRACTION: f32 = 0.15;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Peak {
    pub bin: usize,
    /// Bin center in Hz
    pub frequency: f32,
    pub magnitude: f32,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PeakConfig {
    /// Peaks must reach this fraction of the loudest bin in the same spectrum
    pub min_height_fraction: f32,
    /// Peaks closer than this many bins compete, the louder one wins
    pub min_bin_distance: usize,
}

impl PeakConfig {
    /// Settings of the marker-delimited serial stream
    pub fn serial() -> Self {
        Self {
            min_height_fraction: MIN_HEIGHT_FRACTION,
            min_bin_distance: SERIAL_MIN_BIN_DISTANCE,
        }
    }

    /// Settings of the UDP stream, which applies no separation
    pub fn udp() -> Self {
        Self {
            min_height_fraction: MIN_HEIGHT_FRACTION,
            min_bin_distance: 1,
        }
    }
}

impl Default for PeakConfig {
    fn default() -> Self {
        Self::serial()
    }
}

/// Local maxima of `spectrum` that clear an adaptive threshold and are at least
/// `min_bin_distance` bins apart, in ascending bin order.
/// The first and last bins are never peaks.
pub fn extract_peaks(
    spectrum: &Spectrum,
    min_height_fraction: f32,
    min_bin_distance: usize,
) -> Vec<Peak> {
    let mags = &spectrum.magnitudes;
    if mags.len() < 3 {
        return Vec::new();
    }
    let threshold = min_height_fraction * spectrum.max_magnitude();
    let mut candidates: Vec<usize> = (1..mags.len() - 1)
        .filter(|&i| mags[i] > mags[i - 1] && mags[i] > mags[i + 1] && mags[i] >= threshold)
        .collect();

    if min_bin_distance > 1 && candidates.len() > 1 {
        // Loudest first, equal magnitudes go to the lower bin
        candidates.sort_by(|&a, &b| mags[b].total_cmp(&mags[a]).then(a.cmp(&b)));
        let mut kept: Vec<usize> = Vec::with_capacity(candidates.len());
        for i in candidates {
            if kept.iter().all(|&k| i.abs_diff(k) >= min_bin_distance) {
                kept.push(i);
            }
        }
        kept.sort_unstable();
        candidates = kept;
    }

    candidates
        .into_iter()
        .map(|bin| Peak {
            bin,
            frequency: spectrum.frequencies[bin],
            magnitude: mags[bin],
        })
        .collect()
}

/// Same as [`extract_peaks`] with the parameters bundled
pub fn extract_with(spectrum: &Spectrum, config: &PeakConfig) -> Vec<Peak> {
    extract_peaks(
        spectrum,
        config.min_height_fraction,
        config.min_bin_distance,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::f_engine::SpectralAnalyzer;
    use crate::{SAMPLES, SAMPLE_RATE};
    use std::f32::consts::PI;

    fn spectrum(magnitudes: &[f32]) -> Spectrum {
        Spectrum {
            frequencies: (0..magnitudes.len()).map(|i| i as f32 * 10.0).collect(),
            magnitudes: magnitudes.to_vec(),
            bin_width: 10.0,
        }
    }

    fn bins(peaks: &[Peak]) -> Vec<usize> {
        peaks.iter().map(|p| p.bin).collect()
    }

    #[test]
    fn test_silent_frame_has_no_peaks() {
        let mut analyzer = SpectralAnalyzer::new(8, SAMPLE_RATE).unwrap();
        let spectrum = analyzer.analyze(&[0.0; 8]).unwrap();
        assert!(spectrum.magnitudes.iter().all(|&m| m == 0.0));
        assert!(extract_peaks(&spectrum, 0.15, 1).is_empty());
    }

    #[test]
    fn test_pure_tone_gives_one_peak() {
        let mut analyzer = SpectralAnalyzer::new(SAMPLES, SAMPLE_RATE).unwrap();
        for f0 in [440.0f32, 1000.0, 1234.5, 3100.0] {
            let samples: Vec<f32> = (0..SAMPLES)
                .map(|i| (2.0 * PI * f0 * i as f32 / SAMPLE_RATE).sin())
                .collect();
            let spectrum = analyzer.analyze(&samples).unwrap();
            for config in [PeakConfig::serial(), PeakConfig::udp()] {
                let peaks = extract_with(&spectrum, &config);
                assert_eq!(peaks.len(), 1, "tone at {} Hz", f0);
                assert!((peaks[0].frequency - f0).abs() <= spectrum.bin_width);
            }
        }
    }

    #[test]
    fn test_threshold_only_removes_peaks() {
        let mags: Vec<f32> = (0..200)
            .map(|i| {
                let x = i as f32;
                (x * 0.9).sin().abs() * (1.0 + (x * 0.05).cos()) + if i == 120 { 5.0 } else { 0.0 }
            })
            .collect();
        let s = spectrum(&mags);
        let loose = extract_peaks(&s, 0.1, 1);
        let strict = extract_peaks(&s, 0.5, 1);
        assert!(strict.len() <= loose.len());
        assert!(strict.iter().all(|p| loose.contains(p)));
        assert!(bins(&strict).contains(&120));
    }

    #[test]
    fn test_close_peaks_keep_the_louder() {
        let mut mags = vec![0.0; 32];
        mags[10] = 6.0;
        mags[13] = 9.0;
        let s = spectrum(&mags);
        assert_eq!(bins(&extract_peaks(&s, 0.1, 5)), vec![13]);
        assert_eq!(bins(&extract_peaks(&s, 0.1, 3)), vec![10, 13]);
        assert_eq!(bins(&extract_peaks(&s, 0.1, 1)), vec![10, 13]);
    }

    #[test]
    fn test_equal_peaks_prefer_lower_bin() {
        let mut mags = vec![0.0; 32];
        mags[10] = 4.0;
        mags[12] = 4.0;
        let s = spectrum(&mags);
        assert_eq!(bins(&extract_peaks(&s, 0.1, 4)), vec![10]);
    }

    #[test]
    fn test_suppression_is_not_transitive() {
        let mut mags = vec![0.0; 40];
        mags[10] = 10.0;
        mags[14] = 9.0;
        mags[18] = 8.0;
        let peaks = extract_peaks(&spectrum(&mags), 0.1, 5);
        assert_eq!(bins(&peaks), vec![10, 18]);
        assert_eq!(peaks[1].frequency, 180.0);
        assert_eq!(peaks[1].magnitude, 8.0);
    }

    #[test]
    fn test_edges_and_plateaus_are_not_peaks() {
        let s = spectrum(&[9.0, 1.0, 3.0, 3.0, 1.0, 2.0, 1.0, 9.0]);
        // Bin 5 is the only strict local maximum, the ends are excluded
        assert_eq!(bins(&extract_peaks(&s, 0.0, 1)), vec![5]);
        // ...and it sits below half of the edge maximum
        assert!(extract_peaks(&s, 0.5, 1).is_empty());
    }

    #[test]
    fn test_tiny_spectra() {
        assert!(extract_peaks(&spectrum(&[]), 0.1, 1).is_empty());
        assert!(extract_peaks(&spectrum(&[1.0, 2.0]), 0.1, 1).is_empty());
    }
}
