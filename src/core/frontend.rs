// src/core/frontend.rs
//
// Spectral frontend: one fixed-length chunk in, target-band peak and
// background estimate out. Holds no state that depends on previous chunks.

use super::detector::DetectorConfig;
use super::dsp::stats::mean;
use super::dsp::FftProcessor;
use super::error::{DetectorError, DetectorResult};

/// Fallback scale applied to the global mean when every bin is in-band
const ALL_BINS_IN_BAND_BACKGROUND_SCALE: f64 = 0.1;

/// Strongest bin inside the target band
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpectralPeak {
    pub frequency: f64,
    pub magnitude: f64,
}

/// Per-chunk spectral summary consumed by the detector
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpectralResult {
    /// `None` when no bin falls inside the target band
    pub peak: Option<SpectralPeak>,
    /// Mean magnitude of the out-of-band bins
    pub current_background: f64,
    /// Mean magnitude over every bin
    pub mean_magnitude: f64,
}

impl SpectralResult {
    pub fn peak_magnitude(&self) -> f64 {
        self.peak.map(|p| p.magnitude).unwrap_or(0.0)
    }

    pub fn peak_frequency(&self) -> f64 {
        self.peak.map(|p| p.frequency).unwrap_or(0.0)
    }
}

pub struct SpectralFrontend {
    fft: FftProcessor,
    sample_rate: u32,
    band_low: f64,
    band_high: f64,
}

impl SpectralFrontend {
    pub fn new(config: &DetectorConfig) -> Self {
        Self {
            fft: FftProcessor::new(config.chunk_size),
            sample_rate: config.sample_rate,
            band_low: config.band_low(),
            band_high: config.band_high(),
        }
    }

    /// Analyze one chunk. The chunk must be exactly `chunk_size` samples.
    pub fn analyze(&self, chunk: &[f32]) -> DetectorResult<SpectralResult> {
        if chunk.len() != self.fft.fft_size() {
            return Err(DetectorError::ChunkLength {
                expected: self.fft.fft_size(),
                actual: chunk.len(),
            });
        }

        let magnitudes = self.fft.magnitude_spectrum(chunk)?;

        let mut peak: Option<SpectralPeak> = None;
        let mut background_sum = 0.0;
        let mut background_bins = 0usize;

        for (bin, &magnitude) in magnitudes.iter().enumerate() {
            let frequency = self.fft.bin_frequency(bin, self.sample_rate);
            if self.in_band(frequency) {
                // First maximum wins on ties
                if peak.map_or(true, |p| magnitude > p.magnitude) {
                    peak = Some(SpectralPeak { frequency, magnitude });
                }
            } else {
                background_sum += magnitude;
                background_bins += 1;
            }
        }

        let mean_magnitude = mean(&magnitudes);
        let current_background = if background_bins > 0 {
            background_sum / background_bins as f64
        } else {
            mean_magnitude * ALL_BINS_IN_BAND_BACKGROUND_SCALE
        };

        Ok(SpectralResult {
            peak,
            current_background,
            mean_magnitude,
        })
    }

    /// Full magnitude spectrum of a chunk, for diagnostics
    pub fn magnitudes(&self, chunk: &[f32]) -> DetectorResult<Vec<f64>> {
        Ok(self.fft.magnitude_spectrum(chunk)?)
    }

    fn in_band(&self, frequency: f64) -> bool {
        frequency >= self.band_low && frequency <= self.band_high
    }

    /// Frequency spacing between adjacent bins in Hz
    pub fn resolution(&self) -> f64 {
        self.sample_rate as f64 / self.fft.fft_size() as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    fn tone(freq: f64, amplitude: f64, len: usize, sample_rate: u32) -> Vec<f32> {
        (0..len)
            .map(|i| (amplitude * (2.0 * PI * freq * i as f64 / sample_rate as f64).sin()) as f32)
            .collect()
    }

    fn noisy_tone(len: usize) -> Vec<f32> {
        // Deterministic pseudo-noise plus an in-band tone
        let base = tone(3200.0, 0.3, len, 44100);
        base.iter()
            .enumerate()
            .map(|(i, s)| s + 0.01 * ((i as f32 * 12.9898).sin() * 43758.547).fract())
            .collect()
    }

    #[test]
    fn test_peak_inside_band() {
        let config = DetectorConfig::default();
        let frontend = SpectralFrontend::new(&config);
        let result = frontend.analyze(&tone(3200.0, 0.5, 4096, 44100)).unwrap();

        let peak = result.peak.expect("band has bins");
        assert!((peak.frequency - 3200.0).abs() <= frontend.resolution());
        assert!(peak.magnitude > 400.0);
        assert!(result.current_background < peak.magnitude / 100.0);
    }

    #[test]
    fn test_out_of_band_tone_is_background() {
        let config = DetectorConfig::default();
        let frontend = SpectralFrontend::new(&config);
        let result = frontend.analyze(&tone(1000.0, 0.5, 4096, 44100)).unwrap();

        assert!(result.peak_magnitude() < 1.0);
        assert!(result.current_background > 0.0);
    }

    #[test]
    fn test_identical_chunks_are_bit_identical() {
        let config = DetectorConfig::default();
        let frontend = SpectralFrontend::new(&config);
        let chunk = noisy_tone(4096);

        let first = frontend.analyze(&chunk).unwrap();
        let second = frontend.analyze(&chunk).unwrap();

        assert_eq!(first.peak_magnitude().to_bits(), second.peak_magnitude().to_bits());
        assert_eq!(first.peak_frequency().to_bits(), second.peak_frequency().to_bits());
        assert_eq!(
            first.current_background.to_bits(),
            second.current_background.to_bits()
        );
    }

    #[test]
    fn test_empty_band_returns_sentinel() {
        // 2 Hz wide band sits between bins spaced ~10.8 Hz apart
        let config = DetectorConfig {
            target_frequency: 3205.0,
            frequency_tolerance: 1.0,
            ..DetectorConfig::default()
        };
        let frontend = SpectralFrontend::new(&config);
        let result = frontend.analyze(&tone(3200.0, 0.5, 4096, 44100)).unwrap();

        assert!(result.peak.is_none());
        assert_eq!(result.peak_frequency(), 0.0);
        assert_eq!(result.peak_magnitude(), 0.0);
    }

    #[test]
    fn test_background_fallback_when_band_covers_everything() {
        let config = DetectorConfig {
            sample_rate: 8000,
            chunk_size: 64,
            target_frequency: 2000.0,
            frequency_tolerance: 5000.0,
            ..DetectorConfig::default()
        };
        let frontend = SpectralFrontend::new(&config);
        let result = frontend.analyze(&tone(1000.0, 0.5, 64, 8000)).unwrap();

        assert!(result.peak.is_some());
        assert!((result.current_background - 0.1 * result.mean_magnitude).abs() < 1e-12);
    }

    #[test]
    fn test_silence_is_all_zero() {
        let frontend = SpectralFrontend::new(&DetectorConfig::default());
        let result = frontend.analyze(&vec![0.0; 4096]).unwrap();
        assert_eq!(result.peak_magnitude(), 0.0);
        assert_eq!(result.current_background, 0.0);
        assert_eq!(result.mean_magnitude, 0.0);
    }

    #[test]
    fn test_wrong_length_rejected() {
        let frontend = SpectralFrontend::new(&DetectorConfig::default());
        let err = frontend.analyze(&vec![0.0; 100]).unwrap_err();
        assert!(matches!(
            err,
            DetectorError::ChunkLength {
                expected: 4096,
                actual: 100
            }
        ));
    }
}
