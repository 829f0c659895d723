// src/core/inspect.rs
//
// Point-in-time spectral inspection of a recording, used to debug why a
// detection did or did not fire at a given moment.

use serde::Serialize;

use super::dsp::stats::{amplitude_to_db, power_to_db, rms};
use super::dsp::FftProcessor;

/// Samples analyzed at each time point
pub const INSPECT_WINDOW: usize = 2048;

/// Peaks below this fraction of the strongest bin are ignored
const PEAK_THRESHOLD_FRACTION: f64 = 0.1;
const MAX_REPORTED_PEAKS: usize = 10;
/// Only the strongest few peaks are checked for tonality
const TONAL_CANDIDATE_PEAKS: usize = 5;
/// A tonal peak is at least this many times its neighbours two bins away
const TONAL_NEIGHBOUR_RATIO: f64 = 2.0;
const TONAL_RANGE: (f64, f64) = (2000.0, 4000.0);

/// Fixed analysis bands, low/high in Hz
pub const ENERGY_BANDS: &[(f64, f64, &str)] = &[
    (2800.0, 3200.0, "Typical smoke alarm range"),
    (2000.0, 4000.0, "Extended smoke alarm range"),
    (1000.0, 2000.0, "Low frequency range"),
    (4000.0, 8000.0, "High frequency range"),
    (100.0, 1000.0, "Very low frequency range"),
];

#[derive(Debug, Clone, Serialize)]
pub struct FrequencyPeak {
    pub frequency: f64,
    pub magnitude: f64,
    pub db: Option<f64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct BandEnergy {
    pub label: &'static str,
    pub low: f64,
    pub high: f64,
    pub energy_db: Option<f64>,
    pub peak_db: Option<f64>,
}

/// Spectral snapshot of one window
#[derive(Debug, Clone, Serialize)]
pub struct TimepointAnalysis {
    pub time: f64,
    /// Strongest local maxima, loudest first
    pub peaks: Vec<FrequencyPeak>,
    pub bands: Vec<BandEnergy>,
    /// Narrow peaks between 2 and 4 kHz
    pub tonal_candidates: Vec<FrequencyPeak>,
    pub rms_db: Option<f64>,
}

pub struct Inspector {
    fft: FftProcessor,
    sample_rate: u32,
}

impl Inspector {
    pub fn new(sample_rate: u32) -> Self {
        Self {
            fft: FftProcessor::new(INSPECT_WINDOW),
            sample_rate,
        }
    }

    /// Analyze the window starting at `time` seconds. `None` when the
    /// window would run past the end of the signal.
    pub fn analyze_at(&self, samples: &[f32], time: f64) -> Option<TimepointAnalysis> {
        if !time.is_finite() || time < 0.0 {
            return None;
        }
        let start = (time * self.sample_rate as f64) as usize;
        let end = start.checked_add(INSPECT_WINDOW)?;
        if end > samples.len() {
            return None;
        }
        let window = &samples[start..end];
        let magnitudes = self.fft.magnitude_spectrum(window).ok()?;

        let peaks = self.find_peaks(&magnitudes);
        let tonal_candidates = peaks
            .iter()
            .take(TONAL_CANDIDATE_PEAKS)
            .filter(|p| p.frequency >= TONAL_RANGE.0 && p.frequency <= TONAL_RANGE.1)
            .filter(|p| self.is_tonal(&magnitudes, p.frequency))
            .cloned()
            .collect();

        let bands = ENERGY_BANDS
            .iter()
            .filter_map(|&(low, high, label)| self.band_energy(&magnitudes, low, high, label))
            .collect();

        Some(TimepointAnalysis {
            time,
            peaks: peaks.into_iter().take(MAX_REPORTED_PEAKS).collect(),
            bands,
            tonal_candidates,
            rms_db: amplitude_to_db(rms(window) as f64),
        })
    }

    fn frequency(&self, bin: usize) -> f64 {
        self.fft.bin_frequency(bin, self.sample_rate)
    }

    fn find_peaks(&self, magnitudes: &[f64]) -> Vec<FrequencyPeak> {
        let max = magnitudes.iter().cloned().fold(0.0, f64::max);
        let threshold = PEAK_THRESHOLD_FRACTION * max;

        let mut peaks: Vec<FrequencyPeak> = magnitudes
            .windows(3)
            .enumerate()
            .filter(|(_, w)| w[1] > w[0] && w[1] > w[2] && w[1] > threshold)
            .map(|(i, w)| FrequencyPeak {
                frequency: self.frequency(i + 1),
                magnitude: w[1],
                db: amplitude_to_db(w[1]),
            })
            .collect();

        peaks.sort_by(|a, b| b.magnitude.total_cmp(&a.magnitude));
        peaks
    }

    fn is_tonal(&self, magnitudes: &[f64], frequency: f64) -> bool {
        let bin = (frequency * INSPECT_WINDOW as f64 / self.sample_rate as f64).round() as usize;
        let left = bin.checked_sub(2).map(|i| magnitudes[i]).unwrap_or(0.0);
        let right = magnitudes.get(bin + 2).copied().unwrap_or(0.0);
        magnitudes[bin] > TONAL_NEIGHBOUR_RATIO * (left + right) / 2.0
    }

    fn band_energy(
        &self,
        magnitudes: &[f64],
        low: f64,
        high: f64,
        label: &'static str,
    ) -> Option<BandEnergy> {
        let in_band: Vec<f64> = magnitudes
            .iter()
            .enumerate()
            .filter(|(bin, _)| {
                let f = self.frequency(*bin);
                f >= low && f <= high
            })
            .map(|(_, &m)| m)
            .collect();

        if in_band.is_empty() {
            return None;
        }

        let energy: f64 = in_band.iter().map(|m| m * m).sum();
        let peak = in_band.iter().cloned().fold(0.0, f64::max);

        Some(BandEnergy {
            label,
            low,
            high,
            energy_db: power_to_db(energy),
            peak_db: amplitude_to_db(peak),
        })
    }
}
