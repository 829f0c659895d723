// src/core/sustained.rs
//
// Trailing-window statistics over classified chunks and the alarm
// decision predicate. The thresholds are empirically tuned; several of
// them overlap on purpose and are kept exactly as listed.

use super::detector::DetectorConfig;
use super::dsp::stats::{mean, std_dev};
use super::history::WindowHistory;

const EPSILON: f64 = 1e-10;

/// Windows required in the history before any analysis
const MIN_HISTORY_WINDOWS: usize = 5;
/// Windows required inside the trailing analysis span
const MIN_RECENT_WINDOWS: usize = 3;
/// Strong windows needed to compute spread statistics
const MIN_STRONG_FOR_STATISTICS: usize = 2;
/// Strong windows needed to confirm an alarm
const MIN_STRONG_WINDOWS: usize = 5;

/// Beeping alarms occupy the band only part of the time; constant
/// tones and music sit near 1.0.
const OCCUPATION_MIN: f64 = 0.20;
const OCCUPATION_MAX: f64 = 0.80;

const VARIATION_BROAD_MIN: f64 = 0.1;
const VARIATION_BROAD_MAX: f64 = 2.0;
const VARIATION_NARROW_MIN: f64 = 0.2;
const VARIATION_NARROW_MAX: f64 = 1.2;

/// Frequency spread of a wobbling or sweeping alarm tone, Hz
const SWEEP_FREQ_STD_MIN: f64 = 10.0;
const SWEEP_FREQ_STD_MAX: f64 = 100.0;
/// A perfectly stable tone is only accepted when it is very loud
const STABLE_FREQ_STD_MAX: f64 = 10.0;
const STABLE_MIN_SIGNAL_RATIO: f64 = 500.0;

const CONFIDENCE_SCALE: f64 = 2.0;

/// Statistics over the trailing analysis window
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SustainedAnalysis {
    pub recent_count: usize,
    pub strong_count: usize,
    pub frequency_occupation: f64,
    pub avg_frequency: f64,
    pub frequency_std: f64,
    pub avg_signal_ratio: f64,
    pub signal_ratio_std: f64,
    pub signal_strength_variation: f64,
    pub alarm_detected: bool,
}

impl SustainedAnalysis {
    /// Analyze the history as seen at `current_time`.
    ///
    /// Returns `None` while there is not enough data to compute the
    /// statistics (too few windows overall, in the trailing span, or
    /// strong).
    pub fn compute(
        history: &WindowHistory,
        current_time: f64,
        config: &DetectorConfig,
    ) -> Option<Self> {
        if history.len() < MIN_HISTORY_WINDOWS {
            return None;
        }

        let mut recent_count = 0usize;
        let mut frequencies = Vec::new();
        let mut ratios = Vec::new();
        for window in history.recent(current_time, config.alarm_sustain_threshold) {
            recent_count += 1;
            if window.is_strong_signal {
                frequencies.push(window.frequency);
                ratios.push(window.signal_ratio);
            }
        }

        if recent_count < MIN_RECENT_WINDOWS {
            return None;
        }

        let strong_count = frequencies.len();
        let frequency_occupation = strong_count as f64 / recent_count as f64;
        if strong_count < MIN_STRONG_FOR_STATISTICS {
            return None;
        }

        let avg_signal_ratio = mean(&ratios);
        let signal_ratio_std = std_dev(&ratios);

        let mut analysis = Self {
            recent_count,
            strong_count,
            frequency_occupation,
            avg_frequency: mean(&frequencies),
            frequency_std: std_dev(&frequencies),
            avg_signal_ratio,
            signal_ratio_std,
            signal_strength_variation: signal_ratio_std / (avg_signal_ratio + EPSILON),
            alarm_detected: false,
        };
        analysis.alarm_detected = analysis.meets_alarm_criteria(config);
        Some(analysis)
    }

    /// Decision predicate; every clause must hold.
    pub fn meets_alarm_criteria(&self, config: &DetectorConfig) -> bool {
        let occupation = self.frequency_occupation;
        let variation = self.signal_strength_variation;

        let occupation_ok = occupation >= config.frequency_occupation_threshold
            && (OCCUPATION_MIN..=OCCUPATION_MAX).contains(&occupation);

        let strength_ok = self.avg_signal_ratio > config.min_signal_ratio;

        let variation_ok = (VARIATION_BROAD_MIN..=VARIATION_BROAD_MAX).contains(&variation)
            && variation > VARIATION_NARROW_MIN
            && variation < VARIATION_NARROW_MAX;

        let sweeping = self.frequency_std > SWEEP_FREQ_STD_MIN
            && self.frequency_std < SWEEP_FREQ_STD_MAX;
        let stable_and_loud = self.frequency_std <= STABLE_FREQ_STD_MAX
            && self.avg_signal_ratio > STABLE_MIN_SIGNAL_RATIO;

        let in_band = self.avg_frequency >= config.band_low()
            && self.avg_frequency <= config.band_high();

        occupation_ok
            && strength_ok
            && variation_ok
            && (sweeping || stable_and_loud)
            && in_band
            && self.strong_count >= MIN_STRONG_WINDOWS
    }

    pub fn confidence(&self) -> f64 {
        (self.frequency_occupation * CONFIDENCE_SCALE).min(1.0)
    }
}
