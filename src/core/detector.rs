// src/core/detector.rs
//
// Adaptive smoke alarm detector: ambient learning, per-chunk
// classification, sustained-window analysis and the alarm latch.

use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use super::error::{DetectorError, DetectorResult};
use super::frontend::{SpectralFrontend, SpectralResult};
use super::history::WindowHistory;
use super::sustained::SustainedAnalysis;
use crate::detection::{DetectionEvent, DetectionType, DetectionWindow};

const EPSILON: f64 = 1e-10;
/// Peak must exceed the current out-of-band level by this factor
const CURRENT_BACKGROUND_RATIO: f64 = 8.0;
/// Peak must exceed the mean of all bins by this factor
const MEAN_MAGNITUDE_MULTIPLIER: f64 = 12.0;

/// Detector configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorConfig {
    /// Input sampling rate, Hz
    pub sample_rate: u32,
    /// FFT length in samples; one chunk per call
    pub chunk_size: usize,
    /// Centre of the alarm tone band, Hz
    pub target_frequency: f64,
    /// Half-width of the band, Hz
    pub frequency_tolerance: f64,
    /// Seconds at stream start used only to learn the background level
    pub ambient_learning_time: f64,
    /// Trailing window examined for a sustained pattern, seconds
    pub alarm_sustain_threshold: f64,
    /// Cooldown after a detection, seconds
    pub alarm_latch_time: f64,
    /// Minimum peak-to-ambient ratio for a strong chunk
    pub min_signal_ratio: f64,
    /// Minimum fraction of recent chunks that must be strong
    pub frequency_occupation_threshold: f64,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            sample_rate: 44100,
            chunk_size: 4096,
            target_frequency: 3200.0,
            frequency_tolerance: 400.0,
            ambient_learning_time: 10.0,
            alarm_sustain_threshold: 4.0,
            alarm_latch_time: 300.0,
            min_signal_ratio: 75.0,
            frequency_occupation_threshold: 0.25,
        }
    }
}

impl DetectorConfig {
    /// Reject non-positive or non-finite parameters.
    pub fn validate(&self) -> DetectorResult<()> {
        if self.sample_rate == 0 {
            return Err(invalid("sample_rate", "must be positive"));
        }
        if self.chunk_size == 0 {
            return Err(invalid("chunk_size", "must be positive"));
        }

        let positive = [
            ("target_frequency", self.target_frequency),
            ("frequency_tolerance", self.frequency_tolerance),
            ("ambient_learning_time", self.ambient_learning_time),
            ("alarm_sustain_threshold", self.alarm_sustain_threshold),
            ("alarm_latch_time", self.alarm_latch_time),
            ("min_signal_ratio", self.min_signal_ratio),
        ];
        for (field, value) in positive {
            if !value.is_finite() || value <= 0.0 {
                return Err(invalid(field, format!("must be a positive number, got {}", value)));
            }
        }

        let occupation = self.frequency_occupation_threshold;
        if !(occupation > 0.0 && occupation < 1.0) {
            return Err(invalid(
                "frequency_occupation_threshold",
                format!("must lie strictly between 0 and 1, got {}", occupation),
            ));
        }

        Ok(())
    }

    pub fn band_low(&self) -> f64 {
        self.target_frequency - self.frequency_tolerance
    }

    pub fn band_high(&self) -> f64 {
        self.target_frequency + self.frequency_tolerance
    }

    /// Duration of one chunk in seconds
    pub fn chunk_duration(&self) -> f64 {
        self.chunk_size as f64 / self.sample_rate as f64
    }
}

fn invalid(field: &'static str, reason: impl Into<String>) -> DetectorError {
    DetectorError::InvalidConfig {
        field,
        reason: reason.into(),
    }
}

/// Mutable detector state; advanced only by `process_audio_chunk`
#[derive(Debug, Clone, PartialEq)]
pub struct DetectorState {
    pub start_time: Option<f64>,
    pub ambient_background_level: f64,
    pub ambient_samples_count: u64,
    pub is_learning_ambient: bool,
    pub last_alarm_time: Option<f64>,
    pub is_alarm_latched: bool,
    /// Last accepted chunk timestamp
    pub last_timestamp: Option<f64>,
}

impl Default for DetectorState {
    fn default() -> Self {
        Self {
            start_time: None,
            ambient_background_level: 0.0,
            ambient_samples_count: 0,
            is_learning_ambient: true,
            last_alarm_time: None,
            is_alarm_latched: false,
            last_timestamp: None,
        }
    }
}

impl DetectorState {
    /// Fold one background estimate into the running mean
    fn record_ambient(&mut self, background: f64) {
        self.ambient_samples_count += 1;
        let n = self.ambient_samples_count as f64;
        self.ambient_background_level += (background - self.ambient_background_level) / n;
    }
}

/// Coarse lifecycle phase, derived from [`DetectorState`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetectorPhase {
    Learning,
    Active,
    Latched,
}

impl std::fmt::Display for DetectorPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DetectorPhase::Learning => write!(f, "learning"),
            DetectorPhase::Active => write!(f, "active"),
            DetectorPhase::Latched => write!(f, "latched"),
        }
    }
}

/// Streaming smoke alarm detector.
///
/// Feed fixed-size chunks in timestamp order through
/// [`SmokeAlarmDetector::process_audio_chunk`]. One instance per audio
/// stream; instances share nothing.
pub struct SmokeAlarmDetector {
    config: DetectorConfig,
    frontend: SpectralFrontend,
    state: DetectorState,
    history: WindowHistory,
}

impl SmokeAlarmDetector {
    pub fn new(config: DetectorConfig) -> DetectorResult<Self> {
        config.validate()?;
        Ok(Self {
            frontend: SpectralFrontend::new(&config),
            config,
            state: DetectorState::default(),
            history: WindowHistory::default(),
        })
    }

    /// Process one chunk and return a detection if this chunk completed
    /// a sustained alarm pattern.
    ///
    /// `timestamp` is in seconds and must not decrease between calls.
    /// Without one the wall clock is used; replayed files should always
    /// pass explicit timestamps. Rejected chunks leave the state untouched.
    pub fn process_audio_chunk(
        &mut self,
        samples: &[f32],
        timestamp: Option<f64>,
    ) -> DetectorResult<Option<DetectionEvent>> {
        if samples.len() != self.config.chunk_size {
            return Err(DetectorError::ChunkLength {
                expected: self.config.chunk_size,
                actual: samples.len(),
            });
        }
        if let Some(index) = samples.iter().position(|s| !s.is_finite()) {
            return Err(DetectorError::NonFiniteSample { index });
        }

        let current_time = timestamp.unwrap_or_else(wall_clock_seconds);
        if !current_time.is_finite() {
            return Err(DetectorError::InvalidTimestamp(current_time));
        }
        if let Some(previous) = self.state.last_timestamp {
            if current_time < previous {
                return Err(DetectorError::NonMonotonicTimestamp {
                    previous,
                    current: current_time,
                });
            }
        }

        if self.latch_active(current_time) {
            self.accept_time(current_time);
            return Ok(None);
        }

        let spectrum = self.frontend.analyze(samples)?;
        self.accept_time(current_time);

        if self.state.is_alarm_latched {
            self.state.is_alarm_latched = false;
            log::debug!("Alarm latch released at {:.2}s", current_time);
        }

        let start_time = self.state.start_time.unwrap_or(current_time);
        if current_time - start_time < self.config.ambient_learning_time {
            self.state.record_ambient(spectrum.current_background);
            log::trace!(
                "Learning ambient at {:.2}s: background {:.5}, level {:.5}",
                current_time,
                spectrum.current_background,
                self.state.ambient_background_level
            );
            return Ok(None);
        }

        if self.state.is_learning_ambient {
            self.state.is_learning_ambient = false;
            log::info!(
                "Ambient learning complete: level {:.5} from {} chunks",
                self.state.ambient_background_level,
                self.state.ambient_samples_count
            );
        }

        let window = self.classify(current_time, &spectrum);
        self.history.push(window);

        Ok(self.evaluate_alarm(current_time))
    }

    /// Like [`process_audio_chunk`](Self::process_audio_chunk), also
    /// handing any detection to `handler` before returning it.
    pub fn process_audio_stream<F>(
        &mut self,
        samples: &[f32],
        timestamp: Option<f64>,
        mut handler: F,
    ) -> DetectorResult<Option<DetectionEvent>>
    where
        F: FnMut(&DetectionEvent),
    {
        let detection = self.process_audio_chunk(samples, timestamp)?;
        if let Some(event) = &detection {
            handler(event);
        }
        Ok(detection)
    }

    /// Statistics over the trailing window as seen at `current_time`.
    /// Pure; does not touch the history or the latch.
    pub fn analyze_sustained(&self, current_time: f64) -> Option<SustainedAnalysis> {
        SustainedAnalysis::compute(&self.history, current_time, &self.config)
    }

    /// Return to the initial learning state
    pub fn reset(&mut self) {
        self.state = DetectorState::default();
        self.history.clear();
    }

    pub fn phase(&self) -> DetectorPhase {
        if self.state.is_learning_ambient {
            DetectorPhase::Learning
        } else if self.state.is_alarm_latched {
            DetectorPhase::Latched
        } else {
            DetectorPhase::Active
        }
    }

    pub fn config(&self) -> &DetectorConfig {
        &self.config
    }

    pub fn state(&self) -> &DetectorState {
        &self.state
    }

    pub fn history(&self) -> &WindowHistory {
        &self.history
    }

    pub fn frontend(&self) -> &SpectralFrontend {
        &self.frontend
    }

    fn latch_active(&self, current_time: f64) -> bool {
        self.state.is_alarm_latched
            && self
                .state
                .last_alarm_time
                .map_or(false, |last| current_time - last < self.config.alarm_latch_time)
    }

    fn accept_time(&mut self, current_time: f64) {
        self.state.last_timestamp = Some(current_time);
        if self.state.start_time.is_none() {
            self.state.start_time = Some(current_time);
        }
    }

    fn classify(&self, current_time: f64, spectrum: &SpectralResult) -> DetectionWindow {
        let peak_magnitude = spectrum.peak_magnitude();
        let signal_to_background =
            peak_magnitude / (self.state.ambient_background_level + EPSILON);
        let signal_to_current = peak_magnitude / (spectrum.current_background + EPSILON);

        let is_strong_signal = spectrum.peak.is_some()
            && signal_to_background > self.config.min_signal_ratio
            && signal_to_current > CURRENT_BACKGROUND_RATIO
            && peak_magnitude > MEAN_MAGNITUDE_MULTIPLIER * spectrum.mean_magnitude;

        log::trace!(
            "{:.2}s: peak {:.1} Hz mag {:.4}, ratio {:.1} (ambient) {:.1} (current), mean {:.5}",
            current_time,
            spectrum.peak_frequency(),
            peak_magnitude,
            signal_to_background,
            signal_to_current,
            spectrum.mean_magnitude
        );

        let window = DetectionWindow {
            timestamp: current_time,
            is_strong_signal,
            frequency: spectrum.peak_frequency(),
            signal_ratio: signal_to_background,
            magnitude: peak_magnitude,
        };

        if is_strong_signal {
            log::debug!(
                "Strong signal at {:.2}s: {:.1} Hz, ratio {:.1} ({} windows)",
                current_time,
                window.frequency,
                window.signal_ratio,
                self.history.len() + 1
            );
        }

        window
    }

    fn evaluate_alarm(&mut self, current_time: f64) -> Option<DetectionEvent> {
        let analysis = self.analyze_sustained(current_time)?;
        if !analysis.alarm_detected {
            return None;
        }

        self.state.last_alarm_time = Some(current_time);
        self.state.is_alarm_latched = true;

        log::info!(
            "Smoke alarm detected at {:.2}s: {:.1} Hz, occupation {:.2}, strength {:.1}",
            current_time,
            analysis.avg_frequency,
            analysis.frequency_occupation,
            analysis.avg_signal_ratio
        );

        Some(DetectionEvent {
            timestamp: current_time,
            frequency: analysis.avg_frequency,
            strength: analysis.avg_signal_ratio,
            confidence: analysis.confidence(),
            detection_type: DetectionType::SustainedFrequency,
            frequency_occupation: analysis.frequency_occupation,
            analysis_window: self.config.alarm_sustain_threshold,
        })
    }
}

/// Seconds since the Unix epoch
pub fn wall_clock_seconds() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or(0.0)
}
