// src/config/presets.rs
//
// Named detector parameter sets and a builder for per-field overrides

use serde::{Deserialize, Serialize};

use crate::core::{DetectorConfig, DetectorResult};

/// Preset detector tunings for common environments
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum DetectorPreset {
    /// Balanced defaults for a typical room
    Standard,
    /// Quiet rooms or distant alarms (lower strength requirements)
    Sensitive,
    /// Noisy rooms with music or TV (fewer false positives)
    Strict,
}

impl DetectorPreset {
    pub fn all() -> [Self; 3] {
        [Self::Standard, Self::Sensitive, Self::Strict]
    }

    pub fn description(&self) -> &'static str {
        match self {
            Self::Standard => "Balanced defaults for a typical room",
            Self::Sensitive => "Quiet rooms or distant alarms",
            Self::Strict => "Noisy rooms with music or TV",
        }
    }

    /// Apply this preset's parameters on top of `base`.
    ///
    /// Only the detection thresholds change; stream parameters such as
    /// the sample rate and chunk size are left as they are.
    pub fn apply(&self, base: &DetectorConfig) -> DetectorConfig {
        let mut config = base.clone();
        match self {
            Self::Standard => {
                let defaults = DetectorConfig::default();
                config.min_signal_ratio = defaults.min_signal_ratio;
                config.frequency_occupation_threshold = defaults.frequency_occupation_threshold;
                config.alarm_sustain_threshold = defaults.alarm_sustain_threshold;
                config.frequency_tolerance = defaults.frequency_tolerance;
            }
            Self::Sensitive => {
                config.min_signal_ratio = 40.0;
                config.frequency_occupation_threshold = 0.2;
                config.alarm_sustain_threshold = 4.0;
                config.frequency_tolerance = 500.0;
            }
            Self::Strict => {
                config.min_signal_ratio = 150.0;
                config.frequency_occupation_threshold = 0.3;
                config.alarm_sustain_threshold = 5.0;
                config.frequency_tolerance = 300.0;
            }
        }
        config
    }
}

impl std::fmt::Display for DetectorPreset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Standard => "standard",
            Self::Sensitive => "sensitive",
            Self::Strict => "strict",
        };
        f.write_str(name)
    }
}

/// Builder for detector configurations with individual overrides
pub struct DetectorConfigBuilder {
    config: DetectorConfig,
}

impl DetectorConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: DetectorConfig::default(),
        }
    }

    pub fn from_config(config: DetectorConfig) -> Self {
        Self { config }
    }

    pub fn preset(mut self, preset: DetectorPreset) -> Self {
        self.config = preset.apply(&self.config);
        self
    }

    pub fn sample_rate(mut self, sample_rate: u32) -> Self {
        self.config.sample_rate = sample_rate;
        self
    }

    pub fn chunk_size(mut self, chunk_size: usize) -> Self {
        self.config.chunk_size = chunk_size;
        self
    }

    pub fn target_frequency(mut self, hz: f64) -> Self {
        self.config.target_frequency = hz;
        self
    }

    pub fn frequency_tolerance(mut self, hz: f64) -> Self {
        self.config.frequency_tolerance = hz;
        self
    }

    pub fn ambient_learning_time(mut self, seconds: f64) -> Self {
        self.config.ambient_learning_time = seconds;
        self
    }

    pub fn alarm_sustain_threshold(mut self, seconds: f64) -> Self {
        self.config.alarm_sustain_threshold = seconds;
        self
    }

    pub fn alarm_latch_time(mut self, seconds: f64) -> Self {
        self.config.alarm_latch_time = seconds;
        self
    }

    pub fn min_signal_ratio(mut self, ratio: f64) -> Self {
        self.config.min_signal_ratio = ratio;
        self
    }

    pub fn frequency_occupation_threshold(mut self, threshold: f64) -> Self {
        self.config.frequency_occupation_threshold = threshold;
        self
    }

    /// Validate and return the configuration
    pub fn build(self) -> DetectorResult<DetectorConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}

impl Default for DetectorConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
