// src/testgen/mod.rs
//
// Synthetic test signal generation: seeded background noise, pulsed
// alarm-style tones and continuous tones, written as WAV files together
// with a matching evaluation manifest.

use anyhow::{bail, Context, Result};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use std::path::{Path, PathBuf};

use crate::evaluation::{AlarmTime, TestCase, TestManifest, MANIFEST_FILE};

/// Uniform white noise in `[-amplitude, amplitude)`
pub fn white_noise(len: usize, amplitude: f32, seed: u64) -> Vec<f32> {
    if amplitude <= 0.0 {
        return vec![0.0; len];
    }
    let mut rng = StdRng::seed_from_u64(seed);
    (0..len).map(|_| rng.gen_range(-amplitude..amplitude)).collect()
}

/// Sine tone with phase referenced to sample 0
pub fn tone(len: usize, sample_rate: u32, frequency: f64, amplitude: f64) -> Vec<f32> {
    (0..len)
        .map(|i| {
            let t = i as f64 / sample_rate as f64;
            (amplitude * (2.0 * PI * frequency * t).sin()) as f32
        })
        .collect()
}

/// On/off keying of a tone, like a beeping alarm
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PulsePattern {
    /// Seconds from stream start to the first beep
    pub start: f64,
    pub on_secs: f64,
    pub off_secs: f64,
    /// Beeping stops here; `None` runs to the end
    pub end: Option<f64>,
}

impl PulsePattern {
    pub fn is_on(&self, t: f64) -> bool {
        if t < self.start || self.end.map_or(false, |end| t >= end) {
            return false;
        }
        let period = self.on_secs + self.off_secs;
        if period <= 0.0 {
            return false;
        }
        (t - self.start) % period < self.on_secs
    }
}

/// Shape of the alarm tone in a scenario
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToneShape {
    /// No tone: background only
    Silent,
    /// Constant tone from `start` on
    Continuous { start: f64 },
    Pulsed(PulsePattern),
}

/// A synthetic recording: noise plus an optional tone
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlarmScenario {
    pub name: String,
    pub sample_rate: u32,
    pub duration_secs: f64,
    pub noise_amplitude: f32,
    pub tone_frequency: f64,
    pub tone_amplitude: f64,
    pub shape: ToneShape,
    pub seed: u64,
}

impl Default for AlarmScenario {
    fn default() -> Self {
        Self::beeping_alarm()
    }
}

impl AlarmScenario {
    /// 10 s of quiet room, then a 3.2 kHz alarm beeping 0.5 s on / 0.5 s off
    pub fn beeping_alarm() -> Self {
        Self {
            name: "beeping_alarm".to_string(),
            sample_rate: 44100,
            duration_secs: 20.0,
            noise_amplitude: 0.01,
            tone_frequency: 3200.0,
            tone_amplitude: 0.5,
            shape: ToneShape::Pulsed(PulsePattern {
                start: 10.0,
                on_secs: 0.5,
                off_secs: 0.5,
                end: None,
            }),
            seed: 7,
        }
    }

    /// Same room with a steady 3.2 kHz tone; must not trigger
    pub fn continuous_tone() -> Self {
        Self {
            name: "continuous_tone".to_string(),
            shape: ToneShape::Continuous { start: 10.0 },
            ..Self::beeping_alarm()
        }
    }

    /// Background noise only
    pub fn quiet_room() -> Self {
        Self {
            name: "quiet_room".to_string(),
            shape: ToneShape::Silent,
            ..Self::beeping_alarm()
        }
    }

    pub fn all() -> Vec<Self> {
        vec![Self::beeping_alarm(), Self::continuous_tone(), Self::quiet_room()]
    }

    pub fn sample_count(&self) -> usize {
        (self.duration_secs * self.sample_rate as f64) as usize
    }

    /// When the alarm becomes audible, if ever
    pub fn alarm_onset(&self) -> Option<f64> {
        match self.shape {
            ToneShape::Pulsed(p) => Some(p.start),
            _ => None,
        }
    }

    fn tone_on(&self, t: f64) -> bool {
        match self.shape {
            ToneShape::Silent => false,
            ToneShape::Continuous { start } => t >= start,
            ToneShape::Pulsed(pattern) => pattern.is_on(t),
        }
    }

    pub fn render(&self) -> Vec<f32> {
        let len = self.sample_count();
        let mut samples = white_noise(len, self.noise_amplitude, self.seed);
        let sr = self.sample_rate as f64;
        for (i, sample) in samples.iter_mut().enumerate() {
            let t = i as f64 / sr;
            if self.tone_on(t) {
                *sample += (self.tone_amplitude * (2.0 * PI * self.tone_frequency * t).sin()) as f32;
            }
        }
        samples
    }

    pub fn file_name(&self) -> String {
        format!("{}.wav", self.name)
    }

    /// Evaluation entry describing this scenario
    pub fn test_case(&self) -> TestCase {
        TestCase {
            filename: self.file_name(),
            description: self.name.replace('_', " "),
            expected_alarms: self.alarm_onset().map(AlarmTime::Seconds).into_iter().collect(),
            duration: Some(serde_json::json!(self.duration_secs)),
        }
    }
}

/// Write mono 16-bit PCM
pub fn write_wav(path: &Path, samples: &[f32], sample_rate: u32) -> Result<()> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(path, spec)
        .with_context(|| format!("Failed to create {}", path.display()))?;
    for &s in samples {
        writer.write_sample((s.clamp(-1.0, 1.0) * i16::MAX as f32) as i16)?;
    }
    writer.finalize().context("Failed to finalize WAV file")?;
    Ok(())
}

/// Writes scenario recordings and their manifest into a directory
pub struct TestSuiteGenerator {
    output_dir: PathBuf,
}

impl TestSuiteGenerator {
    pub fn new<P: AsRef<Path>>(output_dir: P) -> Result<Self> {
        let output_dir = output_dir.as_ref().to_path_buf();
        if output_dir.is_file() {
            bail!("{} is a file, not a directory", output_dir.display());
        }
        std::fs::create_dir_all(&output_dir)
            .with_context(|| format!("Failed to create {}", output_dir.display()))?;
        Ok(Self { output_dir })
    }

    pub fn generate(&self, scenario: &AlarmScenario) -> Result<PathBuf> {
        let path = self.output_dir.join(scenario.file_name());
        write_wav(&path, &scenario.render(), scenario.sample_rate)?;
        log::info!("Generated {}", path.display());
        Ok(path)
    }

    /// Generate every scenario plus `test_cases.json`
    pub fn generate_suite(&self, scenarios: &[AlarmScenario]) -> Result<TestManifest> {
        let mut test_cases = Vec::with_capacity(scenarios.len());
        for scenario in scenarios {
            self.generate(scenario)?;
            test_cases.push(scenario.test_case());
        }

        let manifest = TestManifest { test_cases };
        let json = serde_json::to_string_pretty(&manifest)?;
        std::fs::write(self.output_dir.join(MANIFEST_FILE), json)
            .context("Failed to write test manifest")?;
        Ok(manifest)
    }
}
