//! CLI argument parsing with preset support

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use super::listen::PcmFormat;
use crate::config::{DetectorConfigBuilder, DetectorPreset};
use crate::core::{DetectorConfig, DetectorResult};

#[derive(Parser, Debug)]
#[command(name = "smokewatch", version)]
#[command(about = "Detect smoke alarm beeping in live audio and recordings")]
pub struct Cli {
    /// Verbose logging (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Configuration file (default: ./config.json, then the user config dir)
    #[arg(short, long, global = true, env = "SMOKEWATCH_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(flatten)]
    pub detector: DetectorArgs,

    #[command(subcommand)]
    pub command: Command,
}

/// Detector overrides applied on top of the configuration file
#[derive(Args, Debug, Default, Clone)]
pub struct DetectorArgs {
    /// Named parameter set
    #[arg(long, value_enum, global = true)]
    pub preset: Option<DetectorPreset>,

    /// Detector sample rate in Hz; input files are resampled to it
    #[arg(long, global = true)]
    pub sample_rate: Option<u32>,

    /// Samples per analysis chunk
    #[arg(long, global = true)]
    pub chunk_size: Option<usize>,

    /// Alarm tone frequency in Hz
    #[arg(long, global = true)]
    pub target_frequency: Option<f64>,

    /// Half-width of the alarm band in Hz
    #[arg(long, global = true)]
    pub tolerance: Option<f64>,

    /// Seconds spent learning the ambient level
    #[arg(long, global = true)]
    pub learning_time: Option<f64>,

    /// Trailing analysis window in seconds
    #[arg(long, global = true)]
    pub sustain: Option<f64>,

    /// Cooldown after a detection in seconds
    #[arg(long, global = true)]
    pub latch: Option<f64>,

    /// Minimum peak-to-ambient ratio
    #[arg(long, global = true)]
    pub min_ratio: Option<f64>,

    /// Minimum fraction of strong chunks in the window
    #[arg(long, global = true)]
    pub occupation: Option<f64>,
}

impl DetectorArgs {
    /// Preset first, then individual overrides
    pub fn apply(&self, base: DetectorConfig) -> DetectorResult<DetectorConfig> {
        let mut builder = DetectorConfigBuilder::from_config(base);
        if let Some(preset) = self.preset {
            builder = builder.preset(preset);
        }
        if let Some(v) = self.sample_rate {
            builder = builder.sample_rate(v);
        }
        if let Some(v) = self.chunk_size {
            builder = builder.chunk_size(v);
        }
        if let Some(v) = self.target_frequency {
            builder = builder.target_frequency(v);
        }
        if let Some(v) = self.tolerance {
            builder = builder.frequency_tolerance(v);
        }
        if let Some(v) = self.learning_time {
            builder = builder.ambient_learning_time(v);
        }
        if let Some(v) = self.sustain {
            builder = builder.alarm_sustain_threshold(v);
        }
        if let Some(v) = self.latch {
            builder = builder.alarm_latch_time(v);
        }
        if let Some(v) = self.min_ratio {
            builder = builder.min_signal_ratio(v);
        }
        if let Some(v) = self.occupation {
            builder = builder.frequency_occupation_threshold(v);
        }
        builder.build()
    }
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Replay audio files or directories through the detector
    Scan {
        /// Files or directories
        #[arg(required = true)]
        paths: Vec<PathBuf>,

        /// Output results as JSON
        #[arg(long)]
        json: bool,
    },

    /// Detect on raw mono PCM from stdin or a file and send notifications
    Listen {
        /// PCM source (default: stdin)
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Sample encoding
        #[arg(long, value_enum, default_value_t = PcmFormat::S16le)]
        format: PcmFormat,

        /// Timestamp chunks by stream position instead of the wall clock
        #[arg(long)]
        stream_time: bool,

        /// Print detections only
        #[arg(long)]
        no_notify: bool,
    },

    /// Run the labelled test cases in a directory
    Evaluate {
        /// Directory holding test_cases.json and the recordings
        #[arg(short, long, default_value = "test_audio")]
        test_dir: PathBuf,

        /// Run one case, by 1-based index or name
        #[arg(long)]
        single: Option<String>,

        /// Output results as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print the spectrum of a file at given times ("m:ss" or seconds)
    Inspect {
        file: PathBuf,

        #[arg(required = true)]
        times: Vec<String>,
    },

    /// Render a spectrogram PNG with the alarm band and detections marked
    Spectrogram {
        file: PathBuf,

        /// Output image (default: <file stem>.png)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Only render the first N seconds
        #[arg(long)]
        max_seconds: Option<f64>,

        /// Skip running the detector for the overlay
        #[arg(long)]
        no_detections: bool,
    },

    /// Write synthetic test recordings and a matching test_cases.json
    Generate {
        #[arg(short, long, default_value = "test_audio")]
        output: PathBuf,
    },

    /// Send a test notification through every enabled notifier
    TestNotifications,

    /// List detector presets
    Presets,
}

/// Print available presets
pub fn print_presets(base: &DetectorConfig) {
    println!("Available detector presets:\n");
    for preset in DetectorPreset::all() {
        let config = preset.apply(base);
        println!("  {} - {}", preset, preset.description());
        println!(
            "    Band: {:.0}-{:.0} Hz | ratio > {:.0} | occupation >= {:.2} | window {:.1}s",
            config.band_low(),
            config.band_high(),
            config.min_signal_ratio,
            config.frequency_occupation_threshold,
            config.alarm_sustain_threshold
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("smokewatch").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn test_parse_scan_with_preset() {
        let cli = parse(&["scan", "--preset", "sensitive", "a.wav", "dir"]);
        assert_eq!(cli.detector.preset, Some(DetectorPreset::Sensitive));
        match cli.command {
            Command::Scan { paths, json } => {
                assert_eq!(paths, vec![PathBuf::from("a.wav"), PathBuf::from("dir")]);
                assert!(!json);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_overrides_apply_after_preset() {
        let cli = parse(&["--preset", "strict", "--min-ratio", "90", "--latch", "60", "generate"]);
        let config = cli.detector.apply(DetectorConfig::default()).unwrap();
        assert_eq!(config.min_signal_ratio, 90.0);
        assert_eq!(config.alarm_latch_time, 60.0);
        assert_eq!(config.frequency_tolerance, 300.0);
    }

    #[test]
    fn test_invalid_override_rejected() {
        let cli = parse(&["--occupation", "1.5", "generate"]);
        assert!(cli.detector.apply(DetectorConfig::default()).is_err());
    }

    #[test]
    fn test_listen_defaults() {
        let cli = parse(&["listen", "-v"]);
        assert!(cli.verbose);
        match cli.command {
            Command::Listen {
                input,
                format,
                stream_time,
                no_notify,
            } => {
                assert!(input.is_none());
                assert_eq!(format, PcmFormat::S16le);
                assert!(!stream_time && !no_notify);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_unknown_preset() {
        let args = ["smokewatch", "--preset", "paranoid", "generate"];
        assert!(Cli::try_parse_from(args).is_err());
    }

    #[test]
    fn test_inspect_requires_times() {
        assert!(Cli::try_parse_from(["smokewatch", "inspect", "a.wav"]).is_err());
    }
}
