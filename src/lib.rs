//! smokewatch - Detect smoke alarm beeping in audio streams
//!
//! A streaming detector that learns the ambient level of a room, then
//! looks for an intermittent tone near 3.2 kHz that stays present for a
//! few seconds. Detections can be pushed to ntfy.sh.
//!
//! ## Module Structure
//!
//! - `core` - Detector, spectral frontend, decoding, replay and DSP utilities
//! - `cli` - Command-line interface
//! - `config` - Application configuration and detector presets
//! - `detection` - Detection window and event types
//! - `evaluation` - Scoring against labelled recordings
//! - `notify` - Notification delivery
//! - `testgen` - Synthetic test recordings
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use smokewatch::core::{DetectorConfig, SmokeAlarmDetector};
//!
//! let config = DetectorConfig::default();
//! let mut detector = SmokeAlarmDetector::new(config.clone())?;
//!
//! let chunk = vec![0.0f32; config.chunk_size];
//! if let Some(event) = detector.process_audio_chunk(&chunk, Some(0.0))? {
//!     println!("Alarm at {:.1} Hz", event.frequency);
//! }
//! # Ok::<(), smokewatch::core::DetectorError>(())
//! ```
//!
//! ## Detector Presets
//!
//! | Preset    | Use Case                     | Key Adjustments                 |
//! |-----------|------------------------------|---------------------------------|
//! | Standard  | Typical room                 | Balanced defaults               |
//! | Sensitive | Quiet room, distant alarm    | Lower ratio, wider band         |
//! | Strict    | Music or TV in the room      | Higher ratio, narrower band     |

// Detector and signal processing
pub mod core;

// Command-line interface
pub mod cli;

// Configuration and presets
pub mod config;

// Detection result types
pub mod detection;

pub mod evaluation;

pub mod notify;

pub mod testgen;

// Re-export commonly used types at crate root for convenience
pub use config::{AppConfig, DetectorConfigBuilder, DetectorPreset};
pub use core::{DetectorConfig, DetectorError, DetectorResult, SmokeAlarmDetector};
pub use detection::{DetectionEvent, DetectionType, DetectionWindow};
