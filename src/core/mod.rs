//! Detection core and the signal utilities around it
//!
//! The detector ([`SmokeAlarmDetector`]) and its spectral frontend do no
//! I/O. Decoding, replay, inspection and visualization build on them.

pub mod decoder;
pub mod detector;
pub mod dsp;
pub mod error;
pub mod frontend;
pub mod history;
pub mod inspect;
pub mod replay;
pub mod sustained;
pub mod visualization;

pub use detector::{DetectorConfig, DetectorPhase, DetectorState, SmokeAlarmDetector};
pub use error::{DetectorError, DetectorResult};
pub use frontend::{SpectralFrontend, SpectralPeak, SpectralResult};
pub use history::{WindowHistory, HISTORY_CAPACITY};
pub use replay::{replay, replay_with_offset, ReplayReport};
pub use sustained::SustainedAnalysis;
