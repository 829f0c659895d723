//! Visualization tools for audio analysis
//!
//! Spectrogram rendering with the detector's band and detections overlaid.

mod spectrogram;

pub use spectrogram::{generate_spectrogram_image, render_spectrogram, Overlay, SpectrogramConfig};
