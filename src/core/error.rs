// src/core/error.rs
//
// Errors surfaced by the detection core. Numeric degeneracies (empty
// bands, silent input) are absorbed internally and never appear here.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DetectorError {
    /// Constructor parameter out of range
    #[error("invalid detector configuration: {field} {reason}")]
    InvalidConfig {
        field: &'static str,
        reason: String,
    },

    /// Chunk does not match the configured FFT length
    #[error("audio chunk has {actual} samples, expected {expected}")]
    ChunkLength { expected: usize, actual: usize },

    /// Chunk carries a NaN or infinite sample
    #[error("sample {index} of the audio chunk is not a finite number")]
    NonFiniteSample { index: usize },

    /// Timestamp went backwards relative to the previous accepted chunk
    #[error("timestamp {current:.3}s precedes previous chunk at {previous:.3}s")]
    NonMonotonicTimestamp { previous: f64, current: f64 },

    /// Timestamp is NaN or infinite
    #[error("timestamp {0} is not a finite number of seconds")]
    InvalidTimestamp(f64),

    #[error("FFT processing failed: {0}")]
    Fft(#[from] realfft::FftError),
}

impl DetectorError {
    /// True for caller contract violations on a single chunk.
    pub fn is_invalid_input(&self) -> bool {
        matches!(
            self,
            DetectorError::ChunkLength { .. }
                | DetectorError::NonFiniteSample { .. }
                | DetectorError::NonMonotonicTimestamp { .. }
                | DetectorError::InvalidTimestamp(_)
        )
    }
}

pub type DetectorResult<T> = Result<T, DetectorError>;
