//! Window function implementations

use std::f64::consts::PI;

/// Symmetric Hann (raised-cosine) window.
///
/// Both end points are zero, matching the usual `hann(N, sym=True)`
/// definition used for single-frame spectral analysis.
pub fn hann_window(size: usize) -> Vec<f64> {
    match size {
        0 => Vec::new(),
        1 => vec![1.0],
        _ => {
            let denom = (size - 1) as f64;
            (0..size)
                .map(|i| 0.5 * (1.0 - (2.0 * PI * i as f64 / denom).cos()))
                .collect()
        }
    }
}
