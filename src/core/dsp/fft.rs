//! FFT processing with windowing

use std::sync::Arc;

use num_complex::Complex64;
use realfft::{FftError, RealFftPlanner, RealToComplex};

use super::windows::hann_window;

/// Real-input FFT with a cached Hann window.
///
/// Planning happens once in [`FftProcessor::new`]; every call to
/// [`FftProcessor::magnitude_spectrum`] allocates its own buffers, so the
/// processor can be shared immutably and always yields identical output
/// for identical input.
pub struct FftProcessor {
    r2c: Arc<dyn RealToComplex<f64>>,
    window: Vec<f64>,
    fft_size: usize,
}

impl FftProcessor {
    pub fn new(fft_size: usize) -> Self {
        let mut planner = RealFftPlanner::<f64>::new();
        Self {
            r2c: planner.plan_fft_forward(fft_size),
            window: hann_window(fft_size),
            fft_size,
        }
    }

    /// Magnitude spectrum, `fft_size / 2 + 1` bins from DC to Nyquist.
    ///
    /// Shorter input is zero-padded; samples beyond `fft_size` are ignored.
    pub fn magnitude_spectrum(&self, samples: &[f32]) -> Result<Vec<f64>, FftError> {
        let mut input = self.r2c.make_input_vec();
        for ((slot, &sample), &w) in input.iter_mut().zip(samples).zip(&self.window) {
            *slot = sample as f64 * w;
        }

        let mut spectrum: Vec<Complex64> = self.r2c.make_output_vec();
        self.r2c.process(&mut input, &mut spectrum)?;

        Ok(spectrum.iter().map(|c| c.norm()).collect())
    }

    /// Centre frequency of `bin` in Hz
    pub fn bin_frequency(&self, bin: usize, sample_rate: u32) -> f64 {
        bin as f64 * sample_rate as f64 / self.fft_size as f64
    }

    pub fn bin_count(&self) -> usize {
        self.fft_size / 2 + 1
    }

    pub fn fft_size(&self) -> usize {
        self.fft_size
    }
}
