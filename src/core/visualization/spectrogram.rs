// src/core/visualization/spectrogram.rs
//
// Linear spectrogram rendering with the alarm band and detection times
// overlaid, for eyeballing what the detector saw.

use anyhow::{bail, Context, Result};
use image::{ImageBuffer, Rgb, RgbImage};
use std::path::Path;

use crate::core::dsp::stats::amplitude_to_db;
use crate::core::dsp::FftProcessor;

const BAND_EDGE_COLOR: Rgb<u8> = Rgb([255, 255, 255]);
const DETECTION_COLOR: Rgb<u8> = Rgb([255, 40, 40]);

/// Spectrogram configuration
#[derive(Debug, Clone)]
pub struct SpectrogramConfig {
    pub width: u32,
    pub height: u32,
    pub fft_size: usize,
    pub hop_size: usize,
    pub min_db: f64,
    pub max_db: f64,
    /// Highest frequency shown, Hz
    pub max_frequency: f64,
    pub max_seconds: Option<f64>,
}

impl Default for SpectrogramConfig {
    fn default() -> Self {
        Self {
            width: 1200,
            height: 400,
            fft_size: 2048,
            hop_size: 512,
            min_db: -80.0,
            max_db: 40.0,
            max_frequency: 8000.0,
            max_seconds: None,
        }
    }
}

/// Things drawn on top of the spectrogram
#[derive(Debug, Clone, Default)]
pub struct Overlay {
    /// Target band as (low, high) Hz
    pub band: Option<(f64, f64)>,
    /// Detection timestamps in seconds
    pub detections: Vec<f64>,
}

/// Render a spectrogram of `samples` into an image
pub fn render_spectrogram(
    samples: &[f32],
    sample_rate: u32,
    config: &SpectrogramConfig,
    overlay: &Overlay,
) -> Result<RgbImage> {
    if config.width == 0 || config.height == 0 || config.hop_size == 0 {
        bail!("Spectrogram dimensions and hop size must be positive");
    }

    let max_samples = config
        .max_seconds
        .map(|s| (s * sample_rate as f64) as usize)
        .unwrap_or(samples.len());
    let samples = &samples[..samples.len().min(max_samples)];

    if samples.len() < config.fft_size {
        bail!("Audio too short for spectrogram generation");
    }
    let num_frames = (samples.len() - config.fft_size) / config.hop_size + 1;

    let fft = FftProcessor::new(config.fft_size);
    let nyquist = sample_rate as f64 / 2.0;
    let max_frequency = config.max_frequency.min(nyquist);
    let visible_bins = ((max_frequency / nyquist) * (fft.bin_count() - 1) as f64) as usize + 1;

    let mut frames: Vec<Vec<f64>> = Vec::with_capacity(num_frames);
    for frame in 0..num_frames {
        let start = frame * config.hop_size;
        let magnitudes = fft
            .magnitude_spectrum(&samples[start..start + config.fft_size])
            .context("FFT failed while rendering spectrogram")?;
        frames.push(
            magnitudes
                .iter()
                .take(visible_bins)
                .map(|&m| {
                    amplitude_to_db(m)
                        .unwrap_or(config.min_db)
                        .clamp(config.min_db, config.max_db)
                })
                .collect(),
        );
    }

    let mut img: RgbImage = ImageBuffer::new(config.width, config.height);
    let x_scale = num_frames as f64 / config.width as f64;
    let y_scale = visible_bins as f64 / config.height as f64;

    for y in 0..config.height {
        // Low frequencies at the bottom
        let bin = (((config.height - 1 - y) as f64 * y_scale) as usize).min(visible_bins - 1);
        for x in 0..config.width {
            let frame = ((x as f64 * x_scale) as usize).min(num_frames - 1);
            let normalized = (frames[frame][bin] - config.min_db) / (config.max_db - config.min_db);
            img.put_pixel(x, y, db_to_color(normalized));
        }
    }

    if let Some((low, high)) = overlay.band {
        for edge in [low, high] {
            if let Some(y) = frequency_to_row(edge, max_frequency, config.height) {
                draw_dashed_row(&mut img, y, BAND_EDGE_COLOR);
            }
        }
    }

    let duration = samples.len() as f64 / sample_rate as f64;
    for &t in &overlay.detections {
        if t >= 0.0 && t <= duration {
            let x = ((t / duration) * (config.width - 1) as f64).round() as u32;
            for y in 0..config.height {
                img.put_pixel(x, y, DETECTION_COLOR);
            }
        }
    }

    Ok(img)
}

/// Render and save as PNG
pub fn generate_spectrogram_image(
    samples: &[f32],
    sample_rate: u32,
    config: &SpectrogramConfig,
    overlay: &Overlay,
    output_path: &Path,
) -> Result<()> {
    let img = render_spectrogram(samples, sample_rate, config, overlay)?;
    img.save(output_path)
        .with_context(|| format!("Failed to write {}", output_path.display()))?;
    log::info!("Spectrogram saved to {}", output_path.display());
    Ok(())
}

fn frequency_to_row(frequency: f64, max_frequency: f64, height: u32) -> Option<u32> {
    if frequency < 0.0 || frequency > max_frequency {
        return None;
    }
    let from_bottom = (frequency / max_frequency * (height - 1) as f64).round() as u32;
    Some(height - 1 - from_bottom)
}

fn draw_dashed_row(img: &mut RgbImage, y: u32, color: Rgb<u8>) {
    for x in (0..img.width()).filter(|x| (x / 6) % 2 == 0) {
        img.put_pixel(x, y, color);
    }
}

fn db_to_color(value: f64) -> Rgb<u8> {
    // Viridis-like colormap
    let v = value.clamp(0.0, 1.0);

    let r = (68.0 + v * (235.0 - 68.0)) as u8;
    let g = (1.0 + v * (237.0 - 1.0)) as u8;
    let b = (84.0 + v * (32.0 - 84.0 + (1.0 - v) * 150.0)) as u8;

    Rgb([r, g, b])
}
