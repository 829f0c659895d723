//! Statistical helpers shared by the detector and the inspection tools

/// Arithmetic mean, 0.0 for an empty slice
pub fn mean(data: &[f64]) -> f64 {
    if data.is_empty() {
        return 0.0;
    }
    data.iter().sum::<f64>() / data.len() as f64
}

/// Population standard deviation (divides by N), 0.0 for an empty slice
pub fn std_dev(data: &[f64]) -> f64 {
    if data.is_empty() {
        return 0.0;
    }
    let m = mean(data);
    let variance = data.iter().map(|x| (x - m).powi(2)).sum::<f64>() / data.len() as f64;
    variance.sqrt()
}

/// Compute RMS (Root Mean Square)
pub fn rms(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }

    let sum_sq: f32 = samples.iter().map(|s| s * s).sum();
    (sum_sq / samples.len() as f32).sqrt()
}

/// Amplitude to dB; `None` for silence (where the level is -inf)
pub fn amplitude_to_db(amplitude: f64) -> Option<f64> {
    if amplitude > 0.0 {
        Some(20.0 * amplitude.log10())
    } else {
        None
    }
}

/// Power to dB; `None` for zero energy
pub fn power_to_db(power: f64) -> Option<f64> {
    if power > 0.0 {
        Some(10.0 * power.log10())
    } else {
        None
    }
}
