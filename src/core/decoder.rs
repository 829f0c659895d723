// src/core/decoder.rs
//
// Audio file decoding and the conversions needed before a recording can
// be replayed through the detector: mono mixdown and resampling.
// Uses Symphonia for format-agnostic decoding and rubato for rate changes.

use anyhow::{bail, Context, Result};
use rubato::{FftFixedInOut, Resampler};
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use std::fs::File;
use std::path::Path;

/// File extensions the scanner treats as audio
pub const AUDIO_EXTENSIONS: &[&str] = &["wav", "flac", "mp3", "ogg", "m4a", "aac", "aiff", "aif"];

/// Frames per resampler block
const RESAMPLE_BLOCK: usize = 1024;

/// Decoded audio and its basic properties
#[derive(Debug, Clone)]
pub struct AudioData {
    /// Interleaved samples normalized to [-1.0, 1.0]
    pub samples: Vec<f32>,
    /// Sample rate in Hz
    pub sample_rate: u32,
    /// Number of audio channels
    pub channels: usize,
    /// Duration in seconds
    pub duration_secs: f64,
    /// Codec name as reported by the decoder
    pub codec_name: String,
}

/// Decode an audio file to interleaved floating-point samples
pub fn decode_audio(path: &Path) -> Result<AudioData> {
    let file = File::open(path)
        .with_context(|| format!("Failed to open file: {}", path.display()))?;

    let mss = MediaSourceStream::new(Box::new(file), Default::default());

    let mut hint = Hint::new();
    if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
        hint.with_extension(ext);
    }

    let mut probed = symphonia::default::get_probe()
        .format(&hint, mss, &FormatOptions::default(), &MetadataOptions::default())
        .with_context(|| format!("Unsupported or corrupted audio file: {}", path.display()))?;

    let track = probed
        .format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .context("No supported audio track found in file")?;

    let track_id = track.id;
    let sample_rate = track
        .codec_params
        .sample_rate
        .context("File does not specify sample rate")?;
    let channels = track.codec_params.channels.map(|c| c.count()).unwrap_or(1);
    if channels == 0 {
        bail!("File reports 0 audio channels");
    }
    let codec_name = format!("{:?}", track.codec_params.codec);

    let mut decoder = symphonia::default::get_codecs()
        .make(&track.codec_params, &DecoderOptions::default())
        .context("Failed to create decoder for audio codec")?;

    let mut samples: Vec<f32> = Vec::new();
    let mut sample_buf: Option<SampleBuffer<f32>> = None;

    loop {
        let packet = match probed.format.next_packet() {
            Ok(packet) => packet,
            Err(SymphoniaError::IoError(ref e))
                if e.kind() == std::io::ErrorKind::UnexpectedEof =>
            {
                break
            }
            Err(SymphoniaError::ResetRequired) => {
                decoder.reset();
                continue;
            }
            Err(e) => return Err(e.into()),
        };

        if packet.track_id() != track_id {
            continue;
        }

        let decoded = match decoder.decode(&packet) {
            Ok(buf) => buf,
            Err(SymphoniaError::DecodeError(msg)) => {
                log::warn!("Skipping undecodable packet in {}: {}", path.display(), msg);
                continue;
            }
            Err(e) => return Err(e.into()),
        };

        let buf = sample_buf.get_or_insert_with(|| {
            SampleBuffer::new(decoded.capacity() as u64, *decoded.spec())
        });
        buf.copy_interleaved_ref(decoded);
        samples.extend_from_slice(buf.samples());
    }

    if samples.is_empty() {
        bail!("No audio samples decoded from {}", path.display());
    }

    let duration_secs = samples.len() as f64 / (sample_rate as f64 * channels as f64);
    log::debug!(
        "Decoded {}: {} Hz, {} ch, {:.2}s, {}",
        path.display(),
        sample_rate,
        channels,
        duration_secs,
        codec_name
    );

    Ok(AudioData {
        samples,
        sample_rate,
        channels,
        duration_secs,
        codec_name,
    })
}

/// Average all channels into one
pub fn extract_mono(audio: &AudioData) -> Vec<f32> {
    if audio.channels <= 1 {
        return audio.samples.clone();
    }

    audio
        .samples
        .chunks_exact(audio.channels)
        .map(|frame| frame.iter().sum::<f32>() / audio.channels as f32)
        .collect()
}

/// Convert mono samples from `from_rate` to `to_rate`.
///
/// The output is aligned with the input (resampler delay removed) and
/// has `len * to_rate / from_rate` samples.
pub fn resample(samples: &[f32], from_rate: u32, to_rate: u32) -> Result<Vec<f32>> {
    if from_rate == to_rate || samples.is_empty() {
        return Ok(samples.to_vec());
    }

    let mut resampler =
        FftFixedInOut::<f32>::new(from_rate as usize, to_rate as usize, RESAMPLE_BLOCK, 1)
            .with_context(|| format!("Cannot resample from {} Hz to {} Hz", from_rate, to_rate))?;

    let expected_len = (samples.len() as u64 * to_rate as u64 / from_rate as u64) as usize;
    let delay = resampler.output_delay();
    let mut output = Vec::with_capacity(expected_len + delay + RESAMPLE_BLOCK);
    let mut position = 0;

    // Keep feeding zero-padded blocks until the delayed tail has been flushed
    while output.len() < expected_len + delay {
        let needed = resampler.input_frames_next();
        let mut block = vec![0.0f32; needed];
        if position < samples.len() {
            let end = (position + needed).min(samples.len());
            block[..end - position].copy_from_slice(&samples[position..end]);
        }
        position += needed;

        let waves_in = vec![block];
        let processed = resampler
            .process(&waves_in, None)
            .context("Resampling failed")?;
        if let Some(channel) = processed.into_iter().next() {
            output.extend(channel);
        }
    }

    output.drain(..delay.min(output.len()));
    output.truncate(expected_len);
    Ok(output)
}

/// Decode, mix down, and resample a file to `target_rate`
pub fn load_mono(path: &Path, target_rate: u32) -> Result<Vec<f32>> {
    let audio = decode_audio(path)?;
    let mono = extract_mono(&audio);
    if audio.sample_rate != target_rate {
        log::info!(
            "Resampling {} from {} Hz to {} Hz",
            path.display(),
            audio.sample_rate,
            target_rate
        );
    }
    resample(&mono, audio.sample_rate, target_rate)
}

/// Whether the path has a known audio file extension
pub fn is_audio_file(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|ext| AUDIO_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
        .unwrap_or(false)
}
