// src/cli/listen.rs
//
// Live detection on raw mono PCM, e.g. `arecord -f S16_LE -r 44100 -c 1 -t raw | smokewatch listen`

use anyhow::{Context, Result};
use clap::ValueEnum;
use std::io::{ErrorKind, Read};

use super::output;
use crate::core::{DetectorConfig, SmokeAlarmDetector};
use crate::notify::{Dispatcher, NotificationManager};

/// Sample encoding of the PCM input
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum PcmFormat {
    /// Signed 16-bit little endian
    S16le,
    /// 32-bit float little endian
    F32le,
}

impl PcmFormat {
    pub fn bytes_per_sample(&self) -> usize {
        match self {
            PcmFormat::S16le => 2,
            PcmFormat::F32le => 4,
        }
    }

    fn decode(&self, bytes: &[u8]) -> Vec<f32> {
        match self {
            PcmFormat::S16le => bytes
                .chunks_exact(2)
                .map(|b| i16::from_le_bytes([b[0], b[1]]) as f32 / 32768.0)
                .collect(),
            PcmFormat::F32le => bytes
                .chunks_exact(4)
                .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
                .collect(),
        }
    }
}

/// Frames a byte stream into fixed-size sample chunks
pub struct PcmChunkReader<R: Read> {
    reader: R,
    format: PcmFormat,
    buffer: Vec<u8>,
}

impl<R: Read> PcmChunkReader<R> {
    pub fn new(reader: R, format: PcmFormat, chunk_size: usize) -> Self {
        Self {
            reader,
            format,
            buffer: vec![0u8; chunk_size * format.bytes_per_sample()],
        }
    }

    /// Next full chunk, or `None` at end of input. A trailing partial
    /// chunk is discarded.
    pub fn next_chunk(&mut self) -> Result<Option<Vec<f32>>> {
        let mut filled = 0;
        while filled < self.buffer.len() {
            match self.reader.read(&mut self.buffer[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e).context("Failed to read PCM input"),
            }
        }

        if filled < self.buffer.len() {
            if filled > 0 {
                log::debug!("Discarding {} bytes of trailing partial chunk", filled);
            }
            return Ok(None);
        }
        Ok(Some(self.format.decode(&self.buffer)))
    }
}

/// How chunk timestamps are assigned
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Clock {
    /// Wall clock at the time each chunk is processed
    Wall,
    /// Position in the stream, for recorded input
    Stream,
}

/// Run the detector over a PCM stream until it ends. Returns the number
/// of detections.
pub fn run<R: Read>(
    reader: R,
    format: PcmFormat,
    config: DetectorConfig,
    clock: Clock,
    notifications: Option<NotificationManager>,
) -> Result<usize> {
    let sample_rate = config.sample_rate;
    let chunk_size = config.chunk_size;
    let mut detector = SmokeAlarmDetector::new(config)?;
    let mut chunks = PcmChunkReader::new(reader, format, chunk_size);
    let dispatcher = notifications.map(Dispatcher::spawn);

    log::info!(
        "Listening: {} Hz, {} samples per chunk, {:?}",
        sample_rate,
        chunk_size,
        format
    );

    let mut detections = 0;
    let mut index = 0usize;
    while let Some(chunk) = chunks.next_chunk()? {
        let timestamp = match clock {
            Clock::Wall => None,
            Clock::Stream => Some((index * chunk_size) as f64 / sample_rate as f64),
        };
        index += 1;

        match detector.process_audio_chunk(&chunk, timestamp) {
            Ok(Some(event)) => {
                detections += 1;
                println!("{}", output::format_event(&event));
                if let Some(dispatcher) = &dispatcher {
                    dispatcher.dispatch(event);
                }
            }
            Ok(None) => {}
            // The wall clock can step backwards; skip the chunk and carry on
            Err(e) if e.is_invalid_input() => log::warn!("Skipping chunk {}: {}", index, e),
            Err(e) => return Err(e.into()),
        }
    }

    log::info!("Input ended after {} chunks", index);
    if let Some(dispatcher) = dispatcher {
        let delivered = dispatcher.shutdown();
        log::info!("{} of {} detections delivered", delivered, detections);
    }
    Ok(detections)
}
