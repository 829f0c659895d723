// src/core/replay.rs
//
// Feed a recorded signal through a detector as if it were arriving live.

use serde::Serialize;

use super::detector::SmokeAlarmDetector;
use super::error::DetectorResult;
use crate::detection::DetectionEvent;

/// Outcome of replaying one recording
#[derive(Debug, Clone, Default, Serialize)]
pub struct ReplayReport {
    pub events: Vec<DetectionEvent>,
    /// Full chunks handed to the detector
    pub chunks_processed: usize,
    /// Trailing samples dropped because they did not fill a chunk
    pub samples_dropped: usize,
    /// Seconds of audio covered by the processed chunks
    pub duration_secs: f64,
}

impl ReplayReport {
    pub fn detection_times(&self) -> Vec<f64> {
        self.events.iter().map(|e| e.timestamp).collect()
    }

    pub fn detected(&self) -> bool {
        !self.events.is_empty()
    }
}

/// Replay `samples` in consecutive full chunks with timestamps
/// `i / sample_rate`, where `i` is the index of each chunk's first sample.
pub fn replay(
    detector: &mut SmokeAlarmDetector,
    samples: &[f32],
    sample_rate: u32,
) -> DetectorResult<ReplayReport> {
    replay_with_offset(detector, samples, sample_rate, 0.0, |_| {})
}

/// Replay starting at `offset` seconds, calling `handler` for each event
/// as it is produced.
pub fn replay_with_offset<F>(
    detector: &mut SmokeAlarmDetector,
    samples: &[f32],
    sample_rate: u32,
    offset: f64,
    mut handler: F,
) -> DetectorResult<ReplayReport>
where
    F: FnMut(&DetectionEvent),
{
    let chunk_size = detector.config().chunk_size;
    let chunks = samples.chunks_exact(chunk_size);
    let samples_dropped = chunks.remainder().len();

    let mut report = ReplayReport {
        samples_dropped,
        ..ReplayReport::default()
    };

    for (index, chunk) in chunks.enumerate() {
        let timestamp = offset + (index * chunk_size) as f64 / sample_rate as f64;
        if let Some(event) = detector.process_audio_stream(chunk, Some(timestamp), &mut handler)? {
            report.events.push(event);
        }
        report.chunks_processed += 1;
    }

    report.duration_secs = (report.chunks_processed * chunk_size) as f64 / sample_rate as f64;

    if samples_dropped > 0 {
        log::debug!("Dropped {} trailing samples (partial chunk)", samples_dropped);
    }

    Ok(report)
}
