//! Detection result types produced by the smoke alarm detector

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

/// Timestamps below this are stream-relative, not Unix epoch seconds
const EPOCH_THRESHOLD: f64 = 1.0e9;

/// Kind of pattern that triggered a detection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DetectionType {
    /// Intermittent in-band tone sustained across the analysis window
    SustainedFrequency,
    /// Synthetic event used to exercise notification channels
    Test,
}

impl DetectionType {
    pub fn name(&self) -> &'static str {
        match self {
            DetectionType::SustainedFrequency => "sustained_frequency",
            DetectionType::Test => "test",
        }
    }
}

impl std::fmt::Display for DetectionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Classification of one processed chunk
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DetectionWindow {
    /// Chunk timestamp in seconds
    pub timestamp: f64,
    /// Whether the in-band peak cleared every amplitude threshold
    pub is_strong_signal: bool,
    /// Peak frequency inside the target band (0.0 if the band is empty)
    pub frequency: f64,
    /// Peak magnitude relative to the learned ambient level
    pub signal_ratio: f64,
    /// Raw peak magnitude
    pub magnitude: f64,
}

/// A confirmed smoke alarm pattern
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionEvent {
    /// Timestamp of the chunk that completed the pattern
    pub timestamp: f64,
    /// Mean peak frequency over the strong windows, Hz
    pub frequency: f64,
    /// Mean signal-to-ambient ratio over the strong windows
    pub strength: f64,
    /// Confidence in [0, 1]
    pub confidence: f64,
    pub detection_type: DetectionType,
    /// Fraction of recent windows classified as strong
    pub frequency_occupation: f64,
    /// Length of the trailing analysis window, seconds
    pub analysis_window: f64,
}

impl DetectionEvent {
    /// Event used by `test-notifications`
    pub fn test_event(timestamp: f64) -> Self {
        Self {
            timestamp,
            frequency: 3200.0,
            strength: 150.0,
            confidence: 1.0,
            detection_type: DetectionType::Test,
            frequency_occupation: 0.5,
            analysis_window: 0.0,
        }
    }

    pub fn is_test(&self) -> bool {
        self.detection_type == DetectionType::Test
    }

    /// Local time of the event when it was stamped with the wall clock;
    /// `None` for stream-relative timestamps from replayed files.
    pub fn local_time(&self) -> Option<DateTime<Local>> {
        if self.timestamp < EPOCH_THRESHOLD {
            return None;
        }
        let secs = self.timestamp.trunc() as i64;
        let nanos = (self.timestamp.fract() * 1e9) as u32;
        DateTime::from_timestamp(secs, nanos).map(|utc| utc.with_timezone(&Local))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detection_type_serializes_as_tag() {
        let json = serde_json::to_string(&DetectionType::SustainedFrequency).unwrap();
        assert_eq!(json, "\"sustained_frequency\"");
        assert_eq!(DetectionType::SustainedFrequency.to_string(), "sustained_frequency");
    }

    #[test]
    fn test_event_json_fields() {
        let event = DetectionEvent {
            timestamp: 12.5,
            frequency: 3190.0,
            strength: 820.0,
            confidence: 0.9,
            detection_type: DetectionType::SustainedFrequency,
            frequency_occupation: 0.45,
            analysis_window: 4.0,
        };

        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["detection_type"], "sustained_frequency");
        assert_eq!(value["analysis_window"], 4.0);
        assert!(!event.is_test());
        assert!(DetectionEvent::test_event(0.0).is_test());
    }

    #[test]
    fn test_local_time_only_for_epoch_stamps() {
        assert!(DetectionEvent::test_event(13.9).local_time().is_none());
        let stamped = DetectionEvent::test_event(1_700_000_000.5).local_time().unwrap();
        assert_eq!(stamped.timestamp(), 1_700_000_000);
    }
}
