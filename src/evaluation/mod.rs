//! Evaluation of the detector against labelled recordings
//!
//! A test directory holds audio files plus a `test_cases.json` manifest
//! listing when alarms are audible in each recording.

mod metrics;

pub use metrics::{
    AlarmMatching, DetectionMetrics, MatchedAlarm, EARLY_TOLERANCE, LATE_TOLERANCE, SUCCESS_F1,
};

use anyhow::{bail, Context, Result};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::core::decoder::load_mono;
use crate::core::{replay, DetectorConfig, SmokeAlarmDetector};

pub const MANIFEST_FILE: &str = "test_cases.json";

/// Labelled alarm time: seconds, or a `"m:ss"` string
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AlarmTime {
    Seconds(f64),
    Clock(String),
}

impl AlarmTime {
    pub fn to_seconds(&self) -> Result<f64> {
        match self {
            AlarmTime::Seconds(s) => Ok(*s),
            AlarmTime::Clock(text) => parse_clock(text),
        }
    }
}

/// Parse `"m:ss"` (or plain seconds) into seconds
pub fn parse_clock(text: &str) -> Result<f64> {
    let text = text.trim();
    match text.split_once(':') {
        Some((minutes, seconds)) => {
            let minutes: f64 = minutes
                .parse()
                .with_context(|| format!("Invalid minutes in {:?}", text))?;
            let seconds: f64 = seconds
                .parse()
                .with_context(|| format!("Invalid seconds in {:?}", text))?;
            Ok(minutes * 60.0 + seconds)
        }
        None => text
            .parse()
            .with_context(|| format!("Invalid timestamp {:?}", text)),
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestCase {
    pub filename: String,
    pub description: String,
    #[serde(default)]
    pub expected_alarms: Vec<AlarmTime>,
    #[serde(default)]
    pub duration: Option<serde_json::Value>,
}

impl TestCase {
    /// Expected alarm times in seconds; unparseable entries are skipped
    pub fn expected_seconds(&self) -> Vec<f64> {
        self.expected_alarms
            .iter()
            .filter_map(|t| match t.to_seconds() {
                Ok(s) => Some(s),
                Err(e) => {
                    log::warn!("{}: {:#}", self.filename, e);
                    None
                }
            })
            .collect()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestManifest {
    pub test_cases: Vec<TestCase>,
}

impl TestManifest {
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read test manifest: {}", path.display()))?;
        serde_json::from_str(&text)
            .with_context(|| format!("Malformed test manifest: {}", path.display()))
    }

    /// Find a case by 1-based index or by a case-insensitive substring of
    /// its description or filename
    pub fn find(&self, query: &str) -> Option<&TestCase> {
        if let Ok(index) = query.parse::<usize>() {
            return index.checked_sub(1).and_then(|i| self.test_cases.get(i));
        }
        let needle = query.to_lowercase();
        self.test_cases.iter().find(|case| {
            case.description.to_lowercase().contains(&needle)
                || case.filename.to_lowercase().contains(&needle)
        })
    }
}

/// Outcome of one test case
#[derive(Debug, Clone, Serialize)]
pub struct CaseResult {
    pub description: String,
    pub filename: String,
    pub expected_times: Vec<f64>,
    pub detected_times: Vec<f64>,
    pub matching: AlarmMatching,
    pub metrics: DetectionMetrics,
    pub success: bool,
}

impl CaseResult {
    pub fn evaluate(case: &TestCase, detected_times: Vec<f64>) -> Self {
        let expected_times = case.expected_seconds();
        let matching = AlarmMatching::compute(&expected_times, &detected_times);
        let metrics = DetectionMetrics::from_matching(&matching);
        Self {
            description: case.description.clone(),
            filename: case.filename.clone(),
            expected_times,
            detected_times,
            success: metrics.success(),
            matching,
            metrics,
        }
    }
}

/// Aggregate over all evaluated cases
#[derive(Debug, Clone, Serialize)]
pub struct EvaluationSummary {
    pub results: Vec<CaseResult>,
    /// Cases skipped because their audio could not be loaded
    pub skipped: Vec<String>,
    pub passed: usize,
    pub total: usize,
    pub avg_precision: f64,
    pub avg_recall: f64,
    pub avg_f1: f64,
    pub total_true_positives: usize,
    pub total_false_positives: usize,
    pub total_false_negatives: usize,
    pub avg_latency: Option<f64>,
}

impl EvaluationSummary {
    pub fn from_results(results: Vec<CaseResult>, skipped: Vec<String>) -> Self {
        let total = results.len();
        let mean = |f: &dyn Fn(&CaseResult) -> f64| {
            if total == 0 {
                0.0
            } else {
                results.iter().map(f).sum::<f64>() / total as f64
            }
        };
        let avg_precision = mean(&|r| r.metrics.precision);
        let avg_recall = mean(&|r| r.metrics.recall);
        let avg_f1 = mean(&|r| r.metrics.f1_score);

        let latencies: Vec<f64> = results.iter().filter_map(|r| r.metrics.avg_latency).collect();
        let avg_latency = if latencies.is_empty() {
            None
        } else {
            Some(latencies.iter().sum::<f64>() / latencies.len() as f64)
        };

        Self {
            passed: results.iter().filter(|r| r.success).count(),
            total,
            avg_precision,
            avg_recall,
            avg_f1,
            total_true_positives: results.iter().map(|r| r.metrics.true_positives).sum(),
            total_false_positives: results.iter().map(|r| r.metrics.false_positives).sum(),
            total_false_negatives: results.iter().map(|r| r.metrics.false_negatives).sum(),
            avg_latency,
            results,
            skipped,
        }
    }

    pub fn all_passed(&self) -> bool {
        self.passed == self.total
    }
}

/// Runs test cases from a directory, one fresh detector per recording
pub struct EvaluationRunner {
    test_dir: PathBuf,
    config: DetectorConfig,
}

impl EvaluationRunner {
    pub fn new(test_dir: impl Into<PathBuf>, config: DetectorConfig) -> Self {
        Self {
            test_dir: test_dir.into(),
            config,
        }
    }

    pub fn manifest_path(&self) -> PathBuf {
        self.test_dir.join(MANIFEST_FILE)
    }

    pub fn load_manifest(&self) -> Result<TestManifest> {
        let path = self.manifest_path();
        if !path.exists() {
            bail!(
                "No test cases found. Add test cases to {}",
                path.display()
            );
        }
        TestManifest::load(&path)
    }

    /// Replay one recording and return the detection timestamps
    pub fn detect(&self, case: &TestCase) -> Result<Vec<f64>> {
        let path = self.test_dir.join(&case.filename);
        if !path.exists() {
            bail!("Audio file not found: {}", path.display());
        }
        let samples = load_mono(&path, self.config.sample_rate)?;
        let mut detector = SmokeAlarmDetector::new(self.config.clone())?;
        let report = replay(&mut detector, &samples, self.config.sample_rate)
            .with_context(|| format!("Detection failed on {}", path.display()))?;
        Ok(report.detection_times())
    }

    pub fn run_case(&self, case: &TestCase) -> Result<CaseResult> {
        let detected = self.detect(case)?;
        Ok(CaseResult::evaluate(case, detected))
    }

    /// Evaluate every case in parallel. Cases whose audio cannot be
    /// loaded are reported as skipped rather than failing the run.
    pub fn run_all(&self, manifest: &TestManifest) -> EvaluationSummary {
        let outcomes: Vec<(String, Result<CaseResult>)> = manifest
            .test_cases
            .par_iter()
            .map(|case| (case.filename.clone(), self.run_case(case)))
            .collect();

        let mut results = Vec::new();
        let mut skipped = Vec::new();
        for (filename, outcome) in outcomes {
            match outcome {
                Ok(result) => results.push(result),
                Err(e) => {
                    log::warn!("Skipping {}: {:#}", filename, e);
                    skipped.push(filename);
                }
            }
        }

        EvaluationSummary::from_results(results, skipped)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manifest() -> TestManifest {
        serde_json::from_str(
            r#"{ "test_cases": [
                { "filename": "kitchen.wav", "description": "Kitchen alarm",
                  "expected_alarms": ["0:45", 90, "1:10.5"] },
                { "filename": "music.flac", "description": "Background music" }
            ] }"#,
        )
        .unwrap()
    }

    #[test]
    fn test_parse_clock() {
        assert_eq!(parse_clock("0:45").unwrap(), 45.0);
        assert_eq!(parse_clock("2:03.5").unwrap(), 123.5);
        assert_eq!(parse_clock("17").unwrap(), 17.0);
        assert!(parse_clock("ab:cd").is_err());
    }

    #[test]
    fn test_manifest_alarm_formats() {
        let manifest = manifest();
        assert_eq!(manifest.test_cases[0].expected_seconds(), vec![45.0, 90.0, 70.5]);
        assert!(manifest.test_cases[1].expected_seconds().is_empty());
    }

    #[test]
    fn test_find_case() {
        let manifest = manifest();
        assert_eq!(manifest.find("2").unwrap().filename, "music.flac");
        assert_eq!(manifest.find("KITCHEN").unwrap().filename, "kitchen.wav");
        assert_eq!(manifest.find("flac").unwrap().description, "Background music");
        assert!(manifest.find("0").is_none());
        assert!(manifest.find("3").is_none());
        assert!(manifest.find("garage").is_none());
    }

    #[test]
    fn test_invalid_alarm_is_skipped() {
        let case = TestCase {
            filename: "x.wav".to_string(),
            description: "x".to_string(),
            expected_alarms: vec![AlarmTime::Clock("soon".to_string()), AlarmTime::Seconds(3.0)],
            duration: None,
        };
        assert_eq!(case.expected_seconds(), vec![3.0]);
    }

    #[test]
    fn test_summary_aggregates() {
        let manifest = manifest();
        let results = vec![
            CaseResult::evaluate(&manifest.test_cases[0], vec![47.0, 91.0, 72.0]),
            CaseResult::evaluate(&manifest.test_cases[1], vec![30.0]),
        ];
        let summary = EvaluationSummary::from_results(results, vec!["missing.wav".to_string()]);

        assert_eq!(summary.total, 2);
        assert_eq!(summary.passed, 1);
        assert!(!summary.all_passed());
        assert_eq!(summary.total_true_positives, 3);
        assert_eq!(summary.total_false_positives, 1);
        assert!((summary.avg_f1 - 0.5).abs() < 1e-12);
        assert!((summary.avg_latency.unwrap() - 1.5).abs() < 1e-12);
        assert_eq!(summary.skipped, vec!["missing.wav"]);
    }

    #[test]
    fn test_missing_manifest_is_error() {
        let runner = EvaluationRunner::new("/nonexistent/test_audio", DetectorConfig::default());
        assert!(runner.load_manifest().is_err());
    }
}
