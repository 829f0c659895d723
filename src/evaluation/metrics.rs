// src/evaluation/metrics.rs
//
// Matching detections against labelled alarm times and scoring the result

use serde::Serialize;

/// A detection may precede the labelled alarm by this much
pub const EARLY_TOLERANCE: f64 = 2.0;
/// ...or trail it by this much
pub const LATE_TOLERANCE: f64 = 30.0;
/// F1 above which a case counts as passed
pub const SUCCESS_F1: f64 = 0.8;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MatchedAlarm {
    pub expected: f64,
    pub detected: f64,
}

impl MatchedAlarm {
    /// Detection delay; negative when the detector fired early
    pub fn latency(&self) -> f64 {
        self.detected - self.expected
    }
}

/// Pairing of expected and detected alarm times
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AlarmMatching {
    pub matched: Vec<MatchedAlarm>,
    /// Expected alarms with no detection in range
    pub missed: Vec<f64>,
    /// Detections not paired with any expected alarm
    pub spurious: Vec<f64>,
}

impl AlarmMatching {
    /// Greedy matching: each expected alarm, in order, takes the first
    /// unmatched detection within the tolerance window.
    pub fn compute(expected: &[f64], detected: &[f64]) -> Self {
        let mut used = vec![false; detected.len()];
        let mut matching = Self::default();

        for &exp in expected {
            let hit = detected.iter().enumerate().find(|&(j, &det)| {
                let diff = det - exp;
                !used[j] && (-EARLY_TOLERANCE..=LATE_TOLERANCE).contains(&diff)
            });

            match hit {
                Some((j, &det)) => {
                    used[j] = true;
                    matching.matched.push(MatchedAlarm {
                        expected: exp,
                        detected: det,
                    });
                }
                None => matching.missed.push(exp),
            }
        }

        matching.spurious = detected
            .iter()
            .zip(&used)
            .filter_map(|(&d, &u)| (!u).then_some(d))
            .collect();

        matching
    }
}

/// Detection quality for one recording
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DetectionMetrics {
    pub true_positives: usize,
    pub false_positives: usize,
    pub false_negatives: usize,
    pub precision: f64,
    pub recall: f64,
    pub f1_score: f64,
    pub avg_latency: Option<f64>,
}

impl DetectionMetrics {
    pub fn from_matching(matching: &AlarmMatching) -> Self {
        let tp = matching.matched.len();
        let fp = matching.spurious.len();
        let fn_ = matching.missed.len();

        let (precision, recall, f1_score) = if tp + fp + fn_ == 0 {
            // Nothing expected and nothing detected
            (1.0, 1.0, 1.0)
        } else {
            let precision = ratio(tp, tp + fp);
            let recall = ratio(tp, tp + fn_);
            let f1 = if precision + recall > 0.0 {
                2.0 * precision * recall / (precision + recall)
            } else {
                0.0
            };
            (precision, recall, f1)
        };

        let avg_latency = if tp > 0 {
            Some(matching.matched.iter().map(|m| m.latency()).sum::<f64>() / tp as f64)
        } else {
            None
        };

        Self {
            true_positives: tp,
            false_positives: fp,
            false_negatives: fn_,
            precision,
            recall,
            f1_score,
            avg_latency,
        }
    }

    pub fn success(&self) -> bool {
        self.f1_score > SUCCESS_F1
    }
}

fn ratio(num: usize, den: usize) -> f64 {
    if den == 0 {
        0.0
    } else {
        num as f64 / den as f64
    }
}
