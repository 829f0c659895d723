//! Output formatting for CLI results

use colorful::Colorful;
use serde::Serialize;

use super::commands::FileScan;
use crate::core::inspect::TimepointAnalysis;
use crate::detection::DetectionEvent;
use crate::evaluation::{CaseResult, EvaluationSummary};

/// `m:ss.s` for stream offsets
pub fn format_clock(seconds: f64) -> String {
    let minutes = (seconds / 60.0).floor();
    format!("{}:{:04.1}", minutes as u64, seconds - minutes * 60.0)
}

fn format_when(event: &DetectionEvent) -> String {
    match event.local_time() {
        Some(time) => time.format("%Y-%m-%d %H:%M:%S").to_string(),
        None => format_clock(event.timestamp),
    }
}

fn format_times(times: &[f64]) -> String {
    if times.is_empty() {
        return "none".to_string();
    }
    times.iter().map(|&t| format_clock(t)).collect::<Vec<_>>().join(", ")
}

/// One detection, as printed by `listen` and `scan`
pub fn format_event(event: &DetectionEvent) -> String {
    format!(
        "{} at {}: {:.1} Hz, strength {:.1}, confidence {:.0}%, occupation {:.0}%",
        "SMOKE ALARM".red().bold(),
        format_when(event),
        event.frequency,
        event.strength,
        event.confidence * 100.0,
        event.frequency_occupation * 100.0
    )
}

/// Result block for one scanned file
pub fn format_scan(scan: &FileScan) -> String {
    let mut output = String::new();

    if let Some(error) = &scan.error {
        output.push_str(&format!("{} {}\n", "✗".red(), scan.file.clone().bold()));
        output.push_str(&format!("  {}\n", error.clone().yellow()));
        return output;
    }

    let (mark, verdict) = if scan.events.is_empty() {
        ("✓".green(), "no alarm".to_string().green())
    } else {
        ("!".red(), format!("{} alarm(s)", scan.events.len()).red())
    };

    output.push_str(&format!(
        "{} {} ({}, {})\n",
        mark,
        scan.file.clone().bold(),
        format_clock(scan.duration_secs),
        verdict
    ));
    for event in &scan.events {
        output.push_str(&format!("    {}\n", format_event(event)));
    }
    output
}

pub fn format_scan_summary(scans: &[FileScan]) -> String {
    let failed = scans.iter().filter(|s| s.error.is_some()).count();
    let alarms = scans
        .iter()
        .filter(|s| s.error.is_none() && !s.events.is_empty())
        .count();
    let clean = scans.len() - failed - alarms;

    let mut output = format!("\n{}\n", "Summary:".bold());
    output.push_str(&format!("  {} files scanned\n", scans.len()));
    if clean > 0 {
        output.push_str(&format!("  {}\n", format!("✓ {} without alarms", clean).green()));
    }
    if alarms > 0 {
        output.push_str(&format!("  {}\n", format!("! {} with alarms", alarms).red()));
    }
    if failed > 0 {
        output.push_str(&format!("  {}\n", format!("✗ {} unreadable", failed).yellow()));
    }
    output
}

/// One line per evaluated case
pub fn format_case_line(result: &CaseResult) -> String {
    let mark = if result.success { "PASS".green() } else { "FAIL".red() };
    format!(
        "[{}] {} - F1 {:.2} (TP {}, FP {}, FN {})",
        mark,
        result.description,
        result.metrics.f1_score,
        result.metrics.true_positives,
        result.metrics.false_positives,
        result.metrics.false_negatives
    )
}

/// Breakdown of a single case, for `evaluate --single`
pub fn format_case_detail(result: &CaseResult) -> String {
    let mut output = format!("{}\n", format_case_line(result));
    output.push_str(&format!("  File: {}\n", result.filename));
    output.push_str(&format!("  Expected: {}\n", format_times(&result.expected_times)));
    output.push_str(&format!("  Detected: {}\n", format_times(&result.detected_times)));

    for matched in &result.matching.matched {
        output.push_str(&format!(
            "    matched {} -> {} (latency {:+.1}s)\n",
            format_clock(matched.expected),
            format_clock(matched.detected),
            matched.latency()
        ));
    }
    for &missed in &result.matching.missed {
        output.push_str(&format!("    missed {}\n", format_clock(missed)));
    }
    for &spurious in &result.matching.spurious {
        output.push_str(&format!("    false alarm at {}\n", format_clock(spurious)));
    }

    output.push_str(&format!(
        "  Precision {:.2} | Recall {:.2} | F1 {:.2}\n",
        result.metrics.precision, result.metrics.recall, result.metrics.f1_score
    ));
    if let Some(latency) = result.metrics.avg_latency {
        output.push_str(&format!("  Average latency: {:.1}s\n", latency));
    }
    output
}

pub fn format_evaluation_summary(summary: &EvaluationSummary) -> String {
    let mut output = format!("\n{}\n", "Evaluation summary:".bold());
    output.push_str(&format!("  Passed: {}/{}\n", summary.passed, summary.total));
    output.push_str(&format!(
        "  Avg precision {:.2} | recall {:.2} | F1 {:.2}\n",
        summary.avg_precision, summary.avg_recall, summary.avg_f1
    ));
    output.push_str(&format!(
        "  TP {} | FP {} | FN {}\n",
        summary.total_true_positives, summary.total_false_positives, summary.total_false_negatives
    ));
    if let Some(latency) = summary.avg_latency {
        output.push_str(&format!("  Average latency: {:.1}s\n", latency));
    }
    if !summary.skipped.is_empty() {
        output.push_str(&format!(
            "  {}\n",
            format!("Skipped: {}", summary.skipped.join(", ")).yellow()
        ));
    }
    output
}

fn format_db(db: Option<f64>) -> String {
    db.map_or_else(|| "-inf".to_string(), |db| format!("{:.1}", db))
}

/// Spectrum snapshot for `inspect`
pub fn format_timepoint(analysis: &TimepointAnalysis) -> String {
    let mut output = format!(
        "{} (RMS {} dB)\n",
        format!("At {}", format_clock(analysis.time)).cyan(),
        format_db(analysis.rms_db)
    );

    output.push_str("  Top peaks:\n");
    for peak in &analysis.peaks {
        output.push_str(&format!(
            "    {:8.1} Hz  {:>7} dB\n",
            peak.frequency,
            format_db(peak.db)
        ));
    }

    output.push_str("  Band energy:\n");
    for band in &analysis.bands {
        output.push_str(&format!(
            "    {:>5.0}-{:<5.0} Hz  energy {:>7} dB  peak {:>7} dB  {}\n",
            band.low,
            band.high,
            format_db(band.energy_db),
            format_db(band.peak_db),
            band.label
        ));
    }

    if analysis.tonal_candidates.is_empty() {
        output.push_str("  No tonal candidates in 2-4 kHz\n");
    } else {
        output.push_str("  Tonal candidates:\n");
        for peak in &analysis.tonal_candidates {
            output.push_str(&format!(
                "    {}\n",
                format!("{:.1} Hz ({} dB)", peak.frequency, format_db(peak.db)).yellow()
            ));
        }
    }
    output
}

/// Pretty JSON for any result type
pub fn format_json<T: Serialize + ?Sized>(value: &T) -> anyhow::Result<String> {
    Ok(serde_json::to_string_pretty(value)?)
}
