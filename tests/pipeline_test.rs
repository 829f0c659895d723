// tests/pipeline_test.rs
//
// File-level pipeline: WAV writing, decoding, resampling, evaluation and
// the command-line binary.

mod test_utils;

use smokewatch::cli::scan_file;
use smokewatch::core::decoder::{decode_audio, load_mono};
use smokewatch::evaluation::{EvaluationRunner, TestManifest, MANIFEST_FILE};
use smokewatch::testgen::{write_wav, AlarmScenario, TestSuiteGenerator};
use smokewatch::DetectorConfig;
use test_utils::*;

#[test]
fn test_wav_round_trip_detects_alarm() {
    let dir = scratch_dir("wav_round_trip");
    let scenario = beeping_alarm();
    let path = dir.join(scenario.file_name());
    write_wav(&path, &scenario.render(), scenario.sample_rate).unwrap();

    let audio = decode_audio(&path).unwrap();
    assert_eq!(audio.sample_rate, 44100);
    assert_eq!(audio.channels, 1);
    assert!((audio.duration_secs - 20.0).abs() < 0.01);

    let config = DetectorConfig::default();
    let samples = load_mono(&path, config.sample_rate).unwrap();
    let report = detect(&config, &samples);
    assert_eq!(report.events.len(), 1);
    assert!((2800.0..=3600.0).contains(&report.events[0].frequency));
}

#[test]
fn test_resampled_recording_detects_alarm() {
    let dir = scratch_dir("resampled");
    let scenario = AlarmScenario {
        sample_rate: 48000,
        ..beeping_alarm()
    };
    let path = dir.join("alarm_48k.wav");
    write_wav(&path, &scenario.render(), scenario.sample_rate).unwrap();

    let config = DetectorConfig::default();
    let samples = load_mono(&path, config.sample_rate).unwrap();
    assert!((samples.len() as f64 / 44100.0 - 20.0).abs() < 0.05);

    let report = detect(&config, &samples);
    assert_eq!(report.events.len(), 1);
    assert!(report.events[0].timestamp > 10.0);
}

#[test]
fn test_scan_file_reports_events() {
    let dir = scratch_dir("scan_file");
    let generator = TestSuiteGenerator::new(&dir).unwrap();
    let path = generator.generate(&beeping_alarm()).unwrap();

    let scan = scan_file(&path, &DetectorConfig::default()).unwrap();
    assert!(scan.error.is_none());
    assert_eq!(scan.events.len(), 1);
    assert!((scan.duration_secs - 20.0).abs() < 0.01);
}

#[test]
fn test_generated_suite_passes_evaluation() {
    let dir = scratch_dir("generated_suite");
    let generator = TestSuiteGenerator::new(&dir).unwrap();
    generator.generate_suite(&AlarmScenario::all()).unwrap();

    let manifest = TestManifest::load(&dir.join(MANIFEST_FILE)).unwrap();
    assert_eq!(manifest.test_cases.len(), 3);

    let runner = EvaluationRunner::new(&dir, DetectorConfig::default());
    let summary = runner.run_all(&manifest);
    assert!(summary.skipped.is_empty());
    assert_eq!(summary.total, 3);
    assert!(summary.all_passed(), "{:#?}", summary.results);
    assert_eq!(summary.total_true_positives, 1);
    assert_eq!(summary.total_false_positives, 0);
    assert!(summary.avg_latency.unwrap() > 0.0);
}

#[test]
fn test_missing_recording_is_skipped() {
    let dir = scratch_dir("missing_recording");
    std::fs::write(
        dir.join(MANIFEST_FILE),
        r#"{ "test_cases": [ { "filename": "gone.wav", "description": "Gone", "expected_alarms": ["0:10"] } ] }"#,
    )
    .unwrap();

    let runner = EvaluationRunner::new(&dir, DetectorConfig::default());
    let summary = runner.run_all(&runner.load_manifest().unwrap());
    assert_eq!(summary.total, 0);
    assert_eq!(summary.skipped, vec!["gone.wav"]);
}

#[test]
fn test_cli_generate_then_evaluate() {
    let dir = scratch_dir("cli_evaluate");

    let output = run_smokewatch(&dir, &["generate", "--output", "suite"]);
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    assert!(dir.join("suite").join(MANIFEST_FILE).exists());

    let output = run_smokewatch(&dir, &["evaluate", "--test-dir", "suite"]);
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(output.status.success(), "{}", stdout);
    assert!(stdout.contains("Passed: 3/3"));

    let output = run_smokewatch(&dir, &["evaluate", "--test-dir", "suite", "--single", "beeping", "--json"]);
    assert!(output.status.success());
    let result: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(result["success"], true);
    assert_eq!(result["filename"], "beeping_alarm.wav");
}

#[test]
fn test_cli_scan_json() {
    let dir = scratch_dir("cli_scan");
    TestSuiteGenerator::new(&dir)
        .unwrap()
        .generate_suite(&[beeping_alarm(), AlarmScenario::quiet_room()])
        .unwrap();

    let output = run_smokewatch(&dir, &["scan", "--json", "."]);
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    let scans: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let scans = scans.as_array().unwrap();
    assert_eq!(scans.len(), 2);

    let alarm = scans
        .iter()
        .find(|s| s["file"].as_str().unwrap().ends_with("beeping_alarm.wav"))
        .unwrap();
    assert_eq!(alarm["events"].as_array().unwrap().len(), 1);
}

#[test]
fn test_cli_test_notifications_fails_without_notifiers() {
    let dir = scratch_dir("cli_notifications");
    std::fs::write(
        dir.join("config.json"),
        r#"{ "notifications": { "ntfy": { "enabled": false } } }"#,
    )
    .unwrap();

    let output = run_smokewatch(&dir, &["test-notifications"]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("No notifiers are enabled"));
}

#[test]
fn test_cli_rejects_invalid_override() {
    let dir = scratch_dir("cli_invalid");
    let output = run_smokewatch(&dir, &["--occupation", "0", "presets"]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("frequency_occupation_threshold"));
}
