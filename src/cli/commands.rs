// src/cli/commands.rs
//
// Subcommand implementations

use anyhow::{anyhow, bail, Context, Result};
use colorful::Colorful;
use indicatif::{ProgressBar, ProgressStyle};
use rayon::prelude::*;
use serde::Serialize;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use super::listen::{self, Clock, PcmFormat};
use super::output;
use crate::config::AppConfig;
use crate::core::decoder::{is_audio_file, load_mono};
use crate::core::inspect::Inspector;
use crate::core::visualization::{generate_spectrogram_image, Overlay, SpectrogramConfig};
use crate::core::{replay, DetectorConfig, SmokeAlarmDetector};
use crate::detection::DetectionEvent;
use crate::evaluation::{parse_clock, EvaluationRunner};
use crate::notify::NotificationManager;
use crate::testgen::{AlarmScenario, TestSuiteGenerator};

/// Outcome of replaying one file
#[derive(Debug, Clone, Serialize)]
pub struct FileScan {
    pub file: String,
    pub duration_secs: f64,
    pub events: Vec<DetectionEvent>,
    pub error: Option<String>,
}

/// Expand directories into the audio files they contain
pub fn collect_audio_files(paths: &[PathBuf]) -> Vec<PathBuf> {
    let mut files = Vec::new();
    for path in paths {
        if path.is_file() {
            if is_audio_file(path) {
                files.push(path.clone());
            } else {
                log::warn!("Skipping {}: not a recognised audio file", path.display());
            }
        } else if path.is_dir() {
            let mut found: Vec<PathBuf> = WalkDir::new(path)
                .follow_links(true)
                .into_iter()
                .filter_map(|e| e.ok())
                .filter(|e| e.file_type().is_file() && is_audio_file(e.path()))
                .map(|e| e.into_path())
                .collect();
            found.sort();
            files.extend(found);
        } else {
            log::warn!("Skipping {}: no such file or directory", path.display());
        }
    }
    files
}

/// Replay one file through a fresh detector
pub fn scan_file(path: &Path, config: &DetectorConfig) -> Result<FileScan> {
    let samples = load_mono(path, config.sample_rate)?;
    let mut detector = SmokeAlarmDetector::new(config.clone())?;
    let report = replay(&mut detector, &samples, config.sample_rate)
        .with_context(|| format!("Detection failed on {}", path.display()))?;

    Ok(FileScan {
        file: path.display().to_string(),
        duration_secs: samples.len() as f64 / config.sample_rate as f64,
        events: report.events,
        error: None,
    })
}

pub fn scan(paths: &[PathBuf], config: &DetectorConfig, json: bool) -> Result<()> {
    let files = collect_audio_files(paths);
    if files.is_empty() {
        println!("{}", "No audio files found!".red());
        return Ok(());
    }

    let progress = ProgressBar::new(files.len() as u64);
    progress.set_style(
        ProgressStyle::with_template("{spinner} [{bar:40}] {pos}/{len} {msg}")?.progress_chars("=> "),
    );
    if json {
        progress.set_draw_target(indicatif::ProgressDrawTarget::hidden());
    }

    let scans: Vec<FileScan> = files
        .par_iter()
        .map(|path| {
            let scan = scan_file(path, config).unwrap_or_else(|e| {
                log::warn!("{}: {:#}", path.display(), e);
                FileScan {
                    file: path.display().to_string(),
                    duration_secs: 0.0,
                    events: Vec::new(),
                    error: Some(format!("{:#}", e)),
                }
            });
            progress.inc(1);
            scan
        })
        .collect();
    progress.finish_and_clear();

    if json {
        println!("{}", output::format_json(&scans)?);
    } else {
        println!("Scanned {} audio file(s)\n", scans.len());
        for scan in &scans {
            print!("{}", output::format_scan(scan));
        }
        print!("{}", output::format_scan_summary(&scans));
    }
    Ok(())
}

pub fn listen(
    input: Option<&Path>,
    format: PcmFormat,
    stream_time: bool,
    notify: bool,
    app: &AppConfig,
    config: DetectorConfig,
) -> Result<()> {
    let notifications = if notify {
        let manager = NotificationManager::from_config(&app.notifications)?;
        if manager.is_empty() {
            log::warn!("No notifiers enabled; detections will only be printed");
        }
        Some(manager)
    } else {
        None
    };
    if let Some(device) = &app.audio.device {
        log::info!("Configured capture device: {}", device);
    }

    let clock = if stream_time { Clock::Stream } else { Clock::Wall };
    let detections = match input {
        Some(path) => {
            let file = File::open(path)
                .with_context(|| format!("Failed to open PCM input {}", path.display()))?;
            listen::run(BufReader::new(file), format, config, clock, notifications)?
        }
        None => listen::run(std::io::stdin().lock(), format, config, clock, notifications)?,
    };

    println!("Stream ended: {} detection(s)", detections);
    Ok(())
}

pub fn evaluate(test_dir: &Path, single: Option<&str>, json: bool, config: DetectorConfig) -> Result<()> {
    let runner = EvaluationRunner::new(test_dir, config);
    let manifest = runner.load_manifest()?;

    if let Some(query) = single {
        let case = manifest
            .find(query)
            .ok_or_else(|| anyhow!("No test case matches {:?}", query))?;
        let result = runner.run_case(case)?;
        if json {
            println!("{}", output::format_json(&result)?);
        } else {
            print!("{}", output::format_case_detail(&result));
        }
        if !result.success {
            bail!("Test case failed: {}", result.description);
        }
        return Ok(());
    }

    println!("Running {} test case(s) from {}", manifest.test_cases.len(), test_dir.display());
    let summary = runner.run_all(&manifest);
    if json {
        println!("{}", output::format_json(&summary)?);
    } else {
        for result in &summary.results {
            println!("{}", output::format_case_line(result));
        }
        print!("{}", output::format_evaluation_summary(&summary));
    }

    if !summary.all_passed() {
        bail!("{} of {} test cases failed", summary.total - summary.passed, summary.total);
    }
    Ok(())
}

pub fn inspect(file: &Path, times: &[String], config: &DetectorConfig) -> Result<()> {
    let samples = load_mono(file, config.sample_rate)?;
    let inspector = Inspector::new(config.sample_rate);
    let duration = samples.len() as f64 / config.sample_rate as f64;

    println!("{} ({:.1}s)", file.display().to_string().cyan(), duration);
    for text in times {
        let time = parse_clock(text)?;
        match inspector.analyze_at(&samples, time) {
            Some(analysis) => print!("{}", output::format_timepoint(&analysis)),
            None => println!("{}", format!("{} is past the end of the file", text).yellow()),
        }
    }
    Ok(())
}

pub fn spectrogram(
    file: &Path,
    output_path: Option<&Path>,
    max_seconds: Option<f64>,
    with_detections: bool,
    config: &DetectorConfig,
) -> Result<()> {
    let samples = load_mono(file, config.sample_rate)?;

    let detections = if with_detections {
        let mut detector = SmokeAlarmDetector::new(config.clone())?;
        replay(&mut detector, &samples, config.sample_rate)?.detection_times()
    } else {
        Vec::new()
    };

    let output_path = match output_path {
        Some(path) => path.to_path_buf(),
        None => {
            let stem = file
                .file_stem()
                .and_then(|s| s.to_str())
                .ok_or_else(|| anyhow!("Cannot derive an output name from {}", file.display()))?;
            PathBuf::from(format!("{}.png", stem))
        }
    };

    let spectrogram_config = SpectrogramConfig {
        max_seconds,
        ..SpectrogramConfig::default()
    };
    let overlay = Overlay {
        band: Some((config.band_low(), config.band_high())),
        detections,
    };
    generate_spectrogram_image(&samples, config.sample_rate, &spectrogram_config, &overlay, &output_path)?;
    println!("Spectrogram saved to: {}", output_path.display());
    Ok(())
}

pub fn generate(output_dir: &Path) -> Result<()> {
    let generator = TestSuiteGenerator::new(output_dir)?;
    let manifest = generator.generate_suite(&AlarmScenario::all())?;
    println!(
        "Generated {} recording(s) and {} in {}",
        manifest.test_cases.len(),
        crate::evaluation::MANIFEST_FILE,
        output_dir.display()
    );
    Ok(())
}

pub fn test_notifications(app: &AppConfig) -> Result<()> {
    let manager = NotificationManager::from_config(&app.notifications)?;
    if manager.is_empty() {
        bail!("No notifiers are enabled in the configuration");
    }

    println!("Sending test notification via: {}", manager.names().join(", "));
    let event = DetectionEvent::test_event(crate::core::detector::wall_clock_seconds());
    let results = manager.notify_all(&event, true);

    let mut failed = Vec::new();
    for (name, delivered) in &results {
        if *delivered {
            println!("  {} {}", "✓".green(), name);
        } else {
            println!("  {} {}", "✗".red(), name);
            failed.push(name.as_str());
        }
    }

    if !failed.is_empty() {
        bail!("Notification failed for: {}", failed.join(", "));
    }
    Ok(())
}
