// tests/test_utils/mod.rs
//
// Shared helpers for the integration tests

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use smokewatch::core::{replay, ReplayReport};
use smokewatch::testgen::AlarmScenario;
use smokewatch::{DetectorConfig, SmokeAlarmDetector};

/// Fresh, empty directory under `target/` for one test
pub fn scratch_dir(name: &str) -> PathBuf {
    let dir = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("target")
        .join("test-scratch")
        .join(name);
    let _ = std::fs::remove_dir_all(&dir);
    std::fs::create_dir_all(&dir).expect("Failed to create scratch directory");
    dir
}

pub fn get_binary_path() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_smokewatch"))
}

/// Run the binary from `dir` so no stray config.json is picked up
pub fn run_smokewatch(dir: &Path, args: &[&str]) -> Output {
    Command::new(get_binary_path())
        .current_dir(dir)
        .env_remove("SMOKEWATCH_CONFIG")
        .env_remove("RUST_LOG")
        .args(args)
        .output()
        .expect("Failed to execute smokewatch")
}

/// 20 s recording: 10 s of room noise, then a beeping 3.2 kHz alarm
pub fn beeping_alarm() -> AlarmScenario {
    AlarmScenario::beeping_alarm()
}

/// Replay with a fresh detector
pub fn detect(config: &DetectorConfig, samples: &[f32]) -> ReplayReport {
    let mut detector = SmokeAlarmDetector::new(config.clone()).expect("valid config");
    replay(&mut detector, samples, config.sample_rate).expect("replay")
}

/// Small, fast configuration for state-machine tests
pub fn small_config() -> DetectorConfig {
    DetectorConfig {
        sample_rate: 8000,
        chunk_size: 256,
        ambient_learning_time: 0.5,
        ..DetectorConfig::default()
    }
}
