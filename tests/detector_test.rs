// tests/detector_test.rs
//
// End-to-end behaviour of the streaming detector on synthetic recordings

mod test_utils;

use smokewatch::core::{replay_with_offset, DetectorPhase, HISTORY_CAPACITY};
use smokewatch::testgen::{white_noise, AlarmScenario, PulsePattern, ToneShape};
use smokewatch::{DetectionType, DetectorConfig, DetectorError, SmokeAlarmDetector};
use test_utils::*;

#[test]
fn test_beeping_alarm_fires_once() {
    let config = DetectorConfig::default();
    let report = detect(&config, &beeping_alarm().render());

    assert_eq!(report.events.len(), 1, "events: {:?}", report.events);
    let event = &report.events[0];
    assert!(event.timestamp > 10.0 && event.timestamp < 20.0);
    assert!((2800.0..=3600.0).contains(&event.frequency));
    assert!(event.confidence > 0.0 && event.confidence <= 1.0);
    assert!(event.strength > config.min_signal_ratio);
    assert_eq!(event.detection_type, DetectionType::SustainedFrequency);
    assert_eq!(event.analysis_window, config.alarm_sustain_threshold);
}

#[test]
fn test_continuous_tone_and_quiet_room_do_not_fire() {
    let config = DetectorConfig::default();
    assert!(!detect(&config, &AlarmScenario::continuous_tone().render()).detected());
    assert!(!detect(&config, &AlarmScenario::quiet_room().render()).detected());
}

#[test]
fn test_appended_stream_stays_latched() {
    let config = DetectorConfig::default();
    let samples = beeping_alarm().render();
    let mut detector = SmokeAlarmDetector::new(config.clone()).unwrap();

    let first = replay_with_offset(&mut detector, &samples, config.sample_rate, 0.0, |_| {}).unwrap();
    assert_eq!(first.events.len(), 1);
    assert_eq!(detector.phase(), DetectorPhase::Latched);

    let offset = first.duration_secs;
    let second = replay_with_offset(&mut detector, &samples, config.sample_rate, offset, |_| {}).unwrap();
    assert!(second.events.is_empty());
    assert_eq!(detector.phase(), DetectorPhase::Latched);
}

#[test]
fn test_latch_rearms_after_cooldown() {
    let config = DetectorConfig {
        alarm_latch_time: 20.0,
        ..DetectorConfig::default()
    };
    let scenario = AlarmScenario {
        duration_secs: 45.0,
        ..beeping_alarm()
    };

    let report = detect(&config, &scenario.render());
    let times = report.detection_times();
    assert_eq!(times.len(), 2, "detections at {:?}", times);
    assert!(times[1] - times[0] >= config.alarm_latch_time);
}

#[test]
fn test_handler_sees_every_event() {
    let config = DetectorConfig {
        alarm_latch_time: 20.0,
        ..DetectorConfig::default()
    };
    let scenario = AlarmScenario {
        duration_secs: 45.0,
        ..beeping_alarm()
    };

    let mut seen = Vec::new();
    let mut detector = SmokeAlarmDetector::new(config.clone()).unwrap();
    let report = replay_with_offset(&mut detector, &scenario.render(), config.sample_rate, 0.0, |e| {
        seen.push(e.timestamp)
    })
    .unwrap();
    assert_eq!(seen, report.detection_times());
}

#[test]
fn test_pulses_outside_band_are_ignored() {
    let scenario = AlarmScenario {
        tone_frequency: 1000.0,
        shape: ToneShape::Pulsed(PulsePattern {
            start: 10.0,
            on_secs: 0.5,
            off_secs: 0.5,
            end: None,
        }),
        ..beeping_alarm()
    };
    assert!(!detect(&DetectorConfig::default(), &scenario.render()).detected());
}

#[test]
fn test_history_is_capped() {
    let config = small_config();
    let chunk = config.chunk_size;
    let noise = white_noise(chunk * 200, 0.01, 11);
    let report = detect(&config, &noise);
    assert_eq!(report.chunks_processed, 200);

    let mut detector = SmokeAlarmDetector::new(config.clone()).unwrap();
    replay_with_offset(&mut detector, &noise, config.sample_rate, 0.0, |_| {}).unwrap();

    let history = detector.history();
    assert_eq!(history.len(), HISTORY_CAPACITY);
    // 16 learning chunks, then 184 windows of which the last 100 remain
    let oldest = history.oldest().unwrap().timestamp;
    let newest = history.newest().unwrap().timestamp;
    assert!((oldest - 100.0 * 0.032).abs() < 1e-9);
    assert!((newest - 199.0 * 0.032).abs() < 1e-9);
}

#[test]
fn test_rejected_chunks_leave_state_untouched() {
    let config = small_config();
    let mut detector = SmokeAlarmDetector::new(config.clone()).unwrap();
    let chunk = white_noise(config.chunk_size, 0.01, 5);

    for i in 0..30 {
        detector.process_audio_chunk(&chunk, Some(i as f64 * 0.032)).unwrap();
    }
    let state = detector.state().clone();
    let history_len = detector.history().len();

    let short = detector.process_audio_chunk(&chunk[..100], Some(10.0));
    assert!(matches!(
        short,
        Err(DetectorError::ChunkLength {
            expected: 256,
            actual: 100
        })
    ));

    let backwards = detector.process_audio_chunk(&chunk, Some(0.5));
    match backwards {
        Err(e @ DetectorError::NonMonotonicTimestamp { .. }) => assert!(e.is_invalid_input()),
        other => panic!("expected a timestamp error, got {:?}", other),
    }

    assert!(detector.process_audio_chunk(&chunk, Some(f64::INFINITY)).is_err());

    assert_eq!(detector.state(), &state);
    assert_eq!(detector.history().len(), history_len);
}

#[test]
fn test_corrupt_sample_does_not_poison_ambient_level() {
    let config = DetectorConfig::default();
    let mut samples = beeping_alarm().render();
    samples[100] = f32::NAN;

    let mut detector = SmokeAlarmDetector::new(config.clone()).unwrap();
    let mut events = Vec::new();
    let mut rejected = 0;
    for (i, chunk) in samples.chunks_exact(config.chunk_size).enumerate() {
        let timestamp = (i * config.chunk_size) as f64 / config.sample_rate as f64;
        match detector.process_audio_chunk(chunk, Some(timestamp)) {
            Ok(Some(event)) => events.push(event),
            Ok(None) => {}
            Err(e) => {
                assert!(matches!(e, DetectorError::NonFiniteSample { index: 100 }));
                assert!(e.is_invalid_input());
                rejected += 1;
            }
        }
    }

    assert_eq!(rejected, 1);
    assert!(detector.state().ambient_background_level.is_finite());
    assert_eq!(events.len(), 1, "events: {:?}", events);
    assert!(events[0].timestamp > 10.0);
}

#[test]
fn test_invalid_config_rejected() {
    let config = DetectorConfig {
        chunk_size: 0,
        ..DetectorConfig::default()
    };
    assert!(matches!(
        SmokeAlarmDetector::new(config),
        Err(DetectorError::InvalidConfig {
            field: "chunk_size",
            ..
        })
    ));
}

#[test]
fn test_reset_returns_to_learning() {
    let config = DetectorConfig::default();
    let samples = beeping_alarm().render();
    let mut detector = SmokeAlarmDetector::new(config.clone()).unwrap();

    replay_with_offset(&mut detector, &samples, config.sample_rate, 0.0, |_| {}).unwrap();
    detector.reset();
    assert_eq!(detector.phase(), DetectorPhase::Learning);
    assert!(detector.history().is_empty());

    // Same recording again from t = 0 detects again
    let again = replay_with_offset(&mut detector, &samples, config.sample_rate, 0.0, |_| {}).unwrap();
    assert_eq!(again.events.len(), 1);
}
