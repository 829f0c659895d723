// src/notify/ntfy.rs
//
// ntfy.sh push notifications over plain HTTP POST

use anyhow::{Context, Result};
use chrono::Local;
use std::time::Duration;

use super::{Notifier, RetryPolicy};
use crate::config::NtfyConfig;
use crate::detection::DetectionEvent;

const TITLE: &str = "SMOKE ALARM DETECTED!";
const TEST_PREFIX: &str = "TEST: ";
const PRIORITY: &str = "5";
const ALARM_TAGS: &str = "fire,warning";
const TEST_TAGS: &str = "test";

pub struct NtfyNotifier {
    client: reqwest::blocking::Client,
    url: String,
    topic: String,
    enabled: bool,
    retry: RetryPolicy,
}

impl NtfyNotifier {
    pub fn new(config: &NtfyConfig) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            url: format!("{}/{}", config.server.trim_end_matches('/'), config.topic),
            topic: config.topic.clone(),
            enabled: config.enabled,
            retry: RetryPolicy::new(config.max_retries, config.retry_delay_secs),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn title(is_test: bool) -> String {
        if is_test {
            format!("{}{}", TEST_PREFIX, TITLE)
        } else {
            TITLE.to_string()
        }
    }

    pub fn tags(is_test: bool) -> &'static str {
        if is_test {
            TEST_TAGS
        } else {
            ALARM_TAGS
        }
    }

    /// Notification body
    pub fn message(event: &DetectionEvent) -> String {
        format!(
            "Frequency: {:.1} Hz\nSignal Strength: {:.2}\nConfidence: {:.2}%\nTime: {}",
            event.frequency,
            event.strength,
            event.confidence * 100.0,
            // Replayed files carry relative timestamps; report the send time
            event
                .local_time()
                .unwrap_or_else(Local::now)
                .format("%Y-%m-%d %H:%M:%S")
        )
    }
}

impl Notifier for NtfyNotifier {
    fn name(&self) -> &str {
        "ntfy"
    }

    fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn retry_policy(&self) -> RetryPolicy {
        self.retry
    }

    fn send(&self, event: &DetectionEvent, is_test: bool) -> Result<()> {
        self.client
            .post(&self.url)
            .header("Title", Self::title(is_test))
            .header("Priority", PRIORITY)
            .header("Tags", Self::tags(is_test))
            .body(Self::message(event))
            .send()
            .with_context(|| format!("Request to {} failed", self.url))?
            .error_for_status()
            .context("ntfy rejected the notification")?;

        log::info!("Notification sent to ntfy topic {}", self.topic);
        Ok(())
    }
}
