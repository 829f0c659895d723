// src/config/settings.rs
//
// Application configuration: JSON file, then environment overrides.

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::{Path, PathBuf};

use crate::core::DetectorConfig;
use crate::notify::MAX_RETRY_DELAY_SECS;

/// Prefix for environment overrides, e.g. `SMOKEWATCH__NOTIFICATIONS__NTFY__TOPIC`
pub const ENV_PREFIX: &str = "SMOKEWATCH__";
const ENV_DELIMITER: &str = "__";

pub const CONFIG_FILE_NAME: &str = "config.json";
const APP_DIR_NAME: &str = "smokewatch";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NtfyConfig {
    pub enabled: bool,
    pub topic: String,
    pub server: String,
    /// Retries after the first failed attempt
    pub max_retries: u32,
    /// Base delay before the first retry; doubles each attempt
    pub retry_delay_secs: f64,
    pub timeout_secs: u64,
}

impl Default for NtfyConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            topic: "smoke-alarm".to_string(),
            server: "https://ntfy.sh".to_string(),
            max_retries: 3,
            retry_delay_secs: 1.0,
            timeout_secs: 10,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NotificationsConfig {
    pub ntfy: NtfyConfig,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    /// Capture device name, informational for `listen`
    pub device: Option<String>,
}

/// Top-level application configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub detector: DetectorConfig,
    pub notifications: NotificationsConfig,
    pub audio: AudioConfig,
}

impl AppConfig {
    /// Load from the first config file found, then apply environment
    /// overrides from the process environment.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let path = match explicit {
            Some(path) => {
                if !path.exists() {
                    bail!("Config file not found: {}", path.display());
                }
                Some(path.to_path_buf())
            }
            None => default_search_paths().into_iter().find(|p| p.is_file()),
        };

        let value = match &path {
            Some(path) => {
                log::info!("Loading configuration from {}", path.display());
                read_json(path)?
            }
            None => {
                log::debug!("No config file found, using defaults");
                serde_json::to_value(AppConfig::default())?
            }
        };

        Self::from_value_with_env(value, std::env::vars())
    }

    /// Parse JSON text with no environment overrides
    pub fn from_json(text: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(text).context("Invalid configuration JSON")?;
        config.validate()?;
        Ok(config)
    }

    /// Build from a JSON value plus `(key, value)` environment pairs
    pub fn from_value_with_env<I>(mut value: Value, vars: I) -> Result<Self>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        if value.is_null() {
            value = Value::Object(Default::default());
        }
        for (key, raw) in vars {
            if let Some(path) = key.strip_prefix(ENV_PREFIX) {
                apply_override(&mut value, path, &raw)
                    .with_context(|| format!("Invalid environment override {}", key))?;
            }
        }

        let config: Self = serde_json::from_value(value).context("Invalid configuration")?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        let delay = self.notifications.ntfy.retry_delay_secs;
        if !(0.0..=MAX_RETRY_DELAY_SECS).contains(&delay) {
            bail!(
                "notifications.ntfy.retry_delay_secs must be between 0 and {} seconds, got {}",
                MAX_RETRY_DELAY_SECS,
                delay
            );
        }
        Ok(())
    }
}

/// `./config.json`, then the per-user config directory
pub fn default_search_paths() -> Vec<PathBuf> {
    let mut paths = vec![PathBuf::from(CONFIG_FILE_NAME)];
    if let Some(dir) = dirs::config_dir() {
        paths.push(dir.join(APP_DIR_NAME).join(CONFIG_FILE_NAME));
    }
    paths
}

fn read_json(path: &Path) -> Result<Value> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    serde_json::from_str(&text)
        .with_context(|| format!("Malformed config file: {}", path.display()))
}

/// Set `NOTIFICATIONS__NTFY__TOPIC`-style paths inside a JSON object.
fn apply_override(root: &mut Value, path: &str, raw: &str) -> Result<()> {
    let segments: Vec<String> = path
        .split(ENV_DELIMITER)
        .map(|s| s.to_lowercase())
        .collect();
    if segments.iter().any(|s| s.is_empty()) {
        bail!("empty path segment");
    }

    let mut node = root;
    for segment in &segments[..segments.len() - 1] {
        let object = node
            .as_object_mut()
            .context("override path crosses a non-object value")?;
        node = object
            .entry(segment.clone())
            .or_insert_with(|| Value::Object(Default::default()));
    }

    let object = node
        .as_object_mut()
        .context("override path crosses a non-object value")?;
    let leaf = &segments[segments.len() - 1];

    // Existing string fields stay strings even if the value looks numeric
    let keep_string = matches!(object.get(leaf), Some(Value::String(_)));
    let parsed = if keep_string {
        Value::String(raw.to_string())
    } else {
        serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
    };

    log::debug!("Config override {} = {}", segments.join("."), parsed);
    object.insert(leaf.clone(), parsed);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert!(config.notifications.ntfy.enabled);
        assert_eq!(config.notifications.ntfy.topic, "smoke-alarm");
        assert_eq!(config.notifications.ntfy.server, "https://ntfy.sh");
        assert!(config.audio.device.is_none());
        assert_eq!(config.detector, DetectorConfig::default());
    }

    #[test]
    fn test_partial_json_fills_defaults() {
        let config = AppConfig::from_json(
            r#"{ "notifications": { "ntfy": { "topic": "kitchen" } },
                 "detector": { "min_signal_ratio": 90.0 } }"#,
        )
        .unwrap();

        assert_eq!(config.notifications.ntfy.topic, "kitchen");
        assert_eq!(config.notifications.ntfy.max_retries, 3);
        assert_eq!(config.detector.min_signal_ratio, 90.0);
        assert_eq!(config.detector.chunk_size, 4096);
    }

    #[test]
    fn test_malformed_json_is_error() {
        assert!(AppConfig::from_json("{ not json").is_err());
    }

    #[test]
    fn test_env_overrides_nested_fields() {
        let base = serde_json::to_value(AppConfig::default()).unwrap();
        let config = AppConfig::from_value_with_env(
            base,
            env(&[
                ("SMOKEWATCH__NOTIFICATIONS__NTFY__TOPIC", "12345"),
                ("SMOKEWATCH__NOTIFICATIONS__NTFY__ENABLED", "false"),
                ("SMOKEWATCH__DETECTOR__TARGET_FREQUENCY", "3100"),
                ("SMOKEWATCH__AUDIO__DEVICE", "hw:1,0"),
                ("UNRELATED", "x"),
            ]),
        )
        .unwrap();

        assert_eq!(config.notifications.ntfy.topic, "12345");
        assert!(!config.notifications.ntfy.enabled);
        assert_eq!(config.detector.target_frequency, 3100.0);
        assert_eq!(config.audio.device.as_deref(), Some("hw:1,0"));
    }

    #[test]
    fn test_env_override_on_empty_document() {
        let config = AppConfig::from_value_with_env(
            Value::Null,
            env(&[("SMOKEWATCH__NOTIFICATIONS__NTFY__SERVER", "http://localhost:8080")]),
        )
        .unwrap();
        assert_eq!(config.notifications.ntfy.server, "http://localhost:8080");
        assert_eq!(config.notifications.ntfy.topic, "smoke-alarm");
    }

    #[test]
    fn test_bad_env_type_is_error() {
        let base = serde_json::to_value(AppConfig::default()).unwrap();
        let result = AppConfig::from_value_with_env(
            base,
            env(&[("SMOKEWATCH__DETECTOR__CHUNK_SIZE", "large")]),
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_out_of_range_retry_delay_is_error() {
        let base = serde_json::to_value(AppConfig::default()).unwrap();
        for raw in ["1e30", "-1", "3600.5"] {
            let result = AppConfig::from_value_with_env(
                base.clone(),
                env(&[("SMOKEWATCH__NOTIFICATIONS__NTFY__RETRY_DELAY_SECS", raw)]),
            );
            let err = result.unwrap_err();
            assert!(format!("{:#}", err).contains("retry_delay_secs"), "{:#}", err);
        }

        let config = AppConfig::from_value_with_env(
            base,
            env(&[("SMOKEWATCH__NOTIFICATIONS__NTFY__RETRY_DELAY_SECS", "2.5")]),
        )
        .unwrap();
        assert_eq!(config.notifications.ntfy.retry_delay_secs, 2.5);
    }

    #[test]
    fn test_explicit_missing_file_is_error() {
        assert!(AppConfig::load(Some(Path::new("/nonexistent/smokewatch.json"))).is_err());
    }
}
