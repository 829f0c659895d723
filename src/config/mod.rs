//! Configuration for smokewatch: the JSON settings file and detector presets

mod presets;
mod settings;

pub use presets::{DetectorConfigBuilder, DetectorPreset};
pub use settings::{
    default_search_paths, AppConfig, AudioConfig, NotificationsConfig, NtfyConfig,
    CONFIG_FILE_NAME, ENV_PREFIX,
};
