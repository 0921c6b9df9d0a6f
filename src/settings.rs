use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::status::StatusOptions;
use crate::streaming::ClientOptions;

const SETTINGS_FILE_NAME: &str = "settings.json";
const CONFIG_DIR_NAME: &str = "voicewire";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VoiceSettings {
    /// Streaming endpoint URL (without query parameters).
    pub endpoint: String,

    /// Abort a connect that has not seen the transport open within this time.
    pub connection_timeout_ms: u64,

    /// Automatic transport reconnections per outage before giving up.
    pub max_reconnect_attempts: u32,

    /// Interval between keep-alive frames on an idle connection.
    pub keepalive_interval_ms: u64,

    /// Status-machine recovery retries before MAX_RETRIES_EXCEEDED.
    pub max_retries: u32,

    /// Delay before a scheduled status-machine retry fires.
    pub retry_delay_ms: u64,

    /// Listening/processing/parsing states time out after this long with no
    /// transition.
    pub state_timeout_ms: u64,

    /// Full connect-transport lifecycles before the offline fallback.
    pub max_connection_attempts: u32,

    /// Queue deferred actions while offline and drain them on reconnect.
    pub offline_enabled: bool,
}

impl Default for VoiceSettings {
    fn default() -> Self {
        Self {
            endpoint: crate::streaming::DEFAULT_ENDPOINT.to_string(),
            connection_timeout_ms: 10_000,
            max_reconnect_attempts: 3,
            keepalive_interval_ms: 8_000,
            max_retries: 3,
            retry_delay_ms: 1_000,
            state_timeout_ms: 30_000,
            max_connection_attempts: 5,
            offline_enabled: true,
        }
    }
}

impl VoiceSettings {
    /// Connection-client tunables derived from these settings.
    pub fn client_options(&self) -> ClientOptions {
        ClientOptions {
            endpoint: self.endpoint.clone(),
            connect_timeout: Duration::from_millis(self.connection_timeout_ms),
            max_reconnect_attempts: self.max_reconnect_attempts,
            keepalive_interval: Duration::from_millis(self.keepalive_interval_ms),
            ..ClientOptions::default()
        }
    }

    /// Status-machine tunables derived from these settings.
    pub fn status_options(&self) -> StatusOptions {
        StatusOptions {
            state_timeout: Duration::from_millis(self.state_timeout_ms),
            connection_timeout: Duration::from_millis(self.connection_timeout_ms),
            max_retries: self.max_retries,
            retry_delay: Duration::from_millis(self.retry_delay_ms),
            max_connection_attempts: self.max_connection_attempts,
            offline_enabled: self.offline_enabled,
        }
    }
}

fn settings_path() -> Result<PathBuf, String> {
    let dir = dirs::config_dir().ok_or_else(|| "Could not determine config directory".to_string())?;
    Ok(dir.join(CONFIG_DIR_NAME).join(SETTINGS_FILE_NAME))
}

pub fn load_settings() -> VoiceSettings {
    let path = match settings_path() {
        Ok(p) => p,
        Err(e) => {
            log::warn!("Settings: {}", e);
            return VoiceSettings::default();
        }
    };
    load_settings_from(&path)
}

pub fn load_settings_from(path: &Path) -> VoiceSettings {
    match std::fs::read_to_string(path) {
        Ok(contents) => match serde_json::from_str::<VoiceSettings>(&contents) {
            Ok(settings) => settings,
            Err(e) => {
                log::warn!("Settings: failed to parse {:?}: {}", path, e);
                VoiceSettings::default()
            }
        },
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => VoiceSettings::default(),
        Err(e) => {
            log::warn!("Settings: failed to read {:?}: {}", path, e);
            VoiceSettings::default()
        }
    }
}

pub fn save_settings(settings: &VoiceSettings) -> Result<(), String> {
    let path = settings_path()?;
    save_settings_to(&path, settings)
}

pub fn save_settings_to(path: &Path, settings: &VoiceSettings) -> Result<(), String> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .map_err(|e| format!("Failed to create config directory {:?}: {}", parent, e))?;
    }

    let contents =
        serde_json::to_string_pretty(settings).map_err(|e| format!("Serialize settings: {}", e))?;

    // Write atomically: write to a temp file in the same directory, then rename.
    // This prevents partial/corrupt settings.json if the host crashes mid-write.
    let tmp_path = path.with_extension("json.tmp");
    std::fs::write(&tmp_path, &contents)
        .map_err(|e| format!("Write temp settings {:?}: {}", tmp_path, e))?;

    // On Unix, rename will atomically replace the destination. On Windows, rename
    // fails if the destination exists, so we remove it first (ignoring NotFound).
    if cfg!(windows) {
        if path.exists() {
            if let Err(e) = std::fs::remove_file(path) {
                if e.kind() != std::io::ErrorKind::NotFound {
                    return Err(format!("Remove existing settings file {:?}: {}", path, e));
                }
            }
        }
    }

    std::fs::rename(&tmp_path, path)
        .map_err(|e| format!("Rename temp settings {:?} to {:?}: {}", tmp_path, path, e))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let settings = VoiceSettings::default();
        assert_eq!(settings.connection_timeout_ms, 10_000);
        assert_eq!(settings.max_reconnect_attempts, 3);
        assert_eq!(settings.max_retries, 3);
        assert_eq!(settings.retry_delay_ms, 1_000);
        assert_eq!(settings.state_timeout_ms, 30_000);
        assert_eq!(settings.max_connection_attempts, 5);
        assert!(settings.offline_enabled);
    }

    #[test]
    fn save_then_load_round_trips() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("settings.json");

        let mut settings = VoiceSettings::default();
        settings.max_reconnect_attempts = 7;
        settings.offline_enabled = false;

        save_settings_to(&path, &settings).expect("save");
        let loaded = load_settings_from(&path);

        assert_eq!(loaded.max_reconnect_attempts, 7);
        assert!(!loaded.offline_enabled);
        // Temp file cleaned up by the rename
        assert!(!path.with_extension("json.tmp").exists());
    }

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        let loaded = load_settings_from(&dir.path().join("nope.json"));
        assert_eq!(loaded.max_retries, VoiceSettings::default().max_retries);
    }

    #[test]
    fn corrupt_file_yields_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("settings.json");
        std::fs::write(&path, "{ not json").expect("write");

        let loaded = load_settings_from(&path);
        assert_eq!(loaded.state_timeout_ms, 30_000);
    }

    #[test]
    fn partial_file_fills_in_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("settings.json");
        std::fs::write(&path, r#"{ "max_retries": 9 }"#).expect("write");

        let loaded = load_settings_from(&path);
        assert_eq!(loaded.max_retries, 9);
        assert_eq!(loaded.retry_delay_ms, 1_000);
    }

    #[test]
    fn options_conversions_carry_values() {
        let mut settings = VoiceSettings::default();
        settings.connection_timeout_ms = 500;
        settings.state_timeout_ms = 2_000;

        let client = settings.client_options();
        assert_eq!(client.connect_timeout, Duration::from_millis(500));

        let status = settings.status_options();
        assert_eq!(status.state_timeout, Duration::from_millis(2_000));
        assert_eq!(status.connection_timeout, Duration::from_millis(500));
    }
}
