use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Hue bridge connection and room selection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeSettings {
    pub ip: String,
    /// Application key obtained when pairing with the bridge
    pub username: String,
    pub room: String,
    pub poll_timeout_secs: f64,
    pub error_cooldown_secs: f64,
}

impl Default for BridgeSettings {
    fn default() -> Self {
        Self {
            ip: String::new(),
            username: String::new(),
            room: String::new(),
            poll_timeout_secs: 5.0,
            error_cooldown_secs: 5.0,
        }
    }
}

/// OpenRGB server connection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputSettings {
    pub host: String,
    pub port: u16,
    pub client_name: String,
    pub reconnect_attempts: u32,
    pub reconnect_delay_ms: u64,
}

impl Default for OutputSettings {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 6742,
            client_name: "huesync".to_string(),
            reconnect_attempts: 10,
            reconnect_delay_ms: 1000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderSettings {
    /// Ticks per second
    pub update_rate: f64,
    /// Full transitions per second
    pub transition_speed: f64,
    /// Ticks to wait for the fade to black on shutdown
    pub shutdown_ticks: u32,
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            update_rate: 10.0,
            transition_speed: 1.0,
            shutdown_ticks: 5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub bridge: BridgeSettings,
    pub output: OutputSettings,
    pub render: RenderSettings,
}

/// Loads and persists `Settings` as JSON. Defaults to `config.json` in the
/// working directory.
pub struct ConfigManager {
    config_path: PathBuf,
    settings: Settings,
}

/// Valid ranges for the numeric settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigSchema {
    pub update_rate: ConfigOption<f64>,
    pub transition_speed: ConfigOption<f64>,
    pub reconnect_attempts: ConfigOption<u32>,
    pub port: ConfigOption<u16>,
    pub poll_timeout_secs: ConfigOption<f64>,
    pub error_cooldown_secs: ConfigOption<f64>,
    pub shutdown_ticks: ConfigOption<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigOption<T> {
    pub default: T,
    pub valid_range: Option<(T, T)>,
    pub description: String,
}

/// Persisted configuration file format
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigFile {
    pub version: String,
    pub settings: Settings,
    pub created_at: String,
    pub modified_at: String,
}

impl ConfigManager {
    pub fn new(config_path: Option<PathBuf>) -> Self {
        let config_path = config_path.unwrap_or_else(|| PathBuf::from("config.json"));

        Self {
            config_path,
            settings: Settings::default(),
        }
    }

    /// Load settings from the configuration file, writing a default file
    /// first if there is none
    pub fn load(&mut self) -> Result<Settings, ConfigError> {
        if !self.config_path.exists() {
            self.save()?;
            return Ok(self.settings.clone());
        }

        let content =
            fs::read_to_string(&self.config_path).map_err(|e| ConfigError::Read(e.to_string()))?;

        let config_file: ConfigFile =
            serde_json::from_str(&content).map_err(|e| ConfigError::Parse(e.to_string()))?;

        if config_file.version != env!("CARGO_PKG_VERSION") {
            log::warn!(
                "Config file version {} doesn't match application version {}",
                config_file.version,
                env!("CARGO_PKG_VERSION")
            );
        }

        self.settings = config_file.settings;
        Ok(self.settings.clone())
    }

    pub fn save(&self) -> Result<(), ConfigError> {
        if let Some(parent) = self.config_path.parent() {
            if parent != Path::new("") && parent != Path::new(".") {
                fs::create_dir_all(parent).map_err(|e| ConfigError::Write(e.to_string()))?;
            }
        }

        let now = chrono::Utc::now().to_rfc3339();
        let config_file = ConfigFile {
            version: env!("CARGO_PKG_VERSION").to_string(),
            settings: self.settings.clone(),
            created_at: now.clone(),
            modified_at: now,
        };

        let content = serde_json::to_string_pretty(&config_file)
            .map_err(|e| ConfigError::Serialize(e.to_string()))?;

        fs::write(&self.config_path, content).map_err(|e| ConfigError::Write(e.to_string()))?;

        Ok(())
    }

    pub fn update_settings(&mut self, settings: Settings) -> Result<(), ConfigError> {
        self.settings = settings;
        self.save()
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    pub fn schema() -> ConfigSchema {
        ConfigSchema {
            update_rate: ConfigOption {
                default: 10.0,
                valid_range: Some((1.0, 120.0)),
                description: "Render ticks per second".to_string(),
            },
            transition_speed: ConfigOption {
                default: 1.0,
                valid_range: Some((0.01, 100.0)),
                description: "Color transitions per second".to_string(),
            },
            reconnect_attempts: ConfigOption {
                default: 10,
                valid_range: Some((1, 1000)),
                description: "OpenRGB connection attempts before giving up".to_string(),
            },
            port: ConfigOption {
                default: 6742,
                valid_range: Some((1, 65535)),
                description: "OpenRGB SDK server port".to_string(),
            },
            poll_timeout_secs: ConfigOption {
                default: 5.0,
                valid_range: Some((0.5, 300.0)),
                description: "Longest wait for one batch of bridge events".to_string(),
            },
            error_cooldown_secs: ConfigOption {
                default: 5.0,
                valid_range: Some((0.0, 300.0)),
                description: "Pause after a failed bridge request".to_string(),
            },
            shutdown_ticks: ConfigOption {
                default: 5,
                valid_range: Some((0, 1000)),
                description: "Ticks to wait for the fade to black on exit".to_string(),
            },
        }
    }

    /// Validate settings against the schema
    pub fn validate_settings(settings: &Settings) -> Result<(), ConfigError> {
        let mut errors = Self::range_errors(settings);

        for (name, value) in [
            ("bridge ip", &settings.bridge.ip),
            ("bridge username", &settings.bridge.username),
            ("bridge room", &settings.bridge.room),
        ] {
            if value.trim().is_empty() {
                errors.push(format!("{} must be set", name));
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Validation(errors))
        }
    }

    /// Check only the numeric settings, which the sync modules need to be
    /// in range regardless of how they are connected
    pub fn validate_ranges(settings: &Settings) -> Result<(), ConfigError> {
        let errors = Self::range_errors(settings);
        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Validation(errors))
        }
    }

    fn range_errors(settings: &Settings) -> Vec<String> {
        let mut errors = Vec::new();
        let schema = Self::schema();

        fn check<T: PartialOrd + std::fmt::Display>(
            errors: &mut Vec<String>,
            name: &str,
            value: T,
            option: &ConfigOption<T>,
        ) {
            if let Some((min, max)) = &option.valid_range {
                // written so that NaN fails too
                if !(value >= *min && value <= *max) {
                    errors.push(format!("{} must be between {} and {}", name, min, max));
                }
            }
        }

        check(&mut errors, "update_rate", settings.render.update_rate, &schema.update_rate);
        check(
            &mut errors,
            "transition_speed",
            settings.render.transition_speed,
            &schema.transition_speed,
        );
        check(
            &mut errors,
            "reconnect_attempts",
            settings.output.reconnect_attempts,
            &schema.reconnect_attempts,
        );
        check(&mut errors, "port", settings.output.port, &schema.port);
        check(
            &mut errors,
            "poll_timeout_secs",
            settings.bridge.poll_timeout_secs,
            &schema.poll_timeout_secs,
        );
        check(
            &mut errors,
            "error_cooldown_secs",
            settings.bridge.error_cooldown_secs,
            &schema.error_cooldown_secs,
        );
        check(
            &mut errors,
            "shutdown_ticks",
            settings.render.shutdown_ticks,
            &schema.shutdown_ticks,
        );

        errors
    }
}

/// `secs` as a `Duration`, or `fallback` when it is negative, not finite or
/// too large to represent
pub(crate) fn secs_to_duration(secs: f64, fallback: Duration) -> Duration {
    Duration::try_from_secs_f64(secs).unwrap_or_else(|_| {
        log::warn!("Invalid duration of {}s, using {:?}", secs, fallback);
        fallback
    })
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Read(String),
    #[error("Failed to write config file: {0}")]
    Write(String),
    #[error("Failed to parse config file: {0}")]
    Parse(String),
    #[error("Failed to serialize config: {0}")]
    Serialize(String),
    #[error("Config validation errors: {}", .0.join(", "))]
    Validation(Vec<String>),
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    fn valid_settings() -> Settings {
        let mut settings = Settings::default();
        settings.bridge.ip = "192.168.1.2".to_string();
        settings.bridge.username = "key".to_string();
        settings.bridge.room = "Office".to_string();
        settings
    }

    #[test]
    fn test_config_manager_new() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("test_config.json");

        let manager = ConfigManager::new(Some(config_path.clone()));
        assert_eq!(manager.config_path(), config_path);
        assert_eq!(manager.settings(), &Settings::default());
    }

    #[test]
    fn test_load_creates_default_file() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("nested").join("config.json");

        let mut manager = ConfigManager::new(Some(config_path.clone()));
        let settings = manager.load().unwrap();
        assert_eq!(settings, Settings::default());
        assert!(config_path.exists());
    }

    #[test]
    fn test_save_and_load() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("test_config.json");

        let mut manager = ConfigManager::new(Some(config_path.clone()));
        let mut settings = valid_settings();
        settings.render.update_rate = 30.0;
        manager.update_settings(settings).unwrap();

        let mut manager2 = ConfigManager::new(Some(config_path));
        let loaded = manager2.load().unwrap();
        assert_eq!(loaded.render.update_rate, 30.0);
        assert_eq!(loaded.bridge.room, "Office");
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.json");
        fs::write(
            &config_path,
            r#"{"version": "0.0.1", "settings": {"bridge": {"room": "Den"}},
                "created_at": "", "modified_at": ""}"#,
        )
        .unwrap();

        let loaded = ConfigManager::new(Some(config_path)).load().unwrap();
        assert_eq!(loaded.bridge.room, "Den");
        assert_eq!(loaded.bridge.poll_timeout_secs, 5.0);
        assert_eq!(loaded.output.port, 6742);
    }

    #[test]
    fn test_validation() {
        let mut settings = valid_settings();
        assert!(ConfigManager::validate_settings(&settings).is_ok());

        settings.render.update_rate = 500.0;
        assert!(ConfigManager::validate_settings(&settings).is_err());

        settings.render.update_rate = 10.0;
        settings.bridge.room = " ".to_string();
        match ConfigManager::validate_settings(&settings) {
            Err(ConfigError::Validation(errors)) => {
                assert_eq!(errors, vec!["bridge room must be set".to_string()])
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_cooldown_must_be_a_finite_non_negative_value() {
        let mut settings = valid_settings();
        for cooldown in [-1.0, f64::NAN, f64::INFINITY] {
            settings.bridge.error_cooldown_secs = cooldown;
            match ConfigManager::validate_settings(&settings) {
                Err(ConfigError::Validation(errors)) => assert_eq!(
                    errors,
                    vec!["error_cooldown_secs must be between 0 and 300".to_string()]
                ),
                other => panic!("cooldown {} accepted: {:?}", cooldown, other),
            }
        }

        settings.bridge.error_cooldown_secs = 0.0;
        assert!(ConfigManager::validate_settings(&settings).is_ok());
    }

    #[test]
    fn test_validate_ranges_ignores_connection_fields() {
        let mut settings = Settings::default();
        assert!(ConfigManager::validate_ranges(&settings).is_ok());
        assert!(ConfigManager::validate_settings(&settings).is_err());

        settings.render.update_rate = 0.0;
        assert!(ConfigManager::validate_ranges(&settings).is_err());
    }

    #[test]
    fn test_secs_to_duration_falls_back() {
        let fallback = Duration::from_secs(5);
        assert_eq!(secs_to_duration(1.5, fallback), Duration::from_millis(1500));
        assert_eq!(secs_to_duration(-1.0, fallback), fallback);
        assert_eq!(secs_to_duration(f64::NAN, fallback), fallback);
        assert_eq!(secs_to_duration(f64::INFINITY, fallback), fallback);
    }
}
