use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::dmx::transmitter::DMX_BAUD_RATE;

/// Baud rates the configuration UI offers. DMX itself runs at 250000; the
/// slower rates exist for non-standard interfaces that resample.
pub const SUPPORTED_BAUD_RATES: [u32; 3] = [9_600, 115_200, DMX_BAUD_RATE];

/// Persisted settings for the playback engine. The schema matches the
/// `config.json` the configuration UI writes: global serial and playback
/// parameters plus one descriptor per chase.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub com_port: String,
    pub baud_rate: u32,
    pub framerate: u32,
    pub brightness: u8,
    pub chases: Vec<ChaseDescriptor>,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            com_port: String::new(),
            baud_rate: DMX_BAUD_RATE,
            framerate: 30,
            brightness: 255,
            chases: Vec::new(),
        }
    }
}

/// One chase entry: an OSC trigger address and the CSV file behind it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChaseDescriptor {
    pub osc: String,
    pub file: PathBuf,
    #[serde(rename = "loop", default)]
    pub loop_playback: bool,
    #[serde(default)]
    pub mute: bool,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Read(String),
    #[error("failed to write config file: {0}")]
    Write(String),
    #[error("failed to parse config file: {0}")]
    Parse(String),
    #[error("failed to serialize config: {0}")]
    Serialize(String),
}

/// Loads and persists `Settings` as JSON.
/// Defaults to 'config.json' in the current working directory.
pub struct ConfigManager {
    config_path: PathBuf,
    settings: Settings,
}

impl ConfigManager {
    pub fn new(config_path: Option<PathBuf>) -> Self {
        let config_path = config_path.unwrap_or_else(|| PathBuf::from("config.json"));

        Self {
            config_path,
            settings: Settings::default(),
        }
    }

    /// Load settings from the configuration file. Creates a default file if
    /// none exists yet.
    pub fn load(&mut self) -> Result<Settings, ConfigError> {
        if !self.config_path.exists() {
            self.save()?;
            return Ok(self.settings.clone());
        }

        let content = fs::read_to_string(&self.config_path)
            .map_err(|e| ConfigError::Read(e.to_string()))?;

        self.settings =
            serde_json::from_str(&content).map_err(|e| ConfigError::Parse(e.to_string()))?;
        Ok(self.settings.clone())
    }

    /// Save current settings to the configuration file.
    pub fn save(&self) -> Result<(), ConfigError> {
        if let Some(parent) = self.config_path.parent() {
            if parent != Path::new("") && parent != Path::new(".") {
                fs::create_dir_all(parent).map_err(|e| ConfigError::Write(e.to_string()))?;
            }
        }

        let content = serde_json::to_string_pretty(&self.settings)
            .map_err(|e| ConfigError::Serialize(e.to_string()))?;

        fs::write(&self.config_path, content).map_err(|e| ConfigError::Write(e.to_string()))?;

        Ok(())
    }

    /// Update settings and save to file.
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

    /// Validate settings before handing them to the engine. Violations are
    /// reported together so the caller can log them all.
    pub fn validate_settings(settings: &Settings) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if settings.framerate < 1 {
            errors.push("framerate must be at least 1".to_string());
        }
        if !SUPPORTED_BAUD_RATES.contains(&settings.baud_rate) {
            errors.push(format!(
                "baud_rate {} is not supported (expected one of {:?})",
                settings.baud_rate, SUPPORTED_BAUD_RATES
            ));
        }
        for chase in &settings.chases {
            if chase.osc.trim().is_empty() {
                errors.push(format!(
                    "chase {} has an empty OSC address",
                    chase.file.display()
                ));
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    #[test]
    fn test_config_manager_new() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("test_config.json");

        let manager = ConfigManager::new(Some(config_path.clone()));
        assert_eq!(manager.config_path(), config_path);
        assert_eq!(manager.settings(), &Settings::default());
    }

    #[test]
    fn test_save_and_load() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("test_config.json");

        let mut manager = ConfigManager::new(Some(config_path.clone()));

        let mut settings = Settings::default();
        settings.com_port = "/dev/ttyUSB0".to_string();
        settings.framerate = 44;
        settings.chases.push(ChaseDescriptor {
            osc: "/chase1".to_string(),
            file: PathBuf::from("chases/chase1.csv"),
            loop_playback: true,
            mute: false,
        });

        manager.update_settings(settings.clone()).unwrap();

        let mut manager2 = ConfigManager::new(Some(config_path));
        let loaded = manager2.load().unwrap();

        assert_eq!(loaded, settings);
    }

    #[test]
    fn test_load_creates_default_file() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.json");

        let mut manager = ConfigManager::new(Some(config_path.clone()));
        let settings = manager.load().unwrap();

        assert_eq!(settings, Settings::default());
        assert!(config_path.exists());
    }

    #[test]
    fn test_loop_field_uses_original_key() {
        let json = r#"{
            "com_port": "COM3",
            "baud_rate": 250000,
            "framerate": 30,
            "brightness": 255,
            "chases": [{"osc": "/a", "file": "a.csv", "loop": true, "mute": false}]
        }"#;
        let settings: Settings = serde_json::from_str(json).unwrap();
        assert!(settings.chases[0].loop_playback);
    }

    #[test]
    fn test_validation() {
        let mut settings = Settings::default();
        assert!(ConfigManager::validate_settings(&settings).is_ok());

        settings.framerate = 0;
        assert!(ConfigManager::validate_settings(&settings).is_err());

        settings.framerate = 30;
        settings.baud_rate = 300;
        assert!(ConfigManager::validate_settings(&settings).is_err());
        settings.baud_rate = 115_200;
        assert!(ConfigManager::validate_settings(&settings).is_ok());

        settings.chases.push(ChaseDescriptor {
            osc: "  ".to_string(),
            file: PathBuf::from("a.csv"),
            loop_playback: false,
            mute: false,
        });
        assert!(ConfigManager::validate_settings(&settings).is_err());
    }
}
