//! Application configuration management.
//!
//! Handles loading, saving and validating settings: where the synced assets
//! live, which text outputs to render, how often to refresh, and the
//! persisted compatibility decision.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::assets::{AssetPaths, default_asset_directory};
use crate::compat::{ApiVersion, CompatibilityDecision, DecisionStore, NativeModuleConfig};
use crate::error::{Error, FileSystemError, Result};
use crate::output::OutputTarget;

/// Default refresh interval in milliseconds.
pub const DEFAULT_REFRESH_INTERVAL_MS: u64 = 1000;

/// Host API version the native module is built against.
pub const DEFAULT_TARGET_API_VERSION: ApiVersion = ApiVersion::new(3, 0, 0);

/// Application configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AppConfig {
    /// Cover and lyrics file locations.
    #[serde(default)]
    pub assets: AssetPaths,
    /// Text written when nothing is playing. `%s` stands for a space.
    #[serde(default)]
    pub placeholder: String,
    /// Text outputs, written in this order.
    #[serde(default)]
    pub outputs: Vec<OutputTarget>,
    /// JSON song snapshot written by the poller.
    #[serde(default = "default_snapshot_path")]
    pub snapshot_path: PathBuf,
    /// Time between refresh cycles.
    #[serde(default = "default_refresh_interval_ms")]
    pub refresh_interval_ms: u64,
    /// Version the native module expects from the host.
    #[serde(default = "default_target_api_version")]
    pub target_api_version: ApiVersion,
    /// Version the host reports. Unset means it matches the target.
    #[serde(default)]
    pub host_api_version: Option<ApiVersion>,
    /// Native module settings.
    #[serde(default)]
    pub native_module: NativeModuleConfig,
    /// Persisted answer to the last version mismatch.
    #[serde(default)]
    pub compatibility: CompatibilityDecision,
}

fn default_snapshot_path() -> PathBuf {
    default_asset_directory().join("song.json")
}

const fn default_refresh_interval_ms() -> u64 {
    DEFAULT_REFRESH_INTERVAL_MS
}

const fn default_target_api_version() -> ApiVersion {
    DEFAULT_TARGET_API_VERSION
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            assets: AssetPaths::default(),
            placeholder: String::new(),
            outputs: Vec::new(),
            snapshot_path: default_snapshot_path(),
            refresh_interval_ms: DEFAULT_REFRESH_INTERVAL_MS,
            target_api_version: DEFAULT_TARGET_API_VERSION,
            host_api_version: None,
            native_module: NativeModuleConfig::default(),
            compatibility: CompatibilityDecision::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from the default location, or create defaults if not found.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be read or parsed.
    pub fn load() -> Result<Self> {
        Self::load_from(&config_file_path())
    }

    /// Load configuration from `path`, creating it with defaults if missing.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read, parsed or validated.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!("Config file not found, using defaults");
            let config = Self::default();
            if let Err(e) = config.save_to(path) {
                warn!("Failed to save default config: {}", e);
            }
            return Ok(config);
        }

        let content = fs::read_to_string(path).map_err(|e| {
            Error::FileSystem(FileSystemError::ReadFailed {
                path: path.to_path_buf(),
                reason: format!("Failed to read config file: {e}"),
            })
        })?;

        let config: Self = serde_json::from_str(&content)
            .map_err(|e| Error::Configuration(format!("Failed to parse config file: {e}")))?;
        config.validate()?;

        info!("Loaded config from {}", path.display());
        debug!(
            "{} output(s), refresh every {} ms",
            config.outputs.len(),
            config.refresh_interval_ms
        );

        Ok(config)
    }

    /// Save configuration to the default location.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file cannot be written.
    pub fn save(&self) -> Result<()> {
        self.save_to(&config_file_path())
    }

    /// Save configuration to `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created or the file written.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            fs::create_dir_all(parent).map_err(|e| {
                Error::FileSystem(FileSystemError::CreateDirFailed {
                    path: parent.to_path_buf(),
                    reason: format!("Failed to create config directory: {e}"),
                })
            })?;
        }

        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content).map_err(|e| {
            Error::FileSystem(FileSystemError::WriteFailed {
                path: path.to_path_buf(),
                reason: format!("Failed to write config file: {e}"),
            })
        })?;

        debug!("Saved config to {}", path.display());
        Ok(())
    }

    /// Check the configuration for values the session cannot run with.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] naming the offending field.
    pub fn validate(&self) -> Result<()> {
        if self.refresh_interval_ms == 0 {
            return Err(Error::Configuration(
                "refresh_interval_ms must be greater than zero".to_string(),
            ));
        }

        let asset_paths = [
            ("assets.cover", &self.assets.cover),
            ("assets.cover_placeholder", &self.assets.cover_placeholder),
            ("assets.lyrics", &self.assets.lyrics),
        ];
        for (name, path) in asset_paths {
            if path.as_os_str().is_empty() {
                return Err(Error::Configuration(format!("{name} must not be empty")));
            }
        }

        if let Some(index) = self
            .outputs
            .iter()
            .position(|t| t.path.as_os_str().is_empty())
        {
            return Err(Error::Configuration(format!(
                "outputs[{index}].path must not be empty"
            )));
        }

        Ok(())
    }

    /// Version reported by the host.
    #[must_use]
    pub fn host_version(&self) -> ApiVersion {
        self.host_api_version.unwrap_or(self.target_api_version)
    }

    /// Get the path to the default config file.
    #[must_use]
    pub fn config_file_path() -> PathBuf {
        config_file_path()
    }
}

/// Get the path to the config file.
fn config_file_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| dirs::data_local_dir().unwrap_or_else(|| PathBuf::from(".")))
        .join("tunesync")
        .join("config.json")
}

/// Configuration manager that handles loading and caching config.
///
/// Also the durable [`DecisionStore`]: every stored decision is written back
/// to the config file.
#[derive(Debug)]
pub struct ConfigManager {
    path: PathBuf,
    config: AppConfig,
}

impl ConfigManager {
    /// Load config from the default location.
    ///
    /// # Errors
    ///
    /// Returns an error if the config cannot be loaded.
    pub fn new() -> Result<Self> {
        Self::open(config_file_path())
    }

    /// Load config from `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the config cannot be loaded.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let config = AppConfig::load_from(&path)?;
        Ok(Self { path, config })
    }

    /// Get a reference to the current configuration.
    #[must_use]
    pub const fn config(&self) -> &AppConfig {
        &self.config
    }

    /// File this manager reads and writes.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Replace and save the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the config is invalid or cannot be saved.
    pub fn update(&mut self, config: AppConfig) -> Result<()> {
        config.validate()?;
        self.config = config;
        self.config.save_to(&self.path)
    }

    /// Reset to default configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the config cannot be saved.
    pub fn reset(&mut self) -> Result<()> {
        self.config = AppConfig::default();
        self.config.save_to(&self.path)
    }
}

impl DecisionStore for ConfigManager {
    fn load_decision(&self) -> CompatibilityDecision {
        self.config.compatibility
    }

    fn store_decision(&mut self, decision: CompatibilityDecision) -> Result<()> {
        self.config.compatibility = decision;
        self.config.save_to(&self.path)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config_is_valid() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.host_version(), DEFAULT_TARGET_API_VERSION);
        assert!(config.snapshot_path.ends_with("song.json"));
    }

    #[test]
    fn test_config_serialization() {
        let config = AppConfig {
            placeholder: "%sNothing playing%s".to_string(),
            outputs: vec![
                OutputTarget::new("/tmp/now.txt", "{title}"),
                OutputTarget::log("/tmp/history.txt", "{artists} - {title}"),
            ],
            host_api_version: Some(ApiVersion::new(3, 1, 0)),
            ..Default::default()
        };

        let json = serde_json::to_string(&config).expect("Should serialize");
        let deserialized: AppConfig = serde_json::from_str(&json).expect("Should deserialize");

        assert_eq!(config, deserialized);
    }

    #[test]
    fn test_missing_fields_take_defaults() {
        let config: AppConfig =
            serde_json::from_str(r#"{"placeholder": "idle"}"#).expect("Should deserialize");
        assert_eq!(config.placeholder, "idle");
        assert_eq!(config.refresh_interval_ms, DEFAULT_REFRESH_INTERVAL_MS);
        assert_eq!(config.target_api_version, DEFAULT_TARGET_API_VERSION);
        assert!(config.outputs.is_empty());
        assert!(!config.compatibility.warning_shown);
    }

    #[test]
    fn test_load_from_missing_creates_defaults() {
        let temp_dir = TempDir::new().expect("Should create temp dir");
        let path = temp_dir.path().join("nested").join("config.json");

        let config = AppConfig::load_from(&path).expect("Should load defaults");
        assert_eq!(config, AppConfig::default());
        assert!(path.exists());
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let temp_dir = TempDir::new().expect("Should create temp dir");
        let path = temp_dir.path().join("config.json");
        let config = AppConfig {
            assets: AssetPaths::in_directory(temp_dir.path()),
            refresh_interval_ms: 250,
            ..Default::default()
        };

        config.save_to(&path).expect("Should save");
        let loaded = AppConfig::load_from(&path).expect("Should load");
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_load_from_invalid_json() {
        let temp_dir = TempDir::new().expect("Should create temp dir");
        let path = temp_dir.path().join("config.json");
        fs::write(&path, "{ not json").expect("Should write file");

        let err = AppConfig::load_from(&path).unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));
    }

    #[test]
    fn test_validate_rejects_zero_interval() {
        let config = AppConfig {
            refresh_interval_ms: 0,
            ..Default::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("refresh_interval_ms"));
    }

    #[test]
    fn test_validate_rejects_empty_paths() {
        let mut config = AppConfig::default();
        config.assets.lyrics = PathBuf::new();
        assert!(config.validate().unwrap_err().to_string().contains("assets.lyrics"));

        let config = AppConfig {
            outputs: vec![OutputTarget::new("", "{title}")],
            ..Default::default()
        };
        assert!(config.validate().unwrap_err().to_string().contains("outputs[0]"));
    }

    #[test]
    fn test_config_manager_persists_decision() {
        let temp_dir = TempDir::new().expect("Should create temp dir");
        let path = temp_dir.path().join("config.json");

        let mut manager = ConfigManager::open(&path).expect("Should open");
        assert_eq!(manager.load_decision(), CompatibilityDecision::default());

        let decision = CompatibilityDecision {
            warning_shown: true,
            force_decision: true,
            host_version: Some(ApiVersion::new(3, 1, 0)),
            ..CompatibilityDecision::default()
        };
        manager.store_decision(decision).expect("Should store");

        let reopened = ConfigManager::open(&path).expect("Should reopen");
        assert_eq!(reopened.load_decision(), decision);
    }

    #[test]
    fn test_config_manager_update_validates() {
        let temp_dir = TempDir::new().expect("Should create temp dir");
        let mut manager =
            ConfigManager::open(temp_dir.path().join("config.json")).expect("Should open");

        let bad = AppConfig {
            refresh_interval_ms: 0,
            ..Default::default()
        };
        assert!(manager.update(bad).is_err());
        assert_eq!(manager.config().refresh_interval_ms, DEFAULT_REFRESH_INTERVAL_MS);

        let good = AppConfig {
            placeholder: "idle".to_string(),
            ..Default::default()
        };
        manager.update(good).expect("Should update");
        manager.reset().expect("Should reset");
        assert_eq!(manager.config(), &AppConfig::default());
    }
}
