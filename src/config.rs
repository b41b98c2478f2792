use crate::defaults;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Root configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct Config {
    pub api: ApiConfig,
    pub audio: AudioConfig,
    pub video: VideoConfig,
}

/// Realtime API configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ApiConfig {
    pub key: Option<String>,
    pub model: String,
    pub voice: String,
}

/// Audio device configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct AudioConfig {
    pub input_device: Option<String>,
    pub output_device: Option<String>,
}

/// Camera configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct VideoConfig {
    /// Send camera snapshots during calls.
    pub enabled: bool,
    pub camera_index: u32,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            key: None,
            model: defaults::DEFAULT_MODEL.to_string(),
            voice: defaults::DEFAULT_VOICE.to_string(),
        }
    }
}

impl Default for VideoConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            camera_index: 0,
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// Returns an error if the file contains invalid TOML.
    /// Missing fields will use default values.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Load configuration from a file or return defaults if file doesn't exist
    ///
    /// Only returns defaults if the file is missing.
    /// Returns errors for invalid TOML.
    pub fn load_or_default(path: &Path) -> Self {
        match Self::load(path) {
            Ok(config) => config,
            Err(e) => {
                if e.downcast_ref::<std::io::Error>()
                    .map(|io_err| io_err.kind() == std::io::ErrorKind::NotFound)
                    .unwrap_or(false)
                {
                    Self::default()
                } else {
                    // Re-panic on invalid TOML or other errors
                    panic!("Failed to load config from {}: {}", path.display(), e);
                }
            }
        }
    }

    /// Apply environment variable overrides
    ///
    /// Supported environment variables:
    /// - FLUENTFLOW_API_KEY → api.key
    /// - FLUENTFLOW_MODEL → api.model
    /// - FLUENTFLOW_VOICE → api.voice
    /// - FLUENTFLOW_AUDIO_DEVICE → audio.input_device
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(key) = std::env::var(defaults::API_KEY_ENV)
            && !key.is_empty()
        {
            self.api.key = Some(key);
        }

        if let Ok(model) = std::env::var("FLUENTFLOW_MODEL")
            && !model.is_empty()
        {
            self.api.model = model;
        }

        if let Ok(voice) = std::env::var("FLUENTFLOW_VOICE")
            && !voice.is_empty()
        {
            self.api.voice = voice;
        }

        if let Ok(device) = std::env::var("FLUENTFLOW_AUDIO_DEVICE")
            && !device.is_empty()
        {
            self.audio.input_device = Some(device);
        }

        self
    }

    /// Get the default configuration file path
    ///
    /// Returns ~/.config/fluentflow/config.toml on Linux
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("fluentflow")
            .join("config.toml")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::sync::Mutex;
    use tempfile::NamedTempFile;

    // Mutex to serialize tests that modify environment variables
    static ENV_LOCK: Mutex<()> = Mutex::new(());

    // SAFETY: These helpers are only used in tests with ENV_LOCK held,
    // ensuring no concurrent access to environment variables.
    fn set_env(key: &str, value: &str) {
        unsafe { std::env::set_var(key, value) }
    }

    fn remove_env(key: &str) {
        unsafe { std::env::remove_var(key) }
    }

    fn clear_fluentflow_env() {
        remove_env("FLUENTFLOW_API_KEY");
        remove_env("FLUENTFLOW_MODEL");
        remove_env("FLUENTFLOW_VOICE");
        remove_env("FLUENTFLOW_AUDIO_DEVICE");
    }

    #[test]
    fn test_default_config_has_correct_values() {
        let config = Config::default();

        assert_eq!(config.api.key, None);
        assert_eq!(config.api.model, defaults::DEFAULT_MODEL);
        assert_eq!(config.api.voice, "Zephyr");

        assert_eq!(config.audio.input_device, None);
        assert_eq!(config.audio.output_device, None);

        assert!(!config.video.enabled);
        assert_eq!(config.video.camera_index, 0);
    }

    #[test]
    fn test_load_from_toml_file() {
        let toml_content = r#"
            [api]
            key = "test-key-123"
            model = "models/some-other-model"
            voice = "Puck"

            [audio]
            input_device = "pipewire"
            output_device = "hdmi:0"

            [video]
            enabled = true
            camera_index = 2
        "#;

        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(toml_content.as_bytes()).unwrap();

        let config = Config::load(temp_file.path()).unwrap();

        assert_eq!(config.api.key, Some("test-key-123".to_string()));
        assert_eq!(config.api.model, "models/some-other-model");
        assert_eq!(config.api.voice, "Puck");

        assert_eq!(config.audio.input_device, Some("pipewire".to_string()));
        assert_eq!(config.audio.output_device, Some("hdmi:0".to_string()));

        assert!(config.video.enabled);
        assert_eq!(config.video.camera_index, 2);
    }

    #[test]
    fn test_load_partial_config_uses_defaults() {
        let toml_content = r#"
            [api]
            key = "abc"
        "#;

        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(toml_content.as_bytes()).unwrap();

        let config = Config::load(temp_file.path()).unwrap();

        // Only the key should be overridden
        assert_eq!(config.api.key, Some("abc".to_string()));

        // Everything else should be defaults
        assert_eq!(config.api.model, defaults::DEFAULT_MODEL);
        assert_eq!(config.api.voice, "Zephyr");
        assert_eq!(config.audio.input_device, None);
        assert!(!config.video.enabled);
    }

    #[test]
    fn test_env_override_api_key() {
        let _lock = ENV_LOCK.lock().unwrap();
        clear_fluentflow_env();

        set_env("FLUENTFLOW_API_KEY", "env-key");
        let config = Config::default().with_env_overrides();

        assert_eq!(config.api.key, Some("env-key".to_string()));
        assert_eq!(config.api.model, defaults::DEFAULT_MODEL); // Not overridden

        clear_fluentflow_env();
    }

    #[test]
    fn test_env_override_all() {
        let _lock = ENV_LOCK.lock().unwrap();
        clear_fluentflow_env();

        set_env("FLUENTFLOW_API_KEY", "k");
        set_env("FLUENTFLOW_MODEL", "models/custom");
        set_env("FLUENTFLOW_VOICE", "Kore");
        set_env("FLUENTFLOW_AUDIO_DEVICE", "pulse");

        let config = Config::default().with_env_overrides();

        assert_eq!(config.api.key, Some("k".to_string()));
        assert_eq!(config.api.model, "models/custom");
        assert_eq!(config.api.voice, "Kore");
        assert_eq!(config.audio.input_device, Some("pulse".to_string()));

        clear_fluentflow_env();
    }

    #[test]
    fn test_env_override_empty_string_ignored() {
        let _lock = ENV_LOCK.lock().unwrap();
        clear_fluentflow_env();

        set_env("FLUENTFLOW_VOICE", "");
        let config = Config::default().with_env_overrides();

        // Empty string should not override default
        assert_eq!(config.api.voice, "Zephyr");

        clear_fluentflow_env();
    }

    #[test]
    fn test_invalid_toml_returns_error() {
        let invalid_toml = r#"
            [api
            key = "broken
        "#;

        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(invalid_toml.as_bytes()).unwrap();

        let result = Config::load(temp_file.path());

        assert!(result.is_err());
    }

    #[test]
    fn test_default_path_is_xdg_compliant() {
        let path = Config::default_path();
        let path_str = path.to_string_lossy();

        assert!(path_str.contains("fluentflow"));
        assert!(path_str.ends_with("config.toml"));
    }

    #[test]
    fn test_load_or_default_returns_default_for_missing_file() {
        let missing_path = Path::new("/tmp/nonexistent_fluentflow_config_12345.toml");
        let config = Config::load_or_default(missing_path);

        assert_eq!(config, Config::default());
    }

    #[test]
    #[should_panic(expected = "Failed to load config")]
    fn test_load_or_default_panics_on_invalid_toml() {
        let invalid_toml = r#"
            [api
            key = "broken
        "#;

        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(invalid_toml.as_bytes()).unwrap();

        // Should panic on invalid TOML, not return defaults
        Config::load_or_default(temp_file.path());
    }
}
