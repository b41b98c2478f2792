//! Error types for fluentflow.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum FluentFlowError {
    // Configuration errors
    #[error("Failed to parse configuration: {message}")]
    ConfigParse { message: String },

    #[error("Invalid configuration value for {key}: {message}")]
    ConfigInvalidValue { key: String, message: String },

    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),

    #[error("API key not set. Pass --api-key, set FLUENTFLOW_API_KEY, or add it to the config file")]
    ApiKeyMissing,

    // Device errors (fatal — the call cannot start or continue)
    #[error("Audio device not found: {device}")]
    AudioDeviceNotFound { device: String },

    #[error("Audio capture failed: {message}")]
    AudioCapture { message: String },

    #[error("Audio playback failed: {message}")]
    AudioPlayback { message: String },

    #[error("Camera error: {message}")]
    Camera { message: String },

    // Session errors (fatal — hang up, no retry)
    #[error("Session error: {message}")]
    Session { message: String },

    #[error("Session closed by server: {message}")]
    SessionClosed { message: String },

    // Decode errors (soft — drop the chunk, keep the call running)
    #[error("Failed to decode media chunk: {message}")]
    Decode { message: String },

    // General I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // Generic error for cases not covered above
    #[error("{0}")]
    Other(String),
}

impl FluentFlowError {
    /// True for errors that end the call (device and session failures).
    ///
    /// Decode errors are soft: the offending chunk is dropped and the
    /// call continues.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, FluentFlowError::Decode { .. })
    }
}

// Type alias for convenience
pub type Result<T> = std::result::Result<T, FluentFlowError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn test_config_parse_display() {
        let error = FluentFlowError::ConfigParse {
            message: "invalid TOML syntax".to_string(),
        };
        assert_eq!(
            error.to_string(),
            "Failed to parse configuration: invalid TOML syntax"
        );
    }

    #[test]
    fn test_config_invalid_value_display() {
        let error = FluentFlowError::ConfigInvalidValue {
            key: "video.scale".to_string(),
            message: "must be between 0 and 1".to_string(),
        };
        assert_eq!(
            error.to_string(),
            "Invalid configuration value for video.scale: must be between 0 and 1"
        );
    }

    #[test]
    fn test_api_key_missing_display() {
        let error = FluentFlowError::ApiKeyMissing;
        assert!(error.to_string().contains("FLUENTFLOW_API_KEY"));
    }

    #[test]
    fn test_audio_device_not_found_display() {
        let error = FluentFlowError::AudioDeviceNotFound {
            device: "default".to_string(),
        };
        assert_eq!(error.to_string(), "Audio device not found: default");
    }

    #[test]
    fn test_audio_capture_display() {
        let error = FluentFlowError::AudioCapture {
            message: "buffer overflow".to_string(),
        };
        assert_eq!(error.to_string(), "Audio capture failed: buffer overflow");
    }

    #[test]
    fn test_audio_playback_display() {
        let error = FluentFlowError::AudioPlayback {
            message: "no output device".to_string(),
        };
        assert_eq!(error.to_string(), "Audio playback failed: no output device");
    }

    #[test]
    fn test_camera_display() {
        let error = FluentFlowError::Camera {
            message: "device busy".to_string(),
        };
        assert_eq!(error.to_string(), "Camera error: device busy");
    }

    #[test]
    fn test_session_display() {
        let error = FluentFlowError::Session {
            message: "handshake failed".to_string(),
        };
        assert_eq!(error.to_string(), "Session error: handshake failed");
    }

    #[test]
    fn test_session_closed_display() {
        let error = FluentFlowError::SessionClosed {
            message: "quota exceeded".to_string(),
        };
        assert_eq!(
            error.to_string(),
            "Session closed by server: quota exceeded"
        );
    }

    #[test]
    fn test_decode_display() {
        let error = FluentFlowError::Decode {
            message: "odd byte count".to_string(),
        };
        assert_eq!(
            error.to_string(),
            "Failed to decode media chunk: odd byte count"
        );
    }

    #[test]
    fn test_other_display() {
        let error = FluentFlowError::Other("unexpected error".to_string());
        assert_eq!(error.to_string(), "unexpected error");
    }

    #[test]
    fn test_from_io_error() {
        let io_error = io::Error::new(io::ErrorKind::NotFound, "file not found");
        let error: FluentFlowError = io_error.into();
        assert!(error.to_string().contains("file not found"));
    }

    #[test]
    fn test_from_toml_error() {
        let toml_str = "invalid = toml = syntax";
        let toml_error = toml::from_str::<toml::Value>(toml_str).unwrap_err();
        let error: FluentFlowError = toml_error.into();
        assert!(error.to_string().contains("Configuration error"));
    }

    #[test]
    fn test_decode_is_not_fatal() {
        let error = FluentFlowError::Decode {
            message: "bad base64".to_string(),
        };
        assert!(!error.is_fatal());
    }

    #[test]
    fn test_device_and_session_errors_are_fatal() {
        let device = FluentFlowError::AudioDeviceNotFound {
            device: "default".to_string(),
        };
        let session = FluentFlowError::Session {
            message: "socket error".to_string(),
        };
        let closed = FluentFlowError::SessionClosed {
            message: "server shutdown".to_string(),
        };
        assert!(device.is_fatal());
        assert!(session.is_fatal());
        assert!(closed.is_fatal());
    }

    #[test]
    fn test_result_type_alias() {
        fn returns_result() -> Result<i32> {
            Ok(42)
        }
        assert_eq!(returns_result().unwrap(), 42);

        fn returns_error() -> Result<i32> {
            Err(FluentFlowError::Other("test error".to_string()))
        }
        assert!(returns_error().is_err());
    }

    #[test]
    fn test_error_is_send_and_sync() {
        fn assert_send<T: Send>() {}
        fn assert_sync<T: Sync>() {}

        assert_send::<FluentFlowError>();
        assert_sync::<FluentFlowError>();
    }

    #[test]
    fn test_error_debug_format() {
        let error = FluentFlowError::AudioDeviceNotFound {
            device: "hw:1".to_string(),
        };
        let debug_str = format!("{:?}", error);
        assert!(debug_str.contains("AudioDeviceNotFound"));
        assert!(debug_str.contains("hw:1"));
    }
}
