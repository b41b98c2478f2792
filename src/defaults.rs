//! Default configuration constants for fluentflow.
//!
//! This module provides shared constants used across different configuration types
//! to ensure consistency and eliminate duplication.

/// Microphone capture sample rate in Hz.
///
/// 16kHz mono is what the realtime API expects for input audio
/// (`audio/pcm;rate=16000`).
pub const INPUT_SAMPLE_RATE: u32 = 16000;

/// Model audio output sample rate in Hz.
///
/// The realtime API streams speech back as 24kHz 16-bit PCM.
pub const OUTPUT_SAMPLE_RATE: u32 = 24000;

/// Number of samples per outbound audio frame.
///
/// 4096 samples at 16kHz is 256ms per frame, small enough for the model
/// to respond mid-sentence and large enough to keep message overhead low.
pub const AUDIO_FRAME_SAMPLES: usize = 4096;

/// Interval between camera snapshots in milliseconds.
pub const SNAPSHOT_INTERVAL_MS: u64 = 1000;

/// Linear scale factor applied to camera frames before JPEG encoding.
///
/// Snapshots give the model visual context; full resolution only adds
/// bandwidth.
pub const SNAPSHOT_SCALE: f32 = 0.25;

/// JPEG quality (1-100) for camera snapshots.
pub const SNAPSHOT_JPEG_QUALITY: u8 = 60;

/// Default realtime model.
pub const DEFAULT_MODEL: &str = "models/gemini-2.5-flash-native-audio-preview-09-2025";

/// Default prebuilt voice for model speech.
pub const DEFAULT_VOICE: &str = "Zephyr";

/// WebSocket endpoint for bidirectional generation. The API key is appended
/// as a `key` query parameter.
pub const LIVE_WS_URL: &str = "wss://generativelanguage.googleapis.com/ws/google.ai.generativelanguage.v1beta.GenerativeService.BidiGenerateContent";

/// Mime type for outbound microphone audio.
pub const AUDIO_INPUT_MIME: &str = "audio/pcm;rate=16000";

/// Mime type for outbound camera snapshots.
pub const IMAGE_MIME: &str = "image/jpeg";

/// Environment variable holding the API key.
pub const API_KEY_ENV: &str = "FLUENTFLOW_API_KEY";
