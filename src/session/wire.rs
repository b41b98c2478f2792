//! Message types for the bidirectional generation WebSocket protocol.
//!
//! The wire format is JSON with camelCase field names. Outbound messages are
//! `setup` (once, first) and `realtimeInput` (streamed); inbound messages are
//! `setupComplete` followed by `serverContent` frames.

use crate::defaults;
use crate::error::{FluentFlowError, Result};
use serde::{Deserialize, Serialize};

/// A base64 media payload with its mime type.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Blob {
    pub mime_type: String,
    pub data: String,
}

impl Blob {
    /// 16kHz PCM microphone audio.
    pub fn audio(data: String) -> Self {
        Self {
            mime_type: defaults::AUDIO_INPUT_MIME.to_string(),
            data,
        }
    }

    /// JPEG camera snapshot.
    pub fn image(data: String) -> Self {
        Self {
            mime_type: defaults::IMAGE_MIME.to_string(),
            data,
        }
    }
}

/// Text content for the system instruction.
#[derive(Debug, Clone, Serialize)]
pub struct Content {
    pub parts: Vec<Part>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Part {
    pub text: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PrebuiltVoiceConfig {
    pub voice_name: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VoiceConfig {
    pub prebuilt_voice_config: PrebuiltVoiceConfig,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SpeechConfig {
    pub voice_config: VoiceConfig,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    pub response_modalities: Vec<String>,
    pub speech_config: SpeechConfig,
}

/// Empty objects enable input/output transcription on the server side.
#[derive(Debug, Clone, Serialize, Default)]
pub struct EmptyConfig {}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Setup {
    pub model: String,
    pub generation_config: GenerationConfig,
    pub system_instruction: Content,
    pub input_audio_transcription: EmptyConfig,
    pub output_audio_transcription: EmptyConfig,
}

/// First message on the socket: session configuration.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SetupMessage {
    pub setup: Setup,
}

impl SetupMessage {
    pub fn new(model: &str, voice: &str, system_instruction: &str) -> Self {
        Self {
            setup: Setup {
                model: model.to_string(),
                generation_config: GenerationConfig {
                    response_modalities: vec!["AUDIO".to_string()],
                    speech_config: SpeechConfig {
                        voice_config: VoiceConfig {
                            prebuilt_voice_config: PrebuiltVoiceConfig {
                                voice_name: voice.to_string(),
                            },
                        },
                    },
                },
                system_instruction: Content {
                    parts: vec![Part {
                        text: system_instruction.to_string(),
                    }],
                },
                input_audio_transcription: EmptyConfig {},
                output_audio_transcription: EmptyConfig {},
            },
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RealtimeInput {
    pub media_chunks: Vec<Blob>,
}

/// Streamed media message carrying one or more blobs.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RealtimeInputMessage {
    pub realtime_input: RealtimeInput,
}

impl RealtimeInputMessage {
    pub fn new(blob: Blob) -> Self {
        Self {
            realtime_input: RealtimeInput {
                media_chunks: vec![blob],
            },
        }
    }
}

/// Inbound message envelope. Unknown fields are ignored.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ServerMessage {
    #[serde(default)]
    pub setup_complete: Option<serde_json::Value>,
    #[serde(default)]
    pub server_content: Option<ServerContent>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ServerContent {
    #[serde(default)]
    pub model_turn: Option<ModelTurn>,
    #[serde(default)]
    pub input_transcription: Option<TranscriptionText>,
    #[serde(default)]
    pub output_transcription: Option<TranscriptionText>,
    #[serde(default)]
    pub turn_complete: bool,
    #[serde(default)]
    pub interrupted: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ModelTurn {
    #[serde(default)]
    pub parts: Vec<ServerPart>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerPart {
    #[serde(default)]
    pub inline_data: Option<Blob>,
    #[serde(default)]
    pub text: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TranscriptionText {
    #[serde(default)]
    pub text: String,
}

/// Parse one inbound frame.
///
/// # Errors
/// Returns a soft `Decode` error; the caller drops the frame and continues.
pub fn parse_server_message(payload: &str) -> Result<ServerMessage> {
    serde_json::from_str(payload).map_err(|e| FluentFlowError::Decode {
        message: format!("invalid server message: {}", e),
    })
}

/// The server sends JSON in Binary frames too; detect a JSON payload by its
/// leading byte.
pub fn looks_like_json(payload: &[u8]) -> bool {
    payload
        .iter()
        .find(|b| !b.is_ascii_whitespace())
        .is_some_and(|&b| b == b'{')
}
