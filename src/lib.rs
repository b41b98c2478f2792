//! fluentflow - Live English tutoring calls from the terminal
//!
//! Streams microphone audio (and optional camera snapshots) to a realtime
//! voice model and plays the tutor's replies while rendering a live
//! transcript.

#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]
#![warn(clippy::let_underscore_must_use)]

pub mod app;
pub mod audio;
pub mod call;
pub mod cli;
pub mod config;
pub mod defaults;
pub mod error;
pub mod level;
pub mod media;
pub mod outbound;
pub mod output;
pub mod session;
pub mod transcript;

// Core call surface
pub use call::{ActiveCall, CallSettings, CallState};
pub use level::ProficiencyLevel;
pub use session::{LiveSession, SessionEvent};
pub use transcript::{Speaker, Transcript, TranscriptUpdate, Turn};

// Audio building blocks
pub use audio::{PlaybackScheduler, PlaybackSink};

// Error handling
pub use error::{FluentFlowError, Result};

// Config
pub use config::Config;

/// Build version string with optional git commit hash.
///
/// Returns `"0.1.0+abc1234"` when git hash is available, `"0.1.0"` otherwise.
pub fn version_string() -> String {
    let version = env!("CARGO_PKG_VERSION");
    match option_env!("GIT_HASH") {
        Some(hash) if !hash.is_empty() => format!("{}+{}", version, hash),
        _ => version.to_string(),
    }
}
