//! Tutoring call entry point.
//!
//! Orchestrates the complete call flow:
//! capture → stream → play → transcript

use crate::call::{ActiveCall, CallSettings};
use crate::config::Config;
use crate::defaults;
use crate::error::{FluentFlowError, Result};
use crate::level::ProficiencyLevel;
use crate::media::microphone::{list_input_devices, suppress_audio_warnings};
use crate::output::{self, TranscriptRenderer};
use tokio::io::AsyncBufReadExt;
use tokio::sync::mpsc::{UnboundedReceiver, unbounded_channel};

/// In-call keyboard commands, one per stdin line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ControlCommand {
    ToggleMute,
    ToggleVideo,
}

fn parse_control(line: &str) -> Option<ControlCommand> {
    match line.trim() {
        "m" | "M" => Some(ControlCommand::ToggleMute),
        "v" | "V" => Some(ControlCommand::ToggleVideo),
        _ => None,
    }
}

/// Read control keys from stdin, one per line, for the duration of the call.
fn spawn_control_reader() -> UnboundedReceiver<ControlCommand> {
    let (tx, rx) = unbounded_channel();
    tokio::spawn(async move {
        let mut lines = tokio::io::BufReader::new(tokio::io::stdin()).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            if let Some(command) = parse_control(&line)
                && tx.send(command).is_err()
            {
                return;
            }
        }
    });
    rx
}

/// CLI overrides for the call command.
#[derive(Debug, Default)]
pub struct CallOverrides {
    pub api_key: Option<String>,
    pub device: Option<String>,
    pub output_device: Option<String>,
    pub video: bool,
    pub camera: Option<u32>,
    pub model: Option<String>,
    pub voice: Option<String>,
}

/// Run the call command: open media, connect, and drive the live session
/// until the server closes or the user presses Ctrl+C.
pub async fn run_call_command(
    mut config: Config,
    level: ProficiencyLevel,
    overrides: CallOverrides,
    quiet: bool,
    _verbosity: u8,
) -> Result<()> {
    // Suppress noisy JACK/ALSA warnings before audio init
    suppress_audio_warnings();

    // Apply CLI overrides
    if let Some(key) = overrides.api_key {
        config.api.key = Some(key);
    }
    if let Some(d) = overrides.device {
        config.audio.input_device = Some(d);
    }
    if let Some(d) = overrides.output_device {
        config.audio.output_device = Some(d);
    }
    if let Some(m) = overrides.model {
        config.api.model = m;
    }
    if let Some(v) = overrides.voice {
        config.api.voice = v;
    }
    if overrides.video {
        config.video.enabled = true;
    }
    if let Some(idx) = overrides.camera {
        config.video.camera_index = idx;
    }

    let api_key = config.api.key.clone().ok_or(FluentFlowError::ApiKeyMissing)?;

    let settings = CallSettings {
        api_key,
        model: config.api.model.clone(),
        voice: config.api.voice.clone(),
        level,
        audio_input_device: config.audio.input_device.clone(),
        audio_output_device: config.audio.output_device.clone(),
        camera_index: config.video.enabled.then_some(config.video.camera_index),
    };

    output::status(quiet, &format!("Connecting ({} level)...", level.label()));

    let mut call = ActiveCall::start(settings).await?;

    output::status(
        quiet,
        "Connected. Ctrl+C hangs up; 'm' + Enter toggles mute, 'v' + Enter toggles camera.",
    );

    let controls = call.controls();
    let mut commands = spawn_control_reader();
    let mut stdin_open = true;

    let mut renderer = TranscriptRenderer::new(quiet);
    let result = {
        let run = call.run(|update| renderer.render(update));
        tokio::pin!(run);
        loop {
            tokio::select! {
                result = &mut run => break result,
                _ = tokio::signal::ctrl_c() => break Ok(()),
                command = commands.recv(), if stdin_open => match command {
                    Some(ControlCommand::ToggleMute) => {
                        let muted = controls.toggle_muted();
                        output::status(
                            quiet,
                            if muted { "Microphone muted." } else { "Microphone live." },
                        );
                    }
                    Some(ControlCommand::ToggleVideo) => {
                        let enabled = controls.toggle_video();
                        output::status(
                            quiet,
                            if enabled { "Camera snapshots on." } else { "Camera snapshots off." },
                        );
                    }
                    // stdin closed (piped input ended); the call keeps running
                    None => stdin_open = false,
                },
            }
        }
    };
    renderer.finish();

    call.hang_up().await;
    output::status(quiet, "Call ended.");

    result
}

/// Run the devices command: list audio input devices.
pub fn run_devices_command() -> Result<()> {
    let devices = list_input_devices()?;

    if devices.is_empty() {
        eprintln!("No audio input devices found");
        std::process::exit(1);
    }

    println!("Available audio input devices:");
    for (idx, device) in devices.iter().enumerate() {
        println!("  [{}] {}", idx, device);
    }

    Ok(())
}

/// Run the levels command: list proficiency levels with descriptions.
pub fn run_levels_command() {
    println!("Proficiency levels (default: intermediate):");
    for level in ProficiencyLevel::all() {
        println!("  {:<14} {}", level.to_string(), level.description());
    }
    println!();
    println!(
        "Set the API key via `api.key` in the config file or the {} environment variable.",
        defaults::API_KEY_ENV
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_api_key_fails_before_connecting() {
        let config = Config::default();
        assert!(config.api.key.is_none());

        let result = run_call_command(
            config,
            ProficiencyLevel::Intermediate,
            CallOverrides::default(),
            true,
            0,
        )
        .await;

        assert!(matches!(result, Err(FluentFlowError::ApiKeyMissing)));
    }

    #[test]
    fn test_levels_command_does_not_panic() {
        run_levels_command();
    }

    #[test]
    fn test_parse_control_commands() {
        assert_eq!(parse_control("m"), Some(ControlCommand::ToggleMute));
        assert_eq!(parse_control(" M \n"), Some(ControlCommand::ToggleMute));
        assert_eq!(parse_control("v"), Some(ControlCommand::ToggleVideo));
        assert_eq!(parse_control("V"), Some(ControlCommand::ToggleVideo));
        assert_eq!(parse_control("mute"), None);
        assert_eq!(parse_control(""), None);
    }
}
