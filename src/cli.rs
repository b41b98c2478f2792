//! Command-line interface for fluentflow
//!
//! Provides argument parsing using clap derive macros.

use crate::level::ProficiencyLevel;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Live English tutoring calls from the terminal
#[derive(Parser, Debug)]
#[command(
    name = "fluentflow",
    version,
    about = "Live English tutoring calls from the terminal"
)]
pub struct Cli {
    /// Subcommand to execute (default: call)
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Path to configuration file
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Suppress transcript output (quiet mode)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Verbose output (-v: info, -vv: full diagnostics)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start a tutoring call
    Call {
        /// Proficiency level (beginner, intermediate, advanced, business)
        #[arg(long, short, value_name = "LEVEL", default_value = "intermediate", value_parser = parse_level)]
        level: ProficiencyLevel,

        /// API key (overrides config file and FLUENTFLOW_API_KEY)
        #[arg(long, value_name = "KEY")]
        api_key: Option<String>,

        /// Audio input device (e.g., pipewire)
        #[arg(long, value_name = "DEVICE")]
        device: Option<String>,

        /// Audio output device
        #[arg(long, value_name = "DEVICE")]
        output_device: Option<String>,

        /// Send camera snapshots during the call
        #[arg(long)]
        video: bool,

        /// Camera index to use with --video
        #[arg(long, value_name = "INDEX")]
        camera: Option<u32>,

        /// Realtime model override
        #[arg(long, value_name = "MODEL")]
        model: Option<String>,

        /// Voice name override
        #[arg(long, value_name = "VOICE")]
        voice: Option<String>,
    },

    /// List available audio input devices
    Devices,

    /// List proficiency levels
    Levels,
}

fn parse_level(s: &str) -> std::result::Result<ProficiencyLevel, String> {
    s.parse()
}
