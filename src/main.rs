use anyhow::Result;
use clap::Parser;
use fluentflow::app::{CallOverrides, run_call_command, run_devices_command, run_levels_command};
use fluentflow::cli::{Cli, Commands};
use fluentflow::config::Config;
use fluentflow::level::ProficiencyLevel;
use fluentflow::output;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    let result = match cli.command {
        None => {
            // Bare invocation starts a call with defaults
            let config = load_config(cli.config.as_deref())?;
            run_call_command(
                config,
                ProficiencyLevel::Intermediate,
                CallOverrides::default(),
                cli.quiet,
                cli.verbose,
            )
            .await
        }
        Some(Commands::Call {
            level,
            api_key,
            device,
            output_device,
            video,
            camera,
            model,
            voice,
        }) => {
            let config = load_config(cli.config.as_deref())?;
            let overrides = CallOverrides {
                api_key,
                device,
                output_device,
                video,
                camera,
                model,
                voice,
            };
            run_call_command(config, level, overrides, cli.quiet, cli.verbose).await
        }
        Some(Commands::Devices) => run_devices_command(),
        Some(Commands::Levels) => {
            run_levels_command();
            Ok(())
        }
    };

    if let Err(e) = result {
        output::error(&e.to_string());
        std::process::exit(1);
    }

    Ok(())
}

/// Initialize env_logger, respecting RUST_LOG when set.
fn init_logging(verbosity: u8) {
    let default_level = match verbosity {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .init();
}

/// Load configuration from file or use defaults.
///
/// Priority order:
/// 1. Custom config path from CLI (--config)
/// 2. Default config path (~/.config/fluentflow/config.toml)
/// 3. Built-in defaults with environment variable overrides
fn load_config(custom_path: Option<&std::path::Path>) -> Result<Config> {
    let config = if let Some(path) = custom_path {
        Config::load(path)?
    } else {
        let default_path = Config::default_path();
        Config::load_or_default(&default_path)
    };

    Ok(config.with_env_overrides())
}
