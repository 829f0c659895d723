// src/cli/mod.rs
//
// Command-line interface module

mod args;
mod commands;
pub mod listen;
mod output;

pub use args::{print_presets, Cli, Command, DetectorArgs};
pub use commands::{collect_audio_files, scan_file, FileScan};
pub use output::{format_event, format_json};

use anyhow::Result;
use clap::Parser;

use crate::config::AppConfig;

/// Parse arguments and run the selected subcommand
pub fn run() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    execute(cli)
}

/// `-v` raises the default filter to debug; RUST_LOG still wins
fn init_logging(verbose: bool) {
    let default_filter = if verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .format_timestamp_secs()
        .init();
}

pub fn execute(cli: Cli) -> Result<()> {
    let app = AppConfig::load(cli.config.as_deref())?;
    let config = cli.detector.apply(app.detector.clone())?;
    log::debug!("Detector configuration: {:?}", config);

    match cli.command {
        Command::Scan { paths, json } => commands::scan(&paths, &config, json),
        Command::Listen {
            input,
            format,
            stream_time,
            no_notify,
        } => commands::listen(input.as_deref(), format, stream_time, !no_notify, &app, config),
        Command::Evaluate {
            test_dir,
            single,
            json,
        } => commands::evaluate(&test_dir, single.as_deref(), json, config),
        Command::Inspect { file, times } => commands::inspect(&file, &times, &config),
        Command::Spectrogram {
            file,
            output,
            max_seconds,
            no_detections,
        } => commands::spectrogram(&file, output.as_deref(), max_seconds, !no_detections, &config),
        Command::Generate { output } => commands::generate(&output),
        Command::TestNotifications => commands::test_notifications(&app),
        Command::Presets => {
            print_presets(&app.detector);
            Ok(())
        }
    }
}
