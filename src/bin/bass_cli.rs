use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use bass_bridge::backend::FixedWindow;
use bass_bridge::{AppConfig, AudioSubsystem, BindingMode, DynamicBackend, LogReporter};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    name = "bass_cli",
    about = "Diagnostics for the BASS audio backend binding"
)]
struct Cli {
    /// JSON configuration file (defaults to assets/bass_config.json)
    #[arg(long)]
    config: Option<PathBuf>,
    /// Run against the in-memory backend instead of the real library
    #[arg(long)]
    stub: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Load the backend module and resolve every entry point
    Probe {
        #[arg(long)]
        host_dir: PathBuf,
    },
    /// Initialize, play a file for a while, then shut down
    Play {
        #[arg(long)]
        host_dir: PathBuf,
        #[arg(long)]
        file: PathBuf,
        #[arg(long = "loop")]
        looping: bool,
        #[arg(long)]
        volume: Option<f32>,
        #[arg(long, default_value_t = 5)]
        seconds: u64,
    },
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    match run() {
        Ok(code) => code,
        Err(err) => {
            eprintln!("Error: {err:?}");
            ExitCode::from(1)
        }
    }
}

fn run() -> Result<ExitCode> {
    let cli = Cli::parse();
    let mut config = cli
        .config
        .map(AppConfig::load_from_file)
        .unwrap_or_else(AppConfig::load);
    if cli.stub {
        config.backend.binding = BindingMode::Stub;
    }

    match cli.command {
        Commands::Probe { host_dir } => run_probe(&config, host_dir),
        Commands::Play {
            host_dir,
            file,
            looping,
            volume,
            seconds,
        } => run_play(config, host_dir, file, looping, volume, seconds),
    }
}

fn run_probe(config: &AppConfig, host_dir: PathBuf) -> Result<ExitCode> {
    if config.backend.binding == BindingMode::Stub {
        println!("stub backend: nothing to probe");
        return Ok(ExitCode::SUCCESS);
    }

    let module_path = config.backend.module_path(&host_dir);
    let symbols = DynamicBackend::probe(&module_path)
        .with_context(|| format!("probing {}", module_path.display()))?;

    println!("{}", module_path.display());
    for symbol in symbols {
        println!("  ok  {symbol}");
    }

    for candidate in config
        .plugins
        .candidate_paths(&config.backend.module_dir(&host_dir))
    {
        let present = if candidate.exists() { "present" } else { "absent" };
        println!("  plugin {} ({present})", candidate.display());
    }

    Ok(ExitCode::SUCCESS)
}

fn run_play(
    mut config: AppConfig,
    host_dir: PathBuf,
    file: PathBuf,
    looping: bool,
    volume: Option<f32>,
    seconds: u64,
) -> Result<ExitCode> {
    // No window exists in a terminal
    config.backend.require_window_handle = false;

    let mut subsystem = AudioSubsystem::initialize(
        &host_dir,
        &config,
        &FixedWindow(None),
        Arc::new(LogReporter),
    )
    .context("initializing audio subsystem")?;

    println!("backend: {}", subsystem.backend_name());
    for outcome in subsystem.plugins() {
        println!("plugin {}: {:?}", outcome.path.display(), outcome.status);
    }

    if let Some(level) = volume {
        println!("volume: {}", subsystem.set_volume(level));
    }

    if let Err(err) = subsystem.play(&file, looping) {
        subsystem.shutdown();
        bail!("playing {}: {err}", file.display());
    }

    for second in 1..=seconds {
        thread::sleep(Duration::from_secs(1));
        println!("{second:>3}s {:?}", subsystem.state());
    }

    let stopped = subsystem.stop();
    subsystem.shutdown();
    stopped.context("stopping playback")?;
    Ok(ExitCode::SUCCESS)
}
