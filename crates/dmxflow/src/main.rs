//! DMXFlow - command line front end
//!
//! Loads settings and show files, prints the compiled style document or the
//! DMX frame of a show, and runs the sampling loop against the configured
//! output.

mod logging_setup;
mod monitor;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use parking_lot::Mutex;
use tracing::info;

use dmxflow_control::{transport_from_settings, DmxOutput, HeadlessRenderer, SamplingLoop};
use dmxflow_core::registry::{self, control_types, device_types};
use dmxflow_core::{compose_frame, EngineSettings, Show};
use dmxflow_io::{load_settings, load_show, save_show};

use crate::monitor::Monitor;

/// Stage lighting driven by compiled style documents
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Settings file (TOML); defaults to the user config directory
    #[arg(short, long, env = "DMXFLOW_CONFIG")]
    config: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(short, long, env = "DMXFLOW_LOG_LEVEL")]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List the built-in control and device types
    Types,
    /// Create a show file with the given devices (`type` or `type:Name`)
    New {
        path: PathBuf,
        #[arg(short, long = "device")]
        devices: Vec<String>,
    },
    /// Print the compiled style document of a show
    Style { show: PathBuf },
    /// Print the non-zero channels of a show's stored values
    Frame { show: PathBuf },
    /// Rewrite a show file in the current format
    Migrate { input: PathBuf, output: PathBuf },
    /// Run the sampling loop and send frames to the configured output
    Run {
        show: PathBuf,
        /// Print sampled values as JSON lines when they change
        #[arg(long)]
        monitor: bool,
        /// Stop after this many seconds instead of waiting for Ctrl-C
        #[arg(long)]
        seconds: Option<u64>,
    },
}

fn default_settings_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("dmxflow").join("settings.toml"))
}

fn load_engine_settings(cli: &Cli) -> Result<EngineSettings> {
    let mut settings = match cli.config.clone().or_else(default_settings_path) {
        Some(path) => load_settings(&path)
            .with_context(|| format!("Failed to load settings from {}", path.display()))?,
        None => EngineSettings::default(),
    };
    if let Some(level) = &cli.log_level {
        settings.log.level = level.clone();
    }
    Ok(settings)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let settings = load_engine_settings(&cli)?;
    let _log_guard = logging_setup::init(&settings.log)?;

    registry::init().context("Built-in types failed validation")?;

    match cli.command {
        Command::Types => print_types(),
        Command::New { path, devices } => new_show(&path, &devices),
        Command::Style { show } => {
            let show = open_show(&show)?;
            print!("{}", show.document());
            Ok(())
        }
        Command::Frame { show } => print_frame(&open_show(&show)?),
        Command::Migrate { input, output } => {
            let show = open_show(&input)?;
            save_show(&show, &output)
                .with_context(|| format!("Failed to write {}", output.display()))?;
            println!("{} -> {}", input.display(), output.display());
            Ok(())
        }
        Command::Run {
            show,
            monitor,
            seconds,
        } => run(&settings, &show, monitor, seconds).await,
    }
}

fn open_show(path: &Path) -> Result<Show> {
    load_show(path).with_context(|| format!("Failed to load show {}", path.display()))
}

fn print_types() -> Result<()> {
    println!("Control types:");
    for control in control_types().iter() {
        let properties: Vec<&str> = control
            .style_metadata()
            .iter()
            .map(|d| d.style_property.as_str())
            .collect();
        println!(
            "  {:<12} {:<10} {} ch  {}",
            control.id(),
            control.kind().name(),
            control.channel_count(),
            properties.join(", ")
        );
    }

    println!("Device types:");
    for device_type in device_types().iter() {
        let controls: Vec<String> = device_type
            .controls()
            .iter()
            .map(|binding| format!("{}@{}", binding.id(), binding.start_channel))
            .collect();
        println!(
            "  {:<16} {:>2} ch  {}",
            device_type.key(),
            device_type.total_channels(),
            controls.join(" ")
        );
    }
    Ok(())
}

fn new_show(path: &Path, devices: &[String]) -> Result<()> {
    let mut show = Show::new();
    for spec in devices {
        let (key, name) = match spec.split_once(':') {
            Some((key, name)) => (key, name.to_string()),
            None => match device_types().get(spec) {
                Some(device_type) => (spec.as_str(), device_type.display_name().to_string()),
                None => bail!("Unknown device type '{}'", spec),
            },
        };
        let id = show
            .create_device(key, name)
            .with_context(|| format!("Cannot add device '{}'", spec))?;
        if let Some(device) = show.devices().get(&id) {
            println!(
                "{:<20} {:<16} channel {}",
                device.display_name, device.device_type_key, device.start_channel
            );
        }
    }
    save_show(&show, path).with_context(|| format!("Failed to write {}", path.display()))
}

fn print_frame(show: &Show) -> Result<()> {
    let frame = compose_frame(show.devices().iter(), device_types());
    for (channel, value) in frame.as_bytes().iter().enumerate() {
        if *value != 0 {
            println!("{:>3}: {}", channel, value);
        }
    }
    Ok(())
}

async fn run(
    settings: &EngineSettings,
    show_path: &Path,
    monitor: bool,
    seconds: Option<u64>,
) -> Result<()> {
    let show = Arc::new(Mutex::new(open_show(show_path)?));
    let transport =
        transport_from_settings(&settings.output).context("Failed to open DMX output")?;

    let mut sampling = SamplingLoop::new(show, HeadlessRenderer::new());
    sampling.subscribe(Box::new(DmxOutput::new(transport)));
    if monitor {
        sampling.subscribe(Box::new(Monitor::default()));
    }

    let handle = sampling.spawn(settings.effective_tick_rate());
    match seconds {
        Some(seconds) => tokio::time::sleep(Duration::from_secs(seconds)).await,
        None => {
            info!("Running, press Ctrl-C to stop");
            tokio::signal::ctrl_c()
                .await
                .context("Failed to listen for Ctrl-C")?;
        }
    }

    if let Some(stopped) = handle.join().await {
        let stats = stopped.stats();
        info!(
            "Stopped after {} ticks ({} subscriber failures)",
            stats.ticks, stats.subscriber_failures
        );
    }
    Ok(())
}
