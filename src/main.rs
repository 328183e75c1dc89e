use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::atomic::Ordering;
use tracing::{info, warn};

use ambient_light::animation::{AnimationState, SharedAnimation};
use ambient_light::command::{open_source, CommandIngestor};
use ambient_light::config::Config;
use ambient_light::logging;
use ambient_light::output::open_bus;
use ambient_light::transmit_loop::TransmitLoop;

#[derive(Parser)]
#[command(name = "ambientd")]
#[command(about = "Ambient lighting daemon\n\nReceives color and brightness commands and drives an LED strip over SPI or UART.", long_about = None)]
struct Cli {
    /// Path to configuration file (JSON); built-in defaults when omitted
    config: Option<PathBuf>,

    /// Enable debug output (statistics, received commands)
    #[arg(long)]
    debug: bool,

    /// Enable detailed debug (hex dumps every frame)
    #[arg(long)]
    ddebug: bool,

    /// Print the default configuration and exit
    #[arg(long)]
    gen_config: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.gen_config {
        println!("{}", serde_json::to_string_pretty(&Config::default())?);
        return Ok(());
    }

    // ddebug implies debug
    logging::init(cli.debug || cli.ddebug, cli.ddebug);

    let config = Config::load(cli.config.as_deref()).context("Failed to load configuration")?;

    let bus = open_bus(&config.bus).context("Failed to open LED bus")?;
    let state = SharedAnimation::new(AnimationState::new(config.animation.default_brightness));

    let source = open_source(&config.command, config.animation.brightness_levels)
        .context("Failed to open command channel")?;
    let ingestor = CommandIngestor::spawn(source, state.clone())
        .context("Failed to start command ingestor")?;

    let mut transmit = TransmitLoop::new(&config.animation, bus, state, Some(ingestor));

    // Set up Ctrl-C / SIGTERM handler with graceful shutdown
    let running = transmit.get_running_flag();
    let result = ctrlc::set_handler(move || {
        running.store(false, Ordering::Relaxed);
    });
    if let Err(e) = result {
        warn!("Could not set signal handler: {}", e);
    }

    info!("started, waiting for commands on {}", config.command.path);

    // Run until a signal arrives
    transmit.run();

    info!("shutting down");
    transmit.shutdown();

    Ok(())
}
