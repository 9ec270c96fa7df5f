//! gazepilot - gaze and voice control layer, headless runtime.

use gazepilot::backend::{self, RuntimeOptions, SimulatedGazeMode};
use gazepilot::config;

use clap::Parser;
use std::path::PathBuf;
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(name = "gazepilot", about = "Gaze and voice control layer")]
struct Cli {
    /// Config file (default: $XDG_CONFIG_HOME/gazepilot/config.json)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Viewport size (WxH)
    #[arg(long, default_value = "1920x1080")]
    viewport: String,

    /// Simulated gaze: pattern, random-walk, still, or off
    #[arg(long, default_value = "pattern")]
    simulate: String,

    /// Exit after N seconds
    #[arg(long)]
    exit_after: Option<u64>,

    /// Switch gaze tracking on at startup (overrides the saved preference)
    #[arg(long)]
    track: bool,

    /// Do not read voice commands from stdin
    #[arg(long)]
    no_voice: bool,

    /// Animation tick period in milliseconds (overrides config)
    #[arg(long)]
    tick_ms: Option<u64>,

    /// Replay a JSON input script
    #[arg(long)]
    script: Option<PathBuf>,

    /// Start calibration immediately
    #[arg(long)]
    calibrate: bool,

    /// Print the effective config as JSON and exit
    #[arg(long)]
    print_config: bool,

    /// Show version and exit
    #[arg(long)]
    version: bool,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    if cli.version {
        println!("gazepilot {}", env!("CARGO_PKG_VERSION"));
        return Ok(());
    }

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "gazepilot=info".into()),
        )
        .init();

    let config_path = cli.config.clone().unwrap_or_else(config::default_config_path);
    let mut cfg = config::load_config(&config_path)
        .map_err(|e| anyhow::anyhow!("failed to load config '{}': {}", config_path.display(), e))?;
    if let Some(tick_ms) = cli.tick_ms {
        cfg.runtime.tick_ms = tick_ms;
    }

    if cli.print_config {
        println!("{}", serde_json::to_string_pretty(&cfg)?);
        return Ok(());
    }

    info!("gazepilot v{} starting", env!("CARGO_PKG_VERSION"));

    let (width, height) = RuntimeOptions::parse_viewport(&cli.viewport).unwrap_or_else(|| {
        warn!("Invalid viewport '{}', using 1920x1080", cli.viewport);
        (1920.0, 1080.0)
    });

    let simulate = match SimulatedGazeMode::from_str(&cli.simulate) {
        Some(mode) => mode,
        None => {
            eprintln!(
                "Unknown gaze simulation: {}. Use: pattern, random-walk, still, or off",
                cli.simulate
            );
            std::process::exit(1);
        }
    };

    let options = RuntimeOptions {
        width,
        height,
        simulate,
        exit_after: cli.exit_after,
        track: cli.track,
        voice: !cli.no_voice,
        script: cli.script,
        calibrate: cli.calibrate,
    };

    backend::run(cfg, options)
}
