//! Pushup Player - motion-sensing pushup counter node
//!
//! Entry point: loads the configuration, wires the simulated accelerometer,
//! the logging indicator and the observer broadcast into a player node and
//! serves its resources over HTTP until Ctrl+C.

use anyhow::Result;
use clap::Parser;
use pushup_core::device::sim::{LogActuator, SimulatedSampler};
use pushup_player::config::AppConfig;
use pushup_player::{init_player, Devices};
use pushup_server::{AppState, BroadcastNotifier, ControlHandle, ServerConfig};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "pushup-player", version, about = "Pushup contest player node")]
struct Cli {
    /// Config file (default: <config_dir>/pushup-player/config.json)
    #[arg(short, long, env = "PUSHUP_CONFIG")]
    config: Option<PathBuf>,

    /// Address to bind the HTTP transport to
    #[arg(short, long)]
    bind: Option<String>,

    /// Port to listen on
    #[arg(short, long, env = "PUSHUP_PORT")]
    port: Option<u16>,

    /// Rest reading of the simulated accelerometer
    #[arg(long, default_value_t = 1024, allow_negative_numbers = true)]
    sim_rest_level: i32,

    /// Dip and rise of the simulated accelerometer, in raw units
    #[arg(long, default_value_t = 260)]
    sim_amplitude: i32,

    /// Samples spent going down (and again coming up) per simulated pushup
    #[arg(long, default_value_t = 2)]
    sim_half_cycle: usize,

    /// Samples at rest between simulated pushups
    #[arg(long, default_value_t = 6)]
    sim_rest: usize,

    /// Print the effective configuration and exit
    #[arg(long)]
    print_config: bool,

    /// Write the effective configuration to the config file before starting
    #[arg(long)]
    save_config: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive("pushup=info".parse()?),
        )
        .init();

    let cli = Cli::parse();
    let config_path = cli.config.clone().unwrap_or_else(AppConfig::path);

    let mut config = AppConfig::load(Some(config_path.as_path()));
    if let Some(bind) = cli.bind {
        config.bind_addr = bind;
    }
    if let Some(port) = cli.port {
        config.port = port;
    }

    if cli.print_config {
        println!("{}", serde_json::to_string_pretty(&config)?);
        return Ok(());
    }
    if cli.save_config {
        config.save(&config_path)?;
    }

    info!(version = pushup_player::VERSION, "Pushup player starting");

    let sampler = SimulatedSampler::new(
        cli.sim_rest_level,
        cli.sim_amplitude,
        cli.sim_half_cycle,
        cli.sim_rest,
    );
    info!(
        reads_per_pushup = sampler.cycle_len(),
        "No accelerometer attached, using simulated motion"
    );

    let notifier = BroadcastNotifier::default();
    let devices = Devices::new(
        Arc::new(sampler),
        Arc::new(LogActuator::new()),
        Arc::new(notifier.clone()),
    );
    let surface = init_player(devices, config.game.clone());
    let control = ControlHandle::spawn(surface)?;

    let server_config = ServerConfig {
        port: config.port,
        bind_addr: config.bind_addr.clone(),
    };
    let state = AppState::new(control, &notifier, server_config);

    // Set up Ctrl+C handler
    let (shutdown_tx, mut shutdown_rx) = tokio::sync::watch::channel(false);
    ctrlc::set_handler(move || {
        let _ = shutdown_tx.send(true);
    })?;
    let shutdown = async move {
        // Only `true` is ever sent; a closed channel also means stop
        let _ = shutdown_rx.changed().await;
        info!("Shutdown requested");
    };

    if let Err(e) = pushup_server::start_server(state, shutdown).await {
        tracing::error!("Server error: {}", e);
        return Err(e);
    }

    info!("Pushup player stopped");
    Ok(())
}
