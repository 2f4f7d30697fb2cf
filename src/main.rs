//! CLI entry point for telemetry-dash.
//!
//! # Usage
//!
//! Open the desktop dashboard (requires the `gui_egui` feature):
//! ```bash
//! telemetry-dash gui --config config/telemetry_dash.toml
//! ```
//!
//! Stream to the terminal until Ctrl-C:
//! ```bash
//! telemetry-dash watch --endpoint ws://localhost:8000/ws
//! ```
//!
//! Print the effective configuration (file + environment):
//! ```bash
//! telemetry-dash config
//! ```
//!
//! Serve a mock feed:
//! ```bash
//! telemetry-dash simulate --bind 127.0.0.1:8000 --interval 500ms
//! ```

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing::info;

use telemetry_dash::config::{DashConfig, DEFAULT_CONFIG_PATH};
use telemetry_dash::console::ConsolePresenter;
use telemetry_dash::controller::DashboardController;
use telemetry_dash::logging;
use telemetry_dash::simulator::{self, SimulatorConfig};

#[derive(Parser)]
#[command(name = "telemetry-dash")]
#[command(about = "Real-time temperature and humidity dashboard", long_about = None)]
struct Cli {
    /// Configuration file
    #[arg(long, global = true, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Open the desktop dashboard
    Gui,

    /// Stream readings to the terminal until Ctrl-C
    Watch {
        /// Override the configured endpoint
        #[arg(long)]
        endpoint: Option<String>,
    },

    /// Print the effective configuration as TOML
    Config,

    /// Serve a mock telemetry feed
    Simulate {
        /// Address to listen on
        #[arg(long, default_value = "127.0.0.1:8000")]
        bind: SocketAddr,

        /// Time between frames
        #[arg(long, default_value = "1s", value_parser = parse_duration)]
        interval: Duration,
    },
}

fn parse_duration(value: &str) -> Result<Duration, String> {
    humantime_serde::re::humantime::parse_duration(value).map_err(|e| e.to_string())
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = DashConfig::load_from(&cli.config)
        .with_context(|| format!("loading {}", cli.config.display()))?;
    if let Commands::Watch {
        endpoint: Some(endpoint),
    } = &cli.command
    {
        config.connection.endpoint = endpoint.clone();
    }
    config.validate()?;
    logging::init_from_config(&config)?;

    match cli.command {
        Commands::Gui => run_gui(config),
        Commands::Watch { .. } => watch(config),
        Commands::Config => {
            print!("{}", config.to_toml()?);
            Ok(())
        }
        Commands::Simulate { bind, interval } => simulate(bind, interval),
    }
}

#[cfg(feature = "gui_egui")]
fn run_gui(config: DashConfig) -> Result<()> {
    info!(endpoint = %config.connection.endpoint, "starting dashboard window");
    telemetry_dash::gui::run(config).map_err(|e| anyhow::anyhow!("GUI error: {}", e))
}

#[cfg(not(feature = "gui_egui"))]
fn run_gui(_config: DashConfig) -> Result<()> {
    anyhow::bail!("The gui command requires the 'gui_egui' feature. Rebuild with --features gui_egui")
}

fn watch(config: DashConfig) -> Result<()> {
    let runtime = tokio::runtime::Runtime::new()?;
    let mut controller = DashboardController::from_config(&config);
    let mut presenter = ConsolePresenter::default();

    controller.present(&mut presenter);
    controller.on_start(&mut presenter)?;

    runtime.block_on(async {
        let mut tick = tokio::time::interval(Duration::from_millis(100));
        let ctrl_c = tokio::signal::ctrl_c();
        tokio::pin!(ctrl_c);
        loop {
            tokio::select! {
                _ = &mut ctrl_c => break,
                _ = tick.tick() => {
                    controller.pump(&mut presenter);
                }
            }
        }
    });

    info!("stop requested");
    controller.on_stop(&mut presenter);
    println!("{}", presenter.summary());
    println!("{:?}", controller.stats());
    Ok(())
}

fn simulate(bind: SocketAddr, interval: Duration) -> Result<()> {
    let runtime = tokio::runtime::Runtime::new()?;
    let config = SimulatorConfig {
        interval,
        ..Default::default()
    };

    runtime.block_on(async move {
        let cancel = CancellationToken::new();
        let server = tokio::spawn(simulator::run(bind, config, cancel.clone()));
        println!("Serving mock telemetry on ws://{}/ws (Ctrl-C to stop)", bind);
        tokio::signal::ctrl_c().await?;
        cancel.cancel();
        server.await??;
        Ok::<(), anyhow::Error>(())
    })
}
