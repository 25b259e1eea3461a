//! cam-kiosk: pan/tilt camera kiosk server.
//!
//! ```sh
//! cam-kiosk --config /etc/cam-kiosk.toml
//! cam-kiosk --simulate --port 8080
//! ```
//!
//! `MQTT_HOST`, `MQTT_PORT` and `TEMI_SERIAL` override the robot settings
//! from the config file. `RUST_LOG` controls log verbosity.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use cam_kiosk::hal::select_driver;
use cam_kiosk::services::{run_server_with_state, KioskState, RumqttLink, TemiRobot, WebServerConfig};
use cam_kiosk::traits::RobotLink;
use cam_kiosk::{Config, MotorController, RobotConfig};

#[derive(Parser, Debug)]
#[command(name = "cam-kiosk", version, about = "Pan/tilt camera kiosk server")]
struct Args {
    /// TOML configuration file (defaults are used when omitted)
    #[arg(long, short)]
    config: Option<PathBuf>,

    /// Use the simulated pulse driver even when GPIO is available
    #[arg(long)]
    simulate: bool,

    /// Override the web server port
    #[arg(long, short)]
    port: Option<u16>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => Config::load(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => Config::default(),
    }
    .apply_env();
    if let Some(port) = args.port {
        config.web.port = port;
    }
    config.validate().context("invalid configuration")?;

    let axes = config.motors.build_axes()?;
    let timing = config.motors.timing();
    let driver = select_driver(
        &axes,
        &config.motors.enable_pins(),
        timing.step_delay,
        args.simulate,
    );
    let controller = Arc::new(
        MotorController::new(axes, driver, timing).context("starting motor controller")?,
    );

    let mut state = KioskState::new(Arc::clone(&controller));
    if let Some(robot) = connect_robot(&config.robot) {
        state = state.with_robot(robot);
    }

    let runtime = tokio::runtime::Runtime::new().context("creating async runtime")?;
    let served = runtime.block_on(run_server_with_state(
        Arc::new(state),
        WebServerConfig::from_config(&config.web),
        shutdown_signal(),
    ));

    info!("Shutting down...");
    controller.stop();
    served.context("web server failed")
}

/// Connect the robot relay, or log why the kiosk runs without it.
fn connect_robot(config: &RobotConfig) -> Option<Box<dyn RobotLink>> {
    if !config.enabled {
        info!("Robot relay disabled");
        return None;
    }
    if !config.is_configured() {
        warn!("No robot serial configured (set TEMI_SERIAL); running without robot features");
        return None;
    }

    info!("Connecting to robot {} via {}:{}...", config.serial, config.host, config.port);
    let timeout = Duration::from_millis(config.connect_timeout_ms);
    let robot = RumqttLink::connect(config, timeout)
        .and_then(|link| TemiRobot::new(link, config.serial.clone()));
    match robot {
        Ok(robot) => {
            info!("Robot connected");
            Some(Box::new(robot))
        }
        Err(e) => {
            warn!("Robot connection failed: {}", e);
            warn!("Running without robot features");
            None
        }
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for Ctrl-C: {}", e);
        std::future::pending::<()>().await;
    }
}
