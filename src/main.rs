//! TariniNav - Ship control client
//!
//! A console client for the ship control and fleet services: it launches a
//! vessel on the 100x100 sector grid, runs the server-computed autopilot,
//! and keeps a local chart reconciled against both services.
//!
//! ## Multi-Threaded Architecture
//!
//! TariniNav uses three threads for concurrent operation:
//!
//! - **Dispatcher Thread**: single consumer of the event channel; owns the
//!   vessel records and the chart, executes operator actions
//! - **Command Loop**: asks the service for one autopilot step per cadence
//!   interval and publishes the resulting pose and terrain updates
//! - **Live-Sync Loop** (5x the command rate): reconciles against the fleet
//!   roster and detects server-side vessel removal

mod autopilot;
mod chart;
mod client;
mod compass;
mod config;
mod dispatcher;
mod error;
mod nav;
mod shared;

use autopilot::Autopilot;
use chart::Position;
use client::{FleetClient, FleetQuery, ShipControl, ShipControlClient};
use compass::Heading;
use config::TariniConfig;
use dispatcher::Dispatcher;
use error::{Result, TariniError};
use shared::messages::{Action, Event};
use shared::SessionState;

use std::path::Path;
use std::sync::{mpsc, Arc};
use std::time::{Duration, Instant};
use tracing::{error, info, warn};

fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("tarini_nav=info".parse().unwrap()),
        )
        .init();

    // Parse command line arguments
    let args: Vec<String> = std::env::args().collect();

    let config = if args.len() > 1 && !args[1].starts_with("--") {
        // Load config from file
        let config_path = Path::new(&args[1]);
        info!("Loading configuration from {:?}", config_path);
        TariniConfig::load(config_path)?
    } else {
        // Check for --ship-api argument
        let ship_api = args
            .iter()
            .position(|a| a == "--ship-api")
            .and_then(|i| args.get(i + 1))
            .cloned();

        let mut config = if Path::new("tarini.toml").exists() {
            info!("Loading configuration from tarini.toml");
            TariniConfig::load(Path::new("tarini.toml"))?
        } else {
            info!("Using default configuration");
            TariniConfig::default()
        };

        // Override the ship control URL if provided
        if let Some(url) = ship_api {
            info!("Using ship control API at {}", url);
            config.connection.ship_api_url = url;
        }

        config
    };

    info!("TariniNav v{}", env!("CARGO_PKG_VERSION"));
    info!(
        "Ship control at {}, fleet service at {}",
        config.connection.ship_api_url, config.connection.fleet_api_url
    );
    info!(
        "Autopilot cadence: step every {:?}, live-sync every {:?}",
        config.autopilot.step_delay(),
        config.autopilot.sync_interval()
    );

    let launch_heading = Heading::from_code(&config.vessel.heading).ok_or_else(|| {
        TariniError::Config(format!(
            "unknown heading code {:?} in [vessel]",
            config.vessel.heading
        ))
    })?;
    let launch_position = Position::new(config.vessel.start_x, config.vessel.start_y);

    // Build the remote clients
    let ship: Arc<dyn ShipControl> = Arc::new(ShipControlClient::new(
        &config.connection.ship_api_url,
        config.timeout(),
    )?);
    let fleet: Arc<dyn FleetQuery> = Arc::new(FleetClient::new(
        &config.connection.fleet_api_url,
        config.timeout(),
    )?);

    // One channel, one consumer: the dispatcher owns all vessel records and
    // the chart, and the autopilot loops publish into it.
    let state = Arc::new(SessionState::new());
    let (tx, rx) = mpsc::sync_channel::<Event>(256);

    let pilot = Autopilot::new(
        Arc::clone(&state),
        Arc::clone(&ship),
        Arc::clone(&fleet),
        tx.clone(),
        config.autopilot.clone(),
    );

    let consumer = Dispatcher::new(rx, ship, fleet, pilot);
    let dispatcher = std::thread::Builder::new()
        .name("dispatcher".into())
        .spawn(move || consumer.run())
        .map_err(|e| TariniError::Config(format!("Failed to spawn dispatcher: {}", e)))?;

    // Launch the configured vessel and hand it to the autopilot
    info!(
        "Launching {} at ({}, {}) heading {}",
        config.vessel.name, launch_position.x, launch_position.y, launch_heading
    );
    let launch = Action::Launch {
        name: config.vessel.name.clone(),
        position: launch_position,
        heading: launch_heading,
    };
    for action in [launch, Action::StartAutopilot] {
        if tx.send(Event::Action(action)).is_err() {
            error!("Dispatcher exited before startup completed");
            return Err(TariniError::Config("dispatcher unavailable".to_string()));
        }
    }

    // Main thread: monitor until the session ends
    let check_interval = Duration::from_millis(500);
    let startup_deadline = Instant::now() + Duration::from_secs(30);
    let mut session_seen = false;

    loop {
        std::thread::sleep(check_interval);

        if state.is_running() {
            session_seen = true;
            continue;
        }

        if session_seen {
            info!("Autopilot session ended");
            break;
        }

        if dispatcher.is_finished() {
            warn!("Dispatcher exited unexpectedly");
            break;
        }

        if Instant::now() > startup_deadline {
            warn!("Autopilot never started, giving up");
            break;
        }
    }

    // Shut down the dispatcher (which stops any remaining session)
    let _ = tx.send(Event::Shutdown);
    if let Err(e) = dispatcher.join() {
        error!("Dispatcher panicked: {:?}", e);
    }

    info!("TariniNav finished");
    Ok(())
}
