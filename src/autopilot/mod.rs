//! Autopilot session lifecycle.
//!
//! A running session owns two worker threads bound to one vessel id:
//!
//! - Command loop: asks the service for the next autopilot step at the
//!   configured cadence and publishes pose/terrain updates
//! - Live-sync loop: reconciles against the fleet roster and terrain grid
//!   at five times that rate, and detects server-side vessel removal
//!
//! `start` and `stop` are idempotent. Loops stop cooperatively: they only
//! ever clear the shared running flag and return; joining is the
//! controller's job, so a loop can safely end the session from inside its
//! own failure handler.

mod command;
mod sync;

pub use command::CommandLoop;
pub use sync::SyncLoop;

use std::sync::mpsc::SyncSender;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crate::client::{FleetQuery, ShipControl};
use crate::config::AutopilotConfig;
use crate::error::{Result, TariniError};
use crate::shared::messages::Event;
use crate::shared::SessionState;

/// Join handles for one session's worker pair.
struct Workers {
    command: JoinHandle<()>,
    sync: JoinHandle<()>,
}

/// Controls at most one autopilot session at a time.
pub struct Autopilot {
    state: Arc<SessionState>,
    ship: Arc<dyn ShipControl>,
    fleet: Arc<dyn FleetQuery>,
    tx: SyncSender<Event>,
    config: AutopilotConfig,
    workers: Option<Workers>,
}

impl Autopilot {
    pub fn new(
        state: Arc<SessionState>,
        ship: Arc<dyn ShipControl>,
        fleet: Arc<dyn FleetQuery>,
        tx: SyncSender<Event>,
        config: AutopilotConfig,
    ) -> Self {
        Self {
            state,
            ship,
            fleet,
            tx,
            config,
            workers: None,
        }
    }

    /// Bind a vessel and spawn the worker pair. Returns `false` without
    /// spawning anything when a session is already running; an empty id is
    /// rejected before any state changes.
    pub fn start(&mut self, vessel_id: &str) -> Result<bool> {
        if vessel_id.is_empty() {
            return Err(TariniError::InvalidSelection);
        }
        if self.state.is_running() {
            tracing::debug!("Autopilot already running, start ignored");
            return Ok(false);
        }

        // A session that stopped itself leaves finished workers behind.
        self.reap();

        self.state.bind(vessel_id);
        tracing::info!(
            "Starting autopilot for {} (step delay {:?})",
            vessel_id,
            self.config.step_delay()
        );

        let command_loop = CommandLoop::new(
            Arc::clone(&self.state),
            Arc::clone(&self.ship),
            self.tx.clone(),
            self.config.step_delay(),
            self.config.max_consecutive_failures,
        );
        let command = thread::Builder::new()
            .name("autopilot-cmd".into())
            .spawn(move || command_loop.run())
            .map_err(|e| TariniError::Config(format!("Failed to spawn command loop: {}", e)))?;

        let sync_loop = SyncLoop::new(
            Arc::clone(&self.state),
            Arc::clone(&self.fleet),
            self.tx.clone(),
            self.config.sync_interval(),
        );
        let sync = match thread::Builder::new()
            .name("autopilot-sync".into())
            .spawn(move || sync_loop.run())
        {
            Ok(handle) => handle,
            Err(e) => {
                // Roll back so the lone command loop does not keep running.
                self.state.request_stop();
                if let Err(panic) = command.join() {
                    tracing::error!("Command loop panicked: {:?}", panic);
                }
                return Err(TariniError::Config(format!(
                    "Failed to spawn live-sync loop: {}",
                    e
                )));
            }
        };

        self.workers = Some(Workers { command, sync });
        Ok(true)
    }

    /// Request shutdown and wait for both loops. Idempotent; safe to call
    /// on an idle controller or after a session stopped itself.
    pub fn stop(&mut self) {
        self.state.request_stop();
        self.reap();
    }

    pub fn is_running(&self) -> bool {
        self.state.is_running()
    }

    /// Vessel id of the current (or last) session.
    pub fn bound_vessel(&self) -> String {
        self.state.vessel_id()
    }

    fn reap(&mut self) {
        if let Some(workers) = self.workers.take() {
            if let Err(e) = workers.command.join() {
                tracing::error!("Command loop panicked: {:?}", e);
            }
            if let Err(e) = workers.sync.join() {
                tracing::error!("Live-sync loop panicked: {:?}", e);
            }
            tracing::info!("Autopilot stopped");
        }
    }
}

impl Drop for Autopilot {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::{MockFleet, MockShipControl};
    use crate::config::Pace;
    use std::sync::mpsc;
    use std::time::{Duration, Instant};

    fn fast_config() -> AutopilotConfig {
        AutopilotConfig {
            pace: Pace::Fast,
            step_delay_ms: Some(20),
            max_consecutive_failures: 5,
        }
    }

    fn autopilot(
        ship: &Arc<MockShipControl>,
        fleet: &Arc<MockFleet>,
    ) -> (Autopilot, Arc<SessionState>, mpsc::Receiver<Event>) {
        let state = Arc::new(SessionState::new());
        let (tx, rx) = mpsc::sync_channel(256);
        let pilot = Autopilot::new(
            Arc::clone(&state),
            ship.clone() as Arc<dyn ShipControl>,
            fleet.clone() as Arc<dyn FleetQuery>,
            tx,
            fast_config(),
        );
        (pilot, state, rx)
    }

    fn roster_with_vessel() -> Vec<crate::client::ShipRecord> {
        vec![MockFleet::record("a#1", "Tarini", 3, 3, 0, 1)]
    }

    #[test]
    fn empty_vessel_id_is_rejected() {
        let ship = Arc::new(MockShipControl::new());
        let fleet = Arc::new(MockFleet::new());
        let (mut pilot, state, _rx) = autopilot(&ship, &fleet);

        let err = pilot.start("").unwrap_err();
        assert!(matches!(err, TariniError::InvalidSelection));
        assert!(!state.is_running());
    }

    #[test]
    fn double_start_spawns_one_worker_pair() {
        let ship = Arc::new(MockShipControl::new());
        let fleet = Arc::new(MockFleet::new());
        fleet.set_roster(roster_with_vessel());
        let (mut pilot, _state, _rx) = autopilot(&ship, &fleet);

        assert!(pilot.start("a#1").unwrap());
        assert!(!pilot.start("a#1").unwrap());
        assert!(pilot.is_running());

        pilot.stop();
        assert!(!pilot.is_running());

        // After the first session's roster poll count, a second start works.
        let polls = fleet.list_calls();
        assert!(pilot.start("a#1").unwrap());
        pilot.stop();
        assert!(fleet.list_calls() >= polls);
    }

    #[test]
    fn stop_twice_is_harmless() {
        let ship = Arc::new(MockShipControl::new());
        let fleet = Arc::new(MockFleet::new());
        fleet.set_roster(roster_with_vessel());
        let (mut pilot, _state, _rx) = autopilot(&ship, &fleet);

        pilot.start("a#1").unwrap();
        pilot.stop();
        pilot.stop();
        assert!(!pilot.is_running());
    }

    #[test]
    fn stop_returns_within_a_sleep_interval() {
        let ship = Arc::new(MockShipControl::new());
        let fleet = Arc::new(MockFleet::new());
        fleet.set_roster(roster_with_vessel());
        let (mut pilot, _state, _rx) = autopilot(&ship, &fleet);

        pilot.start("a#1").unwrap();
        std::thread::sleep(Duration::from_millis(30));

        let start = Instant::now();
        pilot.stop();
        assert!(start.elapsed() < Duration::from_secs(1));
    }

    #[test]
    fn vessel_loss_ends_the_session_within_one_sync_cycle() {
        let ship = Arc::new(MockShipControl::new());
        let fleet = Arc::new(MockFleet::new());
        fleet.set_roster(roster_with_vessel());
        let (mut pilot, state, rx) = autopilot(&ship, &fleet);

        pilot.start("a#1").unwrap();
        std::thread::sleep(Duration::from_millis(30));
        assert!(state.is_running());

        fleet.set_roster(vec![]);

        // One sync interval (4ms here) plus a sleep slice is ample.
        let deadline = Instant::now() + Duration::from_secs(2);
        while state.is_running() && Instant::now() < deadline {
            std::thread::sleep(Duration::from_millis(5));
        }
        assert!(!state.is_running());

        // No further command-loop iterations once the flag cleared.
        pilot.stop();
        let steps = ship.step_calls();
        std::thread::sleep(Duration::from_millis(60));
        assert_eq!(ship.step_calls(), steps);

        let mut saw_stop = false;
        while let Ok(event) = rx.try_recv() {
            if matches!(event, Event::SessionStopped { .. }) {
                saw_stop = true;
            }
        }
        assert!(saw_stop);
    }
}
