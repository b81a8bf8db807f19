//! Autopilot live-sync loop.
//!
//! The command loop's round trip can be slow, so this loop independently
//! polls the fleet roster and the full terrain grid at five times the
//! command cadence and republishes a reconciled snapshot of the bound
//! vessel. It is also the detector for server-side vessel removal: a bound
//! vessel missing from the roster ends the session.

use std::sync::mpsc::SyncSender;
use std::sync::Arc;
use std::time::Duration;

use crate::client::FleetQuery;
use crate::shared::messages::Event;
use crate::shared::{sleep_interruptible, SessionState};

/// Live-sync loop state and logic.
pub struct SyncLoop {
    state: Arc<SessionState>,
    fleet: Arc<dyn FleetQuery>,
    tx: SyncSender<Event>,
    interval: Duration,
}

impl SyncLoop {
    pub fn new(
        state: Arc<SessionState>,
        fleet: Arc<dyn FleetQuery>,
        tx: SyncSender<Event>,
        interval: Duration,
    ) -> Self {
        Self {
            state,
            fleet,
            tx,
            interval,
        }
    }

    /// Run the live-sync loop until the session stops.
    pub fn run(self) {
        tracing::info!("Live-sync loop started");

        loop {
            if !self.state.is_running() {
                tracing::info!("Live-sync loop shutting down");
                break;
            }

            let vessel_id = self.state.vessel_id();

            match self.fleet.list_vessels() {
                Ok(roster) => {
                    let record = roster
                        .iter()
                        .find(|r| r.ship_id.as_deref() == Some(vessel_id.as_str()));
                    match record {
                        Some(record) => {
                            self.publish(Event::VesselMoved {
                                vessel_id: vessel_id.clone(),
                                position: record.position(),
                                heading: record.heading(),
                            });
                            self.sync_chart();
                        }
                        None => {
                            tracing::warn!(
                                "Vessel {} missing from roster, stopping autopilot",
                                vessel_id
                            );
                            self.publish(Event::SessionStopped {
                                reason: format!("vessel {} no longer in fleet roster", vessel_id),
                            });
                            self.state.request_stop();
                            break;
                        }
                    }
                }
                Err(e) => {
                    if !self.state.is_running() {
                        tracing::debug!("Live-sync loop cancelled mid-call: {}", e);
                        break;
                    }
                    tracing::warn!("Fleet roster poll failed: {}", e);
                    self.publish(Event::LoopError {
                        message: e.to_string(),
                    });
                }
            }

            if !sleep_interruptible(&self.state, self.interval) {
                tracing::info!("Live-sync loop shutting down");
                break;
            }
        }

        tracing::info!("Live-sync loop exited");
    }

    fn sync_chart(&self) {
        match self.fleet.load_chart() {
            Ok(patches) => {
                if !patches.is_empty() {
                    self.publish(Event::ChartUpdated(patches));
                }
            }
            Err(e) => {
                tracing::warn!("Terrain grid poll failed: {}", e);
            }
        }
    }

    fn publish(&self, event: Event) {
        if let Err(e) = self.tx.try_send(event) {
            tracing::warn!("Failed to publish live-sync event: {}", e);
        }
    }
}
