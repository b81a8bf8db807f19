//! Single-consumer event dispatcher.
//!
//! All vessel records and the chart live here, and every mutation arrives
//! through one channel: operator actions from the frontend and proposed
//! updates from the autopilot loops. The background loops only ever hold
//! vessel ids, so there is no shared record for them to race on.

use std::collections::HashMap;
use std::sync::mpsc::{Receiver, RecvTimeoutError};
use std::sync::Arc;
use std::time::Duration;

use crate::autopilot::Autopilot;
use crate::chart::{Chart, Position, SectorPatch, Vessel};
use crate::client::{FleetQuery, ShipControl};
use crate::compass::Heading;
use crate::error::{Result, TariniError};
use crate::nav::Navigator;
use crate::shared::messages::{Action, Event};

/// Owns the mutable client-side state and applies events one at a time.
pub struct Dispatcher {
    rx: Receiver<Event>,
    ship: Arc<dyn ShipControl>,
    fleet: Arc<dyn FleetQuery>,
    navigator: Navigator,
    autopilot: Autopilot,
    vessels: HashMap<String, Vessel>,
    chart: Chart,
    selected: Option<String>,
}

impl Dispatcher {
    pub fn new(
        rx: Receiver<Event>,
        ship: Arc<dyn ShipControl>,
        fleet: Arc<dyn FleetQuery>,
        autopilot: Autopilot,
    ) -> Self {
        let navigator = Navigator::new(Arc::clone(&ship));
        Self {
            rx,
            ship,
            fleet,
            navigator,
            autopilot,
            vessels: HashMap::new(),
            chart: Chart::new(),
            selected: None,
        }
    }

    /// Run until a `Shutdown` event arrives or all senders are gone.
    pub fn run(mut self) {
        tracing::info!("Dispatcher started");
        self.bootstrap();

        loop {
            match self.rx.recv_timeout(Duration::from_millis(100)) {
                Ok(event) => {
                    if !self.handle(event) {
                        break;
                    }
                }
                Err(RecvTimeoutError::Timeout) => continue,
                Err(RecvTimeoutError::Disconnected) => {
                    tracing::warn!("Event channel disconnected, dispatcher exiting");
                    break;
                }
            }
        }

        self.autopilot.stop();
        tracing::info!("Dispatcher exited");
    }

    /// Seed local state from the fleet service: full roster, full terrain
    /// grid. Failures are logged; the dispatcher starts with what it got.
    fn bootstrap(&mut self) {
        match self.fleet.load_chart() {
            Ok(patches) => {
                self.chart.apply(&patches);
                tracing::info!("Chart loaded: {} known cells", self.chart.known_cells());
            }
            Err(e) => tracing::warn!("Failed to load terrain grid: {}", e),
        }
        match self.fleet.list_vessels() {
            Ok(roster) => {
                for record in roster {
                    self.absorb_record(&record);
                }
                tracing::info!("Fleet roster loaded: {} vessels", self.vessels.len());
            }
            Err(e) => tracing::warn!("Failed to load fleet roster: {}", e),
        }
        // Mirror the original UI: the first known vessel starts selected.
        if self.selected.is_none() {
            let mut ids: Vec<&String> = self.vessels.keys().collect();
            ids.sort();
            self.selected = ids.first().map(|id| id.to_string());
        }
    }

    fn absorb_record(&mut self, record: &crate::client::ShipRecord) {
        let id = match record.ship_id.as_deref() {
            Some(id) if !id.is_empty() => id.to_string(),
            _ => return,
        };
        let heading = match record.heading() {
            Some(h) => h,
            None => {
                tracing::warn!(
                    "Roster entry {} carries non-unit heading delta ({}, {})",
                    id,
                    record.direction_x,
                    record.direction_y
                );
                return;
            }
        };
        self.vessels.insert(
            id.clone(),
            Vessel {
                id,
                name: record.ship_name.clone(),
                position: record.position(),
                heading,
            },
        );
    }

    /// Apply one event. Returns `false` on shutdown.
    fn handle(&mut self, event: Event) -> bool {
        match event {
            Event::VesselMoved {
                vessel_id,
                position,
                heading,
            } => {
                match self.vessels.get_mut(&vessel_id) {
                    Some(vessel) => {
                        vessel.position = position;
                        if let Some(h) = heading {
                            vessel.heading = h;
                        }
                        tracing::debug!(
                            "{} now at ({}, {}) heading {}",
                            vessel.name,
                            position.x,
                            position.y,
                            vessel.heading
                        );
                    }
                    None => {
                        tracing::debug!("Update for unknown vessel {} ignored", vessel_id);
                    }
                }
            }
            Event::ChartUpdated(patches) => {
                self.chart.apply(&patches);
            }
            Event::SessionStopped { reason } => {
                tracing::warn!("Autopilot session ended: {}", reason);
                // Join the finished workers so a later start is clean.
                self.autopilot.stop();
            }
            Event::LoopError { message } => {
                tracing::warn!("Autopilot: {}", message);
            }
            Event::Action(action) => {
                if let Err(e) = self.apply(action) {
                    tracing::warn!("Action failed: {}", e);
                }
            }
            Event::Shutdown => return false,
        }
        true
    }

    fn apply(&mut self, action: Action) -> Result<()> {
        match action {
            Action::Launch {
                name,
                position,
                heading,
            } => self.launch(&name, position, heading),
            Action::Select(id) => self.select(&id),
            Action::Navigate(heading) => self.navigate(heading),
            Action::Radar => self.radar(),
            Action::Scan => self.scan(),
            Action::Route => self.route(),
            Action::Exit => self.exit(),
            Action::StartAutopilot => self.start_autopilot(),
            Action::StopAutopilot => {
                self.autopilot.stop();
                Ok(())
            }
        }
    }

    fn launch(&mut self, name: &str, position: Position, heading: Heading) -> Result<()> {
        if name.trim().is_empty() {
            return Err(TariniError::Api("vessel name must not be empty".into()));
        }
        if !position.in_bounds() {
            return Err(TariniError::Api(format!(
                "launch position ({}, {}) is off the chart",
                position.x, position.y
            )));
        }

        let id = self.ship.launch(name, position, heading)?;
        tracing::info!("Launched {} as {}", name, id);

        self.vessels.insert(
            id.clone(),
            Vessel {
                id: id.clone(),
                name: name.to_string(),
                position,
                heading,
            },
        );
        self.selected = Some(id);
        Ok(())
    }

    fn select(&mut self, id: &str) -> Result<()> {
        if !self.vessels.contains_key(id) {
            return Err(TariniError::VesselNotFound(id.to_string()));
        }
        self.selected = Some(id.to_string());
        Ok(())
    }

    fn selected_vessel(&self) -> Result<&Vessel> {
        self.selected
            .as_deref()
            .and_then(|id| self.vessels.get(id))
            .ok_or(TariniError::InvalidSelection)
    }

    fn navigate(&mut self, requested: Heading) -> Result<()> {
        let vessel = self.selected_vessel()?.clone();
        let pose = self.navigator.navigate(&vessel, requested)?;

        if let Some(record) = self.vessels.get_mut(&vessel.id) {
            record.position = pose.position;
            record.heading = pose.heading;
        }
        tracing::info!(
            "{} moved to ({}, {}), heading {}",
            vessel.name,
            pose.position.x,
            pose.position.y,
            pose.heading
        );

        // Refresh the control hints the way the original does after a move.
        let refreshed = self.selected_vessel()?.clone();
        let forbidden = self.navigator.forbidden(&refreshed)?;
        tracing::info!("Forbidden headings: {:?}", forbidden.headings());
        Ok(())
    }

    /// Manual radar sweep: refresh the forbidden set and paint the echoes
    /// onto the chart at their absolute positions.
    fn radar(&mut self) -> Result<()> {
        let vessel = self.selected_vessel()?.clone();
        let report = self.ship.radar(&vessel.id)?;

        let patches: Vec<SectorPatch> = report
            .echos
            .iter()
            .filter_map(|echo| {
                let position = vessel.position.offset(echo.sector.offset());
                if position.in_bounds() {
                    Some(SectorPatch {
                        position,
                        ground: echo.ground,
                        depth: 0,
                    })
                } else {
                    None
                }
            })
            .collect();
        self.chart.apply(&patches);

        let forbidden =
            crate::nav::constraints::forbidden(vessel.heading, &report, vessel.position);
        tracing::info!(
            "Radar: {} echoes, forbidden headings {:?}",
            report.echos.len(),
            forbidden.headings()
        );
        Ok(())
    }

    fn scan(&mut self) -> Result<()> {
        let vessel = self.selected_vessel()?.clone();
        let scan = self.ship.scan(&vessel.id)?;
        tracing::info!(
            "{} at ({}, {}): depth {}, stddev {:.2}",
            vessel.name,
            vessel.position.x,
            vessel.position.y,
            scan.depth,
            scan.stddev
        );
        Ok(())
    }

    fn route(&mut self) -> Result<()> {
        let vessel = self.selected_vessel()?.clone();
        let route = self.ship.route(&vessel.id)?;
        tracing::info!("{} route: {} sectors", vessel.name, route.len());
        for pos in &route {
            tracing::debug!("  ({}, {})", pos.x, pos.y);
        }
        Ok(())
    }

    /// Invalidate the vessel at the service and drop the local record. A
    /// bound autopilot session ends first.
    fn exit(&mut self) -> Result<()> {
        let vessel = self.selected_vessel()?.clone();

        if self.autopilot.is_running() && self.autopilot.bound_vessel() == vessel.id {
            self.autopilot.stop();
        }

        self.ship.exit(&vessel.id)?;
        self.vessels.remove(&vessel.id);
        self.selected = None;
        tracing::info!("{} exited", vessel.name);
        Ok(())
    }

    fn start_autopilot(&mut self) -> Result<()> {
        let vessel = self.selected_vessel()?.clone();

        // Rebinding to another vessel means ending the old session first.
        if self.autopilot.is_running() && self.autopilot.bound_vessel() != vessel.id {
            self.autopilot.stop();
        }

        self.autopilot.start(&vessel.id)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chart::Ground;
    use crate::client::{MockFleet, MockShipControl};
    use crate::config::AutopilotConfig;
    use crate::shared::SessionState;
    use std::sync::mpsc;

    fn dispatcher(
        ship: Arc<MockShipControl>,
        fleet: Arc<MockFleet>,
    ) -> (Dispatcher, mpsc::SyncSender<Event>) {
        let (tx, rx) = mpsc::sync_channel(64);
        let state = Arc::new(SessionState::new());
        let autopilot = Autopilot::new(
            state,
            ship.clone() as Arc<dyn ShipControl>,
            fleet.clone() as Arc<dyn FleetQuery>,
            tx.clone(),
            AutopilotConfig::default(),
        );
        let dispatcher = Dispatcher::new(
            rx,
            ship as Arc<dyn ShipControl>,
            fleet as Arc<dyn FleetQuery>,
            autopilot,
        );
        (dispatcher, tx)
    }

    #[test]
    fn bootstrap_loads_roster_and_chart() {
        let ship = Arc::new(MockShipControl::new());
        let fleet = Arc::new(MockFleet::new());
        fleet.set_roster(vec![MockFleet::record("a#1", "Tarini", 4, 5, 0, 1)]);
        fleet.set_chart(vec![SectorPatch {
            position: Position::new(4, 6),
            ground: Ground::Water,
            depth: 80,
        }]);

        let (mut d, _tx) = dispatcher(ship, fleet);
        d.bootstrap();

        assert_eq!(d.vessels.len(), 1);
        assert_eq!(d.selected.as_deref(), Some("a#1"));
        assert_eq!(d.chart.known_cells(), 1);
        let vessel = d.vessels.get("a#1").unwrap();
        assert_eq!(vessel.position, Position::new(4, 5));
        assert_eq!(vessel.heading, Heading::North);
    }

    #[test]
    fn vessel_moved_updates_only_known_records() {
        let ship = Arc::new(MockShipControl::new());
        let fleet = Arc::new(MockFleet::new());
        fleet.set_roster(vec![MockFleet::record("a#1", "Tarini", 4, 5, 0, 1)]);

        let (mut d, _tx) = dispatcher(ship, fleet);
        d.bootstrap();

        assert!(d.handle(Event::VesselMoved {
            vessel_id: "a#1".to_string(),
            position: Position::new(4, 6),
            heading: Some(Heading::NorthEast),
        }));
        let vessel = d.vessels.get("a#1").unwrap();
        assert_eq!(vessel.position, Position::new(4, 6));
        assert_eq!(vessel.heading, Heading::NorthEast);

        // Unknown vessel: ignored, nothing inserted.
        assert!(d.handle(Event::VesselMoved {
            vessel_id: "ghost#9".to_string(),
            position: Position::new(0, 0),
            heading: None,
        }));
        assert_eq!(d.vessels.len(), 1);
    }

    #[test]
    fn launch_validates_before_calling_the_service() {
        let ship = Arc::new(MockShipControl::new());
        let fleet = Arc::new(MockFleet::new());
        let (mut d, _tx) = dispatcher(ship, fleet);

        assert!(d
            .launch("", Position::new(5, 5), Heading::North)
            .is_err());
        assert!(d
            .launch("Tarini", Position::new(5, 120), Heading::North)
            .is_err());
        assert!(d.vessels.is_empty());

        d.launch("Tarini", Position::new(5, 5), Heading::North)
            .unwrap();
        assert_eq!(d.selected.as_deref(), Some("mock#1"));
        assert!(d.vessels.contains_key("mock#1"));
    }

    #[test]
    fn launch_failure_text_is_surfaced() {
        let ship = Arc::new(MockShipControl::new());
        ship.set_launch_response("Error: sector occupied");
        let fleet = Arc::new(MockFleet::new());
        let (mut d, _tx) = dispatcher(ship, fleet);

        let err = d
            .launch("Tarini", Position::new(5, 5), Heading::North)
            .unwrap_err();
        assert!(matches!(err, TariniError::Api(_)));
        assert!(d.vessels.is_empty());
        assert!(d.selected.is_none());
    }

    #[test]
    fn navigate_applies_pose_and_rejection_leaves_it_alone() {
        let ship = Arc::new(MockShipControl::new());
        let fleet = Arc::new(MockFleet::new());
        fleet.set_roster(vec![MockFleet::record("a#1", "Tarini", 50, 50, 0, 1)]);
        let (mut d, _tx) = dispatcher(ship.clone(), fleet);
        d.bootstrap();

        ship.push_navigate(Some((0, 1)));
        d.navigate(Heading::North).unwrap();
        let vessel = d.vessels.get("a#1").unwrap().clone();
        assert_eq!(vessel.position, Position::new(50, 51));
        assert_eq!(vessel.heading, Heading::North);

        ship.push_navigate(None);
        let err = d.navigate(Heading::North).unwrap_err();
        assert!(matches!(err, TariniError::NavigationRejected));
        // Local pose unchanged after a rejection.
        let vessel = d.vessels.get("a#1").unwrap();
        assert_eq!(vessel.position, Position::new(50, 51));
        assert_eq!(vessel.heading, Heading::North);
    }

    #[test]
    fn exit_removes_record_and_calls_the_service() {
        let ship = Arc::new(MockShipControl::new());
        let fleet = Arc::new(MockFleet::new());
        fleet.set_roster(vec![MockFleet::record("a#1", "Tarini", 4, 5, 0, 1)]);
        let (mut d, _tx) = dispatcher(ship.clone(), fleet);
        d.bootstrap();

        d.exit().unwrap();
        assert!(d.vessels.is_empty());
        assert!(d.selected.is_none());
        assert_eq!(ship.exit_log(), vec!["a#1".to_string()]);

        // Without a selection, actions are rejected before any remote call.
        let err = d.navigate(Heading::North).unwrap_err();
        assert!(matches!(err, TariniError::InvalidSelection));
    }
}
