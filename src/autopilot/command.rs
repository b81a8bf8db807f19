//! Autopilot command loop.
//!
//! Each iteration asks the ship control service for the next autopilot step
//! and publishes the resulting pose and terrain updates to the dispatcher.
//! The loop never blocks on the channel and exits within one sleep slice of
//! a stop request.

use std::sync::mpsc::SyncSender;
use std::sync::Arc;
use std::time::Duration;

use crate::chart::Position;
use crate::client::ShipControl;
use crate::error::TariniError;
use crate::shared::messages::Event;
use crate::shared::{sleep_interruptible, SessionState};

/// Command loop state and logic.
pub struct CommandLoop {
    state: Arc<SessionState>,
    ship: Arc<dyn ShipControl>,
    tx: SyncSender<Event>,
    step_delay: Duration,
    max_consecutive_failures: u32,
}

impl CommandLoop {
    pub fn new(
        state: Arc<SessionState>,
        ship: Arc<dyn ShipControl>,
        tx: SyncSender<Event>,
        step_delay: Duration,
        max_consecutive_failures: u32,
    ) -> Self {
        Self {
            state,
            ship,
            tx,
            step_delay,
            max_consecutive_failures,
        }
    }

    /// Run the command loop until the session stops.
    pub fn run(self) {
        tracing::info!("Command loop started");

        let mut consecutive_failures = 0u32;

        loop {
            if !self.state.is_running() {
                tracing::info!("Command loop shutting down");
                break;
            }

            let vessel_id = self.state.vessel_id();

            match self.ship.autopilot_step(&vessel_id) {
                Ok(step) => {
                    consecutive_failures = 0;

                    let patches = step.patches();
                    if !patches.is_empty() {
                        self.publish(Event::ChartUpdated(patches));
                    }

                    if let Some(pos) = step.ship_position {
                        tracing::debug!("Autopilot step: {} -> ({}, {})", vessel_id, pos.x, pos.y);
                        self.publish(Event::VesselMoved {
                            vessel_id: vessel_id.clone(),
                            position: Position::new(pos.x, pos.y),
                            heading: None,
                        });
                    }
                }
                Err(e) => {
                    // A failure observed after the stop request is part of
                    // the cancellation, not something to report.
                    if !self.state.is_running() {
                        tracing::debug!("Command loop cancelled mid-call: {}", e);
                        break;
                    }

                    if let TariniError::VesselNotFound(id) = &e {
                        tracing::warn!("Vessel {} gone, stopping autopilot", id);
                        self.publish(Event::SessionStopped {
                            reason: e.to_string(),
                        });
                        self.state.request_stop();
                        break;
                    }

                    if e.is_transient() {
                        consecutive_failures += 1;
                        tracing::warn!(
                            "Autopilot step failed ({}/{}): {}",
                            consecutive_failures,
                            self.max_consecutive_failures,
                            e
                        );
                        self.publish(Event::LoopError {
                            message: e.to_string(),
                        });
                        if consecutive_failures >= self.max_consecutive_failures {
                            self.publish(Event::SessionStopped {
                                reason: format!(
                                    "{} consecutive step failures, last: {}",
                                    consecutive_failures, e
                                ),
                            });
                            self.state.request_stop();
                            break;
                        }
                    } else {
                        self.publish(Event::SessionStopped {
                            reason: e.to_string(),
                        });
                        self.state.request_stop();
                        break;
                    }
                }
            }

            if !sleep_interruptible(&self.state, self.step_delay) {
                tracing::info!("Command loop shutting down");
                break;
            }
        }

        tracing::info!("Command loop exited");
    }

    fn publish(&self, event: Event) {
        // The dispatcher may be busy; dropping a snapshot is preferable to
        // blocking a loop that stop() needs to observe the flag.
        if let Err(e) = self.tx.try_send(event) {
            tracing::warn!("Failed to publish command-loop event: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::mock::StepOutcome;
    use crate::client::{MockShipControl, StepReport, Vec2};
    use std::sync::mpsc;

    fn drain(rx: &mpsc::Receiver<Event>) -> Vec<Event> {
        let mut events = Vec::new();
        while let Ok(e) = rx.try_recv() {
            events.push(e);
        }
        events
    }

    fn command_loop(
        state: &Arc<SessionState>,
        mock: &Arc<MockShipControl>,
        tx: SyncSender<Event>,
    ) -> CommandLoop {
        CommandLoop::new(
            Arc::clone(state),
            mock.clone() as Arc<dyn ShipControl>,
            tx,
            Duration::from_millis(1),
            3,
        )
    }

    #[test]
    fn publishes_pose_and_terrain_then_stops_on_vessel_loss() {
        let state = Arc::new(SessionState::new());
        state.bind("a#1");
        let mock = Arc::new(MockShipControl::new());
        mock.push_step(StepOutcome::Report(StepReport {
            ship_id: Some("a#1".into()),
            ship_position: Some(Vec2 { x: 5, y: 6 }),
            sector_data_list: None,
        }));
        mock.push_step(StepOutcome::NotFound);

        let (tx, rx) = mpsc::sync_channel(64);
        command_loop(&state, &mock, tx).run();

        assert!(!state.is_running());
        assert_eq!(mock.step_calls(), 2);

        let events = drain(&rx);
        assert!(matches!(
            events[0],
            Event::VesselMoved {
                position: Position { x: 5, y: 6 },
                ..
            }
        ));
        assert!(matches!(events[1], Event::SessionStopped { .. }));
    }

    #[test]
    fn continues_after_transient_failures() {
        let state = Arc::new(SessionState::new());
        state.bind("a#1");
        let mock = Arc::new(MockShipControl::new());
        mock.push_step(StepOutcome::Transient("connection reset".into()));
        mock.push_step(StepOutcome::Transient("connection reset".into()));
        mock.push_step(StepOutcome::Report(StepReport {
            ship_id: Some("a#1".into()),
            ship_position: Some(Vec2 { x: 1, y: 1 }),
            sector_data_list: None,
        }));
        // Stop from inside the fourth call so the loop terminates.
        let stop_state = Arc::clone(&state);
        mock.set_step_hook(move |call| {
            if call == 4 {
                stop_state.request_stop();
            }
        });

        let (tx, rx) = mpsc::sync_channel(64);
        command_loop(&state, &mock, tx).run();

        let events = drain(&rx);
        let errors = events
            .iter()
            .filter(|e| matches!(e, Event::LoopError { .. }))
            .count();
        let moves = events
            .iter()
            .filter(|e| matches!(e, Event::VesselMoved { .. }))
            .count();
        assert_eq!(errors, 2);
        assert_eq!(moves, 1);
    }

    #[test]
    fn stops_after_recurring_transient_failures() {
        let state = Arc::new(SessionState::new());
        state.bind("a#1");
        let mock = Arc::new(MockShipControl::new());
        for _ in 0..3 {
            mock.push_step(StepOutcome::Transient("timed out".into()));
        }

        let (tx, rx) = mpsc::sync_channel(64);
        command_loop(&state, &mock, tx).run();

        assert!(!state.is_running());
        assert_eq!(mock.step_calls(), 3);
        let events = drain(&rx);
        assert!(events
            .iter()
            .any(|e| matches!(e, Event::SessionStopped { .. })));
    }

    #[test]
    fn failure_during_cancellation_is_not_reported() {
        let state = Arc::new(SessionState::new());
        state.bind("a#1");
        let mock = Arc::new(MockShipControl::new());
        // The stop request lands while the call is in flight; the timeout
        // that surfaces afterwards is part of the cancellation.
        let stop_state = Arc::clone(&state);
        mock.set_step_hook(move |_| stop_state.request_stop());
        mock.push_step(StepOutcome::Transient("timed out".into()));

        let (tx, rx) = mpsc::sync_channel(64);
        command_loop(&state, &mock, tx).run();

        assert_eq!(mock.step_calls(), 1);
        let events = drain(&rx);
        assert!(events.is_empty(), "unexpected events: {:?}", events);
    }
}
