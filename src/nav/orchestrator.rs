//! Navigation orchestrator: one manual command, end to end.
//!
//! Planning failures stay local and never reach the network. On a rejected
//! move the caller must leave the vessel untouched, so the orchestrator
//! returns the new pose instead of mutating anything itself.

use crate::chart::{Position, Vessel};
use crate::client::ShipControl;
use crate::compass::Heading;
use crate::error::{Result, TariniError};
use crate::nav::constraints::{self, ForbiddenSet};
use crate::nav::planner;
use std::sync::Arc;

/// Pose a vessel ends up in after a successful command.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct NewPose {
    pub position: Position,
    pub heading: Heading,
}

/// Drives the ship control API for manual commands. Invoked at most once
/// per user action (and once per autopilot iteration); never concurrently
/// for the same vessel.
pub struct Navigator {
    ship: Arc<dyn ShipControl>,
}

impl Navigator {
    pub fn new(ship: Arc<dyn ShipControl>) -> Self {
        Self { ship }
    }

    /// Plan and execute a single heading change.
    ///
    /// On success the position advances one cell along the pre-command
    /// heading, and the heading becomes the one the service reported. A
    /// null response means the move was rejected (land ahead, vessel gone);
    /// the local pose must remain as it was.
    pub fn navigate(&self, vessel: &Vessel, requested: Heading) -> Result<NewPose> {
        if !vessel.is_launched() {
            return Err(TariniError::InvalidSelection);
        }

        let command = planner::plan(vessel.heading, requested)?;

        match self.ship.navigate(&vessel.id, command)? {
            Some((dx, dy)) => {
                let heading = Heading::from_delta(dx, dy).ok_or_else(|| {
                    TariniError::Api(format!(
                        "service reported non-unit heading delta ({}, {})",
                        dx, dy
                    ))
                })?;
                Ok(NewPose {
                    position: vessel.position.offset(vessel.heading.delta()),
                    heading,
                })
            }
            None => Err(TariniError::NavigationRejected),
        }
    }

    /// Refresh the forbidden-direction set from a fresh radar snapshot.
    pub fn forbidden(&self, vessel: &Vessel) -> Result<ForbiddenSet> {
        if !vessel.is_launched() {
            return Err(TariniError::InvalidSelection);
        }
        let radar = self.ship.radar(&vessel.id)?;
        Ok(constraints::forbidden(
            vessel.heading,
            &radar,
            vessel.position,
        ))
    }
}
