//! Turn planner: from a heading change to a helm command.
//!
//! The vessel model only supports straight or ±45° course changes per
//! command, forward or backward. A 90° turn (ordinal distance 2 or 6) is
//! unreachable in one command and is rejected here so a malformed request
//! never reaches the network.

use crate::compass::{Course, Heading, HelmCommand, Rudder};
use crate::error::{Result, TariniError};

/// Compute the command that takes the vessel from `current` toward
/// `requested` in a single step.
pub fn plan(current: Heading, requested: Heading) -> Result<HelmCommand> {
    let diff = current.ordinal_distance(requested);
    let (course, rudder) = match diff {
        0 => (Course::Forward, Rudder::Center),
        1 => (Course::Forward, Rudder::Left),
        7 => (Course::Forward, Rudder::Right),
        4 => (Course::Backward, Rudder::Center),
        3 => (Course::Backward, Rudder::Left),
        5 => (Course::Backward, Rudder::Right),
        _ => {
            return Err(TariniError::InvalidTurn {
                from: current,
                to: requested,
            })
        }
    };
    Ok(HelmCommand { course, rudder })
}
