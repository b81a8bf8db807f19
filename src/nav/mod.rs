//! Navigation decision core.
//!
//! - `planner`: converts "current heading + requested heading" into the
//!   (course, rudder) command the ship control service understands
//! - `constraints`: derives the headings a vessel must not be commanded to,
//!   from radar data and from the physics of the eight-point compass
//! - `orchestrator`: runs one manual navigation command end to end

pub mod constraints;
pub mod orchestrator;
pub mod planner;

pub use constraints::{forbidden, ForbiddenSet};
pub use orchestrator::{Navigator, NewPose};
pub use planner::plan;
