//! Obstacle/constraint resolver.
//!
//! Before every manual command and every autopilot decision the client
//! recomputes which headings must not be requested. Two independent
//! contributions are unioned:
//!
//! 1. the pair of headings perpendicular to the current one, which the
//!    turn model can never reach in a single command
//! 2. radar echoes whose absolute grid coordinate leaves the chart, plus
//!    offsets the service itself flags as not navigable
//!
//! The set holds raw (dx, dy) deltas rather than `Heading`s: radar offsets
//! that are not canonical unit deltas are preserved verbatim, and the
//! presentation layer resolves whatever maps to a compass point.

use crate::chart::Position;
use crate::client::EchoReport;
use crate::compass::Heading;
use std::collections::HashSet;

/// Set of direction deltas a vessel must not be commanded toward. Never
/// persisted; always recomputed from the current heading and radar snapshot.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ForbiddenSet {
    deltas: HashSet<(i32, i32)>,
}

impl ForbiddenSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, delta: (i32, i32)) {
        self.deltas.insert(delta);
    }

    pub fn contains(&self, delta: (i32, i32)) -> bool {
        self.deltas.contains(&delta)
    }

    pub fn contains_heading(&self, heading: Heading) -> bool {
        self.deltas.contains(&heading.delta())
    }

    pub fn len(&self) -> usize {
        self.deltas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.deltas.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &(i32, i32)> {
        self.deltas.iter()
    }

    /// The forbidden deltas that resolve to compass points, in rose order.
    pub fn headings(&self) -> Vec<Heading> {
        Heading::ALL
            .iter()
            .copied()
            .filter(|h| self.contains_heading(*h))
            .collect()
    }
}

/// Compute the forbidden set for a vessel with the given heading and
/// position from one radar snapshot.
pub fn forbidden(current: Heading, radar: &EchoReport, position: Position) -> ForbiddenSet {
    let mut set = ForbiddenSet::new();

    for blocked in &radar.not_navigable {
        set.insert((blocked.vec2[0], blocked.vec2[1]));
    }

    for delta in physical_turn_pair(current) {
        set.insert(delta);
    }

    for echo in &radar.echos {
        let offset = echo.sector.offset();
        if !position.offset(offset).in_bounds() {
            set.insert(offset);
        }
    }

    set
}

/// The two headings at 90° to the current one, as deltas. Derived from the
/// raw delta components; the branch order matters for the diagonals.
fn physical_turn_pair(current: Heading) -> [(i32, i32); 2] {
    let (dx, dy) = current.delta();
    if dx == 0 {
        // N or S: forbid W and E
        [(-1, 0), (1, 0)]
    } else if dx == dy {
        // NE or SW: forbid NW and SE
        [(-1, 1), (1, -1)]
    } else if dy == 0 {
        // E or W: forbid N and S
        [(0, 1), (0, -1)]
    } else {
        // SE or NW (dx == -dy): forbid NE and SW
        [(1, 1), (-1, -1)]
    }
}
