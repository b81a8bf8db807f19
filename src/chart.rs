//! Local chart: the client-side snapshot of the 100×100 sector grid.
//!
//! The dispatcher owns one `Chart` and reconciles it against terrain updates
//! from the autopilot step responses and full-grid snapshots from the fleet
//! service. Cells start unknown and fill in as the services report them.

use crate::compass::Heading;
use serde::{Deserialize, Serialize};

/// Grid side length. Coordinates are valid in `0..GRID_SIZE` on both axes.
pub const GRID_SIZE: i32 = 100;

/// A grid cell coordinate.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Position {
    pub x: i32,
    pub y: i32,
}

impl Position {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    pub fn in_bounds(self) -> bool {
        self.x >= 0 && self.x < GRID_SIZE && self.y >= 0 && self.y < GRID_SIZE
    }

    /// The cell reached by applying a delta to this one. May be out of
    /// bounds; callers check.
    pub fn offset(self, (dx, dy): (i32, i32)) -> Position {
        Position::new(self.x + dx, self.y + dy)
    }
}

/// Terrain classification reported by the services.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Ground {
    Water,
    Land,
    Ice,
    Harbour,
    None,
}

/// What the client knows about one sector.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Sector {
    pub ground: Ground,
    pub depth: i32,
}

impl Sector {
    /// Deep water is rendered differently by the presentation layer.
    pub fn is_deep(self) -> bool {
        self.ground == Ground::Water && self.depth > 200
    }
}

/// One incremental terrain update, already translated to grid coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SectorPatch {
    pub position: Position,
    pub ground: Ground,
    pub depth: i32,
}

/// The full terrain snapshot. Unreported cells are `None`.
pub struct Chart {
    cells: Vec<Option<Sector>>,
}

impl Chart {
    pub fn new() -> Self {
        Self {
            cells: vec![None; (GRID_SIZE * GRID_SIZE) as usize],
        }
    }

    pub fn get(&self, pos: Position) -> Option<Sector> {
        if !pos.in_bounds() {
            return None;
        }
        self.cells[(pos.y * GRID_SIZE + pos.x) as usize]
    }

    pub fn set(&mut self, pos: Position, sector: Sector) {
        if pos.in_bounds() {
            self.cells[(pos.y * GRID_SIZE + pos.x) as usize] = Some(sector);
        }
    }

    /// Apply a batch of updates, silently skipping out-of-bounds entries.
    pub fn apply(&mut self, patches: &[SectorPatch]) {
        for patch in patches {
            self.set(
                patch.position,
                Sector {
                    ground: patch.ground,
                    depth: patch.depth,
                },
            );
        }
    }

    /// Number of cells with known terrain.
    pub fn known_cells(&self) -> usize {
        self.cells.iter().filter(|c| c.is_some()).count()
    }
}

impl Default for Chart {
    fn default() -> Self {
        Self::new()
    }
}

/// One controllable vessel as the client sees it. Records are owned
/// exclusively by the dispatcher; background loops only hold vessel ids.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Vessel {
    /// Service-assigned id. Empty until launch succeeds.
    pub id: String,
    pub name: String,
    pub position: Position,
    pub heading: Heading,
}

impl Vessel {
    pub fn is_launched(&self) -> bool {
        !self.id.is_empty()
    }
}
