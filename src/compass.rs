//! Eight-point compass model.
//!
//! Every heading carries a unit movement delta on the grid and a short code.
//! North is (0, 1): the y axis grows northward, matching the ship control
//! service's grid. Ordinals run clockwise from North so that adjacent
//! ordinals are adjacent compass points.

use std::fmt;

/// One of the eight compass directions a vessel can head in.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Heading {
    North,
    NorthEast,
    East,
    SouthEast,
    South,
    SouthWest,
    West,
    NorthWest,
}

impl Heading {
    /// All headings in ordinal order (clockwise from North).
    pub const ALL: [Heading; 8] = [
        Heading::North,
        Heading::NorthEast,
        Heading::East,
        Heading::SouthEast,
        Heading::South,
        Heading::SouthWest,
        Heading::West,
        Heading::NorthWest,
    ];

    /// Position on the compass rose, 0..8 clockwise from North.
    pub fn ordinal(self) -> u8 {
        match self {
            Heading::North => 0,
            Heading::NorthEast => 1,
            Heading::East => 2,
            Heading::SouthEast => 3,
            Heading::South => 4,
            Heading::SouthWest => 5,
            Heading::West => 6,
            Heading::NorthWest => 7,
        }
    }

    /// Unit movement delta (dx, dy) for one step along this heading.
    pub fn delta(self) -> (i32, i32) {
        match self {
            Heading::North => (0, 1),
            Heading::NorthEast => (1, 1),
            Heading::East => (1, 0),
            Heading::SouthEast => (1, -1),
            Heading::South => (0, -1),
            Heading::SouthWest => (-1, -1),
            Heading::West => (-1, 0),
            Heading::NorthWest => (-1, 1),
        }
    }

    /// Short compass code ("N", "NE", ...).
    pub fn code(self) -> &'static str {
        match self {
            Heading::North => "N",
            Heading::NorthEast => "NE",
            Heading::East => "E",
            Heading::SouthEast => "SE",
            Heading::South => "S",
            Heading::SouthWest => "SW",
            Heading::West => "W",
            Heading::NorthWest => "NW",
        }
    }

    /// Exact match against the eight canonical unit deltas. Any other pair,
    /// (0, 0) included, is not a heading.
    pub fn from_delta(dx: i32, dy: i32) -> Option<Heading> {
        Heading::ALL.iter().copied().find(|h| h.delta() == (dx, dy))
    }

    /// Case-insensitive match against the eight short codes.
    pub fn from_code(code: &str) -> Option<Heading> {
        Heading::ALL
            .iter()
            .copied()
            .find(|h| h.code().eq_ignore_ascii_case(code))
    }

    /// Cyclic forward distance from `self` to `other`:
    /// `(self.ordinal - other.ordinal + 8) mod 8`.
    pub fn ordinal_distance(self, other: Heading) -> u8 {
        (self.ordinal() + 8 - other.ordinal()) % 8
    }
}

impl fmt::Display for Heading {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Forward or backward intent relative to the current heading.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Course {
    Forward,
    Backward,
}

impl Course {
    pub fn as_str(self) -> &'static str {
        match self {
            Course::Forward => "Forward",
            Course::Backward => "Backward",
        }
    }
}

/// Turn bias applied together with a course.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Rudder {
    Left,
    Center,
    Right,
}

impl Rudder {
    pub fn as_str(self) -> &'static str {
        match self {
            Rudder::Left => "Left",
            Rudder::Center => "Center",
            Rudder::Right => "Right",
        }
    }
}

/// The command vocabulary of the ship control service: a heading change is
/// always requested as a (course, rudder) pair.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct HelmCommand {
    pub course: Course,
    pub rudder: Rudder,
}
