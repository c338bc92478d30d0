//! Path to Move Sequence Conversion
//!
//! ## Overview
//!
//! A tracked device understands three primitive commands: step forward one
//! cell, turn left 90°, turn right 90°. This module turns a cell path plus
//! the device's current facing into those commands.
//!
//! ## Turn Selection
//!
//! Headings form the cycle N → E → S → W. For each step the needed heading
//! is compared with the current one:
//!
//! ```text
//! diff = (needed - current) mod 4
//!
//! 0 → F
//! 1 → R F
//! 2 → R R F
//! 3 → L F
//! ```
//!
//! Zero-length steps are skipped; diagonal or multi-cell jumps are rejected
//! with [`NavError::InvalidStep`].
//!
//! ## Example
//!
//! ```rust
//! use lodestar_core::moves::{Heading, MoveCommand, MoveSequencer};
//! use lodestar_core::solver::Path;
//!
//! let path = Path::from(vec![(0, 0), (0, 1), (1, 1)]);
//! let seq = MoveSequencer::sequence(&path, Heading::North).unwrap();
//!
//! assert_eq!(seq.codes(), vec!["F", "R", "F"]);
//! assert_eq!(seq.final_heading, Heading::East);
//! ```

use serde::{Deserialize, Serialize};

use crate::errors::{CoreResult, NavError};
use crate::grid::Cell;
use crate::solver::Path;

/// Cardinal facing of a device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Heading {
    /// Facing +y
    #[default]
    #[serde(rename = "N")]
    North,
    /// Facing +x
    #[serde(rename = "E")]
    East,
    /// Facing -y
    #[serde(rename = "S")]
    South,
    /// Facing -x
    #[serde(rename = "W")]
    West,
}

impl Heading {
    /// Headings in clockwise order
    pub const CYCLE: [Heading; 4] = [Heading::North, Heading::East, Heading::South, Heading::West];

    fn index(self) -> u8 {
        match self {
            Self::North => 0,
            Self::East => 1,
            Self::South => 2,
            Self::West => 3,
        }
    }

    fn from_index(index: u8) -> Self {
        Self::CYCLE[(index % 4) as usize]
    }

    /// Heading after a 90° clockwise turn
    pub fn right(self) -> Self {
        Self::from_index(self.index() + 1)
    }

    /// Heading after a 90° counter-clockwise turn
    pub fn left(self) -> Self {
        Self::from_index(self.index() + 3)
    }

    /// Unit displacement of one forward step (+y is north)
    pub fn delta(self) -> (i32, i32) {
        match self {
            Self::North => (0, 1),
            Self::East => (1, 0),
            Self::South => (0, -1),
            Self::West => (-1, 0),
        }
    }

    /// Heading of a unit step, `None` for anything else
    pub fn from_delta(dx: i32, dy: i32) -> Option<Self> {
        match (dx, dy) {
            (0, 1) => Some(Self::North),
            (1, 0) => Some(Self::East),
            (0, -1) => Some(Self::South),
            (-1, 0) => Some(Self::West),
            _ => None,
        }
    }

    /// Single-letter code, `"N"`, `"E"`, `"S"` or `"W"`
    pub fn code(self) -> &'static str {
        match self {
            Self::North => "N",
            Self::East => "E",
            Self::South => "S",
            Self::West => "W",
        }
    }

    /// Parse a single-letter code (case-insensitive)
    pub fn from_code(code: &str) -> Option<Self> {
        match code.trim().to_ascii_uppercase().as_str() {
            "N" => Some(Self::North),
            "E" => Some(Self::East),
            "S" => Some(Self::South),
            "W" => Some(Self::West),
            _ => None,
        }
    }
}

/// One primitive device command
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MoveCommand {
    /// Step one cell ahead
    #[serde(rename = "F")]
    Forward,
    /// Turn 90° counter-clockwise in place
    #[serde(rename = "L")]
    TurnLeft,
    /// Turn 90° clockwise in place
    #[serde(rename = "R")]
    TurnRight,
}

impl MoveCommand {
    /// Wire code: `"F"`, `"L"` or `"R"`
    pub fn code(self) -> &'static str {
        match self {
            Self::Forward => "F",
            Self::TurnLeft => "L",
            Self::TurnRight => "R",
        }
    }

    /// Parse a wire code
    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "F" => Some(Self::Forward),
            "L" => Some(Self::TurnLeft),
            "R" => Some(Self::TurnRight),
            _ => None,
        }
    }

    /// Apply this command to a pose
    pub fn apply(self, cell: Cell, heading: Heading) -> (Cell, Heading) {
        match self {
            Self::Forward => {
                let (dx, dy) = heading.delta();
                (Cell::new(cell.x + dx, cell.y + dy), heading)
            }
            Self::TurnLeft => (cell, heading.left()),
            Self::TurnRight => (cell, heading.right()),
        }
    }
}

/// Commands for a whole path and the facing they leave the device in
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MoveSequence {
    /// Commands in execution order
    pub commands: Vec<MoveCommand>,
    /// Heading after the last command
    pub final_heading: Heading,
}

impl MoveSequence {
    /// Number of commands
    pub fn len(&self) -> usize {
        self.commands.len()
    }

    /// No commands
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Wire codes in order
    pub fn codes(&self) -> Vec<&'static str> {
        self.commands.iter().map(|cmd| cmd.code()).collect()
    }
}

/// Stateless path-to-command converter
pub struct MoveSequencer;

impl MoveSequencer {
    /// Convert `path` into commands starting from `heading`
    pub fn sequence(path: &Path, heading: Heading) -> CoreResult<MoveSequence> {
        let mut commands = Vec::with_capacity(path.len() * 2);
        let mut facing = heading;

        for step in path.cells().windows(2) {
            let (from, to) = (step[0], step[1]);
            let (dx, dy) = (to.x - from.x, to.y - from.y);
            if dx == 0 && dy == 0 {
                continue;
            }

            let needed = Heading::from_delta(dx, dy).ok_or(NavError::InvalidStep {
                from: from.into(),
                to: to.into(),
            })?;

            match (needed.index() + 4 - facing.index()) % 4 {
                1 => commands.push(MoveCommand::TurnRight),
                2 => commands.extend([MoveCommand::TurnRight, MoveCommand::TurnRight]),
                3 => commands.push(MoveCommand::TurnLeft),
                _ => {}
            }
            commands.push(MoveCommand::Forward);
            facing = needed;
        }

        Ok(MoveSequence { commands, final_heading: facing })
    }

    /// Heading reached after executing `commands` from `heading`
    pub fn heading_after(commands: &[MoveCommand], heading: Heading) -> Heading {
        commands.iter().fold(heading, |facing, cmd| match cmd {
            MoveCommand::Forward => facing,
            MoveCommand::TurnLeft => facing.left(),
            MoveCommand::TurnRight => facing.right(),
        })
    }

    /// Cells visited when executing `commands` from a pose, start included
    ///
    /// Consecutive duplicates never appear: turns do not add a cell.
    pub fn replay(start: Cell, heading: Heading, commands: &[MoveCommand]) -> Vec<Cell> {
        let mut cells = vec![start];
        let (mut cell, mut facing) = (start, heading);
        for cmd in commands {
            (cell, facing) = cmd.apply(cell, facing);
            if *cmd == MoveCommand::Forward {
                cells.push(cell);
            }
        }
        cells
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn north_then_east() {
        let path = Path::from(vec![(0, 0), (0, 1), (1, 1)]);
        let seq = MoveSequencer::sequence(&path, Heading::North).unwrap();
        assert_eq!(seq.codes(), vec!["F", "R", "F"]);
        assert_eq!(seq.final_heading, Heading::East);
    }

    #[test]
    fn about_face_turns_right_twice() {
        let path = Path::from(vec![(0, 1), (0, 0)]);
        let seq = MoveSequencer::sequence(&path, Heading::North).unwrap();
        assert_eq!(seq.codes(), vec!["R", "R", "F"]);
        assert_eq!(seq.final_heading, Heading::South);
    }

    #[test]
    fn left_turn_from_north() {
        let path = Path::from(vec![(1, 0), (0, 0)]);
        let seq = MoveSequencer::sequence(&path, Heading::North).unwrap();
        assert_eq!(seq.codes(), vec!["L", "F"]);
    }

    #[test]
    fn stationary_steps_are_skipped() {
        let path = Path::from(vec![(0, 0), (0, 0), (0, 1)]);
        let seq = MoveSequencer::sequence(&path, Heading::North).unwrap();
        assert_eq!(seq.codes(), vec!["F"]);
    }

    #[test]
    fn diagonal_step_is_rejected() {
        let path = Path::from(vec![(0, 0), (1, 1)]);
        assert_eq!(
            MoveSequencer::sequence(&path, Heading::North),
            Err(NavError::InvalidStep { from: (0, 0), to: (1, 1) })
        );
    }

    #[test]
    fn trivial_paths_emit_nothing() {
        for path in [Path::none(), Path::from(vec![(2, 2)])] {
            let seq = MoveSequencer::sequence(&path, Heading::West).unwrap();
            assert!(seq.is_empty());
            assert_eq!(seq.final_heading, Heading::West);
        }
    }

    #[test]
    fn replay_reproduces_path() {
        let path = Path::from(vec![(2, 2), (2, 1), (1, 1), (1, 2), (1, 3), (2, 3)]);
        let seq = MoveSequencer::sequence(&path, Heading::East).unwrap();
        let visited = MoveSequencer::replay(Cell::new(2, 2), Heading::East, &seq.commands);
        assert_eq!(visited, path.cells());
        assert_eq!(
            MoveSequencer::heading_after(&seq.commands, Heading::East),
            seq.final_heading
        );
    }

    #[test]
    fn heading_codes() {
        assert_eq!(Heading::from_code("w"), Some(Heading::West));
        assert_eq!(Heading::West.right(), Heading::North);
        assert_eq!(Heading::North.left(), Heading::West);
        assert_eq!(serde_json::to_string(&Heading::South).unwrap(), "\"S\"");
        assert_eq!(serde_json::to_string(&MoveCommand::TurnLeft).unwrap(), "\"L\"");
    }
}
