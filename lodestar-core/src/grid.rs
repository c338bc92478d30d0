//! Grid Topology of the Indoor Floor Plan
//!
//! ## Overview
//!
//! The navigable area is a rectangle of square cells, each a wall, a passage
//! or an exit. The grid is immutable once built and shared read-only by every
//! worker.
//!
//! ## Coordinate System
//!
//! Floor plans are authored the way people draw them: row-major text, first
//! line at the top. Navigation works in Cartesian coordinates with the origin
//! at the bottom-left corner, `x` growing east and `y` growing north. The one
//! conversion happens here, when the grid is built:
//!
//! ```text
//! authored (row, col)          Cartesian (x, y)
//!   row 0   # E # #              y = 2   # E # #
//!   row 1   # . . #      →       y = 1   # . . #
//!   row 2   # # # #              y = 0   # # # #
//!
//! x = col,  y = height - 1 - row
//! ```
//!
//! Radio map cells use the same Cartesian frame, so a fix `(x, y)` can be fed
//! straight into the path solver.
//!
//! ## Floor Plan Text
//!
//! | Symbol | Cell |
//! |--------|------|
//! | `#` or `1` | wall |
//! | `.` or `0` or space | passage |
//! | `E` or `2` | exit |

use serde::{Deserialize, Serialize};

use crate::errors::{CoreResult, NavError};

/// Classification of one grid cell
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CellKind {
    /// Impassable
    Wall,
    /// Walkable
    Passage,
    /// Walkable and a goal for evacuation
    Exit,
}

impl CellKind {
    /// Parse one floor-plan symbol
    pub fn from_symbol(symbol: char) -> Option<Self> {
        match symbol {
            '#' | '1' => Some(Self::Wall),
            '.' | '0' | ' ' => Some(Self::Passage),
            'E' | 'e' | '2' => Some(Self::Exit),
            _ => None,
        }
    }

    /// Canonical floor-plan symbol
    pub fn symbol(self) -> char {
        match self {
            Self::Wall => '#',
            Self::Passage => '.',
            Self::Exit => 'E',
        }
    }

    /// Whether a device can stand in this cell
    pub fn is_passable(self) -> bool {
        !matches!(self, Self::Wall)
    }
}

/// A cell address in Cartesian coordinates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Cell {
    /// Column, growing east
    pub x: i32,
    /// Row, growing north
    pub y: i32,
}

impl Cell {
    /// Cell at `(x, y)`
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Manhattan distance to another cell
    pub fn manhattan(&self, other: &Cell) -> u32 {
        self.x.abs_diff(other.x) + self.y.abs_diff(other.y)
    }

    /// Radio-map style identifier, `"x,y"`
    pub fn cell_id(&self) -> String {
        format!("{},{}", self.x, self.y)
    }
}

impl From<(i32, i32)> for Cell {
    fn from((x, y): (i32, i32)) -> Self {
        Self { x, y }
    }
}

impl From<Cell> for (i32, i32) {
    fn from(cell: Cell) -> Self {
        (cell.x, cell.y)
    }
}

/// Immutable wall/passage/exit classification in Cartesian coordinates
#[derive(Debug, Clone, PartialEq)]
pub struct GridTopology {
    width: usize,
    height: usize,
    /// Row-major by Cartesian `y`: index = y * width + x
    cells: Vec<CellKind>,
    /// Exits in authored reading order (top row first, left to right)
    exits: Vec<Cell>,
}

impl GridTopology {
    /// Build from authored rows (first row = top of the plan)
    ///
    /// Fails if the plan is empty, ragged, uses unknown symbols or has no exit.
    pub fn from_rows<S: AsRef<str>>(rows: &[S]) -> CoreResult<Self> {
        let rows: Vec<&str> = rows
            .iter()
            .map(|row| row.as_ref().trim_end_matches(['\r', '\n']))
            .collect();

        let height = rows.len();
        if height == 0 {
            return Err(NavError::invalid_grid("floor plan has no rows"));
        }

        let width = rows[0].chars().count();
        if width == 0 {
            return Err(NavError::invalid_grid("floor plan has empty rows"));
        }

        let mut visual = Vec::with_capacity(height);
        for (row_idx, row) in rows.iter().enumerate() {
            let parsed = row
                .chars()
                .enumerate()
                .map(|(col, symbol)| {
                    CellKind::from_symbol(symbol).ok_or_else(|| {
                        NavError::invalid_grid(format!(
                            "unknown symbol {symbol:?} at row {row_idx}, column {col}"
                        ))
                    })
                })
                .collect::<CoreResult<Vec<_>>>()?;

            if parsed.len() != width {
                return Err(NavError::invalid_grid(format!(
                    "row {row_idx} has {} cells, expected {width}",
                    parsed.len()
                )));
            }
            visual.push(parsed);
        }

        Self::from_visual(visual)
    }

    /// Parse a floor-plan text block, ignoring empty lines
    ///
    /// A line of spaces is a row of passages, not a blank line.
    pub fn parse(text: &str) -> CoreResult<Self> {
        let rows: Vec<&str> = text.lines().filter(|line| !line.is_empty()).collect();
        Self::from_rows(&rows)
    }

    /// Load a floor-plan text file
    pub fn from_path(path: impl AsRef<std::path::Path>) -> CoreResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| {
            NavError::invalid_grid(format!("cannot read {}: {e}", path.display()))
        })?;
        Self::parse(&text)
    }

    /// Build from a row-major authored matrix (row 0 = top)
    pub fn from_visual(visual: Vec<Vec<CellKind>>) -> CoreResult<Self> {
        let height = visual.len();
        let width = visual.first().map(Vec::len).unwrap_or(0);
        if height == 0 || width == 0 {
            return Err(NavError::invalid_grid("floor plan is empty"));
        }
        if visual.iter().any(|row| row.len() != width) {
            return Err(NavError::invalid_grid("floor plan rows differ in length"));
        }

        let mut cells = vec![CellKind::Wall; width * height];
        let mut exits = Vec::new();

        for (row, kinds) in visual.iter().enumerate() {
            for (col, &kind) in kinds.iter().enumerate() {
                let cell = visual_to_cartesian(row, col, height);
                cells[cell.y as usize * width + cell.x as usize] = kind;
                if kind == CellKind::Exit {
                    exits.push(cell);
                }
            }
        }

        if exits.is_empty() {
            return Err(NavError::invalid_grid("floor plan has no exit"));
        }

        Ok(Self { width, height, cells, exits })
    }

    /// The 16 × 12 mine layout the gateway ships with
    ///
    /// Three east-west galleries joined by two north-south shafts, a short
    /// dead-end spur and a hook-shaped side chamber, with four exits.
    pub fn default_floor_plan() -> Self {
        const PLAN: [&str; 16] = [
            "#######E####",
            "#.........##",
            "##.#####.###",
            "##.#####.###",
            "##.#####.###",
            "##.#####.###",
            "#E.#####.###",
            "#.........##",
            "#.........##",
            "##.#####.E##",
            "##.#####...#",
            "##.#####.#.#",
            "##.##.##...#",
            "##.##.##.###",
            "#.........##",
            "#######E####",
        ];
        match Self::from_rows(&PLAN) {
            Ok(grid) => grid,
            Err(err) => unreachable!("built-in floor plan is valid: {err}"),
        }
    }

    /// Columns
    pub fn width(&self) -> usize {
        self.width
    }

    /// Rows
    pub fn height(&self) -> usize {
        self.height
    }

    /// Exit cells in discovery order
    pub fn exits(&self) -> &[Cell] {
        &self.exits
    }

    /// Whether `cell` lies inside the grid
    pub fn contains(&self, cell: Cell) -> bool {
        cell.x >= 0 && cell.y >= 0 && (cell.x as usize) < self.width && (cell.y as usize) < self.height
    }

    /// Classification of `cell`, `None` outside the grid
    pub fn kind(&self, cell: Cell) -> Option<CellKind> {
        if !self.contains(cell) {
            return None;
        }
        Some(self.cells[cell.y as usize * self.width + cell.x as usize])
    }

    /// Inside the grid and not a wall
    pub fn is_passable(&self, cell: Cell) -> bool {
        self.kind(cell).is_some_and(CellKind::is_passable)
    }

    /// Inside the grid and marked as an exit
    pub fn is_exit(&self, cell: Cell) -> bool {
        self.kind(cell) == Some(CellKind::Exit)
    }

    /// All walkable cells, bottom row first
    pub fn passable_cells(&self) -> impl Iterator<Item = Cell> + '_ {
        (0..self.height as i32)
            .flat_map(move |y| (0..self.width as i32).map(move |x| Cell::new(x, y)))
            .filter(move |&cell| self.is_passable(cell))
    }

    /// Count of cells of each kind: (walls, passages, exits)
    pub fn census(&self) -> (usize, usize, usize) {
        self.cells.iter().fold((0, 0, 0), |(w, p, e), kind| match kind {
            CellKind::Wall => (w + 1, p, e),
            CellKind::Passage => (w, p + 1, e),
            CellKind::Exit => (w, p, e + 1),
        })
    }

    /// Render back to authored text (top row first)
    pub fn render(&self) -> String {
        let mut out = String::with_capacity((self.width + 1) * self.height);
        for y in (0..self.height as i32).rev() {
            for x in 0..self.width as i32 {
                let kind = self.kind(Cell::new(x, y)).unwrap_or(CellKind::Wall);
                out.push(kind.symbol());
            }
            out.push('\n');
        }
        out
    }
}

/// Convert an authored (row, column) position to Cartesian
pub fn visual_to_cartesian(row: usize, col: usize, height: usize) -> Cell {
    Cell::new(col as i32, (height - 1 - row) as i32)
}

/// Convert a Cartesian cell back to authored (row, column)
pub fn cartesian_to_visual(cell: Cell, height: usize) -> (usize, usize) {
    (height - 1 - cell.y as usize, cell.x as usize)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rows_flip_to_cartesian() {
        let grid = GridTopology::from_rows(&["#E#", "#.#", "###"]).unwrap();
        assert_eq!(grid.width(), 3);
        assert_eq!(grid.height(), 3);
        assert_eq!(grid.exits(), &[Cell::new(1, 2)]);
        assert_eq!(grid.kind(Cell::new(1, 1)), Some(CellKind::Passage));
        assert_eq!(grid.kind(Cell::new(1, 0)), Some(CellKind::Wall));
    }

    #[test]
    fn numeric_symbols_match_authoring_codes() {
        let grid = GridTopology::from_rows(&["121", "101"]).unwrap();
        assert!(grid.is_exit(Cell::new(1, 1)));
        assert!(grid.is_passable(Cell::new(1, 0)));
    }

    #[test]
    fn rejects_bad_plans() {
        assert!(matches!(
            GridTopology::from_rows::<&str>(&[]),
            Err(NavError::InvalidGrid { .. })
        ));
        assert!(GridTopology::from_rows(&["#.#", "##"]).is_err());
        assert!(GridTopology::from_rows(&["#X#"]).is_err());
        assert!(GridTopology::from_rows(&["#.#"]).is_err(), "no exit");
    }

    #[test]
    fn out_of_bounds_is_not_passable() {
        let grid = GridTopology::from_rows(&["E."]).unwrap();
        assert!(!grid.is_passable(Cell::new(-1, 0)));
        assert!(!grid.is_passable(Cell::new(2, 0)));
        assert_eq!(grid.kind(Cell::new(0, 1)), None);
    }

    #[test]
    fn default_plan_matches_mine_layout() {
        let grid = GridTopology::default_floor_plan();
        assert_eq!((grid.width(), grid.height()), (12, 16));
        assert_eq!(
            grid.exits(),
            &[Cell::new(7, 15), Cell::new(1, 9), Cell::new(9, 6), Cell::new(7, 0)]
        );
        // Hook detail: authored row 11, column 9 is a wall
        assert!(!grid.is_passable(visual_to_cartesian(11, 9, 16)));
        assert!(grid.is_passable(Cell::new(2, 7)));
    }

    #[test]
    fn render_round_trips() {
        let rows = ["#E#", "#..", "###"];
        let grid = GridTopology::from_rows(&rows).unwrap();
        assert_eq!(grid.render(), "#E#\n#..\n###\n");
        assert_eq!(GridTopology::parse(&grid.render()).unwrap(), grid);
    }

    #[test]
    fn row_of_spaces_is_a_passage_row() {
        let grid = GridTopology::parse("\n..E\r\n   \r\n#.#\n\n").unwrap();
        assert_eq!(grid.height(), 3);
        assert!(grid.is_exit(Cell::new(2, 2)));
        assert!((0..3).all(|x| grid.is_passable(Cell::new(x, 1))));
        assert!(!grid.is_passable(Cell::new(0, 0)));
    }

    #[test]
    fn coordinate_conversion_is_inverse() {
        let cell = visual_to_cartesian(3, 5, 16);
        assert_eq!(cell, Cell::new(5, 12));
        assert_eq!(cartesian_to_visual(cell, 16), (3, 5));
    }

    #[test]
    fn census_counts_kinds() {
        let grid = GridTopology::from_rows(&["#E", ".."]).unwrap();
        assert_eq!(grid.census(), (1, 2, 1));
        assert_eq!(grid.passable_cells().count(), 3);
    }
}
