//! Breadth-First Path Solver
//!
//! ## Overview
//!
//! Finds the shortest route (in hops) from a start cell to the nearest exit.
//! The grid is 4-connected: a device may step north, south, west or east,
//! never diagonally.
//!
//! ## Algorithm
//!
//! ```text
//! queue ← [start]
//! while queue not empty:
//!     cell ← pop front
//!     if cell is an exit: walk parents back to start, done
//!     for n in [N, S, W, E] of cell:
//!         if passable and unseen: parent[n] = cell, push back
//! ```
//!
//! The exit test happens when a cell is dequeued, so the first exit dequeued
//! wins when several are equally near. Neighbour order is fixed (N, S, W, E),
//! which makes tie-breaking deterministic.
//!
//! ## Failure
//!
//! An empty [`Path`] means "no path": the start is a wall, lies outside the
//! grid, or is cut off from every exit. [`PathSolver::try_solve`] turns the
//! same outcome into [`NavError::NoPathFound`] for callers that prefer `?`.

use std::collections::VecDeque;

use serde::Serialize;

use crate::errors::{CoreResult, NavError};
use crate::grid::{Cell, GridTopology};

/// Neighbour offsets in exploration order: N, S, W, E
const NEIGHBOURS: [(i32, i32); 4] = [(0, 1), (0, -1), (-1, 0), (1, 0)];

/// Ordered cells from a start to an exit, both included
///
/// Empty when no route exists.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Path {
    cells: Vec<Cell>,
}

impl Path {
    /// The "no path" value
    pub fn none() -> Self {
        Self::default()
    }

    /// Wrap an explicit cell sequence
    pub fn from_cells(cells: Vec<Cell>) -> Self {
        Self { cells }
    }

    /// Cells from start to exit, inclusive
    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    /// No route was found
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Number of cells, endpoints included
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    /// Number of steps: `len - 1`, or 0 for an empty path
    pub fn hops(&self) -> usize {
        self.cells.len().saturating_sub(1)
    }

    /// First cell
    pub fn start(&self) -> Option<Cell> {
        self.cells.first().copied()
    }

    /// The exit the path ends at
    pub fn exit(&self) -> Option<Cell> {
        self.cells.last().copied()
    }

    /// Iterate the cells in walking order
    pub fn iter(&self) -> impl Iterator<Item = &Cell> {
        self.cells.iter()
    }
}

impl From<Vec<(i32, i32)>> for Path {
    fn from(cells: Vec<(i32, i32)>) -> Self {
        Self::from_cells(cells.into_iter().map(Cell::from).collect())
    }
}

/// BFS over a shared, read-only grid
#[derive(Debug, Clone, Copy)]
pub struct PathSolver<'g> {
    grid: &'g GridTopology,
}

impl<'g> PathSolver<'g> {
    /// Solver over `grid`
    pub fn new(grid: &'g GridTopology) -> Self {
        Self { grid }
    }

    /// Shortest path from `start` to the nearest exit, empty if none exists
    pub fn solve(&self, start: Cell) -> Path {
        if !self.grid.is_passable(start) {
            return Path::none();
        }

        let width = self.grid.width();
        let index = |cell: Cell| cell.y as usize * width + cell.x as usize;

        let mut parent: Vec<Option<Cell>> = vec![None; width * self.grid.height()];
        let mut seen = vec![false; width * self.grid.height()];
        let mut queue = VecDeque::new();

        seen[index(start)] = true;
        queue.push_back(start);

        while let Some(cell) = queue.pop_front() {
            if self.grid.is_exit(cell) {
                return Self::walk_back(cell, &parent, index);
            }

            for (dx, dy) in NEIGHBOURS {
                let next = Cell::new(cell.x + dx, cell.y + dy);
                if !self.grid.is_passable(next) || seen[index(next)] {
                    continue;
                }
                seen[index(next)] = true;
                parent[index(next)] = Some(cell);
                queue.push_back(next);
            }
        }

        Path::none()
    }

    /// Like [`solve`](Self::solve), but an unreachable exit is an error
    pub fn try_solve(&self, start: Cell) -> CoreResult<Path> {
        let path = self.solve(start);
        if path.is_empty() {
            return Err(NavError::NoPathFound { x: start.x, y: start.y });
        }
        Ok(path)
    }

    fn walk_back(exit: Cell, parent: &[Option<Cell>], index: impl Fn(Cell) -> usize) -> Path {
        let mut cells = vec![exit];
        let mut cursor = exit;
        while let Some(prev) = parent[index(cursor)] {
            cells.push(prev);
            cursor = prev;
        }
        cells.reverse();
        Path::from_cells(cells)
    }
}
