use crate::error::{CityError, CityResult};
use serde::{Deserialize, Serialize};
use std::fmt;

/// What occupies a grid cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CellType {
    Empty,
    Road,
    Building,
    Intersection,
    TrafficLight,
}

impl CellType {
    /// Road, Intersection and TrafficLight cells can carry vehicles.
    pub fn is_road_like(self) -> bool {
        matches!(
            self,
            CellType::Road | CellType::Intersection | CellType::TrafficLight
        )
    }
}

/// Grid coordinate: `x` is the column, `y` the row (growing southward).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GridPos {
    pub x: usize,
    pub y: usize,
}

impl GridPos {
    pub fn new(x: usize, y: usize) -> Self {
        Self { x, y }
    }

    pub fn manhattan(self, other: GridPos) -> usize {
        self.x.abs_diff(other.x) + self.y.abs_diff(other.y)
    }
}

impl fmt::Display for GridPos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.x, self.y)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridCell {
    pub cell_type: CellType,
    /// Stable token for UI reconciliation. Carries no simulation meaning.
    pub id: u32,
}

/// The N×N city grid, stored row-major.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CityGrid {
    size: usize,
    cells: Vec<GridCell>,
}

impl CityGrid {
    /// Creates an all-`Empty` grid.
    pub fn new(size: usize) -> Self {
        let cells = (0..size * size)
            .map(|i| GridCell {
                cell_type: CellType::Empty,
                id: i as u32,
            })
            .collect();
        Self { size, cells }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn cells(&self) -> &[GridCell] {
        &self.cells
    }

    /// Validates signed coordinates coming from outside the kernel.
    pub fn checked_pos(&self, x: i64, y: i64) -> CityResult<GridPos> {
        let in_range = |v: i64| v >= 0 && (v as u64) < self.size as u64;
        if in_range(x) && in_range(y) {
            Ok(GridPos::new(x as usize, y as usize))
        } else {
            Err(CityError::OutOfBounds {
                x,
                y,
                size: self.size,
            })
        }
    }

    pub fn contains(&self, pos: GridPos) -> bool {
        pos.x < self.size && pos.y < self.size
    }

    pub fn get(&self, pos: GridPos) -> CellType {
        self.cells[pos.y * self.size + pos.x].cell_type
    }

    pub fn set(&mut self, pos: GridPos, cell_type: CellType) {
        self.cells[pos.y * self.size + pos.x].cell_type = cell_type;
    }

    pub fn cell(&self, pos: GridPos) -> &GridCell {
        &self.cells[pos.y * self.size + pos.x]
    }

    /// In-bounds cell moved by `(dx, dy)`, if any.
    pub fn offset(&self, pos: GridPos, dx: i64, dy: i64) -> Option<GridPos> {
        let x = pos.x as i64 + dx;
        let y = pos.y as i64 + dy;
        self.checked_pos(x, y).ok()
    }

    /// Up to four in-bounds orthogonal neighbours.
    pub fn neighbors4(&self, pos: GridPos) -> impl Iterator<Item = GridPos> + '_ {
        [(0, -1), (0, 1), (-1, 0), (1, 0)]
            .into_iter()
            .filter_map(move |(dx, dy)| self.offset(pos, dx, dy))
    }

    /// Up to eight in-bounds surrounding cells, excluding `pos` itself.
    pub fn neighbors8(&self, pos: GridPos) -> impl Iterator<Item = GridPos> + '_ {
        (-1..=1)
            .flat_map(|dy| (-1..=1).map(move |dx| (dx, dy)))
            .filter(|&(dx, dy)| dx != 0 || dy != 0)
            .filter_map(move |(dx, dy)| self.offset(pos, dx, dy))
    }

    pub fn positions(&self) -> impl Iterator<Item = GridPos> {
        let size = self.size;
        (0..size).flat_map(move |y| (0..size).map(move |x| GridPos::new(x, y)))
    }

    pub fn road_like_positions(&self) -> Vec<GridPos> {
        self.positions()
            .filter(|&pos| self.get(pos).is_road_like())
            .collect()
    }

    pub fn count(&self, cell_type: CellType) -> usize {
        self.cells
            .iter()
            .filter(|cell| cell.cell_type == cell_type)
            .count()
    }
}
