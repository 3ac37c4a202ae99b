use crate::simulation_engine::grid::GridPos;
use serde::{Deserialize, Serialize};

pub type VehicleId = u64;

/// Continuous ground-plane position in world units.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WorldPos {
    pub x: f64,
    pub z: f64,
}

impl WorldPos {
    pub fn distance_to(self, other: WorldPos) -> f64 {
        (other.x - self.x).hypot(other.z - self.z)
    }
}

/// Maps grid cells to world space, centring the grid on the origin.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WorldFrame {
    pub grid_size: usize,
    pub cell_size: f64,
}

impl WorldFrame {
    pub fn to_world(&self, pos: GridPos) -> WorldPos {
        let half = self.grid_size as f64 * self.cell_size / 2.0;
        WorldPos {
            x: pos.x as f64 * self.cell_size - half,
            z: pos.y as f64 * self.cell_size - half,
        }
    }
}

/// A vehicle following a precomputed path through the grid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vehicle {
    pub id: VehicleId,
    pub path: Vec<GridPos>,
    pub path_index: usize,
    pub position: WorldPos,
    /// World units per frame tick.
    pub speed: f64,
    /// Display only.
    pub color: String,
}

impl Vehicle {
    /// Places a vehicle on the first node of `path`. Paths shorter than two
    /// nodes cannot move and yield `None`.
    pub fn new(
        id: VehicleId,
        path: Vec<GridPos>,
        speed: f64,
        color: impl Into<String>,
        frame: &WorldFrame,
    ) -> Option<Self> {
        if path.len() < 2 {
            return None;
        }
        let position = frame.to_world(path[0]);
        Some(Self {
            id,
            path,
            path_index: 0,
            position,
            speed,
            color: color.into(),
        })
    }

    pub fn current_node(&self) -> GridPos {
        self.path[self.path_index]
    }

    /// Node the vehicle is heading to, `None` once it has arrived.
    pub fn next_node(&self) -> Option<GridPos> {
        self.path.get(self.path_index + 1).copied()
    }

    pub fn has_arrived(&self) -> bool {
        self.path_index + 1 >= self.path.len()
    }
}
