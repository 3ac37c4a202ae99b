use crate::simulation_engine::grid::{CellType, CityGrid, GridPos};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};

pub type ControllerId = u64;

/// Direction of travel currently given right of way.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Phase {
    GreenNS,
    GreenEW,
}

impl Phase {
    pub fn flipped(self) -> Self {
        match self {
            Phase::GreenNS => Phase::GreenEW,
            Phase::GreenEW => Phase::GreenNS,
        }
    }

    /// Whether travel along this axis must wait.
    pub fn blocks(self, vertical: bool) -> bool {
        match self {
            Phase::GreenNS => !vertical,
            Phase::GreenEW => vertical,
        }
    }
}

/// A group of adjacent traffic-light cells switching together.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntersectionController {
    pub id: ControllerId,
    pub cells: BTreeSet<GridPos>,
    pub phase: Phase,
    pub remaining_ticks: u32,
}

impl IntersectionController {
    fn new(id: ControllerId, cell: GridPos, cycle_ticks: u32) -> Self {
        Self {
            id,
            cells: BTreeSet::from([cell]),
            phase: Phase::GreenNS,
            remaining_ticks: cycle_ticks,
        }
    }

    /// True if some cell of this controller is orthogonally adjacent to `pos`.
    pub fn touches(&self, pos: GridPos) -> bool {
        self.cells.iter().any(|&c| c.manhattan(pos) == 1)
    }

    /// Counts down one tick; flips the phase when the timer runs out.
    /// Returns true when the phase flipped.
    pub fn update(&mut self, cycle_ticks: u32) -> bool {
        self.remaining_ticks = self.remaining_ticks.saturating_sub(1);
        if self.remaining_ticks == 0 {
            self.phase = self.phase.flipped();
            self.remaining_ticks = cycle_ticks;
            true
        } else {
            false
        }
    }
}

/// Owns every intersection controller plus a cell → controller index.
///
/// Controllers are kept in creation order, which is also the merge order: on
/// a multi-way merge the oldest controller keeps its id, phase and timer.
#[derive(Debug, Clone)]
pub struct TrafficLightController {
    controllers: Vec<IntersectionController>,
    index: HashMap<GridPos, ControllerId>,
    next_id: ControllerId,
    cycle_ticks: u32,
}

impl TrafficLightController {
    pub fn new(cycle_ticks: u32) -> Self {
        Self {
            controllers: Vec::new(),
            index: HashMap::new(),
            next_id: 1,
            cycle_ticks,
        }
    }

    pub fn controllers(&self) -> &[IntersectionController] {
        &self.controllers
    }

    pub fn len(&self) -> usize {
        self.controllers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.controllers.is_empty()
    }

    /// Controller governing `pos`, if any.
    pub fn controller_at(&self, pos: GridPos) -> Option<&IntersectionController> {
        let id = self.index.get(&pos)?;
        self.controllers.iter().find(|c| c.id == *id)
    }

    pub fn get(&self, id: ControllerId) -> Option<&IntersectionController> {
        self.controllers.iter().find(|c| c.id == id)
    }

    /// Registers a new traffic-light cell, merging every controller adjacent
    /// to it into one. Returns the id of the owning controller.
    pub fn on_light_added(&mut self, pos: GridPos) -> ControllerId {
        if let Some(&owner) = self.index.get(&pos) {
            return owner;
        }

        let matched: Vec<usize> = self
            .controllers
            .iter()
            .enumerate()
            .filter(|(_, c)| c.touches(pos))
            .map(|(i, _)| i)
            .collect();

        let Some((&first, rest)) = matched.split_first() else {
            let id = self.next_id;
            self.next_id += 1;
            self.controllers
                .push(IntersectionController::new(id, pos, self.cycle_ticks));
            self.index.insert(pos, id);
            info!("Created intersection controller {} at {}", id, pos);
            return id;
        };

        // Remove absorbed controllers back to front so indices stay valid.
        let mut absorbed_cells = BTreeSet::new();
        for &i in rest.iter().rev() {
            let absorbed = self.controllers.remove(i);
            debug!("Controller {} absorbed into merge at {}", absorbed.id, pos);
            absorbed_cells.extend(absorbed.cells);
        }

        let survivor = &mut self.controllers[first];
        survivor.cells.extend(absorbed_cells);
        survivor.cells.insert(pos);
        let id = survivor.id;
        for &cell in &survivor.cells {
            self.index.insert(cell, id);
        }
        info!(
            "Merged {} controller(s) into {} ({} cells)",
            matched.len(),
            id,
            survivor.cells.len()
        );
        id
    }

    /// Drops a cell that is no longer a traffic light. A controller left
    /// without cells is destroyed.
    pub fn on_light_removed(&mut self, pos: GridPos) {
        let Some(id) = self.index.remove(&pos) else {
            return;
        };
        if let Some(i) = self.controllers.iter().position(|c| c.id == id) {
            self.controllers[i].cells.remove(&pos);
            if self.controllers[i].cells.is_empty() {
                self.controllers.remove(i);
                info!("Removed intersection controller {}", id);
            }
        }
    }

    /// Applies the controller delta implied by one cell changing type.
    pub fn apply_cell_change(&mut self, pos: GridPos, old: CellType, new: CellType) {
        if new == CellType::TrafficLight {
            self.on_light_added(pos);
        } else if old == CellType::TrafficLight {
            self.on_light_removed(pos);
        }
    }

    /// Advances every controller by one real-time tick.
    pub fn update_all(&mut self) {
        let cycle = self.cycle_ticks;
        for controller in self.controllers.iter_mut() {
            if controller.update(cycle) {
                debug!(
                    "Controller {} switching to {:?}",
                    controller.id, controller.phase
                );
            }
        }
    }

    pub fn clear(&mut self) {
        self.controllers.clear();
        self.index.clear();
    }

    /// Every TrafficLight cell is owned by exactly one controller and every
    /// owned cell is a TrafficLight.
    pub fn is_consistent_with(&self, grid: &CityGrid) -> bool {
        let mut owned = 0usize;
        for controller in &self.controllers {
            if controller.cells.is_empty() {
                return false;
            }
            for &cell in &controller.cells {
                owned += 1;
                if self.index.get(&cell) != Some(&controller.id)
                    || grid.get(cell) != CellType::TrafficLight
                {
                    return false;
                }
            }
        }
        owned == self.index.len() && owned == grid.count(CellType::TrafficLight)
    }
}
