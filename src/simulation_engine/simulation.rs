// simulation.rs
use crate::config::SimulationConfig;
use crate::control_system::traffic_light_controller::{
    IntersectionController, TrafficLightController,
};
use crate::error::CityResult;
use crate::global_variables::VEHICLE_COLORS;
use crate::shared_data::{CitySnapshot, CitySummary};
use crate::simulation_engine::air_quality::AirQualityMap;
use crate::simulation_engine::classifier::reclassify_neighborhood;
use crate::simulation_engine::grid::{CellType, CityGrid, GridPos};
use crate::simulation_engine::movement::{simulate_vehicle_movement, IdleEvent};
use crate::simulation_engine::rasterize::{rasterize_segments, GeoBounds, RoadSegment};
use crate::simulation_engine::route_generation::{generate_random_route, random_walk};
use crate::simulation_engine::vehicles::{Vehicle, VehicleId, WorldFrame};
use log::{debug, info};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

/// A single cell edit coming from the editing surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EditCommand {
    pub x: i64,
    pub y: i64,
    pub cell_type: CellType,
}

impl EditCommand {
    pub fn new(x: i64, y: i64, cell_type: CellType) -> Self {
        Self { x, y, cell_type }
    }
}

/// Owns the grid, the signal controllers, the vehicles and the pollution map.
///
/// Every grid change runs as an explicit pipeline: mutate the grid,
/// reclassify, derive the controller delta, then rebuild the vehicle set.
pub struct Simulation {
    config: SimulationConfig,
    world: WorldFrame,
    grid: CityGrid,
    lights: TrafficLightController,
    vehicles: Vec<Vehicle>,
    air_quality: AirQualityMap,
    rng: StdRng,
    next_vehicle_id: VehicleId,
    frame: u64,
}

impl Simulation {
    pub fn new(config: SimulationConfig) -> CityResult<Self> {
        config.validate()?;
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        Ok(Self {
            world: WorldFrame {
                grid_size: config.grid_size,
                cell_size: config.cell_size,
            },
            grid: CityGrid::new(config.grid_size),
            lights: TrafficLightController::new(config.light_cycle_ticks),
            vehicles: Vec::new(),
            air_quality: AirQualityMap::new(),
            rng,
            next_vehicle_id: 1,
            frame: 0,
            config,
        })
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    pub fn world(&self) -> &WorldFrame {
        &self.world
    }

    pub fn grid(&self) -> &CityGrid {
        &self.grid
    }

    pub fn lights(&self) -> &TrafficLightController {
        &self.lights
    }

    pub fn controllers(&self) -> &[IntersectionController] {
        self.lights.controllers()
    }

    pub fn vehicles(&self) -> &[Vehicle] {
        &self.vehicles
    }

    pub fn air_quality(&self) -> &AirQualityMap {
        &self.air_quality
    }

    pub fn frame(&self) -> u64 {
        self.frame
    }

    /// Applies one cell edit. Out-of-range coordinates leave everything
    /// untouched.
    pub fn apply_edit(&mut self, edit: EditCommand) -> CityResult<()> {
        let pos = self.grid.checked_pos(edit.x, edit.y)?;
        let old = self.grid.get(pos);

        self.grid.set(pos, edit.cell_type);
        reclassify_neighborhood(&mut self.grid, pos);
        self.lights.apply_cell_change(pos, old, self.grid.get(pos));
        debug_assert!(
            self.lights.is_consistent_with(&self.grid),
            "traffic light ownership broken after editing {}",
            pos
        );

        debug!("Edited {} from {:?} to {:?}", pos, old, self.grid.get(pos));
        self.reset_vehicles();
        Ok(())
    }

    /// Replaces the grid with rasterized road geometry. Signal controllers
    /// and pollution start over; invalid bounds leave the current state as is.
    pub fn import_geodata(&mut self, bounds: &GeoBounds, segments: &[RoadSegment]) -> CityResult<()> {
        let grid = rasterize_segments(
            bounds,
            segments,
            self.config.grid_size,
            self.config.building_probability,
            &mut self.rng,
        )?;

        self.grid = grid;
        self.lights.clear();
        self.air_quality.clear();
        info!(
            "Imported {} road segments: {} road, {} intersection, {} building cells",
            segments.len(),
            self.grid.count(CellType::Road),
            self.grid.count(CellType::Intersection),
            self.grid.count(CellType::Building)
        );
        self.reset_vehicles();
        Ok(())
    }

    /// Throws away every vehicle and builds a fresh set on the current grid.
    pub fn reset_vehicles(&mut self) {
        let road_cells = self.grid.road_like_positions();
        if road_cells.is_empty() {
            self.vehicles.clear();
            return;
        }

        let mut fresh = Vec::with_capacity(self.config.vehicle_count);
        for _ in 0..self.config.vehicle_count {
            let Some(path) = generate_random_route(
                &self.grid,
                &road_cells,
                self.config.max_path_length,
                &mut self.rng,
            ) else {
                continue;
            };
            if let Some(vehicle) = self.build_vehicle(path) {
                fresh.push(vehicle);
            }
        }
        info!(
            "Spawned {} of {} vehicles on {} road cells",
            fresh.len(),
            self.config.vehicle_count,
            road_cells.len()
        );
        self.vehicles = fresh;
    }

    /// Adds one vehicle starting at `start`. Returns `None` if `start` is not
    /// a road-like cell or no move away from it exists.
    pub fn spawn_vehicle_at(&mut self, start: GridPos) -> Option<VehicleId> {
        if !self.grid.contains(start) || !self.grid.get(start).is_road_like() {
            return None;
        }
        let path = random_walk(&self.grid, start, self.config.max_path_length, &mut self.rng);
        let vehicle = self.build_vehicle(path)?;
        let id = vehicle.id;
        self.vehicles.push(vehicle);
        Some(id)
    }

    fn build_vehicle(&mut self, path: Vec<GridPos>) -> Option<Vehicle> {
        if path.len() < 2 {
            return None;
        }
        let speed = self
            .rng
            .random_range(self.config.min_speed..=self.config.max_speed);
        let color = VEHICLE_COLORS[self.rng.random_range(0..VEHICLE_COLORS.len())];
        let vehicle = Vehicle::new(self.next_vehicle_id, path, speed, color, &self.world)?;
        self.next_vehicle_id += 1;
        Some(vehicle)
    }

    /// Slow clock: one signal timer tick.
    pub fn controller_tick(&mut self) {
        self.lights.update_all();
    }

    /// Fast clock: move every vehicle, then update air quality from the
    /// vehicles that had to wait. Returns this tick's idle events.
    pub fn frame_tick(&mut self) -> Vec<IdleEvent> {
        let events = simulate_vehicle_movement(&mut self.vehicles, &self.lights, &self.world);
        self.air_quality.update(
            &events,
            self.config.pollution_decay,
            self.config.pollution_threshold,
            self.config.pollution_per_idle,
        );
        self.frame += 1;
        events
    }

    pub fn snapshot(&self) -> CitySnapshot {
        CitySnapshot {
            frame: self.frame,
            grid: self.grid.clone(),
            controllers: self.lights.controllers().to_vec(),
            vehicles: self.vehicles.clone(),
            air_quality: self.air_quality.clone(),
        }
    }

    pub fn summary(&self) -> CitySummary {
        CitySummary::collect(
            self.frame,
            &self.grid,
            self.lights.controllers(),
            self.vehicles.len(),
            &self.air_quality,
        )
    }
}
