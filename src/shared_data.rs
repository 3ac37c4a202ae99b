// src/shared_data.rs

use crate::control_system::traffic_light_controller::IntersectionController;
use crate::simulation_engine::air_quality::AirQualityMap;
use crate::simulation_engine::grid::{CellType, CityGrid};
use crate::simulation_engine::vehicles::Vehicle;
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

pub fn current_timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// Read-only copy of the whole simulation state, taken between ticks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CitySnapshot {
    pub frame: u64,
    pub grid: CityGrid,
    pub controllers: Vec<IntersectionController>,
    pub vehicles: Vec<Vehicle>,
    pub air_quality: AirQualityMap,
}

impl CitySnapshot {
    pub fn summary(&self) -> CitySummary {
        CitySummary::collect(
            self.frame,
            &self.grid,
            &self.controllers,
            self.vehicles.len(),
            &self.air_quality,
        )
    }
}

/// Aggregate numbers handed to external analysis. Flat so it fits a CSV row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CitySummary {
    pub timestamp: u64,
    pub frame: u64,
    pub grid_size: usize,
    pub empty_cells: usize,
    pub road_cells: usize,
    pub building_cells: usize,
    pub intersection_cells: usize,
    pub traffic_light_cells: usize,
    pub controllers: usize,
    pub vehicles: usize,
    pub polluted_cells: usize,
    pub min_pollution: f64,
    pub max_pollution: f64,
    pub average_pollution: f64,
}

impl CitySummary {
    pub fn collect(
        frame: u64,
        grid: &CityGrid,
        controllers: &[IntersectionController],
        vehicles: usize,
        air_quality: &AirQualityMap,
    ) -> Self {
        let (min_pollution, max_pollution, average_pollution) = air_quality.stats();
        Self {
            timestamp: current_timestamp(),
            frame,
            grid_size: grid.size(),
            empty_cells: grid.count(CellType::Empty),
            road_cells: grid.count(CellType::Road),
            building_cells: grid.count(CellType::Building),
            intersection_cells: grid.count(CellType::Intersection),
            traffic_light_cells: controllers.iter().map(|c| c.cells.len()).sum(),
            controllers: controllers.len(),
            vehicles,
            polluted_cells: air_quality.len(),
            min_pollution,
            max_pollution,
            average_pollution,
        }
    }

    pub fn count_of(&self, cell_type: CellType) -> usize {
        match cell_type {
            CellType::Empty => self.empty_cells,
            CellType::Road => self.road_cells,
            CellType::Building => self.building_cells,
            CellType::Intersection => self.intersection_cells,
            CellType::TrafficLight => self.traffic_light_cells,
        }
    }
}
