use crate::error::{CityError, CityResult};
use crate::global_variables::*;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Tunables for one simulation instance. Every field falls back to the
/// defaults in `global_variables` when missing from the config file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Side length of the square grid. Fixed for the lifetime of a simulation.
    pub grid_size: usize,
    /// World units per grid cell.
    pub cell_size: f64,
    /// Number of vehicle candidates built on every grid change.
    pub vehicle_count: usize,
    /// Maximum number of moves in a generated path.
    pub max_path_length: usize,
    pub min_speed: f64,
    pub max_speed: f64,
    /// Controller ticks between two phase flips.
    pub light_cycle_ticks: u32,
    pub light_tick_ms: u64,
    pub frame_tick_ms: u64,
    pub pollution_per_idle: f64,
    pub pollution_decay: f64,
    pub pollution_threshold: f64,
    pub building_probability: f64,
    /// Fixed RNG seed for reproducible runs.
    pub seed: Option<u64>,
    pub monitoring: MonitoringConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitoringConfig {
    /// Frame ticks between two summary records. Zero disables monitoring.
    pub summary_every_frames: u64,
    pub summary_csv: String,
    pub heatmap_png: String,
    /// Summaries are only published when an AMQP URL is set.
    pub amqp_url: Option<String>,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            grid_size: GRID_SIZE,
            cell_size: CELL_SIZE,
            vehicle_count: VEHICLE_COUNT,
            max_path_length: MAX_PATH_LENGTH,
            min_speed: VEHICLE_MIN_SPEED,
            max_speed: VEHICLE_MAX_SPEED,
            light_cycle_ticks: LIGHT_CYCLE_TICKS,
            light_tick_ms: LIGHT_TICK_MS,
            frame_tick_ms: FRAME_TICK_MS,
            pollution_per_idle: POLLUTION_PER_IDLE,
            pollution_decay: POLLUTION_DECAY,
            pollution_threshold: POLLUTION_THRESHOLD,
            building_probability: BUILDING_PROBABILITY,
            seed: None,
            monitoring: MonitoringConfig::default(),
        }
    }
}

impl Default for MonitoringConfig {
    fn default() -> Self {
        Self {
            summary_every_frames: 600,
            summary_csv: SUMMARY_CSV.to_string(),
            heatmap_png: POLLUTION_HEATMAP_PNG.to_string(),
            amqp_url: None,
        }
    }
}

impl SimulationConfig {
    /// Reads a JSON config file and validates it.
    pub fn from_file(path: impl AsRef<Path>) -> CityResult<Self> {
        let raw = fs::read_to_string(path)?;
        let config: SimulationConfig = serde_json::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> CityResult<()> {
        let fail = |reason: &str| {
            Err(CityError::InvalidConfig {
                reason: reason.to_string(),
            })
        };

        if self.grid_size == 0 {
            return fail("grid_size must be at least 1");
        }
        if !(self.cell_size > 0.0) {
            return fail("cell_size must be positive");
        }
        if !(self.min_speed > 0.0 && self.min_speed <= self.max_speed) {
            return fail("speeds must satisfy 0 < min_speed <= max_speed");
        }
        if self.light_cycle_ticks == 0 {
            return fail("light_cycle_ticks must be at least 1");
        }
        if self.light_tick_ms == 0 || self.frame_tick_ms == 0 {
            return fail("tick intervals must be positive");
        }
        if !(self.pollution_decay > 0.0 && self.pollution_decay < 1.0) {
            return fail("pollution_decay must lie in (0, 1)");
        }
        if !(self.pollution_threshold >= 0.0) || !(self.pollution_per_idle >= 0.0) {
            return fail("pollution_threshold and pollution_per_idle must be non-negative");
        }
        if !(0.0..=1.0).contains(&self.building_probability) {
            return fail("building_probability must lie in [0, 1]");
        }
        Ok(())
    }
}
