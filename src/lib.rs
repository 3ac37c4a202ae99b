//! Grid city simulation kernel: road layout inference, signal controllers,
//! vehicle motion and air-quality accumulation from idling traffic.

pub mod config;
pub mod control_system;
pub mod error;
pub mod global_variables;
pub mod monitoring;
pub mod shared_data;
pub mod simulation_engine;

pub use config::SimulationConfig;
pub use error::{CityError, CityResult};
pub use simulation_engine::simulation::{EditCommand, Simulation};
