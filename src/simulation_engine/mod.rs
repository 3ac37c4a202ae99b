// simulation_engine/mod.rs
pub mod air_quality;
pub mod classifier;
pub mod driver;
pub mod grid;
pub mod movement;
pub mod osm;
pub mod rasterize;
pub mod route_generation;
pub mod simulation;
pub mod vehicles;
