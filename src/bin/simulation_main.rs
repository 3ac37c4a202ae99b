// simulation_main.rs
//
// Usage: simulation_main [config.json] [overpass.json south west north east]
use city_traffic_sim::config::SimulationConfig;
use city_traffic_sim::monitoring::traffic_monitoring_system::{
    log_city_summary, render_pollution_heatmap, SummaryPublisher,
};
use city_traffic_sim::shared_data::{CitySnapshot, CitySummary};
use city_traffic_sim::simulation_engine::driver::{run_simulation, SimulationCommand};
use city_traffic_sim::simulation_engine::grid::CellType;
use city_traffic_sim::simulation_engine::osm::parse_overpass_json;
use city_traffic_sim::simulation_engine::rasterize::GeoBounds;
use city_traffic_sim::{CityError, CityResult, EditCommand, Simulation};
use log::{error, info, warn};
use std::fs;
use tokio::sync::{mpsc, watch};

/// A plus-shaped street layout with a signal in the middle.
fn demo_layout(size: usize) -> Vec<EditCommand> {
    let mid = (size / 2) as i64;
    let mut edits = Vec::new();
    for i in 0..size as i64 {
        edits.push(EditCommand::new(i, mid, CellType::Road));
        edits.push(EditCommand::new(mid, i, CellType::Road));
    }
    edits.push(EditCommand::new(mid, mid, CellType::TrafficLight));
    edits
}

fn load_import(args: &[String]) -> CityResult<Option<SimulationCommand>> {
    let Some(path) = args.get(2) else {
        return Ok(None);
    };
    let coords: Vec<f64> = args[3..]
        .iter()
        .filter_map(|a| a.parse::<f64>().ok())
        .collect();
    let &[south, west, north, east] = coords.as_slice() else {
        return Err(CityError::InvalidConfig {
            reason: "import needs south west north east after the Overpass file".to_string(),
        });
    };
    let segments = parse_overpass_json(&fs::read_to_string(path)?)?;
    info!("Loaded {} road segments from {}", segments.len(), path);
    Ok(Some(SimulationCommand::Import {
        bounds: GeoBounds::new(south, west, north, east),
        segments,
    }))
}

// Writes summaries, the heatmap and queue messages off the simulation thread.
fn spawn_monitoring(
    config: &SimulationConfig,
    mut snapshots: watch::Receiver<CitySnapshot>,
) -> tokio::task::JoinHandle<()> {
    let monitoring = config.monitoring.clone();
    let (tx, mut rx) = mpsc::channel::<(CitySummary, CitySnapshot)>(4);

    tokio::task::spawn_blocking(move || {
        let mut publisher = monitoring.amqp_url.as_deref().and_then(|url| {
            SummaryPublisher::connect(url)
                .map_err(|e| warn!("AMQP unavailable, summaries stay local: {}", e))
                .ok()
        });
        while let Some((summary, snapshot)) = rx.blocking_recv() {
            log_city_summary(&monitoring.summary_csv, &summary);
            if let Err(e) = render_pollution_heatmap(
                &monitoring.heatmap_png,
                snapshot.grid.size(),
                &snapshot.air_quality,
            ) {
                warn!("Error rendering pollution heatmap: {}", e);
            }
            if let Some(p) = publisher.as_mut() {
                if let Err(e) = p.publish(&summary) {
                    warn!("Error publishing city summary: {}", e);
                }
            }
        }
        if let Some(p) = publisher {
            let _ = p.close();
        }
    });

    let every = config.monitoring.summary_every_frames;
    tokio::spawn(async move {
        if every == 0 {
            return;
        }
        let mut next_frame = every;
        while snapshots.changed().await.is_ok() {
            let snapshot = snapshots.borrow_and_update().clone();
            if snapshot.frame >= next_frame {
                next_frame = snapshot.frame + every;
                let summary = snapshot.summary();
                if tx.send((summary, snapshot)).await.is_err() {
                    break;
                }
            }
        }
    })
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    env_logger::init();

    let args: Vec<String> = std::env::args().collect();
    let config = match args.get(1) {
        Some(path) => match SimulationConfig::from_file(path) {
            Ok(config) => config,
            Err(e) => {
                error!("Cannot load config {}: {}", path, e);
                return;
            }
        },
        None => SimulationConfig::default(),
    };

    let import = match load_import(&args) {
        Ok(import) => import,
        Err(e) => {
            error!("Cannot load import: {}", e);
            return;
        }
    };

    let sim = match Simulation::new(config.clone()) {
        Ok(sim) => sim,
        Err(e) => {
            error!("Invalid simulation config: {}", e);
            return;
        }
    };

    let (cmd_tx, cmd_rx) = mpsc::channel(64);
    let (snap_tx, snap_rx) = watch::channel(sim.snapshot());
    let (stop_tx, stop_rx) = watch::channel(false);

    let monitor = spawn_monitoring(&config, snap_rx);
    let simulation = tokio::spawn(run_simulation(sim, cmd_rx, snap_tx, stop_rx));

    let setup: Vec<SimulationCommand> = match import {
        Some(import) => vec![import],
        None => demo_layout(config.grid_size)
            .into_iter()
            .map(SimulationCommand::Edit)
            .collect(),
    };
    for command in setup {
        if cmd_tx.send(command).await.is_err() {
            break;
        }
    }

    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Cannot listen for Ctrl-C: {}", e);
    }
    info!("Shutting down simulation");
    let _ = stop_tx.send(true);

    match simulation.await {
        Ok(sim) => println!("{}", serde_json::to_string_pretty(&sim.summary()).unwrap_or_default()),
        Err(e) => error!("Simulation task failed: {}", e),
    }
    let _ = monitor.await;
}
