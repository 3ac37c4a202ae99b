// driver.rs
//
// Runs the two simulation clocks on a single task. Every select! branch
// mutates the simulation synchronously, so a tick is either fully applied or
// not started, and snapshots are only published between ticks.

use crate::shared_data::CitySnapshot;
use crate::simulation_engine::rasterize::{GeoBounds, RoadSegment};
use crate::simulation_engine::simulation::{EditCommand, Simulation};
use log::{info, warn};
use tokio::sync::{mpsc, watch};
use tokio::time::{interval, Duration, MissedTickBehavior};

/// Requests applied between ticks.
#[derive(Debug, Clone)]
pub enum SimulationCommand {
    Edit(EditCommand),
    Import {
        bounds: GeoBounds,
        segments: Vec<RoadSegment>,
    },
    ResetVehicles,
}

/// Applies one command, logging rejected ones instead of failing the loop.
pub fn apply_command(sim: &mut Simulation, command: SimulationCommand) {
    let result = match command {
        SimulationCommand::Edit(edit) => sim.apply_edit(edit),
        SimulationCommand::Import { bounds, segments } => sim.import_geodata(&bounds, &segments),
        SimulationCommand::ResetVehicles => {
            sim.reset_vehicles();
            Ok(())
        }
    };
    if let Err(e) = result {
        warn!("Rejected simulation command: {}", e);
    }
}

/// Drives `sim` until `shutdown` turns true (or its sender is dropped) and
/// hands the final state back.
pub async fn run_simulation(
    mut sim: Simulation,
    mut commands: mpsc::Receiver<SimulationCommand>,
    snapshots: watch::Sender<CitySnapshot>,
    mut shutdown: watch::Receiver<bool>,
) -> Simulation {
    let mut light_clock = interval(Duration::from_millis(sim.config().light_tick_ms));
    let mut frame_clock = interval(Duration::from_millis(sim.config().frame_tick_ms));
    light_clock.set_missed_tick_behavior(MissedTickBehavior::Delay);
    frame_clock.set_missed_tick_behavior(MissedTickBehavior::Skip);
    // Both intervals fire immediately; the first signal tick must wait a full period.
    light_clock.tick().await;

    let mut commands_open = true;
    snapshots.send_replace(sim.snapshot());
    info!("Simulation loop started");

    loop {
        if *shutdown.borrow() {
            break;
        }
        tokio::select! {
            biased;
            changed = shutdown.changed() => {
                if changed.is_err() {
                    break;
                }
            }
            command = commands.recv(), if commands_open => {
                match command {
                    Some(command) => apply_command(&mut sim, command),
                    None => commands_open = false,
                }
            }
            _ = light_clock.tick() => {
                sim.controller_tick();
            }
            _ = frame_clock.tick() => {
                sim.frame_tick();
            }
        }
        snapshots.send_replace(sim.snapshot());
    }

    info!("Simulation loop stopped after {} frames", sim.frame());
    sim
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SimulationConfig;
    use crate::simulation_engine::grid::CellType;

    fn fast_sim() -> Simulation {
        Simulation::new(SimulationConfig {
            grid_size: 5,
            vehicle_count: 2,
            light_tick_ms: 5,
            frame_tick_ms: 1,
            seed: Some(3),
            ..SimulationConfig::default()
        })
        .unwrap()
    }

    #[tokio::test]
    async fn commands_are_applied_and_published() {
        let sim = fast_sim();
        let (cmd_tx, cmd_rx) = mpsc::channel(8);
        let (snap_tx, mut snap_rx) = watch::channel(sim.snapshot());
        let (stop_tx, stop_rx) = watch::channel(false);
        let handle = tokio::spawn(run_simulation(sim, cmd_rx, snap_tx, stop_rx));

        for x in 0..5 {
            cmd_tx
                .send(SimulationCommand::Edit(EditCommand::new(x, 2, CellType::Road)))
                .await
                .unwrap();
        }
        cmd_tx
            .send(SimulationCommand::Edit(EditCommand::new(9, 9, CellType::Road)))
            .await
            .unwrap();

        loop {
            snap_rx.changed().await.unwrap();
            if snap_rx.borrow().grid.count(CellType::Road) == 5 {
                break;
            }
        }

        stop_tx.send(true).unwrap();
        let sim = handle.await.unwrap();
        assert_eq!(sim.grid().count(CellType::Road), 5);
        assert_eq!(sim.vehicles().len(), 2);
    }

    #[tokio::test]
    async fn dropping_the_shutdown_sender_stops_the_loop() {
        let sim = fast_sim();
        let (_cmd_tx, cmd_rx) = mpsc::channel(1);
        let (snap_tx, _snap_rx) = watch::channel(sim.snapshot());
        let (stop_tx, stop_rx) = watch::channel(false);
        let handle = tokio::spawn(run_simulation(sim, cmd_rx, snap_tx, stop_rx));

        tokio::time::sleep(Duration::from_millis(20)).await;
        drop(stop_tx);
        let sim = handle.await.unwrap();
        assert!(sim.frame() > 0);
    }
}
