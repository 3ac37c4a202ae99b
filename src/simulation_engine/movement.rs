use crate::control_system::traffic_light_controller::TrafficLightController;
use crate::simulation_engine::grid::GridPos;
use crate::simulation_engine::vehicles::{Vehicle, VehicleId, WorldFrame, WorldPos};
use log::trace;
use serde::{Deserialize, Serialize};

/// A vehicle waiting for right of way in front of `pos` during one tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdleEvent {
    pub vehicle_id: VehicleId,
    pub pos: GridPos,
}

/// Outcome of moving one vehicle for one frame tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MoveOutcome {
    Arrived,
    Stopped(IdleEvent),
    Moved,
    ReachedNode(GridPos),
}

/// True if a vehicle heading from `from` to `to` must wait at `to`'s signal.
/// A row change is vertical (N/S) travel, a column change horizontal (E/W).
fn must_stop(lights: &TrafficLightController, from: GridPos, to: GridPos) -> bool {
    match lights.controller_at(to) {
        Some(controller) => controller.phase.blocks(to.y != from.y),
        None => false,
    }
}

/// Advances a vehicle towards its next path node.
///
/// Inside half a cell of a signalised node whose phase blocks the vehicle's
/// axis it holds position and reports an idle event. Otherwise it moves one
/// speed increment, snapping onto the node once it is closer than that.
pub fn advance_vehicle(
    vehicle: &mut Vehicle,
    lights: &TrafficLightController,
    frame: &WorldFrame,
) -> MoveOutcome {
    let Some(target) = vehicle.next_node() else {
        return MoveOutcome::Arrived;
    };
    let target_pos = frame.to_world(target);
    let distance = vehicle.position.distance_to(target_pos);

    if distance < frame.cell_size / 2.0 && must_stop(lights, vehicle.current_node(), target) {
        trace!("Vehicle {} waiting at {}", vehicle.id, target);
        return MoveOutcome::Stopped(IdleEvent {
            vehicle_id: vehicle.id,
            pos: target,
        });
    }

    if distance < vehicle.speed || distance == 0.0 {
        vehicle.position = target_pos;
        vehicle.path_index += 1;
        return MoveOutcome::ReachedNode(target);
    }

    let step = vehicle.speed / distance;
    vehicle.position = WorldPos {
        x: vehicle.position.x + (target_pos.x - vehicle.position.x) * step,
        z: vehicle.position.z + (target_pos.z - vehicle.position.z) * step,
    };
    MoveOutcome::Moved
}

/// Moves every vehicle once and collects the idle events of this tick.
pub fn simulate_vehicle_movement(
    vehicles: &mut [Vehicle],
    lights: &TrafficLightController,
    frame: &WorldFrame,
) -> Vec<IdleEvent> {
    vehicles
        .iter_mut()
        .filter_map(|vehicle| match advance_vehicle(vehicle, lights, frame) {
            MoveOutcome::Stopped(event) => Some(event),
            _ => None,
        })
        .collect()
}
