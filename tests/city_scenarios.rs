use city_traffic_sim::control_system::traffic_light_controller::Phase;
use city_traffic_sim::simulation_engine::grid::{CellType, GridPos};
use city_traffic_sim::simulation_engine::rasterize::{GeoBounds, LatLon, RoadSegment};
use city_traffic_sim::{EditCommand, Simulation, SimulationConfig};

fn quiet_sim(grid_size: usize) -> Simulation {
    Simulation::new(SimulationConfig {
        grid_size,
        vehicle_count: 0,
        min_speed: 0.5,
        max_speed: 0.5,
        building_probability: 0.0,
        seed: Some(42),
        ..SimulationConfig::default()
    })
    .unwrap()
}

fn cycle(sim: &mut Simulation) {
    for _ in 0..sim.config().light_cycle_ticks {
        sim.controller_tick();
    }
}

#[test]
fn vehicle_waits_at_red_light_and_pollutes() {
    let mut sim = quiet_sim(5);
    for y in 0..5 {
        sim.apply_edit(EditCommand::new(2, y, CellType::Road)).unwrap();
    }
    sim.apply_edit(EditCommand::new(2, 2, CellType::TrafficLight))
        .unwrap();

    let light = GridPos::new(2, 2);
    assert_eq!(sim.grid().get(light), CellType::TrafficLight);
    assert_eq!(sim.controllers().len(), 1);

    let id = sim.spawn_vehicle_at(GridPos::new(2, 0)).unwrap();
    assert_eq!(sim.vehicles()[0].id, id);
    assert_eq!(sim.vehicles()[0].path[1], GridPos::new(2, 1));

    // Vertical travel is blocked once the signal shows green east-west.
    cycle(&mut sim);
    assert_eq!(sim.controllers()[0].phase, Phase::GreenEW);

    for _ in 0..100 {
        sim.frame_tick();
    }
    let half_cell = sim.config().cell_size / 2.0;
    let vehicle = &sim.vehicles()[0];
    assert_eq!(vehicle.current_node(), GridPos::new(2, 1));
    assert_eq!(vehicle.next_node(), Some(light));
    let parked = vehicle.position;
    assert!(parked.distance_to(sim.world().to_world(light)) <= half_cell + 1e-9);

    let mut last = sim.air_quality().get(light);
    assert!(last > 0.0);
    for _ in 0..20 {
        let events = sim.frame_tick();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].pos, light);
        assert_eq!(sim.vehicles()[0].position, parked);
        let now = sim.air_quality().get(light);
        assert!(now > last, "pollution did not grow: {} -> {}", last, now);
        last = now;
    }

    cycle(&mut sim);
    assert_eq!(sim.controllers()[0].phase, Phase::GreenNS);
    assert!(sim.frame_tick().is_empty());
    assert_ne!(sim.vehicles()[0].position, parked);
}

#[test]
fn controllers_track_light_edits() {
    let mut sim = quiet_sim(6);
    let edits = [
        (1, 1, CellType::TrafficLight),
        (3, 1, CellType::TrafficLight),
        (2, 1, CellType::TrafficLight),
        (4, 4, CellType::TrafficLight),
        (2, 1, CellType::Road),
        (9, 9, CellType::TrafficLight),
        (4, 4, CellType::Empty),
        (1, 2, CellType::TrafficLight),
    ];
    for (x, y, cell_type) in edits {
        let _ = sim.apply_edit(EditCommand::new(x, y, cell_type));
        assert!(sim.lights().is_consistent_with(sim.grid()));
    }

    // (1,1)-(2,1)-(3,1) merged into one controller that survived losing (2,1).
    assert_eq!(sim.controllers().len(), 1);
    let controller = &sim.controllers()[0];
    assert_eq!(controller.id, 1);
    let cells: Vec<GridPos> = controller.cells.iter().copied().collect();
    assert_eq!(
        cells,
        vec![GridPos::new(1, 1), GridPos::new(1, 2), GridPos::new(3, 1)]
    );
}

#[test]
fn imported_cross_gets_an_intersection() {
    let mut sim = quiet_sim(5);
    let bounds = GeoBounds::new(0.0, 0.0, 1.0, 1.0);
    let segments = [
        RoadSegment {
            start: LatLon { lat: 0.5, lon: 0.0 },
            end: LatLon { lat: 0.5, lon: 1.0 },
        },
        RoadSegment {
            start: LatLon { lat: 0.0, lon: 0.5 },
            end: LatLon { lat: 1.0, lon: 0.5 },
        },
    ];
    sim.import_geodata(&bounds, &segments).unwrap();

    let grid = sim.grid();
    assert_eq!(grid.get(GridPos::new(2, 2)), CellType::Intersection);
    assert_eq!(grid.get(GridPos::new(0, 2)), CellType::Road);
    assert_eq!(grid.get(GridPos::new(2, 4)), CellType::Road);
    assert_eq!(grid.count(CellType::Building), 0);
    assert!(sim.controllers().is_empty());
    assert_eq!(sim.summary().intersection_cells, 1);
}
