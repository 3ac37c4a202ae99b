// classifier.rs
//
// Derives Road vs Intersection from the road-like 4-neighbour count.
// Empty, Building and TrafficLight cells are placed by the user or the
// importer and are never reclassified.

use crate::simulation_engine::grid::{CellType, CityGrid, GridPos};

/// Type a cell should have given the current grid.
pub fn derived_type(grid: &CityGrid, pos: GridPos) -> CellType {
    let current = grid.get(pos);
    match current {
        CellType::Empty | CellType::Building | CellType::TrafficLight => current,
        CellType::Road | CellType::Intersection => {
            let road_neighbors = grid
                .neighbors4(pos)
                .filter(|&n| grid.get(n).is_road_like())
                .count();
            if road_neighbors > 2 {
                CellType::Intersection
            } else {
                CellType::Road
            }
        }
    }
}

/// Reclassifies `pos` and its up to eight neighbours after an edit at `pos`.
///
/// Counts are taken from the grid as it stands before any of the nine cells
/// is rewritten, so the result does not depend on visiting order.
pub fn reclassify_neighborhood(grid: &mut CityGrid, pos: GridPos) {
    let affected: Vec<GridPos> = std::iter::once(pos).chain(grid.neighbors8(pos)).collect();
    apply_pass(grid, &affected);
}

/// Single synchronous pass over the whole grid.
pub fn classify_all(grid: &mut CityGrid) {
    let all: Vec<GridPos> = grid.positions().collect();
    apply_pass(grid, &all);
}

fn apply_pass(grid: &mut CityGrid, positions: &[GridPos]) {
    let updates: Vec<(GridPos, CellType)> = positions
        .iter()
        .map(|&p| (p, derived_type(grid, p)))
        .filter(|&(p, t)| grid.get(p) != t)
        .collect();
    for (p, t) in updates {
        grid.set(p, t);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid_with(size: usize, cells: &[(usize, usize, CellType)]) -> CityGrid {
        let mut grid = CityGrid::new(size);
        for &(x, y, t) in cells {
            grid.set(GridPos::new(x, y), t);
        }
        grid
    }

    #[test]
    fn neighbor_count_boundary() {
        let center = GridPos::new(1, 1);
        let arms = [(1, 0), (1, 2), (0, 1), (2, 1)];

        for count in 0..=4 {
            let mut cells = vec![(1, 1, CellType::Road)];
            cells.extend(arms[..count].iter().map(|&(x, y)| (x, y, CellType::Road)));
            let grid = grid_with(3, &cells);

            let expected = if count > 2 {
                CellType::Intersection
            } else {
                CellType::Road
            };
            assert_eq!(derived_type(&grid, center), expected, "{count} neighbours");
        }
    }

    #[test]
    fn traffic_lights_count_as_road_like_but_stay_put() {
        let mut grid = grid_with(
            3,
            &[
                (1, 1, CellType::Road),
                (1, 0, CellType::TrafficLight),
                (0, 1, CellType::TrafficLight),
                (2, 1, CellType::Intersection),
            ],
        );
        classify_all(&mut grid);
        assert_eq!(grid.get(GridPos::new(1, 1)), CellType::Intersection);
        assert_eq!(grid.get(GridPos::new(1, 0)), CellType::TrafficLight);
        // (2,1) only touches (1,1)
        assert_eq!(grid.get(GridPos::new(2, 1)), CellType::Road);
    }

    #[test]
    fn buildings_are_not_road_like() {
        let grid = grid_with(
            3,
            &[
                (1, 1, CellType::Intersection),
                (1, 0, CellType::Building),
                (1, 2, CellType::Road),
                (0, 1, CellType::Road),
                (2, 1, CellType::Building),
            ],
        );
        assert_eq!(derived_type(&grid, GridPos::new(1, 1)), CellType::Road);
    }

    #[test]
    fn neighborhood_pass_stays_local() {
        // A stale Intersection far away from the edit must not be touched.
        let mut grid = grid_with(
            6,
            &[(5, 5, CellType::Intersection), (2, 2, CellType::Road)],
        );
        grid.set(GridPos::new(2, 1), CellType::Road);
        grid.set(GridPos::new(1, 2), CellType::Road);
        grid.set(GridPos::new(3, 2), CellType::Road);
        reclassify_neighborhood(&mut grid, GridPos::new(3, 2));

        assert_eq!(grid.get(GridPos::new(2, 2)), CellType::Intersection);
        assert_eq!(grid.get(GridPos::new(5, 5)), CellType::Intersection);
    }

    #[test]
    fn classify_all_is_idempotent() {
        let mut grid = grid_with(
            5,
            &[
                (0, 2, CellType::Road),
                (1, 2, CellType::Road),
                (2, 2, CellType::Road),
                (3, 2, CellType::Road),
                (2, 0, CellType::Road),
                (2, 1, CellType::Road),
                (2, 3, CellType::TrafficLight),
                (4, 4, CellType::Building),
            ],
        );
        classify_all(&mut grid);
        let once = grid.clone();
        classify_all(&mut grid);
        assert_eq!(grid, once);
        assert_eq!(grid.get(GridPos::new(2, 2)), CellType::Intersection);
    }
}
