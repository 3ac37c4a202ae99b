// route_generation.rs
//
// Random-walk routes over road-like cells. A walk never turns straight back
// onto the cell it just left; otherwise every road-like neighbour is equally
// likely. Walks end early at dead ends.

use crate::simulation_engine::grid::{CityGrid, GridPos};
use rand::seq::IndexedRandom;
use rand::Rng;

/// Step order matches the direction list used to build candidate moves.
const DIRECTIONS: [(i64, i64); 4] = [(0, 1), (0, -1), (1, 0), (-1, 0)];

/// Walks at most `max_steps` moves from `start`. The returned path always
/// begins with `start`; a length of 1 means no move was possible.
pub fn random_walk<R: Rng + ?Sized>(
    grid: &CityGrid,
    start: GridPos,
    max_steps: usize,
    rng: &mut R,
) -> Vec<GridPos> {
    let mut path = vec![start];
    let mut current = start;
    let mut last_dir: Option<(i64, i64)> = None;

    for _ in 0..max_steps {
        let moves: Vec<(GridPos, (i64, i64))> = DIRECTIONS
            .iter()
            .filter(|&&(dx, dy)| last_dir != Some((-dx, -dy)))
            .filter_map(|&(dx, dy)| grid.offset(current, dx, dy).map(|next| (next, (dx, dy))))
            .filter(|&(next, _)| grid.get(next).is_road_like())
            .collect();

        let Some(&(next, dir)) = moves.choose(rng) else {
            break;
        };
        path.push(next);
        current = next;
        last_dir = Some(dir);
    }
    path
}

/// Picks a random road-like start cell and walks from it. `None` when the
/// grid has no road-like cells.
pub fn generate_random_route<R: Rng + ?Sized>(
    grid: &CityGrid,
    road_cells: &[GridPos],
    max_steps: usize,
    rng: &mut R,
) -> Option<Vec<GridPos>> {
    let &start = road_cells.choose(rng)?;
    Some(random_walk(grid, start, max_steps, rng))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulation_engine::grid::CellType;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn road_row(size: usize, y: usize) -> CityGrid {
        let mut grid = CityGrid::new(size);
        for x in 0..size {
            grid.set(GridPos::new(x, y), CellType::Road);
        }
        grid
    }

    #[test]
    fn straight_road_is_followed_to_the_end() {
        let grid = road_row(5, 2);
        let mut rng = StdRng::seed_from_u64(4);
        let path = random_walk(&grid, GridPos::new(0, 2), 100, &mut rng);
        let expected: Vec<_> = (0..5).map(|x| GridPos::new(x, 2)).collect();
        assert_eq!(path, expected);
    }

    #[test]
    fn walk_respects_step_limit() {
        let mut grid = CityGrid::new(6);
        for pos in grid.positions().collect::<Vec<_>>() {
            grid.set(pos, CellType::Road);
        }
        let mut rng = StdRng::seed_from_u64(11);
        let path = random_walk(&grid, GridPos::new(3, 3), 7, &mut rng);
        assert_eq!(path.len(), 8);
    }

    #[test]
    fn walk_never_reverses_and_stays_on_roads() {
        let mut grid = CityGrid::new(8);
        for i in 0..8 {
            grid.set(GridPos::new(i, 3), CellType::Road);
            grid.set(GridPos::new(4, i), CellType::Intersection);
        }
        grid.set(GridPos::new(4, 3), CellType::TrafficLight);

        let mut rng = StdRng::seed_from_u64(5);
        for _ in 0..50 {
            let path = random_walk(&grid, GridPos::new(0, 3), 100, &mut rng);
            for pair in path.windows(2) {
                assert_eq!(pair[0].manhattan(pair[1]), 1);
                assert!(grid.get(pair[1]).is_road_like());
            }
            for triple in path.windows(3) {
                assert_ne!(triple[0], triple[2], "U-turn in {:?}", path);
            }
        }
    }

    #[test]
    fn isolated_cell_yields_single_node_path() {
        let mut grid = CityGrid::new(3);
        grid.set(GridPos::new(1, 1), CellType::Road);
        let mut rng = StdRng::seed_from_u64(0);
        let path = generate_random_route(&grid, &grid.road_like_positions(), 100, &mut rng);
        assert_eq!(path, Some(vec![GridPos::new(1, 1)]));
        assert!(generate_random_route(&CityGrid::new(3), &[], 100, &mut rng).is_none());
    }
}
