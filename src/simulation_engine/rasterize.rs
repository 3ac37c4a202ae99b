// rasterize.rs
//
// Turns imported road geometry (lat/lon line segments inside a bounding box)
// into a populated city grid: project, draw with Bresenham, classify, then
// scatter buildings along the roads.

use crate::error::{CityError, CityResult};
use crate::simulation_engine::classifier::classify_all;
use crate::simulation_engine::grid::{CellType, CityGrid, GridPos};
use log::{debug, warn};
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Geographic bounding box in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoBounds {
    pub south: f64,
    pub west: f64,
    pub north: f64,
    pub east: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLon {
    pub lat: f64,
    pub lon: f64,
}

/// One straight piece of a road as delivered by the geodata fetcher.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RoadSegment {
    pub start: LatLon,
    pub end: LatLon,
}

impl GeoBounds {
    pub fn new(south: f64, west: f64, north: f64, east: f64) -> Self {
        Self {
            south,
            west,
            north,
            east,
        }
    }

    /// Rejects non-finite, inverted, zero-area or off-globe boxes.
    pub fn validate(&self) -> CityResult<()> {
        let finite = [self.south, self.west, self.north, self.east]
            .iter()
            .all(|v| v.is_finite());
        let on_globe = (-90.0..=90.0).contains(&self.south)
            && (-90.0..=90.0).contains(&self.north)
            && (-180.0..=180.0).contains(&self.west)
            && (-180.0..=180.0).contains(&self.east);

        if finite && on_globe && self.south < self.north && self.west < self.east {
            Ok(())
        } else {
            Err(CityError::InvalidBounds {
                south: self.south,
                west: self.west,
                north: self.north,
                east: self.east,
            })
        }
    }

    /// Continuous (column, row) coordinates on an `n`×`n` grid. The box maps
    /// onto `[0, n - 1]` in both axes.
    pub fn project_f64(&self, point: LatLon, n: usize) -> (f64, f64) {
        let span = n.saturating_sub(1) as f64;
        let col = (point.lon - self.west) / (self.east - self.west) * span;
        let row = (self.north - point.lat) / (self.north - self.south) * span;
        (col, row)
    }

    /// Projects a point to signed (column, row) indices on an `n`×`n` grid.
    /// Points outside the box land outside `0..n`.
    pub fn project(&self, point: LatLon, n: usize) -> (i64, i64) {
        let (col, row) = self.project_f64(point, n);
        (col.floor() as i64, row.floor() as i64)
    }
}

/// Liang–Barsky clip of the segment `a`–`b` to the square `[0, max]²`.
/// Returns `None` when no part of the segment lies inside.
pub fn clip_to_square(a: (f64, f64), b: (f64, f64), max: f64) -> Option<((f64, f64), (f64, f64))> {
    let dx = b.0 - a.0;
    let dy = b.1 - a.1;
    // (parameter, edge that cut the segment there)
    let mut enter: (f64, Option<usize>) = (0.0, None);
    let mut leave: (f64, Option<usize>) = (1.0, None);

    let edges = [(-dx, a.0), (dx, max - a.0), (-dy, a.1), (dy, max - a.1)];
    for (edge, (p, q)) in edges.into_iter().enumerate() {
        if p == 0.0 {
            if q < 0.0 {
                return None;
            }
            continue;
        }
        let r = q / p;
        if p < 0.0 {
            if r > leave.0 {
                return None;
            }
            if r > enter.0 {
                enter = (r, Some(edge));
            }
        } else {
            if r < enter.0 {
                return None;
            }
            if r < leave.0 {
                leave = (r, Some(edge));
            }
        }
    }

    // Points on a cutting edge take that edge's coordinate exactly; on long
    // segments `a + t * d` is off by whole cells.
    let at = |(t, edge): (f64, Option<usize>)| {
        let mut point = (a.0 + t * dx, a.1 + t * dy);
        match edge {
            Some(0) => point.0 = 0.0,
            Some(1) => point.0 = max,
            Some(2) => point.1 = 0.0,
            Some(3) => point.1 = max,
            _ => {}
        }
        point
    };
    Some((at(enter), at(leave)))
}

// Rounding can leave the free coordinate of a clipped point outside the square.
fn to_cell((x, y): (f64, f64), max: f64) -> (i64, i64) {
    (x.clamp(0.0, max).floor() as i64, y.clamp(0.0, max).floor() as i64)
}

/// Marks every in-bounds cell on the line from `(x0, y0)` to `(x1, y1)` as
/// `Road`. Terminates after one cell when both endpoints coincide.
pub fn draw_line(grid: &mut CityGrid, (mut x0, mut y0): (i64, i64), (x1, y1): (i64, i64)) {
    let dx = (x1 - x0).abs();
    let dy = (y1 - y0).abs();
    let sx = if x0 < x1 { 1 } else { -1 };
    let sy = if y0 < y1 { 1 } else { -1 };
    let mut err = dx - dy;

    loop {
        if let Ok(pos) = grid.checked_pos(x0, y0) {
            grid.set(pos, CellType::Road);
        }
        if x0 == x1 && y0 == y1 {
            break;
        }
        let e2 = 2 * err;
        if e2 > -dy {
            err -= dy;
            x0 += sx;
        }
        if e2 < dx {
            err += dx;
            y0 += sy;
        }
    }
}

/// Builds a fresh grid from imported road geometry.
///
/// Fails only on invalid bounds; an empty segment list yields an empty grid.
pub fn rasterize_segments<R: Rng + ?Sized>(
    bounds: &GeoBounds,
    segments: &[RoadSegment],
    grid_size: usize,
    building_probability: f64,
    rng: &mut R,
) -> CityResult<CityGrid> {
    bounds.validate()?;
    let mut grid = CityGrid::new(grid_size);
    let max = grid_size.saturating_sub(1) as f64;

    let mut drawn = 0usize;
    for segment in segments {
        let coords = [
            segment.start.lat,
            segment.start.lon,
            segment.end.lat,
            segment.end.lon,
        ];
        if coords.iter().any(|c| !c.is_finite()) {
            warn!("Skipping road segment with non-finite coordinates: {:?}", segment);
            continue;
        }

        let start = bounds.project_f64(segment.start, grid_size);
        let end = bounds.project_f64(segment.end, grid_size);
        if [start.0, start.1, end.0, end.1].iter().any(|c| !c.is_finite()) {
            warn!("Skipping road segment projecting to infinity: {:?}", segment);
            continue;
        }

        // Only the part inside the grid is walked, so the line stays short.
        let Some((a, b)) = clip_to_square(start, end, max) else {
            continue;
        };
        draw_line(&mut grid, to_cell(a, max), to_cell(b, max));
        drawn += 1;
    }

    classify_all(&mut grid);
    place_buildings(&mut grid, building_probability, rng);

    debug!(
        "Rasterized {} of {} segments: {} roads, {} intersections, {} buildings",
        drawn,
        segments.len(),
        grid.count(CellType::Road),
        grid.count(CellType::Intersection),
        grid.count(CellType::Building)
    );
    Ok(grid)
}

/// Turns empty cells touching a road (8-connected) into buildings with
/// independent probability `probability`.
pub fn place_buildings<R: Rng + ?Sized>(grid: &mut CityGrid, probability: f64, rng: &mut R) {
    let candidates: Vec<GridPos> = grid
        .positions()
        .filter(|&pos| grid.get(pos) == CellType::Empty)
        .filter(|&pos| {
            grid.neighbors8(pos).any(|n| {
                matches!(grid.get(n), CellType::Road | CellType::Intersection)
            })
        })
        .collect();

    for pos in candidates {
        if rng.random_bool(probability) {
            grid.set(pos, CellType::Building);
        }
    }
}
