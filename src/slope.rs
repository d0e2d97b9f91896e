//! Slope analysis: gradient magnitude in physical units, expressed as a
//! rise/run percentage, and the buildability statistics derived from it.

use crate::grid::Grid;
use rayon::prelude::*;

/// Physical elevation represented by a normalized height of 1.0 (meters).
pub const HEIGHT_SCALE_METERS: f32 = 1024.0;

/// Slope at or below this percentage counts as buildable.
pub const BUILDABLE_SLOPE_PCT: f32 = 5.0;

/// Upper edge of the "near buildable" band used by corrective smoothing.
pub const NEAR_BUILDABLE_SLOPE_PCT: f32 = 10.0;

/// Aggregate slope statistics for a heightmap.
#[derive(Debug, Clone, serde::Serialize)]
pub struct SlopeStats {
    pub buildable_pct: f32,
    pub near_buildable_pct: f32,
    pub unbuildable_pct: f32,
    pub mean_slope_pct: f32,
    pub max_slope_pct: f32,
}

/// Compute the slope field of a normalized heightmap, as a percentage.
///
/// Central differences in the interior, one-sided differences at the edges.
/// `map_size_m` fixes the physical pixel pitch; heights are scaled by
/// [`HEIGHT_SCALE_METERS`].
pub fn slope_field(heightmap: &Grid<f32>, map_size_m: f32) -> Grid<f32> {
    let n = heightmap.resolution;
    let pixel_m = map_size_m / n as f32;
    let mut out = Grid::new_with(n, 0.0f32);

    out.as_mut_slice()
        .par_chunks_mut(n)
        .enumerate()
        .for_each(|(y, row)| {
            for (x, cell) in row.iter_mut().enumerate() {
                let (gx, gy) = gradient_normalized(heightmap, x, y);
                // Normalized height units per pixel -> meters per meter
                let rise_x = gx * HEIGHT_SCALE_METERS / pixel_m;
                let rise_y = gy * HEIGHT_SCALE_METERS / pixel_m;
                *cell = (rise_x * rise_x + rise_y * rise_y).sqrt() * 100.0;
            }
        });

    out
}

/// Gradient of the normalized heightmap at a cell, in height units per pixel.
fn gradient_normalized(heightmap: &Grid<f32>, x: usize, y: usize) -> (f32, f32) {
    let n = heightmap.resolution;

    let gx = if x == 0 {
        *heightmap.get(1, y) - *heightmap.get(0, y)
    } else if x == n - 1 {
        *heightmap.get(x, y) - *heightmap.get(x - 1, y)
    } else {
        (*heightmap.get(x + 1, y) - *heightmap.get(x - 1, y)) / 2.0
    };

    let gy = if y == 0 {
        *heightmap.get(x, 1) - *heightmap.get(x, 0)
    } else if y == n - 1 {
        *heightmap.get(x, y) - *heightmap.get(x, y - 1)
    } else {
        (*heightmap.get(x, y + 1) - *heightmap.get(x, y - 1)) / 2.0
    };

    (gx, gy)
}

/// Percentage of cells with slope at or below the buildable threshold.
pub fn buildable_percentage(slopes: &Grid<f32>) -> f32 {
    let total = slopes.as_slice().len();
    let buildable = slopes
        .as_slice()
        .iter()
        .filter(|&&s| s <= BUILDABLE_SLOPE_PCT)
        .count();
    100.0 * buildable as f32 / total as f32
}

/// Full slope statistics over a slope field.
pub fn slope_stats(slopes: &Grid<f32>) -> SlopeStats {
    let total = slopes.as_slice().len() as f32;
    let mut buildable = 0usize;
    let mut near = 0usize;
    let mut sum = 0.0f64;
    let mut max = 0.0f32;

    for &s in slopes.as_slice() {
        if s <= BUILDABLE_SLOPE_PCT {
            buildable += 1;
        } else if s <= NEAR_BUILDABLE_SLOPE_PCT {
            near += 1;
        }
        sum += s as f64;
        if s > max {
            max = s;
        }
    }

    let buildable_pct = 100.0 * buildable as f32 / total;
    let near_pct = 100.0 * near as f32 / total;
    SlopeStats {
        buildable_pct,
        near_buildable_pct: near_pct,
        unbuildable_pct: 100.0 - buildable_pct - near_pct,
        mean_slope_pct: (sum / total as f64) as f32,
        max_slope_pct: max,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flat_terrain_is_fully_buildable() {
        let heightmap = Grid::new_with(64, 0.5f32);
        let slopes = slope_field(&heightmap, 14336.0);
        assert_eq!(buildable_percentage(&slopes), 100.0);
        for (_, _, &s) in slopes.iter() {
            assert_eq!(s, 0.0);
        }
    }

    #[test]
    fn test_linear_ramp_has_constant_closed_form_slope() {
        // Ramp rising 1/n normalized units per pixel. Rise per pixel is
        // HEIGHT_SCALE_METERS / n meters over a run of map_size / n meters,
        // so the slope is HEIGHT_SCALE / map_size regardless of n.
        let n = 256;
        let map_size = 14336.0f32;
        let mut heightmap = Grid::new_with(n, 0.0f32);
        for (x, _, v) in heightmap.iter_mut() {
            *v = x as f32 / n as f32;
        }

        let expected = HEIGHT_SCALE_METERS / map_size * 100.0; // 7.1428...%
        let slopes = slope_field(&heightmap, map_size);
        for (_, _, &s) in slopes.iter() {
            assert!(
                (s - expected).abs() < 0.01,
                "slope {} != expected {}",
                s,
                expected
            );
        }
    }

    #[test]
    fn test_slope_stats_classification() {
        // Half the rows flat, half on a steep ramp
        let n = 64;
        let mut heightmap = Grid::new_with(n, 0.0f32);
        for (x, y, v) in heightmap.iter_mut() {
            if y >= n / 2 {
                *v = x as f32 * 8.0 / n as f32; // ~57% slope at 14336m span
            }
        }
        let slopes = slope_field(&heightmap, 14336.0);
        let stats = slope_stats(&slopes);
        assert!(stats.buildable_pct > 40.0 && stats.buildable_pct < 60.0);
        assert!(stats.unbuildable_pct > 30.0);
        assert!(stats.max_slope_pct > 50.0);
    }
}
