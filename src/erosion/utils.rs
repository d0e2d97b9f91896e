//! Bilinear sampling and deposition helpers for the droplet simulation.
//!
//! Droplets live at continuous positions; all terrain reads and writes go
//! through bilinear interpolation over the four surrounding cells so
//! erosion tracks are not grid-aligned.

use crate::grid::Grid;

/// Sample height at a floating-point position using bilinear interpolation.
/// Coordinates are clamped to the grid interior.
pub fn height_at(heightmap: &Grid<f32>, x: f32, y: f32) -> f32 {
    let n = heightmap.resolution;
    let x = x.clamp(0.0, n as f32 - 1.001);
    let y = y.clamp(0.0, n as f32 - 1.001);

    let x0 = x.floor() as usize;
    let y0 = y.floor() as usize;
    let x1 = (x0 + 1).min(n - 1);
    let y1 = (y0 + 1).min(n - 1);

    let fx = x.fract();
    let fy = y.fract();

    let h00 = *heightmap.get(x0, y0);
    let h10 = *heightmap.get(x1, y0);
    let h01 = *heightmap.get(x0, y1);
    let h11 = *heightmap.get(x1, y1);

    let h0 = h00 * (1.0 - fx) + h10 * fx;
    let h1 = h01 * (1.0 - fx) + h11 * fx;
    h0 * (1.0 - fy) + h1 * fy
}

/// Gradient at a floating-point position, pointing uphill.
pub fn gradient_at(heightmap: &Grid<f32>, x: f32, y: f32) -> (f32, f32) {
    let n = heightmap.resolution;
    let x = x.clamp(0.0, n as f32 - 1.001);
    let y = y.clamp(0.0, n as f32 - 1.001);

    let x0 = x.floor() as usize;
    let y0 = y.floor() as usize;
    let x1 = (x0 + 1).min(n - 1);
    let y1 = (y0 + 1).min(n - 1);

    let fx = x.fract();
    let fy = y.fract();

    let h00 = *heightmap.get(x0, y0);
    let h10 = *heightmap.get(x1, y0);
    let h01 = *heightmap.get(x0, y1);
    let h11 = *heightmap.get(x1, y1);

    let gx0 = h10 - h00;
    let gx1 = h11 - h01;
    let gy0 = h01 - h00;
    let gy1 = h11 - h10;

    (gx0 * (1.0 - fy) + gx1 * fy, gy0 * (1.0 - fx) + gy1 * fx)
}

/// The four cells around a continuous position with bilinear weights.
/// Weights sum to 1.
pub fn bilinear_cells(resolution: usize, x: f32, y: f32) -> [(usize, usize, f32); 4] {
    let x = x.clamp(0.0, resolution as f32 - 1.001);
    let y = y.clamp(0.0, resolution as f32 - 1.001);

    let x0 = x.floor() as usize;
    let y0 = y.floor() as usize;
    let x1 = (x0 + 1).min(resolution - 1);
    let y1 = (y0 + 1).min(resolution - 1);

    let fx = x.fract();
    let fy = y.fract();

    [
        (x0, y0, (1.0 - fx) * (1.0 - fy)),
        (x1, y0, fx * (1.0 - fy)),
        (x0, y1, (1.0 - fx) * fy),
        (x1, y1, fx * fy),
    ]
}

/// Add `amount` (signed) to the terrain, distributed bilinearly around the
/// given continuous position.
pub fn apply_change(heightmap: &mut Grid<f32>, x: f32, y: f32, amount: f32) {
    for (cx, cy, w) in bilinear_cells(heightmap.resolution, x, y) {
        let current = *heightmap.get(cx, cy);
        heightmap.set(cx, cy, current + amount * w);
    }
}

/// Record the same change as (flat index, delta) pairs instead of writing
/// directly. Used by the batch-parallel path, where each droplet owns a
/// private change list merged afterwards.
pub fn record_change(
    changes: &mut Vec<(usize, f32)>,
    resolution: usize,
    x: f32,
    y: f32,
    amount: f32,
) {
    for (cx, cy, w) in bilinear_cells(resolution, x, y) {
        changes.push((cy * resolution + cx, amount * w));
    }
}
