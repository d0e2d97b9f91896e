//! Detail injection: high-frequency texture for steep terrain only.
//!
//! Small-amplitude noise is added in proportion to local slope. Cells
//! below the lower slope gate receive exactly zero perturbation — not
//! "almost zero" — so flat buildable land survives byte-for-byte.

use crate::grid::Grid;
use crate::noise_field::NoiseField;
use crate::normalize::smart_normalize;
use crate::slope::slope_field;

#[derive(Debug, Clone)]
pub struct DetailParams {
    /// Detail amplitude relative to the terrain's amplitude range.
    pub amplitude: f32,
    /// Detail noise wavelength in meters.
    pub wavelength_m: f64,
    /// Slope (fractional rise/run) below which nothing is added.
    pub min_slope_threshold: f32,
    /// Slope at which detail reaches full strength.
    pub max_slope_threshold: f32,
}

impl Default for DetailParams {
    fn default() -> Self {
        Self {
            amplitude: 0.02,
            wavelength_m: 250.0,
            min_slope_threshold: 0.05,
            max_slope_threshold: 0.15,
        }
    }
}

/// Add slope-gated high-frequency detail. Pure pointwise operation.
pub fn add_detail(
    terrain: &Grid<f32>,
    map_size_m: f32,
    params: &DetailParams,
    seed: u64,
) -> Grid<f32> {
    let resolution = terrain.resolution;
    let noise = NoiseField::new(seed);
    let field = noise.sample_grid(
        resolution,
        map_size_m as f64,
        params.wavelength_m,
        3,
        0.5,
        2.0,
    );

    // Slope field is in percent; thresholds are fractional rise/run
    let slopes = slope_field(terrain, map_size_m);

    let (min, max) = terrain.min_max();
    let range = (max - min).max(f32::EPSILON);
    let scaled_amplitude = params.amplitude * range;

    let span = params.max_slope_threshold - params.min_slope_threshold;
    let mut out = terrain.clone();
    for (x, y, v) in out.iter_mut() {
        let slope = *slopes.get(x, y) / 100.0;
        let factor = ((slope - params.min_slope_threshold) / span).clamp(0.0, 1.0);
        if factor > 0.0 {
            let centered = *field.get(x, y) - 0.5;
            *v += centered * factor * scaled_amplitude;
        }
    }

    smart_normalize(&out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flat_cells_unchanged() {
        // Left half flat, right half steep
        let n = 64;
        let map_size = 14336.0f32;
        let mut terrain = Grid::new_with(n, 0.2f32);
        for (x, _, v) in terrain.iter_mut() {
            if x >= n / 2 {
                // ~9% slope at this resolution and span, still within [0, 1]
                *v = 0.2 + (x - n / 2) as f32 * 0.02;
            }
        }

        let slopes = slope_field(&terrain, map_size);
        let params = DetailParams::default();
        let detailed = add_detail(&terrain, map_size, &params, 42);

        for (x, y, &s) in slopes.iter() {
            if s / 100.0 < params.min_slope_threshold {
                let diff = (*detailed.get(x, y) - *terrain.get(x, y)).abs();
                assert!(diff < 1e-4, "flat cell ({}, {}) changed by {}", x, y, diff);
            }
        }
    }

    #[test]
    fn test_steep_cells_textured() {
        let n = 64;
        let mut terrain = Grid::new_with(n, 0.0f32);
        for (x, _, v) in terrain.iter_mut() {
            *v = x as f32 * 0.015; // ~7% slope everywhere
        }

        let detailed = add_detail(&terrain, 14336.0, &DetailParams::default(), 42);
        let normalized_input = crate::normalize::smart_normalize(&terrain);
        let changed = detailed
            .as_slice()
            .iter()
            .zip(normalized_input.as_slice())
            .filter(|(a, b)| (**a - **b).abs() > 1e-6)
            .count();
        assert!(changed > 0);
    }

    #[test]
    fn test_deterministic() {
        let mut terrain = Grid::new_with(32, 0.0f32);
        for (x, y, v) in terrain.iter_mut() {
            *v = (x + y) as f32 / 16.0;
        }
        let a = add_detail(&terrain, 14336.0, &DetailParams::default(), 9);
        let b = add_detail(&terrain, 14336.0, &DetailParams::default(), 9);
        assert_eq!(a.as_slice(), b.as_slice());
    }
}
