//! Ridge enhancement: sharp linear ridge features for scenic zones.
//!
//! Coherent noise in [0, 1] is folded with `2·|0.5 − n|`, which puts
//! V-shaped creases along the noise midline. The zero-crossings of Perlin
//! noise form connected curves, so the creases read as ridgelines rather
//! than random bumps. A smoothstep over the zone potential keeps the
//! overlay strictly out of buildable land with a C¹-continuous ramp at the
//! boundary, so no seam appears.

use crate::grid::Grid;
use crate::noise_field::NoiseField;
use crate::pipeline::PipelineError;

#[derive(Debug, Clone)]
pub struct RidgeParams {
    /// Ridge noise octave count (4-6).
    pub octaves: u32,
    /// Ridge feature wavelength in meters.
    pub wavelength_m: f64,
    /// Ridge strength relative to the terrain's amplitude range (0.1-0.3).
    pub strength: f32,
    /// Scenicness (1 − potential) below which ridges are fully off.
    pub blend_edge0: f32,
    /// Scenicness above which ridges are at full strength.
    pub blend_edge1: f32,
}

impl Default for RidgeParams {
    fn default() -> Self {
        Self {
            octaves: 5,
            wavelength_m: 2500.0,
            strength: 0.2,
            blend_edge0: 0.4,
            blend_edge1: 0.7,
        }
    }
}

fn smoothstep(edge0: f32, edge1: f32, x: f32) -> f32 {
    let t = ((x - edge0) / (edge1 - edge0)).clamp(0.0, 1.0);
    t * t * (3.0 - 2.0 * t)
}

/// Overlay ridge noise onto the terrain, gated by zone potential.
///
/// Strength scales with the terrain's existing amplitude range; a fixed
/// absolute strength would dominate flat terrain and vanish on tall
/// terrain. The result is clamped to [0, 1] — clipping mountain tops is
/// acceptable, rescaling is not, because a rescale would leak the ridge
/// amplitude into untouched buildable cells.
pub fn enhance(
    terrain: &Grid<f32>,
    zone_potential: &Grid<f32>,
    map_size_m: f64,
    params: &RidgeParams,
    seed: u64,
) -> Result<Grid<f32>, PipelineError> {
    if terrain.resolution != zone_potential.resolution {
        return Err(PipelineError::ShapeMismatch {
            stage: "ridges",
            expected: terrain.resolution,
            actual: zone_potential.resolution,
        });
    }

    let resolution = terrain.resolution;
    let noise = NoiseField::new(seed);
    let base = noise.sample_grid(
        resolution,
        map_size_m,
        params.wavelength_m,
        params.octaves,
        0.5,
        2.0,
    );

    let (min, max) = terrain.min_max();
    let range = (max - min).max(f32::EPSILON);
    let effective_strength = params.strength * range;

    let mut out = terrain.clone();
    for (x, y, v) in out.iter_mut() {
        let scenicness = 1.0 - *zone_potential.get(x, y);
        let blend = smoothstep(params.blend_edge0, params.blend_edge1, scenicness);
        if blend > 0.0 {
            let ridge = 2.0 * (0.5 - *base.get(x, y)).abs();
            *v = (*v + ridge * blend * effective_strength).clamp(0.0, 1.0);
        }
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::zone::{self, ZoneParams};

    #[test]
    fn test_buildable_zones_untouched() {
        let (potential, _) = zone::generate(128, 14336.0, &ZoneParams::default(), 42);
        let terrain =
            crate::terrain::generate(&potential, 14336.0, &crate::terrain::TerrainParams::default(), 42);
        let enhanced = enhance(&terrain, &potential, 14336.0, &RidgeParams::default(), 77).unwrap();

        let mut total_change = 0.0f64;
        let mut count = 0usize;
        for (x, y, &p) in potential.iter() {
            if p > 0.6 {
                total_change += (*enhanced.get(x, y) - *terrain.get(x, y)).abs() as f64;
                count += 1;
            }
        }
        assert!(count > 0);
        let mean_change = total_change / count as f64;
        assert!(mean_change < 0.001, "ridge leak into buildable: {}", mean_change);
    }

    #[test]
    fn test_scenic_zones_gain_relief() {
        let potential = Grid::new_with(64, 0.0f32); // fully scenic
        let mut terrain = Grid::new_with(64, 0.5f32);
        for (x, _, v) in terrain.iter_mut() {
            *v = 0.2 + 0.5 * x as f32 / 64.0;
        }
        let enhanced = enhance(&terrain, &potential, 14336.0, &RidgeParams::default(), 3).unwrap();
        let changed = enhanced
            .as_slice()
            .iter()
            .zip(terrain.as_slice())
            .filter(|(a, b)| (**a - **b).abs() > 1e-6)
            .count();
        assert!(changed > 0);
    }

    #[test]
    fn test_output_stays_normalized() {
        let potential = Grid::new_with(64, 0.0f32);
        let mut terrain = Grid::new_with(64, 0.9f32);
        terrain.set(0, 0, 0.0); // give it some range
        let enhanced = enhance(&terrain, &potential, 14336.0, &RidgeParams::default(), 3).unwrap();
        let (min, max) = enhanced.min_max();
        assert!(min >= 0.0 && max <= 1.0);
    }

    #[test]
    fn test_shape_mismatch_rejected() {
        let terrain = Grid::new_with(64, 0.5f32);
        let potential = Grid::new_with(32, 0.5f32);
        assert!(enhance(&terrain, &potential, 14336.0, &RidgeParams::default(), 1).is_err());
    }
}
