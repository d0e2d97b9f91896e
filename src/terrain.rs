//! Base terrain synthesis: one fractal noise field, amplitude-modulated by
//! the zone potential.
//!
//! The critical design rule: exactly ONE noise field with fixed octave,
//! persistence and lacunarity everywhere. Blending two differently
//! parameterized fields creates second-derivative seams at the blend
//! boundary (the pincushion artifact). Buildable/scenic contrast comes only
//! from a smoothly varying per-cell amplitude multiplier.

use crate::grid::Grid;
use crate::noise_field::NoiseField;
use crate::normalize::smart_normalize;

/// Parameters for amplitude-modulated terrain synthesis.
#[derive(Debug, Clone)]
pub struct TerrainParams {
    /// Overall elevation scale in normalized height units.
    pub base_amplitude: f32,
    /// Amplitude multiplier at full buildability (potential = 1).
    pub min_amplitude_mult: f32,
    /// Amplitude multiplier in fully scenic zones (potential = 0).
    pub max_amplitude_mult: f32,
    /// Base feature wavelength in meters.
    pub wavelength_m: f64,
    pub octaves: u32,
    pub persistence: f64,
    pub lacunarity: f64,
}

impl Default for TerrainParams {
    fn default() -> Self {
        Self {
            base_amplitude: 0.45,
            min_amplitude_mult: 0.12,
            max_amplitude_mult: 1.0,
            wavelength_m: 4000.0,
            octaves: 6,
            persistence: 0.5,
            lacunarity: 2.0,
        }
    }
}

/// Generate the base heightmap at the zone field's resolution.
///
/// `A(x,y) = base × (min_mult + (max_mult − min_mult) × (1 − potential))`,
/// applied pointwise to a single fbm field centered on zero, then lifted
/// onto a mid-level plateau and smart-normalized.
pub fn generate(
    zone_potential: &Grid<f32>,
    map_size_m: f64,
    params: &TerrainParams,
    seed: u64,
) -> Grid<f32> {
    let resolution = zone_potential.resolution;
    let noise = NoiseField::new(seed);
    let field = noise.sample_grid(
        resolution,
        map_size_m,
        params.wavelength_m,
        params.octaves,
        params.persistence,
        params.lacunarity,
    );

    let mult_span = params.max_amplitude_mult - params.min_amplitude_mult;
    let mut terrain = Grid::new_with(resolution, 0.0f32);

    for (x, y, v) in terrain.iter_mut() {
        let potential = *zone_potential.get(x, y);
        let amplitude =
            params.base_amplitude * (params.min_amplitude_mult + mult_span * (1.0 - potential));
        // Center the noise on zero so amplitude shrinks relief symmetrically,
        // then sit everything on a mid plateau.
        let centered = *field.get(x, y) - 0.5;
        *v = 0.35 + centered * amplitude * 2.0;
    }

    smart_normalize(&terrain)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flat_potential(resolution: usize, value: f32) -> Grid<f32> {
        Grid::new_with(resolution, value)
    }

    #[test]
    fn test_output_normalized() {
        let potential = flat_potential(64, 0.5);
        let terrain = generate(&potential, 14336.0, &TerrainParams::default(), 11);
        let (min, max) = terrain.min_max();
        assert!(min >= 0.0 && max <= 1.0);
    }

    #[test]
    fn test_buildable_zones_flatter_than_scenic() {
        let params = TerrainParams::default();
        let buildable = generate(&flat_potential(64, 1.0), 14336.0, &params, 5);
        let scenic = generate(&flat_potential(64, 0.0), 14336.0, &params, 5);

        let (bmin, bmax) = buildable.min_max();
        let (smin, smax) = scenic.min_max();
        assert!(
            bmax - bmin < (smax - smin) * 0.5,
            "buildable relief {} not well below scenic relief {}",
            bmax - bmin,
            smax - smin
        );
    }

    #[test]
    fn test_deterministic() {
        let potential = flat_potential(32, 0.5);
        let a = generate(&potential, 14336.0, &TerrainParams::default(), 99);
        let b = generate(&potential, 14336.0, &TerrainParams::default(), 99);
        assert_eq!(a.as_slice(), b.as_slice());
    }
}
