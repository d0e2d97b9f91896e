//! Seeded multi-octave coherent noise sampled over a square grid.
//!
//! Wraps the `noise` crate's Perlin generator in a fractal Brownian motion
//! accumulator. Wavelengths are physical (meters) so callers can reason
//! about feature size independently of grid resolution.

use crate::grid::Grid;
use noise::{NoiseFn, Perlin, Seedable};

/// A deterministic fractal noise source.
pub struct NoiseField {
    perlin: Perlin,
}

impl NoiseField {
    pub fn new(seed: u64) -> Self {
        Self {
            perlin: Perlin::new(1).set_seed(seed as u32),
        }
    }

    /// Single fBm sample at physical coordinates (meters), result in [-1, 1]
    /// (approximately; normalized by total octave amplitude).
    pub fn sample(
        &self,
        x_m: f64,
        y_m: f64,
        wavelength_m: f64,
        octaves: u32,
        persistence: f64,
        lacunarity: f64,
    ) -> f64 {
        let mut total = 0.0;
        let mut amplitude = 1.0;
        let mut frequency = 1.0 / wavelength_m.max(1e-6);
        let mut max_value = 0.0;

        for _ in 0..octaves {
            total += amplitude * self.perlin.get([x_m * frequency, y_m * frequency]);
            max_value += amplitude;
            amplitude *= persistence;
            frequency *= lacunarity;
        }

        total / max_value
    }

    /// Sample a full grid, remapped to [0, 1].
    ///
    /// `map_size_m` is the physical span of the grid; the pixel pitch is
    /// `map_size_m / resolution`. Very large wavelengths are safe: the
    /// frequency simply approaches zero and the field approaches a constant.
    pub fn sample_grid(
        &self,
        resolution: usize,
        map_size_m: f64,
        wavelength_m: f64,
        octaves: u32,
        persistence: f64,
        lacunarity: f64,
    ) -> Grid<f32> {
        let pixel_m = map_size_m / resolution as f64;
        let mut grid = Grid::new_with(resolution, 0.0f32);

        for y in 0..resolution {
            for x in 0..resolution {
                let v = self.sample(
                    x as f64 * pixel_m,
                    y as f64 * pixel_m,
                    wavelength_m,
                    octaves,
                    persistence,
                    lacunarity,
                );
                grid.set(x, y, (v * 0.5 + 0.5) as f32);
            }
        }

        grid
    }
}
