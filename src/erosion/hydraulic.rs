//! Particle-based hydraulic erosion.
//!
//! Thousands of independent water droplets flow downhill, picking up
//! sediment on steep ground and dropping it where the flow slows. The
//! zone potential modulates both sides: buildable zones deposit harder and
//! erode bumps faster, so their valleys flatten; scenic zones stay close
//! to the unmodulated physics and keep their mountains.
//!
//! Two execution paths:
//! - `erode`: strictly sequential droplets. Deterministic for a fixed RNG,
//!   and each droplet sees the terrain changes of every earlier one. This
//!   is the default.
//! - `erode_parallel`: rayon batches against a terrain snapshot, each
//!   droplet recording private (cell, delta) pairs merged in droplet
//!   order afterwards. Deterministic for a fixed seed, but float summation
//!   order differs from the sequential path.

use crate::erosion::params::ErosionParams;
use crate::erosion::utils::{apply_change, gradient_at, height_at, record_change};
use crate::erosion::ErosionStats;
use crate::grid::Grid;
use crate::normalize::smart_normalize;
use crate::pipeline::PipelineError;
use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;

/// Cap on the terminal deposit, in multiples of `max_change_per_step`.
/// A dying droplet drops its whole load in one spot; uncapped, a sediment-
/// heavy droplet would leave a spike taller than anything the flow itself
/// could build up step by step.
const TERMINAL_DEPOSIT_STEPS: f32 = 3.0;

/// A water droplet's mutable state while flowing.
struct Droplet {
    x: f32,
    y: f32,
    dir_x: f32,
    dir_y: f32,
    velocity: f32,
    water: f32,
    sediment: f32,
}

impl Droplet {
    fn new(x: f32, y: f32, params: &ErosionParams) -> Self {
        Self {
            x,
            y,
            dir_x: 0.0,
            dir_y: 0.0,
            velocity: params.initial_velocity,
            water: params.initial_water,
            sediment: 0.0,
        }
    }
}

/// Run sequential droplet erosion. Returns a new heightmap; the input is
/// never left half-updated.
pub fn erode(
    heightmap: &Grid<f32>,
    zone_potential: &Grid<f32>,
    params: &ErosionParams,
    rng: &mut ChaCha8Rng,
) -> Result<(Grid<f32>, ErosionStats), PipelineError> {
    if heightmap.resolution != zone_potential.resolution {
        return Err(PipelineError::ShapeMismatch {
            stage: "erosion",
            expected: heightmap.resolution,
            actual: zone_potential.resolution,
        });
    }

    let mut stats = ErosionStats::default();
    stats.particles = params.num_particles;

    if params.num_particles == 0 {
        return Ok((smart_normalize(heightmap), stats));
    }

    let n = heightmap.resolution;
    let n_f = n as f32;
    let mut terrain = heightmap.clone();

    for _ in 0..params.num_particles {
        let mut droplet = Droplet::new(
            rng.gen_range(0.0..n_f - 1.0),
            rng.gen_range(0.0..n_f - 1.0),
            params,
        );

        for _ in 0..params.max_steps {
            stats.steps_taken += 1;

            let (grad_x, grad_y) = gradient_at(&terrain, droplet.x, droplet.y);

            // Blend new downhill direction with momentum
            droplet.dir_x = droplet.dir_x * params.inertia - grad_x * (1.0 - params.inertia);
            droplet.dir_y = droplet.dir_y * params.inertia - grad_y * (1.0 - params.inertia);

            let dir_len =
                (droplet.dir_x * droplet.dir_x + droplet.dir_y * droplet.dir_y).sqrt();
            if dir_len < 1e-6 {
                // Zero gradient, zero momentum: inert droplet on flat ground
                stats.terminated_inert += 1;
                break;
            }
            droplet.dir_x /= dir_len;
            droplet.dir_y /= dir_len;

            let old_x = droplet.x;
            let old_y = droplet.y;
            let old_height = height_at(&terrain, old_x, old_y);

            droplet.x += droplet.dir_x;
            droplet.y += droplet.dir_y;

            if droplet.x < 0.0 || droplet.x >= n_f - 1.0 || droplet.y < 0.0 || droplet.y >= n_f - 1.0
            {
                stats.terminated_out_of_bounds += 1;
                break;
            }

            let new_height = height_at(&terrain, droplet.x, droplet.y);
            let delta = new_height - old_height;

            // Downhill slope along the direction of travel, floored so the
            // capacity never collapses to zero on flat ground.
            let slope = (-delta).max(0.0);
            let capacity = slope.max(params.min_slope_floor)
                * droplet.velocity
                * droplet.water
                * params.sediment_capacity;

            let potential = height_at(zone_potential, old_x, old_y);

            if droplet.sediment > capacity {
                let deposit = ((droplet.sediment - capacity)
                    * params.deposition_rate
                    * (1.0 + potential * params.zone_deposition_boost))
                    .min(droplet.sediment)
                    .min(params.max_change_per_step);
                droplet.sediment -= deposit;
                apply_change(&mut terrain, old_x, old_y, deposit);
                stats.total_deposited += deposit as f64;
                stats.max_deposition = stats.max_deposition.max(deposit);
            } else {
                let erode_amount = ((capacity - droplet.sediment)
                    * params.erosion_rate
                    * (1.0 + potential * params.zone_erosion_boost))
                    .min(slope) // never dig past the height difference
                    .min(params.max_change_per_step);
                if erode_amount > 0.0 {
                    droplet.sediment += erode_amount;
                    apply_change(&mut terrain, old_x, old_y, -erode_amount);
                    stats.total_eroded += erode_amount as f64;
                    stats.max_erosion = stats.max_erosion.max(erode_amount);
                }
            }

            // Downhill (delta < 0) accelerates the droplet
            droplet.velocity =
                (droplet.velocity * droplet.velocity - delta * params.gravity).max(0.0).sqrt();

            droplet.water *= 1.0 - params.evaporation_rate;
            if droplet.water < params.min_water_volume {
                let final_deposit =
                    droplet.sediment.min(params.max_change_per_step * TERMINAL_DEPOSIT_STEPS);
                if final_deposit > 0.0 {
                    apply_change(&mut terrain, droplet.x, droplet.y, final_deposit);
                    stats.total_deposited += final_deposit as f64;
                }
                stats.terminated_evaporated += 1;
                break;
            }
        }
    }

    Ok((smart_normalize(&terrain), stats))
}

/// Batch-parallel droplet erosion.
///
/// Droplets in a batch all read the same snapshot; their private change
/// lists are merged in droplet order before the next batch. Avoids any
/// shared-cell read-modify-write races.
pub fn erode_parallel(
    heightmap: &Grid<f32>,
    zone_potential: &Grid<f32>,
    params: &ErosionParams,
    base_seed: u64,
) -> Result<(Grid<f32>, ErosionStats), PipelineError> {
    if heightmap.resolution != zone_potential.resolution {
        return Err(PipelineError::ShapeMismatch {
            stage: "erosion",
            expected: heightmap.resolution,
            actual: zone_potential.resolution,
        });
    }

    let mut stats = ErosionStats::default();
    stats.particles = params.num_particles;

    if params.num_particles == 0 {
        return Ok((smart_normalize(heightmap), stats));
    }

    let mut terrain = heightmap.clone();
    let batch_size = 10_000usize;
    let num_batches = params.num_particles.div_ceil(batch_size);

    for batch in 0..num_batches {
        let batch_start = batch * batch_size;
        let batch_end = (batch_start + batch_size).min(params.num_particles);

        let snapshot = terrain.clone();
        let results: Vec<(Vec<(usize, f32)>, ErosionStats)> = (batch_start..batch_end)
            .into_par_iter()
            .map(|i| {
                let mut rng = ChaCha8Rng::seed_from_u64(base_seed.wrapping_add(i as u64));
                simulate_droplet_recorded(&snapshot, zone_potential, params, &mut rng)
            })
            .collect();

        for (changes, droplet_stats) in results {
            stats.merge(&droplet_stats);
            for (idx, delta) in changes {
                terrain.as_mut_slice()[idx] += delta;
            }
        }
    }

    Ok((smart_normalize(&terrain), stats))
}

/// Simulate one droplet against an immutable snapshot, recording all
/// terrain changes as (flat index, delta) pairs.
fn simulate_droplet_recorded(
    terrain: &Grid<f32>,
    zone_potential: &Grid<f32>,
    params: &ErosionParams,
    rng: &mut ChaCha8Rng,
) -> (Vec<(usize, f32)>, ErosionStats) {
    let n = terrain.resolution;
    let n_f = n as f32;
    let mut changes = Vec::new();
    let mut stats = ErosionStats::default();

    let mut droplet = Droplet::new(
        rng.gen_range(0.0..n_f - 1.0),
        rng.gen_range(0.0..n_f - 1.0),
        params,
    );

    for _ in 0..params.max_steps {
        stats.steps_taken += 1;

        let (grad_x, grad_y) = gradient_at(terrain, droplet.x, droplet.y);

        droplet.dir_x = droplet.dir_x * params.inertia - grad_x * (1.0 - params.inertia);
        droplet.dir_y = droplet.dir_y * params.inertia - grad_y * (1.0 - params.inertia);

        let dir_len = (droplet.dir_x * droplet.dir_x + droplet.dir_y * droplet.dir_y).sqrt();
        if dir_len < 1e-6 {
            stats.terminated_inert += 1;
            break;
        }
        droplet.dir_x /= dir_len;
        droplet.dir_y /= dir_len;

        let old_x = droplet.x;
        let old_y = droplet.y;
        let old_height = height_at(terrain, old_x, old_y);

        droplet.x += droplet.dir_x;
        droplet.y += droplet.dir_y;

        if droplet.x < 0.0 || droplet.x >= n_f - 1.0 || droplet.y < 0.0 || droplet.y >= n_f - 1.0 {
            stats.terminated_out_of_bounds += 1;
            break;
        }

        let new_height = height_at(terrain, droplet.x, droplet.y);
        let delta = new_height - old_height;

        let slope = (-delta).max(0.0);
        let capacity = slope.max(params.min_slope_floor)
            * droplet.velocity
            * droplet.water
            * params.sediment_capacity;

        let potential = height_at(zone_potential, old_x, old_y);

        if droplet.sediment > capacity {
            let deposit = ((droplet.sediment - capacity)
                * params.deposition_rate
                * (1.0 + potential * params.zone_deposition_boost))
                .min(droplet.sediment)
                .min(params.max_change_per_step);
            droplet.sediment -= deposit;
            record_change(&mut changes, n, old_x, old_y, deposit);
            stats.total_deposited += deposit as f64;
            stats.max_deposition = stats.max_deposition.max(deposit);
        } else {
            let erode_amount = ((capacity - droplet.sediment)
                * params.erosion_rate
                * (1.0 + potential * params.zone_erosion_boost))
                .min(slope)
                .min(params.max_change_per_step);
            if erode_amount > 0.0 {
                droplet.sediment += erode_amount;
                record_change(&mut changes, n, old_x, old_y, -erode_amount);
                stats.total_eroded += erode_amount as f64;
                stats.max_erosion = stats.max_erosion.max(erode_amount);
            }
        }

        droplet.velocity =
            (droplet.velocity * droplet.velocity - delta * params.gravity).max(0.0).sqrt();

        droplet.water *= 1.0 - params.evaporation_rate;
        if droplet.water < params.min_water_volume {
            let final_deposit =
                droplet.sediment.min(params.max_change_per_step * TERMINAL_DEPOSIT_STEPS);
            if final_deposit > 0.0 {
                record_change(&mut changes, n, droplet.x, droplet.y, final_deposit);
                stats.total_deposited += final_deposit as f64;
            }
            stats.terminated_evaporated += 1;
            break;
        }
    }

    (changes, stats)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sloped_terrain(n: usize) -> Grid<f32> {
        let mut terrain = Grid::new_with(n, 0.0f32);
        for (x, y, v) in terrain.iter_mut() {
            *v = 1.0 - (x + y) as f32 / (2 * n) as f32;
        }
        terrain
    }

    #[test]
    fn test_zero_particles_is_identity_modulo_normalization() {
        let terrain = sloped_terrain(32);
        let zone = Grid::new_with(32, 0.5f32);
        let params = ErosionParams {
            num_particles: 0,
            ..Default::default()
        };
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let (out, stats) = erode(&terrain, &zone, &params, &mut rng).unwrap();
        // Input already normalized, so the pass is a no-op
        assert_eq!(out.as_slice(), terrain.as_slice());
        assert_eq!(stats.steps_taken, 0);
    }

    #[test]
    fn test_erosion_moves_material() {
        let terrain = sloped_terrain(64);
        let zone = Grid::new_with(64, 0.5f32);
        let params = ErosionParams::fast();
        let mut rng = ChaCha8Rng::seed_from_u64(12345);
        let (_, stats) = erode(&terrain, &zone, &params, &mut rng).unwrap();
        assert!(stats.total_eroded > 0.0);
        assert!(stats.total_deposited > 0.0);
    }

    #[test]
    fn test_flat_terrain_leaves_particles_inert() {
        let terrain = Grid::new_with(64, 0.5f32);
        let zone = Grid::new_with(64, 0.5f32);
        let params = ErosionParams {
            num_particles: 500,
            ..Default::default()
        };
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let (out, stats) = erode(&terrain, &zone, &params, &mut rng).unwrap();
        assert_eq!(out.as_slice(), terrain.as_slice());
        assert_eq!(stats.terminated_inert as usize, 500);
    }

    #[test]
    fn test_deterministic_with_fixed_seed() {
        let terrain = sloped_terrain(48);
        let zone = Grid::new_with(48, 0.5f32);
        let params = ErosionParams {
            num_particles: 2_000,
            ..Default::default()
        };
        let mut rng_a = ChaCha8Rng::seed_from_u64(99);
        let mut rng_b = ChaCha8Rng::seed_from_u64(99);
        let (a, _) = erode(&terrain, &zone, &params, &mut rng_a).unwrap();
        let (b, _) = erode(&terrain, &zone, &params, &mut rng_b).unwrap();
        assert_eq!(a.as_slice(), b.as_slice());
    }

    #[test]
    fn test_parallel_deterministic_with_fixed_seed() {
        let terrain = sloped_terrain(48);
        let zone = Grid::new_with(48, 0.5f32);
        let params = ErosionParams {
            num_particles: 2_000,
            ..Default::default()
        };
        let (a, _) = erode_parallel(&terrain, &zone, &params, 99).unwrap();
        let (b, _) = erode_parallel(&terrain, &zone, &params, 99).unwrap();
        assert_eq!(a.as_slice(), b.as_slice());
    }

    #[test]
    fn test_buildable_zone_flattens_faster() {
        // Same bumpy terrain, one run fully buildable, one fully scenic.
        // The buildable run must end up flatter (higher deposition and
        // erosion modulation smooth it harder).
        let n = 64;
        let mut terrain = Grid::new_with(n, 0.5f32);
        for (x, y, v) in terrain.iter_mut() {
            *v = 0.5
                + 0.2 * ((x as f32 * 0.7).sin() * (y as f32 * 0.6).cos())
                - (x + y) as f32 / (4 * n) as f32;
        }

        let params = ErosionParams {
            num_particles: 20_000,
            ..Default::default()
        };

        let buildable_zone = Grid::new_with(n, 1.0f32);
        let scenic_zone = Grid::new_with(n, 0.0f32);

        let mut rng_a = ChaCha8Rng::seed_from_u64(5);
        let mut rng_b = ChaCha8Rng::seed_from_u64(5);
        let (flat_run, _) = erode(&terrain, &buildable_zone, &params, &mut rng_a).unwrap();
        let (scenic_run, _) = erode(&terrain, &scenic_zone, &params, &mut rng_b).unwrap();

        let roughness = |g: &Grid<f32>| -> f64 {
            let mut total = 0.0f64;
            for y in 0..n {
                for x in 1..n {
                    total += (*g.get(x, y) - *g.get(x - 1, y)).abs() as f64;
                }
            }
            total
        };
        assert!(
            roughness(&flat_run) < roughness(&scenic_run),
            "buildable zone did not flatten faster"
        );
    }

    #[test]
    fn test_terminal_deposit_bounded_at_death() {
        // Bowl terrain keeps the droplet in bounds until it evaporates.
        // With a huge capacity it never deposits en route, so every height
        // gain on the map comes from the single terminal deposit.
        let n = 64;
        let c = n as f32 / 2.0;
        let mut terrain = Grid::new_with(n, 0.0f32);
        for (x, y, v) in terrain.iter_mut() {
            let dx = x as f32 - c;
            let dy = y as f32 - c;
            *v = (dx * dx + dy * dy) / (2.0 * c * c);
        }
        let zone = Grid::new_with(n, 0.5f32);

        let params = ErosionParams {
            num_particles: 1,
            sediment_capacity: 1000.0,
            erosion_rate: 1.0,
            evaporation_rate: 0.4,
            min_water_volume: 0.1,
            max_change_per_step: 0.0005,
            ..Default::default()
        };

        let mut rng = ChaCha8Rng::seed_from_u64(21);
        let (out, stats) = erode(&terrain, &zone, &params, &mut rng).unwrap();
        assert!(stats.total_eroded > 0.0);

        let gained: f32 = out
            .as_slice()
            .iter()
            .zip(terrain.as_slice())
            .map(|(a, b)| (a - b).max(0.0))
            .sum();
        let cap = params.max_change_per_step * TERMINAL_DEPOSIT_STEPS;
        assert!(gained > 0.0);
        assert!(gained <= cap + 1e-6, "terminal deposit {} exceeds cap {}", gained, cap);
    }

    #[test]
    fn test_shape_mismatch_rejected() {
        let terrain = Grid::new_with(32, 0.5f32);
        let zone = Grid::new_with(64, 0.5f32);
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        assert!(erode(&terrain, &zone, &ErosionParams::fast(), &mut rng).is_err());
    }
}
