//! Hydraulic erosion parameters.

/// Parameters for the droplet erosion simulation.
///
/// All height quantities are in normalized [0, 1] height units.
#[derive(Clone, Debug, PartialEq)]
pub struct ErosionParams {
    /// Number of water droplets to simulate.
    pub num_particles: usize,

    /// Momentum conservation factor (0.0-1.0).
    /// Higher values keep droplets moving straight instead of zig-zagging
    /// down the steepest gradient every step.
    pub inertia: f32,

    /// Sediment carrying capacity multiplier.
    pub sediment_capacity: f32,

    /// Fraction of the capacity deficit eroded per step (0.0-1.0].
    pub erosion_rate: f32,

    /// Fraction of excess sediment deposited per step (0.0-1.0].
    pub deposition_rate: f32,

    /// Water lost per step as a fraction of current volume (0.0-1.0].
    pub evaporation_rate: f32,

    /// Slope floor used in the capacity formula. Prevents the capacity
    /// from collapsing to zero (and divisions from blowing up) on flat
    /// ground.
    pub min_slope_floor: f32,

    /// Initial water volume per droplet.
    pub initial_water: f32,

    /// Initial droplet speed.
    pub initial_velocity: f32,

    /// Water volume below which a droplet dies.
    pub min_water_volume: f32,

    /// Hard bound on steps per droplet. Guarantees termination even on
    /// pathological (perfectly flat) terrain.
    pub max_steps: usize,

    /// Gravity factor in the velocity update.
    pub gravity: f32,

    /// Extra deposition multiplier at full zone potential. Buildable
    /// valleys fill toward flatness faster than scenic ones.
    pub zone_deposition_boost: f32,

    /// Extra erosion multiplier at full zone potential.
    pub zone_erosion_boost: f32,

    /// Cap on the height change a single step may apply.
    pub max_change_per_step: f32,
}

impl Default for ErosionParams {
    fn default() -> Self {
        Self {
            num_particles: 100_000,
            inertia: 0.3,              // low inertia meanders naturally
            sediment_capacity: 4.0,
            erosion_rate: 0.3,
            deposition_rate: 0.3,
            evaporation_rate: 0.02,
            min_slope_floor: 0.0001,
            initial_water: 1.0,
            initial_velocity: 1.0,
            min_water_volume: 0.01,
            max_steps: 160,
            gravity: 4.0,
            zone_deposition_boost: 2.0,
            zone_erosion_boost: 0.5,
            max_change_per_step: 0.01,
        }
    }
}

impl ErosionParams {
    /// Fast configuration for tests (fewer droplets).
    pub fn fast() -> Self {
        Self {
            num_particles: 5_000,
            ..Default::default()
        }
    }
}
