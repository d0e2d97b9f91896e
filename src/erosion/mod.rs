//! Hydraulic erosion module.
//!
//! One physical model: particle-based water droplets (see `hydraulic`).
//! Flow-network analysis lives in `crate::rivers` and never mutates the
//! terrain; drainage carving is the droplets' job.

pub mod hydraulic;
pub mod params;
pub mod utils;

pub use hydraulic::{erode, erode_parallel};
pub use params::ErosionParams;

/// Statistics from an erosion run.
#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct ErosionStats {
    /// Number of droplets simulated.
    pub particles: usize,
    /// Total material eroded, in normalized height units.
    pub total_eroded: f64,
    /// Total material deposited.
    pub total_deposited: f64,
    /// Total droplet steps across all particles.
    pub steps_taken: u64,
    /// Largest single-step erosion.
    pub max_erosion: f32,
    /// Largest single-step deposition.
    pub max_deposition: f32,
    /// Droplets that evaporated below the minimum water volume.
    pub terminated_evaporated: u64,
    /// Droplets that left the grid.
    pub terminated_out_of_bounds: u64,
    /// Droplets stranded on flat ground with no momentum.
    pub terminated_inert: u64,
}

impl ErosionStats {
    /// Fold another droplet's statistics into this one. Particle count is
    /// owned by the caller and not summed here.
    pub fn merge(&mut self, other: &ErosionStats) {
        self.total_eroded += other.total_eroded;
        self.total_deposited += other.total_deposited;
        self.steps_taken += other.steps_taken;
        self.max_erosion = self.max_erosion.max(other.max_erosion);
        self.max_deposition = self.max_deposition.max(other.max_deposition);
        self.terminated_evaporated += other.terminated_evaporated;
        self.terminated_out_of_bounds += other.terminated_out_of_bounds;
        self.terminated_inert += other.terminated_inert;
    }
}
