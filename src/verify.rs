//! Closed-loop buildability verification and correction.
//!
//! Measures the buildable percentage and, when the map falls short,
//! iteratively smooths it toward the target — but only ever writes into
//! "near buildable" cells (5-10% slope). Cells that are already flat stay
//! byte-for-byte identical, and intentionally steep terrain is never
//! touched. Excess flatness is reported, not corrected.

use crate::grid::Grid;
use crate::slope::{
    buildable_percentage, slope_field, BUILDABLE_SLOPE_PCT, NEAR_BUILDABLE_SLOPE_PCT,
};

#[derive(Debug, Clone)]
pub struct VerifyParams {
    /// Lower edge of the acceptable buildable percentage band.
    pub target_min: f32,
    /// Upper edge. Surplus above this is reported, never "fixed".
    pub target_max: f32,
    /// Gaussian sigma (cells) for the corrective blur.
    pub sigma: f32,
    /// Hard bound on corrective iterations.
    pub max_iterations: usize,
}

impl Default for VerifyParams {
    fn default() -> Self {
        Self {
            target_min: 55.0,
            target_max: 65.0,
            sigma: 2.5,
            max_iterations: 10,
        }
    }
}

/// Outcome of verification. A missed target is an outcome, not an error.
#[derive(Debug, Clone, serde::Serialize)]
pub struct VerifyReport {
    pub initial_buildable_pct: f32,
    pub final_buildable_pct: f32,
    pub target_min: f32,
    pub target_max: f32,
    pub target_achieved: bool,
    pub adjustments_applied: bool,
    pub iterations_used: usize,
    /// Percentage points still missing when the target was not reached.
    pub shortfall_pct: f32,
    pub recommendations: Vec<String>,
}

/// Measure the buildable percentage and locally correct a shortfall.
pub fn verify_and_adjust(
    terrain: &Grid<f32>,
    map_size_m: f32,
    params: &VerifyParams,
) -> (Grid<f32>, VerifyReport) {
    let initial_pct = buildable_percentage(&slope_field(terrain, map_size_m));

    // Already inside the band, or over it: report and return unchanged.
    if initial_pct >= params.target_min {
        let mut recommendations = Vec::new();
        if initial_pct > params.target_max {
            recommendations.push(format!(
                "buildable area {:.1}% exceeds target maximum {:.1}%; consider raising \
                 base_amplitude or lowering target_coverage for more relief",
                initial_pct, params.target_max
            ));
        }
        let report = VerifyReport {
            initial_buildable_pct: initial_pct,
            final_buildable_pct: initial_pct,
            target_min: params.target_min,
            target_max: params.target_max,
            target_achieved: initial_pct <= params.target_max,
            adjustments_applied: false,
            iterations_used: 0,
            shortfall_pct: 0.0,
            recommendations,
        };
        return (terrain.clone(), report);
    }

    // Shortfall: smooth near-buildable cells until the band is reached,
    // improvement stalls, or the iteration budget runs out.
    let mut current = terrain.clone();
    let mut current_pct = initial_pct;
    let mut iterations_used = 0;
    let mut any_cell_written = false;
    const MIN_IMPROVEMENT_PCT: f32 = 0.05;

    for _ in 0..params.max_iterations {
        let slopes = slope_field(&current, map_size_m);
        let blurred = current.gaussian_blur(params.sigma);

        let mut next = current.clone();
        let mut touched = 0usize;
        for (x, y, &s) in slopes.iter() {
            if s > BUILDABLE_SLOPE_PCT && s <= NEAR_BUILDABLE_SLOPE_PCT {
                next.set(x, y, *blurred.get(x, y));
                touched += 1;
            }
        }
        iterations_used += 1;

        if touched == 0 {
            // Nothing left in the correctable band
            break;
        }
        any_cell_written = true;

        let next_pct = buildable_percentage(&slope_field(&next, map_size_m));
        let improvement = next_pct - current_pct;
        current = next;
        current_pct = next_pct;

        if current_pct >= params.target_min {
            break;
        }
        if improvement < MIN_IMPROVEMENT_PCT {
            // Diminishing returns: further passes would burn time for
            // nothing the caller couldn't get from different parameters
            break;
        }
    }

    let target_achieved =
        current_pct >= params.target_min && current_pct <= params.target_max;
    let shortfall = (params.target_min - current_pct).max(0.0);

    let mut recommendations = Vec::new();
    if !target_achieved {
        recommendations.push(format!(
            "buildable area {:.1}% is {:.1} points short of the {:.1}% target after {} \
             smoothing iterations",
            current_pct, shortfall, params.target_min, iterations_used
        ));
        recommendations.push(
            "consider lowering base_amplitude, raising target_coverage, or increasing \
             erosion num_particles"
                .to_string(),
        );
    }

    let report = VerifyReport {
        initial_buildable_pct: initial_pct,
        final_buildable_pct: current_pct,
        target_min: params.target_min,
        target_max: params.target_max,
        target_achieved,
        adjustments_applied: any_cell_written,
        iterations_used,
        shortfall_pct: shortfall,
        recommendations,
    };

    (current, report)
}
