//! Smart normalization: clip when close, rescale only when far.
//!
//! Min-max rescaling a narrow-range field amplifies every gradient in it,
//! which silently steepens slopes downstream. So values already near [0, 1]
//! are clipped in place, and a full rescale happens only when the natural
//! range has genuinely escaped tolerance.

use crate::grid::Grid;

/// Tolerance band outside [0, 1] within which we clip instead of rescale.
pub const CLIP_TOLERANCE: f32 = 0.1;

/// Normalize a heightmap to [0, 1] without distorting its shape when avoidable.
///
/// - Range within [-0.1, 1.1]: clip to [0, 1].
/// - Wider range: min-max rescale.
/// - Degenerate zero range: returned as a constant clamped to [0, 1],
///   never a division by zero.
pub fn smart_normalize(grid: &Grid<f32>) -> Grid<f32> {
    let (min, max) = grid.min_max();
    let range = max - min;

    let mut out = grid.clone();

    if range <= f32::EPSILON {
        // Flat field: nothing to rescale
        for (_, _, v) in out.iter_mut() {
            *v = v.clamp(0.0, 1.0);
        }
        return out;
    }

    if min >= -CLIP_TOLERANCE && max <= 1.0 + CLIP_TOLERANCE {
        for (_, _, v) in out.iter_mut() {
            *v = v.clamp(0.0, 1.0);
        }
    } else {
        for (_, _, v) in out.iter_mut() {
            *v = (*v - min) / range;
        }
    }

    out
}
