/// A square 2D grid of cells backed by a flat `Vec`.
///
/// Unlike an equirectangular planet map, a city map is planar: nothing
/// wraps. Out-of-range neighbor lookups clamp to the nearest edge cell.
#[derive(Clone, PartialEq)]
pub struct Grid<T> {
    pub resolution: usize,
    data: Vec<T>,
}

impl<T: Clone + Default> Grid<T> {
    pub fn new(resolution: usize) -> Self {
        Self {
            resolution,
            data: vec![T::default(); resolution * resolution],
        }
    }
}

impl<T: Clone> Grid<T> {
    pub fn new_with(resolution: usize, value: T) -> Self {
        Self {
            resolution,
            data: vec![value; resolution * resolution],
        }
    }

    #[inline]
    fn index(&self, x: usize, y: usize) -> usize {
        debug_assert!(x < self.resolution && y < self.resolution);
        y * self.resolution + x
    }

    #[inline]
    pub fn get(&self, x: usize, y: usize) -> &T {
        &self.data[self.index(x, y)]
    }

    #[inline]
    pub fn set(&mut self, x: usize, y: usize, value: T) {
        let idx = self.index(x, y);
        self.data[idx] = value;
    }

    /// Get with coordinates clamped to the grid edge.
    #[inline]
    pub fn get_clamped(&self, x: i32, y: i32) -> &T {
        let n = self.resolution as i32 - 1;
        let cx = x.clamp(0, n) as usize;
        let cy = y.clamp(0, n) as usize;
        self.get(cx, cy)
    }

    /// Iterate over all cells with their coordinates.
    pub fn iter(&self) -> impl Iterator<Item = (usize, usize, &T)> {
        let resolution = self.resolution;
        self.data.iter().enumerate().map(move |(idx, val)| {
            let x = idx % resolution;
            let y = idx / resolution;
            (x, y, val)
        })
    }

    /// Iterate mutably over all cells with their coordinates.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = (usize, usize, &mut T)> {
        let resolution = self.resolution;
        self.data.iter_mut().enumerate().map(move |(idx, val)| {
            let x = idx % resolution;
            let y = idx / resolution;
            (x, y, val)
        })
    }

    pub fn as_slice(&self) -> &[T] {
        &self.data
    }

    pub fn as_mut_slice(&mut self) -> &mut [T] {
        &mut self.data
    }
}

impl Grid<f32> {
    /// Minimum and maximum value over the whole grid.
    pub fn min_max(&self) -> (f32, f32) {
        let mut min = f32::MAX;
        let mut max = f32::MIN;
        for &v in &self.data {
            if v < min {
                min = v;
            }
            if v > max {
                max = v;
            }
        }
        (min, max)
    }

    pub fn mean(&self) -> f32 {
        let sum: f64 = self.data.iter().map(|&v| v as f64).sum();
        (sum / self.data.len() as f64) as f32
    }

    /// Separable Gaussian blur with the given standard deviation (in cells).
    /// Edges are handled by clamping, which preserves the overall value range.
    pub fn gaussian_blur(&self, sigma: f32) -> Self {
        if sigma <= 0.0 {
            return self.clone();
        }

        let n = self.resolution;
        let radius = (sigma * 3.0).ceil() as i32;

        // 1D kernel, normalized to sum to 1
        let mut kernel = Vec::with_capacity((2 * radius + 1) as usize);
        let mut total = 0.0f32;
        for i in -radius..=radius {
            let w = (-(i * i) as f32 / (2.0 * sigma * sigma)).exp();
            kernel.push(w);
            total += w;
        }
        for w in kernel.iter_mut() {
            *w /= total;
        }

        // Horizontal pass
        let mut tmp = Grid::new_with(n, 0.0f32);
        for y in 0..n {
            for x in 0..n {
                let mut sum = 0.0;
                for (k, &w) in kernel.iter().enumerate() {
                    let sx = x as i32 + k as i32 - radius;
                    sum += *self.get_clamped(sx, y as i32) * w;
                }
                tmp.set(x, y, sum);
            }
        }

        // Vertical pass
        let mut out = Grid::new_with(n, 0.0f32);
        for y in 0..n {
            for x in 0..n {
                let mut sum = 0.0;
                for (k, &w) in kernel.iter().enumerate() {
                    let sy = y as i32 + k as i32 - radius;
                    sum += *tmp.get_clamped(x as i32, sy) * w;
                }
                out.set(x, y, sum);
            }
        }

        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_set_roundtrip() {
        let mut grid = Grid::new_with(8, 0.0f32);
        grid.set(3, 5, 1.5);
        assert_eq!(*grid.get(3, 5), 1.5);
        assert_eq!(*grid.get(5, 3), 0.0);
    }

    #[test]
    fn test_get_clamped_edges() {
        let mut grid = Grid::new_with(4, 0.0f32);
        grid.set(0, 0, 1.0);
        grid.set(3, 3, 2.0);
        assert_eq!(*grid.get_clamped(-2, -2), 1.0);
        assert_eq!(*grid.get_clamped(10, 10), 2.0);
    }

    #[test]
    fn test_min_max() {
        let mut grid = Grid::new_with(4, 0.5f32);
        grid.set(1, 1, -0.25);
        grid.set(2, 2, 0.75);
        let (min, max) = grid.min_max();
        assert_eq!(min, -0.25);
        assert_eq!(max, 0.75);
    }

    #[test]
    fn test_gaussian_blur_preserves_constant_field() {
        let grid = Grid::new_with(16, 0.4f32);
        let blurred = grid.gaussian_blur(2.0);
        for (_, _, &v) in blurred.iter() {
            assert!((v - 0.4).abs() < 1e-5);
        }
    }

    #[test]
    fn test_gaussian_blur_smooths_spike() {
        let mut grid = Grid::new_with(16, 0.0f32);
        grid.set(8, 8, 1.0);
        let blurred = grid.gaussian_blur(1.5);
        // Spike spreads: center drops, neighbors rise
        assert!(*blurred.get(8, 8) < 1.0);
        assert!(*blurred.get(7, 8) > 0.0);
        // Mass is conserved away from edges
        let total: f32 = blurred.as_slice().iter().sum();
        assert!((total - 1.0).abs() < 1e-3);
    }
}
