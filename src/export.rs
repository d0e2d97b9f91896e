//! Export: 16-bit heightmap PNG, colored preview PNG, and the JSON report.

use image::{ImageBuffer, Luma, Rgb, RgbImage};

use crate::grid::Grid;
use crate::pipeline::PipelineReport;
use crate::rivers::FlowAnalysis;

/// Export a normalized heightmap as 16-bit grayscale PNG.
///
/// Game engines read displacement maps at 16-bit depth; 8 bits would
/// terrace a 1024 m height range into visible 4 m steps.
pub fn export_heightmap(heightmap: &Grid<f32>, path: &str) -> Result<(), image::ImageError> {
    let n = heightmap.resolution;
    let mut img: ImageBuffer<Luma<u16>, Vec<u16>> = ImageBuffer::new(n as u32, n as u32);

    for (x, y, &v) in heightmap.iter() {
        let q = (v.clamp(0.0, 1.0) * 65535.0).round() as u16;
        img.put_pixel(x as u32, y as u32, Luma([q]));
    }

    img.save(path)
}

/// Export a colored elevation preview, optionally with rivers drawn on top.
pub fn export_preview(
    heightmap: &Grid<f32>,
    flow: Option<&FlowAnalysis>,
    path: &str,
) -> Result<(), image::ImageError> {
    let n = heightmap.resolution;
    let mut img: RgbImage = ImageBuffer::new(n as u32, n as u32);

    for (x, y, &v) in heightmap.iter() {
        let color = elevation_colormap(v.clamp(0.0, 1.0));
        img.put_pixel(x as u32, y as u32, Rgb(color));
    }

    if let Some(flow) = flow {
        for river in &flow.rivers {
            // Wider channels get a half-width square stamp per cell
            let radius = (river.width_px / 2.0).round() as i32;
            for &(x, y) in &river.cells {
                for dy in -radius..=radius {
                    for dx in -radius..=radius {
                        let px = x as i32 + dx;
                        let py = y as i32 + dy;
                        if px >= 0 && py >= 0 && (px as usize) < n && (py as usize) < n {
                            img.put_pixel(px as u32, py as u32, Rgb([30, 90, 200]));
                        }
                    }
                }
            }
        }
        for &(x, y) in &flow.dam_sites {
            img.put_pixel(x as u32, y as u32, Rgb([230, 40, 40]));
        }
    }

    img.save(path)
}

/// Elevation colormap: lowland green -> brown slopes -> gray rock -> snow.
fn elevation_colormap(t: f32) -> [u8; 3] {
    let colors: [[f32; 3]; 7] = [
        [0.22, 0.42, 0.20], // valley floor
        [0.38, 0.52, 0.26], // lowland
        [0.55, 0.55, 0.32], // foothills
        [0.55, 0.45, 0.32], // lower slopes
        [0.48, 0.42, 0.38], // upper slopes
        [0.62, 0.60, 0.58], // rock
        [0.96, 0.96, 0.98], // snow
    ];

    let t_scaled = t * 6.0;
    let idx = (t_scaled as usize).min(5);
    let frac = t_scaled - idx as f32;

    let c1 = colors[idx];
    let c2 = colors[idx + 1];

    [
        ((c1[0] + (c2[0] - c1[0]) * frac) * 255.0) as u8,
        ((c1[1] + (c2[1] - c1[1]) * frac) * 255.0) as u8,
        ((c1[2] + (c2[2] - c1[2]) * frac) * 255.0) as u8,
    ]
}

/// Write the pipeline report as pretty-printed JSON.
pub fn export_report(report: &PipelineReport, path: &str) -> std::io::Result<()> {
    let json = serde_json::to_string_pretty(report)?;
    std::fs::write(path, json)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_heightmap_png_is_16_bit() {
        let mut grid = Grid::new_with(16, 0.0f32);
        for (x, y, v) in grid.iter_mut() {
            *v = (x + y) as f32 / 30.0;
        }

        let dir = std::env::temp_dir();
        let path = dir.join("export_test_heightmap.png");
        let path = path.to_str().unwrap();
        export_heightmap(&grid, path).unwrap();

        let img = image::open(path).unwrap();
        assert_eq!(img.color(), image::ColorType::L16);
        let gray = img.to_luma16();
        assert_eq!(gray.get_pixel(0, 0).0[0], 0);
        // (15 + 15) / 30 = 1.0 -> full scale
        assert_eq!(gray.get_pixel(15, 15).0[0], 65535);
        std::fs::remove_file(path).ok();
    }

    #[test]
    fn test_preview_writes_rgb() {
        let grid = Grid::new_with(8, 0.5f32);
        let dir = std::env::temp_dir();
        let path = dir.join("export_test_preview.png");
        let path = path.to_str().unwrap();
        export_preview(&grid, None, path).unwrap();
        let img = image::open(path).unwrap();
        assert_eq!(img.width(), 8);
        std::fs::remove_file(path).ok();
    }

    #[test]
    fn test_colormap_endpoints() {
        let low = elevation_colormap(0.0);
        let high = elevation_colormap(1.0);
        // green valleys, near-white peaks
        assert!(low[1] > low[0] && low[1] > low[2]);
        assert!(high.iter().all(|&c| c > 230));
    }
}
