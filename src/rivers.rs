//! Flow network analysis: D8 flow directions, flow accumulation, river
//! path extraction and dam-site candidates.
//!
//! This is pure analysis over an immutable heightmap snapshot — it never
//! writes elevation. Every flow edge points strictly downhill, so the flow
//! graph is a DAG and a descending-elevation pass is a valid topological
//! order for accumulation.

use crate::grid::Grid;
use crate::pipeline::PipelineError;

/// D8 neighbor offsets, clockwise from north:
/// 7 0 1
/// 6 X 2
/// 5 4 3
pub const DX: [i32; 8] = [0, 1, 1, 1, 0, -1, -1, -1];
pub const DY: [i32; 8] = [-1, -1, 0, 1, 1, 1, 0, -1];

/// No downhill neighbor (local minimum or outlet).
pub const NO_FLOW: u8 = 255;

/// Parameters for river extraction.
#[derive(Debug, Clone)]
pub struct FlowParams {
    /// Accumulation percentile above which cells seed rivers (e.g. 99.0 =
    /// top 1%).
    pub threshold_percentile: f32,
    /// Paths shorter than this many cells are discarded.
    pub min_river_length: usize,
    /// Power-law width coefficient: width = clamp(k·sqrt(acc), 1, 20) px.
    pub width_coefficient: f32,
    /// Minimum accumulation for a dam-site candidate.
    pub dam_min_accumulation: u32,
    /// How much higher (normalized units) all 8 neighbors must be for a
    /// river cell to count as a constriction.
    pub dam_height_margin: f32,
}

impl Default for FlowParams {
    fn default() -> Self {
        Self {
            threshold_percentile: 99.0,
            min_river_length: 20,
            width_coefficient: 0.8,
            dam_min_accumulation: 500,
            dam_height_margin: 0.002,
        }
    }
}

/// A traced river path, upstream to downstream.
#[derive(Debug, Clone, serde::Serialize)]
pub struct RiverPath {
    pub cells: Vec<(usize, usize)>,
    pub mean_accumulation: f32,
    /// Estimated channel width in pixels (power-law hydraulic geometry).
    pub width_px: f32,
    /// Physical path length in meters.
    pub length_m: f32,
}

/// Aggregate statistics from flow analysis.
#[derive(Debug, Clone, serde::Serialize)]
pub struct FlowStats {
    pub rivers: usize,
    pub total_river_cells: usize,
    pub max_accumulation: u32,
    pub threshold_accumulation: u32,
    pub dam_sites: usize,
    pub mean_river_length_cells: f32,
}

/// Complete output of a flow network analysis.
pub struct FlowAnalysis {
    pub flow_dir: Grid<u8>,
    pub flow_acc: Grid<u32>,
    pub rivers: Vec<RiverPath>,
    pub dam_sites: Vec<(usize, usize)>,
    pub stats: FlowStats,
}

/// Compute D8 flow directions by steepest descent.
///
/// Diagonal neighbors are sqrt(2) farther away, so the drop is divided by
/// the distance. Ties resolve to the first direction in the fixed 0..8
/// iteration order — deterministic between runs by construction.
pub fn compute_flow_direction(heightmap: &Grid<f32>) -> Grid<u8> {
    let n = heightmap.resolution;
    let mut flow_dir = Grid::new_with(n, NO_FLOW);

    for y in 0..n {
        for x in 0..n {
            let current = *heightmap.get(x, y);

            let mut steepest_dir = NO_FLOW;
            let mut steepest_slope = 0.0f32;

            for dir in 0..8u8 {
                let nx = x as i32 + DX[dir as usize];
                let ny = y as i32 + DY[dir as usize];
                if nx < 0 || ny < 0 || nx >= n as i32 || ny >= n as i32 {
                    continue;
                }

                let neighbor = *heightmap.get(nx as usize, ny as usize);
                let distance = if dir % 2 == 0 { 1.0 } else { std::f32::consts::SQRT_2 };
                let slope = (current - neighbor) / distance;

                if slope > steepest_slope {
                    steepest_slope = slope;
                    steepest_dir = dir;
                }
            }

            flow_dir.set(x, y, steepest_dir);
        }
    }

    flow_dir
}

/// Compute flow accumulation (number of cells draining through each cell,
/// including itself).
///
/// Cells are processed in descending elevation order; since every flow
/// edge points downhill this is a topological order, so each cell's count
/// is final before it is pushed downstream. Single O(N²) pass after the
/// sort.
pub fn compute_flow_accumulation(heightmap: &Grid<f32>, flow_dir: &Grid<u8>) -> Grid<u32> {
    let n = heightmap.resolution;
    let mut accumulation = Grid::new_with(n, 1u32);

    let mut cells: Vec<(usize, usize, f32)> = Vec::with_capacity(n * n);
    for y in 0..n {
        for x in 0..n {
            cells.push((x, y, *heightmap.get(x, y)));
        }
    }
    cells.sort_by(|a, b| b.2.partial_cmp(&a.2).unwrap_or(std::cmp::Ordering::Equal));

    for (x, y, _) in cells {
        let dir = *flow_dir.get(x, y);
        if dir == NO_FLOW {
            continue;
        }

        let nx = (x as i32 + DX[dir as usize]) as usize;
        let ny = (y as i32 + DY[dir as usize]) as usize;

        let upstream = *accumulation.get(x, y);
        let downstream = *accumulation.get(nx, ny);
        accumulation.set(nx, ny, downstream + upstream);
    }

    accumulation
}

/// Run the full analysis: directions, accumulation, rivers, dam sites.
pub fn analyze(
    heightmap: &Grid<f32>,
    map_size_m: f32,
    params: &FlowParams,
) -> Result<FlowAnalysis, PipelineError> {
    if params.threshold_percentile <= 0.0 || params.threshold_percentile >= 100.0 {
        return Err(PipelineError::InvalidParameter {
            name: "threshold_percentile",
            message: "must be strictly between 0 and 100".into(),
        });
    }

    let n = heightmap.resolution;
    let pixel_m = map_size_m / n as f32;

    let flow_dir = compute_flow_direction(heightmap);
    let flow_acc = compute_flow_accumulation(heightmap, &flow_dir);

    let threshold = accumulation_percentile(&flow_acc, params.threshold_percentile);
    let rivers = extract_rivers(&flow_dir, &flow_acc, threshold, params, pixel_m);
    let dam_sites = find_dam_sites(heightmap, &flow_acc, &rivers, params);

    let max_accumulation = flow_acc.as_slice().iter().copied().max().unwrap_or(1);
    let total_river_cells: usize = rivers.iter().map(|r| r.cells.len()).sum();
    let mean_len = if rivers.is_empty() {
        0.0
    } else {
        total_river_cells as f32 / rivers.len() as f32
    };

    let stats = FlowStats {
        rivers: rivers.len(),
        total_river_cells,
        max_accumulation,
        threshold_accumulation: threshold,
        dam_sites: dam_sites.len(),
        mean_river_length_cells: mean_len,
    };

    Ok(FlowAnalysis {
        flow_dir,
        flow_acc,
        rivers,
        dam_sites,
        stats,
    })
}

/// Accumulation value at the given percentile.
fn accumulation_percentile(flow_acc: &Grid<u32>, percentile: f32) -> u32 {
    let mut values: Vec<u32> = flow_acc.as_slice().to_vec();
    values.sort_unstable();
    let idx = ((percentile / 100.0) * values.len() as f32) as usize;
    values[idx.min(values.len() - 1)]
}

/// Trace river paths downstream from high-accumulation seeds.
fn extract_rivers(
    flow_dir: &Grid<u8>,
    flow_acc: &Grid<u32>,
    threshold: u32,
    params: &FlowParams,
    pixel_m: f32,
) -> Vec<RiverPath> {
    let n = flow_dir.resolution;
    let mut visited = Grid::new_with(n, false);
    let mut rivers = Vec::new();

    // Seeds sorted by accumulation ascending (headwaters first), cell
    // index as a deterministic tie-break. Tracing from the most upstream
    // threshold cells gives full-length main stems; later seeds stop at
    // the first already-visited cell and become tributaries.
    let mut seeds: Vec<(usize, usize, u32)> = Vec::new();
    for y in 0..n {
        for x in 0..n {
            let acc = *flow_acc.get(x, y);
            if acc >= threshold {
                seeds.push((x, y, acc));
            }
        }
    }
    seeds.sort_by(|a, b| a.2.cmp(&b.2).then((a.1, a.0).cmp(&(b.1, b.0))));

    let max_path_len = n * n;

    for (sx, sy, _) in seeds {
        if *visited.get(sx, sy) {
            continue;
        }

        let mut cells = Vec::new();
        let mut acc_sum = 0.0f64;
        let mut length_m = 0.0f32;
        let (mut x, mut y) = (sx, sy);

        // DAG property means no cycles, but the max length guard makes
        // termination unconditional anyway.
        for _ in 0..max_path_len {
            if *visited.get(x, y) {
                break;
            }
            visited.set(x, y, true);
            cells.push((x, y));
            acc_sum += *flow_acc.get(x, y) as f64;

            let dir = *flow_dir.get(x, y);
            if dir == NO_FLOW {
                break;
            }

            let distance = if dir % 2 == 0 { 1.0 } else { std::f32::consts::SQRT_2 };
            length_m += distance * pixel_m;

            x = (x as i32 + DX[dir as usize]) as usize;
            y = (y as i32 + DY[dir as usize]) as usize;
        }

        if cells.len() < params.min_river_length {
            continue;
        }

        let mean_accumulation = (acc_sum / cells.len() as f64) as f32;
        let width_px = (params.width_coefficient * mean_accumulation.sqrt()).clamp(1.0, 20.0);

        rivers.push(RiverPath {
            cells,
            mean_accumulation,
            width_px,
            length_m,
        });
    }

    rivers
}

/// Flag river cells sitting in a local constriction: every one of the 8
/// neighbors meaningfully higher, with enough drainage flowing through.
fn find_dam_sites(
    heightmap: &Grid<f32>,
    flow_acc: &Grid<u32>,
    rivers: &[RiverPath],
    params: &FlowParams,
) -> Vec<(usize, usize)> {
    let n = heightmap.resolution;
    let mut sites = Vec::new();

    for river in rivers {
        // Interior points only: endpoints sit at sources or outlets
        for &(x, y) in river.cells.iter().skip(1).rev().skip(1) {
            if x == 0 || y == 0 || x == n - 1 || y == n - 1 {
                continue;
            }
            if *flow_acc.get(x, y) < params.dam_min_accumulation {
                continue;
            }

            let h = *heightmap.get(x, y);
            let mut constricted = true;
            for dir in 0..8 {
                let nx = (x as i32 + DX[dir]) as usize;
                let ny = (y as i32 + DY[dir]) as usize;
                if *heightmap.get(nx, ny) < h + params.dam_height_margin {
                    constricted = false;
                    break;
                }
            }
            if constricted {
                sites.push((x, y));
            }
        }
    }

    sites
}
