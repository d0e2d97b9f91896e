//! Pipeline orchestration: runs the generation stages in their fixed order
//! and aggregates per-stage statistics into one report.
//!
//! Stage order is load-bearing. The zone potential must exist before the
//! base terrain (it modulates amplitude), ridges go in before erosion (so
//! erosion carves them), river analysis reads the post-erosion surface,
//! and constraint adjustment runs last so nothing un-does its smoothing.

use crate::config::{ConfigError, GeneratorConfig};
use crate::grid::Grid;
use crate::rivers::{FlowAnalysis, FlowStats};
use crate::slope::{slope_field, slope_stats, SlopeStats};
use crate::verify::VerifyReport;
use crate::zone::ZoneStats;
use crate::{detail, erosion, ridges, rivers, terrain, verify, zone};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::Serialize;
use std::time::Instant;
use thiserror::Error;

/// Physical edge length of the generated map, in meters (14.336 km, a
/// 512-cell city grid at 28 m per cell).
pub const DEFAULT_MAP_SIZE_METERS: f64 = 14336.0;

// Per-stage seed offsets. Each stage folds its own constant into the master
// seed so stages never share a noise field or droplet stream.
const SEED_TERRAIN: u64 = 0x7E44A1;
const SEED_RIDGES: u64 = 0x41D6E5;
const SEED_EROSION: u64 = 0xE40510;
const SEED_DETAIL: u64 = 0xDE7A11;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("{stage} stage: grid resolution {actual} does not match expected {expected}")]
    ShapeMismatch {
        stage: &'static str,
        expected: usize,
        actual: usize,
    },
    #[error("invalid parameter `{name}`: {message}")]
    InvalidParameter {
        name: &'static str,
        message: String,
    },
}

/// Wall-clock time of one pipeline stage.
#[derive(Debug, Clone, Serialize)]
pub struct StageTiming {
    pub stage: &'static str,
    pub millis: f64,
}

/// Everything the pipeline learned about the map it produced.
#[derive(Debug, Clone, Serialize)]
pub struct PipelineReport {
    pub seed: u64,
    pub resolution: usize,
    pub map_size_meters: f64,
    pub zone: ZoneStats,
    pub erosion: Option<erosion::ErosionStats>,
    pub flow: Option<FlowStats>,
    pub verify: Option<VerifyReport>,
    /// Slope distribution of the final heightmap.
    pub slope: SlopeStats,
    pub timings: Vec<StageTiming>,
}

/// Final heightmap plus the side-channel analyses that describe it.
pub struct PipelineOutput {
    pub heightmap: Grid<f32>,
    pub flow: Option<FlowAnalysis>,
    pub report: PipelineReport,
}

struct StageClock {
    timings: Vec<StageTiming>,
}

impl StageClock {
    fn new() -> Self {
        Self {
            timings: Vec::new(),
        }
    }

    fn time<T>(&mut self, stage: &'static str, f: impl FnOnce() -> T) -> T {
        let start = Instant::now();
        let out = f();
        self.timings.push(StageTiming {
            stage,
            millis: start.elapsed().as_secs_f64() * 1000.0,
        });
        out
    }
}

/// Run the full generation pipeline.
///
/// Validates the configuration, then runs every enabled stage in order.
/// The heightmap stays normalized to [0, 1] between stages. River
/// analysis is a pure side channel: it reads the surface and never writes
/// it back.
pub fn run(config: &GeneratorConfig) -> Result<PipelineOutput, PipelineError> {
    config.validate()?;

    let seed = config.seed;
    let resolution = config.resolution;
    let map_size = config.map_size_meters;
    let mut clock = StageClock::new();

    println!(
        "Generating {}x{} heightmap ({:.1} km), seed {}",
        resolution,
        resolution,
        map_size / 1000.0,
        seed
    );

    println!("  [1/7] zone potential field...");
    let (zone_potential, zone_stats) = clock.time("zone", || {
        zone::generate(resolution, map_size, &config.zone_params(), seed)
    });

    println!("  [2/7] base terrain...");
    let mut heightmap = clock.time("terrain", || {
        terrain::generate(
            &zone_potential,
            map_size,
            &config.terrain_params(),
            seed.wrapping_add(SEED_TERRAIN),
        )
    });

    if config.apply_ridges {
        println!("  [3/7] ridge enhancement...");
        heightmap = clock.time("ridges", || {
            ridges::enhance(
                &heightmap,
                &zone_potential,
                map_size,
                &config.ridge_params(),
                seed.wrapping_add(SEED_RIDGES),
            )
        })?;
    } else {
        println!("  [3/7] ridge enhancement... skipped");
    }

    let mut erosion_stats = None;
    if config.apply_erosion {
        println!(
            "  [4/7] hydraulic erosion ({} particles{})...",
            config.num_particles,
            if config.parallel_erosion {
                ", parallel"
            } else {
                ""
            }
        );
        let params = config.erosion_params();
        let erosion_seed = seed.wrapping_add(SEED_EROSION);
        let (eroded, stats) = clock.time("erosion", || {
            if config.parallel_erosion {
                erosion::erode_parallel(&heightmap, &zone_potential, &params, erosion_seed)
            } else {
                let mut rng = ChaCha8Rng::seed_from_u64(erosion_seed);
                erosion::erode(&heightmap, &zone_potential, &params, &mut rng)
            }
        })?;
        heightmap = eroded;
        erosion_stats = Some(stats);
    } else {
        println!("  [4/7] hydraulic erosion... skipped");
    }

    let mut flow = None;
    if config.apply_rivers {
        println!("  [5/7] flow network analysis...");
        let analysis = clock.time("rivers", || {
            rivers::analyze(&heightmap, map_size as f32, &config.flow_params())
        })?;
        println!(
            "        {} rivers, {} dam sites",
            analysis.stats.rivers, analysis.stats.dam_sites
        );
        flow = Some(analysis);
    } else {
        println!("  [5/7] flow network analysis... skipped");
    }

    if config.apply_detail {
        println!("  [6/7] slope-gated detail...");
        heightmap = clock.time("detail", || {
            detail::add_detail(
                &heightmap,
                map_size as f32,
                &config.detail_params(),
                seed.wrapping_add(SEED_DETAIL),
            )
        });
    } else {
        println!("  [6/7] slope-gated detail... skipped");
    }

    let mut verify_report = None;
    if config.apply_constraint_adjustment {
        println!("  [7/7] buildability verification...");
        let (adjusted, report) = clock.time("verify", || {
            verify::verify_and_adjust(&heightmap, map_size as f32, &config.verify_params())
        });
        heightmap = adjusted;
        println!(
            "        buildable {:.1}% -> {:.1}% (target {:.0}-{:.0}%{})",
            report.initial_buildable_pct,
            report.final_buildable_pct,
            report.target_min,
            report.target_max,
            if report.target_achieved {
                ", achieved"
            } else {
                ", missed"
            }
        );
        verify_report = Some(report);
    } else {
        println!("  [7/7] buildability verification... skipped");
    }

    let final_slopes = slope_field(&heightmap, map_size as f32);
    let slope = slope_stats(&final_slopes);

    let report = PipelineReport {
        seed,
        resolution,
        map_size_meters: map_size,
        zone: zone_stats,
        erosion: erosion_stats,
        flow: flow.as_ref().map(|f| f.stats.clone()),
        verify: verify_report,
        slope,
        timings: clock.timings,
    };

    Ok(PipelineOutput {
        heightmap,
        flow,
        report,
    })
}
