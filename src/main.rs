use clap::Parser;

use heightmap_generator::config::{GeneratorConfig, TerrainPreset};
use heightmap_generator::{export, pipeline};

#[derive(Parser, Debug)]
#[command(name = "heightmap_gen")]
#[command(about = "Generate procedural heightmaps for city-building maps")]
struct Args {
    /// Output resolution in pixels (square map, default 1024)
    #[arg(short, long)]
    resolution: Option<usize>,

    /// Physical map edge length in meters (default 14336)
    #[arg(long)]
    map_size: Option<f64>,

    /// Random seed (uses a random seed if not specified)
    #[arg(short, long)]
    seed: Option<u64>,

    /// Terrain archetype: balanced, rolling, alpine, mesa
    #[arg(short, long)]
    preset: Option<TerrainPreset>,

    /// Load a full configuration from a JSON file (CLI flags override it)
    #[arg(long)]
    config: Option<String>,

    /// Output path for the 16-bit heightmap PNG
    #[arg(short, long, default_value = "heightmap.png")]
    output: String,

    /// Write a colored elevation preview PNG with rivers overlaid
    #[arg(long)]
    preview: Option<String>,

    /// Write the generation report as JSON
    #[arg(long)]
    report: Option<String>,

    /// Number of erosion particles
    #[arg(long)]
    particles: Option<usize>,

    /// Fraction of the zone field targeted as buildable (0.6-0.8)
    #[arg(long)]
    target_coverage: Option<f32>,

    /// Overall terrain amplitude (0.05-1.0)
    #[arg(long)]
    amplitude: Option<f32>,

    /// Run erosion droplets in parallel batches
    #[arg(long)]
    parallel: bool,

    /// Skip ridge enhancement
    #[arg(long)]
    no_ridges: bool,

    /// Skip hydraulic erosion
    #[arg(long)]
    no_erosion: bool,

    /// Skip river network analysis
    #[arg(long)]
    no_rivers: bool,

    /// Skip high-frequency detail
    #[arg(long)]
    no_detail: bool,

    /// Skip the closed-loop buildability adjustment
    #[arg(long)]
    no_adjust: bool,
}

fn build_config(args: &Args) -> Result<GeneratorConfig, Box<dyn std::error::Error>> {
    let mut config = if let Some(path) = &args.config {
        let text = std::fs::read_to_string(path)?;
        serde_json::from_str(&text)?
    } else if let Some(preset) = args.preset {
        GeneratorConfig::from_preset(preset)
    } else {
        GeneratorConfig::default()
    };

    // CLI flags override the config file; unset flags leave it alone
    if let Some(resolution) = args.resolution {
        config.resolution = resolution;
    }
    if let Some(map_size) = args.map_size {
        config.map_size_meters = map_size;
    }
    match args.seed {
        Some(seed) => config.seed = seed,
        // A config file's seed stands; without one, roll a fresh seed
        None if args.config.is_none() => config.seed = rand::random(),
        None => {}
    }

    if let Some(particles) = args.particles {
        config.num_particles = particles;
    }
    if let Some(coverage) = args.target_coverage {
        config.target_coverage = coverage;
    }
    if let Some(amplitude) = args.amplitude {
        config.base_amplitude = amplitude;
    }
    if args.parallel {
        config.parallel_erosion = true;
    }
    if args.no_ridges {
        config.apply_ridges = false;
    }
    if args.no_erosion {
        config.apply_erosion = false;
    }
    if args.no_rivers {
        config.apply_rivers = false;
    }
    if args.no_detail {
        config.apply_detail = false;
    }
    if args.no_adjust {
        config.apply_constraint_adjustment = false;
    }

    Ok(config)
}

fn run(args: &Args) -> Result<(), Box<dyn std::error::Error>> {
    let config = build_config(args)?;
    let output = pipeline::run(&config)?;

    export::export_heightmap(&output.heightmap, &args.output)?;
    println!("Heightmap written to {}", args.output);

    if let Some(path) = &args.preview {
        export::export_preview(&output.heightmap, output.flow.as_ref(), path)?;
        println!("Preview written to {}", path);
    }
    if let Some(path) = &args.report {
        export::export_report(&output.report, path)?;
        println!("Report written to {}", path);
    }

    let slope = &output.report.slope;
    println!(
        "Final map: {:.1}% buildable, {:.1}% near-buildable, {:.1}% steep \
         (mean slope {:.1}%, max {:.1}%)",
        slope.buildable_pct,
        slope.near_buildable_pct,
        slope.unbuildable_pct,
        slope.mean_slope_pct,
        slope.max_slope_pct
    );
    if let Some(verify) = &output.report.verify {
        for rec in &verify.recommendations {
            println!("Note: {}", rec);
        }
    }

    let total_ms: f64 = output.report.timings.iter().map(|t| t.millis).sum();
    println!("Done in {:.1}s (seed {})", total_ms / 1000.0, config.seed);

    Ok(())
}

fn main() {
    let args = Args::parse();
    if let Err(e) = run(&args) {
        eprintln!("error: {}", e);
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_args() -> Args {
        Args {
            resolution: None,
            map_size: None,
            seed: None,
            preset: None,
            config: None,
            output: "heightmap.png".to_string(),
            preview: None,
            report: None,
            particles: None,
            target_coverage: None,
            amplitude: None,
            parallel: false,
            no_ridges: false,
            no_erosion: false,
            no_rivers: false,
            no_detail: false,
            no_adjust: false,
        }
    }

    fn write_config_file(name: &str, config: &GeneratorConfig) -> String {
        let path = std::env::temp_dir().join(name);
        std::fs::write(&path, serde_json::to_string(config).unwrap()).unwrap();
        path.to_str().unwrap().to_string()
    }

    #[test]
    fn test_config_file_values_survive_unset_flags() {
        let file_config = GeneratorConfig {
            resolution: 2048,
            map_size_meters: 20000.0,
            seed: 777,
            ..Default::default()
        };
        let path = write_config_file("gen_config_survive.json", &file_config);

        let args = Args {
            config: Some(path.clone()),
            ..base_args()
        };
        let config = build_config(&args).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(config.resolution, 2048);
        assert_eq!(config.map_size_meters, 20000.0);
        assert_eq!(config.seed, 777);
    }

    #[test]
    fn test_cli_flags_override_config_file() {
        let file_config = GeneratorConfig {
            resolution: 2048,
            map_size_meters: 20000.0,
            seed: 777,
            ..Default::default()
        };
        let path = write_config_file("gen_config_override.json", &file_config);

        let args = Args {
            config: Some(path.clone()),
            resolution: Some(512),
            seed: Some(9),
            ..base_args()
        };
        let config = build_config(&args).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(config.resolution, 512);
        assert_eq!(config.seed, 9);
        // Flags not passed keep the file's value
        assert_eq!(config.map_size_meters, 20000.0);
    }

    #[test]
    fn test_defaults_without_config_file() {
        let config = build_config(&base_args()).unwrap();
        assert_eq!(config.resolution, GeneratorConfig::default().resolution);
        assert_eq!(
            config.map_size_meters,
            pipeline::DEFAULT_MAP_SIZE_METERS
        );
    }
}
