//! Generator configuration: every knob the pipeline recognizes, the valid
//! range of each, and the terrain archetype presets.
//!
//! Out-of-range values are rejected up front with the offending parameter
//! named — never silently clamped. Validation happens once, before any
//! computation starts.

use crate::detail::DetailParams;
use crate::erosion::ErosionParams;
use crate::ridges::RidgeParams;
use crate::rivers::FlowParams;
use crate::terrain::TerrainParams;
use crate::verify::VerifyParams;
use crate::zone::ZoneParams;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A configuration value outside its documented range.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("parameter `{name}` = {value} outside valid range {range}")]
    OutOfRange {
        name: &'static str,
        value: f64,
        range: &'static str,
    },
    #[error("inconsistent parameters: {0}")]
    Inconsistent(String),
}

/// Terrain archetype: a named parameter bundle.
///
/// Replaces ad hoc per-style generator code paths with one parameterized
/// pipeline dispatched over a closed set of variants.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TerrainPreset {
    /// Even split of city land and mountains.
    #[default]
    Balanced,
    /// Gentle hills, generous buildable area.
    Rolling,
    /// Dramatic peaks and deep valleys.
    Alpine,
    /// Flat plateaus cut by steep escarpments.
    Mesa,
}

impl TerrainPreset {
    pub fn all() -> &'static [Self] {
        &[Self::Balanced, Self::Rolling, Self::Alpine, Self::Mesa]
    }

    pub fn description(&self) -> &'static str {
        match self {
            Self::Balanced => "Even split of buildable land and scenery",
            Self::Rolling => "Gentle hills, generous buildable area",
            Self::Alpine => "Dramatic peaks and deep valleys",
            Self::Mesa => "Flat plateaus cut by steep escarpments",
        }
    }
}

impl std::fmt::Display for TerrainPreset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Balanced => write!(f, "balanced"),
            Self::Rolling => write!(f, "rolling"),
            Self::Alpine => write!(f, "alpine"),
            Self::Mesa => write!(f, "mesa"),
        }
    }
}

impl std::str::FromStr for TerrainPreset {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "balanced" => Ok(Self::Balanced),
            "rolling" => Ok(Self::Rolling),
            "alpine" => Ok(Self::Alpine),
            "mesa" => Ok(Self::Mesa),
            other => Err(format!(
                "unknown preset `{}` (expected one of: balanced, rolling, alpine, mesa)",
                other
            )),
        }
    }
}

/// The full configuration surface consumed by the pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    pub resolution: usize,
    pub map_size_meters: f64,
    pub seed: u64,

    // Zone potential
    pub target_coverage: f32,
    pub zone_wavelength_meters: f64,
    pub zone_octaves: u32,

    // Base terrain
    pub base_amplitude: f32,
    pub min_amplitude_mult: f32,
    pub max_amplitude_mult: f32,
    pub terrain_wavelength_meters: f64,
    pub terrain_octaves: u32,
    pub terrain_persistence: f64,
    pub terrain_lacunarity: f64,

    // Ridges
    pub ridge_strength: f32,
    pub ridge_octaves: u32,
    pub ridge_wavelength_meters: f64,

    // Erosion
    pub num_particles: usize,
    pub erosion_rate: f32,
    pub deposition_rate: f32,
    pub evaporation_rate: f32,
    pub sediment_capacity: f32,

    // River analysis
    pub river_threshold_percentile: f32,
    pub min_river_length: usize,

    // Detail
    pub detail_amplitude: f32,
    pub detail_wavelength_meters: f64,

    // Constraint target
    pub target_buildable_min: f32,
    pub target_buildable_max: f32,

    // Stage toggles
    pub apply_ridges: bool,
    pub apply_erosion: bool,
    pub apply_rivers: bool,
    pub apply_detail: bool,
    pub apply_constraint_adjustment: bool,

    /// Use the batch-parallel erosion path instead of the sequential one.
    pub parallel_erosion: bool,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        let terrain = TerrainParams::default();
        let ridges = RidgeParams::default();
        let erosion = ErosionParams::default();
        let detail = DetailParams::default();
        let zone = ZoneParams::default();
        let verify = VerifyParams::default();
        let flow = FlowParams::default();

        Self {
            resolution: 1024,
            map_size_meters: 14336.0,
            seed: 0,

            target_coverage: zone.target_coverage,
            zone_wavelength_meters: zone.wavelength_m,
            zone_octaves: zone.octaves,

            base_amplitude: terrain.base_amplitude,
            min_amplitude_mult: terrain.min_amplitude_mult,
            max_amplitude_mult: terrain.max_amplitude_mult,
            terrain_wavelength_meters: terrain.wavelength_m,
            terrain_octaves: terrain.octaves,
            terrain_persistence: terrain.persistence,
            terrain_lacunarity: terrain.lacunarity,

            ridge_strength: ridges.strength,
            ridge_octaves: ridges.octaves,
            ridge_wavelength_meters: ridges.wavelength_m,

            num_particles: erosion.num_particles,
            erosion_rate: erosion.erosion_rate,
            deposition_rate: erosion.deposition_rate,
            evaporation_rate: erosion.evaporation_rate,
            sediment_capacity: erosion.sediment_capacity,

            river_threshold_percentile: flow.threshold_percentile,
            min_river_length: flow.min_river_length,

            detail_amplitude: detail.amplitude,
            detail_wavelength_meters: detail.wavelength_m,

            target_buildable_min: verify.target_min,
            target_buildable_max: verify.target_max,

            apply_ridges: true,
            apply_erosion: true,
            apply_rivers: true,
            apply_detail: true,
            apply_constraint_adjustment: true,

            parallel_erosion: false,
        }
    }
}

impl GeneratorConfig {
    /// Build a configuration from a terrain archetype.
    pub fn from_preset(preset: TerrainPreset) -> Self {
        match preset {
            TerrainPreset::Balanced => Self::default(),
            TerrainPreset::Rolling => Self {
                base_amplitude: 0.3,
                max_amplitude_mult: 0.7,
                target_coverage: 0.78,
                ridge_strength: 0.1,
                ..Self::default()
            },
            TerrainPreset::Alpine => Self {
                base_amplitude: 0.6,
                target_coverage: 0.62,
                ridge_strength: 0.3,
                ridge_octaves: 6,
                ..Self::default()
            },
            TerrainPreset::Mesa => Self {
                base_amplitude: 0.5,
                terrain_octaves: 4,
                terrain_persistence: 0.35,
                apply_ridges: false,
                ..Self::default()
            },
        }
    }

    /// Check every parameter against its documented range. Returns on the
    /// first offending parameter; nothing is clamped.
    pub fn validate(&self) -> Result<(), ConfigError> {
        fn check(
            name: &'static str,
            value: f64,
            min: f64,
            max: f64,
            range: &'static str,
        ) -> Result<(), ConfigError> {
            if value < min || value > max {
                Err(ConfigError::OutOfRange { name, value, range })
            } else {
                Ok(())
            }
        }

        check("resolution", self.resolution as f64, 256.0, 8192.0, "[256, 8192]")?;
        check(
            "map_size_meters",
            self.map_size_meters,
            1000.0,
            100_000.0,
            "[1000, 100000]",
        )?;
        check(
            "target_coverage",
            self.target_coverage as f64,
            0.6,
            0.8,
            "[0.6, 0.8]",
        )?;
        check(
            "zone_wavelength_meters",
            self.zone_wavelength_meters,
            5000.0,
            8000.0,
            "[5000, 8000]",
        )?;
        check("zone_octaves", self.zone_octaves as f64, 2.0, 3.0, "{2, 3}")?;
        check(
            "base_amplitude",
            self.base_amplitude as f64,
            0.05,
            1.0,
            "[0.05, 1.0]",
        )?;
        check(
            "terrain_octaves",
            self.terrain_octaves as f64,
            1.0,
            10.0,
            "[1, 10]",
        )?;
        check(
            "terrain_persistence",
            self.terrain_persistence,
            0.1,
            0.9,
            "[0.1, 0.9]",
        )?;
        check(
            "terrain_lacunarity",
            self.terrain_lacunarity,
            1.5,
            4.0,
            "[1.5, 4.0]",
        )?;
        check(
            "ridge_strength",
            self.ridge_strength as f64,
            0.1,
            0.3,
            "[0.1, 0.3]",
        )?;
        check("ridge_octaves", self.ridge_octaves as f64, 4.0, 6.0, "[4, 6]")?;
        check(
            "erosion_rate",
            self.erosion_rate as f64,
            f64::MIN_POSITIVE,
            1.0,
            "(0, 1]",
        )?;
        check(
            "deposition_rate",
            self.deposition_rate as f64,
            f64::MIN_POSITIVE,
            1.0,
            "(0, 1]",
        )?;
        check(
            "evaporation_rate",
            self.evaporation_rate as f64,
            f64::MIN_POSITIVE,
            1.0,
            "(0, 1]",
        )?;
        check(
            "sediment_capacity",
            self.sediment_capacity as f64,
            0.1,
            32.0,
            "[0.1, 32.0]",
        )?;
        check(
            "river_threshold_percentile",
            self.river_threshold_percentile as f64,
            0.000001,
            99.999999,
            "(0, 100)",
        )?;
        check(
            "detail_amplitude",
            self.detail_amplitude as f64,
            0.0,
            0.2,
            "[0.0, 0.2]",
        )?;

        if self.min_amplitude_mult <= 0.0 || self.max_amplitude_mult <= 0.0 {
            return Err(ConfigError::Inconsistent(
                "amplitude multipliers must be positive".into(),
            ));
        }
        if self.min_amplitude_mult >= self.max_amplitude_mult {
            return Err(ConfigError::Inconsistent(format!(
                "min_amplitude_mult ({}) must be below max_amplitude_mult ({})",
                self.min_amplitude_mult, self.max_amplitude_mult
            )));
        }
        if self.target_buildable_min >= self.target_buildable_max {
            return Err(ConfigError::Inconsistent(format!(
                "target_buildable_min ({}) must be below target_buildable_max ({})",
                self.target_buildable_min, self.target_buildable_max
            )));
        }
        if self.target_buildable_min <= 0.0 || self.target_buildable_max > 100.0 {
            return Err(ConfigError::Inconsistent(
                "buildable targets must lie in (0, 100]".into(),
            ));
        }

        Ok(())
    }

    // Per-stage parameter bundles.

    pub fn zone_params(&self) -> ZoneParams {
        ZoneParams {
            target_coverage: self.target_coverage,
            wavelength_m: self.zone_wavelength_meters,
            octaves: self.zone_octaves,
        }
    }

    pub fn terrain_params(&self) -> TerrainParams {
        TerrainParams {
            base_amplitude: self.base_amplitude,
            min_amplitude_mult: self.min_amplitude_mult,
            max_amplitude_mult: self.max_amplitude_mult,
            wavelength_m: self.terrain_wavelength_meters,
            octaves: self.terrain_octaves,
            persistence: self.terrain_persistence,
            lacunarity: self.terrain_lacunarity,
        }
    }

    pub fn ridge_params(&self) -> RidgeParams {
        RidgeParams {
            octaves: self.ridge_octaves,
            wavelength_m: self.ridge_wavelength_meters,
            strength: self.ridge_strength,
            ..RidgeParams::default()
        }
    }

    pub fn erosion_params(&self) -> ErosionParams {
        ErosionParams {
            num_particles: self.num_particles,
            erosion_rate: self.erosion_rate,
            deposition_rate: self.deposition_rate,
            evaporation_rate: self.evaporation_rate,
            sediment_capacity: self.sediment_capacity,
            ..ErosionParams::default()
        }
    }

    pub fn flow_params(&self) -> FlowParams {
        FlowParams {
            threshold_percentile: self.river_threshold_percentile,
            min_river_length: self.min_river_length,
            ..FlowParams::default()
        }
    }

    pub fn detail_params(&self) -> DetailParams {
        DetailParams {
            amplitude: self.detail_amplitude,
            wavelength_m: self.detail_wavelength_meters,
            ..DetailParams::default()
        }
    }

    pub fn verify_params(&self) -> VerifyParams {
        VerifyParams {
            target_min: self.target_buildable_min,
            target_max: self.target_buildable_max,
            ..VerifyParams::default()
        }
    }
}
