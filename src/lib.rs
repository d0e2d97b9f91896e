//! Procedural terrain heightmap generation for city-building maps.
//!
//! The pipeline produces normalized [0, 1] heightmaps where most of the
//! map is flat enough to build on (slope <= 5%), with the remaining area
//! carrying mountains, ridges, and erosion-carved valleys. See
//! [`pipeline::run`] for the stage sequence.

pub mod config;
pub mod detail;
pub mod erosion;
pub mod export;
pub mod grid;
pub mod noise_field;
pub mod normalize;
pub mod pipeline;
pub mod ridges;
pub mod rivers;
pub mod slope;
pub mod terrain;
pub mod verify;
pub mod zone;
