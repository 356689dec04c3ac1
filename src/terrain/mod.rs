//! Terrain volume module.
//!
//! Provides the heightmap and density field grids, the terrain configuration,
//! and the density field generator that grows one from the other.

mod config;
mod density;
mod heightmap;

pub use config::{ConfigError, TerrainConfig, TerrainSettings};
pub use density::{build_density_field, sculpted_density, DensityField};
pub use heightmap::Heightmap;
