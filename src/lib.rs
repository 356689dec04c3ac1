//! Voxel terrain synthesis.
//!
//! A 2D land map is grown into a 3D density field (a flat plateau topped by
//! noise-sculpted terrain) and polygonized with marching cubes into a mesh
//! with world scaling and smooth normals.

pub mod error;
pub mod export;
pub mod mesh;
pub mod noise;
pub mod pipeline;
pub mod source;
pub mod terrain;

pub use error::TerrainError;
pub use mesh::{assemble_mesh, extract_isosurface, FinalMesh, RawMesh};
pub use noise::{FractalNoiseConfig, NoiseField};
pub use pipeline::{CancelToken, StageId, TerrainArtifacts, TerrainPipeline};
pub use source::{GrayscaleImageSource, HeightmapSource, ImageInput, OutlineConfig, OutlineImageSource};
pub use terrain::{build_density_field, DensityField, Heightmap, TerrainConfig, TerrainSettings};
