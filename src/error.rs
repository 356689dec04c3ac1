//! Error type shared by every pipeline stage.

use thiserror::Error;

use crate::source::SourceImageError;
use crate::terrain::ConfigError;

/// Errors that can occur while turning a heightmap into a mesh.
///
/// Each variant tags one failure class so callers can tell bad configuration
/// from a bad input image from an extraction bug.
#[derive(Error, Debug)]
pub enum TerrainError {
    #[error("Invalid configuration: {0}")]
    Configuration(#[from] ConfigError),
    #[error("Shape mismatch for {artifact}: expected {expected:?}, got {actual:?}")]
    ShapeMismatch {
        artifact: &'static str,
        expected: [usize; 3],
        actual: [usize; 3],
    },
    #[error("Invalid heightmap value {value} at ({x}, {z}): must lie in [0, 1]")]
    InvalidHeightmap { x: usize, z: usize, value: f32 },
    #[error("Invalid density {value} at ({x}, {y}, {z}): must lie in [0, 1]")]
    InvalidDensity { x: usize, y: usize, z: usize, value: f32 },
    #[error("Degenerate triangle {triangle}: face normal has zero length")]
    DegenerateGeometry { triangle: usize },
    #[error("Malformed mesh: triangle {triangle} references vertex {index} but only {vertex_count} exist")]
    MalformedMesh {
        triangle: usize,
        index: u32,
        vertex_count: usize,
    },
    #[error("Terrain generation was cancelled")]
    Cancelled,
    #[error("Source image error: {0}")]
    SourceImage(#[from] SourceImageError),
    #[error("Terrain worker failed: {0}")]
    Worker(String),
}
