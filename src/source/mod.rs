//! Heightmap sources: collaborators that turn an image into a land/water map.
//!
//! The pipeline only sees the [`HeightmapSource`] trait. Two image-backed
//! implementations are provided: [`OutlineImageSource`] for drawn coastline
//! outlines and [`GrayscaleImageSource`] for ready-made grayscale masks.

mod outline;

use std::path::PathBuf;

use async_trait::async_trait;
use image::imageops::FilterType;
use image::GrayImage;
use thiserror::Error;

use crate::terrain::Heightmap;

pub use outline::{land_from_outline, GrayscaleImageSource, OutlineConfig, OutlineImageSource};

/// Errors raised while producing a heightmap from an image.
#[derive(Error, Debug)]
pub enum SourceImageError {
    #[error("Failed to read image '{path}': {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to decode image: {0}")]
    Decode(#[from] image::ImageError),
    #[error("Invalid target size {width}x{depth}")]
    InvalidSize { width: usize, depth: usize },
    #[error("Image worker failed: {0}")]
    Worker(String),
}

/// Where the source image comes from.
#[derive(Debug, Clone)]
pub enum ImageInput {
    Path(PathBuf),
    Bytes(Vec<u8>),
}

impl From<PathBuf> for ImageInput {
    fn from(path: PathBuf) -> Self {
        ImageInput::Path(path)
    }
}

impl From<Vec<u8>> for ImageInput {
    fn from(bytes: Vec<u8>) -> Self {
        ImageInput::Bytes(bytes)
    }
}

/// Produces a heightmap of exactly `width × depth` cells with values in `[0, 1]`.
#[async_trait]
pub trait HeightmapSource: Send + Sync {
    async fn extract_heightmap(
        &self,
        input: ImageInput,
        width: usize,
        depth: usize,
    ) -> Result<Heightmap, SourceImageError>;
}

/// Converts a grayscale image to a graded heightmap (`luma / 255`).
pub fn heightmap_from_luma(gray: &GrayImage) -> Heightmap {
    Heightmap::from_fn(gray.width() as usize, gray.height() as usize, |x, z| {
        gray.get_pixel(x as u32, z as u32).0[0] as f32 / 255.0
    })
}

/// Reads and decodes `input`, then resizes it to `width × depth` grayscale.
pub(crate) async fn load_luma(input: ImageInput, width: usize, depth: usize) -> Result<GrayImage, SourceImageError> {
    if width == 0 || depth == 0 {
        return Err(SourceImageError::InvalidSize { width, depth });
    }

    let bytes = match input {
        ImageInput::Path(path) => tokio::fs::read(&path)
            .await
            .map_err(|source| SourceImageError::Read { path, source })?,
        ImageInput::Bytes(bytes) => bytes,
    };

    tokio::task::spawn_blocking(move || decode_luma(&bytes, width as u32, depth as u32))
        .await
        .map_err(|e| SourceImageError::Worker(e.to_string()))?
}

fn decode_luma(bytes: &[u8], width: u32, depth: u32) -> Result<GrayImage, SourceImageError> {
    let image = image::load_from_memory(bytes)?;
    let gray = image.to_luma8();
    if gray.dimensions() == (width, depth) {
        return Ok(gray);
    }
    Ok(image::imageops::resize(&gray, width, depth, FilterType::Triangle))
}
