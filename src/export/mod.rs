//! Export module for saving terrain artifacts to files.
//!
//! Heightmaps and density slices go out as PNG previews, final meshes as
//! Wavefront OBJ.

mod obj;
mod png;

use thiserror::Error;

pub use obj::{export_mesh_obj, write_obj};
pub use png::{export_density_slice_png, export_heightmap_png, PngExportOptions};

/// Errors that can occur during export.
#[derive(Error, Debug)]
pub enum ExportError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Image encoding error: {0}")]
    Image(#[from] image::ImageError),
    #[error("Slice {y} is outside the density field (height {height})")]
    SliceOutOfRange { y: usize, height: usize },
    #[error("Cannot export an empty {0}")]
    Empty(&'static str),
}
