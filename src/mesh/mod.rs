//! Isosurface extraction and mesh assembly.
//!
//! [`extract_isosurface`] turns a density field into a [`RawMesh`] in voxel
//! coordinates; [`assemble_mesh`] scales it into world units and adds normals.

mod assemble;
pub mod marching_cubes;
pub mod tables;

pub use assemble::{assemble_mesh, FinalMesh};
pub use marching_cubes::{extract_isosurface, RawMesh};
