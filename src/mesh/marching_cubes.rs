//! Marching cubes isosurface extraction.
//!
//! Cells are marched in z-slabs with rayon and the slabs are merged in z
//! order afterwards. Vertices are keyed by the grid edge they lie on, so a
//! vertex shared by neighbouring cells (or slabs) is emitted once, and index
//! assignment follows first appearance in (z, y, x) cell order. The output is
//! therefore identical however rayon splits the work.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::time::Instant;

use glam::Vec3;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::tables::{CORNER_OFFSETS, EDGE_CORNERS, EDGE_TABLE, TRI_TABLE};
use crate::error::TerrainError;
use crate::pipeline::CancelToken;
use crate::terrain::{ConfigError, DensityField};

/// Triangle soup produced by extraction, in voxel-grid coordinates.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawMesh {
    /// Deduplicated vertex positions.
    pub positions: Vec<Vec3>,
    /// Triangles as indices into `positions`.
    pub cells: Vec<[u32; 3]>,
}

impl RawMesh {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    pub fn triangle_count(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Axis-aligned bounds of the positions, or `None` for an empty mesh.
    pub fn bounds(&self) -> Option<(Vec3, Vec3)> {
        bounds_of(&self.positions)
    }

    /// Checks that every triangle index refers to an existing vertex.
    pub fn validate(&self) -> Result<(), TerrainError> {
        let vertex_count = self.positions.len();
        for (triangle, cell) in self.cells.iter().enumerate() {
            if let Some(&index) = cell.iter().find(|&&i| i as usize >= vertex_count) {
                return Err(TerrainError::MalformedMesh {
                    triangle,
                    index,
                    vertex_count,
                });
            }
        }
        Ok(())
    }
}

pub(crate) fn bounds_of(positions: &[Vec3]) -> Option<(Vec3, Vec3)> {
    let first = *positions.first()?;
    Some(
        positions
            .iter()
            .fold((first, first), |(lo, hi), &p| (lo.min(p), hi.max(p))),
    )
}

/// Extracts the `iso` level set of `field` as a triangle mesh.
///
/// A corner counts as empty when its density is below `iso`. Triangles are
/// wound counter-clockwise when seen from the empty side, so
/// `(b - a) × (c - a)` points away from solid matter. Ambiguous cell
/// configurations are resolved by the standard table entry.
///
/// # Errors
/// `Configuration` if `iso` lies outside `[0, 1]`,
/// `Cancelled` if `cancel` fires between slabs.
pub fn extract_isosurface(field: &DensityField, iso: f32, cancel: &CancelToken) -> Result<RawMesh, TerrainError> {
    if !(0.0..=1.0).contains(&iso) {
        return Err(ConfigError::IsoOutOfRange(iso).into());
    }

    let start = Instant::now();
    let slab_count = field.depth().saturating_sub(1);

    let slabs: Vec<Vec<[u64; 3]>> = (0..slab_count)
        .into_par_iter()
        .map(|z| {
            cancel.check()?;
            Ok(march_slab(field, iso, z))
        })
        .collect::<Result<_, TerrainError>>()?;

    cancel.check()?;
    let mesh = merge_slabs(field, iso, slabs);

    debug!(
        vertices = mesh.vertex_count(),
        triangles = mesh.triangle_count(),
        elapsed = ?start.elapsed(),
        "Extracted isosurface"
    );

    Ok(mesh)
}

/// Marches every cell whose lowest corner has the given z, returning
/// triangles as triples of edge keys.
fn march_slab(field: &DensityField, iso: f32, z: usize) -> Vec<[u64; 3]> {
    let mut triangles = Vec::new();

    for y in 0..field.height().saturating_sub(1) {
        for x in 0..field.width().saturating_sub(1) {
            let mut cube_index = 0usize;
            for (i, [dx, dy, dz]) in CORNER_OFFSETS.iter().enumerate() {
                if field.get(x + dx, y + dy, z + dz) < iso {
                    cube_index |= 1 << i;
                }
            }

            // Entirely solid or entirely empty
            if EDGE_TABLE[cube_index] == 0 {
                continue;
            }

            for tri in TRI_TABLE[cube_index].chunks_exact(3).take_while(|t| t[0] != -1) {
                triangles.push([
                    edge_key(field, x, y, z, tri[0] as usize),
                    edge_key(field, x, y, z, tri[1] as usize),
                    edge_key(field, x, y, z, tri[2] as usize),
                ]);
            }
        }
    }

    triangles
}

fn merge_slabs(field: &DensityField, iso: f32, slabs: Vec<Vec<[u64; 3]>>) -> RawMesh {
    let triangle_count: usize = slabs.iter().map(Vec::len).sum();
    let mut mesh = RawMesh {
        positions: Vec::with_capacity(triangle_count / 2),
        cells: Vec::with_capacity(triangle_count),
    };
    let mut vertex_of_edge: HashMap<u64, u32> = HashMap::with_capacity(triangle_count / 2);

    for triangle in slabs.into_iter().flatten() {
        let mut cell = [0u32; 3];
        for (slot, key) in cell.iter_mut().zip(triangle) {
            *slot = match vertex_of_edge.entry(key) {
                Entry::Occupied(entry) => *entry.get(),
                Entry::Vacant(entry) => {
                    let index = mesh.positions.len() as u32;
                    mesh.positions.push(edge_vertex(field, iso, key));
                    *entry.insert(index)
                }
            };
        }
        mesh.cells.push(cell);
    }

    mesh
}

/// Lower grid corner and axis (0 = x, 1 = y, 2 = z) of a cell edge.
fn edge_origin_axis(edge: usize) -> ([usize; 3], usize) {
    let [a, b] = EDGE_CORNERS[edge];
    let (pa, pb) = (CORNER_OFFSETS[a], CORNER_OFFSETS[b]);
    let origin = [pa[0].min(pb[0]), pa[1].min(pb[1]), pa[2].min(pb[2])];
    let axis = if pa[0] != pb[0] {
        0
    } else if pa[1] != pb[1] {
        1
    } else {
        2
    };
    (origin, axis)
}

/// Identifies a grid edge by its lower voxel and axis.
fn edge_key(field: &DensityField, x: usize, y: usize, z: usize, edge: usize) -> u64 {
    let ([ox, oy, oz], axis) = edge_origin_axis(edge);
    let voxel = field.index(x + ox, y + oy, z + oz);
    voxel as u64 * 3 + axis as u64
}

/// Vertices stay this far (in voxels) from the grid corners, so a corner
/// that equals `iso` exactly cannot collapse neighbouring edge vertices
/// into one point.
const EDGE_T_MARGIN: f32 = 1e-3;

/// Interpolated iso crossing along a grid edge, always measured from the
/// lower endpoint.
fn edge_vertex(field: &DensityField, iso: f32, key: u64) -> Vec3 {
    let voxel = (key / 3) as usize;
    let axis = (key % 3) as usize;

    let width = field.width();
    let height = field.height();
    let x = voxel % width;
    let y = (voxel / width) % height;
    let z = voxel / (width * height);

    let mut upper = [x, y, z];
    upper[axis] += 1;

    let v0 = field.get(x, y, z);
    let v1 = field.get(upper[0], upper[1], upper[2]);
    let t = (iso - v0) / (v1 - v0);
    let t = if t.is_finite() {
        t.clamp(EDGE_T_MARGIN, 1.0 - EDGE_T_MARGIN)
    } else {
        0.5
    };

    let mut position = Vec3::new(x as f32, y as f32, z as f32);
    position[axis] += t;
    position
}
