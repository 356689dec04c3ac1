//! Mesh assembly: world scaling plus face and smoothed vertex normals.

use glam::Vec3;
use serde::{Deserialize, Serialize};

use super::marching_cubes::{bounds_of, RawMesh};
use crate::error::TerrainError;

/// Render-ready terrain mesh in world units.
///
/// Vertex order and triangle indices are those of the [`RawMesh`] it was
/// assembled from.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FinalMesh {
    pub positions: Vec<Vec3>,
    pub cells: Vec<[u32; 3]>,
    /// One unit normal per triangle.
    pub face_normals: Vec<Vec3>,
    /// One unit normal per vertex, averaged over adjacent faces.
    pub vertex_normals: Vec<Vec3>,
}

impl FinalMesh {
    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    pub fn triangle_count(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn bounds(&self) -> Option<(Vec3, Vec3)> {
        bounds_of(&self.positions)
    }

    /// Positions as a tightly packed `f32` byte buffer for GPU upload.
    pub fn position_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.positions)
    }

    /// Vertex normals as a tightly packed `f32` byte buffer.
    pub fn normal_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.vertex_normals)
    }

    /// Triangle indices as a tightly packed `u32` byte buffer.
    pub fn index_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.cells)
    }
}

/// Scales `raw` into world units and computes its normals.
///
/// Face normals follow the triangle winding, `(b - a) × (c - a)`. Vertex
/// normals are the renormalized, equally weighted sum of the face normals of
/// every triangle using the vertex. A vertex used by no triangle keeps a zero
/// normal.
///
/// # Errors
/// `MalformedMesh` for an out-of-range index,
/// `DegenerateGeometry` for a triangle whose cross product has zero length.
pub fn assemble_mesh(raw: &RawMesh, scale: Vec3) -> Result<FinalMesh, TerrainError> {
    raw.validate()?;

    let positions: Vec<Vec3> = raw.positions.iter().map(|&p| p * scale).collect();

    let face_normals = raw
        .cells
        .iter()
        .enumerate()
        .map(|(triangle, &[a, b, c])| {
            let (pa, pb, pc) = (positions[a as usize], positions[b as usize], positions[c as usize]);
            (pb - pa)
                .cross(pc - pa)
                .try_normalize()
                .ok_or(TerrainError::DegenerateGeometry { triangle })
        })
        .collect::<Result<Vec<_>, _>>()?;

    let mut vertex_normals = vec![Vec3::ZERO; positions.len()];
    for (cell, &normal) in raw.cells.iter().zip(&face_normals) {
        for &index in cell {
            vertex_normals[index as usize] += normal;
        }
    }
    for normal in &mut vertex_normals {
        *normal = normal.normalize_or_zero();
    }

    Ok(FinalMesh {
        positions,
        cells: raw.cells.clone(),
        face_normals,
        vertex_normals,
    })
}
