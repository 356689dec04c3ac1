//! Wavefront OBJ export for final meshes.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use super::ExportError;
use crate::mesh::FinalMesh;

/// Writes `mesh` as an OBJ file at `path`.
pub fn export_mesh_obj(mesh: &FinalMesh, path: &Path) -> Result<(), ExportError> {
    let mut writer = BufWriter::new(File::create(path)?);
    write_obj(mesh, &mut writer)?;
    writer.flush()?;
    Ok(())
}

/// Writes positions (`v`), vertex normals (`vn`) and faces (`f v//vn`).
/// OBJ indices are 1-based; the winding of each triangle is preserved.
pub fn write_obj<W: Write>(mesh: &FinalMesh, writer: &mut W) -> Result<(), ExportError> {
    if mesh.is_empty() {
        return Err(ExportError::Empty("mesh"));
    }

    writeln!(
        writer,
        "# isoterrain mesh: {} vertices, {} triangles",
        mesh.vertex_count(),
        mesh.triangle_count()
    )?;
    for p in &mesh.positions {
        writeln!(writer, "v {} {} {}", p.x, p.y, p.z)?;
    }
    for n in &mesh.vertex_normals {
        writeln!(writer, "vn {} {} {}", n.x, n.y, n.z)?;
    }
    for &[a, b, c] in &mesh.cells {
        let (a, b, c) = (a + 1, b + 1, c + 1);
        writeln!(writer, "f {a}//{a} {b}//{b} {c}//{c}")?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use glam::Vec3;

    use super::*;

    fn triangle() -> FinalMesh {
        FinalMesh {
            positions: vec![Vec3::ZERO, Vec3::Z, Vec3::X],
            cells: vec![[0, 1, 2]],
            face_normals: vec![Vec3::Y],
            vertex_normals: vec![Vec3::Y; 3],
        }
    }

    #[test]
    fn test_write_obj() {
        let mut out = Vec::new();
        write_obj(&triangle(), &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();

        assert_eq!(text.lines().filter(|l| l.starts_with("v ")).count(), 3);
        assert_eq!(text.lines().filter(|l| l.starts_with("vn ")).count(), 3);
        assert!(text.contains("v 0 0 1\n"));
        assert!(text.contains("vn 0 1 0\n"));
        assert!(text.trim_end().ends_with("f 1//1 2//2 3//3"));
    }

    #[test]
    fn test_empty_mesh_is_rejected() {
        let mut out = Vec::new();
        assert!(matches!(write_obj(&FinalMesh::default(), &mut out), Err(ExportError::Empty("mesh"))));
    }

    #[test]
    fn test_export_mesh_obj_creates_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("terrain.obj");
        export_mesh_obj(&triangle(), &path).unwrap();
        assert!(std::fs::metadata(&path).unwrap().len() > 0);
    }
}
