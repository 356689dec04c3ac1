//! End-to-end terrain generation through the public API.

use std::io::Cursor;

use glam::Vec3;
use image::{DynamicImage, GrayImage, ImageFormat, Luma};
use isoterrain::export::write_obj;
use isoterrain::source::OutlineConfig;
use isoterrain::{Heightmap, OutlineImageSource, TerrainConfig, TerrainError, TerrainPipeline};

/// Round island in the middle of a `size × size` map.
fn island(size: usize) -> Heightmap {
    let center = size as f32 / 2.0;
    let radius = size as f32 / 3.0;
    Heightmap::from_fn(size, size, |x, z| {
        let dx = x as f32 + 0.5 - center;
        let dz = z as f32 + 0.5 - center;
        if (dx * dx + dz * dz).sqrt() < radius {
            1.0
        } else {
            0.0
        }
    })
}

fn circle_outline_png(size: u32) -> Vec<u8> {
    let center = size as f32 / 2.0;
    let img = GrayImage::from_fn(size, size, |x, y| {
        let d = ((x as f32 + 0.5 - center).powi(2) + (y as f32 + 0.5 - center).powi(2)).sqrt();
        Luma([if (d - size as f32 / 3.0).abs() < 1.0 { 0 } else { 255 }])
    });
    let mut bytes = Vec::new();
    DynamicImage::ImageLuma8(img)
        .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
        .unwrap();
    bytes
}

fn island_config() -> TerrainConfig {
    TerrainConfig::new(32, 32, 3, 8).with_noise_scale(0.15).with_seed(7)
}

#[tokio::test]
async fn test_island_generates_valid_mesh() {
    let mut pipeline = TerrainPipeline::new(island_config()).unwrap();
    let mesh = pipeline.from_heightmap(island(32)).await.unwrap();

    assert!(mesh.triangle_count() > 100);
    assert_eq!(mesh.face_normals.len(), mesh.triangle_count());
    assert_eq!(mesh.vertex_normals.len(), mesh.vertex_count());

    for &[a, b, c] in &mesh.cells {
        assert!((a as usize) < mesh.vertex_count());
        assert!((b as usize) < mesh.vertex_count());
        assert!((c as usize) < mesh.vertex_count());
    }
    for normal in &mesh.face_normals {
        assert!((normal.length() - 1.0).abs() < 1e-4);
    }

    let (lo, hi) = mesh.bounds().unwrap();
    assert!(lo.cmpge(Vec3::ZERO).all());
    assert!(hi.cmple(Vec3::new(31.0, 11.0, 31.0)).all());
}

#[tokio::test]
async fn test_generation_is_deterministic() {
    let mut first = TerrainPipeline::new(island_config()).unwrap();
    let mut second = TerrainPipeline::new(island_config()).unwrap();

    let a = first.from_heightmap(island(32)).await.unwrap();
    let b = second.from_heightmap(island(32)).await.unwrap();
    assert_eq!(*a, *b);

    let mut a_obj = Vec::new();
    let mut b_obj = Vec::new();
    write_obj(&a, &mut a_obj).unwrap();
    write_obj(&b, &mut b_obj).unwrap();
    assert_eq!(a_obj, b_obj);
}

#[tokio::test]
async fn test_world_scale_stretches_mesh() {
    let scale = Vec3::new(2.0, 0.5, 2.0);
    let mut unit = TerrainPipeline::new(island_config()).unwrap();
    let mut scaled = TerrainPipeline::new(island_config().with_world_scale(scale)).unwrap();

    let a = unit.from_heightmap(island(32)).await.unwrap();
    let b = scaled.from_heightmap(island(32)).await.unwrap();

    assert_eq!(a.cells, b.cells);
    for (p, q) in a.positions.iter().zip(&b.positions) {
        assert!((*p * scale).abs_diff_eq(*q, 1e-5));
    }
}

#[tokio::test]
async fn test_all_water_yields_empty_mesh() {
    let mut pipeline = TerrainPipeline::new(island_config()).unwrap();
    let mesh = pipeline.from_heightmap(Heightmap::new(32, 32)).await.unwrap();

    assert!(mesh.is_empty());
    let field = pipeline.density_field().unwrap();
    assert_eq!(field.value_range(), (0.0, 0.0));
}

#[tokio::test]
async fn test_outline_image_end_to_end() {
    let source = OutlineImageSource::new(OutlineConfig {
        threshold: 128,
        dilate_radius: 1,
        erode_radius: 1,
    });
    let mut pipeline = TerrainPipeline::new(island_config()).unwrap();
    let mesh = pipeline.from_image(&source, circle_outline_png(32)).await.unwrap();

    let heightmap = pipeline.heightmap().unwrap();
    assert_eq!((heightmap.width(), heightmap.depth()), (32, 32));
    assert!(heightmap.land_fraction() > 0.1);
    assert!(heightmap.is_land(16, 16));
    assert!(!heightmap.is_land(0, 0));
    assert!(!mesh.is_empty());
}

#[tokio::test]
async fn test_cancel_before_run() {
    let mut pipeline = TerrainPipeline::new(island_config()).unwrap();
    pipeline.cancel_token().cancel();

    let result = pipeline.from_heightmap(island(32)).await;
    assert!(matches!(result, Err(TerrainError::Cancelled)));
    assert!(pipeline.artifacts().mesh.is_none());
}
