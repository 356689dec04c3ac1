//! PNG previews of heightmaps and density slices.

use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use image::codecs::png::{CompressionType, FilterType, PngEncoder};
use image::{ExtendedColorType, ImageEncoder};

use super::ExportError;
use crate::terrain::{DensityField, Heightmap};

/// Encoder settings for PNG export.
#[derive(Debug, Clone)]
pub struct PngExportOptions {
    pub compression: CompressionType,
    pub filter: FilterType,
}

impl Default for PngExportOptions {
    fn default() -> Self {
        Self {
            compression: CompressionType::Default,
            filter: FilterType::Adaptive,
        }
    }
}

/// Writes `heightmap` as an 8-bit grayscale PNG, `x` across and `z` down.
pub fn export_heightmap_png(heightmap: &Heightmap, path: &Path, options: &PngExportOptions) -> Result<(), ExportError> {
    if heightmap.values().is_empty() {
        return Err(ExportError::Empty("heightmap"));
    }

    let pixels: Vec<u8> = heightmap
        .values()
        .iter()
        .map(|&v| (v.clamp(0.0, 1.0) * 255.0).round() as u8)
        .collect();

    let encoder = encoder_for(path, options)?;
    encoder.write_image(
        &pixels,
        heightmap.width() as u32,
        heightmap.depth() as u32,
        ExtendedColorType::L8,
    )?;
    Ok(())
}

/// Writes the horizontal slice at height `y` of `field` as a 16-bit
/// grayscale PNG. Density 0 maps to black and 1 to white.
pub fn export_density_slice_png(
    field: &DensityField,
    y: usize,
    path: &Path,
    options: &PngExportOptions,
) -> Result<(), ExportError> {
    if y >= field.height() {
        return Err(ExportError::SliceOutOfRange {
            y,
            height: field.height(),
        });
    }
    if field.width() == 0 || field.depth() == 0 {
        return Err(ExportError::Empty("density field"));
    }

    let mut pixels: Vec<u16> = Vec::with_capacity(field.width() * field.depth());
    for z in 0..field.depth() {
        for x in 0..field.width() {
            pixels.push((field.get(x, y, z).clamp(0.0, 1.0) * 65535.0) as u16);
        }
    }

    // Native-endian samples; the encoder reorders them
    let encoder = encoder_for(path, options)?;
    encoder.write_image(
        bytemuck::cast_slice(&pixels),
        field.width() as u32,
        field.depth() as u32,
        ExtendedColorType::L16,
    )?;
    Ok(())
}

fn encoder_for(path: &Path, options: &PngExportOptions) -> Result<PngEncoder<BufWriter<File>>, ExportError> {
    let writer = BufWriter::new(File::create(path)?);
    Ok(PngEncoder::new_with_quality(writer, options.compression, options.filter))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_export_heightmap_png() {
        let heightmap = Heightmap::from_fn(8, 4, |x, _| if x < 4 { 1.0 } else { 0.0 });
        let dir = tempdir().unwrap();
        let path = dir.path().join("heightmap.png");

        export_heightmap_png(&heightmap, &path, &PngExportOptions::default()).unwrap();

        let img = image::open(&path).unwrap().to_luma8();
        assert_eq!(img.dimensions(), (8, 4));
        assert_eq!(img.get_pixel(0, 0).0[0], 255);
        assert_eq!(img.get_pixel(7, 3).0[0], 0);
    }

    #[test]
    fn test_export_density_slice_png() {
        let field = DensityField::from_fn(4, 3, 5, |x, y, _| if y == 0 { 1.0 } else { x as f32 / 3.0 });
        let dir = tempdir().unwrap();
        let path = dir.path().join("slice.png");

        export_density_slice_png(&field, 1, &path, &PngExportOptions::default()).unwrap();

        let img = image::open(&path).unwrap().to_luma16();
        assert_eq!(img.dimensions(), (4, 5));
        assert_eq!(img.get_pixel(0, 0).0[0], 0);
        assert_eq!(img.get_pixel(3, 4).0[0], 65535);
    }

    #[test]
    fn test_slice_out_of_range() {
        let field = DensityField::new(4, 3, 4);
        let dir = tempdir().unwrap();
        let result = export_density_slice_png(&field, 3, &dir.path().join("slice.png"), &PngExportOptions::default());
        assert!(matches!(result, Err(ExportError::SliceOutOfRange { y: 3, height: 3 })));
    }
}
