//! Image-backed heightmap sources.
//!
//! An outline drawing is turned into land by thresholding the ink, dilating
//! it to close small gaps, flood-filling the water from the image border and
//! finally eroding the enclosed land to undo the dilation.

use std::collections::VecDeque;

use async_trait::async_trait;
use image::GrayImage;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{heightmap_from_luma, load_luma, HeightmapSource, ImageInput, SourceImageError};
use crate::terrain::Heightmap;

/// Parameters for outline extraction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutlineConfig {
    /// Pixels darker than this are ink.
    pub threshold: u8,
    /// Half-width of the square used to thicken the ink.
    pub dilate_radius: usize,
    /// Half-width of the square used to shrink the land afterwards.
    pub erode_radius: usize,
}

impl Default for OutlineConfig {
    fn default() -> Self {
        Self {
            threshold: 170,
            dilate_radius: 6,
            erode_radius: 7,
        }
    }
}

/// Extracts land enclosed by a drawn outline.
#[derive(Debug, Clone, Default)]
pub struct OutlineImageSource {
    pub config: OutlineConfig,
}

impl OutlineImageSource {
    pub fn new(config: OutlineConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl HeightmapSource for OutlineImageSource {
    async fn extract_heightmap(
        &self,
        input: ImageInput,
        width: usize,
        depth: usize,
    ) -> Result<Heightmap, SourceImageError> {
        let gray = load_luma(input, width, depth).await?;
        let config = self.config.clone();
        tokio::task::spawn_blocking(move || land_from_outline(&gray, &config))
            .await
            .map_err(|e| SourceImageError::Worker(e.to_string()))
    }
}

/// Reads a ready-made grayscale mask.
///
/// With a threshold, pixels at or above it are land and the map is binary.
/// Without one the luminance is kept as a graded height (`luma / 255`).
#[derive(Debug, Clone)]
pub struct GrayscaleImageSource {
    pub threshold: Option<u8>,
}

impl GrayscaleImageSource {
    pub fn graded() -> Self {
        Self { threshold: None }
    }
}

impl Default for GrayscaleImageSource {
    fn default() -> Self {
        Self { threshold: Some(128) }
    }
}

#[async_trait]
impl HeightmapSource for GrayscaleImageSource {
    async fn extract_heightmap(
        &self,
        input: ImageInput,
        width: usize,
        depth: usize,
    ) -> Result<Heightmap, SourceImageError> {
        let gray = load_luma(input, width, depth).await?;
        let Some(threshold) = self.threshold else {
            return Ok(heightmap_from_luma(&gray));
        };
        Ok(Heightmap::from_fn(width, depth, |x, z| {
            if gray.get_pixel(x as u32, z as u32).0[0] >= threshold {
                1.0
            } else {
                0.0
            }
        }))
    }
}

/// Binary land map of the region enclosed by the ink in `gray`.
///
/// Ink itself is not land. Water is everything 4-connected to a non-ink
/// border pixel.
pub fn land_from_outline(gray: &GrayImage, config: &OutlineConfig) -> Heightmap {
    let (width, depth) = (gray.width() as usize, gray.height() as usize);

    let ink: Vec<bool> = gray.pixels().map(|p| p.0[0] < config.threshold).collect();
    let ink = dilate(&ink, width, depth, config.dilate_radius);
    let water = flood_from_border(&ink, width, depth);

    let enclosed: Vec<bool> = ink.iter().zip(&water).map(|(&i, &w)| !i && !w).collect();
    let land = erode(&enclosed, width, depth, config.erode_radius);

    let heightmap = Heightmap::from_fn(width, depth, |x, z| if land[z * width + x] { 1.0 } else { 0.0 });
    debug!(
        width,
        depth,
        land_fraction = heightmap.land_fraction(),
        "Extracted land from outline"
    );
    heightmap
}

/// Marks every cell reachable from a non-blocked border cell.
fn flood_from_border(blocked: &[bool], width: usize, depth: usize) -> Vec<bool> {
    let mut reached = vec![false; blocked.len()];
    let mut queue: VecDeque<(usize, usize)> = VecDeque::new();

    let border = (0..width)
        .flat_map(|x| [(x, 0), (x, depth.saturating_sub(1))])
        .chain((0..depth).flat_map(|z| [(0, z), (width.saturating_sub(1), z)]));
    for (x, z) in border {
        let idx = z * width + x;
        if !blocked[idx] && !reached[idx] {
            reached[idx] = true;
            queue.push_back((x, z));
        }
    }

    while let Some((x, z)) = queue.pop_front() {
        for (dx, dz) in [(-1i64, 0i64), (1, 0), (0, -1), (0, 1)] {
            let nx = x as i64 + dx;
            let nz = z as i64 + dz;
            if nx < 0 || nz < 0 || nx >= width as i64 || nz >= depth as i64 {
                continue;
            }
            let (nx, nz) = (nx as usize, nz as usize);
            let nidx = nz * width + nx;
            if blocked[nidx] || reached[nidx] {
                continue;
            }
            reached[nidx] = true;
            queue.push_back((nx, nz));
        }
    }

    reached
}

/// Square-kernel dilation (separable max filter). Outside the image is false.
fn dilate(mask: &[bool], width: usize, depth: usize, radius: usize) -> Vec<bool> {
    if radius == 0 {
        return mask.to_vec();
    }

    let mut horizontal = vec![false; mask.len()];
    for z in 0..depth {
        let row = &mask[z * width..(z + 1) * width];
        let hits = window_any(row.iter().copied(), width, radius);
        horizontal[z * width..(z + 1) * width].copy_from_slice(&hits);
    }

    let mut out = vec![false; mask.len()];
    for x in 0..width {
        let column = (0..depth).map(|z| horizontal[z * width + x]);
        for (z, hit) in window_any(column, depth, radius).into_iter().enumerate() {
            out[z * width + x] = hit;
        }
    }
    out
}

/// Square-kernel erosion. Outside the image counts as set, so the border
/// does not eat into the mask.
fn erode(mask: &[bool], width: usize, depth: usize, radius: usize) -> Vec<bool> {
    let inverted: Vec<bool> = mask.iter().map(|&m| !m).collect();
    dilate(&inverted, width, depth, radius).into_iter().map(|m| !m).collect()
}

/// For each position, whether any value within `radius` is set.
fn window_any(values: impl Iterator<Item = bool>, len: usize, radius: usize) -> Vec<bool> {
    let mut prefix = Vec::with_capacity(len + 1);
    prefix.push(0usize);
    for v in values {
        let last = *prefix.last().unwrap_or(&0);
        prefix.push(last + v as usize);
    }

    (0..len)
        .map(|i| {
            let lo = i.saturating_sub(radius);
            let hi = (i + radius + 1).min(len);
            prefix[hi] - prefix[lo] > 0
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use image::Luma;

    use super::*;
    use crate::source::tests::outline_png;

    fn square_outline(size: u32, lo: u32, hi: u32) -> GrayImage {
        GrayImage::from_fn(size, size, |x, y| {
            let on_x_edge = (x == lo || x == hi) && (lo..=hi).contains(&y);
            let on_y_edge = (y == lo || y == hi) && (lo..=hi).contains(&x);
            Luma([if on_x_edge || on_y_edge { 0 } else { 255 }])
        })
    }

    fn land_cells(map: &Heightmap) -> Vec<(usize, usize)> {
        map.cell_coords().filter(|&(x, z)| map.get(x, z) == 1.0).collect()
    }

    #[test]
    fn test_enclosed_interior_becomes_land() {
        let config = OutlineConfig {
            threshold: 128,
            dilate_radius: 0,
            erode_radius: 0,
        };
        let map = land_from_outline(&square_outline(32, 8, 23), &config);

        let land = land_cells(&map);
        assert_eq!(land.len(), 14 * 14);
        assert!(land.iter().all(|&(x, z)| (9..=22).contains(&x) && (9..=22).contains(&z)));
        assert!(map.values().iter().all(|&v| v == 0.0 || v == 1.0));
    }

    #[test]
    fn test_dilate_then_erode_shrinks_land() {
        let config = OutlineConfig {
            threshold: 128,
            dilate_radius: 1,
            erode_radius: 1,
        };
        let map = land_from_outline(&square_outline(32, 8, 23), &config);

        let land = land_cells(&map);
        assert_eq!(land.len(), 10 * 10);
        assert!(land.iter().all(|&(x, z)| (11..=20).contains(&x) && (11..=20).contains(&z)));
    }

    #[test]
    fn test_dilation_closes_gaps() {
        let mut img = square_outline(32, 8, 23);
        img.put_pixel(8, 15, Luma([255]));

        let open = OutlineConfig {
            threshold: 128,
            dilate_radius: 0,
            erode_radius: 0,
        };
        assert_eq!(land_from_outline(&img, &open).land_fraction(), 0.0);

        let closed = OutlineConfig {
            dilate_radius: 1,
            ..open
        };
        assert!(land_from_outline(&img, &closed).land_fraction() > 0.0);
    }

    #[test]
    fn test_blank_image_has_no_land() {
        let img = GrayImage::from_pixel(16, 16, Luma([255]));
        let map = land_from_outline(&img, &OutlineConfig::default());
        assert_eq!(map.land_fraction(), 0.0);
    }

    #[test]
    fn test_window_any() {
        let values = [false, false, true, false, false, false];
        let hits = window_any(values.iter().copied(), values.len(), 1);
        assert_eq!(hits, vec![false, true, true, true, false, false]);
    }

    #[tokio::test]
    async fn test_outline_source_produces_requested_size() {
        let source = OutlineImageSource::new(OutlineConfig {
            threshold: 128,
            dilate_radius: 0,
            erode_radius: 0,
        });
        let map = source
            .extract_heightmap(ImageInput::Bytes(outline_png(32, 8, 23)), 32, 32)
            .await
            .expect("extraction");

        assert_eq!((map.width(), map.depth()), (32, 32));
        assert_eq!(land_cells(&map).len(), 14 * 14);
    }

    #[tokio::test]
    async fn test_grayscale_source_thresholds() {
        let map = GrayscaleImageSource::default()
            .extract_heightmap(ImageInput::Bytes(outline_png(16, 4, 11)), 16, 16)
            .await
            .expect("extraction");

        assert_eq!(map.get(0, 0), 1.0);
        assert_eq!(map.get(4, 4), 0.0);
    }

    #[tokio::test]
    async fn test_graded_source_keeps_luminance() {
        let map = GrayscaleImageSource::graded()
            .extract_heightmap(ImageInput::Bytes(outline_png(16, 4, 11)), 16, 16)
            .await
            .expect("extraction");

        assert_eq!(map.get(0, 0), 1.0);
        assert_eq!(map.get(4, 4), 0.0);
        assert!(map.values().iter().all(|&v| (0.0..=1.0).contains(&v)));
    }
}
