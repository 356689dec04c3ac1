//! Density field generation: heightmap + noise → 3D voxel grid.

use std::time::Instant;

use glam::Vec3;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::config::TerrainConfig;
use super::heightmap::Heightmap;
use crate::error::TerrainError;
use crate::noise::NoiseField;
use crate::pipeline::CancelToken;

/// A 3D grid of matter density in `[0, 1]`.
///
/// Values are stored with x varying fastest, then y, then z:
/// `index = (z * height + y) * width + x`. Each z-slab is therefore one
/// contiguous chunk of `width * height` values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "DensityFieldData")]
pub struct DensityField {
    width: usize,
    height: usize,
    depth: usize,
    values: Vec<f32>,
}

#[derive(Deserialize)]
struct DensityFieldData {
    width: usize,
    height: usize,
    depth: usize,
    values: Vec<f32>,
}

impl TryFrom<DensityFieldData> for DensityField {
    type Error = TerrainError;

    fn try_from(data: DensityFieldData) -> Result<Self, Self::Error> {
        DensityField::from_values(data.width, data.height, data.depth, data.values)
    }
}

fn sanitize(value: f32) -> f32 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

impl DensityField {
    /// Creates an empty (all-zero) field.
    pub fn new(width: usize, height: usize, depth: usize) -> Self {
        Self::filled(width, height, depth, 0.0)
    }

    pub fn filled(width: usize, height: usize, depth: usize, value: f32) -> Self {
        Self {
            width,
            height,
            depth,
            values: vec![sanitize(value); width * height * depth],
        }
    }

    /// Builds a field from a flat buffer in storage order.
    ///
    /// # Errors
    /// `ShapeMismatch` if the buffer length does not match the dimensions,
    /// `InvalidDensity` for NaN or out-of-range values.
    pub fn from_values(width: usize, height: usize, depth: usize, values: Vec<f32>) -> Result<Self, TerrainError> {
        if values.len() != width * height * depth {
            return Err(TerrainError::ShapeMismatch {
                artifact: "density field",
                expected: [width, height, depth],
                actual: [values.len(), 1, 1],
            });
        }

        if let Some(i) = values.iter().position(|v| !(0.0..=1.0).contains(v)) {
            return Err(TerrainError::InvalidDensity {
                x: i % width,
                y: (i / width) % height,
                z: i / (width * height),
                value: values[i],
            });
        }
        Ok(Self {
            width,
            height,
            depth,
            values,
        })
    }

    /// Builds a field by evaluating `f(x, y, z)` for every voxel.
    pub fn from_fn(width: usize, height: usize, depth: usize, mut f: impl FnMut(usize, usize, usize) -> f32) -> Self {
        let mut field = Self::new(width, height, depth);
        for z in 0..depth {
            for y in 0..height {
                for x in 0..width {
                    field.set(x, y, z, f(x, y, z));
                }
            }
        }
        field
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Dimensions as `[width, height, depth]`.
    pub fn shape(&self) -> [usize; 3] {
        [self.width, self.height, self.depth]
    }

    pub fn values(&self) -> &[f32] {
        &self.values
    }

    #[inline]
    pub fn index(&self, x: usize, y: usize, z: usize) -> usize {
        debug_assert!(x < self.width && y < self.height && z < self.depth);
        (z * self.height + y) * self.width + x
    }

    /// Returns the density at `(x, y, z)`.
    ///
    /// # Panics
    /// Panics if the coordinate is out of bounds.
    #[inline]
    pub fn get(&self, x: usize, y: usize, z: usize) -> f32 {
        self.values[self.index(x, y, z)]
    }

    /// Sets the density at `(x, y, z)`, clamped to `[0, 1]`. NaN becomes empty.
    pub fn set(&mut self, x: usize, y: usize, z: usize, value: f32) {
        let idx = self.index(x, y, z);
        self.values[idx] = sanitize(value);
    }

    /// Density values of the vertical column at `(x, z)`, bottom to top.
    pub fn column(&self, x: usize, z: usize) -> Vec<f32> {
        (0..self.height).map(|y| self.get(x, y, z)).collect()
    }

    /// Returns (min, max) density across the field.
    pub fn value_range(&self) -> (f32, f32) {
        self.values
            .iter()
            .fold((f32::MAX, f32::MIN), |(lo, hi), &v| (lo.min(v), hi.max(v)))
    }

    /// Number of voxels at or above `iso`.
    pub fn solid_count(&self, iso: f32) -> usize {
        self.values.iter().filter(|&&v| v >= iso).count()
    }
}

/// Builds the density field for `heightmap` under `config`.
///
/// Below the plateau top the density copies the heightmap. Above it, noise is
/// masked by the heightmap and biased by a height term that decays linearly
/// to -1 at the terrain ceiling, so the surface thins out with elevation.
/// The top row is always empty so the extracted surface closes over the
/// terrain.
///
/// Slabs along z are generated in parallel; the result does not depend on
/// how rayon partitions them.
///
/// # Errors
/// `Configuration` for an invalid config (checked before allocating),
/// `ShapeMismatch` if the heightmap size differs from the config,
/// `Cancelled` if `cancel` fires mid-build.
pub fn build_density_field(
    heightmap: &Heightmap,
    config: &TerrainConfig,
    cancel: &CancelToken,
) -> Result<DensityField, TerrainError> {
    config.validate()?;

    if heightmap.width() != config.width || heightmap.depth() != config.depth {
        return Err(TerrainError::ShapeMismatch {
            artifact: "heightmap",
            expected: [config.width, 1, config.depth],
            actual: [heightmap.width(), 1, heightmap.depth()],
        });
    }

    let start = Instant::now();
    let [width, height, depth] = config.grid_shape();
    let noise = NoiseField::new(config.noise.clone());
    let mut field = DensityField::new(width, height, depth);

    field
        .values
        .par_chunks_mut(width * height)
        .enumerate()
        .try_for_each(|(z, slab)| {
            cancel.check()?;
            fill_slab(slab, z, heightmap, config, &noise);
            Ok::<(), TerrainError>(())
        })?;

    debug!(
        width,
        height,
        depth,
        elapsed = ?start.elapsed(),
        "Built density field"
    );

    Ok(field)
}

/// Density of a single voxel in the sculpted region.
pub fn sculpted_density(mask: f32, noise_val: f32, height_multiplier: f32) -> f32 {
    (mask * (noise_val + (height_multiplier * 2.0 - 1.0))).clamp(0.0, 1.0)
}

fn fill_slab(slab: &mut [f32], z: usize, heightmap: &Heightmap, config: &TerrainConfig, noise: &NoiseField) {
    let width = config.width;
    let top = config.absolute_height();

    for (i, density) in slab.iter_mut().enumerate() {
        let x = i % width;
        let y = i / width;
        let mask = heightmap.get(x, z);

        *density = if y < config.plateau_height {
            mask
        } else if y == top || mask == 0.0 {
            0.0
        } else {
            let pos = Vec3::new(x as f32, y as f32, z as f32) * config.noise_scale;
            sculpted_density(mask, noise.sample(pos), config.height_multiplier(y))
        };
    }
}
