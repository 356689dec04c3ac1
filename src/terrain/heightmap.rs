//! Heightmap: the 2D land/water classification the terrain is grown from.

use serde::{Deserialize, Serialize};

use crate::error::TerrainError;

/// A `width × depth` grid of land values in `[0, 1]`.
///
/// Values are stored in row-major order with x varying fastest:
/// `index = z * width + x`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "HeightmapData")]
pub struct Heightmap {
    width: usize,
    depth: usize,
    values: Vec<f32>,
}

/// Unchecked serialized form, validated through [`Heightmap::from_values`].
#[derive(Deserialize)]
struct HeightmapData {
    width: usize,
    depth: usize,
    values: Vec<f32>,
}

impl TryFrom<HeightmapData> for Heightmap {
    type Error = TerrainError;

    fn try_from(data: HeightmapData) -> Result<Self, Self::Error> {
        Heightmap::from_values(data.width, data.depth, data.values)
    }
}

/// Clamps to `[0, 1]` and maps NaN to water.
fn sanitize(value: f32) -> f32 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

impl Heightmap {
    /// Creates an all-water heightmap.
    pub fn new(width: usize, depth: usize) -> Self {
        Self::filled(width, depth, 0.0)
    }

    /// Creates a heightmap with every cell set to `value` (clamped to `[0, 1]`).
    pub fn filled(width: usize, depth: usize, value: f32) -> Self {
        Self {
            width,
            depth,
            values: vec![sanitize(value); width * depth],
        }
    }

    /// Builds a heightmap from a flat value buffer.
    ///
    /// # Errors
    /// `ShapeMismatch` if the buffer length differs from `width * depth`,
    /// `InvalidHeightmap` for NaN or out-of-range values.
    pub fn from_values(width: usize, depth: usize, values: Vec<f32>) -> Result<Self, TerrainError> {
        if values.len() != width * depth {
            return Err(TerrainError::ShapeMismatch {
                artifact: "heightmap",
                expected: [width, 1, depth],
                actual: [values.len(), 1, 1],
            });
        }

        if let Some(i) = values.iter().position(|v| !(0.0..=1.0).contains(v)) {
            return Err(TerrainError::InvalidHeightmap {
                x: i % width,
                z: i / width,
                value: values[i],
            });
        }

        Ok(Self { width, depth, values })
    }

    /// Builds a binary heightmap from a land mask (`true` = land).
    pub fn from_mask(width: usize, depth: usize, mask: &[bool]) -> Result<Self, TerrainError> {
        Self::from_values(width, depth, mask.iter().map(|&land| if land { 1.0 } else { 0.0 }).collect())
    }

    /// Builds a heightmap by evaluating `f(x, z)` for every cell. Results
    /// are clamped to `[0, 1]`; NaN becomes water.
    pub fn from_fn(width: usize, depth: usize, mut f: impl FnMut(usize, usize) -> f32) -> Self {
        let values = (0..width * depth)
            .map(|i| sanitize(f(i % width, i / width)))
            .collect();
        Self { width, depth, values }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn values(&self) -> &[f32] {
        &self.values
    }

    /// Flat index of cell `(x, z)`.
    #[inline]
    pub fn index(&self, x: usize, z: usize) -> usize {
        debug_assert!(x < self.width && z < self.depth);
        z * self.width + x
    }

    /// Returns the value at `(x, z)`.
    ///
    /// # Panics
    /// Panics if `x` or `z` is out of bounds.
    #[inline]
    pub fn get(&self, x: usize, z: usize) -> f32 {
        self.values[self.index(x, z)]
    }

    /// Sets the value at `(x, z)`, clamped to `[0, 1]`. NaN becomes water.
    ///
    /// # Panics
    /// Panics if `x` or `z` is out of bounds.
    pub fn set(&mut self, x: usize, z: usize, value: f32) {
        let idx = self.index(x, z);
        self.values[idx] = sanitize(value);
    }

    /// True when the cell is at least half land.
    pub fn is_land(&self, x: usize, z: usize) -> bool {
        self.get(x, z) >= 0.5
    }

    /// Fraction of cells classified as land.
    pub fn land_fraction(&self) -> f32 {
        if self.values.is_empty() {
            return 0.0;
        }
        let land = self.values.iter().filter(|&&v| v >= 0.5).count();
        land as f32 / self.values.len() as f32
    }

    /// Returns an iterator over all `(x, z)` cell coordinates in storage order.
    pub fn cell_coords(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        let width = self.width;
        (0..self.depth).flat_map(move |z| (0..width).map(move |x| (x, z)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_is_all_water() {
        let map = Heightmap::new(8, 4);
        assert_eq!(map.values().len(), 32);
        assert!(map.values().iter().all(|&v| v == 0.0));
        assert_eq!(map.land_fraction(), 0.0);
    }

    #[test]
    fn test_get_set() {
        let mut map = Heightmap::new(5, 3);
        map.set(4, 2, 1.0);
        assert_eq!(map.get(4, 2), 1.0);
        assert_eq!(map.values()[2 * 5 + 4], 1.0);
        assert!(map.is_land(4, 2));

        map.set(0, 0, 3.0);
        assert_eq!(map.get(0, 0), 1.0);
        map.set(1, 0, f32::NAN);
        assert_eq!(map.get(1, 0), 0.0);
    }

    #[test]
    fn test_from_values_rejects_wrong_length() {
        let result = Heightmap::from_values(4, 4, vec![0.0; 15]);
        assert!(matches!(result, Err(TerrainError::ShapeMismatch { .. })));
    }

    #[test]
    fn test_from_values_rejects_invalid_values() {
        let mut values = vec![0.0; 9];
        values[5] = -0.25;
        match Heightmap::from_values(3, 3, values) {
            Err(TerrainError::InvalidHeightmap { x, z, value }) => {
                assert_eq!((x, z), (2, 1));
                assert_eq!(value, -0.25);
            }
            other => panic!("expected InvalidHeightmap, got {:?}", other),
        }

        let mut values = vec![0.0; 9];
        values[0] = f32::NAN;
        assert!(matches!(
            Heightmap::from_values(3, 3, values),
            Err(TerrainError::InvalidHeightmap { .. })
        ));
    }

    #[test]
    fn test_from_mask_and_land_fraction() {
        let mask = [true, false, true, true];
        let map = Heightmap::from_mask(2, 2, &mask).expect("valid mask");
        assert_eq!(map.get(1, 0), 0.0);
        assert_eq!(map.get(0, 1), 1.0);
        assert_eq!(map.land_fraction(), 0.75);
    }

    #[test]
    fn test_from_fn_uses_x_fastest_order() {
        let map = Heightmap::from_fn(3, 2, |x, z| if x == 2 && z == 0 { 1.0 } else { 0.0 });
        assert_eq!(map.values()[2], 1.0);
        assert_eq!(map.get(2, 0), 1.0);
    }

    #[test]
    fn test_from_fn_maps_nan_to_water() {
        let map = Heightmap::from_fn(4, 4, |x, _| if x == 0 { f32::NAN } else { 2.0 });
        assert_eq!(map.get(0, 0), 0.0);
        assert_eq!(map.get(1, 3), 1.0);
        assert!(map.values().iter().all(|v| (0.0..=1.0).contains(v)));

        assert_eq!(Heightmap::filled(2, 2, f32::NAN).get(1, 1), 0.0);
    }

    #[test]
    fn test_deserialize_validates_values() {
        let map: Heightmap = serde_json::from_str(r#"{"width":2,"depth":1,"values":[0.0,1.0]}"#).expect("valid heightmap");
        assert_eq!(map.get(1, 0), 1.0);

        let out_of_range = serde_json::from_str::<Heightmap>(r#"{"width":2,"depth":1,"values":[0.0,1.5]}"#);
        assert!(out_of_range.is_err());

        let wrong_length = serde_json::from_str::<Heightmap>(r#"{"width":2,"depth":2,"values":[0.0,1.0]}"#);
        assert!(wrong_length.is_err());
    }

    #[test]
    fn test_cell_coords_iterator() {
        let map = Heightmap::new(4, 2);
        let coords: Vec<_> = map.cell_coords().collect();

        assert_eq!(coords.len(), 8);
        assert_eq!(coords[0], (0, 0));
        assert_eq!(coords[1], (1, 0));
        assert_eq!(coords[4], (0, 1));
        assert_eq!(coords[7], (3, 1));
    }
}
