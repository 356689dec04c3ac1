//! Terrain configuration parameters.

use glam::Vec3;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::noise::FractalNoiseConfig;

/// Reasons a configuration is rejected.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("Absolute height {declared} does not equal plateau height {plateau} + terrain height {terrain}")]
    AbsoluteHeightMismatch {
        declared: usize,
        plateau: usize,
        terrain: usize,
    },
    #[error("Dimension '{0}' must be positive")]
    NonPositiveDimension(&'static str),
    #[error("Iso threshold {0} must lie in [0, 1]")]
    IsoOutOfRange(f32),
    #[error("Noise scale {0} must be finite and positive")]
    InvalidNoiseScale(f32),
    #[error("World scale {0} must be finite and non-zero on every axis")]
    InvalidWorldScale(Vec3),
}

/// Immutable description of one terrain.
///
/// Units:
/// - `width`, `depth`, `plateau_height`, `terrain_height`: voxels
/// - `world_scale`: world units per voxel, per axis
///
/// The absolute height is always derived from the plateau and terrain heights;
/// see [`TerrainConfig::absolute_height`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TerrainConfig {
    // Horizontal extent
    pub width: usize,
    pub depth: usize,

    // Vertical layers
    pub plateau_height: usize,
    pub terrain_height: usize,

    // Sculpting
    pub noise_scale: f32,
    pub noise: FractalNoiseConfig,

    // Extraction threshold in [0, 1]
    pub iso: f32,

    // Mesh assembly
    pub world_scale: Vec3,
}

impl Default for TerrainConfig {
    fn default() -> Self {
        Self {
            width: 512,
            depth: 512,
            plateau_height: 10,
            terrain_height: 40,
            noise_scale: 0.01,
            noise: FractalNoiseConfig::default(),
            iso: 0.2,
            world_scale: Vec3::ONE,
        }
    }
}

impl TerrainConfig {
    /// Creates a configuration with the given grid extent and default sculpting.
    pub fn new(width: usize, depth: usize, plateau_height: usize, terrain_height: usize) -> Self {
        Self {
            width,
            depth,
            plateau_height,
            terrain_height,
            ..Default::default()
        }
    }

    pub fn with_iso(mut self, iso: f32) -> Self {
        self.iso = iso;
        self
    }

    pub fn with_noise_scale(mut self, noise_scale: f32) -> Self {
        self.noise_scale = noise_scale;
        self
    }

    pub fn with_seed(mut self, seed: i32) -> Self {
        self.noise.seed = seed;
        self
    }

    pub fn with_world_scale(mut self, world_scale: Vec3) -> Self {
        self.world_scale = world_scale;
        self
    }

    /// Total voxel height of the sculpted terrain: plateau plus terrain layer.
    pub fn absolute_height(&self) -> usize {
        self.plateau_height + self.terrain_height
    }

    /// Density grid shape as `[width, absolute_height + 1, depth]`.
    pub fn grid_shape(&self) -> [usize; 3] {
        [self.width, self.absolute_height() + 1, self.depth]
    }

    /// Number of voxels in the density grid.
    pub fn voxel_count(&self) -> usize {
        let [w, h, d] = self.grid_shape();
        w.saturating_mul(h).saturating_mul(d)
    }

    /// Linear decay of the sculpted layer: 1 at the plateau top, 0 at the
    /// terrain ceiling, negative above it.
    pub fn height_multiplier(&self, y: usize) -> f32 {
        1.0 - (y as f32 - self.plateau_height as f32) / self.terrain_height as f32
    }

    /// Translation that centres the terrain horizontally and sinks half of the
    /// plateau below the water plane.
    pub fn world_offset(&self) -> Vec3 {
        Vec3::new(
            -(self.width as f32 * self.world_scale.x) / 2.0,
            -(self.plateau_height as f32) / 2.0,
            -(self.depth as f32 * self.world_scale.z) / 2.0,
        )
    }

    /// Checks every invariant. Performs no allocation.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.width == 0 {
            return Err(ConfigError::NonPositiveDimension("width"));
        }
        if self.depth == 0 {
            return Err(ConfigError::NonPositiveDimension("depth"));
        }
        if self.terrain_height == 0 {
            return Err(ConfigError::NonPositiveDimension("terrain_height"));
        }
        if !(0.0..=1.0).contains(&self.iso) {
            return Err(ConfigError::IsoOutOfRange(self.iso));
        }
        if !self.noise_scale.is_finite() || self.noise_scale <= 0.0 {
            return Err(ConfigError::InvalidNoiseScale(self.noise_scale));
        }
        if !self.world_scale.is_finite() || self.world_scale.cmpeq(Vec3::ZERO).any() {
            return Err(ConfigError::InvalidWorldScale(self.world_scale));
        }
        Ok(())
    }
}

/// Externally supplied settings, e.g. from a JSON file.
///
/// Unlike [`TerrainConfig`] this may carry an explicit `absolute_height`,
/// which must agree with the layer heights when converted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TerrainSettings {
    pub width: usize,
    pub depth: usize,
    pub plateau_height: usize,
    pub terrain_height: usize,
    pub absolute_height: Option<usize>,
    pub noise_scale: f32,
    pub noise: FractalNoiseConfig,
    pub iso: f32,
    pub world_scale: Vec3,
}

impl Default for TerrainSettings {
    fn default() -> Self {
        TerrainConfig::default().into()
    }
}

impl From<TerrainConfig> for TerrainSettings {
    fn from(config: TerrainConfig) -> Self {
        Self {
            width: config.width,
            depth: config.depth,
            plateau_height: config.plateau_height,
            terrain_height: config.terrain_height,
            absolute_height: None,
            noise_scale: config.noise_scale,
            noise: config.noise,
            iso: config.iso,
            world_scale: config.world_scale,
        }
    }
}

impl TryFrom<TerrainSettings> for TerrainConfig {
    type Error = ConfigError;

    fn try_from(settings: TerrainSettings) -> Result<Self, Self::Error> {
        if let Some(declared) = settings.absolute_height {
            if declared != settings.plateau_height + settings.terrain_height {
                return Err(ConfigError::AbsoluteHeightMismatch {
                    declared,
                    plateau: settings.plateau_height,
                    terrain: settings.terrain_height,
                });
            }
        }

        let config = TerrainConfig {
            width: settings.width,
            depth: settings.depth,
            plateau_height: settings.plateau_height,
            terrain_height: settings.terrain_height,
            noise_scale: settings.noise_scale,
            noise: settings.noise,
            iso: settings.iso,
            world_scale: settings.world_scale,
        };
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = TerrainConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.absolute_height(), 50);
        assert_eq!(config.grid_shape(), [512, 51, 512]);
    }

    #[test]
    fn test_height_multiplier_endpoints() {
        let config = TerrainConfig::new(4, 4, 1, 1);
        assert_eq!(config.height_multiplier(1), 1.0);
        assert_eq!(config.height_multiplier(2), 0.0);
        assert!(config.height_multiplier(3) < 0.0);
    }

    #[test]
    fn test_rejects_zero_dimensions() {
        assert_eq!(
            TerrainConfig::new(0, 4, 1, 1).validate(),
            Err(ConfigError::NonPositiveDimension("width"))
        );
        assert_eq!(
            TerrainConfig::new(4, 0, 1, 1).validate(),
            Err(ConfigError::NonPositiveDimension("depth"))
        );
        assert_eq!(
            TerrainConfig::new(4, 4, 1, 0).validate(),
            Err(ConfigError::NonPositiveDimension("terrain_height"))
        );
    }

    #[test]
    fn test_plateau_may_be_empty() {
        assert!(TerrainConfig::new(4, 4, 0, 3).validate().is_ok());
    }

    #[test]
    fn test_rejects_iso_out_of_range() {
        let config = TerrainConfig::new(4, 4, 1, 1).with_iso(1.5);
        assert_eq!(config.validate(), Err(ConfigError::IsoOutOfRange(1.5)));

        let config = TerrainConfig::new(4, 4, 1, 1).with_iso(f32::NAN);
        assert!(matches!(config.validate(), Err(ConfigError::IsoOutOfRange(_))));
    }

    #[test]
    fn test_rejects_bad_scales() {
        let config = TerrainConfig::new(4, 4, 1, 1).with_noise_scale(0.0);
        assert!(matches!(config.validate(), Err(ConfigError::InvalidNoiseScale(_))));

        let config = TerrainConfig::new(4, 4, 1, 1).with_world_scale(Vec3::new(1.0, 0.0, 1.0));
        assert!(matches!(config.validate(), Err(ConfigError::InvalidWorldScale(_))));
    }

    #[test]
    fn test_settings_reject_mismatched_absolute_height() {
        let settings = TerrainSettings {
            plateau_height: 10,
            terrain_height: 20,
            absolute_height: Some(25),
            ..Default::default()
        };

        let result = TerrainConfig::try_from(settings);
        assert_eq!(
            result,
            Err(ConfigError::AbsoluteHeightMismatch {
                declared: 25,
                plateau: 10,
                terrain: 20,
            })
        );
    }

    #[test]
    fn test_settings_accept_matching_absolute_height() {
        let settings = TerrainSettings {
            plateau_height: 10,
            terrain_height: 20,
            absolute_height: Some(30),
            ..Default::default()
        };

        let config = TerrainConfig::try_from(settings).expect("settings should be valid");
        assert_eq!(config.absolute_height(), 30);
    }

    #[test]
    fn test_settings_from_json() {
        let json = r#"{ "width": 8, "depth": 6, "plateau_height": 2, "terrain_height": 4, "iso": 0.3 }"#;
        let settings: TerrainSettings = serde_json::from_str(json).expect("valid json");
        let config = TerrainConfig::try_from(settings).expect("valid settings");

        assert_eq!(config.grid_shape(), [8, 7, 6]);
        assert_eq!(config.iso, 0.3);
        assert_eq!(config.noise_scale, 0.01);
    }

    #[test]
    fn test_world_offset_centres_terrain() {
        let config = TerrainConfig::new(10, 20, 4, 4).with_world_scale(Vec3::new(2.0, 1.0, 0.5));
        assert_eq!(config.world_offset(), Vec3::new(-10.0, -2.0, -5.0));
    }
}
