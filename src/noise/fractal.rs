//! Multi-octave fractal noise used to sculpt the terrain surface.

use glam::Vec3;
use serde::{Deserialize, Serialize};
use simdnoise::NoiseBuilder;

/// Configuration for multi-octave fractal noise generation.
///
/// There is no base frequency: callers scale coordinates
/// themselves (see `TerrainConfig::noise_scale`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FractalNoiseConfig {
    /// Number of noise octaves.
    pub octaves: u8,
    /// Frequency multiplier per octave (typically 2.0).
    pub lacunarity: f32,
    /// Amplitude decay per octave (0.4-0.6 typical).
    pub persistence: f32,
    /// Random seed for reproducible generation.
    pub seed: i32,
}

impl Default for FractalNoiseConfig {
    fn default() -> Self {
        Self {
            octaves: 4,
            lacunarity: 2.0,
            persistence: 0.5,
            seed: 42,
        }
    }
}

impl FractalNoiseConfig {
    /// Creates a new noise configuration with the given seed.
    pub fn with_seed(seed: i32) -> Self {
        Self {
            seed,
            ..Default::default()
        }
    }

    /// Rougher surface with more fine detail.
    pub fn rugged(seed: i32) -> Self {
        Self {
            octaves: 6,
            lacunarity: 2.1,
            persistence: 0.55,
            seed,
        }
    }
}

/// Stateless sampler of fractal simplex noise.
///
/// Every call is a pure function of the position and the configuration, so a
/// `NoiseField` can be shared freely between rayon workers.
#[derive(Debug, Clone, PartialEq)]
pub struct NoiseField {
    config: FractalNoiseConfig,
}

impl NoiseField {
    pub fn new(config: FractalNoiseConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &FractalNoiseConfig {
        &self.config
    }

    /// Samples the noise at `pos`.
    ///
    /// # Returns
    /// A value in `[-1, 1]`, normalized by the amplitude sum.
    pub fn sample(&self, pos: Vec3) -> f32 {
        let mut total = 0.0f32;
        let mut amplitude = 1.0f32;
        let mut frequency = 1.0f32;
        let mut max_amplitude = 0.0f32;

        for octave in 0..self.config.octaves {
            total += simplex_at(pos * frequency, octave_seed(self.config.seed, octave)) * amplitude;
            max_amplitude += amplitude;
            amplitude *= self.config.persistence;
            frequency *= self.config.lacunarity;
        }

        normalize(total, max_amplitude)
    }

    /// Samples the noise for a batch of positions.
    ///
    /// Produces exactly the values `sample` would for each position.
    pub fn sample_batch(&self, positions: &[Vec3]) -> Vec<f32> {
        if positions.is_empty() {
            return Vec::new();
        }

        let mut results = vec![0.0f32; positions.len()];
        let mut amplitude = 1.0f32;
        let mut frequency = 1.0f32;
        let mut max_amplitude = 0.0f32;

        for octave in 0..self.config.octaves {
            let seed = octave_seed(self.config.seed, octave);
            for (result, pos) in results.iter_mut().zip(positions) {
                *result += simplex_at(*pos * frequency, seed) * amplitude;
            }

            max_amplitude += amplitude;
            amplitude *= self.config.persistence;
            frequency *= self.config.lacunarity;
        }

        for result in &mut results {
            *result = normalize(*result, max_amplitude);
        }

        results
    }
}

impl Default for NoiseField {
    fn default() -> Self {
        Self::new(FractalNoiseConfig::default())
    }
}

fn octave_seed(seed: i32, octave: u8) -> i32 {
    seed.wrapping_add(octave as i32 * 31337)
}

/// simdnoise's unscaled 3D simplex peaks near ±1/32.
const SIMPLEX_3D_SCALE: f32 = 32.0;

/// One simplex octave rescaled to `[-1, 1]`.
fn simplex_at(pos: Vec3, seed: i32) -> f32 {
    let raw = NoiseBuilder::fbm_3d_offset(pos.x, 1, pos.y, 1, pos.z, 1)
        .with_seed(seed)
        .with_freq(1.0)
        .with_octaves(1)
        .generate()
        .0[0];
    (raw * SIMPLEX_3D_SCALE).clamp(-1.0, 1.0)
}

fn normalize(total: f32, max_amplitude: f32) -> f32 {
    if max_amplitude <= 0.0 {
        return 0.0;
    }
    (total / max_amplitude).clamp(-1.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = FractalNoiseConfig::default();
        assert_eq!(config.octaves, 4);
        assert_eq!(config.lacunarity, 2.0);
        assert_eq!(config.persistence, 0.5);
    }

    #[test]
    fn test_noise_reproducibility() {
        let field = NoiseField::new(FractalNoiseConfig::with_seed(12345));
        let pos = Vec3::new(0.5, 0.3, 0.7);

        assert_eq!(field.sample(pos), field.sample(pos), "Same seed and position should produce same result");

        let other = NoiseField::new(FractalNoiseConfig::with_seed(12345));
        assert_eq!(field.sample(pos), other.sample(pos));
    }

    #[test]
    fn test_noise_range() {
        let field = NoiseField::new(FractalNoiseConfig::rugged(7));

        for i in 0..200 {
            let t = i as f32 * 0.173;
            let pos = Vec3::new(t, t * 0.5 - 3.0, 10.0 - t * 1.3);
            let value = field.sample(pos);
            assert!((-1.0..=1.0).contains(&value), "Noise value {} at {:?} out of range", value, pos);
        }
    }

    #[test]
    fn test_noise_uses_full_range() {
        let field = NoiseField::default();
        let mut lo = f32::MAX;
        let mut hi = f32::MIN;

        for z in 0..10 {
            for y in 0..20 {
                for x in 0..20 {
                    let value = field.sample(Vec3::new(x as f32 * 0.37, y as f32 * 0.53, z as f32 * 0.41));
                    lo = lo.min(value);
                    hi = hi.max(value);
                }
            }
        }

        assert!(lo < -0.5, "Noise minimum {} too close to zero", lo);
        assert!(hi > 0.5, "Noise maximum {} too close to zero", hi);
    }

    #[test]
    fn test_noise_is_continuous() {
        let field = NoiseField::default();
        let base = Vec3::new(2.0, 1.0, 3.0);
        let a = field.sample(base);
        let b = field.sample(base + Vec3::splat(1e-4));
        assert!((a - b).abs() < 1e-2, "Nearby samples at a lattice point should agree: {} vs {}", a, b);
    }

    #[test]
    fn test_different_seeds_produce_different_results() {
        let field1 = NoiseField::new(FractalNoiseConfig::with_seed(1));
        let field2 = NoiseField::new(FractalNoiseConfig::with_seed(2));

        let differs = (0..16).any(|i| {
            let pos = Vec3::new(0.37 * i as f32, 0.21, 0.73);
            field1.sample(pos) != field2.sample(pos)
        });
        assert!(differs, "Different seeds should produce different results");
    }

    #[test]
    fn test_batch_sampling() {
        let field = NoiseField::default();
        let positions = vec![
            Vec3::new(1.5, 0.0, 0.0),
            Vec3::new(0.0, 1.25, 0.0),
            Vec3::new(0.0, 0.0, 1.75),
        ];

        let batch_results = field.sample_batch(&positions);
        assert_eq!(batch_results.len(), positions.len());

        for (i, pos) in positions.iter().enumerate() {
            assert_eq!(batch_results[i], field.sample(*pos), "Batch result differs at index {}", i);
        }
    }

    #[test]
    fn test_empty_batch() {
        let field = NoiseField::default();
        assert!(field.sample_batch(&[]).is_empty());
    }

    #[test]
    fn test_zero_octaves_is_flat() {
        let field = NoiseField::new(FractalNoiseConfig {
            octaves: 0,
            ..Default::default()
        });
        assert_eq!(field.sample(Vec3::new(1.3, 2.7, 0.4)), 0.0);
    }
}
