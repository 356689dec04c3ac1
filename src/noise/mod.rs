//! Noise generation module for terrain sculpting.
//!
//! Uses simdnoise for SIMD-accelerated simplex noise.

mod fractal;

pub use fractal::{FractalNoiseConfig, NoiseField};
