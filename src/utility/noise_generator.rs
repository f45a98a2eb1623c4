// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-calnoise project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! # White Gaussian Noise Generator
//!
//! This module produces the white Gaussian noise buffers that the shaping
//! pipeline filters into calibration noise. It provides:
//!
//! 1. A small, explicit pseudo-random generator (XORShift state with a
//!    Box-Muller transform for the Gaussian draw)
//! 2. [`generate_white_noise`], the pipeline entry point that draws a
//!    fixed-duration buffer and normalizes it
//!
//! The generator is a plain value: seeding is per-instance, never a
//! process-wide effect. "Correlated" mode constructs the generator from
//! [`CORRELATED_NOISE_SEED`], so every call reproduces the identical
//! realization; uncorrelated mode seeds from ambient entropy.
//!
//! ## Examples
//!
//! ```
//! use rust_calnoise::utility::noise_generator::NoiseGenerator;
//!
//! // Deterministic noise from an explicit seed
//! let mut generator = NoiseGenerator::new(12345);
//! let samples = generator.generate_white(48000);
//! assert_eq!(samples.len(), 48000);
//!
//! // Same seed, same realization
//! let again = NoiseGenerator::new(12345).generate_white(48000);
//! assert_eq!(samples, again);
//! ```

use log::debug;

use crate::error::ShapingError;
use crate::preprocessing::signal_ops;

/// Seed used for "correlated" calibration noise.
///
/// Every shaping run in correlated mode draws from this seed so that all
/// channels (and repeated runs) share the exact same noise realization.
pub const CORRELATED_NOISE_SEED: u32 = 4;

/// Random number generator using the XORShift algorithm.
///
/// Fast and lightweight, suitable for noise synthesis but not for
/// cryptographic purposes. The generator holds its state as a plain value,
/// so determinism is controlled entirely by the seed passed at
/// construction.
pub struct NoiseGenerator {
    /// Internal XORShift state; evolves with each draw.
    rng_state: u32,
}

impl NoiseGenerator {
    /// Creates a generator with the given seed.
    ///
    /// The same seed always produces the same sequence. A zero seed is
    /// remapped to 1, since the all-zero XORShift state never leaves zero.
    pub fn new(seed: u32) -> Self {
        let rng_state = if seed == 0 { 1 } else { seed };
        Self { rng_state }
    }

    /// Creates a generator seeded from ambient entropy.
    ///
    /// Used for uncorrelated mode, where repeated runs should produce
    /// different noise realizations.
    pub fn from_entropy() -> Self {
        Self::new(rand::random::<u32>())
    }

    /// Generates a uniform random value in the range [-1.0, 1.0].
    pub fn random_float(&mut self) -> f64 {
        // XOR Shift algorithm for pseudo-random numbers
        self.rng_state ^= self.rng_state << 13;
        self.rng_state ^= self.rng_state >> 17;
        self.rng_state ^= self.rng_state << 5;

        (self.rng_state as f64 / u32::MAX as f64) * 2.0 - 1.0
    }

    /// Generates a draw from a standard Gaussian distribution.
    ///
    /// Uses the Box-Muller transform:
    /// `z = sqrt(-2 * ln(u1)) * cos(2 * pi * u2)` with `u1`, `u2` uniform
    /// in (0, 1).
    pub fn random_gaussian(&mut self) -> f64 {
        let u1 = (self.random_float() + 1.0) / 2.0;
        let u2 = (self.random_float() + 1.0) / 2.0;

        // Avoid ln(0)
        let u1 = u1.max(1e-12);

        (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos()
    }

    /// Draws `num_samples` independent standard-normal samples.
    pub fn generate_white(&mut self, num_samples: usize) -> Vec<f64> {
        (0..num_samples).map(|_| self.random_gaussian()).collect()
    }
}

/// Generate a normalized white Gaussian noise buffer.
///
/// Draws `sample_rate * duration_s` standard-normal samples, then removes
/// the DC offset and scales to a ±1.0 peak. With `correlated == true` the
/// draw is seeded with [`CORRELATED_NOISE_SEED`], so repeated calls return
/// bit-identical buffers; otherwise the seed comes from ambient entropy.
///
/// ### Arguments
///
/// * `sample_rate` - Sampling rate in samples/second, must be positive
/// * `duration_s` - Buffer duration in seconds, must be positive
/// * `correlated` - Reuse the fixed seed for reproducible noise
///
/// ### Errors
///
/// [`ShapingError::InvalidInput`] for a non-positive sample rate or
/// duration.
pub fn generate_white_noise(
    sample_rate: f64,
    duration_s: f64,
    correlated: bool,
) -> Result<Vec<f64>, ShapingError> {
    if sample_rate <= 0.0 {
        return Err(ShapingError::InvalidInput(format!(
            "sample rate must be positive, got {sample_rate}"
        )));
    }
    if duration_s <= 0.0 {
        return Err(ShapingError::InvalidInput(format!(
            "noise duration must be positive, got {duration_s}"
        )));
    }
    let num_samples = (sample_rate * duration_s) as usize;
    if num_samples == 0 {
        return Err(ShapingError::InvalidInput(format!(
            "noise duration {duration_s} s at {sample_rate} Hz yields an empty buffer"
        )));
    }

    let mut generator = if correlated {
        debug!("noise: using correlated noise (seed {CORRELATED_NOISE_SEED})");
        NoiseGenerator::new(CORRELATED_NOISE_SEED)
    } else {
        debug!("noise: using uncorrelated noise");
        NoiseGenerator::from_entropy()
    };

    let noise = generator.generate_white(num_samples);
    signal_ops::normalize(&noise)
}
