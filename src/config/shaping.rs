// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-calnoise project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Noise shaping configuration
//!
//! This module defines the parameters that control the shaping pipeline:
//! noise duration, gate ramp, Welch segment length and the FIR design
//! tolerances. The defaults reproduce the calibration noise the tool has
//! always produced; they are exposed for the rare stimulus that needs a
//! different transition bandwidth or a shorter noise bed.

use serde::{Deserialize, Serialize};

/// Configuration for a noise shaping run.
///
/// # Example
///
/// ```
/// use rust_calnoise::config::ShapingConfig;
///
/// let config = ShapingConfig::default();
/// assert_eq!(config.noise_duration_s, 30.0);
/// assert_eq!(config.segment_length, 2048);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShapingConfig {
    /// Duration of the generated noise bed in seconds.
    #[serde(default = "default_noise_duration_s")]
    pub noise_duration_s: f64,

    /// Duration of one edge-gate ramp in seconds.
    #[serde(default = "default_ramp_duration_s")]
    pub ramp_duration_s: f64,

    /// Welch segment length in samples for PSD estimation.
    #[serde(default = "default_segment_length")]
    pub segment_length: usize,

    /// Passband ripple tolerance for the FIR length approximation.
    #[serde(default = "default_d1")]
    pub d1: f64,

    /// Stopband ripple tolerance for the FIR length approximation.
    #[serde(default = "default_d2")]
    pub d2: f64,

    /// FIR transition bandwidth in Hz.
    #[serde(default = "default_transition_bandwidth_hz")]
    pub transition_bandwidth_hz: f64,

    /// Generate correlated (seeded, reproducible) noise by default.
    #[serde(default = "default_correlated")]
    pub correlated: bool,
}

fn default_noise_duration_s() -> f64 {
    30.0 // Noise bed duration in seconds
}

fn default_ramp_duration_s() -> f64 {
    0.02 // 20 ms edge gate
}

fn default_segment_length() -> usize {
    2048 // Welch segment length
}

fn default_d1() -> f64 {
    1e-4 // Passband ripple
}

fn default_d2() -> f64 {
    1e-3 // Stopband ripple
}

fn default_transition_bandwidth_hz() -> f64 {
    1000.0 // Transition bandwidth in Hz
}

fn default_correlated() -> bool {
    true // Calibration noise should match across channels by default
}

impl Default for ShapingConfig {
    fn default() -> Self {
        Self {
            noise_duration_s: default_noise_duration_s(),
            ramp_duration_s: default_ramp_duration_s(),
            segment_length: default_segment_length(),
            d1: default_d1(),
            d2: default_d2(),
            transition_bandwidth_hz: default_transition_bandwidth_hz(),
            correlated: default_correlated(),
        }
    }
}
