// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-calnoise project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Calibration noise generator library
//!
//! This library shapes white Gaussian noise so that its long-term spectral
//! content and RMS amplitude match a given reference stimulus, producing
//! masking/calibration noise for custom acoustic test stimuli.
//!
//! The pipeline lives in [`processing::NoiseShaper`]: it estimates the
//! stimulus power spectral density with Welch's method, designs a
//! linear-phase FIR filter from it, convolves the filter with a white
//! noise bed, gates the edges and matches the RMS level to the stimulus.
//! WAV import/export and the command line interface are thin collaborators
//! around that core.

pub mod audio;
pub mod config;
pub mod error;
pub mod preprocessing;
pub mod processing;
pub mod spectral;
pub mod utility;

pub use error::ShapingError;
pub use processing::{NoiseShaper, ShapingResult};
