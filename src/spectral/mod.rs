// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-calnoise project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Spectral analysis module
//!
//! This module handles spectral characterization of signals via Welch's
//! averaged-periodogram method. The resulting [`PowerSpectrum`] drives the
//! FIR filter design and the diagnostic displays.

mod welch;

pub use welch::{PowerSpectrum, SpectralEstimator, WelchEstimator};
