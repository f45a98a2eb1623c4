// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-calnoise project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Processing module
//!
//! This module hosts the noise shaping orchestrator, which threads a
//! signal through the generate / design / apply / amplitude-correct
//! stages and returns the calibration noise with its diagnostic spectra.

mod shaper;

pub use shaper::{NoiseShaper, ShapingResult};
