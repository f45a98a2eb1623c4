// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-calnoise project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Signal preprocessing module
//!
//! This module holds the stateless signal helpers (RMS, normalization,
//! gating, dB conversion) and the FIR filter machinery used to imprint a
//! stimulus spectrum onto white noise.

pub mod fir;
pub mod signal_ops;

pub use fir::{tap_count, FirFilter};
