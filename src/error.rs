// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-calnoise project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Typed errors for the noise shaping pipeline
//!
//! Every stage of the shaping pipeline reports failures through
//! [`ShapingError`]. The variants carry the offending values so that a
//! presentation layer can render an actionable message without re-deriving
//! anything from the signal.

use thiserror::Error;

/// Errors that can occur while shaping calibration noise
#[derive(Error, Debug)]
pub enum ShapingError {
    /// Empty or malformed signal, non-positive sample rate, or a power
    /// spectrum the filter designer cannot work with.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// An all-zero (or constant) signal that would cause a division by zero
    /// during normalization or RMS matching.
    #[error("Degenerate signal: {0}")]
    DegenerateSignal(String),

    /// The requested gate ramp does not fit the signal.
    #[error(
        "Gate ramp of {ramp_samples} samples exceeds half the signal length ({signal_len} samples)"
    )]
    GateTooLong {
        /// Length of one ramp in samples
        ramp_samples: usize,
        /// Total signal length in samples
        signal_len: usize,
    },

    /// The final calibration noise exceeds the ±1.0 full-scale range.
    ///
    /// This is terminal for the run: the buffer must not be written to a
    /// fixed-range audio format. It usually means the stimulus peaks too
    /// close to full scale for level matching to stay in range.
    #[error("Clipping detected: peak amplitude {peak} exceeds full scale (±1.0)")]
    ClippingDetected {
        /// Maximum absolute sample value of the rejected buffer
        peak: f64,
    },
}
