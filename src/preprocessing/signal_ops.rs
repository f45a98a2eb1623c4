// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-calnoise project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Stateless numeric helpers for audio buffers
//!
//! These are the building blocks the shaping pipeline is made of: RMS
//! measurement, DC removal and peak normalization, raised-cosine edge
//! gating, and dB/magnitude conversions. All helpers operate on `f64`
//! sample buffers and return new buffers; none of them mutates its input.

use crate::error::ShapingError;

/// Calculate the root mean square of a signal.
///
/// Samples are squared in `f64`, so integer-typed sources must be converted
/// to float by the caller before measuring (squaring in a narrow integer
/// type overflows).
///
/// ### Arguments
///
/// * `signal` - Input samples; must be non-empty
///
/// ### Returns
///
/// The RMS value, always `>= 0`.
///
/// ### Examples
///
/// ```
/// use rust_calnoise::preprocessing::signal_ops::rms;
///
/// let level = rms(&[1.0, -1.0, 1.0, -1.0]).unwrap();
/// assert!((level - 1.0).abs() < 1e-12);
/// ```
pub fn rms(signal: &[f64]) -> Result<f64, ShapingError> {
    if signal.is_empty() {
        return Err(ShapingError::InvalidInput(
            "cannot compute RMS of an empty signal".into(),
        ));
    }
    let mean_square = signal.iter().map(|&x| x * x).sum::<f64>() / signal.len() as f64;
    Ok(mean_square.sqrt())
}

/// Remove the DC offset and scale the signal to a peak of ±1.0.
///
/// The mean is subtracted first, then every sample is divided by the
/// maximum absolute value of the mean-free signal.
///
/// ### Errors
///
/// Returns [`ShapingError::DegenerateSignal`] when the signal is constant
/// (all samples equal), since the peak after mean removal is zero and the
/// division is undefined.
pub fn normalize(signal: &[f64]) -> Result<Vec<f64>, ShapingError> {
    if signal.is_empty() {
        return Err(ShapingError::InvalidInput(
            "cannot normalize an empty signal".into(),
        ));
    }
    let mean = signal.iter().sum::<f64>() / signal.len() as f64;
    let centered: Vec<f64> = signal.iter().map(|&x| x - mean).collect();
    let peak = peak_abs(&centered);
    if peak == 0.0 {
        return Err(ShapingError::DegenerateSignal(format!(
            "signal is constant (every sample equals {mean}); nothing to normalize"
        )));
    }
    Ok(centered.into_iter().map(|x| x / peak).collect())
}

/// Scale the signal by its own maximum absolute value, without removing DC.
///
/// Used after convolution, where the filter output must keep its shape but
/// be brought back into ±1.0 before gating.
pub fn peak_normalize(signal: &[f64]) -> Result<Vec<f64>, ShapingError> {
    if signal.is_empty() {
        return Err(ShapingError::InvalidInput(
            "cannot normalize an empty signal".into(),
        ));
    }
    let peak = peak_abs(signal);
    if peak == 0.0 {
        return Err(ShapingError::DegenerateSignal(
            "signal is identically zero; nothing to normalize".into(),
        ));
    }
    Ok(signal.iter().map(|&x| x / peak).collect())
}

/// Maximum absolute sample value of a buffer (0.0 for an empty buffer).
pub fn peak_abs(signal: &[f64]) -> f64 {
    signal.iter().fold(0.0, |acc: f64, &x| acc.max(x.abs()))
}

/// Apply rising and falling raised-cosine ramps to a mono signal.
///
/// The first `ramp_duration_s` seconds fade in with a half-Hann ramp, the
/// last `ramp_duration_s` seconds fade out with the mirrored ramp, and the
/// sustain portion in between is left at unity gain.
///
/// ### Arguments
///
/// * `signal` - Input samples
/// * `ramp_duration_s` - Duration of one ramp in seconds
/// * `sample_rate` - Sampling rate in samples/second
///
/// ### Errors
///
/// Returns [`ShapingError::GateTooLong`] when the two ramps together would
/// be longer than the signal, i.e. there is no room for a sustain segment.
/// The caller must shorten the ramp; the gate never clamps silently.
pub fn gate(
    signal: &[f64],
    ramp_duration_s: f64,
    sample_rate: f64,
) -> Result<Vec<f64>, ShapingError> {
    let envelope = gate_envelope(signal.len(), ramp_duration_s, sample_rate)?;
    Ok(signal
        .iter()
        .zip(envelope.iter())
        .map(|(&x, &e)| x * e)
        .collect())
}

/// Apply the same raised-cosine gate to both channels of a stereo signal.
///
/// The envelope is built once from the channel length and applied
/// independently to each channel. Both channels must have the same length.
pub fn gate_stereo(
    left: &[f64],
    right: &[f64],
    ramp_duration_s: f64,
    sample_rate: f64,
) -> Result<(Vec<f64>, Vec<f64>), ShapingError> {
    if left.len() != right.len() {
        return Err(ShapingError::InvalidInput(format!(
            "stereo channels differ in length ({} vs {})",
            left.len(),
            right.len()
        )));
    }
    let envelope = gate_envelope(left.len(), ramp_duration_s, sample_rate)?;
    let gated_left = left
        .iter()
        .zip(envelope.iter())
        .map(|(&x, &e)| x * e)
        .collect();
    let gated_right = right
        .iter()
        .zip(envelope.iter())
        .map(|(&x, &e)| x * e)
        .collect();
    Ok((gated_left, gated_right))
}

/// Build the full gate envelope: ramp up, sustain at 1.0, ramp down.
fn gate_envelope(
    signal_len: usize,
    ramp_duration_s: f64,
    sample_rate: f64,
) -> Result<Vec<f64>, ShapingError> {
    if sample_rate <= 0.0 {
        return Err(ShapingError::InvalidInput(format!(
            "sample rate must be positive, got {sample_rate}"
        )));
    }
    if ramp_duration_s < 0.0 {
        return Err(ShapingError::InvalidInput(format!(
            "ramp duration must not be negative, got {ramp_duration_s}"
        )));
    }
    let ramp_samples = (sample_rate * ramp_duration_s) as usize;
    if 2 * ramp_samples > signal_len {
        return Err(ShapingError::GateTooLong {
            ramp_samples,
            signal_len,
        });
    }

    let ramp = raised_cosine_ramp(ramp_samples);
    let mut envelope = Vec::with_capacity(signal_len);
    envelope.extend_from_slice(&ramp);
    envelope.resize(signal_len - ramp_samples, 1.0);
    envelope.extend(ramp.iter().rev());
    Ok(envelope)
}

/// Rising half of a raised-cosine ("Hann-like") window.
///
/// Evaluates `(cos(x) + 1) / 2` over `len` points spaced evenly from pi to
/// 2*pi, endpoints included, running from 0.0 up to 1.0.
fn raised_cosine_ramp(len: usize) -> Vec<f64> {
    match len {
        0 => Vec::new(),
        // A single-point ramp degenerates to cos(pi), i.e. one zero sample.
        1 => vec![0.0],
        _ => {
            let step = std::f64::consts::PI / (len - 1) as f64;
            (0..len)
                .map(|i| {
                    let x = std::f64::consts::PI + i as f64 * step;
                    (x.cos() + 1.0) / 2.0
                })
                .collect()
        }
    }
}

/// Convert a decibel value to linear magnitude.
pub fn db_to_magnitude(db: f64) -> f64 {
    10f64.powf(db / 20.0)
}

/// Convert a linear magnitude to decibels.
pub fn magnitude_to_db(magnitude: f64) -> f64 {
    20.0 * magnitude.log10()
}

/// Elementwise [`db_to_magnitude`] over a slice.
pub fn db_to_magnitude_slice(db: &[f64]) -> Vec<f64> {
    db.iter().map(|&x| db_to_magnitude(x)).collect()
}

/// Elementwise [`magnitude_to_db`] over a slice.
pub fn magnitude_to_db_slice(magnitude: &[f64]) -> Vec<f64> {
    magnitude.iter().map(|&x| magnitude_to_db(x)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::{assert_abs_diff_eq, assert_relative_eq};

    #[test]
    fn test_rms_of_known_signal() {
        let signal = vec![3.0, -3.0, 3.0, -3.0];
        assert_relative_eq!(rms(&signal).unwrap(), 3.0, max_relative = 1e-12);
    }

    #[test]
    fn test_rms_scales_linearly() {
        let signal: Vec<f64> = (0..480).map(|i| (i as f64 * 0.13).sin()).collect();
        let scaled: Vec<f64> = signal.iter().map(|&x| x * -2.5).collect();
        let base = rms(&signal).unwrap();
        assert!(base >= 0.0);
        assert_relative_eq!(rms(&scaled).unwrap(), 2.5 * base, max_relative = 1e-12);
    }

    #[test]
    fn test_rms_empty_signal_errors() {
        assert!(matches!(rms(&[]), Err(ShapingError::InvalidInput(_))));
    }

    #[test]
    fn test_normalize_removes_dc_and_scales_to_unit_peak() {
        let signal: Vec<f64> = (0..1000)
            .map(|i| 0.25 * (i as f64 * 0.01).sin() + 3.0)
            .collect();
        let normalized = normalize(&signal).unwrap();
        let mean = normalized.iter().sum::<f64>() / normalized.len() as f64;
        assert_abs_diff_eq!(mean, 0.0, epsilon = 1e-9);
        assert_relative_eq!(peak_abs(&normalized), 1.0, max_relative = 1e-12);
    }

    #[test]
    fn test_normalize_constant_signal_errors() {
        let signal = vec![0.7; 128];
        assert!(matches!(
            normalize(&signal),
            Err(ShapingError::DegenerateSignal(_))
        ));
    }

    #[test]
    fn test_peak_normalize_keeps_dc() {
        let signal = vec![0.5, 0.5, -0.25, 0.5];
        let normalized = peak_normalize(&signal).unwrap();
        assert_relative_eq!(normalized[0], 1.0, max_relative = 1e-12);
        assert_relative_eq!(normalized[2], -0.5, max_relative = 1e-12);
    }

    #[test]
    fn test_gate_preserves_sustain_and_zeroes_edges() {
        let sample_rate = 1000.0;
        let signal = vec![1.0; 1000];
        let gated = gate(&signal, 0.1, sample_rate).unwrap();
        assert_eq!(gated.len(), signal.len());
        // Ramps are 100 samples each; edges driven to 0, middle untouched.
        assert_abs_diff_eq!(gated[0], 0.0, epsilon = 1e-12);
        assert_abs_diff_eq!(gated[999], 0.0, epsilon = 1e-12);
        for &x in &gated[100..900] {
            assert_relative_eq!(x, 1.0, max_relative = 1e-12);
        }
        // The ramp is monotone on the way up.
        assert!(gated[10] < gated[50]);
        assert!(gated[50] < gated[99]);
    }

    #[test]
    fn test_gate_too_long_errors() {
        let signal = vec![1.0; 100];
        let result = gate(&signal, 0.2, 1000.0);
        assert!(matches!(
            result,
            Err(ShapingError::GateTooLong {
                ramp_samples: 200,
                signal_len: 100,
            })
        ));
    }

    #[test]
    fn test_gate_stereo_applies_identical_envelope() {
        let left = vec![1.0; 500];
        let right = vec![-2.0; 500];
        let (gl, gr) = gate_stereo(&left, &right, 0.05, 1000.0).unwrap();
        for (l, r) in gl.iter().zip(gr.iter()) {
            assert_relative_eq!(*r, -2.0 * l, max_relative = 1e-12);
        }
    }

    #[test]
    fn test_db_magnitude_round_trip() {
        assert_relative_eq!(db_to_magnitude(20.0), 10.0, max_relative = 1e-12);
        assert_relative_eq!(magnitude_to_db(10.0), 20.0, max_relative = 1e-12);
        let values = vec![-20.0, 0.0, 6.0];
        let mags = db_to_magnitude_slice(&values);
        let back = magnitude_to_db_slice(&mags);
        for (a, b) in values.iter().zip(back.iter()) {
            assert_abs_diff_eq!(*a, *b, epsilon = 1e-9);
        }
    }
}
