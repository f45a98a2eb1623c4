// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-calnoise project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Welch power spectral density estimation
//!
//! This module estimates the long-term spectral shape of a signal with
//! Welch's averaged-periodogram method:
//!
//! 1. Slice the signal into segments of a fixed length with 50% overlap
//! 2. Remove each segment's mean and taper it with a Hann window
//! 3. Compute the one-sided power spectrum of each segment with a real FFT
//! 4. Average the per-segment spectra
//!
//! The estimator serves two roles in the shaping pipeline: it characterizes
//! the stimulus (the filter design target) and it verifies the shaped
//! noise for side-by-side display against the stimulus spectrum.
//!
//! # Example
//!
//! ```
//! use rust_calnoise::spectral::{SpectralEstimator, WelchEstimator};
//!
//! // A 200 Hz sine at a 1 kHz sample rate
//! let sample_rate = 1000.0;
//! let signal: Vec<f64> = (0..4096)
//!     .map(|i| (2.0 * std::f64::consts::PI * 200.0 * i as f64 / sample_rate).sin())
//!     .collect();
//!
//! let estimator = WelchEstimator::new(256);
//! let psd = estimator.estimate_psd(&signal, sample_rate).unwrap();
//! assert_eq!(psd.frequencies.len(), 129); // 256 / 2 + 1 one-sided bins
//! ```

use log::debug;
use realfft::RealFftPlanner;
use serde::Serialize;

use crate::error::ShapingError;

/// One-sided power spectral density estimate of a signal
///
/// `frequencies` and `density` always have the same length; frequencies
/// start at 0 Hz (DC) and increase linearly up to the Nyquist frequency.
/// Density values are non-negative by construction.
#[derive(Debug, Clone, Serialize)]
pub struct PowerSpectrum {
    /// Frequency bins in Hz, non-decreasing, starting at 0
    pub frequencies: Vec<f64>,
    /// Estimated power spectral density per bin (power / Hz)
    pub density: Vec<f64>,
    /// Sample rate of the analyzed signal in Hz
    pub sample_rate: f64,
}

impl PowerSpectrum {
    /// Number of frequency bins in the estimate.
    pub fn len(&self) -> usize {
        self.frequencies.len()
    }

    /// True when the estimate holds no bins.
    pub fn is_empty(&self) -> bool {
        self.frequencies.is_empty()
    }

    /// Frequency of the bin with the highest density, in Hz.
    pub fn peak_frequency(&self) -> Option<f64> {
        self.density
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.total_cmp(b.1))
            .map(|(i, _)| self.frequencies[i])
    }
}

/// Trait for implementing power spectral density estimators
///
/// Allows different estimation strategies to be used interchangeably by
/// the shaping pipeline. Implementations must be thread-safe; estimation
/// itself is pure (no retained state between calls).
pub trait SpectralEstimator: Send + Sync {
    /// Estimate the one-sided PSD of `signal` sampled at `sample_rate` Hz.
    ///
    /// ### Errors
    ///
    /// Returns [`ShapingError::InvalidInput`] for an empty signal,
    /// non-finite samples, or a non-positive sample rate.
    fn estimate_psd(&self, signal: &[f64], sample_rate: f64)
        -> Result<PowerSpectrum, ShapingError>;
}

/// Welch's method with Hann windowing and 50% segment overlap
///
/// Segments shorter signals gracefully: when the signal is shorter than
/// the configured segment length, the segment length is reduced to the
/// signal length and a single periodogram is returned.
pub struct WelchEstimator {
    /// Number of samples per analysis segment
    segment_length: usize,
}

impl WelchEstimator {
    /// Segment length used throughout the shaping pipeline.
    pub const DEFAULT_SEGMENT_LENGTH: usize = 2048;

    /// Create an estimator with an explicit segment length.
    pub fn new(segment_length: usize) -> Self {
        Self { segment_length }
    }

    /// The configured segment length in samples.
    pub fn segment_length(&self) -> usize {
        self.segment_length
    }
}

impl Default for WelchEstimator {
    fn default() -> Self {
        Self::new(Self::DEFAULT_SEGMENT_LENGTH)
    }
}

impl SpectralEstimator for WelchEstimator {
    fn estimate_psd(
        &self,
        signal: &[f64],
        sample_rate: f64,
    ) -> Result<PowerSpectrum, ShapingError> {
        if signal.is_empty() {
            return Err(ShapingError::InvalidInput(
                "cannot estimate the PSD of an empty signal".into(),
            ));
        }
        if signal.iter().any(|x| !x.is_finite()) {
            return Err(ShapingError::InvalidInput(
                "signal contains non-finite samples".into(),
            ));
        }
        if sample_rate <= 0.0 {
            return Err(ShapingError::InvalidInput(format!(
                "sample rate must be positive, got {sample_rate}"
            )));
        }
        if self.segment_length == 0 {
            return Err(ShapingError::InvalidInput(
                "segment length must be positive".into(),
            ));
        }

        let nperseg = self.segment_length.min(signal.len());
        if nperseg < self.segment_length {
            debug!(
                "welch: signal ({} samples) shorter than segment length {}, reducing to {}",
                signal.len(),
                self.segment_length,
                nperseg
            );
        }
        let noverlap = nperseg / 2;
        let step = nperseg - noverlap;
        let window = hann_window(nperseg);
        let window_norm: f64 = window.iter().map(|w| w * w).sum();
        let n_freq = nperseg / 2 + 1;

        let mut planner = RealFftPlanner::<f64>::new();
        let fft = planner.plan_fft_forward(nperseg);
        let mut segment = fft.make_input_vec();
        let mut spectrum = fft.make_output_vec();
        let mut accumulator = vec![0.0f64; n_freq];
        let mut segment_count = 0usize;

        let mut start = 0usize;
        while start + nperseg <= signal.len() {
            let slice = &signal[start..start + nperseg];
            // Constant detrend: remove the segment mean before windowing.
            let mean = slice.iter().sum::<f64>() / nperseg as f64;
            for (dst, (&x, &w)) in segment.iter_mut().zip(slice.iter().zip(window.iter())) {
                *dst = (x - mean) * w;
            }

            fft.process(&mut segment, &mut spectrum).map_err(|e| {
                ShapingError::InvalidInput(format!("FFT processing failed: {e:?}"))
            })?;

            for (k, acc) in accumulator.iter_mut().enumerate() {
                let mut power = spectrum[k].norm_sqr() / (sample_rate * window_norm);
                // One-sided scaling doubles every bin except DC and Nyquist.
                if k != 0 && !(nperseg % 2 == 0 && k == nperseg / 2) {
                    power *= 2.0;
                }
                *acc += power;
            }

            segment_count += 1;
            start += step;
        }

        let scale = 1.0 / segment_count as f64;
        let density: Vec<f64> = accumulator.into_iter().map(|p| p * scale).collect();
        let frequencies: Vec<f64> = (0..n_freq)
            .map(|k| k as f64 * sample_rate / nperseg as f64)
            .collect();

        Ok(PowerSpectrum {
            frequencies,
            density,
            sample_rate,
        })
    }
}

/// Symmetric Hann window of length `n`.
fn hann_window(n: usize) -> Vec<f64> {
    if n == 1 {
        return vec![1.0];
    }
    let nm1 = (n - 1) as f64;
    (0..n)
        .map(|i| 0.5 - 0.5 * (2.0 * std::f64::consts::PI * i as f64 / nm1).cos())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn create_sine(amplitude: f64, freq: f64, sample_rate: f64, num_samples: usize) -> Vec<f64> {
        (0..num_samples)
            .map(|n| {
                let t = n as f64 / sample_rate;
                amplitude * (2.0 * std::f64::consts::PI * freq * t).sin()
            })
            .collect()
    }

    #[test]
    fn test_psd_of_sine_peaks_at_tone_frequency() {
        let sample_rate = 1024.0;
        // 128 Hz lands exactly on bin 32 with a 256-point segment.
        let signal = create_sine(1.0, 128.0, sample_rate, 4096);
        let estimator = WelchEstimator::new(256);
        let psd = estimator.estimate_psd(&signal, sample_rate).unwrap();

        assert_eq!(psd.len(), 129);
        assert_relative_eq!(psd.peak_frequency().unwrap(), 128.0, max_relative = 1e-12);
        assert!(psd.density.iter().all(|&p| p >= 0.0));
    }

    #[test]
    fn test_psd_integral_approximates_signal_power() {
        let sample_rate = 1024.0;
        let signal = create_sine(1.0, 128.0, sample_rate, 8192);
        let estimator = WelchEstimator::new(256);
        let psd = estimator.estimate_psd(&signal, sample_rate).unwrap();

        // A unit sine carries 0.5 units of power; the integral of the
        // one-sided density over frequency should land close to that.
        let df = sample_rate / 256.0;
        let total_power: f64 = psd.density.iter().sum::<f64>() * df;
        assert_relative_eq!(total_power, 0.5, max_relative = 0.1);
    }

    #[test]
    fn test_short_signal_reduces_segment_length() {
        let sample_rate = 48000.0;
        let signal = create_sine(0.5, 1000.0, sample_rate, 100);
        let estimator = WelchEstimator::default();
        let psd = estimator.estimate_psd(&signal, sample_rate).unwrap();
        // 100-sample segment: one-sided estimate has 51 bins up to Nyquist.
        assert_eq!(psd.len(), 51);
        assert_relative_eq!(
            *psd.frequencies.last().unwrap(),
            sample_rate / 2.0,
            max_relative = 1e-12
        );
    }

    #[test]
    fn test_empty_signal_errors() {
        let estimator = WelchEstimator::default();
        assert!(matches!(
            estimator.estimate_psd(&[], 48000.0),
            Err(ShapingError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_non_positive_sample_rate_errors() {
        let estimator = WelchEstimator::default();
        let signal = vec![0.1; 4096];
        assert!(matches!(
            estimator.estimate_psd(&signal, 0.0),
            Err(ShapingError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_non_finite_sample_errors() {
        let estimator = WelchEstimator::default();
        let mut signal = vec![0.1; 4096];
        signal[17] = f64::NAN;
        assert!(matches!(
            estimator.estimate_psd(&signal, 48000.0),
            Err(ShapingError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_frequency_axis_is_strictly_increasing_from_zero() {
        let estimator = WelchEstimator::new(512);
        let signal = create_sine(1.0, 440.0, 48000.0, 48000);
        let psd = estimator.estimate_psd(&signal, 48000.0).unwrap();
        assert_eq!(psd.frequencies[0], 0.0);
        assert!(psd
            .frequencies
            .windows(2)
            .all(|pair| pair[1] > pair[0]));
    }
}
