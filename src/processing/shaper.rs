// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-calnoise project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! # Noise Shaping Pipeline
//!
//! The [`NoiseShaper`] drives the full calibration noise pipeline:
//!
//! 1. **Generate** - draw a white Gaussian noise bed at the stimulus's
//!    sample rate and estimate the stimulus PSD (the filter target)
//! 2. **Design** - build a linear-phase FIR filter whose amplitude
//!    response follows the square root of the stimulus PSD
//! 3. **Apply** - convolve the noise with the filter, renormalize and trim
//!    the convolution transients symmetrically (half the filter's
//!    `taps - 1` offset from each end, compensating the group delay)
//! 4. **Amplitude-correct** - gate the edges, normalize, and scale the
//!    buffer so its RMS matches the stimulus exactly
//! 5. **Clip-check** (caller-invoked) - reject buffers that exceed the
//!    ±1.0 full-scale range
//!
//! Each stage is a pure function taking the previous stage's output; the
//! shaper holds only its configuration, never intermediate buffers, so a
//! single instance can be reused across channels and runs. Every call is
//! deterministic given the correlated-mode seed policy.
//!
//! ## Example
//!
//! ```no_run
//! use rust_calnoise::config::ShapingConfig;
//! use rust_calnoise::processing::NoiseShaper;
//!
//! let stimulus: Vec<f64> = (0..48000)
//!     .map(|i| 0.5 * (2.0 * std::f64::consts::PI * 1000.0 * i as f64 / 48000.0).sin())
//!     .collect();
//!
//! let shaper = NoiseShaper::new(ShapingConfig::default());
//! let result = shaper.shape_noise(&stimulus, 48000.0, true).unwrap();
//! NoiseShaper::check_clipping(&result.noise).unwrap();
//! ```

use log::{debug, info};

use crate::config::ShapingConfig;
use crate::error::ShapingError;
use crate::preprocessing::signal_ops;
use crate::preprocessing::{tap_count, FirFilter};
use crate::spectral::{PowerSpectrum, SpectralEstimator, WelchEstimator};
use crate::utility::noise_generator;

/// Output bundle of a shaping run
///
/// Owned by the caller; the shaper keeps nothing once this is returned.
/// The stimulus PSD is included so the presentation layer can plot both
/// spectra side by side.
#[derive(Debug, Clone)]
pub struct ShapingResult {
    /// The calibration noise, RMS-matched to the stimulus
    pub noise: Vec<f64>,
    /// PSD of the calibration noise (diagnostic)
    pub noise_psd: PowerSpectrum,
    /// PSD of the stimulus the filter was designed from
    pub stimulus_psd: PowerSpectrum,
    /// Sample rate shared by stimulus and noise, in Hz
    pub sample_rate: f64,
}

/// Creates filtered noise shaped like the power spectral density of a
/// given audio signal.
pub struct NoiseShaper {
    config: ShapingConfig,
}

impl NoiseShaper {
    /// Create a shaper with explicit configuration.
    pub fn new(config: ShapingConfig) -> Self {
        Self { config }
    }

    /// Create a shaper with the default pipeline parameters.
    pub fn with_defaults() -> Self {
        Self::new(ShapingConfig::default())
    }

    /// The shaper's configuration.
    pub fn config(&self) -> &ShapingConfig {
        &self.config
    }

    /// Run the full shaping pipeline for one channel.
    ///
    /// Creates white Gaussian noise, designs a filter shaped like the
    /// spectrum of `stimulus`, passes the noise through the filter and
    /// adjusts the RMS amplitude of the result to match the stimulus.
    ///
    /// ### Arguments
    ///
    /// * `stimulus` - One channel of the reference audio, in float
    ///   full-scale representation
    /// * `sample_rate` - Sample rate of the stimulus in Hz
    /// * `correlated` - Reuse the fixed noise seed so repeated calls (and
    ///   other channels) share the identical noise realization
    ///
    /// ### Returns
    ///
    /// A [`ShapingResult`] with the calibration noise and the diagnostic
    /// spectra, or the first [`ShapingError`] a stage detects. No retry is
    /// attempted here; retrying with fresh noise is a caller policy.
    pub fn shape_noise(
        &self,
        stimulus: &[f64],
        sample_rate: f64,
        correlated: bool,
    ) -> Result<ShapingResult, ShapingError> {
        validate_stimulus(stimulus, sample_rate)?;

        let estimator = WelchEstimator::new(self.config.segment_length);

        info!("shaper: creating white noise");
        let noise =
            noise_generator::generate_white_noise(sample_rate, self.config.noise_duration_s, correlated)?;
        let stimulus_psd = estimator.estimate_psd(stimulus, sample_rate)?;

        info!("shaper: creating filter");
        let filter = design_filter(&self.config, &stimulus_psd)?;
        debug!(
            "shaper: filter delay {:.6} s ({} samples)",
            filter.delay_seconds(sample_rate),
            filter.group_delay_samples()
        );

        info!("shaper: applying filter to noise");
        let filtered = apply_filter(&filter, &noise)?;

        info!("shaper: matching amplitudes");
        let noise = correct_amplitude(
            &filtered,
            stimulus,
            self.config.ramp_duration_s,
            sample_rate,
        )?;
        let noise_psd = estimator.estimate_psd(&noise, sample_rate)?;

        Ok(ShapingResult {
            noise,
            noise_psd,
            stimulus_psd,
            sample_rate,
        })
    }

    /// Check the final buffer for clipping.
    ///
    /// Invoked by the caller before persisting the calibration noise.
    /// A peak above 1.0 full scale means the buffer must not be written to
    /// a fixed-range audio format; the stimulus likely sits too close to
    /// full scale for level matching to stay in range.
    pub fn check_clipping(noise: &[f64]) -> Result<(), ShapingError> {
        let peak = signal_ops::peak_abs(noise);
        if peak > 1.0 {
            return Err(ShapingError::ClippingDetected { peak });
        }
        debug!("shaper: no clipping (peak {peak:.6})");
        Ok(())
    }
}

/// Reject empty, non-finite or unsampleable stimuli before any work.
fn validate_stimulus(stimulus: &[f64], sample_rate: f64) -> Result<(), ShapingError> {
    if stimulus.is_empty() {
        return Err(ShapingError::InvalidInput(
            "stimulus signal is empty".into(),
        ));
    }
    if stimulus.iter().any(|x| !x.is_finite()) {
        return Err(ShapingError::InvalidInput(
            "stimulus contains non-finite samples".into(),
        ));
    }
    if sample_rate <= 0.0 {
        return Err(ShapingError::InvalidInput(format!(
            "sample rate must be positive, got {sample_rate}"
        )));
    }
    Ok(())
}

/// Design stage: stimulus PSD to FIR filter.
fn design_filter(
    config: &ShapingConfig,
    stimulus_psd: &PowerSpectrum,
) -> Result<FirFilter, ShapingError> {
    let num_taps = tap_count(config.d1, config.d2, config.transition_bandwidth_hz)?;
    FirFilter::from_power_spectrum(stimulus_psd, num_taps)
}

/// Apply stage: convolve, renormalize, trim the transients.
///
/// Full convolution appends `taps - 1` extra samples. The trim removes
/// half of that offset from each end, which both discards the transient
/// edges and compensates the linear-phase filter's group delay, returning
/// a buffer of the original noise length.
fn apply_filter(filter: &FirFilter, noise: &[f64]) -> Result<Vec<f64>, ShapingError> {
    let offset = filter.num_taps() - 1;
    if noise.len() <= offset {
        return Err(ShapingError::InvalidInput(format!(
            "noise buffer ({} samples) is shorter than the filter transient ({offset} samples)",
            noise.len()
        )));
    }

    let filtered = filter.convolve_full(noise)?;
    let filtered = signal_ops::peak_normalize(&filtered)?;

    // offset is even because the tap count is odd.
    let half = offset / 2;
    Ok(filtered[half..filtered.len() - half].to_vec())
}

/// Amplitude correction stage: gate, normalize, RMS-match.
fn correct_amplitude(
    filtered: &[f64],
    stimulus: &[f64],
    ramp_duration_s: f64,
    sample_rate: f64,
) -> Result<Vec<f64>, ShapingError> {
    let stimulus_rms = signal_ops::rms(stimulus)?;
    let gated = signal_ops::gate(filtered, ramp_duration_s, sample_rate)?;
    let normalized = signal_ops::normalize(&gated)?;
    let noise_rms = signal_ops::rms(&normalized)?;
    if noise_rms == 0.0 {
        return Err(ShapingError::DegenerateSignal(
            "filtered noise has zero RMS; cannot match amplitudes".into(),
        ));
    }

    let amp_ratio = stimulus_rms / noise_rms;
    debug!(
        "shaper: stimulus RMS {stimulus_rms:.5}, filtered noise RMS {noise_rms:.5}, ratio {amp_ratio:.5}"
    );
    Ok(normalized.iter().map(|&x| x * amp_ratio).collect())
}
