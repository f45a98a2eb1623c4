// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-calnoise project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! FIR filter design by frequency sampling
//!
//! The shaping pipeline needs a linear-phase FIR filter whose magnitude
//! response follows the square root of a measured power spectral density.
//! This module designs such a filter with the frequency-sampling method:
//!
//! 1. Normalize the spectrum's frequency axis to [0, 1] (Nyquist-relative)
//! 2. Interpolate the desired amplitude gains onto a fine uniform grid
//! 3. Impose a linear phase matching the filter's group delay
//! 4. Inverse-transform to the time domain and taper with a Hamming window
//!
//! Tap counts come from the Kaiser/Hermann length approximation in
//! [`tap_count`] and are forced odd, so the design is a symmetric type-I
//! filter with an integer group delay of `(taps - 1) / 2` samples.

use log::debug;
use num_complex::Complex;
use realfft::RealFftPlanner;

use crate::error::ShapingError;
use crate::spectral::PowerSpectrum;

/// Estimate the FIR length needed for given ripple tolerances.
///
/// Applies the Kaiser/Hermann approximation
/// `N = (2/3) * log10(1 / (10 * d1 * d2)) * Df`, truncates to an integer
/// and bumps even results up by one. An odd tap count guarantees an
/// integer group delay for the symmetric linear-phase design.
///
/// ### Arguments
///
/// * `d1` - Passband ripple tolerance (e.g. `1e-4`)
/// * `d2` - Stopband ripple tolerance (e.g. `1e-3`)
/// * `transition_bandwidth_hz` - Transition band width in Hz
///
/// ### Examples
///
/// ```
/// use rust_calnoise::preprocessing::tap_count;
///
/// let taps = tap_count(1e-4, 1e-3, 1000.0).unwrap();
/// assert_eq!(taps % 2, 1);
/// ```
pub fn tap_count(
    d1: f64,
    d2: f64,
    transition_bandwidth_hz: f64,
) -> Result<usize, ShapingError> {
    if d1 <= 0.0 || d2 <= 0.0 {
        return Err(ShapingError::InvalidInput(format!(
            "ripple tolerances must be positive, got d1={d1}, d2={d2}"
        )));
    }
    if transition_bandwidth_hz <= 0.0 {
        return Err(ShapingError::InvalidInput(format!(
            "transition bandwidth must be positive, got {transition_bandwidth_hz}"
        )));
    }

    let estimate =
        (2.0 / 3.0) * (1.0 / (10.0 * d1 * d2)).log10() * transition_bandwidth_hz;
    if !estimate.is_finite() || estimate < 1.0 {
        return Err(ShapingError::InvalidInput(format!(
            "tolerances d1={d1}, d2={d2}, transition bandwidth {transition_bandwidth_hz} Hz \
             yield a non-positive filter length"
        )));
    }

    let mut taps = estimate as usize;
    if taps % 2 == 0 {
        taps += 1;
    }
    Ok(taps)
}

/// A linear-phase FIR filter defined by its tap coefficients
///
/// Constructed once per shaping run from the stimulus power spectrum and
/// immutable afterwards. The tap count is odd by construction.
#[derive(Debug, Clone)]
pub struct FirFilter {
    taps: Vec<f64>,
}

impl FirFilter {
    /// Design a filter whose amplitude response follows `sqrt(PSD)`.
    ///
    /// This is the frequency-sampling design (the `firwin2` approach): the
    /// spectrum's frequency axis is normalized by its maximum so it spans
    /// [0, 1] in Nyquist-relative units, the square root of each density
    /// value becomes the desired amplitude gain at that frequency, and the
    /// gains are interpolated onto a uniform grid of
    /// `1 + 2^ceil(log2(num_taps))` points before the inverse transform.
    ///
    /// ### Arguments
    ///
    /// * `spectrum` - The stimulus PSD; frequency bins must start at 0 and
    ///   be strictly increasing, densities must be finite and non-negative
    /// * `num_taps` - Desired tap count, must be odd (see [`tap_count`])
    ///
    /// ### Errors
    ///
    /// [`ShapingError::InvalidInput`] when the tap count is even, the
    /// frequency axis is not strictly increasing from 0, or the densities
    /// are negative or non-finite. A malformed axis must fail here rather
    /// than produce an unstable filter downstream.
    pub fn from_power_spectrum(
        spectrum: &PowerSpectrum,
        num_taps: usize,
    ) -> Result<Self, ShapingError> {
        if num_taps < 3 || num_taps % 2 == 0 {
            return Err(ShapingError::InvalidInput(format!(
                "tap count must be an odd integer >= 3, got {num_taps}"
            )));
        }
        if spectrum.frequencies.len() < 2 {
            return Err(ShapingError::InvalidInput(
                "power spectrum needs at least two frequency bins".into(),
            ));
        }
        if spectrum.frequencies.len() != spectrum.density.len() {
            return Err(ShapingError::InvalidInput(format!(
                "power spectrum is malformed: {} frequency bins but {} density values",
                spectrum.frequencies.len(),
                spectrum.density.len()
            )));
        }
        if spectrum.frequencies[0] != 0.0 {
            return Err(ShapingError::InvalidInput(format!(
                "frequency axis must start at 0 Hz, got {}",
                spectrum.frequencies[0]
            )));
        }
        if !spectrum.frequencies.windows(2).all(|p| p[1] > p[0]) {
            return Err(ShapingError::InvalidInput(
                "frequency axis must be strictly increasing".into(),
            ));
        }
        if spectrum
            .density
            .iter()
            .any(|&p| !p.is_finite() || p < 0.0)
        {
            return Err(ShapingError::InvalidInput(
                "power spectral density values must be finite and non-negative".into(),
            ));
        }

        let f_max = *spectrum.frequencies.last().unwrap();
        let freq_norm: Vec<f64> = spectrum.frequencies.iter().map(|&f| f / f_max).collect();
        // Power to amplitude: the filter gain is the square root of the PSD.
        let gain: Vec<f64> = spectrum.density.iter().map(|&p| p.sqrt()).collect();

        // Fine uniform grid for the inverse transform.
        let nfreqs = num_taps.next_power_of_two() + 1;
        let nfft = 2 * (nfreqs - 1);
        let group_delay = (num_taps - 1) as f64 / 2.0;

        let mut planner = RealFftPlanner::<f64>::new();
        let ifft = planner.plan_fft_inverse(nfft);
        let mut bins = ifft.make_input_vec();
        let mut impulse = ifft.make_output_vec();

        for (j, bin) in bins.iter_mut().enumerate() {
            let x = j as f64 / (nfreqs - 1) as f64;
            let amplitude = linear_interp(x, &freq_norm, &gain);
            // Linear phase keeps the impulse response centered on the
            // filter's group delay.
            let phase = -group_delay * std::f64::consts::PI * x;
            *bin = Complex::from_polar(amplitude, phase);
        }
        // The inverse real FFT requires purely real DC and Nyquist bins.
        bins[0].im = 0.0;
        bins[nfreqs - 1].im = 0.0;

        ifft.process(&mut bins, &mut impulse)
            .map_err(|e| ShapingError::InvalidInput(format!("FFT processing failed: {e:?}")))?;

        let scale = 1.0 / nfft as f64;
        let window = hamming_window(num_taps);
        let taps: Vec<f64> = impulse
            .iter()
            .take(num_taps)
            .zip(window.iter())
            .map(|(&h, &w)| h * scale * w)
            .collect();

        debug!(
            "fir: designed {} taps over a {}-point grid (group delay {} samples)",
            num_taps,
            nfreqs,
            (num_taps - 1) / 2
        );
        Ok(Self { taps })
    }

    /// The filter's tap coefficients.
    pub fn taps(&self) -> &[f64] {
        &self.taps
    }

    /// Number of taps (odd by construction).
    pub fn num_taps(&self) -> usize {
        self.taps.len()
    }

    /// Group delay in whole samples: `(taps - 1) / 2`.
    pub fn group_delay_samples(&self) -> usize {
        (self.taps.len() - 1) / 2
    }

    /// Group delay in seconds at the given sample rate.
    pub fn delay_seconds(&self, sample_rate: f64) -> f64 {
        (self.taps.len() - 1) as f64 / (2.0 * sample_rate)
    }

    /// Full linear convolution of the filter with `signal`.
    ///
    /// Returns `signal.len() + num_taps - 1` samples; the extra
    /// `num_taps - 1` samples are the convolution transients the caller is
    /// expected to trim. Computed via FFT (multiply in the frequency
    /// domain), which is numerically equivalent to direct convolution for
    /// these lengths.
    pub fn convolve_full(&self, signal: &[f64]) -> Result<Vec<f64>, ShapingError> {
        if signal.is_empty() {
            return Err(ShapingError::InvalidInput(
                "cannot convolve an empty signal".into(),
            ));
        }
        let out_len = signal.len() + self.taps.len() - 1;
        let nfft = out_len.next_power_of_two();

        let mut planner = RealFftPlanner::<f64>::new();
        let fft = planner.plan_fft_forward(nfft);
        let ifft = planner.plan_fft_inverse(nfft);

        let mut padded_signal = fft.make_input_vec();
        padded_signal[..signal.len()].copy_from_slice(signal);
        let mut signal_spectrum = fft.make_output_vec();
        fft.process(&mut padded_signal, &mut signal_spectrum)
            .map_err(|e| ShapingError::InvalidInput(format!("FFT processing failed: {e:?}")))?;

        let mut padded_taps = fft.make_input_vec();
        padded_taps[..self.taps.len()].copy_from_slice(&self.taps);
        let mut tap_spectrum = fft.make_output_vec();
        fft.process(&mut padded_taps, &mut tap_spectrum)
            .map_err(|e| ShapingError::InvalidInput(format!("FFT processing failed: {e:?}")))?;

        let mut product: Vec<Complex<f64>> = signal_spectrum
            .iter()
            .zip(tap_spectrum.iter())
            .map(|(a, b)| a * b)
            .collect();
        // Rounding can leave stray imaginary parts on the edge bins the
        // inverse real FFT requires to be real.
        product[0].im = 0.0;
        let last = product.len() - 1;
        product[last].im = 0.0;

        let mut output = ifft.make_output_vec();
        ifft.process(&mut product, &mut output)
            .map_err(|e| ShapingError::InvalidInput(format!("FFT processing failed: {e:?}")))?;

        let scale = 1.0 / nfft as f64;
        Ok(output.into_iter().take(out_len).map(|x| x * scale).collect())
    }

    /// Sampled magnitude of the filter's frequency response.
    ///
    /// Evaluates `|H(f)|` at `num_points` frequencies spanning DC up to
    /// (but excluding) the Nyquist frequency, the `freqz` diagnostic the
    /// display layer plots against the stimulus spectrum.
    pub fn frequency_response(
        &self,
        num_points: usize,
        sample_rate: f64,
    ) -> (Vec<f64>, Vec<f64>) {
        let nfft = (2 * num_points).max(self.taps.len().next_power_of_two());
        let mut planner = RealFftPlanner::<f64>::new();
        let fft = planner.plan_fft_forward(nfft);
        let mut padded = fft.make_input_vec();
        padded[..self.taps.len()].copy_from_slice(&self.taps);
        let mut spectrum = fft.make_output_vec();
        // Length invariants are fixed above, so the transform cannot fail.
        if fft.process(&mut padded, &mut spectrum).is_err() {
            return (Vec::new(), Vec::new());
        }

        let frequencies: Vec<f64> = (0..num_points)
            .map(|k| k as f64 * sample_rate / nfft as f64)
            .collect();
        let magnitudes: Vec<f64> = spectrum
            .iter()
            .take(num_points)
            .map(|c| c.norm())
            .collect();
        (frequencies, magnitudes)
    }
}

/// Linear interpolation of `(xp, fp)` sample points at `x`.
///
/// `xp` must be strictly increasing and bracket `x`; values outside the
/// range clamp to the endpoints.
fn linear_interp(x: f64, xp: &[f64], fp: &[f64]) -> f64 {
    if x <= xp[0] {
        return fp[0];
    }
    if x >= xp[xp.len() - 1] {
        return fp[fp.len() - 1];
    }
    let upper = xp.partition_point(|&v| v < x).max(1);
    let lower = upper - 1;
    let span = xp[upper] - xp[lower];
    let t = (x - xp[lower]) / span;
    fp[lower] + t * (fp[upper] - fp[lower])
}

/// Symmetric Hamming window of length `n`.
fn hamming_window(n: usize) -> Vec<f64> {
    if n == 1 {
        return vec![1.0];
    }
    let nm1 = (n - 1) as f64;
    (0..n)
        .map(|i| 0.54 - 0.46 * (2.0 * std::f64::consts::PI * i as f64 / nm1).cos())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::{assert_abs_diff_eq, assert_relative_eq};

    fn flat_spectrum(num_bins: usize, sample_rate: f64) -> PowerSpectrum {
        let df = sample_rate / 2.0 / (num_bins - 1) as f64;
        PowerSpectrum {
            frequencies: (0..num_bins).map(|k| k as f64 * df).collect(),
            density: vec![1.0; num_bins],
            sample_rate,
        }
    }

    #[test]
    fn test_tap_count_default_tolerances_pinned() {
        // Regression constant for the pipeline defaults.
        assert_eq!(tap_count(1e-4, 1e-3, 1000.0).unwrap(), 4001);
    }

    #[test]
    fn test_tap_count_is_always_odd() {
        for df in [250.0, 500.0, 750.0, 1000.0, 1500.0, 2000.0] {
            for d in [1e-5, 1e-4, 1e-3] {
                let taps = tap_count(d, 1e-3, df).unwrap();
                assert_eq!(taps % 2, 1, "even tap count for d={d}, df={df}");
            }
        }
    }

    #[test]
    fn test_tap_count_rejects_bad_tolerances() {
        assert!(tap_count(0.0, 1e-3, 1000.0).is_err());
        assert!(tap_count(1e-4, -1.0, 1000.0).is_err());
        assert!(tap_count(1e-4, 1e-3, 0.0).is_err());
        // d1 * d2 too large: the approximation collapses to zero length.
        assert!(tap_count(0.5, 0.5, 1000.0).is_err());
    }

    #[test]
    fn test_flat_spectrum_designs_allpass() {
        let spectrum = flat_spectrum(257, 48000.0);
        let filter = FirFilter::from_power_spectrum(&spectrum, 101).unwrap();
        let (freqs, mags) = filter.frequency_response(512, 48000.0);

        // Mid-band response should sit at the requested unity gain.
        for (f, m) in freqs.iter().zip(mags.iter()) {
            if *f > 2000.0 && *f < 22000.0 {
                assert_relative_eq!(*m, 1.0, max_relative = 0.05);
            }
        }
    }

    #[test]
    fn test_single_bin_spectrum_concentrates_gain() {
        let sample_rate = 48000.0;
        let mut spectrum = flat_spectrum(257, sample_rate);
        spectrum.density = vec![0.0; 257];
        // One hot bin at 6 kHz (bin 64 of 256 spans to Nyquist).
        spectrum.density[64] = 1.0;

        let filter = FirFilter::from_power_spectrum(&spectrum, 101).unwrap();
        let (freqs, mags) = filter.frequency_response(1024, sample_rate);
        let peak_idx = mags
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.total_cmp(b.1))
            .map(|(i, _)| i)
            .unwrap();
        let expected = spectrum.frequencies[64];
        assert_abs_diff_eq!(freqs[peak_idx], expected, epsilon = 500.0);
    }

    #[test]
    fn test_design_is_linear_phase_symmetric() {
        let spectrum = flat_spectrum(129, 44100.0);
        let filter = FirFilter::from_power_spectrum(&spectrum, 63).unwrap();
        let taps = filter.taps();
        for i in 0..taps.len() / 2 {
            assert_abs_diff_eq!(taps[i], taps[taps.len() - 1 - i], epsilon = 1e-12);
        }
        assert_eq!(filter.group_delay_samples(), 31);
        assert_relative_eq!(
            filter.delay_seconds(44100.0),
            31.0 / 44100.0,
            max_relative = 1e-12
        );
    }

    #[test]
    fn test_even_tap_count_rejected() {
        let spectrum = flat_spectrum(129, 48000.0);
        assert!(matches!(
            FirFilter::from_power_spectrum(&spectrum, 100),
            Err(ShapingError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_non_monotonic_frequency_axis_rejected() {
        let mut spectrum = flat_spectrum(129, 48000.0);
        spectrum.frequencies[10] = spectrum.frequencies[11];
        assert!(matches!(
            FirFilter::from_power_spectrum(&spectrum, 101),
            Err(ShapingError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_negative_density_rejected() {
        let mut spectrum = flat_spectrum(129, 48000.0);
        spectrum.density[5] = -1.0;
        assert!(matches!(
            FirFilter::from_power_spectrum(&spectrum, 101),
            Err(ShapingError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_convolve_full_matches_direct_convolution() {
        let filter = FirFilter {
            taps: vec![0.0, 1.0, 0.5],
        };
        let signal = vec![1.0, 2.0, 3.0];
        let result = filter.convolve_full(&signal).unwrap();
        let expected = [0.0, 1.0, 2.5, 4.0, 1.5];
        assert_eq!(result.len(), expected.len());
        for (r, e) in result.iter().zip(expected.iter()) {
            assert_abs_diff_eq!(*r, *e, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_convolve_full_output_length() {
        let spectrum = flat_spectrum(129, 48000.0);
        let filter = FirFilter::from_power_spectrum(&spectrum, 63).unwrap();
        let signal = vec![0.25; 480];
        let result = filter.convolve_full(&signal).unwrap();
        assert_eq!(result.len(), 480 + 63 - 1);
    }
}
