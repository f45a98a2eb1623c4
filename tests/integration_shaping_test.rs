// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-calnoise project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! End-to-end tests of the noise shaping pipeline.

use approx::assert_relative_eq;

use rust_calnoise::config::ShapingConfig;
use rust_calnoise::preprocessing::signal_ops;
use rust_calnoise::{NoiseShaper, ShapingError};

fn create_sine(amplitude: f64, freq: f64, sample_rate: f64, num_samples: usize) -> Vec<f64> {
    (0..num_samples)
        .map(|n| {
            let t = n as f64 / sample_rate;
            amplitude * (2.0 * std::f64::consts::PI * freq * t).sin()
        })
        .collect()
}

/// A short noise bed keeps the end-to-end runs fast; all other parameters
/// stay at the production defaults.
fn fast_config() -> ShapingConfig {
    ShapingConfig {
        noise_duration_s: 2.0,
        ..ShapingConfig::default()
    }
}

#[test]
fn test_sine_stimulus_end_to_end() {
    let sample_rate = 48000.0;
    let stimulus = create_sine(0.25, 1000.0, sample_rate, 240_000); // 5 seconds
    let shaper = NoiseShaper::new(fast_config());

    let result = shaper.shape_noise(&stimulus, sample_rate, true).unwrap();

    // The noise bed keeps its configured duration.
    assert_eq!(result.noise.len(), 96_000);

    // RMS matches the stimulus exactly (up to float rounding).
    let stimulus_rms = signal_ops::rms(&stimulus).unwrap();
    let noise_rms = signal_ops::rms(&result.noise).unwrap();
    assert_relative_eq!(noise_rms, stimulus_rms, max_relative = 1e-9);

    // A moderate-level tonal stimulus must not clip.
    let peak = signal_ops::peak_abs(&result.noise);
    assert!(peak <= 1.0, "unexpected clipping, peak {peak}");
    NoiseShaper::check_clipping(&result.noise).unwrap();

    // The shaped noise concentrates its energy at the stimulus tone.
    let peak_freq = result.noise_psd.peak_frequency().unwrap();
    assert!(
        (peak_freq - 1000.0).abs() < 100.0,
        "noise spectrum peaks at {peak_freq} Hz instead of 1000 Hz"
    );

    // The stimulus PSD in the result bundle peaks at the tone as well.
    let stim_peak = result.stimulus_psd.peak_frequency().unwrap();
    assert!((stim_peak - 1000.0).abs() < 50.0);

    // Gated edges stay far below the interior level.
    assert!(result.noise[0].abs() < 0.05);
    assert!(result.noise[result.noise.len() - 1].abs() < 0.05);
}

#[test]
fn test_correlated_mode_is_bit_identical_across_runs() {
    let sample_rate = 16000.0;
    let stimulus = create_sine(0.25, 500.0, sample_rate, 32_000);
    let config = ShapingConfig {
        noise_duration_s: 1.0,
        ..ShapingConfig::default()
    };
    let shaper = NoiseShaper::new(config);

    let first = shaper.shape_noise(&stimulus, sample_rate, true).unwrap();
    let second = shaper.shape_noise(&stimulus, sample_rate, true).unwrap();
    assert_eq!(first.noise, second.noise);
}

#[test]
fn test_uncorrelated_mode_differs_across_runs() {
    let sample_rate = 16000.0;
    let stimulus = create_sine(0.25, 500.0, sample_rate, 32_000);
    let config = ShapingConfig {
        noise_duration_s: 1.0,
        ..ShapingConfig::default()
    };
    let shaper = NoiseShaper::new(config);

    let first = shaper.shape_noise(&stimulus, sample_rate, false).unwrap();
    let second = shaper.shape_noise(&stimulus, sample_rate, false).unwrap();
    assert_ne!(first.noise, second.noise);
}

#[test]
fn test_saturated_stimulus_is_flagged_as_clipping() {
    let sample_rate = 16000.0;
    // A hard-clipped sine hugging full scale: RMS close to 1.0, so the
    // level-matched noise must overshoot the ±1.0 range.
    let stimulus: Vec<f64> = create_sine(4.0, 500.0, sample_rate, 32_000)
        .into_iter()
        .map(|x| x.clamp(-0.999, 0.999))
        .collect();
    let config = ShapingConfig {
        noise_duration_s: 1.0,
        ..ShapingConfig::default()
    };
    let shaper = NoiseShaper::new(config);

    let result = shaper.shape_noise(&stimulus, sample_rate, true).unwrap();
    let peak = signal_ops::peak_abs(&result.noise);
    assert!(peak > 1.0, "expected overshoot, got peak {peak}");
    match NoiseShaper::check_clipping(&result.noise) {
        Err(ShapingError::ClippingDetected { peak: reported }) => {
            assert_relative_eq!(reported, peak, max_relative = 1e-12);
        }
        other => panic!("expected ClippingDetected, got {other:?}"),
    }
}

#[test]
fn test_each_call_is_independent() {
    // Interleaving runs with different modes must not leak state: a
    // correlated run after an uncorrelated one still reproduces the
    // canonical correlated realization.
    let sample_rate = 16000.0;
    let stimulus = create_sine(0.25, 500.0, sample_rate, 32_000);
    let config = ShapingConfig {
        noise_duration_s: 1.0,
        ..ShapingConfig::default()
    };
    let shaper = NoiseShaper::new(config);

    let reference = shaper.shape_noise(&stimulus, sample_rate, true).unwrap();
    let _scrambler = shaper.shape_noise(&stimulus, sample_rate, false).unwrap();
    let repeat = shaper.shape_noise(&stimulus, sample_rate, true).unwrap();
    assert_eq!(reference.noise, repeat.noise);
}
