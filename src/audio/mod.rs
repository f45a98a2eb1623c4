// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-calnoise project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! WAV import/export for the command line front end
//!
//! The shaping core works on float sample buffers; this module is the
//! audio-file collaborator around it. It reads WAV files into per-channel
//! `f64` buffers in full-scale [-1.0, 1.0] representation and writes
//! calibration noise back in the *original* sample format and bit depth.
//! Integer rescaling happens here, never in the core.

use anyhow::{Context, Result};
use hound::{SampleFormat, WavReader, WavSpec, WavWriter};
use log::{debug, info};
use serde::Serialize;
use std::fs::File;
use std::io::Write as IoWrite;
use std::path::{Path, PathBuf};

use crate::spectral::PowerSpectrum;

/// A decoded WAV file: de-interleaved channels plus the spec needed to
/// write a matching file back.
pub struct AudioFile {
    /// One buffer per channel, full-scale float representation
    pub channels: Vec<Vec<f64>>,
    /// The source WAV spec (channel count, sample rate, format, depth)
    pub spec: WavSpec,
}

impl AudioFile {
    /// Sample rate in Hz.
    pub fn sample_rate(&self) -> f64 {
        self.spec.sample_rate as f64
    }

    /// Duration of the audio in seconds.
    pub fn duration_s(&self) -> f64 {
        match self.channels.first() {
            Some(channel) => channel.len() as f64 / self.sample_rate(),
            None => 0.0,
        }
    }
}

/// Read a WAV file into per-channel float buffers.
///
/// Integer PCM samples are scaled by `2^(bits - 1)` into [-1.0, 1.0);
/// float files are passed through unchanged.
pub fn read_wav<P: AsRef<Path>>(path: P) -> Result<AudioFile> {
    let path = path.as_ref();
    let mut reader =
        WavReader::open(path).with_context(|| format!("Failed to open WAV file {path:?}"))?;
    let spec = reader.spec();

    let interleaved: Vec<f64> = match spec.sample_format {
        SampleFormat::Float => reader
            .samples::<f32>()
            .map(|s| s.map(|x| x as f64))
            .collect::<Result<_, _>>()
            .with_context(|| format!("Failed to decode float samples from {path:?}"))?,
        SampleFormat::Int => {
            let scale = (1i64 << (spec.bits_per_sample - 1)) as f64;
            reader
                .samples::<i32>()
                .map(|s| s.map(|x| x as f64 / scale))
                .collect::<Result<_, _>>()
                .with_context(|| format!("Failed to decode integer samples from {path:?}"))?
        }
    };

    let num_channels = spec.channels as usize;
    anyhow::ensure!(num_channels > 0, "WAV file {path:?} declares zero channels");
    let mut channels = vec![Vec::with_capacity(interleaved.len() / num_channels); num_channels];
    for frame in interleaved.chunks_exact(num_channels) {
        for (channel, &sample) in channels.iter_mut().zip(frame.iter()) {
            channel.push(sample);
        }
    }

    info!(
        "audio: loaded {path:?}: {} channel(s), {} Hz, {} bit {:?}, {:.2} s",
        spec.channels,
        spec.sample_rate,
        spec.bits_per_sample,
        spec.sample_format,
        channels.first().map_or(0.0, |c| c.len() as f64 / spec.sample_rate as f64)
    );
    Ok(AudioFile { channels, spec })
}

/// Write per-channel float buffers as a WAV file with the given spec.
///
/// The channel count of `spec` is replaced by the number of buffers
/// provided; sample rate, format and bit depth are preserved so the
/// calibration file matches its stimulus. All channels must share one
/// length.
pub fn write_wav<P: AsRef<Path>>(path: P, channels: &[Vec<f64>], spec: WavSpec) -> Result<()> {
    let path = path.as_ref();
    let num_channels = channels.len();
    anyhow::ensure!(num_channels > 0, "no channels to write to {path:?}");
    let len = channels[0].len();
    anyhow::ensure!(
        channels.iter().all(|c| c.len() == len),
        "channels to write to {path:?} differ in length"
    );

    let spec = WavSpec {
        channels: num_channels as u16,
        ..spec
    };
    let mut writer =
        WavWriter::create(path, spec).with_context(|| format!("Failed to create {path:?}"))?;

    match spec.sample_format {
        SampleFormat::Float => {
            for frame in 0..len {
                for channel in channels {
                    writer.write_sample(channel[frame] as f32)?;
                }
            }
        }
        SampleFormat::Int => {
            let max = ((1i64 << (spec.bits_per_sample - 1)) - 1) as f64;
            let min = -((1i64 << (spec.bits_per_sample - 1)) as f64);
            if spec.bits_per_sample <= 16 {
                for frame in 0..len {
                    for channel in channels {
                        let value = (channel[frame] * max).clamp(min, max) as i16;
                        writer.write_sample(value)?;
                    }
                }
            } else {
                for frame in 0..len {
                    for channel in channels {
                        let value = (channel[frame] * max).clamp(min, max) as i32;
                        writer.write_sample(value)?;
                    }
                }
            }
        }
    }

    writer
        .finalize()
        .with_context(|| format!("Failed to finalize {path:?}"))?;
    debug!("audio: wrote {num_channels} channel(s), {len} frames to {path:?}");
    Ok(())
}

/// Derive the calibration file path from the stimulus path.
///
/// Appends `suffix` to the file stem (`tone.wav` -> `tone_cal.wav`) and
/// places the file in `directory` when given, next to the input otherwise.
pub fn output_path(input: &Path, suffix: &str, directory: Option<&Path>) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let file_name = format!("{stem}{suffix}.wav");
    match directory {
        Some(dir) => dir.join(file_name),
        None => input.with_file_name(file_name),
    }
}

/// Spectra of one shaped channel, for the JSON sidecar.
#[derive(Debug, Serialize)]
pub struct ChannelSpectra {
    /// Zero-based channel index
    pub channel: usize,
    /// PSD of the stimulus channel
    pub stimulus_psd: PowerSpectrum,
    /// PSD of the calibration noise for that channel
    pub noise_psd: PowerSpectrum,
}

/// Write the per-channel spectra as a JSON sidecar next to `wav_path`.
///
/// This is the hand-off to the presentation collaborator: an external
/// plotting tool can draw the stimulus and noise spectra side by side.
pub fn write_psd_sidecar(wav_path: &Path, spectra: &[ChannelSpectra]) -> Result<()> {
    let sidecar_path = wav_path.with_extension("psd.json");
    let json = serde_json::to_string_pretty(spectra)
        .context("Failed to serialize PSD data to JSON")?;
    let mut file = File::create(&sidecar_path)
        .with_context(|| format!("Failed to create {sidecar_path:?}"))?;
    file.write_all(json.as_bytes())
        .with_context(|| format!("Failed to write {sidecar_path:?}"))?;
    info!("audio: wrote spectra sidecar {sidecar_path:?}");
    Ok(())
}
