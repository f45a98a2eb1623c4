// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-calnoise project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

// Command line front end for the calibration noise generator
use anyhow::{Context, Result};
use clap::Parser;
use log::{error, info};
use std::path::{Path, PathBuf};

use rust_calnoise::audio::{self, ChannelSpectra};
use rust_calnoise::config::Config;
use rust_calnoise::NoiseShaper;

/// Calibration noise generator: shapes white noise to match the spectrum
/// and RMS level of a stimulus WAV file
#[derive(Debug, Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Stimulus WAV file, or a directory whose *.wav files are all processed
    input: PathBuf,

    /// Path to configuration file (YAML format)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Override correlated (seeded, reproducible) noise generation
    #[arg(long)]
    correlated: Option<bool>,

    /// Override the noise bed duration in seconds
    #[arg(long)]
    duration: Option<f64>,

    /// Override the suffix appended to output file stems
    #[arg(long)]
    suffix: Option<String>,

    /// Directory for calibration files (default: next to each input)
    #[arg(long)]
    output_dir: Option<PathBuf>,

    /// Write the stimulus and noise spectra as a JSON sidecar file
    #[arg(long, default_value_t = false)]
    dump_psd: bool,

    /// Enable verbose logging (debug level)
    #[arg(short = 'v', long = "verbose")]
    verbose: bool,

    /// Disable all logging output
    #[arg(short = 'q', long = "quiet")]
    quiet: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let log_level = if args.quiet {
        log::LevelFilter::Off
    } else if args.verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };

    env_logger::Builder::from_default_env()
        .filter_level(log_level)
        .init();

    // Load configuration and layer the command line on top
    let config_path = args
        .config
        .clone()
        .unwrap_or_else(|| PathBuf::from("config.yaml"));
    let mut config = Config::from_file(&config_path)?;
    config.apply_args(
        args.correlated,
        args.duration,
        args.suffix.clone(),
        args.output_dir.clone(),
        args.dump_psd.then_some(true),
    );
    config.validate()?;

    let files = collect_input_files(&args.input)?;
    let shaper = NoiseShaper::new(config.shaping.clone());

    let mut failures = 0usize;
    for file in &files {
        if let Err(err) = shape_wav_file(&shaper, &config, file) {
            // A clipping stimulus aborts its own file but not the batch.
            error!("{}: {err:#}", file.display());
            failures += 1;
        }
    }

    if failures > 0 {
        anyhow::bail!(
            "{failures} of {} file(s) failed; no calibration noise was written for them",
            files.len()
        );
    }
    Ok(())
}

/// Expand the input argument into the list of WAV files to process.
fn collect_input_files(input: &Path) -> Result<Vec<PathBuf>> {
    if input.is_dir() {
        let mut files: Vec<PathBuf> = std::fs::read_dir(input)
            .with_context(|| format!("Failed to read directory {input:?}"))?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| {
                path.extension()
                    .map(|ext| ext.eq_ignore_ascii_case("wav"))
                    .unwrap_or(false)
            })
            .collect();
        files.sort();
        anyhow::ensure!(!files.is_empty(), "no WAV files found in {input:?}");
        Ok(files)
    } else {
        anyhow::ensure!(input.exists(), "input file {input:?} does not exist");
        Ok(vec![input.to_path_buf()])
    }
}

/// Shape every channel of one stimulus file and write the calibration WAV.
fn shape_wav_file(shaper: &NoiseShaper, config: &Config, path: &Path) -> Result<()> {
    info!("Processing {}", path.display());
    let stimulus = audio::read_wav(path)?;
    let sample_rate = stimulus.sample_rate();
    let num_channels = stimulus.channels.len();

    let mut noises = Vec::with_capacity(num_channels);
    let mut spectra = Vec::with_capacity(num_channels);
    for (index, channel) in stimulus.channels.iter().enumerate() {
        info!("Processing channel {} of {num_channels}", index + 1);
        let result = shaper
            .shape_noise(channel, sample_rate, shaper.config().correlated)
            .with_context(|| format!("shaping failed for channel {}", index + 1))?;
        NoiseShaper::check_clipping(&result.noise)
            .with_context(|| format!("channel {} rejected", index + 1))?;

        spectra.push(ChannelSpectra {
            channel: index,
            stimulus_psd: result.stimulus_psd,
            noise_psd: result.noise_psd,
        });
        noises.push(result.noise);
    }

    let out_path = audio::output_path(path, &config.output.suffix, config.output.directory.as_deref());
    audio::write_wav(&out_path, &noises, stimulus.spec)?;
    info!("Wrote calibration noise to {}", out_path.display());

    if config.output.dump_psd {
        audio::write_psd_sidecar(&out_path, &spectra)?;
    }
    Ok(())
}
