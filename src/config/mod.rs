// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-calnoise project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! # Configuration Management
//!
//! This module implements configuration handling for the calibration noise
//! generator. It supports loading, validating and saving configuration
//! from YAML files.
//!
//! ## Configuration Structure
//!
//! The configuration is organized as a nested structure with sections:
//! - `shaping`: Parameters of the noise shaping pipeline
//! - `output`: Naming and placement of calibration files
//!
//! ## Usage
//!
//! ```no_run
//! use rust_calnoise::config::Config;
//! use std::path::Path;
//!
//! // Load config from file, creates a default if not found
//! let mut config = Config::from_file(Path::new("config.yaml")).unwrap();
//!
//! // Apply command line overrides if needed
//! config.apply_args(
//!     Some(false),                 // Correlated noise
//!     Some(10.0),                  // Noise duration in seconds
//!     Some("_noise".to_string()),  // Output suffix
//!     None,                        // Output directory
//!     Some(true),                  // Dump PSD sidecars
//! );
//!
//! println!("Noise duration: {} s", config.shaping.noise_duration_s);
//! ```

mod output;
mod shaping;

pub use output::OutputConfig;
pub use shaping::ShapingConfig;

use anyhow::{Context, Result};
use log::debug;
use serde::{Deserialize, Serialize};
use std::{
    fs::{self, File},
    io::Write,
    path::{Path, PathBuf},
};

/// Top-level application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Parameters of the shaping pipeline.
    #[serde(default)]
    pub shaping: ShapingConfig,

    /// Output naming and placement.
    #[serde(default)]
    pub output: OutputConfig,
}

impl Config {
    /// Load configuration from a file.
    ///
    /// A missing file is not an error: the default configuration is
    /// written to `path` and returned, so a fresh checkout produces a
    /// template the operator can edit.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            debug!(
                "Configuration file not found at {:?}, creating default",
                path
            );
            let default_config = Self::default();
            default_config.save_to_file(path)?;
            return Ok(default_config);
        }

        debug!("Loading configuration from {:?}", path);
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read configuration file at {:?}", path))?;

        let config: Config = serde_yml::from_str(&contents)
            .with_context(|| format!("Failed to parse YAML configuration from {:?}", path))?;

        config.validate()?;
        Ok(config)
    }

    /// Save the configuration to a file.
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let yaml =
            serde_yml::to_string(self).context("Failed to serialize configuration to YAML")?;

        let mut file = File::create(path.as_ref())
            .with_context(|| format!("Failed to create config file at {:?}", path.as_ref()))?;

        file.write_all(yaml.as_bytes())
            .with_context(|| format!("Failed to write configuration to {:?}", path.as_ref()))?;
        Ok(())
    }

    /// Apply command line overrides on top of the loaded configuration.
    pub fn apply_args(
        &mut self,
        correlated: Option<bool>,
        noise_duration_s: Option<f64>,
        suffix: Option<String>,
        directory: Option<PathBuf>,
        dump_psd: Option<bool>,
    ) {
        if let Some(correlated) = correlated {
            self.shaping.correlated = correlated;
        }
        if let Some(duration) = noise_duration_s {
            self.shaping.noise_duration_s = duration;
        }
        if let Some(suffix) = suffix {
            self.output.suffix = suffix;
        }
        if let Some(directory) = directory {
            self.output.directory = Some(directory);
        }
        if let Some(dump_psd) = dump_psd {
            self.output.dump_psd = dump_psd;
        }
    }

    /// Validate rules the type system cannot express.
    pub fn validate(&self) -> Result<()> {
        let shaping = &self.shaping;
        if shaping.noise_duration_s <= 0.0 {
            anyhow::bail!(
                "shaping.noise_duration_s must be positive, got {}",
                shaping.noise_duration_s
            );
        }
        if shaping.ramp_duration_s <= 0.0 {
            anyhow::bail!(
                "shaping.ramp_duration_s must be positive, got {}",
                shaping.ramp_duration_s
            );
        }
        if 2.0 * shaping.ramp_duration_s >= shaping.noise_duration_s {
            anyhow::bail!(
                "shaping.ramp_duration_s ({} s) leaves no sustain in a {} s noise bed",
                shaping.ramp_duration_s,
                shaping.noise_duration_s
            );
        }
        if shaping.segment_length == 0 {
            anyhow::bail!("shaping.segment_length must be positive");
        }
        if shaping.d1 <= 0.0 || shaping.d2 <= 0.0 {
            anyhow::bail!(
                "shaping ripple tolerances must be positive, got d1={}, d2={}",
                shaping.d1,
                shaping.d2
            );
        }
        if shaping.transition_bandwidth_hz <= 0.0 {
            anyhow::bail!(
                "shaping.transition_bandwidth_hz must be positive, got {}",
                shaping.transition_bandwidth_hz
            );
        }
        if self.output.suffix.is_empty() {
            anyhow::bail!("output.suffix must not be empty (it would overwrite the stimulus)");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.shaping.segment_length, 2048);
        assert_eq!(config.output.suffix, "_cal");
    }

    #[test]
    fn test_yaml_round_trip() {
        let mut config = Config::default();
        config.shaping.noise_duration_s = 12.5;
        config.output.dump_psd = true;

        let yaml = serde_yml::to_string(&config).unwrap();
        let parsed: Config = serde_yml::from_str(&yaml).unwrap();
        assert_eq!(parsed.shaping.noise_duration_s, 12.5);
        assert!(parsed.output.dump_psd);
    }

    #[test]
    fn test_partial_yaml_fills_defaults() {
        let yaml = "shaping:\n  noise_duration_s: 5.0\n";
        let parsed: Config = serde_yml::from_str(yaml).unwrap();
        assert_eq!(parsed.shaping.noise_duration_s, 5.0);
        assert_eq!(parsed.shaping.segment_length, 2048);
        assert_eq!(parsed.output.suffix, "_cal");
    }

    #[test]
    fn test_from_file_creates_default_when_missing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        let config = Config::from_file(&path).unwrap();
        assert!(path.exists());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = Config::default();
        config.shaping.noise_duration_s = 0.0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.shaping.ramp_duration_s = 20.0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.output.suffix.clear();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_apply_args_overrides() {
        let mut config = Config::default();
        config.apply_args(
            Some(false),
            Some(3.0),
            Some("_check".to_string()),
            None,
            Some(true),
        );
        assert!(!config.shaping.correlated);
        assert_eq!(config.shaping.noise_duration_s, 3.0);
        assert_eq!(config.output.suffix, "_check");
        assert!(config.output.dump_psd);
    }
}
