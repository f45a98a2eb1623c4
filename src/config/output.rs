// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-calnoise project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Output configuration
//!
//! Controls where calibration noise files are written and how they are
//! named. The calibration file keeps the sample rate, sample format and
//! bit depth of its stimulus; only the name changes.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Configuration for calibration noise output files.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Suffix appended to the stimulus file stem (`tone.wav` ->
    /// `tone_cal.wav`).
    #[serde(default = "default_suffix")]
    pub suffix: String,

    /// Directory for calibration files; `None` writes next to the input.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub directory: Option<PathBuf>,

    /// Also write the stimulus and noise spectra as a JSON sidecar file
    /// for external plotting.
    #[serde(default)]
    pub dump_psd: bool,
}

fn default_suffix() -> String {
    "_cal".to_string()
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            suffix: default_suffix(),
            directory: None,
            dump_psd: false,
        }
    }
}
