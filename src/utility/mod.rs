// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-calnoise project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Utility module for common utilities used throughout the project

pub mod noise_generator;

pub use noise_generator::{generate_white_noise, NoiseGenerator, CORRELATED_NOISE_SEED};
