// Copyright 2026 The Parapet Project
// SPDX-License-Identifier: Apache-2.0

// Config loader and validator
//
// Loads diagram-relay.yaml, validates structure, resolves variable
// interpolation, fills defaults, and computes a deterministic config hash.

mod error;
mod interpolation;
mod loader;
mod raw;
mod source;
mod types;

pub use error::ConfigError;
pub use interpolation::resolve_variables;
pub use loader::load_config;
pub use source::{ConfigSource, FileSource, StringSource};
pub use types::*;

/// Default config file name when neither `--config` nor
/// `DIAGRAM_RELAY_CONFIG` is given.
pub const DEFAULT_CONFIG_PATH: &str = "diagram-relay.yaml";
