// Copyright 2026 The Parapet Project
// SPDX-License-Identifier: Apache-2.0

use std::path::PathBuf;

use super::error::ConfigError;

/// Where relay config YAML comes from.
///
/// `FileSource` reads from disk; `StringSource` holds content in memory
/// for tests and embedded defaults.
pub trait ConfigSource {
    fn load(&self) -> Result<String, ConfigError>;
}

/// Loads config from a file on disk.
pub struct FileSource {
    pub path: PathBuf,
}

impl ConfigSource for FileSource {
    fn load(&self) -> Result<String, ConfigError> {
        Ok(std::fs::read_to_string(&self.path)?)
    }
}

/// Config content supplied directly as a string.
pub struct StringSource {
    pub content: String,
}

impl ConfigSource for StringSource {
    fn load(&self) -> Result<String, ConfigError> {
        Ok(self.content.clone())
    }
}
