// Copyright (C) 2023 Dheatly23
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Lesser General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU Lesser General Public License for more details.
//
// You should have received a copy of the GNU Lesser General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.

use serde::Deserialize;

use crate::codec::OutputFormat;
use crate::error::{Error, Result};
use crate::geometry::GridConfig;
use crate::strategy::Scheme;

/// Restoration settings.
///
/// Build it with [`ConfigBuilder`] or load it from TOML with
/// [`Config::from_toml`]. Both paths validate the values.
///
/// ```toml
/// scheme = "permutation"
/// format = "jpeg"
/// quality = 0.95
/// workers = 4
///
/// [grid]
/// tile_count = 4
/// block_multiple = 8
/// ```
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub grid: GridConfig,
    pub scheme: Scheme,
    pub format: OutputFormat,
    /// Encoder quality in `[0.0, 1.0]`.
    pub quality: f32,
    /// Worker threads, `None` for one per core.
    pub workers: Option<usize>,
    /// Finished pages buffered before workers block.
    pub queue_depth: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            grid: GridConfig::default(),
            scheme: Scheme::default(),
            format: OutputFormat::default(),
            quality: 0.9,
            workers: None,
            queue_depth: 8,
        }
    }
}

impl Config {
    pub fn from_toml(s: &str) -> Result<Self> {
        let config: Self = toml::from_str(s).map_err(|e| Error::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        let invalid = |msg: &str| -> Result<()> { Err(Error::InvalidConfig(msg.to_owned())) };
        self.grid.validate()?;
        if !(0.0..=1.0).contains(&self.quality) {
            return invalid("quality must be within 0.0..=1.0");
        }
        if self.workers == Some(0) {
            return invalid("workers must be positive");
        }
        if self.queue_depth == 0 {
            return invalid("queue_depth must be positive");
        }
        Ok(())
    }
}

#[derive(Clone, Debug, Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from an existing configuration, e.g. one loaded from a file.
    pub fn from_config(config: Config) -> Self {
        Self { config }
    }

    pub fn tile_count(mut self, n: usize) -> Self {
        self.config.grid.tile_count = n;
        self
    }

    pub fn block_multiple(mut self, m: usize) -> Self {
        self.config.grid.block_multiple = m;
        self
    }

    pub fn scheme(mut self, scheme: Scheme) -> Self {
        self.config.scheme = scheme;
        self
    }

    pub fn format(mut self, format: OutputFormat) -> Self {
        self.config.format = format;
        self
    }

    pub fn quality(mut self, quality: f32) -> Self {
        self.config.quality = quality;
        self
    }

    pub fn workers(mut self, workers: usize) -> Self {
        self.config.workers = Some(workers);
        self
    }

    pub fn queue_depth(mut self, depth: usize) -> Self {
        self.config.queue_depth = depth;
        self
    }

    pub fn build(self) -> Result<Config> {
        self.config.validate()?;
        Ok(self.config)
    }
}
