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

use std::fmt;

use serde::Deserialize;

use crate::error::{self, Error};

/// Largest supported tiles per axis.
pub const MAX_TILE_COUNT: usize = 256;

/// Grid constants shared with the site's own scrambler.
///
/// Both values must match the site exactly, otherwise tiles are cut at the
/// wrong boundaries.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct GridConfig {
    /// Tiles per axis.
    pub tile_count: usize,
    /// Tile sides are multiples of this.
    pub block_multiple: usize,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            tile_count: 4,
            block_multiple: 8,
        }
    }
}

impl GridConfig {
    /// Smallest width/height that still yields a grid.
    ///
    /// Saturates, so an overflowing grid is too small for every image.
    pub fn threshold(&self) -> usize {
        self.tile_count
            .checked_mul(self.block_multiple)
            .unwrap_or(usize::MAX)
    }

    /// Reject grids that cannot be cut or whose tile order is unbounded.
    pub fn validate(&self) -> error::Result<()> {
        let invalid = |msg: String| -> error::Result<()> { Err(Error::InvalidConfig(msg)) };
        if self.tile_count == 0 {
            return invalid("tile_count must be positive".into());
        }
        if self.tile_count > MAX_TILE_COUNT {
            return invalid(format!("tile_count must be at most {MAX_TILE_COUNT}"));
        }
        if self.block_multiple == 0 {
            return invalid("block_multiple must be positive".into());
        }
        if self.tile_count.checked_mul(self.block_multiple).is_none() {
            return invalid("tile_count * block_multiple overflows".into());
        }
        Ok(())
    }
}

/// Image is too small to hold a tile grid, so it is passed through as is.
///
/// This is not an error.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TooSmall {
    pub width: usize,
    pub height: usize,
    pub threshold: usize,
}

impl fmt::Display for TooSmall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}x{} image is below the {}px grid threshold",
            self.width, self.height, self.threshold
        )
    }
}

/// Tile layout for the seeded permutation scheme.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GridGeometry {
    pub width: usize,
    pub height: usize,
    pub tile_count: usize,
    pub tile_width: usize,
    pub tile_height: usize,
    /// Width of the right strip outside the grid.
    pub leftover_width: usize,
    /// Height of the bottom strip outside the grid.
    pub leftover_height: usize,
}

impl GridGeometry {
    /// Compute the grid for a `width` x `height` image.
    ///
    /// Tile sides are rounded down to a multiple of `block_multiple`, the
    /// same alignment the site used when slicing the page. Pixels that do
    /// not fit in the `tile_count` x `tile_count` grid form the leftover
    /// strips.
    pub fn compute(width: usize, height: usize, config: &GridConfig) -> Result<Self, TooSmall> {
        let GridConfig {
            tile_count: n,
            block_multiple: m,
        } = *config;
        let threshold = config.threshold();
        if n == 0 || m == 0 || width < threshold || height < threshold {
            return Err(TooSmall {
                width,
                height,
                threshold,
            });
        }

        let tile_width = (width / m) / n * m;
        let tile_height = (height / m) / n * m;

        Ok(Self {
            width,
            height,
            tile_count: n,
            tile_width,
            tile_height,
            leftover_width: width - tile_width * n,
            leftover_height: height - tile_height * n,
        })
    }

    pub fn tiles(&self) -> usize {
        self.tile_count * self.tile_count
    }

    /// Width covered by the grid.
    pub fn grid_width(&self) -> usize {
        self.tile_width * self.tile_count
    }

    /// Height covered by the grid.
    pub fn grid_height(&self) -> usize {
        self.tile_height * self.tile_count
    }

    /// Pixel origin `(x, y)` of tile `index` in row-major order.
    pub fn tile_origin(&self, index: usize) -> (usize, usize) {
        (
            (index % self.tile_count) * self.tile_width,
            (index / self.tile_count) * self.tile_height,
        )
    }
}

/// Tile layout for the fixed transpose scheme.
///
/// Tiles are `block_multiple`-aligned horizontally only. Rows split the
/// height evenly into `tile_count` bands.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TransposeGeometry {
    pub width: usize,
    pub height: usize,
    pub tile_width: usize,
    pub tile_height: usize,
    pub max_rows: usize,
    pub max_cols: usize,
}

impl TransposeGeometry {
    pub fn compute(width: usize, height: usize, config: &GridConfig) -> Result<Self, TooSmall> {
        let GridConfig {
            tile_count: n,
            block_multiple: m,
        } = *config;
        let too_small = TooSmall {
            width,
            height,
            threshold: config.threshold(),
        };
        let Some(nm) = n.checked_mul(m).filter(|&nm| nm > 0) else {
            return Err(too_small);
        };

        let tile_width = width / nm * m;
        let tile_height = height / n;
        if tile_width == 0 || tile_height == 0 {
            return Err(too_small);
        }

        Ok(Self {
            width,
            height,
            tile_width,
            tile_height,
            max_rows: n,
            max_cols: (width + tile_width - 1) / tile_width,
        })
    }
}
