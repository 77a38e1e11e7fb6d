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

use log::{debug, warn};
use serde::Deserialize;

use crate::codec::RasterBuffer;
use crate::compositor;
use crate::error::{Error, Result};
use crate::geometry::{GridConfig, GridGeometry, TooSmall, TransposeGeometry};
use crate::permutation::Permutation;

/// How the site scrambled its pages.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Scheme {
    /// Tiles reordered by a seeded permutation.
    #[default]
    Permutation,
    /// Tile rows and columns swapped, no seed.
    Transpose,
}

/// Result of running an [`Unscrambler`] on a raster.
#[derive(Debug)]
pub enum Unscrambled {
    Restored(RasterBuffer),
    /// Raster was too small for a grid and is returned untouched.
    PassThrough(RasterBuffer, TooSmall),
}

impl Unscrambled {
    pub fn raster(&self) -> &RasterBuffer {
        match self {
            Unscrambled::Restored(r) | Unscrambled::PassThrough(r, _) => r,
        }
    }
}

/// Restores the original layout of a scrambled raster.
pub trait Unscrambler: Send + Sync {
    fn unscramble(&self, raster: RasterBuffer) -> Result<Unscrambled>;
}

/// Parse seed text as an unsigned 32-bit integer.
pub fn parse_seed(seed: &str) -> Result<u32> {
    seed.trim()
        .parse()
        .map_err(|_| Error::InvalidSeed(seed.to_owned()))
}

fn pass_through(raster: RasterBuffer, too_small: TooSmall) -> Unscrambled {
    warn!("{too_small}, leaving page as is");
    Unscrambled::PassThrough(raster, too_small)
}

/// Seeded permutation scheme.
#[derive(Clone, Debug)]
pub struct PermutationDescrambler {
    grid: GridConfig,
    perm: Permutation,
}

impl PermutationDescrambler {
    /// The permutation only depends on the tile count and seed, so it is
    /// built once and reused for every page sharing the seed.
    pub fn new(grid: GridConfig, seed: u32) -> Result<Self> {
        grid.validate()?;
        let perm = Permutation::build(grid.tile_count * grid.tile_count, seed);
        debug!("seed {seed} -> tile order {:?}", perm.as_slice());
        Ok(Self { grid, perm })
    }

    pub fn permutation(&self) -> &Permutation {
        &self.perm
    }
}

impl Unscrambler for PermutationDescrambler {
    fn unscramble(&self, raster: RasterBuffer) -> Result<Unscrambled> {
        let geom = match GridGeometry::compute(raster.width(), raster.height(), &self.grid) {
            Ok(g) => g,
            Err(e) => return Ok(pass_through(raster, e)),
        };
        debug!(
            "grid {}x{} tiles of {}x{}, leftover {}x{}",
            geom.tile_count,
            geom.tile_count,
            geom.tile_width,
            geom.tile_height,
            geom.leftover_width,
            geom.leftover_height
        );

        let out = compositor::descramble(raster.view(), &self.perm, &geom)?;
        Ok(Unscrambled::Restored(RasterBuffer::new(out)?))
    }
}

/// Fixed row/column transpose scheme.
#[derive(Clone, Debug)]
pub struct FixedTransposeRearranger {
    grid: GridConfig,
}

impl FixedTransposeRearranger {
    pub fn new(grid: GridConfig) -> Self {
        Self { grid }
    }
}

impl Unscrambler for FixedTransposeRearranger {
    fn unscramble(&self, raster: RasterBuffer) -> Result<Unscrambled> {
        let geom = match TransposeGeometry::compute(raster.width(), raster.height(), &self.grid) {
            Ok(g) => g,
            Err(e) => return Ok(pass_through(raster, e)),
        };
        debug!(
            "transpose {}x{} blocks of {}x{}",
            geom.max_rows, geom.max_cols, geom.tile_width, geom.tile_height
        );

        let out = compositor::rearrange(raster.view(), &geom)?;
        Ok(Unscrambled::Restored(RasterBuffer::new(out)?))
    }
}

/// Unscrambler selected by configuration.
#[derive(Clone, Debug)]
pub enum Strategy {
    Permutation(PermutationDescrambler),
    Transpose(FixedTransposeRearranger),
}

impl Strategy {
    /// Pick the unscrambler for `scheme`.
    ///
    /// The permutation scheme cannot work without a seed, so a missing or
    /// malformed one is an error rather than a default.
    pub fn select(scheme: Scheme, grid: GridConfig, seed: Option<&str>) -> Result<Self> {
        grid.validate()?;
        Ok(match scheme {
            Scheme::Permutation => {
                let seed = parse_seed(seed.ok_or(Error::MissingSeed)?)?;
                Strategy::Permutation(PermutationDescrambler::new(grid, seed)?)
            }
            Scheme::Transpose => Strategy::Transpose(FixedTransposeRearranger::new(grid)),
        })
    }
}

impl Unscrambler for Strategy {
    fn unscramble(&self, raster: RasterBuffer) -> Result<Unscrambled> {
        match self {
            Strategy::Permutation(s) => s.unscramble(raster),
            Strategy::Transpose(s) => s.unscramble(raster),
        }
    }
}
