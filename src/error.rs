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

use thiserror::Error;

/// Errors raised while restoring a single page.
///
/// Every variant is scoped to one image. A batch never stops because one of
/// its pages produced an error.
#[derive(Error, Debug)]
pub enum Error {
    /// Input bytes are not a decodable image.
    #[error("Image could not be decoded")]
    Decode(#[source] image::ImageError),

    /// Restored raster could not be serialized.
    #[error("Image could not be encoded")]
    Encode(#[source] image::ImageError),

    /// The permutation scheme was selected but no seed was given.
    #[error("Scramble seed is missing")]
    MissingSeed,

    /// Seed text is not an unsigned 32-bit integer.
    #[error("Scramble seed {0:?} is not an unsigned 32-bit integer")]
    InvalidSeed(String),

    /// Rejected configuration value.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Index sequence is not a bijection over `[0, len)`.
    #[error("Sequence is not a permutation of 0..{0}")]
    InvalidPermutation(usize),

    /// Permutation does not cover the tile grid.
    #[error("Permutation has {actual} entries, grid has {expected} tiles")]
    PermutationLength { expected: usize, actual: usize },

    /// Rasters must have 1 to 4 channels.
    #[error("Unsupported channel count {0}")]
    UnsupportedChannels(usize),

    /// Batch manifest is not valid JSON of the expected shape.
    #[error("Malformed manifest")]
    Manifest(#[from] serde_json::Error),

    #[error("Raster shape mismatch")]
    Shape(#[from] ndarray::ShapeError),
}

pub type Result<T> = std::result::Result<T, Error>;
