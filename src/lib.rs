//! Library to restore tile-scrambled web comic pages.
//!
//! Some readers cut every page into a grid of tiles and shuffle them, so a
//! saved page is unreadable. Two schemes are handled:
//!
//! * Seeded permutation: tiles are reordered by sorting a 32-bit xorshift
//!   stream. See [PermutationDescrambler].
//! * Fixed transpose: tile rows and columns are swapped, no seed involved.
//!   See [FixedTransposeRearranger].
//!
//! Pixels that do not fit in the grid are never moved. Images too small to
//! hold a grid are passed through untouched.
//!
//! For whole chapters, submit [ImageJob]s to a [Pipeline] and consume the
//! results as they finish.

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
//

pub mod codec;
pub mod compositor;
mod config;
mod error;
pub mod geometry;
pub mod manifest;
mod permutation;
mod pipeline;
mod prng;
mod strategy;

#[doc(inline)]
pub use crate::codec::{OutputFormat, RasterBuffer};
#[doc(inline)]
pub use crate::config::{Config, ConfigBuilder};
#[doc(inline)]
pub use crate::error::{Error, Result};
#[doc(inline)]
pub use crate::geometry::{GridConfig, GridGeometry, TooSmall, TransposeGeometry};
#[doc(inline)]
pub use crate::permutation::Permutation;
#[doc(inline)]
pub use crate::pipeline::{process, ImageJob, JobOutput, Outcome, Pipeline, Results};
#[doc(inline)]
pub use crate::prng::Xorshift32;
#[doc(inline)]
pub use crate::strategy::{
    parse_seed, FixedTransposeRearranger, PermutationDescrambler, Scheme, Strategy, Unscrambled,
    Unscrambler,
};
