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

use std::ops::Index;

use crate::error::{Error, Result};
use crate::prng::Xorshift32;

/// Bijective ordering of tile indices.
///
/// Entry `i` names the scrambled tile that belongs at grid position `i`.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Permutation(Vec<usize>);

impl Permutation {
    /// Derive the tile order the site uses for `seed`.
    ///
    /// Each index is keyed by the next value of a fresh [`Xorshift32`]
    /// stream, and indices are sorted by key. The sort is stable, so equal
    /// keys keep index order. No other normalization is applied.
    pub fn build(count: usize, seed: u32) -> Self {
        let mut rng = Xorshift32::new(seed);
        let mut keyed: Vec<(u32, usize)> = (0..count).map(|i| (rng.next_value(), i)).collect();
        keyed.sort_by_key(|&(k, _)| k);

        Self(keyed.into_iter().map(|(_, i)| i).collect())
    }

    pub fn identity(count: usize) -> Self {
        Self((0..count).collect())
    }

    /// Permutation undoing `self`.
    pub fn inverse(&self) -> Self {
        let mut inv = vec![0; self.0.len()];
        for (i, &v) in self.0.iter().enumerate() {
            inv[v] = i;
        }
        Self(inv)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_slice(&self) -> &[usize] {
        &self.0
    }
}

impl Index<usize> for Permutation {
    type Output = usize;

    fn index(&self, i: usize) -> &usize {
        &self.0[i]
    }
}

impl TryFrom<Vec<usize>> for Permutation {
    type Error = Error;

    fn try_from(v: Vec<usize>) -> Result<Self> {
        let mut seen = vec![false; v.len()];
        for &i in &v {
            match seen.get_mut(i) {
                Some(s) if !*s => *s = true,
                _ => return Err(Error::InvalidPermutation(v.len())),
            }
        }
        Ok(Self(v))
    }
}
