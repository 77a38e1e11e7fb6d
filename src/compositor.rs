// Copyright (C) 2023 Dheatly23
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.

use ndarray::prelude::*;
use ndarray::{ErrorKind, ShapeError, Zip};

use crate::error::{Error, Result};
use crate::geometry::{GridGeometry, TransposeGeometry};
use crate::permutation::Permutation;

fn check_shape<A>(arr: &ArrayView3<'_, A>, width: usize, height: usize) -> Result<()> {
    let (h, w, _) = arr.dim();
    if (h, w) != (height, width) {
        return Err(ShapeError::from_kind(ErrorKind::IncompatibleShape).into());
    }
    Ok(())
}

/// Put scrambled tiles back in place.
///
/// Parameters:
/// * `arr` : Scrambled raster, shaped `(height, width, channels)`.
/// * `perm` : Tile order. Grid position `i` receives scrambled tile `perm[i]`.
/// * `geom` : Grid computed from the raster dimensions.
///
/// Output has the full input size. Leftover strips to the right of and below
/// the grid were never scrambled, so they keep their input pixels.
pub fn descramble<A>(
    arr: ArrayView3<'_, A>,
    perm: &Permutation,
    geom: &GridGeometry,
) -> Result<Array3<A>>
where
    A: Clone + Send + Sync,
{
    check_shape(&arr, geom.width, geom.height)?;
    if perm.len() != geom.tiles() {
        return Err(Error::PermutationLength {
            expected: geom.tiles(),
            actual: perm.len(),
        });
    }

    let mut out = arr.to_owned();
    let channels = arr.len_of(Axis(2));
    if channels == 0 {
        return Ok(out);
    }

    let (tw, th, n) = (geom.tile_width, geom.tile_height, geom.tile_count);
    let mut grid = out.slice_mut(s![..geom.grid_height(), ..geom.grid_width(), ..]);

    // Destination tiles are disjoint chunks, so they can be filled in parallel.
    Zip::indexed(grid.exact_chunks_mut((th, tw, channels))).par_for_each(
        |(r, c, _), mut tile| {
            let (x, y) = geom.tile_origin(perm[r * n + c]);
            tile.assign(&arr.slice(s![y..y + th, x..x + tw, ..]));
        },
    );

    Ok(out)
}

/// Apply the scramble that [`descramble`] undoes.
///
/// `descramble(scramble(x, p), p)` reproduces `x` exactly.
pub fn scramble<A>(
    arr: ArrayView3<'_, A>,
    perm: &Permutation,
    geom: &GridGeometry,
) -> Result<Array3<A>>
where
    A: Clone + Send + Sync,
{
    descramble(arr, &perm.inverse(), geom)
}

/// Single block copy of the transpose walk, in pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BlockMove {
    pub src: (usize, usize),
    pub dst: (usize, usize),
    pub width: usize,
    pub height: usize,
}

/// Block copies [`rearrange`] performs, in application order.
///
/// Blocks are walked row-major. A block whose right edge fits in the image
/// and whose column has a matching grid row is transposed, anything else
/// stays put. Edge blocks are clipped to the remaining pixels, and
/// destinations are clipped to the image.
pub fn transpose_moves(geom: &TransposeGeometry) -> Vec<BlockMove> {
    let TransposeGeometry {
        width: w,
        height: h,
        tile_width: tw,
        tile_height: th,
        max_rows,
        max_cols,
    } = *geom;

    let mut moves = Vec::with_capacity(max_rows * max_cols);
    for row in 0..max_rows {
        for col in 0..max_cols {
            let (sx, sy) = (col * tw, row * th);
            if sx >= w || sy >= h {
                continue;
            }

            let (dr, dc) = if col < max_rows && sx + tw <= w {
                (col, row)
            } else {
                (row, col)
            };
            let (dx, dy) = (dc * tw, dr * th);
            if dx >= w || dy >= h {
                continue;
            }

            moves.push(BlockMove {
                src: (sx, sy),
                dst: (dx, dy),
                width: tw.min(w - sx).min(w - dx),
                height: th.min(h - sy).min(h - dy),
            });
        }
    }
    moves
}

/// Undo the fixed row/column transpose.
///
/// Blocks are always read from `arr`, never from partially written output.
/// Later moves win where destinations overlap, and pixels no move writes
/// keep their input value.
pub fn rearrange<A>(arr: ArrayView3<'_, A>, geom: &TransposeGeometry) -> Result<Array3<A>>
where
    A: Clone,
{
    check_shape(&arr, geom.width, geom.height)?;

    let mut out = arr.to_owned();
    for m in transpose_moves(geom) {
        let (sx, sy) = m.src;
        let (dx, dy) = m.dst;
        out.slice_mut(s![dy..dy + m.height, dx..dx + m.width, ..])
            .assign(&arr.slice(s![sy..sy + m.height, sx..sx + m.width, ..]));
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::GridConfig;

    /// Every pixel holds its own `(y, x)` coordinate.
    fn coords(h: usize, w: usize) -> Array3<(usize, usize)> {
        Array3::from_shape_fn((h, w, 1), |(y, x, _)| (y, x))
    }

    #[test]
    fn descramble_moves_whole_tiles() {
        let geom = GridGeometry::compute(70, 45, &GridConfig::default()).unwrap();
        assert_eq!((geom.tile_width, geom.tile_height), (16, 8));
        let perm = Permutation::build(16, 1);
        let src = coords(45, 70);

        let out = descramble(src.view(), &perm, &geom).unwrap();
        for i in 0..16 {
            let (dx, dy) = geom.tile_origin(i);
            let (sx, sy) = geom.tile_origin(perm[i]);
            for y in 0..8 {
                for x in 0..16 {
                    assert_eq!(out[[dy + y, dx + x, 0]], (sy + y, sx + x));
                }
            }
        }
    }

    #[test]
    fn leftover_strips_untouched() {
        let geom = GridGeometry::compute(1000, 800, &GridConfig::default()).unwrap();
        let src = coords(800, 1000);
        let out = descramble(src.view(), &Permutation::build(16, 12345), &geom).unwrap();

        let right = s![.., 992.., ..];
        let bottom = s![768.., .., ..];
        assert_eq!(out.slice(right), src.slice(right));
        assert_eq!(out.slice(bottom), src.slice(bottom));
        assert_ne!(out, src);
    }

    #[test]
    fn scramble_round_trip() {
        let geom = GridGeometry::compute(131, 77, &GridConfig::default()).unwrap();
        let perm = Permutation::build(16, 0xc0ffee);
        let src = Array3::from_shape_fn((77, 131, 3), |(y, x, c)| ((y * 7 + x * 3 + c) % 251) as u8);

        let scrambled = scramble(src.view(), &perm, &geom).unwrap();
        assert_ne!(scrambled, src);
        assert_eq!(descramble(scrambled.view(), &perm, &geom).unwrap(), src);
    }

    #[test]
    fn identity_is_noop() {
        let geom = GridGeometry::compute(64, 64, &GridConfig::default()).unwrap();
        let src = coords(64, 64);
        let out = descramble(src.view(), &Permutation::identity(16), &geom).unwrap();
        assert_eq!(out, src);
    }

    #[test]
    fn rejects_mismatched_inputs() {
        let geom = GridGeometry::compute(64, 64, &GridConfig::default()).unwrap();
        let src = coords(64, 64);
        assert!(matches!(
            descramble(src.view(), &Permutation::identity(9), &geom),
            Err(Error::PermutationLength {
                expected: 16,
                actual: 9
            })
        ));
        let other = coords(64, 65);
        assert!(matches!(
            descramble(other.view(), &Permutation::identity(16), &geom),
            Err(Error::Shape(_))
        ));
    }

    #[test]
    fn square_grid_is_fully_transposed() {
        let geom = TransposeGeometry::compute(64, 64, &GridConfig::default()).unwrap();
        let src = coords(64, 64);
        let out = rearrange(src.view(), &geom).unwrap();
        for y in 0..64 {
            for x in 0..64 {
                let (r, c) = (y / 16, x / 16);
                let expect = (c * 16 + y % 16, r * 16 + x % 16);
                assert_eq!(out[[y, x, 0]], expect);
            }
        }
    }

    #[test]
    fn right_column_stays_in_place() {
        // 1200 wide: four 296px columns and a 16px clipped fifth column.
        let geom = TransposeGeometry::compute(1200, 100, &GridConfig::default()).unwrap();
        let moves = transpose_moves(&geom);
        assert_eq!(moves.len(), 20);

        let edge: Vec<_> = moves.iter().filter(|m| m.src.0 == 1184).collect();
        assert_eq!(edge.len(), 4);
        for m in edge {
            assert_eq!(m.src, m.dst);
            assert_eq!(m.width, 16);
        }

        let src = coords(100, 1200);
        let out = rearrange(src.view(), &geom).unwrap();
        let strip = s![.., 1184.., ..];
        assert_eq!(out.slice(strip), src.slice(strip));

        // The 4x4 grid left of the strip is fully transposed.
        for y in 0..100 {
            for x in 0..1184 {
                let (r, c) = (y / 25, x / 296);
                let expect = (c * 25 + y % 25, r * 296 + x % 296);
                assert_eq!(out[[y, x, 0]], expect, "pixel ({x}, {y})");
            }
        }
    }

    #[test]
    fn block_ending_at_right_edge_is_folded() {
        // 128 wide: the last column ends exactly at the image edge.
        let geom = TransposeGeometry::compute(128, 100, &GridConfig::default()).unwrap();
        assert_eq!((geom.tile_width, geom.tile_height, geom.max_cols), (32, 25, 4));

        let moves = transpose_moves(&geom);
        let last = moves.iter().find(|m| m.src == (96, 0)).unwrap();
        assert_eq!(last.dst, (0, 75));
        assert_eq!((last.width, last.height), (32, 25));
        let back = moves.iter().find(|m| m.src == (0, 75)).unwrap();
        assert_eq!(back.dst, (96, 0));
        // Every block is folded: its (col, row) becomes (row, col).
        for m in &moves {
            assert_eq!((m.src.0 / 32, m.src.1 / 25), (m.dst.1 / 25, m.dst.0 / 32));
        }

        let src = coords(100, 128);
        let out = rearrange(src.view(), &geom).unwrap();
        assert_eq!(
            out.slice(s![75..100, 0..32, ..]),
            src.slice(s![0..25, 96..128, ..])
        );
        assert_eq!(
            out.slice(s![0..25, 96..128, ..]),
            src.slice(s![75..100, 0..32, ..])
        );
    }

    #[test]
    fn bottom_rows_outside_bands_keep_input() {
        // 4 bands of 25px leave 2 rows below the grid.
        let geom = TransposeGeometry::compute(128, 102, &GridConfig::default()).unwrap();
        assert_eq!(geom.tile_height, 25);
        let src = coords(102, 128);
        let out = rearrange(src.view(), &geom).unwrap();
        let strip = s![100.., .., ..];
        assert_eq!(out.slice(strip), src.slice(strip));
    }
}
