// Copyright (c) 2017-2022, The rav1e contributors. All rights reserved
//
// This source code is subject to the terms of the BSD 2 Clause License and
// the Alliance for Open Media Patent License 1.0. If the BSD 2 Clause License
// was not distributed with this source code in the LICENSE file, you can
// obtain it at www.aomedia.org/license/software. If the Alliance for Open
// Media Patent License 1.0 was not distributed with this source code in the
// PATENTS file, you can obtain it at www.aomedia.org/license/patent.

use crate::mask::EdgeDirection;
use crate::partition::*;
use crate::transform::TxSize;
use std::ops::{Index, IndexMut};

/// Deblocking strengths of one coding block: luma per edge direction,
/// one value per chroma plane.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(
  feature = "serialize",
  derive(serde::Serialize, serde::Deserialize)
)]
pub struct FilterLevels {
  pub y_ver: u8,
  pub y_hor: u8,
  pub u: u8,
  pub v: u8,
}

impl FilterLevels {
  pub const fn uniform(level: u8) -> Self {
    Self { y_ver: level, y_hor: level, u: level, v: level }
  }

  #[inline]
  pub const fn get(self, pli: usize, dir: EdgeDirection) -> u8 {
    match (pli, dir) {
      (0, EdgeDirection::Vertical) => self.y_ver,
      (0, EdgeDirection::Horizontal) => self.y_hor,
      (1, _) => self.u,
      _ => self.v,
    }
  }
}

/// Decoded metadata of the coding block covering a 4x4 unit.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(
  feature = "serialize",
  derive(serde::Serialize, serde::Deserialize)
)]
pub struct Block {
  pub bsize: BlockSize,
  /// Luma transform covering this 4x4 unit.
  pub tx_size: TxSize,
  pub skip: bool,
  pub is_inter: bool,
  pub levels: FilterLevels,
}

impl Default for Block {
  fn default() -> Block {
    Block {
      bsize: BlockSize::BLOCK_64X64,
      tx_size: TxSize::TX_64X64,
      skip: false,
      is_inter: false,
      levels: FilterLevels::default(),
    }
  }
}

impl Block {
  /// Inner transform edges of such blocks are left alone.
  #[inline]
  pub const fn is_inter_skip(&self) -> bool {
    self.skip && self.is_inter
  }
}

/// Per-4x4 grid of block metadata for a whole frame.
///
/// The grid is rounded up to an even number of rows and columns so that
/// the odd 4x4 unit read for subsampled chroma always exists.
#[derive(Clone, Debug)]
pub struct FrameBlocks {
  blocks: Box<[Block]>,
  pub cols: usize,
  pub rows: usize,
}

impl FrameBlocks {
  pub fn new(cols: usize, rows: usize) -> Self {
    let cols = (cols + 1) & !1;
    let rows = (rows + 1) & !1;
    Self {
      blocks: vec![Block::default(); cols * rows].into_boxed_slice(),
      cols,
      rows,
    }
  }

  /// Writes `block` over its whole footprint, clipped to the grid.
  pub fn set_block(&mut self, bo: BlockOffset, block: &Block) {
    let rows = (bo.y + block.bsize.height_mi()).min(self.rows);
    let cols = (bo.x + block.bsize.width_mi()).min(self.cols);
    for y in bo.y..rows {
      self[y][bo.x..cols].fill(*block);
    }
  }

  /// Overrides the luma transform over a transform block's footprint.
  pub fn set_tx_size(&mut self, bo: BlockOffset, tx_size: TxSize) {
    let rows = (bo.y + tx_size.height_mi()).min(self.rows);
    let cols = (bo.x + tx_size.width_mi()).min(self.cols);
    for y in bo.y..rows {
      for b in self[y][bo.x..cols].iter_mut() {
        b.tx_size = tx_size;
      }
    }
  }
}

impl Index<usize> for FrameBlocks {
  type Output = [Block];
  #[inline]
  fn index(&self, index: usize) -> &Self::Output {
    &self.blocks[index * self.cols..(index + 1) * self.cols]
  }
}

impl IndexMut<usize> for FrameBlocks {
  #[inline]
  fn index_mut(&mut self, index: usize) -> &mut Self::Output {
    &mut self.blocks[index * self.cols..(index + 1) * self.cols]
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::transform::TxSize::*;

  #[test]
  fn set_block_clips_to_grid() {
    let mut fb = FrameBlocks::new(5, 3);
    assert_eq!((fb.cols, fb.rows), (6, 4));
    let b = Block {
      bsize: BlockSize::BLOCK_16X16,
      tx_size: TX_8X8,
      levels: FilterLevels::uniform(9),
      ..Default::default()
    };
    fb.set_block(BlockOffset::new(4, 2), &b);
    assert_eq!(fb[3][5], b);
    assert_eq!(fb[2][4], b);
    assert_eq!(fb[1][4], Block::default());
  }

  #[test]
  fn set_tx_size_only_touches_tx() {
    let mut fb = FrameBlocks::new(4, 4);
    let b = Block { bsize: BlockSize::BLOCK_16X16, ..Default::default() };
    fb.set_block(BlockOffset::new(0, 0), &b);
    fb.set_tx_size(BlockOffset::new(2, 0), TX_8X16);
    assert_eq!(fb[0][1].tx_size, TX_64X64);
    assert_eq!(fb[3][3].tx_size, TX_8X16);
    assert_eq!(fb[3][3].bsize, BlockSize::BLOCK_16X16);
  }

  #[test]
  fn levels_by_plane_and_direction() {
    let l = FilterLevels { y_ver: 1, y_hor: 2, u: 3, v: 4 };
    assert_eq!(l.get(0, EdgeDirection::Vertical), 1);
    assert_eq!(l.get(0, EdgeDirection::Horizontal), 2);
    assert_eq!(l.get(1, EdgeDirection::Horizontal), 3);
    assert_eq!(l.get(2, EdgeDirection::Vertical), 4);
  }
}
