// Copyright (c) 2019-2022, The rav1e contributors. All rights reserved
//
// This source code is subject to the terms of the BSD 2 Clause License and
// the Alliance for Open Media Patent License 1.0. If the BSD 2 Clause License
// was not distributed with this source code in the LICENSE file, you can
// obtain it at www.aomedia.org/license/software. If the Alliance for Open
// Media Patent License 1.0 was not distributed with this source code in the
// PATENTS file, you can obtain it at www.aomedia.org/license/patent.

//! Filling superblock masks from decoded block metadata.
//!
//! Decoding stamps every committed block into the masks: where its
//! transforms start, whether it is an inter skip block, where its coding
//! block borders lie and which filter level it uses. Once the frame is
//! complete, [`build_bitmask_vert`] and [`build_bitmask_horz`] walk each
//! plane and turn the stamps into per-size edge masks.

use crate::blocks::{Block, FrameBlocks};
use crate::mask::*;
use crate::partition::*;
use crate::shape::*;
use crate::transform::TxSize::{self, *};
use crate::transform::TX_SIZES;

static SQUARE_TX_SIZES: [TxSize; TX_SIZES] =
  [TX_4X4, TX_8X8, TX_16X16, TX_32X32, TX_64X64];

impl LoopFilterMasks {
  fn store_tx_shape(
    &mut self, bo: BlockOffset, shape_id: usize, tx_size: TxSize,
    uv_tx_size: TxSize,
  ) {
    let (row, col) = bo.sb_local();
    let (index, shift) = Bitmask::index_shift(row, col);
    // Shapes taller than two rows start on a word boundary.
    debug_assert!(tx_size.height_mi() <= 2 || row & 3 == 0);
    let left = &LEFT_MASK_UNIVARIANT[shape_id];
    let above = &ABOVE_MASK_UNIVARIANT[shape_id];
    let lfm = self.get_mut(bo.y, bo.x);
    lfm.tx_size_ver[0][tx_size.horz_map() as usize]
      .or_shifted(left, index, shift);
    lfm.tx_size_hor[0][tx_size.vert_map() as usize]
      .or_shifted(above, index, shift);
    lfm.tx_size_ver[1][uv_tx_size.horz_map() as usize]
      .or_shifted(left, index, shift);
    lfm.tx_size_hor[1][uv_tx_size.vert_map() as usize]
      .or_shifted(above, index, shift);
  }

  /// Stamps a block whose luma area is tiled by a single transform size.
  ///
  /// # Panics
  ///
  /// - If `bsize` does not fit a 64x64 superblock or `tx_size` cannot tile
  ///   it.
  pub fn store_bitmask_univariant_tx(
    &mut self, bo: BlockOffset, bsize: BlockSize, tx_size: TxSize,
  ) {
    let uv_tx_size = bsize.largest_chroma_tx_size(self.xdec, self.ydec);
    self.store_tx_shape(
      bo,
      expect_shape_id(bsize, tx_size),
      tx_size,
      uv_tx_size,
    );
  }

  /// Stamps one transform block of an inter block with a split transform
  /// tree. `bo` is the transform's position, `bsize` the coding block's
  /// shape, which selects the chroma transform.
  ///
  /// # Panics
  ///
  /// - If `bsize` does not fit a 64x64 superblock.
  pub fn store_bitmask_vartx(
    &mut self, bo: BlockOffset, tx_size: TxSize, bsize: BlockSize,
  ) {
    let uv_tx_size = bsize.largest_chroma_tx_size(self.xdec, self.ydec);
    self.store_tx_shape(
      bo,
      expect_shape_id(tx_size.block_size(), tx_size),
      tx_size,
      uv_tx_size,
    );
  }

  /// Records borders, skip state and filter levels of a coding block.
  ///
  /// # Panics
  ///
  /// - If `bsize` does not fit a 64x64 superblock.
  pub fn store_bitmask_other_info(
    &mut self, bo: BlockOffset, bsize: BlockSize, block: &Block,
    is_horz_coding_block_border: bool, is_vert_coding_block_border: bool,
  ) {
    assert!(bsize.fits_sb64(), "{:?} does not fit a superblock", bsize);
    let (row_start, col_start) = bo.sb_local();
    let (index, shift) = Bitmask::index_shift(row_start, col_start);
    let lfm = self.get_mut(bo.y, bo.x);

    if is_horz_coding_block_border {
      let top_edge = u64::MAX >> (64 - bsize.width_mi());
      lfm.is_horz_border.or_word(index, top_edge << shift);
    }
    if is_vert_coding_block_border {
      lfm.is_vert_border.or_shifted(
        &shape(ShapeKind::VertBorder, bsize, bsize.tx_size()),
        index,
        shift,
      );
    }
    if block.is_inter_skip() {
      lfm
        .skip
        .or_shifted(&shape(ShapeKind::Above, bsize, TX_4X4), index, shift);
    }

    let levels = block.levels;
    let cols = col_start..col_start + bsize.width_mi();
    for row in row_start..row_start + bsize.height_mi() {
      lfm.lfl_ver[0][row][cols.clone()].fill(levels.y_ver);
      lfm.lfl_hor[0][row][cols.clone()].fill(levels.y_hor);
      for (pli, level) in [(1, levels.u), (2, levels.v)] {
        lfm.lfl_ver[pli][row][cols.clone()].fill(level);
        lfm.lfl_hor[pli][row][cols.clone()].fill(level);
      }
    }
  }

  /// Stamps a whole coding block tiled by `block.tx_size`, both of its
  /// coding block borders included.
  pub fn store_block(&mut self, bo: BlockOffset, block: &Block) {
    self.store_bitmask_univariant_tx(bo, block.bsize, block.tx_size);
    self.store_bitmask_other_info(bo, block.bsize, block, true, true);
  }

  /// Stamps every block of a decoded frame. Blocks and transforms are
  /// found at the 4x4 units aligned to their own size, so per-unit
  /// transform overrides are stamped as split transforms.
  pub fn store_frame_blocks(&mut self, blocks: &FrameBlocks) {
    debug_assert!(blocks.cols >= self.mi_cols && blocks.rows >= self.mi_rows);
    for y in 0..blocks.rows {
      for (x, block) in blocks[y].iter().enumerate() {
        let bo = BlockOffset::new(x, y);
        if x % block.bsize.width_mi() == 0 && y % block.bsize.height_mi() == 0
        {
          self.store_bitmask_other_info(bo, block.bsize, block, true, true);
        }
        if x % block.tx_size.width_mi() == 0
          && y % block.tx_size.height_mi() == 0
        {
          self.store_bitmask_vartx(bo, block.tx_size, block.bsize);
        }
      }
    }
  }
}

/// Decision state carried from one visited transform to the next.
struct EdgeWalk {
  tx_size: TxSize,
  prev_tx_size: TxSize,
  prev_level: u8,
  prev_skip: bool,
}

impl EdgeWalk {
  const fn new() -> Self {
    EdgeWalk {
      tx_size: TX_16X16,
      prev_tx_size: TX_16X16,
      prev_level: 1,
      prev_skip: false,
    }
  }

  /// Picks up the transform stamped at the current position, if any, and
  /// decides whether the edge in front of it is filtered. Returns the edge
  /// size class and the level promoted from the previous side.
  #[inline]
  fn step(
    &mut self, stamps: &[Bitmask; TX_SIZES], is_uv: bool, index: usize,
    mask: u64, level: u8, skip: bool, border: bool, interior: bool,
  ) -> Option<(TxSize, Option<u8>)> {
    let candidates = if is_uv { TX_SIZES - 1 } else { TX_SIZES };
    if let Some(ts) = SQUARE_TX_SIZES[..candidates]
      .iter()
      .zip(stamps.iter())
      .find_map(|(&ts, m)| (m.word(index) & mask != 0).then_some(ts))
    {
      self.tx_size = ts;
    }

    let edge = (interior
      && (level != 0 || self.prev_level != 0)
      && (!self.prev_skip || !skip || border))
      .then(|| {
        let min_tx_size = self.tx_size.min(self.prev_tx_size).min(TX_16X16);
        let promoted =
          (level == 0 && self.prev_level != 0).then_some(self.prev_level);
        (min_tx_size, promoted)
      });

    self.prev_level = level;
    self.prev_skip = skip;
    self.prev_tx_size = self.tx_size;
    edge
  }
}

/// Fills `left[pli]` of every superblock, promoting `lfl_ver` levels where
/// only the left side of an edge has a non-zero level.
pub fn build_bitmask_vert(masks: &mut LoopFilterMasks, pli: usize) {
  let (xdec, ydec) = masks.plane_dec(pli);
  let (plane_width, plane_height) = masks.plane_size(pli);
  let is_uv = pli > 0;
  let sb_step = MI_SIZE_64X64 >> xdec;
  let mut walk = EdgeWalk::new();

  for r in (0..).take_while(|r| r << MI_SIZE_LOG2 < plane_height) {
    let mi_row = r << ydec;
    let row = mi_row % MI_SIZE_64X64;
    let row_uv = row | ydec;
    let (index, row_shift) = Bitmask::index_shift(row, 0);

    for c in (0..).step_by(sb_step) {
      if c << MI_SIZE_LOG2 >= plane_width {
        break;
      }
      let lfm = masks.get_mut(mi_row, c << xdec);
      let mut col_in_unit = 0;
      while col_in_unit < sb_step
        && (c + col_in_unit) << MI_SIZE_LOG2 < plane_width
      {
        let col = col_in_unit << xdec;
        let col_uv = col | xdec;
        let mask = 1u64 << (row_shift | col);
        let skip = lfm.skip.word(index) & mask != 0;
        let border = lfm.is_vert_border.word(index) & mask != 0;
        let level = lfm.lfl_ver[pli][row_uv][col_uv];

        if let Some((min_tx_size, promoted)) = walk.step(
          lfm.tx_sizes(EdgeDirection::Vertical, is_uv),
          is_uv,
          index,
          mask,
          level,
          skip,
          border,
          c + col_in_unit > 0,
        ) {
          lfm.left[pli][min_tx_size as usize].set(row_uv, col_uv);
          if let Some(level) = promoted {
            lfm.lfl_ver[pli][row_uv][col_uv] = level;
          }
        }

        col_in_unit += walk.tx_size.width_mi();
      }
    }
  }
}

/// Fills `above[pli]` of every superblock, promoting `lfl_hor` levels
/// where only the upper side of an edge has a non-zero level.
pub fn build_bitmask_horz(masks: &mut LoopFilterMasks, pli: usize) {
  let (xdec, ydec) = masks.plane_dec(pli);
  let (plane_width, plane_height) = masks.plane_size(pli);
  let is_uv = pli > 0;
  let sb_step = MI_SIZE_64X64 >> ydec;
  let mut walk = EdgeWalk::new();

  for c in (0..).take_while(|c| c << MI_SIZE_LOG2 < plane_width) {
    let mi_col = c << xdec;
    let col = mi_col % MI_SIZE_64X64;
    let col_uv = col | xdec;

    for r in (0..).step_by(sb_step) {
      if r << MI_SIZE_LOG2 >= plane_height {
        break;
      }
      let lfm = masks.get_mut(r << ydec, mi_col);
      let mut row_in_unit = 0;
      while row_in_unit < sb_step
        && (r + row_in_unit) << MI_SIZE_LOG2 < plane_height
      {
        let row = row_in_unit << ydec;
        let row_uv = row | ydec;
        let (index, shift) = Bitmask::index_shift(row, col);
        let mask = 1u64 << shift;
        let skip = lfm.skip.word(index) & mask != 0;
        let border = lfm.is_horz_border.word(index) & mask != 0;
        let level = lfm.lfl_hor[pli][row_uv][col_uv];

        if let Some((min_tx_size, promoted)) = walk.step(
          lfm.tx_sizes(EdgeDirection::Horizontal, is_uv),
          is_uv,
          index,
          mask,
          level,
          skip,
          border,
          r + row_in_unit > 0,
        ) {
          lfm.above[pli][min_tx_size as usize].set(row_uv, col_uv);
          if let Some(level) = promoted {
            lfm.lfl_hor[pli][row_uv][col_uv] = level;
          }
        }

        row_in_unit += walk.tx_size.height_mi();
      }
    }
  }
}

/// Builds both edge directions for every plane of the frame.
pub fn build_bitmasks(masks: &mut LoopFilterMasks) {
  for pli in 0..masks.planes {
    build_bitmask_vert(masks, pli);
    build_bitmask_horz(masks, pli);
  }
  log::debug!(
    "built loop filter masks for {}x{} ({} planes, {} superblocks)",
    masks.width,
    masks.height,
    masks.planes,
    masks.sb_cols * masks.sb_rows
  );
}
