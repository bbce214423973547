// Copyright (c) 2019-2022, The rav1e contributors. All rights reserved
//
// This source code is subject to the terms of the BSD 2 Clause License and
// the Alliance for Open Media Patent License 1.0. If the BSD 2 Clause License
// was not distributed with this source code in the LICENSE file, you can
// obtain it at www.aomedia.org/license/software. If the Alliance for Open
// Media Patent License 1.0 was not distributed with this source code in the
// PATENTS file, you can obtain it at www.aomedia.org/license/patent.

//! Canonical edge patterns of a block tiled by a transform.
//!
//! Each catalog entry places a block at the top-left corner of an empty
//! superblock and marks the 4x4 units where a transform edge starts. The
//! tables are computed at compile time from the list of (block, transform)
//! pairs that can be committed to a 64x64 superblock.

use crate::mask::{Bitmask, MASK_WORDS};
use crate::partition::BlockSize::{self, *};
use crate::transform::TxSize::{self, *};
use crate::transform::TX_SIZES_ALL;

pub const SHAPE_COUNT: usize = 67;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ShapeKind {
  /// Columns where a transform's left edge starts, over all block rows.
  Left,
  /// Rows where a transform's top edge starts, over all block columns.
  Above,
  /// The block's own left column; ignores the transform.
  VertBorder,
}

/// Catalog keys in table order: every square transform over the blocks it
/// can tile, then the 2:1 transforms (own block, then the 4:1 block they
/// split), the 1:2 64-sample transforms and the 4:1 transforms.
#[rustfmt::skip]
pub const SHAPE_KEYS: [(BlockSize, TxSize); SHAPE_COUNT] = [
  // TX_4X4
  (BLOCK_4X4, TX_4X4), (BLOCK_4X8, TX_4X4), (BLOCK_8X4, TX_4X4),
  (BLOCK_8X8, TX_4X4), (BLOCK_8X16, TX_4X4), (BLOCK_16X8, TX_4X4),
  (BLOCK_16X16, TX_4X4), (BLOCK_16X32, TX_4X4), (BLOCK_32X16, TX_4X4),
  (BLOCK_32X32, TX_4X4), (BLOCK_32X64, TX_4X4), (BLOCK_64X32, TX_4X4),
  (BLOCK_64X64, TX_4X4), (BLOCK_4X16, TX_4X4), (BLOCK_16X4, TX_4X4),
  (BLOCK_8X32, TX_4X4), (BLOCK_32X8, TX_4X4), (BLOCK_16X64, TX_4X4),
  (BLOCK_64X16, TX_4X4),
  // TX_8X8
  (BLOCK_8X8, TX_8X8), (BLOCK_8X16, TX_8X8), (BLOCK_16X8, TX_8X8),
  (BLOCK_16X16, TX_8X8), (BLOCK_16X32, TX_8X8), (BLOCK_32X16, TX_8X8),
  (BLOCK_32X32, TX_8X8), (BLOCK_32X64, TX_8X8), (BLOCK_64X32, TX_8X8),
  (BLOCK_64X64, TX_8X8), (BLOCK_8X32, TX_8X8), (BLOCK_32X8, TX_8X8),
  (BLOCK_16X64, TX_8X8), (BLOCK_64X16, TX_8X8),
  // TX_16X16
  (BLOCK_16X16, TX_16X16), (BLOCK_16X32, TX_16X16), (BLOCK_32X16, TX_16X16),
  (BLOCK_32X32, TX_16X16), (BLOCK_32X64, TX_16X16), (BLOCK_64X32, TX_16X16),
  (BLOCK_64X64, TX_16X16), (BLOCK_16X64, TX_16X16), (BLOCK_64X16, TX_16X16),
  // TX_32X32
  (BLOCK_32X32, TX_32X32), (BLOCK_32X64, TX_32X32), (BLOCK_64X32, TX_32X32),
  (BLOCK_64X64, TX_32X32),
  // TX_64X64
  (BLOCK_64X64, TX_64X64),
  // 2:1 and 1:2
  (BLOCK_4X8, TX_4X8), (BLOCK_4X16, TX_4X8),
  (BLOCK_8X4, TX_8X4), (BLOCK_16X4, TX_8X4),
  (BLOCK_8X16, TX_8X16), (BLOCK_8X32, TX_8X16),
  (BLOCK_16X8, TX_16X8), (BLOCK_32X8, TX_16X8),
  (BLOCK_16X32, TX_16X32), (BLOCK_16X64, TX_16X32),
  (BLOCK_32X16, TX_32X16), (BLOCK_64X16, TX_32X16),
  (BLOCK_32X64, TX_32X64), (BLOCK_64X32, TX_64X32),
  // 4:1 and 1:4
  (BLOCK_4X16, TX_4X16), (BLOCK_16X4, TX_16X4), (BLOCK_8X32, TX_8X32),
  (BLOCK_32X8, TX_32X8), (BLOCK_16X64, TX_16X64), (BLOCK_64X16, TX_64X16),
];

const fn edge_shape(bsize: BlockSize, tx_size: TxSize, left: bool) -> Bitmask {
  let (col_step, row_step) =
    if left { (tx_size.width_mi(), 1) } else { (1, tx_size.height_mi()) };
  let mut bits = [0u64; MASK_WORDS];
  let mut row = 0;
  while row < bsize.height_mi() {
    let mut col = 0;
    while col < bsize.width_mi() {
      let (index, shift) = Bitmask::index_shift(row, col);
      bits[index] |= 1 << shift;
      col += col_step;
    }
    row += row_step;
  }
  Bitmask::new(bits)
}

const fn build_shapes(left: bool) -> [Bitmask; SHAPE_COUNT] {
  let mut shapes = [Bitmask::EMPTY; SHAPE_COUNT];
  let mut i = 0;
  while i < SHAPE_COUNT {
    let (bsize, tx_size) = SHAPE_KEYS[i];
    shapes[i] = edge_shape(bsize, tx_size, left);
    i += 1;
  }
  shapes
}

const NO_SHAPE: u8 = u8::MAX;

const fn build_shape_ids() -> [[u8; TX_SIZES_ALL]; BlockSize::BLOCK_SIZES_ALL]
{
  let mut ids = [[NO_SHAPE; TX_SIZES_ALL]; BlockSize::BLOCK_SIZES_ALL];
  let mut i = 0;
  while i < SHAPE_COUNT {
    let (bsize, tx_size) = SHAPE_KEYS[i];
    ids[bsize as usize][tx_size as usize] = i as u8;
    i += 1;
  }
  ids
}

pub static LEFT_MASK_UNIVARIANT: [Bitmask; SHAPE_COUNT] = build_shapes(true);
pub static ABOVE_MASK_UNIVARIANT: [Bitmask; SHAPE_COUNT] = build_shapes(false);
static SHAPE_IDS: [[u8; TX_SIZES_ALL]; BlockSize::BLOCK_SIZES_ALL] =
  build_shape_ids();

/// Catalog index of a block tiled by a transform, if that pairing can be
/// committed to a superblock.
#[inline]
pub fn shape_id(bsize: BlockSize, tx_size: TxSize) -> Option<usize> {
  match SHAPE_IDS[bsize as usize][tx_size as usize] {
    NO_SHAPE => None,
    id => Some(id as usize),
  }
}

/// # Panics
///
/// - If `bsize` is wider or taller than a 64x64 superblock, or `tx_size`
///   cannot tile `bsize`.
#[inline]
pub fn expect_shape_id(bsize: BlockSize, tx_size: TxSize) -> usize {
  shape_id(bsize, tx_size).unwrap_or_else(|| {
    panic!("no edge shape for {:?} tiled by {:?}", bsize, tx_size)
  })
}

/// # Panics
///
/// - If the combination has no catalog entry; see [`expect_shape_id`].
pub fn shape(kind: ShapeKind, bsize: BlockSize, tx_size: TxSize) -> Bitmask {
  match kind {
    ShapeKind::Left => LEFT_MASK_UNIVARIANT[expect_shape_id(bsize, tx_size)],
    ShapeKind::Above => ABOVE_MASK_UNIVARIANT[expect_shape_id(bsize, tx_size)],
    ShapeKind::VertBorder => {
      LEFT_MASK_UNIVARIANT[expect_shape_id(bsize, bsize.tx_size())]
    }
  }
}
