// Copyright (c) 2018-2022, The rav1e contributors. All rights reserved
//
// This source code is subject to the terms of the BSD 2 Clause License and
// the Alliance for Open Media Patent License 1.0. If the BSD 2 Clause License
// was not distributed with this source code in the LICENSE file, you can
// obtain it at www.aomedia.org/license/software. If the Alliance for Open
// Media Patent License 1.0 was not distributed with this source code in the
// PATENTS file, you can obtain it at www.aomedia.org/license/patent.

#![allow(non_camel_case_types)]
#![allow(non_upper_case_globals)]

use crate::partition::BlockSize::{self, *};
use crate::partition::MI_SIZE_LOG2;
use num_derive::FromPrimitive;

use TxSize::*;

/// Number of square transform sizes, which are also the edge size classes.
pub const TX_SIZES: usize = 5;
pub const TX_SIZES_ALL: usize = 14 + 5;

/// Transform Size
#[derive(
  Copy, Clone, Debug, PartialEq, PartialOrd, Eq, Ord, Hash, FromPrimitive,
)]
#[cfg_attr(
  feature = "serialize",
  derive(serde::Serialize, serde::Deserialize)
)]
pub enum TxSize {
  TX_4X4,
  TX_8X8,
  TX_16X16,
  TX_32X32,
  TX_64X64,

  TX_4X8,
  TX_8X4,
  TX_8X16,
  TX_16X8,
  TX_16X32,
  TX_32X16,
  TX_32X64,
  TX_64X32,

  TX_4X16,
  TX_16X4,
  TX_8X32,
  TX_32X8,
  TX_16X64,
  TX_64X16,
}

impl Default for TxSize {
  fn default() -> Self {
    TX_64X64
  }
}

impl TxSize {
  /// Number of square transform sizes [4x4, 8x8, 16x16, 32x32, 64x64]
  pub const TX_SIZES: usize = TX_SIZES;

  /// Number of transform sizes (including non-square sizes)
  pub const TX_SIZES_ALL: usize = TX_SIZES_ALL;

  #[inline]
  pub const fn width(self) -> usize {
    1 << self.width_log2()
  }

  #[inline]
  pub const fn width_log2(self) -> usize {
    match self {
      TX_4X4 | TX_4X8 | TX_4X16 => 2,
      TX_8X8 | TX_8X4 | TX_8X16 | TX_8X32 => 3,
      TX_16X16 | TX_16X8 | TX_16X32 | TX_16X4 | TX_16X64 => 4,
      TX_32X32 | TX_32X16 | TX_32X64 | TX_32X8 => 5,
      TX_64X64 | TX_64X32 | TX_64X16 => 6,
    }
  }

  #[inline]
  pub const fn width_mi(self) -> usize {
    self.width() >> MI_SIZE_LOG2
  }

  #[inline]
  pub const fn height(self) -> usize {
    1 << self.height_log2()
  }

  #[inline]
  pub const fn height_log2(self) -> usize {
    match self {
      TX_4X4 | TX_8X4 | TX_16X4 => 2,
      TX_8X8 | TX_4X8 | TX_16X8 | TX_32X8 => 3,
      TX_16X16 | TX_8X16 | TX_32X16 | TX_4X16 | TX_64X16 => 4,
      TX_32X32 | TX_16X32 | TX_64X32 | TX_8X32 => 5,
      TX_64X64 | TX_32X64 | TX_16X64 => 6,
    }
  }

  #[inline]
  pub const fn height_mi(self) -> usize {
    self.height() >> MI_SIZE_LOG2
  }

  #[inline]
  pub const fn is_sqr(self) -> bool {
    (self as usize) < TX_SIZES
  }

  /// Square transform with the same width; selects the left-edge class.
  #[inline]
  pub const fn horz_map(self) -> TxSize {
    Self::square_log2(self.width_log2())
  }

  /// Square transform with the same height; selects the top-edge class.
  #[inline]
  pub const fn vert_map(self) -> TxSize {
    Self::square_log2(self.height_log2())
  }

  #[inline]
  const fn square_log2(log2: usize) -> TxSize {
    match log2 {
      2 => TX_4X4,
      3 => TX_8X8,
      4 => TX_16X16,
      5 => TX_32X32,
      _ => TX_64X64,
    }
  }

  #[inline]
  pub const fn block_size(self) -> BlockSize {
    match self {
      TX_4X4 => BLOCK_4X4,
      TX_8X8 => BLOCK_8X8,
      TX_16X16 => BLOCK_16X16,
      TX_32X32 => BLOCK_32X32,
      TX_64X64 => BLOCK_64X64,
      TX_4X8 => BLOCK_4X8,
      TX_8X4 => BLOCK_8X4,
      TX_8X16 => BLOCK_8X16,
      TX_16X8 => BLOCK_16X8,
      TX_16X32 => BLOCK_16X32,
      TX_32X16 => BLOCK_32X16,
      TX_32X64 => BLOCK_32X64,
      TX_64X32 => BLOCK_64X32,
      TX_4X16 => BLOCK_4X16,
      TX_16X4 => BLOCK_16X4,
      TX_8X32 => BLOCK_8X32,
      TX_32X8 => BLOCK_32X8,
      TX_16X64 => BLOCK_16X64,
      TX_64X16 => BLOCK_64X16,
    }
  }
}

pub static max_txsize_rect_lookup: [TxSize; BlockSize::BLOCK_SIZES_ALL] = [
  TX_4X4,   // 4x4
  TX_4X8,   // 4x8
  TX_8X4,   // 8x4
  TX_8X8,   // 8x8
  TX_8X16,  // 8x16
  TX_16X8,  // 16x8
  TX_16X16, // 16x16
  TX_16X32, // 16x32
  TX_32X16, // 32x16
  TX_32X32, // 32x32
  TX_32X64, // 32x64
  TX_64X32, // 64x32
  TX_64X64, // 64x64
  TX_64X64, // 64x128
  TX_64X64, // 128x64
  TX_64X64, // 128x128
  TX_4X16,  // 4x16
  TX_16X4,  // 16x4
  TX_8X32,  // 8x32
  TX_32X8,  // 32x8
  TX_16X64, // 16x64
  TX_64X16, // 64x16
];

/// Transform size actually coded once 64-sample dimensions are clamped.
pub const fn av1_get_coded_tx_size(tx_size: TxSize) -> TxSize {
  match tx_size {
    TX_64X64 | TX_32X64 | TX_64X32 => TX_32X32,
    TX_16X64 => TX_16X32,
    TX_64X16 => TX_32X16,
    _ => tx_size,
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use num_traits::FromPrimitive;

  #[test]
  fn maps_pick_square_of_each_dimension() {
    assert_eq!(TX_16X8.horz_map(), TX_16X16);
    assert_eq!(TX_16X8.vert_map(), TX_8X8);
    assert_eq!(TX_4X16.horz_map(), TX_4X4);
    assert_eq!(TX_4X16.vert_map(), TX_16X16);
    assert_eq!(TX_64X16.horz_map(), TX_64X64);
    for i in 0..TX_SIZES_ALL {
      let tx = TxSize::from_usize(i).unwrap();
      assert!(tx.horz_map().is_sqr());
      assert_eq!(tx.horz_map().width(), tx.width());
      assert_eq!(tx.vert_map().height(), tx.height());
    }
  }

  #[test]
  fn block_size_round_trips_through_tx_size() {
    for i in 0..TX_SIZES_ALL {
      let tx = TxSize::from_usize(i).unwrap();
      assert_eq!(tx.block_size().tx_size(), tx);
      assert_eq!(tx.block_size().width(), tx.width());
    }
  }

  #[test]
  fn coded_size_never_reaches_64() {
    for i in 0..TX_SIZES_ALL {
      let tx = av1_get_coded_tx_size(TxSize::from_usize(i).unwrap());
      assert!(tx.width() <= 32 && tx.height() <= 32);
    }
  }
}
