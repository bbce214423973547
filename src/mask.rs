// Copyright (c) 2019-2022, The rav1e contributors. All rights reserved
//
// This source code is subject to the terms of the BSD 2 Clause License and
// the Alliance for Open Media Patent License 1.0. If the BSD 2 Clause License
// was not distributed with this source code in the LICENSE file, you can
// obtain it at www.aomedia.org/license/software. If the Alliance for Open
// Media Patent License 1.0 was not distributed with this source code in the
// PATENTS file, you can obtain it at www.aomedia.org/license/patent.

//! Bit-packed edge masks for 64x64 superblocks.
//!
//! A [`Bitmask`] holds one bit per 4x4 unit of a superblock. Rows are
//! packed four to a 64-bit word, so the bit for `(row, col)` lives in
//! word `row >> 2` at position `((row & 3) << 4) | col`.

use crate::partition::{MI_SIZE_64X64, MI_SIZE_LOG2};
use crate::transform::TX_SIZES;
use itertools::iproduct;
use std::ops::BitAnd;

pub const PLANES: usize = 3;

/// Rows of a superblock packed into one 64-bit word.
pub const ROWS_PER_WORD: usize = 4;
pub const MASK_WORDS: usize = MI_SIZE_64X64 / ROWS_PER_WORD;

/// The two edge orientations filtered by the deblocker.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum EdgeDirection {
  /// Edges between horizontally adjacent blocks, stored in `left` masks.
  Vertical,
  /// Edges between vertically adjacent blocks, stored in `above` masks.
  Horizontal,
}

/// 256 bits covering the 16x16 grid of 4x4 units in a superblock.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct Bitmask {
  pub bits: [u64; MASK_WORDS],
}

impl Bitmask {
  pub const EMPTY: Bitmask = Bitmask { bits: [0; MASK_WORDS] };

  #[inline]
  pub const fn new(bits: [u64; MASK_WORDS]) -> Self {
    Self { bits }
  }

  /// Word index and bit shift holding `(row, col)`.
  #[inline(always)]
  pub const fn index_shift(row: usize, col: usize) -> (usize, usize) {
    debug_assert!(row < MI_SIZE_64X64 && col < MI_SIZE_64X64);
    (row >> 2, ((row & 3) << 4) | col)
  }

  #[inline(always)]
  pub const fn word(&self, index: usize) -> u64 {
    self.bits[index]
  }

  #[inline(always)]
  pub fn or_word(&mut self, index: usize, bits: u64) {
    self.bits[index] |= bits;
  }

  #[inline]
  pub const fn get(&self, row: usize, col: usize) -> bool {
    let (index, shift) = Self::index_shift(row, col);
    (self.bits[index] >> shift) & 1 != 0
  }

  #[inline]
  pub fn set(&mut self, row: usize, col: usize) {
    let (index, shift) = Self::index_shift(row, col);
    self.bits[index] |= 1 << shift;
  }

  #[inline]
  pub const fn is_empty(&self) -> bool {
    (self.bits[0] | self.bits[1] | self.bits[2] | self.bits[3]) == 0
  }

  #[inline]
  pub fn count(&self) -> u32 {
    self.bits.iter().map(|w| w.count_ones()).sum()
  }

  /// The 16 bits of one superblock row, column 0 in bit 0.
  #[inline]
  pub const fn row_bits(&self, row: usize) -> u64 {
    let (index, shift) = Self::index_shift(row, 0);
    (self.bits[index] >> shift) & 0xffff
  }

  /// ORs in a shape anchored at the top-left of the superblock, moved
  /// down to word `index` and right/down by `shift` bits inside it.
  ///
  /// Bits pushed past the last word are dropped; block alignment keeps
  /// every valid placement inside the superblock.
  #[inline]
  pub fn or_shifted(&mut self, shape: &Bitmask, index: usize, shift: usize) {
    for (dst, src) in self.bits[index..].iter_mut().zip(shape.bits.iter()) {
      *dst |= src << shift;
    }
  }

  /// Set positions as `(row, col)` pairs in raster order.
  pub fn positions(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
    iproduct!(0..MI_SIZE_64X64, 0..MI_SIZE_64X64)
      .filter(move |&(row, col)| self.get(row, col))
  }
}

impl BitAnd for Bitmask {
  type Output = Bitmask;
  #[inline]
  fn bitand(mut self, rhs: Bitmask) -> Bitmask {
    for (dst, src) in self.bits.iter_mut().zip(rhs.bits) {
      *dst &= src;
    }
    self
  }
}

pub type LevelGrid = [[u8; MI_SIZE_64X64]; MI_SIZE_64X64];

/// Everything the deblocker knows about one 64x64 superblock.
///
/// `left` and `above` are indexed by plane then by edge size class
/// (`TX_4X4` .. `TX_64X64`); only the first three classes ever receive
/// bits, wider edges are filtered with the 16x16 class.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SuperblockMask {
  pub left: [[Bitmask; TX_SIZES]; PLANES],
  pub above: [[Bitmask; TX_SIZES]; PLANES],
  /// Transform start columns, `[is_uv][square tx]`.
  pub tx_size_ver: [[Bitmask; TX_SIZES]; 2],
  /// Transform start rows, `[is_uv][square tx]`.
  pub tx_size_hor: [[Bitmask; TX_SIZES]; 2],
  /// 4x4 units of inter blocks coded without residual.
  pub skip: Bitmask,
  pub is_vert_border: Bitmask,
  pub is_horz_border: Bitmask,
  pub lfl_ver: [LevelGrid; PLANES],
  pub lfl_hor: [LevelGrid; PLANES],
}

impl SuperblockMask {
  #[inline]
  pub fn edges(&self, dir: EdgeDirection, pli: usize) -> &[Bitmask; TX_SIZES] {
    match dir {
      EdgeDirection::Vertical => &self.left[pli],
      EdgeDirection::Horizontal => &self.above[pli],
    }
  }

  #[inline]
  pub fn levels(&self, dir: EdgeDirection, pli: usize) -> &LevelGrid {
    match dir {
      EdgeDirection::Vertical => &self.lfl_ver[pli],
      EdgeDirection::Horizontal => &self.lfl_hor[pli],
    }
  }

  #[inline]
  pub fn tx_sizes(
    &self, dir: EdgeDirection, is_uv: bool,
  ) -> &[Bitmask; TX_SIZES] {
    match dir {
      EdgeDirection::Vertical => &self.tx_size_ver[is_uv as usize],
      EdgeDirection::Horizontal => &self.tx_size_hor[is_uv as usize],
    }
  }

  pub fn reset(&mut self) {
    *self = Self::default();
  }
}

/// Frame-wide grid of superblock masks in raster order.
#[derive(Clone, Debug)]
pub struct LoopFilterMasks {
  masks: Box<[SuperblockMask]>,
  pub sb_cols: usize,
  pub sb_rows: usize,
  /// Frame size in 4x4 units.
  pub mi_cols: usize,
  pub mi_rows: usize,
  /// Luma frame size in pixels.
  pub width: usize,
  pub height: usize,
  pub xdec: usize,
  pub ydec: usize,
  /// 1 for monochrome, 3 otherwise.
  pub planes: usize,
}

impl LoopFilterMasks {
  pub fn new(
    width: usize, height: usize, xdec: usize, ydec: usize, planes: usize,
  ) -> Self {
    debug_assert!(planes == 1 || planes == PLANES);
    let mi_cols = (width + 3) >> MI_SIZE_LOG2;
    let mi_rows = (height + 3) >> MI_SIZE_LOG2;
    let sb_cols = (mi_cols + MI_SIZE_64X64 - 1) / MI_SIZE_64X64;
    let sb_rows = (mi_rows + MI_SIZE_64X64 - 1) / MI_SIZE_64X64;
    LoopFilterMasks {
      masks: vec![SuperblockMask::default(); sb_cols * sb_rows]
        .into_boxed_slice(),
      sb_cols,
      sb_rows,
      mi_cols,
      mi_rows,
      width,
      height,
      xdec,
      ydec,
      planes,
    }
  }

  #[inline]
  fn sb_index(&self, mi_row: usize, mi_col: usize) -> usize {
    let sby = mi_row / MI_SIZE_64X64;
    let sbx = mi_col / MI_SIZE_64X64;
    debug_assert!(sby < self.sb_rows && sbx < self.sb_cols);
    sby * self.sb_cols + sbx
  }

  /// The mask of the superblock containing the 4x4 unit `(mi_row, mi_col)`.
  #[inline]
  pub fn get(&self, mi_row: usize, mi_col: usize) -> &SuperblockMask {
    &self.masks[self.sb_index(mi_row, mi_col)]
  }

  #[inline]
  pub fn get_mut(
    &mut self, mi_row: usize, mi_col: usize,
  ) -> &mut SuperblockMask {
    let i = self.sb_index(mi_row, mi_col);
    &mut self.masks[i]
  }

  pub fn iter(&self) -> impl Iterator<Item = &SuperblockMask> {
    self.masks.iter()
  }

  /// Clears every superblock so the next frame starts from empty masks.
  pub fn reset(&mut self) {
    self.masks.iter_mut().for_each(SuperblockMask::reset);
  }

  #[inline]
  pub const fn plane_dec(&self, pli: usize) -> (usize, usize) {
    if pli == 0 {
      (0, 0)
    } else {
      (self.xdec, self.ydec)
    }
  }

  /// Plane size in pixels.
  #[inline]
  pub const fn plane_size(&self, pli: usize) -> (usize, usize) {
    let (xdec, ydec) = self.plane_dec(pli);
    ((self.width + xdec) >> xdec, (self.height + ydec) >> ydec)
  }
}
