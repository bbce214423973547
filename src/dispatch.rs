// Copyright (c) 2019-2022, The rav1e contributors. All rights reserved
//
// This source code is subject to the terms of the BSD 2 Clause License and
// the Alliance for Open Media Patent License 1.0. If the BSD 2 Clause License
// was not distributed with this source code in the LICENSE file, you can
// obtain it at www.aomedia.org/license/software. If the Alliance for Open
// Media Patent License 1.0 was not distributed with this source code in the
// PATENTS file, you can obtain it at www.aomedia.org/license/patent.

//! Turns built superblock masks into kernel calls.
//!
//! Every helper returns the number of 4-sample edge segments it handed to
//! the kernels; a dual call counts as two.

use crate::lpf::*;
use crate::mask::*;
use crate::partition::{MI_SIZE, MI_SIZE_64X64, MI_SIZE_LOG2};
use crate::transform::TX_SIZES;
use v_frame::pixel::Pixel;
use v_frame::plane::Plane;

/// Edge size classes in the order they are tried, widest first.
const SIZE_CLASSES: [usize; 3] = [2, 1, 0];

/// 16-bit slices of the 4x4, 8x8 and 16x16 edge masks for one row,
/// starting at column `col`.
#[inline]
fn row_masks(
  edges: &[Bitmask; TX_SIZES], row: usize, col: usize,
) -> [u64; 3] {
  std::array::from_fn(|class| edges[class].row_bits(row) >> col)
}

#[inline]
const fn edge_width(pli: usize, class: usize) -> FilterWidth {
  FilterWidth::for_edge(pli, MI_SIZE << class)
}

/// Filters the vertical edges of two 4x4 rows at once.
///
/// `masks[0]` and `masks[1]` hold the per-class edge bits of the first and
/// second row, `lfl[0]` and `lfl[1]` their levels, all starting at the
/// column under `edge`. Columns advance by `1 << ssx` bits and 4 samples.
pub fn filter_selectively_vert_row2<T, K>(
  ssx: usize, buf: &mut [T], mut edge: usize, stride: usize, pli: usize,
  mut masks: [[u64; 3]; 2], lfl: [&[u8]; 2], lfi: &LoopFilterInfo,
  bit_depth: usize, kernels: &K,
) -> usize
where
  T: Pixel,
  K: LoopFilterKernels<T> + ?Sized,
{
  let step = 1 << ssx;
  let mut col = 0;
  let mut emitted = 0;

  loop {
    let mask = masks.iter().flatten().fold(0, |acc, m| acc | m);
    if mask == 0 {
      break;
    }

    if mask & 1 != 0 {
      let thr0 = lfi.thresh(lfl[0][col]);
      let thr1 = lfi.thresh(lfl[1][col]);

      for class in SIZE_CLASSES {
        let width = edge_width(pli, class);
        match (masks[0][class] & 1 != 0, masks[1][class] & 1 != 0) {
          (true, true) => {
            kernels.filter_dual(
              EdgeDirection::Vertical,
              width,
              buf,
              edge,
              stride,
              thr0,
              thr1,
              bit_depth,
            );
            emitted += 2;
          }
          (true, false) => {
            kernels.filter(
              EdgeDirection::Vertical,
              width,
              buf,
              edge,
              stride,
              thr0,
              bit_depth,
            );
            emitted += 1;
          }
          (false, true) => {
            kernels.filter(
              EdgeDirection::Vertical,
              width,
              buf,
              edge + EDGE_SEGMENT * stride,
              stride,
              thr1,
              bit_depth,
            );
            emitted += 1;
          }
          (false, false) => {}
        }
      }
    }

    edge += EDGE_SEGMENT;
    col += step;
    masks.iter_mut().flatten().for_each(|m| *m >>= step);
  }

  emitted
}

/// Filters the horizontal edges of one 4x4 row.
///
/// Two neighbouring segments of the same class are merged into a dual call
/// whose second thresholds come from the next segment's level, as long as
/// it is still inside the superblock.
pub fn filter_selectively_horiz<T, K>(
  ssx: usize, buf: &mut [T], mut edge: usize, stride: usize, pli: usize,
  mut masks: [u64; 3], lfl: &[u8], lfi: &LoopFilterInfo, bit_depth: usize,
  kernels: &K,
) -> usize
where
  T: Pixel,
  K: LoopFilterKernels<T> + ?Sized,
{
  let step = 1 << ssx;
  let two_block_mask = if ssx != 0 { 5 } else { 3 };
  let mut offset = 0;
  let mut emitted = 0;

  loop {
    let mask = masks.iter().fold(0, |acc, m| acc | m);
    if mask == 0 {
      break;
    }

    let next_edge = if offset + step >= MI_SIZE_64X64 { 0 } else { step };
    let thr = lfi.thresh(lfl[offset]);
    let thr_next = lfi.thresh(lfl[offset + next_edge]);
    let mut count = 1;

    if mask & 1 != 0 {
      if let Some(class) =
        SIZE_CLASSES.into_iter().find(|&class| masks[class] & 1 != 0)
      {
        let width = edge_width(pli, class);
        if masks[class] & two_block_mask == two_block_mask {
          kernels.filter_dual(
            EdgeDirection::Horizontal,
            width,
            buf,
            edge,
            stride,
            thr,
            thr_next,
            bit_depth,
          );
          count = 2;
        } else {
          kernels.filter(
            EdgeDirection::Horizontal,
            width,
            buf,
            edge,
            stride,
            thr,
            bit_depth,
          );
        }
        emitted += count;
      }
    }

    edge += EDGE_SEGMENT * count;
    offset += step * count;
    masks.iter_mut().for_each(|m| *m >>= step * count);
  }

  emitted
}

/// Plane position of the superblock origin.
#[inline]
const fn plane_origin(
  mi_row: usize, mi_col: usize, ssx: usize, ssy: usize,
) -> (usize, usize) {
  ((mi_col << MI_SIZE_LOG2) >> ssx, (mi_row << MI_SIZE_LOG2) >> ssy)
}

/// Vertical edges of the superblock at `(mi_row, mi_col)`, two 4x4 rows
/// at a time.
pub fn filter_block_plane_vert<T, K>(
  masks: &LoopFilterMasks, lfi: &LoopFilterInfo, plane: &mut Plane<T>,
  pli: usize, mi_row: usize, mi_col: usize, bit_depth: usize, kernels: &K,
) -> usize
where
  T: Pixel,
  K: LoopFilterKernels<T> + ?Sized,
{
  let (ssx, ssy) = masks.plane_dec(pli);
  let lfm = masks.get(mi_row, mi_col);
  let edges = lfm.edges(EdgeDirection::Vertical, pli);
  let levels = lfm.levels(EdgeDirection::Vertical, pli);
  let (x0, y0) = plane_origin(mi_row, mi_col, ssx, ssy);
  let stride = plane.cfg.stride;
  let buf = plane.data_origin_mut();
  let mut emitted = 0;

  for r in (0..MI_SIZE_64X64)
    .step_by(2 << ssy)
    .take_while(|&r| (mi_row + r) << MI_SIZE_LOG2 < masks.height)
  {
    let row = r | ssy;
    let row_next = row + (1 << ssy);
    let first = row_masks(edges, row, ssx);
    // the second row only exists inside the frame
    let second = if mi_row + row_next < masks.mi_rows {
      row_masks(edges, row_next, ssx)
    } else {
      [0; 3]
    };
    let y = y0 + ((r << MI_SIZE_LOG2) >> ssy);

    emitted += filter_selectively_vert_row2(
      ssx,
      buf,
      y * stride + x0,
      stride,
      pli,
      [first, second],
      [&levels[row][ssx..], &levels[row_next][ssx..]],
      lfi,
      bit_depth,
      kernels,
    );
  }

  emitted
}

/// Horizontal edges of the superblock at `(mi_row, mi_col)`, one 4x4 row
/// at a time. The top row of the frame has no edge above it.
pub fn filter_block_plane_horz<T, K>(
  masks: &LoopFilterMasks, lfi: &LoopFilterInfo, plane: &mut Plane<T>,
  pli: usize, mi_row: usize, mi_col: usize, bit_depth: usize, kernels: &K,
) -> usize
where
  T: Pixel,
  K: LoopFilterKernels<T> + ?Sized,
{
  let (ssx, ssy) = masks.plane_dec(pli);
  let lfm = masks.get(mi_row, mi_col);
  let edges = lfm.edges(EdgeDirection::Horizontal, pli);
  let levels = lfm.levels(EdgeDirection::Horizontal, pli);
  let (x0, y0) = plane_origin(mi_row, mi_col, ssx, ssy);
  let stride = plane.cfg.stride;
  let buf = plane.data_origin_mut();
  let mut emitted = 0;

  for r in (0..MI_SIZE_64X64)
    .step_by(1 << ssy)
    .take_while(|&r| (mi_row + r) << MI_SIZE_LOG2 < masks.height)
  {
    if mi_row + r == 0 {
      continue;
    }
    let row = r | ssy;
    let y = y0 + ((r << MI_SIZE_LOG2) >> ssy);

    emitted += filter_selectively_horiz(
      ssx,
      buf,
      y * stride + x0,
      stride,
      pli,
      row_masks(edges, row, ssx),
      &levels[row][ssx..],
      lfi,
      bit_depth,
      kernels,
    );
  }

  emitted
}

/// Runs one direction of one superblock.
pub fn filter_block_plane<T, K>(
  masks: &LoopFilterMasks, lfi: &LoopFilterInfo, plane: &mut Plane<T>,
  pli: usize, mi_row: usize, mi_col: usize, bit_depth: usize, kernels: &K,
  dir: EdgeDirection,
) -> usize
where
  T: Pixel,
  K: LoopFilterKernels<T> + ?Sized,
{
  match dir {
    EdgeDirection::Vertical => filter_block_plane_vert(
      masks, lfi, plane, pli, mi_row, mi_col, bit_depth, kernels,
    ),
    EdgeDirection::Horizontal => filter_block_plane_horz(
      masks, lfi, plane, pli, mi_row, mi_col, bit_depth, kernels,
    ),
  }
}

/// Filters a whole plane: every superblock row gets its vertical edges
/// first, then its horizontal edges.
pub fn filter_plane<T, K>(
  masks: &LoopFilterMasks, lfi: &LoopFilterInfo, plane: &mut Plane<T>,
  pli: usize, bit_depth: usize, kernels: &K,
) -> usize
where
  T: Pixel,
  K: LoopFilterKernels<T> + ?Sized,
{
  let mut emitted = 0;
  for sby in 0..masks.sb_rows {
    let mi_row = sby * MI_SIZE_64X64;
    let before = emitted;
    for dir in [EdgeDirection::Vertical, EdgeDirection::Horizontal] {
      for sbx in 0..masks.sb_cols {
        emitted += filter_block_plane(
          masks,
          lfi,
          plane,
          pli,
          mi_row,
          sbx * MI_SIZE_64X64,
          bit_depth,
          kernels,
          dir,
        );
      }
    }
    log::trace!(
      "plane {} superblock row {}: {} segments",
      pli,
      sby,
      emitted - before
    );
  }
  emitted
}
