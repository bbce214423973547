// Copyright (c) 2017-2022, The rav1e contributors. All rights reserved
//
// This source code is subject to the terms of the BSD 2 Clause License and
// the Alliance for Open Media Patent License 1.0. If the BSD 2 Clause License
// was not distributed with this source code in the LICENSE file, you can
// obtain it at www.aomedia.org/license/software. If the Alliance for Open
// Media Patent License 1.0 was not distributed with this source code in the
// PATENTS file, you can obtain it at www.aomedia.org/license/patent.

//! Deblocking straight from per-4x4 block metadata, without masks.
//!
//! Decisions use the same sampling as the mask builder: transform, skip
//! and block border come from the even 4x4 unit covering a plane unit, the
//! level from the odd one in each subsampled direction.

use crate::blocks::{Block, FrameBlocks};
use crate::lpf::*;
use crate::mask::EdgeDirection;
use crate::partition::MI_SIZE_LOG2;
use crate::transform::TxSize::TX_16X16;
use v_frame::pixel::Pixel;
use v_frame::plane::Plane;

/// Transform extent across an edge of direction `dir`, in plane samples.
fn tx_extent(
  block: &Block, pli: usize, xdec: usize, ydec: usize, dir: EdgeDirection,
) -> usize {
  let tx_size = if pli == 0 {
    block.tx_size
  } else {
    block.bsize.largest_chroma_tx_size(xdec, ydec)
  };
  match dir {
    EdgeDirection::Vertical => tx_size.width(),
    EdgeDirection::Horizontal => tx_size.height(),
  }
}

/// Size class in samples and level of the edge in front of plane unit
/// `(row, col)`, if it is filtered.
fn edge_at(
  blocks: &FrameBlocks, pli: usize, xdec: usize, ydec: usize,
  dir: EdgeDirection, row: usize, col: usize,
) -> Option<(usize, u8)> {
  let (prev_row, prev_col, pos) = match dir {
    EdgeDirection::Vertical => (row, col - 1, col),
    EdgeDirection::Horizontal => (row - 1, col, row),
  };
  let cur = &blocks[row << ydec][col << xdec];
  let prev = &blocks[prev_row << ydec][prev_col << xdec];

  let cur_extent = tx_extent(cur, pli, xdec, ydec, dir);
  if (pos << MI_SIZE_LOG2) % cur_extent != 0 {
    return None;
  }

  let level_at = |r: usize, c: usize| {
    blocks[(r << ydec) | ydec][(c << xdec) | xdec].levels.get(pli, dir)
  };
  let level = level_at(row, col);
  let prev_level = level_at(prev_row, prev_col);
  if level == 0 && prev_level == 0 {
    return None;
  }

  // blocks are aligned to their own size
  let border = match dir {
    EdgeDirection::Vertical => (col << xdec) % cur.bsize.width_mi() == 0,
    EdgeDirection::Horizontal => (row << ydec) % cur.bsize.height_mi() == 0,
  };
  if cur.is_inter_skip() && prev.is_inter_skip() && !border {
    return None;
  }

  let size_class = cur_extent
    .min(tx_extent(prev, pli, xdec, ydec, dir))
    .min(TX_16X16.width());
  Some((size_class, if level != 0 { level } else { prev_level }))
}

/// Filters every edge of one plane, all vertical edges first.
///
/// Returns the number of 4-sample edge segments filtered.
pub fn deblock_plane<T, K>(
  blocks: &FrameBlocks, lfi: &LoopFilterInfo, plane: &mut Plane<T>,
  pli: usize, bit_depth: usize, kernels: &K,
) -> usize
where
  T: Pixel,
  K: LoopFilterKernels<T> + ?Sized,
{
  let xdec = plane.cfg.xdec;
  let ydec = plane.cfg.ydec;
  let cols = (plane.cfg.width + 3) >> MI_SIZE_LOG2;
  let rows = (plane.cfg.height + 3) >> MI_SIZE_LOG2;
  let stride = plane.cfg.stride;
  let buf = plane.data_origin_mut();
  let mut emitted = 0;

  for dir in [EdgeDirection::Vertical, EdgeDirection::Horizontal] {
    let (first_row, first_col) = match dir {
      EdgeDirection::Vertical => (0, 1),
      EdgeDirection::Horizontal => (1, 0),
    };
    for row in first_row..rows {
      for col in first_col..cols {
        let Some((size_class, level)) =
          edge_at(blocks, pli, xdec, ydec, dir, row, col)
        else {
          continue;
        };
        kernels.filter(
          dir,
          FilterWidth::for_edge(pli, size_class),
          buf,
          (row * stride + col) << MI_SIZE_LOG2,
          stride,
          lfi.thresh(level),
          bit_depth,
        );
        emitted += 1;
      }
    }
  }

  emitted
}

/// Filters the first `planes.len()` planes of a frame.
pub fn deblock_frame<T, K>(
  blocks: &FrameBlocks, lfi: &LoopFilterInfo, planes: &mut [Plane<T>],
  bit_depth: usize, kernels: &K,
) -> usize
where
  T: Pixel,
  K: LoopFilterKernels<T> + ?Sized,
{
  planes
    .iter_mut()
    .enumerate()
    .map(|(pli, plane)| {
      deblock_plane(blocks, lfi, plane, pli, bit_depth, kernels)
    })
    .sum()
}
