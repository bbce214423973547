// Copyright (c) 2019-2022, The rav1e contributors. All rights reserved
//
// This source code is subject to the terms of the BSD 2 Clause License and
// the Alliance for Open Media Patent License 1.0. If the BSD 2 Clause License
// was not distributed with this source code in the LICENSE file, you can
// obtain it at www.aomedia.org/license/software. If the Alliance for Open
// Media Patent License 1.0 was not distributed with this source code in the
// PATENTS file, you can obtain it at www.aomedia.org/license/patent.

#![allow(dead_code)]

use av1_lfmask::dispatch::filter_plane;
use av1_lfmask::partition::MI_SIZE_64X64;
use av1_lfmask::prelude::*;
use num_traits::FromPrimitive;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaChaRng;

pub fn rng(seed: u8) -> ChaChaRng {
  ChaChaRng::from_seed([seed; 32])
}

/// Zeroed planes matching `cfg`, with room for the filter margin.
pub fn planes<T: Pixel>(cfg: &LoopFilterConfig) -> Vec<Plane<T>> {
  let (xdec, ydec) = cfg.decimation();
  let (cw, ch) =
    cfg.chroma_sampling.get_chroma_dimensions(cfg.width, cfg.height);
  let mut planes = vec![Plane::new(cfg.width, cfg.height, 0, 0, 8, 8)];
  for _ in 1..cfg.planes() {
    planes.push(Plane::new(cw, ch, xdec, ydec, 8, 8));
  }
  planes
}

/// Fills every visible sample with noise around a per-4x4 base value, so
/// that both filtered and unfiltered edges appear.
pub fn fill_planes<T: Pixel>(
  ra: &mut ChaChaRng, planes: &mut [Plane<T>], bit_depth: usize,
) {
  let max = (1 << bit_depth) - 1;
  for plane in planes.iter_mut() {
    let (w, h) = (plane.cfg.width, plane.cfg.height);
    let stride = plane.cfg.stride;
    let units = (w + 3) / 4;
    let bases: Vec<i32> =
      (0..units * ((h + 3) / 4)).map(|_| ra.gen_range(0..=max)).collect();
    let data = plane.data_origin_mut();
    for y in 0..h {
      for x in 0..w {
        let base = bases[(y / 4) * units + x / 4];
        let v = (base + ra.gen_range(-3..=3)).clamp(0, max);
        data[y * stride + x] = T::cast_from(v);
      }
    }
  }
}

/// The samples inside the plane's visible area, row by row.
pub fn visible<T: Pixel>(plane: &Plane<T>) -> Vec<T> {
  let (w, h) = (plane.cfg.width, plane.cfg.height);
  let stride = plane.cfg.stride;
  let data = plane.data_origin();
  (0..h).flat_map(|y| data[y * stride..y * stride + w].to_vec()).collect()
}

fn random_block(ra: &mut ChaChaRng, bsize: BlockSize) -> Block {
  let tx_sizes: Vec<TxSize> = (0..TxSize::TX_SIZES_ALL)
    .filter_map(TxSize::from_usize)
    .filter(|tx| tx.width() <= bsize.width() && tx.height() <= bsize.height())
    .collect();
  let mut level =
    || if ra.gen_ratio(1, 4) { 0 } else { ra.gen_range(1..64) };
  let levels =
    FilterLevels { y_ver: level(), y_hor: level(), u: level(), v: level() };
  let is_inter = ra.gen_bool(0.5);
  Block {
    bsize,
    tx_size: tx_sizes[ra.gen_range(0..tx_sizes.len())],
    skip: is_inter && ra.gen_bool(0.5),
    is_inter,
    levels,
  }
}

/// Recursively partitions a square block. Squares stop splitting at `min`
/// samples; their halves and quarters may be narrower. Splits whose
/// chroma blocks would not exist under `dec` are coded as a single block.
fn partition(
  ra: &mut ChaChaRng, fb: &mut FrameBlocks, bo: BlockOffset, size: usize,
  min: usize, four_way: bool, dec: (usize, usize),
) {
  let w = size;
  let choice = ra.gen_range(0..if size > min { 6 } else { 3 });
  let split: &[(usize, usize, usize, usize)] = match choice {
    // none, horz, vert
    0 => &[(0, 0, w, w)],
    1 => &[(0, 0, w, w / 2), (0, w / 2, w, w / 2)],
    2 => &[(0, 0, w / 2, w), (w / 2, 0, w / 2, w)],
    // horz4, vert4
    3 if four_way => &[
      (0, 0, w, w / 4),
      (0, w / 4, w, w / 4),
      (0, w / 2, w, w / 4),
      (0, 3 * w / 4, w, w / 4),
    ],
    4 if four_way => &[
      (0, 0, w / 4, w),
      (w / 4, 0, w / 4, w),
      (w / 2, 0, w / 4, w),
      (3 * w / 4, 0, w / 4, w),
    ],
    _ => {
      for (dx, dy) in [(0, 0), (1, 0), (0, 1), (1, 1)] {
        let half = size / 2;
        partition(
          ra,
          fb,
          bo.with_offset(dx * half / 4, dy * half / 4),
          half,
          min,
          four_way,
          dec,
        );
      }
      return;
    }
  };
  let chroma_ok = |&(_, _, bw, bh): &(usize, usize, usize, usize)| {
    BlockSize::from_width_and_height_opt(bw, bh)
      .and_then(|bsize| bsize.subsampled_size(dec.0, dec.1))
      .is_ok()
  };
  let whole = [(0, 0, w, w)];
  let split = if split.iter().all(chroma_ok) { split } else { &whole[..] };
  for &(x, y, bw, bh) in split {
    let Ok(bsize) = BlockSize::from_width_and_height_opt(bw, bh) else {
      continue;
    };
    let sub = bo.with_offset(x / 4, y / 4);
    if sub.x < fb.cols && sub.y < fb.rows {
      let block = random_block(ra, bsize);
      fb.set_block(sub, &block);
    }
  }
}

/// A frame of random coding blocks, transforms, skip flags and levels.
/// `four_way` adds the 4:1 partitions.
pub fn random_frame(
  ra: &mut ChaChaRng, width: usize, height: usize, four_way: bool,
) -> FrameBlocks {
  random_frame_for(ra, width, height, four_way, ChromaSampling::Cs444)
}

/// Like [`random_frame`], restricted to block shapes that have a chroma
/// block under `cs`, so 4:2:2 frames never hold 4-sample wide blocks.
pub fn random_frame_for(
  ra: &mut ChaChaRng, width: usize, height: usize, four_way: bool,
  cs: ChromaSampling,
) -> FrameBlocks {
  let dec = cs.get_decimation().unwrap_or((0, 0));
  let mut fb = FrameBlocks::new((width + 3) / 4, (height + 3) / 4);
  for y in (0..fb.rows).step_by(MI_SIZE_64X64) {
    for x in (0..fb.cols).step_by(MI_SIZE_64X64) {
      partition(ra, &mut fb, BlockOffset::new(x, y), 64, 8, four_way, dec);
    }
  }
  fb
}

/// A frame tiled by one block shape.
pub fn uniform_frame(
  width: usize, height: usize, block: &Block,
) -> FrameBlocks {
  let mut fb = FrameBlocks::new((width + 3) / 4, (height + 3) / 4);
  for y in (0..fb.rows).step_by(block.bsize.height_mi()) {
    for x in (0..fb.cols).step_by(block.bsize.width_mi()) {
      fb.set_block(BlockOffset::new(x, y), block);
    }
  }
  fb
}

/// Runs the masked dispatcher over one plane and returns its kernel calls.
pub fn record_plane<T: Pixel>(
  lf: &LoopFilter, planes: &mut [Plane<T>], pli: usize,
) -> Vec<KernelCall> {
  let rec = RecordingKernels::new();
  let segments = filter_plane(
    lf.masks(),
    lf.info(),
    &mut planes[pli],
    pli,
    lf.config().bit_depth,
    &rec,
  );
  let calls = rec.take();
  let recorded: usize = calls.iter().map(KernelCall::segments).sum();
  assert_eq!(segments, recorded);
  calls
}

pub fn segments(calls: &[KernelCall], dir: EdgeDirection) -> usize {
  calls.iter().filter(|c| c.dir == dir).map(KernelCall::segments).sum()
}
