// Copyright (c) 2019-2022, The rav1e contributors. All rights reserved
//
// This source code is subject to the terms of the BSD 2 Clause License and
// the Alliance for Open Media Patent License 1.0. If the BSD 2 Clause License
// was not distributed with this source code in the LICENSE file, you can
// obtain it at www.aomedia.org/license/software. If the Alliance for Open
// Media Patent License 1.0 was not distributed with this source code in the
// PATENTS file, you can obtain it at www.aomedia.org/license/patent.

mod common;

use av1_lfmask::dispatch::filter_block_plane_vert;
use av1_lfmask::mask::EdgeDirection::*;
use av1_lfmask::partition::BlockSize::*;
use av1_lfmask::prelude::*;
use av1_lfmask::transform::TxSize::*;
use common::*;
use pretty_assertions::assert_eq;

fn mono(width: usize, height: usize) -> LoopFilter {
  let cfg = LoopFilterConfig::default()
    .with_size(width, height)
    .with_chroma_sampling(ChromaSampling::Cs400);
  LoopFilter::new(cfg).unwrap()
}

fn block(bsize: BlockSize, tx_size: TxSize, level: u8) -> Block {
  Block {
    bsize,
    tx_size,
    levels: FilterLevels::uniform(level),
    ..Default::default()
  }
}

fn inter_skip(bsize: BlockSize, tx_size: TxSize, level: u8) -> Block {
  Block { skip: true, is_inter: true, ..block(bsize, tx_size, level) }
}

fn store(lf: &mut LoopFilter, x: usize, y: usize, b: Block) {
  lf.masks_mut().store_block(BlockOffset::new(x, y), &b);
}

fn filter_mono(lf: &LoopFilter) -> Vec<KernelCall> {
  let mut planes = planes::<u8>(lf.config());
  record_plane(lf, &mut planes, 0)
}

#[test]
fn single_block_with_split_transform() {
  let mut lf = mono(16, 16);
  store(&mut lf, 0, 0, block(BLOCK_16X16, TX_8X8, 20));
  lf.build();

  let lfm = lf.masks().get(0, 0);
  let hor: Vec<_> =
    lfm.tx_size_hor[0][TX_8X8 as usize].positions().collect();
  assert_eq!(
    hor,
    [(0, 0), (0, 1), (0, 2), (0, 3), (2, 0), (2, 1), (2, 2), (2, 3)]
  );
  // the top row of the frame has no edge above it
  let above: Vec<_> = lfm.above[0][TX_8X8 as usize].positions().collect();
  assert_eq!(above, [(2, 0), (2, 1), (2, 2), (2, 3)]);
  assert!(lfm.above[0][TX_4X4 as usize].is_empty());
  assert!(lfm.above[0][TX_16X16 as usize].is_empty());

  let calls = filter_mono(&lf);
  let horz: Vec<_> = calls.iter().filter(|c| c.dir == Horizontal).collect();
  assert_eq!(segments(&calls, Horizontal), 4);
  assert!(horz.iter().all(|c| c.width == FilterWidth::Eight && c.y == 8));
  assert!(horz.iter().all(|c| c.thr == *lf.info().thresh(20)));
  assert_eq!(segments(&calls, Vertical), 4);
}

#[test]
fn neighbouring_blocks_pair_rows() {
  let mut lf = mono(16, 8);
  store(&mut lf, 0, 0, block(BLOCK_8X8, TX_8X8, 20));
  store(&mut lf, 2, 0, block(BLOCK_8X8, TX_8X8, 30));
  lf.build();

  let lfm = lf.masks().get(0, 0);
  let left: Vec<_> = lfm.left[0][TX_8X8 as usize].positions().collect();
  assert_eq!(left, [(0, 2), (1, 2)]);
  assert_eq!(lfm.lfl_ver[0][0][2], 30);

  // both 4x4 rows belong to the right block
  let thr = *lf.info().thresh(30);
  assert_eq!(
    filter_mono(&lf),
    [KernelCall {
      dir: Vertical,
      width: FilterWidth::Eight,
      x: 8,
      y: 0,
      thr,
      thr_next: Some(thr),
    }]
  );
}

#[test]
fn inter_skip_keeps_coding_block_borders() {
  let mut lf = mono(16, 8);
  store(&mut lf, 0, 0, inter_skip(BLOCK_8X8, TX_8X8, 10));
  store(&mut lf, 2, 0, inter_skip(BLOCK_8X8, TX_8X8, 10));
  lf.build();
  assert_eq!(lf.masks().get(0, 0).left[0][TX_8X8 as usize].count(), 2);
  assert_eq!(segments(&filter_mono(&lf), Vertical), 2);
}

#[test]
fn inter_skip_drops_inner_transform_edges() {
  let mut lf = mono(16, 8);
  store(&mut lf, 0, 0, inter_skip(BLOCK_16X8, TX_8X8, 10));
  lf.build();
  let lfm = lf.masks().get(0, 0);
  assert!(lfm.left[0].iter().all(Bitmask::is_empty));
  assert!(filter_mono(&lf).is_empty());

  // intra blocks coded without residual still filter their transforms
  let mut lf = mono(16, 8);
  let intra = Block { skip: true, ..block(BLOCK_16X8, TX_8X8, 10) };
  store(&mut lf, 0, 0, intra);
  lf.build();
  assert_eq!(segments(&filter_mono(&lf), Vertical), 2);
}

#[test]
fn subsampled_chroma_uses_odd_units() {
  let cfg = LoopFilterConfig::default().with_size(64, 64);
  let mut lf = LoopFilter::new(cfg).unwrap();
  let fb = uniform_frame(64, 64, &block(BLOCK_8X8, TX_4X4, 12));
  lf.store_frame_blocks(&fb);
  lf.build();

  let lfm = lf.masks().get(0, 0);
  for pli in 1..3 {
    for edges in [&lfm.left[pli], &lfm.above[pli]] {
      assert!(edges[1..].iter().all(Bitmask::is_empty));
      assert_eq!(edges[0].count(), 56);
      assert!(edges[0].positions().all(|(r, c)| r & 1 == 1 && c & 1 == 1));
    }
  }

  let mut planes = planes::<u8>(&cfg);
  let luma = record_plane(&lf, &mut planes, 0);
  assert_eq!(segments(&luma, Vertical), 15 * 16);
  assert_eq!(segments(&luma, Horizontal), 15 * 16);
  // every run of 4x4 edges is long enough to be paired
  assert_eq!(luma.len(), 15 * 16);

  let chroma = record_plane(&lf, &mut planes, 1);
  assert_eq!(segments(&chroma, Vertical), 7 * 8);
  assert_eq!(segments(&chroma, Horizontal), 7 * 8);
  assert_eq!(chroma.len(), 7 * 8);
  assert!(chroma.iter().all(|c| c.width == FilterWidth::Four));
  assert!(chroma.iter().all(|c| c.x < 32 && c.y < 32));
}

#[test]
fn mismatched_rows_are_filtered_separately() {
  let mut lf = mono(64, 64);
  let lfm = lf.masks_mut().get_mut(0, 0);
  lfm.left[0][TX_4X4 as usize].set(0, 4);
  lfm.left[0][TX_8X8 as usize].set(1, 4);
  lfm.lfl_ver[0][0][4] = 10;
  lfm.lfl_ver[0][1][4] = 20;

  let mut planes = planes::<u8>(lf.config());
  let rec = RecordingKernels::new();
  let n = filter_block_plane_vert(
    lf.masks(),
    lf.info(),
    &mut planes[0],
    0,
    0,
    0,
    8,
    &rec,
  );
  assert_eq!(n, 2);
  // wider classes go first
  assert_eq!(
    rec.take(),
    [
      KernelCall {
        dir: Vertical,
        width: FilterWidth::Eight,
        x: 16,
        y: 4,
        thr: *lf.info().thresh(20),
        thr_next: None,
      },
      KernelCall {
        dir: Vertical,
        width: FilterWidth::Four,
        x: 16,
        y: 0,
        thr: *lf.info().thresh(10),
        thr_next: None,
      },
    ]
  );
}

#[test]
fn zero_level_takes_neighbour_level() {
  for (left, right) in [(0, 25), (25, 0)] {
    let mut lf = mono(16, 8);
    store(&mut lf, 0, 0, block(BLOCK_8X8, TX_8X8, left));
    store(&mut lf, 2, 0, block(BLOCK_8X8, TX_8X8, right));
    lf.build();
    assert_eq!(lf.masks().get(0, 0).lfl_ver[0][0][2], 25);
    assert_eq!(lf.masks().get(0, 0).lfl_ver[0][1][2], 25);

    let calls = filter_mono(&lf);
    let thr = *lf.info().thresh(25);
    assert_eq!(calls.len(), 1);
    assert_eq!((calls[0].thr, calls[0].thr_next), (thr, Some(thr)));
  }
}

#[test]
fn large_transforms_use_widest_class() {
  let cfg = LoopFilterConfig::default().with_size(128, 64);
  let mut lf = LoopFilter::new(cfg).unwrap();
  let fb = uniform_frame(128, 64, &block(BLOCK_64X64, TX_64X64, 40));
  lf.store_frame_blocks(&fb);
  lf.build();

  let lfm = lf.masks().get(0, 16);
  assert_eq!(lfm.left[0][TX_16X16 as usize].count(), 16);
  assert_eq!(lfm.left[1][TX_16X16 as usize].count(), 8);
  assert!(lfm.left[0][TX_32X32 as usize].is_empty());

  let mut planes = planes::<u8>(&cfg);
  let luma = record_plane(&lf, &mut planes, 0);
  assert_eq!(segments(&luma, Vertical), 16);
  assert!(luma
    .iter()
    .all(|c| c.width == FilterWidth::Fourteen && c.x == 64));
  let chroma = record_plane(&lf, &mut planes, 2);
  assert_eq!(segments(&chroma, Vertical), 8);
  assert!(chroma.iter().all(|c| c.width == FilterWidth::Six && c.x == 32));
}

#[test]
fn tall_blocks_filter_in_422() {
  let cfg = LoopFilterConfig::default()
    .with_size(64, 64)
    .with_chroma_sampling(ChromaSampling::Cs422);
  let mut lf = LoopFilter::new(cfg).unwrap();
  store(&mut lf, 0, 0, block(BLOCK_32X64, TX_32X32, 20));
  store(&mut lf, 8, 0, block(BLOCK_32X64, TX_32X32, 20));
  lf.build();

  let mut planes = planes::<u8>(&cfg);
  let luma = record_plane(&lf, &mut planes, 0);
  assert_eq!(segments(&luma, Vertical), 16);
  assert_eq!(segments(&luma, Horizontal), 16);
  assert!(luma.iter().all(|c| c.width == FilterWidth::Fourteen));

  // 32x64 chroma blocks are coded as two 16x32 transforms
  for pli in 1..3 {
    let chroma = record_plane(&lf, &mut planes, pli);
    let (ver, hor): (Vec<&KernelCall>, Vec<&KernelCall>) =
      chroma.iter().partition(|c| c.dir == Vertical);
    assert_eq!(segments(&chroma, Vertical), 16);
    assert_eq!(segments(&chroma, Horizontal), 8);
    assert!(ver.iter().all(|c| c.x == 16));
    assert!(hor.iter().all(|c| c.y == 32 && c.x < 32));
    assert!(chroma.iter().all(|c| c.width == FilterWidth::Six));
  }
}

#[test]
fn high_bit_depth_frame_is_smoothed() {
  let cfg = LoopFilterConfig::default()
    .with_size(16, 8)
    .with_chroma_sampling(ChromaSampling::Cs400)
    .with_bit_depth(10);
  let mut lf = LoopFilter::new(cfg).unwrap();
  store(&mut lf, 0, 0, block(BLOCK_8X8, TX_8X8, 32));
  store(&mut lf, 2, 0, block(BLOCK_8X8, TX_8X8, 32));
  lf.build();

  let mut planes = planes::<u16>(&cfg);
  let stride = planes[0].cfg.stride;
  let data = planes[0].data_origin_mut();
  for y in 0..8 {
    for x in 0..16 {
      data[y * stride + x] = if x < 8 { 400 } else { 424 };
    }
  }

  let counts = lf.filter_frame(&mut planes, &RustKernels).unwrap();
  assert_eq!(counts.as_slice(), [2]);
  let row = &planes[0].data_origin()[..16];
  assert!(row[7] > 400 && row[8] < 424);
  assert!(row.windows(2).all(|w| w[0] <= w[1]));
  assert_eq!((row[0], row[15]), (400, 424));
}
