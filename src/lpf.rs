// Copyright (c) 2018-2022, The rav1e contributors. All rights reserved
//
// This source code is subject to the terms of the BSD 2 Clause License and
// the Alliance for Open Media Patent License 1.0. If the BSD 2 Clause License
// was not distributed with this source code in the LICENSE file, you can
// obtain it at www.aomedia.org/license/software. If the Alliance for Open
// Media Patent License 1.0 was not distributed with this source code in the
// PATENTS file, you can obtain it at www.aomedia.org/license/patent.

//! Loop filter thresholds and edge kernels.

use crate::mask::EdgeDirection;
use std::cmp;
use std::sync::Mutex;
use v_frame::pixel::Pixel;

pub const MAX_LOOP_FILTER: usize = 63;
pub const MAX_SHARPNESS: u8 = 7;

/// Samples filtered along one edge segment per kernel call.
pub const EDGE_SEGMENT: usize = 4;

/// Threshold profile of one filter level, in 8-bit units.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct LoopFilterThresh {
  pub mblim: u8,
  pub lim: u8,
  pub hev_thr: u8,
}

/// Thresholds for every filter level at a given sharpness.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LoopFilterInfo {
  lfthr: [LoopFilterThresh; MAX_LOOP_FILTER + 1],
  sharpness: u8,
}

impl LoopFilterInfo {
  pub fn new(sharpness: u8) -> Self {
    let mut lfi = LoopFilterInfo {
      lfthr: [LoopFilterThresh::default(); MAX_LOOP_FILTER + 1],
      sharpness: 0,
    };
    lfi.update_sharpness(sharpness);
    lfi
  }

  /// Recomputes the table; sharpness tightens the interior limit.
  pub fn update_sharpness(&mut self, sharpness: u8) {
    let sharpness = cmp::min(sharpness, MAX_SHARPNESS);
    let shift = (sharpness > 0) as usize + (sharpness > 4) as usize;
    for (lvl, thr) in self.lfthr.iter_mut().enumerate() {
      let mut limit = lvl >> shift;
      if sharpness > 0 {
        limit = cmp::min(limit, 9 - sharpness as usize);
      }
      let limit = cmp::max(limit, 1);
      *thr = LoopFilterThresh {
        mblim: (2 * (lvl + 2) + limit) as u8,
        lim: limit as u8,
        hev_thr: (lvl >> 4) as u8,
      };
    }
    self.sharpness = sharpness;
  }

  #[inline]
  pub const fn sharpness(&self) -> u8 {
    self.sharpness
  }

  #[inline]
  pub fn thresh(&self, level: u8) -> &LoopFilterThresh {
    &self.lfthr[cmp::min(level as usize, MAX_LOOP_FILTER)]
  }
}

impl Default for LoopFilterInfo {
  fn default() -> Self {
    Self::new(0)
  }
}

/// Kernel width in taps.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum FilterWidth {
  Four = 4,
  Six = 6,
  Eight = 8,
  Fourteen = 14,
}

impl FilterWidth {
  /// Kernel used for an edge of the given size class (4, 8 or 16 samples).
  #[inline]
  pub const fn for_edge(pli: usize, size_class: usize) -> FilterWidth {
    match (pli, size_class) {
      (_, 4) => FilterWidth::Four,
      (0, 8) => FilterWidth::Eight,
      (0, _) => FilterWidth::Fourteen,
      _ => FilterWidth::Six,
    }
  }

  /// Samples read on each side of the edge.
  #[inline]
  pub const fn reach(self) -> usize {
    self as usize / 2
  }
}

/// The leaf filter capability consumed by the dispatcher.
///
/// `buf` holds the whole plane with row pitch `stride`. `edge` indexes the
/// first sample on the right of (vertical edges) or below (horizontal
/// edges) the edge being filtered. Single calls filter [`EDGE_SEGMENT`]
/// samples along the edge, dual calls filter two consecutive segments with
/// independent thresholds.
pub trait LoopFilterKernels<T: Pixel> {
  fn filter(
    &self, dir: EdgeDirection, width: FilterWidth, buf: &mut [T],
    edge: usize, stride: usize, thr: &LoopFilterThresh, bit_depth: usize,
  );

  fn filter_dual(
    &self, dir: EdgeDirection, width: FilterWidth, buf: &mut [T],
    edge: usize, stride: usize, thr0: &LoopFilterThresh,
    thr1: &LoopFilterThresh, bit_depth: usize,
  );
}

/// Thresholds scaled to the working bit depth.
#[derive(Copy, Clone, Debug)]
struct EdgeLimits {
  blimit: i32,
  limit: i32,
  thresh: i32,
  flat: i32,
  shift: usize,
}

impl EdgeLimits {
  #[inline]
  fn new(thr: &LoopFilterThresh, bit_depth: usize) -> Self {
    let shift = bit_depth - 8;
    EdgeLimits {
      blimit: (thr.mblim as i32) << shift,
      limit: (thr.lim as i32) << shift,
      thresh: (thr.hev_thr as i32) << shift,
      flat: 1 << shift,
      shift,
    }
  }
}

#[inline]
fn clamp(v: i32, lo: i32, hi: i32) -> i32 {
  cmp::max(lo, cmp::min(v, hi))
}

#[inline]
fn hev4(thresh: i32, [p1, p0, q0, q1]: [i32; 4]) -> bool {
  (p1 - p0).abs() > thresh || (q1 - q0).abs() > thresh
}

// four taps, 4 outputs (two are trivial)
#[inline]
fn filter_narrow2([p1, p0, q0, q1]: [i32; 4], shift: usize) -> [i32; 4] {
  let lo = -128 << shift;
  let hi = (128 << shift) - 1;
  let outer_filter = clamp(p1 - q1, lo, hi);
  let base_filter = clamp(outer_filter + 3 * (q0 - p0), lo, hi);
  let filter1 = clamp(base_filter + 4, lo, hi) >> 3;
  let filter2 = clamp(base_filter + 3, lo, hi) >> 3;
  [
    p1,
    clamp(p0 + filter2, 0, (256 << shift) - 1),
    clamp(q0 - filter1, 0, (256 << shift) - 1),
    q1,
  ]
}

// four taps, 4 outputs
#[inline]
fn filter_narrow4([p1, p0, q0, q1]: [i32; 4], shift: usize) -> [i32; 4] {
  let lo = -128 << shift;
  let hi = (128 << shift) - 1;
  let base_filter = clamp(3 * (q0 - p0), lo, hi);
  let filter1 = clamp(base_filter + 4, lo, hi) >> 3;
  let filter2 = clamp(base_filter + 3, lo, hi) >> 3;
  let filter3 = (filter1 + 1) >> 1;
  [
    clamp(p1 + filter3, 0, (256 << shift) - 1),
    clamp(p0 + filter2, 0, (256 << shift) - 1),
    clamp(q0 - filter1, 0, (256 << shift) - 1),
    clamp(q1 - filter3, 0, (256 << shift) - 1),
  ]
}

#[inline]
fn filter_narrow(taps: [i32; 4], lim: &EdgeLimits) -> [i32; 4] {
  if hev4(lim.thresh, taps) {
    filter_narrow2(taps, lim.shift)
  } else {
    filter_narrow4(taps, lim.shift)
  }
}

// six taps, 4 outputs
#[rustfmt::skip]
#[inline]
fn filter_wide6([p2, p1, p0, q0, q1, q2]: [i32; 6]) -> [i32; 4] {
  [(p2*3 + p1*2 + p0*2 + q0   + (1<<2)) >> 3,
   (p2   + p1*2 + p0*2 + q0*2 + q1   + (1<<2)) >> 3,
          (p1   + p0*2 + q0*2 + q1*2 + q2   + (1<<2)) >> 3,
                 (p0   + q0*2 + q1*2 + q2*3 + (1<<2)) >> 3]
}

// eight taps, 6 outputs
#[rustfmt::skip]
#[inline]
fn filter_wide8(
  [p3, p2, p1, p0, q0, q1, q2, q3]: [i32; 8],
) -> [i32; 6] {
  [(p3*3 + p2*2 + p1   + p0   + q0   + (1<<2)) >> 3,
   (p3*2 + p2   + p1*2 + p0   + q0   + q1   + (1<<2)) >> 3,
   (p3   + p2   + p1   + p0*2 + q0   + q1   + q2   + (1<<2)) >> 3,
          (p2   + p1   + p0   + q0*2 + q1   + q2   + q3   + (1<<2)) >> 3,
                 (p1   + p0   + q0   + q1*2 + q2   + q3*2 + (1<<2)) >> 3,
                        (p0   + q0   + q1   + q2*2 + q3*3 + (1<<2)) >> 3]
}

// fourteen taps, 12 outputs
#[rustfmt::skip]
#[inline]
fn filter_wide14(
  [p6, p5, p4, p3, p2, p1, p0, q0, q1, q2, q3, q4, q5, q6]: [i32; 14],
) -> [i32; 12] {
  [(p6*7 + p5*2 + p4*2 + p3   + p2   + p1   + p0   + q0   + (1<<3)) >> 4,
   (p6*5 + p5*2 + p4*2 + p3*2 + p2   + p1   + p0   + q0   + q1   + (1<<3)) >> 4,
   (p6*4 + p5   + p4*2 + p3*2 + p2*2 + p1   + p0   + q0   + q1   + q2   + (1<<3)) >> 4,
   (p6*3 + p5   + p4   + p3*2 + p2*2 + p1*2 + p0   + q0   + q1   + q2   + q3   + (1<<3)) >> 4,
   (p6*2 + p5   + p4   + p3   + p2*2 + p1*2 + p0*2 + q0   + q1   + q2   + q3   + q4   + (1<<3)) >> 4,
   (p6   + p5   + p4   + p3   + p2   + p1*2 + p0*2 + q0*2 + q1   + q2   + q3   + q4   + q5   + (1<<3)) >> 4,
          (p5   + p4   + p3   + p2   + p1   + p0*2 + q0*2 + q1*2 + q2   + q3   + q4   + q5   + q6 + (1<<3)) >> 4,
                 (p4   + p3   + p2   + p1   + p0   + q0*2 + q1*2 + q2*2 + q3   + q4   + q5   + q6*2 + (1<<3)) >> 4,
                        (p3   + p2   + p1   + p0   + q0   + q1*2 + q2*2 + q3*2 + q4   + q5   + q6*3 + (1<<3)) >> 4,
                               (p2   + p1   + p0   + q0   + q1   + q2*2 + q3*2 + q4*2 + q5   + q6*4 + (1<<3)) >> 4,
                                      (p1   + p0   + q0   + q1   + q2   + q3*2 + q4*2 + q5*2 + q6*5 + (1<<3)) >> 4,
                                             (p0   + q0   + q1   + q2   + q3   + q4*2 + q5*2 + q6*7 + (1<<3)) >> 4]
}

#[inline]
fn mask4(lim: &EdgeLimits, [p1, p0, q0, q1]: [i32; 4]) -> bool {
  (p1 - p0).abs() <= lim.limit
    && (q1 - q0).abs() <= lim.limit
    && (p0 - q0).abs() * 2 + (p1 - q1).abs() / 2 <= lim.blimit
}

#[inline]
fn mask6(lim: &EdgeLimits, [p2, p1, p0, q0, q1, q2]: [i32; 6]) -> bool {
  (p2 - p1).abs() <= lim.limit
    && (q2 - q1).abs() <= lim.limit
    && mask4(lim, [p1, p0, q0, q1])
}

#[inline]
fn flat6(flat: i32, [p2, p1, p0, q0, q1, q2]: [i32; 6]) -> bool {
  (p1 - p0).abs() <= flat
    && (q1 - q0).abs() <= flat
    && (p2 - p0).abs() <= flat
    && (q2 - q0).abs() <= flat
}

#[inline]
fn mask8(
  lim: &EdgeLimits, [p3, p2, p1, p0, q0, q1, q2, q3]: [i32; 8],
) -> bool {
  (p3 - p2).abs() <= lim.limit
    && (q3 - q2).abs() <= lim.limit
    && mask6(lim, [p2, p1, p0, q0, q1, q2])
}

#[inline]
fn flat8(flat: i32, [p3, p2, p1, p0, q0, q1, q2, q3]: [i32; 8]) -> bool {
  (p3 - p0).abs() <= flat
    && (q3 - q0).abs() <= flat
    && flat6(flat, [p2, p1, p0, q0, q1, q2])
}

#[inline]
fn flat14_outer(
  flat: i32, [p6, p5, p4, p0, q0, q4, q5, q6]: [i32; 8],
) -> bool {
  (p4 - p0).abs() <= flat
    && (q4 - q0).abs() <= flat
    && (p5 - p0).abs() <= flat
    && (q5 - q0).abs() <= flat
    && (p6 - p0).abs() <= flat
    && (q6 - q0).abs() <= flat
}

/// Reads `N` samples `pitch` apart.
#[inline]
fn taps<T: Pixel, const N: usize>(line: &[T], pitch: usize) -> [i32; N] {
  std::array::from_fn(|i| line[i * pitch].into())
}

#[inline]
fn stride_copy<T: Pixel>(dst: &mut [T], src: &[i32], pitch: usize) {
  for (dst, &src) in dst.iter_mut().step_by(pitch).take(src.len()).zip(src)
  {
    *dst = T::cast_from(src);
  }
}

// `line[0]` is 2 taps back from the edge
fn deblock_size4<T: Pixel>(line: &mut [T], pitch: usize, lim: &EdgeLimits) {
  let p = taps::<T, 4>(line, pitch);
  if mask4(lim, p) {
    stride_copy(line, &filter_narrow(p, lim), pitch);
  }
}

// `line[0]` is 3 taps back from the edge
fn deblock_size6<T: Pixel>(line: &mut [T], pitch: usize, lim: &EdgeLimits) {
  let p = taps::<T, 6>(line, pitch);
  if mask6(lim, p) {
    let x = if flat6(lim.flat, p) {
      filter_wide6(p)
    } else {
      filter_narrow([p[1], p[2], p[3], p[4]], lim)
    };
    stride_copy(&mut line[pitch..], &x, pitch);
  }
}

// `line[0]` is 4 taps back from the edge
fn deblock_size8<T: Pixel>(line: &mut [T], pitch: usize, lim: &EdgeLimits) {
  let p = taps::<T, 8>(line, pitch);
  if mask8(lim, p) {
    if flat8(lim.flat, p) {
      stride_copy(&mut line[pitch..], &filter_wide8(p), pitch);
    } else {
      let x = filter_narrow([p[2], p[3], p[4], p[5]], lim);
      stride_copy(&mut line[pitch * 2..], &x, pitch);
    }
  }
}

// `line[0]` is 7 taps back from the edge, up to 12 outputs
fn deblock_size14<T: Pixel>(
  line: &mut [T], pitch: usize, lim: &EdgeLimits,
) {
  let p = taps::<T, 14>(line, pitch);
  let inner = [p[3], p[4], p[5], p[6], p[7], p[8], p[9], p[10]];
  // 'mask' test
  if mask8(lim, inner) {
    // inner flatness test
    if flat8(lim.flat, inner) {
      // outer flatness test
      let outer = [p[0], p[1], p[2], p[6], p[7], p[11], p[12], p[13]];
      if flat14_outer(lim.flat, outer) {
        // sufficient flatness across 14 pixel width; run full-width filter
        stride_copy(&mut line[pitch..], &filter_wide14(p), pitch);
      } else {
        // only flat in inner area, run 8-tap
        stride_copy(&mut line[pitch * 4..], &filter_wide8(inner), pitch);
      }
    } else {
      // not flat, run narrow filter
      let x = filter_narrow([p[5], p[6], p[7], p[8]], lim);
      stride_copy(&mut line[pitch * 5..], &x, pitch);
    }
  }
}

/// Filters `EDGE_SEGMENT` lines of one edge.
fn filter_segment<T: Pixel>(
  buf: &mut [T], edge: usize, stride: usize, dir: EdgeDirection,
  width: FilterWidth, thr: &LoopFilterThresh, bit_depth: usize,
) {
  let lim = EdgeLimits::new(thr, bit_depth);
  // pitch crosses the edge, along follows it
  let (pitch, along) = match dir {
    EdgeDirection::Vertical => (1, stride),
    EdgeDirection::Horizontal => (stride, 1),
  };
  let start = edge - width.reach() * pitch;
  for i in 0..EDGE_SEGMENT {
    let line = &mut buf[start + i * along..];
    match width {
      FilterWidth::Four => deblock_size4(line, pitch, &lim),
      FilterWidth::Six => deblock_size6(line, pitch, &lim),
      FilterWidth::Eight => deblock_size8(line, pitch, &lim),
      FilterWidth::Fourteen => deblock_size14(line, pitch, &lim),
    }
  }
}

/// Offset of the second segment of a dual call.
#[inline]
const fn second_segment(
  dir: EdgeDirection, edge: usize, stride: usize,
) -> usize {
  match dir {
    EdgeDirection::Vertical => edge + EDGE_SEGMENT * stride,
    EdgeDirection::Horizontal => edge + EDGE_SEGMENT,
  }
}

macro_rules! decl_lpf_fns {
  ($(($dir:ident, $DIR:ident, $w:literal, $W:ident)),+) => {
    paste::item! {
      $(
        pub fn [<lpf_ $dir _ $w>]<T: Pixel>(
          buf: &mut [T], edge: usize, stride: usize,
          thr: &LoopFilterThresh, bit_depth: usize,
        ) {
          filter_segment(
            buf, edge, stride, EdgeDirection::$DIR, FilterWidth::$W, thr,
            bit_depth,
          );
        }

        pub fn [<lpf_ $dir _ $w _dual>]<T: Pixel>(
          buf: &mut [T], edge: usize, stride: usize,
          thr0: &LoopFilterThresh, thr1: &LoopFilterThresh,
          bit_depth: usize,
        ) {
          [<lpf_ $dir _ $w>](buf, edge, stride, thr0, bit_depth);
          [<lpf_ $dir _ $w>](
            buf,
            second_segment(EdgeDirection::$DIR, edge, stride),
            stride,
            thr1,
            bit_depth,
          );
        }
      )*
    }
  };
}

decl_lpf_fns! {
  (vertical, Vertical, 4, Four), (vertical, Vertical, 6, Six),
  (vertical, Vertical, 8, Eight), (vertical, Vertical, 14, Fourteen),
  (horizontal, Horizontal, 4, Four), (horizontal, Horizontal, 6, Six),
  (horizontal, Horizontal, 8, Eight), (horizontal, Horizontal, 14, Fourteen)
}

/// Portable implementation of the AV1 edge kernels.
#[derive(Copy, Clone, Debug, Default)]
pub struct RustKernels;

impl<T: Pixel> LoopFilterKernels<T> for RustKernels {
  fn filter(
    &self, dir: EdgeDirection, width: FilterWidth, buf: &mut [T],
    edge: usize, stride: usize, thr: &LoopFilterThresh, bit_depth: usize,
  ) {
    use EdgeDirection::*;
    use FilterWidth::*;
    let f = match (dir, width) {
      (Vertical, Four) => lpf_vertical_4::<T>,
      (Vertical, Six) => lpf_vertical_6::<T>,
      (Vertical, Eight) => lpf_vertical_8::<T>,
      (Vertical, Fourteen) => lpf_vertical_14::<T>,
      (Horizontal, Four) => lpf_horizontal_4::<T>,
      (Horizontal, Six) => lpf_horizontal_6::<T>,
      (Horizontal, Eight) => lpf_horizontal_8::<T>,
      (Horizontal, Fourteen) => lpf_horizontal_14::<T>,
    };
    f(buf, edge, stride, thr, bit_depth);
  }

  fn filter_dual(
    &self, dir: EdgeDirection, width: FilterWidth, buf: &mut [T],
    edge: usize, stride: usize, thr0: &LoopFilterThresh,
    thr1: &LoopFilterThresh, bit_depth: usize,
  ) {
    use EdgeDirection::*;
    use FilterWidth::*;
    let f = match (dir, width) {
      (Vertical, Four) => lpf_vertical_4_dual::<T>,
      (Vertical, Six) => lpf_vertical_6_dual::<T>,
      (Vertical, Eight) => lpf_vertical_8_dual::<T>,
      (Vertical, Fourteen) => lpf_vertical_14_dual::<T>,
      (Horizontal, Four) => lpf_horizontal_4_dual::<T>,
      (Horizontal, Six) => lpf_horizontal_6_dual::<T>,
      (Horizontal, Eight) => lpf_horizontal_8_dual::<T>,
      (Horizontal, Fourteen) => lpf_horizontal_14_dual::<T>,
    };
    f(buf, edge, stride, thr0, thr1, bit_depth);
  }
}

/// One kernel invocation as seen by [`RecordingKernels`].
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct KernelCall {
  pub dir: EdgeDirection,
  pub width: FilterWidth,
  /// Plane coordinates of the first filtered sample past the edge.
  pub x: usize,
  pub y: usize,
  pub thr: LoopFilterThresh,
  /// Thresholds of the second segment of a dual call.
  pub thr_next: Option<LoopFilterThresh>,
}

impl KernelCall {
  /// 4-sample edge segments covered by the call.
  #[inline]
  pub const fn segments(&self) -> usize {
    if self.thr_next.is_some() {
      2
    } else {
      1
    }
  }
}

/// Kernels that log every call and leave the pixels untouched.
#[derive(Debug, Default)]
pub struct RecordingKernels {
  calls: Mutex<Vec<KernelCall>>,
}

impl RecordingKernels {
  pub fn new() -> Self {
    Self::default()
  }

  /// Drains the recorded calls.
  pub fn take(&self) -> Vec<KernelCall> {
    match self.calls.lock() {
      Ok(mut calls) => std::mem::take(&mut *calls),
      Err(poisoned) => std::mem::take(&mut *poisoned.into_inner()),
    }
  }

  fn push(&self, call: KernelCall) {
    match self.calls.lock() {
      Ok(mut calls) => calls.push(call),
      Err(poisoned) => poisoned.into_inner().push(call),
    }
  }
}

impl<T: Pixel> LoopFilterKernels<T> for RecordingKernels {
  fn filter(
    &self, dir: EdgeDirection, width: FilterWidth, _buf: &mut [T],
    edge: usize, stride: usize, thr: &LoopFilterThresh, _bit_depth: usize,
  ) {
    self.push(KernelCall {
      dir,
      width,
      x: edge % stride,
      y: edge / stride,
      thr: *thr,
      thr_next: None,
    });
  }

  fn filter_dual(
    &self, dir: EdgeDirection, width: FilterWidth, _buf: &mut [T],
    edge: usize, stride: usize, thr0: &LoopFilterThresh,
    thr1: &LoopFilterThresh, _bit_depth: usize,
  ) {
    self.push(KernelCall {
      dir,
      width,
      x: edge % stride,
      y: edge / stride,
      thr: *thr0,
      thr_next: Some(*thr1),
    });
  }
}
