// Copyright (c) 2018-2022, The rav1e contributors. All rights reserved
//
// This source code is subject to the terms of the BSD 2 Clause License and
// the Alliance for Open Media Patent License 1.0. If the BSD 2 Clause License
// was not distributed with this source code in the LICENSE file, you can
// obtain it at www.aomedia.org/license/software. If the Alliance for Open
// Media Patent License 1.0 was not distributed with this source code in the
// PATENTS file, you can obtain it at www.aomedia.org/license/patent.

//! Frame-level entry points.

use crate::blocks::FrameBlocks;
use crate::builder::build_bitmasks;
use crate::dispatch::filter_plane;
use crate::lpf::{LoopFilterInfo, LoopFilterKernels, MAX_SHARPNESS};
use crate::mask::{LoopFilterMasks, PLANES};
use arrayvec::ArrayVec;
use thiserror::Error;
use v_frame::pixel::{ChromaSampling, Pixel};
use v_frame::plane::Plane;

/// Samples a plane must provide past its 4x4-aligned size on the right and
/// at the bottom, for taps that reach beyond the last edge.
pub const FILTER_MARGIN: usize = 4;

/// Frame geometry and filter settings.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(
  feature = "serialize",
  derive(serde::Serialize, serde::Deserialize)
)]
pub struct LoopFilterConfig {
  /// Luma width in pixels.
  pub width: usize,
  /// Luma height in pixels.
  pub height: usize,
  pub chroma_sampling: ChromaSampling,
  /// 8, 10 or 12.
  pub bit_depth: usize,
  /// 0..=7
  pub sharpness: u8,
}

impl Default for LoopFilterConfig {
  fn default() -> Self {
    LoopFilterConfig {
      width: 640,
      height: 480,
      chroma_sampling: ChromaSampling::Cs420,
      bit_depth: 8,
      sharpness: 0,
    }
  }
}

/// An error returned by [`LoopFilterConfig::validate`].
#[derive(Debug, Clone, Copy, Eq, PartialEq, Error)]
#[non_exhaustive]
pub enum InvalidConfig {
  /// The width is invalid.
  #[error("invalid width {0} (expected >= 1, <= 65535)")]
  InvalidWidth(usize),
  /// The height is invalid.
  #[error("invalid height {0} (expected >= 1, <= 65535)")]
  InvalidHeight(usize),
  /// The bit depth is invalid.
  #[error("invalid bit depth {0} (expected 8, 10 or 12)")]
  InvalidBitDepth(usize),
  /// The sharpness is invalid.
  #[error("invalid sharpness {actual} (expected <= {max})")]
  InvalidSharpness {
    /// The actual value.
    actual: u8,
    /// The maximal supported value.
    max: u8,
  },
}

impl LoopFilterConfig {
  pub const fn with_size(mut self, width: usize, height: usize) -> Self {
    self.width = width;
    self.height = height;
    self
  }

  pub const fn with_chroma_sampling(
    mut self, chroma_sampling: ChromaSampling,
  ) -> Self {
    self.chroma_sampling = chroma_sampling;
    self
  }

  pub const fn with_bit_depth(mut self, bit_depth: usize) -> Self {
    self.bit_depth = bit_depth;
    self
  }

  pub const fn with_sharpness(mut self, sharpness: u8) -> Self {
    self.sharpness = sharpness;
    self
  }

  /// Validates the configuration.
  ///
  /// # Errors
  ///
  /// - Returns `InvalidConfig` if any field is out of range.
  pub fn validate(&self) -> Result<(), InvalidConfig> {
    use InvalidConfig::*;

    if self.width < 1 || self.width > u16::MAX as usize {
      return Err(InvalidWidth(self.width));
    }
    if self.height < 1 || self.height > u16::MAX as usize {
      return Err(InvalidHeight(self.height));
    }
    if !matches!(self.bit_depth, 8 | 10 | 12) {
      return Err(InvalidBitDepth(self.bit_depth));
    }
    if self.sharpness > MAX_SHARPNESS {
      return Err(InvalidSharpness {
        actual: self.sharpness,
        max: MAX_SHARPNESS,
      });
    }
    Ok(())
  }

  /// Number of planes carrying samples.
  pub const fn planes(&self) -> usize {
    match self.chroma_sampling {
      ChromaSampling::Cs400 => 1,
      _ => PLANES,
    }
  }

  /// Chroma decimation, 0 for monochrome.
  pub fn decimation(&self) -> (usize, usize) {
    self.chroma_sampling.get_decimation().unwrap_or((0, 0))
  }
}

/// An error returned by [`LoopFilter::filter_frame`].
#[derive(Debug, Clone, Copy, Eq, PartialEq, Error)]
#[non_exhaustive]
pub enum DeblockError {
  #[error("expected {expected} planes, got {actual}")]
  PlaneCount { expected: usize, actual: usize },
  #[error("plane {plane} is {actual:?}, expected {expected:?}")]
  PlaneSize {
    plane: usize,
    expected: (usize, usize),
    actual: (usize, usize),
  },
  #[error("plane {plane} has decimation {actual:?}, expected {expected:?}")]
  PlaneDecimation {
    plane: usize,
    expected: (usize, usize),
    actual: (usize, usize),
  },
  #[error("plane {plane} has too little padding for the filter taps")]
  PlanePadding { plane: usize },
  #[error("{pixel_bits}-bit pixels cannot hold bit depth {bit_depth}")]
  PixelDepth { pixel_bits: usize, bit_depth: usize },
}

cfg_if::cfg_if! {
  if #[cfg(feature = "threading")] {
    fn for_each_plane<T, F>(planes: &mut [Plane<T>], f: F) -> Vec<usize>
    where
      T: Pixel,
      F: Fn(usize, &mut Plane<T>) -> usize + Send + Sync,
    {
      use rayon::prelude::*;
      planes
        .par_iter_mut()
        .enumerate()
        .map(|(pli, plane)| f(pli, plane))
        .collect()
    }
  } else {
    fn for_each_plane<T, F>(planes: &mut [Plane<T>], f: F) -> Vec<usize>
    where
      T: Pixel,
      F: Fn(usize, &mut Plane<T>) -> usize,
    {
      planes
        .iter_mut()
        .enumerate()
        .map(|(pli, plane)| f(pli, plane))
        .collect()
    }
  }
}

/// Deblocking state for a sequence of frames of one geometry.
///
/// Per frame: stamp every decoded block into [`masks_mut`], call
/// [`build`], then [`filter_frame`], then [`reset`] before the next frame.
///
/// [`masks_mut`]: LoopFilter::masks_mut
/// [`build`]: LoopFilter::build
/// [`filter_frame`]: LoopFilter::filter_frame
/// [`reset`]: LoopFilter::reset
#[derive(Clone, Debug)]
pub struct LoopFilter {
  cfg: LoopFilterConfig,
  lfi: LoopFilterInfo,
  masks: LoopFilterMasks,
  built: bool,
}

impl LoopFilter {
  /// Creates the masks and thresholds for `cfg`.
  ///
  /// # Errors
  ///
  /// - Returns `InvalidConfig` if the configuration is invalid.
  pub fn new(cfg: LoopFilterConfig) -> Result<Self, InvalidConfig> {
    cfg.validate()?;
    let (xdec, ydec) = cfg.decimation();
    Ok(LoopFilter {
      cfg,
      lfi: LoopFilterInfo::new(cfg.sharpness),
      masks: LoopFilterMasks::new(
        cfg.width,
        cfg.height,
        xdec,
        ydec,
        cfg.planes(),
      ),
      built: false,
    })
  }

  pub const fn config(&self) -> &LoopFilterConfig {
    &self.cfg
  }

  pub const fn info(&self) -> &LoopFilterInfo {
    &self.lfi
  }

  /// Changes the sharpness used by the following frames.
  ///
  /// # Errors
  ///
  /// - Returns `InvalidConfig` if `sharpness` is out of range.
  pub fn set_sharpness(&mut self, sharpness: u8) -> Result<(), InvalidConfig> {
    self.cfg.with_sharpness(sharpness).validate()?;
    self.cfg.sharpness = sharpness;
    self.lfi.update_sharpness(sharpness);
    Ok(())
  }

  pub const fn masks(&self) -> &LoopFilterMasks {
    &self.masks
  }

  /// Masks to stamp decoded blocks into.
  pub fn masks_mut(&mut self) -> &mut LoopFilterMasks {
    &mut self.masks
  }

  /// Stamps a whole frame of decoded block metadata.
  pub fn store_frame_blocks(&mut self, blocks: &FrameBlocks) {
    self.masks.store_frame_blocks(blocks);
  }

  /// Derives the edge masks of every plane from the stamped blocks.
  pub fn build(&mut self) {
    build_bitmasks(&mut self.masks);
    self.built = true;
    log::debug!(
      "built loop filter masks for {}x{}, {} planes",
      self.cfg.width,
      self.cfg.height,
      self.masks.planes
    );
  }

  fn check_planes<T: Pixel>(
    &self, planes: &[Plane<T>],
  ) -> Result<(), DeblockError> {
    let pixel_bits = 8 * std::mem::size_of::<T>();
    if pixel_bits < self.cfg.bit_depth {
      return Err(DeblockError::PixelDepth {
        pixel_bits,
        bit_depth: self.cfg.bit_depth,
      });
    }
    if planes.len() != self.masks.planes {
      return Err(DeblockError::PlaneCount {
        expected: self.masks.planes,
        actual: planes.len(),
      });
    }
    for (pli, plane) in planes.iter().enumerate() {
      let cfg = &plane.cfg;
      let (width, height) = self.masks.plane_size(pli);
      if (cfg.width, cfg.height) != (width, height) {
        return Err(DeblockError::PlaneSize {
          plane: pli,
          expected: (width, height),
          actual: (cfg.width, cfg.height),
        });
      }
      let dec = self.masks.plane_dec(pli);
      if (cfg.xdec, cfg.ydec) != dec {
        return Err(DeblockError::PlaneDecimation {
          plane: pli,
          expected: dec,
          actual: (cfg.xdec, cfg.ydec),
        });
      }
      let align = |v: usize| ((v + 3) & !3) + FILTER_MARGIN;
      if cfg.stride - cfg.xorigin < align(width)
        || cfg.alloc_height - cfg.yorigin < align(height)
      {
        return Err(DeblockError::PlanePadding { plane: pli });
      }
    }
    Ok(())
  }

  /// Filters all planes in place, vertical edges before horizontal edges
  /// in every superblock row. Planes are independent and may be filtered
  /// concurrently.
  ///
  /// Returns the number of 4-sample edge segments filtered in each plane.
  ///
  /// # Errors
  ///
  /// - Returns `DeblockError` if `planes` does not match the configured
  ///   geometry or `T` is too narrow for the bit depth.
  pub fn filter_frame<T, K>(
    &self, planes: &mut [Plane<T>], kernels: &K,
  ) -> Result<ArrayVec<usize, PLANES>, DeblockError>
  where
    T: Pixel,
    K: LoopFilterKernels<T> + Sync + ?Sized,
  {
    self.check_planes(planes)?;
    if !self.built {
      log::warn!("filtering a frame whose masks were never built");
    }

    let bit_depth = self.cfg.bit_depth;
    let segments: ArrayVec<usize, PLANES> =
      for_each_plane(planes, |pli, plane| {
        filter_plane(&self.masks, &self.lfi, plane, pli, bit_depth, kernels)
      })
      .into_iter()
      .collect();

    log::debug!("filtered edge segments per plane: {:?}", segments);
    Ok(segments)
  }

  /// Clears the masks for the next frame.
  pub fn reset(&mut self) {
    self.masks.reset();
    self.built = false;
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::blocks::{Block, FilterLevels};
  use crate::lpf::{RecordingKernels, RustKernels};
  use crate::partition::{BlockOffset, BlockSize};
  use crate::transform::TxSize;
  use pretty_assertions::assert_eq;

  fn planes<T: Pixel>(cfg: &LoopFilterConfig) -> Vec<Plane<T>> {
    let (xdec, ydec) = cfg.decimation();
    let (cw, ch) =
      cfg.chroma_sampling.get_chroma_dimensions(cfg.width, cfg.height);
    let mut planes = vec![Plane::new(cfg.width, cfg.height, 0, 0, 8, 8)];
    if cfg.planes() == PLANES {
      planes.push(Plane::new(cw, ch, xdec, ydec, 8, 8));
      planes.push(Plane::new(cw, ch, xdec, ydec, 8, 8));
    }
    planes
  }

  #[test]
  fn validate_rejects_out_of_range() {
    let cfg = LoopFilterConfig::default();
    assert_eq!(cfg.validate(), Ok(()));
    assert_eq!(
      cfg.with_size(0, 16).validate(),
      Err(InvalidConfig::InvalidWidth(0))
    );
    assert_eq!(
      cfg.with_size(16, 70000).validate(),
      Err(InvalidConfig::InvalidHeight(70000))
    );
    assert_eq!(
      cfg.with_bit_depth(9).validate(),
      Err(InvalidConfig::InvalidBitDepth(9))
    );
    assert_eq!(
      cfg.with_sharpness(8).validate(),
      Err(InvalidConfig::InvalidSharpness { actual: 8, max: 7 })
    );
  }

  #[test]
  fn filter_frame_checks_geometry() {
    let cfg = LoopFilterConfig::default().with_size(64, 32);
    let lf = LoopFilter::new(cfg).unwrap();
    let mut p = planes::<u8>(&cfg);
    p.pop();
    assert_eq!(
      lf.filter_frame(&mut p, &RustKernels),
      Err(DeblockError::PlaneCount { expected: 3, actual: 2 })
    );
    let mut p = planes::<u8>(&cfg.with_size(64, 40));
    assert!(matches!(
      lf.filter_frame(&mut p, &RustKernels),
      Err(DeblockError::PlaneSize { plane: 0, .. })
    ));
    let mut p = vec![Plane::<u8>::new(64, 32, 0, 0, 0, 0)];
    let mono = LoopFilter::new(
      cfg.with_chroma_sampling(ChromaSampling::Cs400),
    )
    .unwrap();
    assert_eq!(
      mono.filter_frame(&mut p, &RustKernels),
      Err(DeblockError::PlanePadding { plane: 0 })
    );
    let hbd = LoopFilter::new(cfg.with_bit_depth(10)).unwrap();
    let mut p = planes::<u8>(&cfg);
    assert_eq!(
      hbd.filter_frame(&mut p, &RustKernels),
      Err(DeblockError::PixelDepth { pixel_bits: 8, bit_depth: 10 })
    );
  }

  #[test]
  fn frame_cycle_and_reset() {
    let cfg = LoopFilterConfig::default().with_size(32, 32);
    let mut lf = LoopFilter::new(cfg).unwrap();
    let b = Block {
      bsize: BlockSize::BLOCK_16X16,
      tx_size: TxSize::TX_16X16,
      levels: FilterLevels::uniform(24),
      ..Default::default()
    };
    for (x, y) in [(0, 0), (4, 0), (0, 4), (4, 4)] {
      lf.masks_mut().store_block(BlockOffset::new(x, y), &b);
    }
    lf.build();
    let rec = RecordingKernels::new();
    let mut p = planes::<u8>(&cfg);
    let segments = lf.filter_frame(&mut p, &rec).unwrap();
    // luma: one interior line of 8 segments per direction; chroma 8x8
    // transforms: one line of 4 segments per direction
    assert_eq!(segments.as_slice(), &[16, 8, 8]);
    assert_eq!(rec.take().len(), 8 + 4 + 4);

    lf.reset();
    lf.build();
    let segments = lf.filter_frame(&mut p, &rec).unwrap();
    assert_eq!(segments.as_slice(), &[0, 0, 0]);
  }
}
