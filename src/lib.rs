// Copyright (c) 2017-2022, The rav1e contributors. All rights reserved
//
// This source code is subject to the terms of the BSD 2 Clause License and
// the Alliance for Open Media Patent License 1.0. If the BSD 2 Clause License
// was not distributed with this source code in the LICENSE file, you can
// obtain it at www.aomedia.org/license/software. If the Alliance for Open
// Media Patent License 1.0 was not distributed with this source code in the
// PATENTS file, you can obtain it at www.aomedia.org/license/patent.

//! Bitmask-driven AV1 deblocking.
//!
//! Decoded blocks are stamped into per-superblock masks
//! ([`LoopFilterMasks`]), the masks are turned into per-edge-size bits
//! once the frame is complete, and the filter dispatcher walks those bits
//! to call the edge kernels. A mask-free deblocker over the same block
//! metadata lives in [`direct`].
//!
//! ```
//! use av1_lfmask::prelude::*;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let cfg = LoopFilterConfig::default().with_size(64, 64);
//! let mut lf = LoopFilter::new(cfg)?;
//! let block = Block {
//!   bsize: BlockSize::BLOCK_32X32,
//!   tx_size: TxSize::TX_16X16,
//!   levels: FilterLevels::uniform(20),
//!   ..Default::default()
//! };
//! for (x, y) in [(0, 0), (8, 0), (0, 8), (8, 8)] {
//!   lf.masks_mut().store_block(BlockOffset::new(x, y), &block);
//! }
//! lf.build();
//!
//! let mut planes = vec![
//!   Plane::<u8>::new(64, 64, 0, 0, 8, 8),
//!   Plane::<u8>::new(32, 32, 1, 1, 8, 8),
//!   Plane::<u8>::new(32, 32, 1, 1, 8, 8),
//! ];
//! let segments = lf.filter_frame(&mut planes, &RustKernels)?;
//! assert_eq!(segments.len(), 3);
//! # Ok(())
//! # }
//! ```

#![deny(bare_trait_objects)]
#![allow(clippy::cast_lossless)]
#![allow(clippy::cast_ptr_alignment)]
#![allow(clippy::needless_range_loop)]
#![allow(clippy::unreadable_literal)]

pub mod api;
pub mod blocks;
pub mod builder;
pub mod direct;
pub mod dispatch;
pub mod lpf;
pub mod mask;
pub mod partition;
pub mod shape;
pub mod transform;

pub use crate::api::*;
pub use crate::mask::{EdgeDirection, LoopFilterMasks};

/// Commonly used types and traits.
pub mod prelude {
  pub use crate::api::*;
  pub use crate::blocks::{Block, FilterLevels, FrameBlocks};
  pub use crate::lpf::{
    FilterWidth, KernelCall, LoopFilterInfo, LoopFilterKernels,
    LoopFilterThresh, RecordingKernels, RustKernels,
  };
  pub use crate::mask::{Bitmask, EdgeDirection, LoopFilterMasks};
  pub use crate::partition::{BlockOffset, BlockSize};
  pub use crate::transform::TxSize;
  pub use v_frame::pixel::{ChromaSampling, Pixel};
  pub use v_frame::plane::Plane;
}
