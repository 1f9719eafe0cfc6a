use serde::{Deserialize, Serialize};
use std::fmt::{self, Debug};

use crate::types::image::CHANNELS;

/// A rectangular sub-region of the image, assigned as one unit of work.
///
/// The origin is the top-left pixel of the region; `width` and `height`
/// extend right and down. Every block handed to a worker has a positive
/// extent along both axes. The zero-extent block is reserved as the
/// termination signal for pull-based scheduling (see [`Block::sentinel`]).
#[derive(Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Block {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Block {
    #[inline(always)]
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// The assignment that tells a pulling worker to exit its loop.
    pub fn sentinel() -> Self {
        Self::new(0, 0, 0, 0)
    }

    pub fn is_sentinel(&self) -> bool {
        self.width == 0 && self.height == 0
    }

    /// Rightmost column, exclusive.
    #[inline(always)]
    pub fn right(&self) -> u32 {
        self.x + self.width
    }

    /// Bottommost row, exclusive.
    #[inline(always)]
    pub fn bottom(&self) -> u32 {
        self.y + self.height
    }

    pub fn num_pixels(&self) -> usize {
        self.width as usize * self.height as usize
    }

    /// Number of channel values in this block's pixel payload.
    pub fn num_values(&self) -> usize {
        CHANNELS * self.num_pixels()
    }

    /// Returns `true` if the two blocks share at least one pixel.
    pub fn intersects(&self, other: &Block) -> bool {
        self.x < other.right()
            && other.x < self.right()
            && self.y < other.bottom()
            && other.y < self.bottom()
    }

    /// Returns `true` if the block lies entirely within a `width`×`height`
    /// image.
    pub fn fits_within(&self, width: u32, height: u32) -> bool {
        self.right() <= width && self.bottom() <= height
    }
}

impl Debug for Block {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Block")
            .field(&(self.x..self.right()))
            .field(&(self.y..self.bottom()))
            .finish()
    }
}
