//! Static strip partitioning: one contiguous strip per worker.

use super::{div_ceil, Assignment};
use crate::prelude::*;
use crate::types::Block;

/// One ceil-sized horizontal strip per worker, top to bottom. The last
/// strip is clipped to the image; workers past the bottom edge get nothing.
pub fn rows(width: u32, height: u32, workers: usize) -> Vec<Assignment> {
    let strip = div_ceil(height, workers as u32);
    let mut assignments = Vec::with_capacity(workers);

    for rank in 0..workers as u32 {
        let y = rank * strip;
        if y >= height {
            break;
        }

        let block = Block::new(0, y, width, min(strip, height - y));
        assignments.push(Assignment::new(block, rank as usize));
    }

    assignments
}

/// Vertical counterpart of [`rows`], by columns.
pub fn columns(width: u32, height: u32, workers: usize) -> Vec<Assignment> {
    let strip = div_ceil(width, workers as u32);
    let mut assignments = Vec::with_capacity(workers);

    for rank in 0..workers as u32 {
        let x = rank * strip;
        if x >= width {
            break;
        }

        let block = Block::new(x, 0, min(strip, width - x), height);
        assignments.push(Assignment::new(block, rank as usize));
    }

    assignments
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_columns_mirror_rows() {
        let r = rows(6, 9, 4);
        let c = columns(9, 6, 4);

        assert_eq!(r.len(), c.len());
        for (a, b) in zip(&r, &c) {
            assert_eq!(a.worker, b.worker);
            assert_eq!((a.block.y, a.block.height), (b.block.x, b.block.width));
        }
    }
}
