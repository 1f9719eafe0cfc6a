//! Static cyclic stripes: fixed-thickness stripes dealt round-robin by
//! stripe index, interleaving adjacent stripes across different workers to
//! average out cost variance along the striped axis.

use super::Assignment;
use crate::prelude::*;
use crate::types::Block;

pub fn rows(width: u32, height: u32, stripe: u32, workers: usize) -> Vec<Assignment> {
    let mut assignments = Vec::new();
    let mut index = 0;
    let mut y = 0;

    while y < height {
        let h = min(stripe, height - y);
        assignments.push(Assignment::new(Block::new(0, y, width, h), index % workers));
        index += 1;
        y += h;
    }

    assignments
}

pub fn columns(width: u32, height: u32, stripe: u32, workers: usize) -> Vec<Assignment> {
    let mut assignments = Vec::new();
    let mut index = 0;
    let mut x = 0;

    while x < width {
        let w = min(stripe, width - x);
        assignments.push(Assignment::new(Block::new(x, 0, w, height), index % workers));
        index += 1;
        x += w;
    }

    assignments
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_single_pixel_stripes() {
        // Thickness one degenerates to one stripe per row, the classic
        // cyclic layout.
        let assignments = rows(4, 6, 1, 2);

        assert_eq!(assignments.len(), 6);
        for (row, assignment) in enumerate(&assignments) {
            assert_eq!(assignment.block, Block::new(0, row as u32, 4, 1));
            assert_eq!(assignment.worker.get(), row % 2);
        }
    }

    #[test]
    fn test_stripe_thicker_than_image() {
        let assignments = columns(3, 3, 10, 4);
        assert_eq!(assignments.len(), 1);
        assert_eq!(assignments[0].block, Block::new(0, 0, 3, 3));
    }
}
