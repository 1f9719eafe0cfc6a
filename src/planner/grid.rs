//! Tile partitioning: the square static grid and the shared tiling used by
//! pull-based scheduling.

use super::Assignment;
use crate::prelude::*;
use crate::types::Block;

/// Edge length of the square tiles for the static grid.
///
/// Candidate tile counts per axis are `floor(sqrt(workers))` and one more;
/// the smaller candidate wins when it already yields at least one tile per
/// worker. The edge always divides the width axis, whatever the image
/// aspect, which reproduces the historical behavior of this scheme. Returns
/// zero when the image is too narrow for that many tiles, which the planner
/// rejects.
pub fn square_edge(width: u32, workers: usize) -> u32 {
    let root = (workers as f64).sqrt() as usize;
    let tiles = if root * root >= workers { root } else { root + 1 };

    width / tiles as u32
}

/// Tile the image with `tile_width`×`tile_height` blocks in row-major
/// order, then emit the clipped leftovers: the right column strip, the
/// bottom row strip and finally the bottom-right corner.
pub fn tile(width: u32, height: u32, tile_width: u32, tile_height: u32) -> Vec<Block> {
    let nx = width / tile_width;
    let ny = height / tile_height;
    let leftover_x = width % tile_width;
    let leftover_y = height % tile_height;

    let mut blocks = Vec::with_capacity((nx * ny + nx + ny + 1) as usize);

    for y in 0..ny {
        for x in 0..nx {
            blocks.push(Block::new(x * tile_width, y * tile_height, tile_width, tile_height));
        }
    }

    if leftover_x > 0 {
        for y in 0..ny {
            blocks.push(Block::new(nx * tile_width, y * tile_height, leftover_x, tile_height));
        }
    }

    if leftover_y > 0 {
        for x in 0..nx {
            blocks.push(Block::new(x * tile_width, ny * tile_height, tile_width, leftover_y));
        }
    }

    if leftover_x > 0 && leftover_y > 0 {
        blocks.push(Block::new(nx * tile_width, ny * tile_height, leftover_x, leftover_y));
    }

    blocks
}

/// The static grid: square tiles of the given edge, assigned round-robin
/// over the full emission order, leftovers included.
pub fn square_blocks(width: u32, height: u32, edge: u32, workers: usize) -> Vec<Assignment> {
    enumerate(tile(width, height, edge, edge))
        .map(|(index, block)| Assignment::new(block, index % workers))
        .collect()
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_square_edge() {
        assert_eq!(square_edge(8, 4), 4);
        assert_eq!(square_edge(8, 1), 8);
        // 5 workers round up to a 3x3 candidate grid.
        assert_eq!(square_edge(9, 5), 3);
        // Narrower than the tile count.
        assert_eq!(square_edge(2, 16), 0);
    }

    #[test]
    fn test_tile_exact_fit() {
        let blocks = tile(8, 6, 4, 3);
        assert_eq!(
            blocks,
            vec![
                Block::new(0, 0, 4, 3),
                Block::new(4, 0, 4, 3),
                Block::new(0, 3, 4, 3),
                Block::new(4, 3, 4, 3),
            ]
        );
    }

    #[test]
    fn test_tile_wider_than_tall() {
        // A single row of tiles higher than the image: the full grid is
        // empty and the whole image is emitted as bottom leftovers.
        let blocks = tile(9, 2, 3, 5);
        assert_eq!(
            blocks,
            vec![
                Block::new(0, 0, 3, 2),
                Block::new(3, 0, 3, 2),
                Block::new(6, 0, 3, 2),
            ]
        );
    }

    #[test]
    fn test_tile_leftover_order() {
        let blocks = tile(5, 5, 2, 2);
        assert_eq!(
            blocks,
            vec![
                Block::new(0, 0, 2, 2),
                Block::new(2, 0, 2, 2),
                Block::new(0, 2, 2, 2),
                Block::new(2, 2, 2, 2),
                Block::new(4, 0, 1, 2),
                Block::new(4, 2, 1, 2),
                Block::new(0, 4, 2, 1),
                Block::new(2, 4, 2, 1),
                Block::new(4, 4, 1, 1),
            ]
        );
    }
}
