//! Work partitioning: slicing the image into blocks and deciding which
//! worker computes which block.
//!
//! Planning is a pure function of the configuration, so every participant
//! can derive the same plan locally; only the blocks themselves travel over
//! the transport. Static strategies tile the image exactly — every pixel is
//! covered by exactly one block and blocks never overlap.

pub mod cyclic;
pub mod grid;
pub mod strips;

use std::collections::VecDeque;

use crate::prelude::*;
use crate::types::{Block, Config, ConfigError, Strategy, WorkerId};

/// One planned block together with the worker that will compute it.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Assignment {
    pub block: Block,
    pub worker: WorkerId,
}

impl Assignment {
    pub fn new(block: Block, worker: usize) -> Self {
        Self {
            block,
            worker: WorkerId::new(worker),
        }
    }
}

/// The output of the planner.
#[derive(Debug, Clone)]
pub enum Plan {
    /// Every block pre-assigned; dispatched in one pass before any result
    /// is collected.
    Static(Vec<Assignment>),
    /// Unassigned blocks, pulled one at a time by whichever worker becomes
    /// idle first.
    Queue(VecDeque<Block>),
}

impl Plan {
    pub fn num_blocks(&self) -> usize {
        match self {
            Plan::Static(assignments) => assignments.len(),
            Plan::Queue(blocks) => blocks.len(),
        }
    }

    /// How many blocks the given worker will be sent under this plan. Zero
    /// for a dynamic plan, where no worker knows its share up front.
    pub fn count_for(&self, worker: WorkerId) -> usize {
        match self {
            Plan::Static(assignments) => {
                assignments.iter().filter(|a| a.worker == worker).count()
            }
            Plan::Queue(_) => 0,
        }
    }
}

/// Partition the image per the configured strategy.
///
/// Validates eagerly: a configuration the strategy cannot partition fails
/// here, before any message is sent.
pub fn plan(config: &Config) -> Result<Plan, ConfigError> {
    config.validate()?;

    let workers = config.workers;
    let (width, height) = (config.width, config.height);

    let plan = match config.strategy {
        Strategy::None => Plan::Static(vec![Assignment::new(
            Block::new(0, 0, width, height),
            WorkerId::DRIVER.get(),
        )]),
        Strategy::RowStrips => Plan::Static(strips::rows(width, height, workers)),
        Strategy::ColumnStrips => Plan::Static(strips::columns(width, height, workers)),
        Strategy::TiledBlocks => {
            let edge = grid::square_edge(width, workers);
            if edge == 0 {
                return Err(ConfigError::EdgeTooSmall { workers, width });
            }
            Plan::Static(grid::square_blocks(width, height, edge, workers))
        }
        Strategy::RowCyclic { height: stripe } => {
            Plan::Static(cyclic::rows(width, height, stripe, workers))
        }
        Strategy::ColumnCyclic { width: stripe } => {
            Plan::Static(cyclic::columns(width, height, stripe, workers))
        }
        Strategy::Dynamic {
            tile_width,
            tile_height,
        } => Plan::Queue(grid::tile(width, height, tile_width, tile_height).into()),
    };

    Ok(plan)
}

pub(crate) fn div_ceil(a: u32, b: u32) -> u32 {
    (a + b - 1) / b
}

#[cfg(test)]
mod test {
    use super::*;
    use rand::rngs::SmallRng;
    use rand::{Rng, SeedableRng};

    /// Every pixel covered exactly once, every block in bounds.
    fn check_exact_cover(config: &Config) {
        let assignments = match plan(config).unwrap() {
            Plan::Static(assignments) => assignments,
            Plan::Queue(blocks) => blocks
                .into_iter()
                .map(|block| Assignment::new(block, 0))
                .collect(),
        };

        let mut covered = vec![0u32; (config.width * config.height) as usize];

        for Assignment { block, worker } in &assignments {
            assert!(!block.is_sentinel(), "planner emitted a sentinel");
            assert!(block.width > 0 && block.height > 0, "empty block planned");
            assert!(
                block.fits_within(config.width, config.height),
                "{:?} outside {}x{} image",
                block,
                config.width,
                config.height
            );
            assert!(
                worker.get() < config.workers,
                "{:?} assigned outside the fleet",
                worker
            );

            for row in block.y..block.bottom() {
                for column in block.x..block.right() {
                    covered[(row * config.width + column) as usize] += 1;
                }
            }
        }

        for (i, &count) in enumerate(&covered) {
            assert_eq!(
                count,
                1,
                "pixel ({}, {}) covered {} times under {:?}",
                i as u32 / config.width,
                i as u32 % config.width,
                count,
                config.strategy
            );
        }
    }

    #[test]
    fn test_row_strips_example() {
        // 4x4 image over two workers: two strips of two rows each.
        let config = Config::new(4, 4, 2, Strategy::RowStrips);

        match plan(&config).unwrap() {
            Plan::Static(assignments) => assert_eq!(
                assignments,
                vec![
                    Assignment::new(Block::new(0, 0, 4, 2), 0),
                    Assignment::new(Block::new(0, 2, 4, 2), 1),
                ]
            ),
            plan => panic!("unexpected plan {:?}", plan),
        }
    }

    #[test]
    fn test_row_strips_clip_last() {
        // ceil(10 / 4) = 3, so the last strip is a single clipped row.
        let config = Config::new(4, 10, 4, Strategy::RowStrips);

        match plan(&config).unwrap() {
            Plan::Static(assignments) => {
                assert_eq!(assignments.len(), 4);
                assert_eq!(assignments[3].block, Block::new(0, 9, 4, 1));
            }
            plan => panic!("unexpected plan {:?}", plan),
        }
    }

    #[test]
    fn test_row_strips_more_workers_than_rows() {
        // Workers past the image bottom get no block at all; zero-extent
        // strips are never emitted.
        let config = Config::new(4, 3, 8, Strategy::RowStrips);

        match plan(&config).unwrap() {
            Plan::Static(assignments) => {
                assert_eq!(assignments.len(), 3);
                for (rank, assignment) in enumerate(&assignments) {
                    assert_eq!(assignment.worker.get(), rank);
                    assert_eq!(assignment.block.height, 1);
                }
            }
            plan => panic!("unexpected plan {:?}", plan),
        }

        check_exact_cover(&config);
    }

    #[test]
    fn test_tiled_blocks_example() {
        // 8x8 image over four workers: four 4x4 tiles, no leftovers, one
        // tile per worker in row-major order.
        let config = Config::new(8, 8, 4, Strategy::TiledBlocks);

        match plan(&config).unwrap() {
            Plan::Static(assignments) => assert_eq!(
                assignments,
                vec![
                    Assignment::new(Block::new(0, 0, 4, 4), 0),
                    Assignment::new(Block::new(4, 0, 4, 4), 1),
                    Assignment::new(Block::new(0, 4, 4, 4), 2),
                    Assignment::new(Block::new(4, 4, 4, 4), 3),
                ]
            ),
            plan => panic!("unexpected plan {:?}", plan),
        }
    }

    #[test]
    fn test_tiled_blocks_leftovers() {
        // 11x7 over four workers: edge 5, a 2x1 grid of full tiles, a right
        // column, a bottom row and a corner, emitted in that order with the
        // round-robin continuing across phases.
        let config = Config::new(11, 7, 4, Strategy::TiledBlocks);

        match plan(&config).unwrap() {
            Plan::Static(assignments) => assert_eq!(
                assignments,
                vec![
                    Assignment::new(Block::new(0, 0, 5, 5), 0),
                    Assignment::new(Block::new(5, 0, 5, 5), 1),
                    Assignment::new(Block::new(10, 0, 1, 5), 2),
                    Assignment::new(Block::new(0, 5, 5, 2), 3),
                    Assignment::new(Block::new(5, 5, 5, 2), 0),
                    Assignment::new(Block::new(10, 5, 1, 2), 1),
                ]
            ),
            plan => panic!("unexpected plan {:?}", plan),
        }

        check_exact_cover(&config);
    }

    #[test]
    fn test_tiled_blocks_edge_too_small() {
        // 16 workers want four tiles across a 2 pixel wide image.
        let config = Config::new(2, 64, 16, Strategy::TiledBlocks);

        match plan(&config) {
            Err(e) => assert_eq!(
                e,
                ConfigError::EdgeTooSmall {
                    workers: 16,
                    width: 2
                }
            ),
            Ok(plan) => panic!("unexpected plan {:?}", plan),
        }
    }

    #[test]
    fn test_cyclic_interleave() {
        let config = Config::new(6, 10, 3, Strategy::RowCyclic { height: 2 });

        match plan(&config).unwrap() {
            Plan::Static(assignments) => {
                assert_eq!(assignments.len(), 5);
                for (index, assignment) in enumerate(&assignments) {
                    assert_eq!(assignment.worker.get(), index % 3);
                    assert_eq!(assignment.block.y, 2 * index as u32);
                }
            }
            plan => panic!("unexpected plan {:?}", plan),
        }
    }

    #[test]
    fn test_cyclic_clips_last_stripe() {
        let config = Config::new(10, 4, 2, Strategy::ColumnCyclic { width: 4 });

        match plan(&config).unwrap() {
            Plan::Static(assignments) => {
                assert_eq!(assignments.len(), 3);
                assert_eq!(assignments[2].block, Block::new(8, 0, 2, 4));
                assert_eq!(assignments[2].worker.get(), 0);
            }
            plan => panic!("unexpected plan {:?}", plan),
        }
    }

    #[test]
    fn test_dynamic_queue_count() {
        // 4 full tiles, 2 right, 2 bottom and 1 corner leftover.
        let config = Config::new(
            11,
            7,
            3,
            Strategy::Dynamic {
                tile_width: 5,
                tile_height: 3,
            },
        );

        let plan = plan(&config).unwrap();
        assert_eq!(plan.num_blocks(), 9);
        check_exact_cover(&config);
    }

    #[test]
    fn test_count_for() {
        let config = Config::new(8, 8, 3, Strategy::RowCyclic { height: 1 });
        let plan = plan(&config).unwrap();

        assert_eq!(plan.count_for(WorkerId::new(0)), 3);
        assert_eq!(plan.count_for(WorkerId::new(1)), 3);
        assert_eq!(plan.count_for(WorkerId::new(2)), 2);
    }

    #[test]
    fn test_exact_cover_randomized() {
        let mut rng = SmallRng::seed_from_u64(0xb10c);

        for _ in 0..200 {
            let width = rng.gen_range(1..48);
            let height = rng.gen_range(1..48);
            let workers = rng.gen_range(1..9);

            let mut strategies = vec![
                Strategy::RowStrips,
                Strategy::ColumnStrips,
                Strategy::RowCyclic {
                    height: rng.gen_range(1..8),
                },
                Strategy::ColumnCyclic {
                    width: rng.gen_range(1..8),
                },
            ];

            if workers == 1 {
                strategies.push(Strategy::None);
            }

            if workers >= 2 {
                strategies.push(Strategy::Dynamic {
                    tile_width: rng.gen_range(1..=width),
                    tile_height: rng.gen_range(1..=height),
                });
            }

            if grid::square_edge(width, workers) > 0 {
                strategies.push(Strategy::TiledBlocks);
            }

            for strategy in strategies {
                check_exact_cover(&Config::new(width, height, workers, strategy));
            }
        }
    }
}
