use serde::{Deserialize, Serialize};
use std::env;
use std::str::FromStr;

use crate::prelude::*;

/// How the image is sliced into blocks and spread over the workers.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Strategy {
    /// One implicit full-image block, computed by the driver alone.
    None,
    /// One ceil-sized horizontal strip per worker; the last strip is clipped
    /// to the image.
    RowStrips,
    /// One ceil-sized vertical strip per worker; the last strip is clipped.
    ColumnStrips,
    /// Square tiles in row-major order, handed out round-robin.
    TiledBlocks,
    /// Fixed-height stripes interleaved over the workers by stripe index.
    RowCyclic { height: u32 },
    /// Fixed-width stripes interleaved over the workers by stripe index.
    ColumnCyclic { width: u32 },
    /// Fixed-size tiles pulled one at a time by whichever worker reports
    /// back first.
    Dynamic { tile_width: u32, tile_height: u32 },
}

impl Strategy {
    /// Reads `GRIDSHADE_STRATEGY`, falling back to `None` when the variable
    /// is unset or does not parse.
    pub fn from_env() -> Option<Self> {
        let value = env::var("GRIDSHADE_STRATEGY").ok()?;

        match value.trim().parse() {
            Ok(strategy) => Some(strategy),
            Err(e) => {
                warn!("ignoring GRIDSHADE_STRATEGY: {}", e);
                None
            }
        }
    }
}

impl FromStr for Strategy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, ConfigError> {
        fn param(s: &str) -> Option<u32> {
            s.parse().ok().filter(|&v| v > 0)
        }

        let (name, arg) = match s.find(':') {
            Some(i) => (&s[..i], Some(&s[i + 1..])),
            None => (s, None),
        };

        let strategy = match (name, arg) {
            ("none", None) => Strategy::None,
            ("rows", None) => Strategy::RowStrips,
            ("columns", None) => Strategy::ColumnStrips,
            ("tiles", None) => Strategy::TiledBlocks,
            ("row-cyclic", Some(arg)) => Strategy::RowCyclic {
                height: param(arg).ok_or_else(|| ConfigError::UnknownStrategy(s.into()))?,
            },
            ("column-cyclic", Some(arg)) => Strategy::ColumnCyclic {
                width: param(arg).ok_or_else(|| ConfigError::UnknownStrategy(s.into()))?,
            },
            ("dynamic", Some(arg)) => {
                let (w, h) = arg
                    .split_once('x')
                    .and_then(|(w, h)| Some((param(w)?, param(h)?)))
                    .ok_or_else(|| ConfigError::UnknownStrategy(s.into()))?;
                Strategy::Dynamic {
                    tile_width: w,
                    tile_height: h,
                }
            }
            _ => return Err(ConfigError::UnknownStrategy(s.into())),
        };

        Ok(strategy)
    }
}

/// A configuration the planner cannot turn into a valid partition.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("image of {0}x{1} pixels cannot be rendered")]
    EmptyImage(u32, u32),

    #[error("at least one worker is required")]
    NoWorkers,

    #[error("strategy `none` runs on the driver alone, got {0} participants")]
    SequentialWorkers(usize),

    #[error("dynamic scheduling needs at least one worker besides the driver")]
    NoPullers,

    #[error("tile of {tile_width}x{tile_height} cannot partition a {width}x{height} image")]
    BadTile {
        tile_width: u32,
        tile_height: u32,
        width: u32,
        height: u32,
    },

    #[error("stripe thickness must be positive")]
    EmptyStripe,

    #[error("cannot fit square tiles for {workers} workers in a {width} pixel wide image")]
    EdgeTooSmall { workers: usize, width: u32 },

    #[error("unknown strategy {0:?}")]
    UnknownStrategy(String),
}

/// Everything a run needs to know: image extent, fleet size and the
/// partitioning strategy. Scene contents live with the shader, not here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub width: u32,
    pub height: u32,
    /// Total number of cooperating participants, the driver included.
    pub workers: usize,
    pub strategy: Strategy,
    /// Overwrite every block with a color identifying the worker that
    /// computed it. Makes the partition visually inspectable.
    pub tint_by_worker: bool,
}

impl Config {
    pub fn new(width: u32, height: u32, workers: usize, strategy: Strategy) -> Self {
        Self {
            width,
            height,
            workers,
            strategy,
            tint_by_worker: false,
        }
    }

    /// Rejects configurations that cannot be partitioned, before any work is
    /// dispatched. Square-tile feasibility is checked by the planner, which
    /// knows the edge selection rule.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.width == 0 || self.height == 0 {
            return Err(ConfigError::EmptyImage(self.width, self.height));
        }

        if self.workers == 0 {
            return Err(ConfigError::NoWorkers);
        }

        match self.strategy {
            Strategy::None if self.workers != 1 => {
                Err(ConfigError::SequentialWorkers(self.workers))
            }
            Strategy::RowCyclic { height: 0 } | Strategy::ColumnCyclic { width: 0 } => {
                Err(ConfigError::EmptyStripe)
            }
            Strategy::Dynamic {
                tile_width,
                tile_height,
            } => {
                if self.workers < 2 {
                    Err(ConfigError::NoPullers)
                } else if tile_width == 0
                    || tile_height == 0
                    || tile_width > self.width
                    || tile_height > self.height
                {
                    Err(ConfigError::BadTile {
                        tile_width,
                        tile_height,
                        width: self.width,
                        height: self.height,
                    })
                } else {
                    Ok(())
                }
            }
            _ => Ok(()),
        }
    }
}
