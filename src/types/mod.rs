mod block;
mod config;
mod image;

pub use self::block::Block;
pub use self::config::{Config, ConfigError, Strategy};
pub use self::image::{Image, CHANNELS};

use serde::{Deserialize, Serialize};
use std::fmt::{self, Display};

/// Identifies one participant in the run. The driver is always
/// participant 0 and, under the static strategies, doubles as a worker.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct WorkerId(usize);

impl WorkerId {
    pub const DRIVER: WorkerId = WorkerId(0);

    pub fn new(id: usize) -> Self {
        Self(id)
    }

    pub fn get(self) -> usize {
        self.0
    }
}

impl Display for WorkerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        Display::fmt(&self.0, f)
    }
}

/// Load statistics derived once the image is assembled.
///
/// `largest_computation_time` is the maximum over the times reported by the
/// workers; everything the run spent beyond that is accounted as
/// communication.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct RunMetrics {
    pub total_time: f64,
    pub largest_computation_time: f64,
}

impl RunMetrics {
    pub fn communication_time(&self) -> f64 {
        self.total_time - self.largest_computation_time
    }

    pub fn communication_ratio(&self) -> f64 {
        self.communication_time() / self.largest_computation_time
    }
}
