//! Distributes the computation of a 2-D image over a fleet of cooperating
//! workers under a selectable partitioning strategy, reassembles the partial
//! results, and reports how well the load was balanced.

pub mod driver;
mod network;
pub mod planner;
mod prelude;
pub mod protocol;
pub mod types;
pub mod worker;

pub use crate::driver::RenderOutput;
pub use crate::network::TransportError;
pub use crate::protocol::ProtocolError;
pub use crate::types::{
    Block, Config, ConfigError, Image, RunMetrics, Strategy, WorkerId, CHANNELS,
};
pub use crate::worker::PixelShader;

use crate::prelude::*;

pub fn hostname() -> &'static str {
    lazy_static::lazy_static! {
        static ref HOSTNAME: String = {
            match ::hostname::get() {
                Ok(s) => s.to_string_lossy().into_owned(),
                Err(_) => "<anonymous>".into(),
            }
        };
    };

    &*HOSTNAME
}

pub fn initialize_logger() {
    use std::time::Instant;

    lazy_static::lazy_static! {
        static ref START_TIMING: Instant = Instant::now();
    }

    let _ = *START_TIMING;

    env_logger::Builder::from_default_env()
        .format(|formatter, record| {
            use std::io::Write;
            let duration = START_TIMING.elapsed();

            writeln!(
                formatter,
                "[{} {} {:.6}] {}: {}",
                hostname(),
                record.module_path().unwrap_or("?"),
                duration.as_secs_f64(),
                record.level(),
                record.args(),
            )
        })
        .init();
}

/// Run one full render: plan the partition, fan the blocks out over
/// `config.workers` participants, and reassemble their results into the
/// final image.
///
/// The driver runs on the calling thread; the remaining participants run on
/// their own threads for the duration of the call. Fails before any work is
/// dispatched when the configuration cannot partition the image.
pub fn render(config: &Config, shader: &dyn PixelShader) -> Result<RenderOutput> {
    // Surface configuration problems here, while no thread exists yet; each
    // participant re-derives the same plan locally.
    planner::plan(config)?;

    network::execute_participants(
        config.workers,
        |endpoint| driver::driver_main(endpoint, config, shader),
        |mut endpoint| worker::worker_main(&mut endpoint, config, shader),
    )
}
