//! The driver: plans the partition, dispatches assignments, collects and
//! decodes the results, and reassembles the image.

use std::collections::VecDeque;
use std::time::Instant;

use crate::network::Endpoint;
use crate::planner::{self, Assignment, Plan};
use crate::prelude::*;
use crate::protocol::{self, ResultMsg};
use crate::types::{Block, Config, Image, RunMetrics, WorkerId};
use crate::worker::{self, PixelShader};

/// Everything a finished run produces: the assembled image and the load
/// statistics derived from the workers' reports.
#[derive(Debug)]
pub struct RenderOutput {
    pub image: Image,
    pub metrics: RunMetrics,
}

/// Drive one run to completion on the calling thread.
///
/// Static strategies dispatch every assignment up front, contribute the
/// driver's own share through an in-process worker over the same transport,
/// then collect one message per participant. The dynamic strategy
/// interleaves dispatch and collection: whichever worker reports back first
/// is handed the next pending block, and the queue draining ends with one
/// sentinel per worker.
pub(crate) fn driver_main(
    mut endpoint: Endpoint,
    config: &Config,
    shader: &dyn PixelShader,
) -> Result<RenderOutput> {
    let start = Instant::now();
    let mut image = Image::new(config.width, config.height);
    let mut largest_computation_time = 0.0;

    match planner::plan(config)? {
        Plan::Static(assignments) => {
            debug!(
                "dispatching {} blocks over {} workers",
                assignments.len(),
                config.workers
            );

            for Assignment { block, worker } in &assignments {
                endpoint.send_block(*worker, block)?;
            }

            // The driver doubles as worker 0: the same loop as every remote
            // worker, its traffic looped back over the local channel.
            worker::worker_main(&mut endpoint, config, shader)?;

            for rank in 0..config.workers {
                let buffer = endpoint.recv_buffer_from(WorkerId::new(rank))?;
                let message = protocol::decode(&buffer)?;
                absorb(&mut image, &mut largest_computation_time, &message)?;
            }
        }
        Plan::Queue(mut pending) => {
            let mut idle: VecDeque<WorkerId> = (1..config.workers).map(WorkerId::new).collect();
            let mut outstanding = 0usize;
            debug!(
                "balancing {} blocks over {} pulling workers",
                pending.len(),
                idle.len()
            );

            while let Some(block) = pending.pop_front() {
                let worker = match idle.pop_front() {
                    Some(worker) => worker,
                    None => {
                        // The receive doubles as the idle signal: it frees
                        // that worker and supplies a decoded result.
                        let worker = collect_any(&mut endpoint, &mut image, &mut largest_computation_time)?;
                        outstanding -= 1;
                        worker
                    }
                };

                endpoint.send_block(worker, &block)?;
                outstanding += 1;
            }

            while outstanding > 0 {
                collect_any(&mut endpoint, &mut image, &mut largest_computation_time)?;
                outstanding -= 1;
            }

            for rank in 1..config.workers {
                endpoint.send_block(WorkerId::new(rank), &Block::sentinel())?;
            }
        }
    }

    let metrics = RunMetrics {
        total_time: start.elapsed().as_secs_f64(),
        largest_computation_time,
    };

    info!("total execution time: {:.6} s", metrics.total_time);
    info!(
        "largest computation time: {:.6} s",
        metrics.largest_computation_time
    );
    info!(
        "total communication time: {:.6} s",
        metrics.communication_time()
    );
    info!("c-to-c ratio: {:.6}", metrics.communication_ratio());

    Ok(RenderOutput { image, metrics })
}

/// Receive from whichever worker finishes first, fold its result in, and
/// report who is now idle.
fn collect_any(endpoint: &mut Endpoint, image: &mut Image, largest: &mut f64) -> Result<WorkerId> {
    let (source, buffer) = endpoint.recv_buffer_any()?;
    let message = protocol::decode(&buffer)?;
    absorb(image, largest, &message)?;

    Ok(source)
}

/// Fold one decoded result message into the image and the running maximum
/// of the reported computation times.
fn absorb(image: &mut Image, largest: &mut f64, message: &ResultMsg) -> Result {
    *largest = f64::max(*largest, message.computation_time);

    for (block, values) in &message.blocks {
        if !block.fits_within(image.width(), image.height()) {
            bail!("received {:?}, which falls outside the image", block);
        }

        image.blit(block, values);
    }

    Ok(())
}
