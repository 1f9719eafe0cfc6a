//! The worker side of a run: receive block assignments, shade them, report
//! the results and the time they took.

use std::time::Instant;

use crate::network::Endpoint;
use crate::planner;
use crate::prelude::*;
use crate::protocol::{self, ResultMsg};
use crate::types::{Block, Config, Strategy, WorkerId, CHANNELS};

/// The external per-pixel computation.
///
/// `out` is the destination for one pixel's `CHANNELS` values; `row` and
/// `column` are global image coordinates. Implementations must be callable
/// for any pixel in any order, concurrently from several workers.
pub trait PixelShader: Sync {
    fn shade(&self, out: &mut [f32], row: u32, column: u32);
}

impl<F> PixelShader for F
where
    F: Fn(&mut [f32], u32, u32) + Sync,
{
    fn shade(&self, out: &mut [f32], row: u32, column: u32) {
        self(out, row, column)
    }
}

/// Process this participant's share of the work and report back to the
/// driver. Under the static strategies the share is known up front from the
/// plan; under pull-based scheduling blocks keep coming until the sentinel.
pub(crate) fn worker_main(
    endpoint: &mut Endpoint,
    config: &Config,
    shader: &dyn PixelShader,
) -> Result {
    debug_assert_eq!(endpoint.num_participants(), config.workers);

    match config.strategy {
        Strategy::Dynamic { .. } => pull_loop(endpoint, config, shader),
        _ => static_batch(endpoint, config, shader),
    }
}

/// Receive the statically planned share, shade it, and answer with a single
/// message carrying every block.
fn static_batch(endpoint: &mut Endpoint, config: &Config, shader: &dyn PixelShader) -> Result {
    let me = endpoint.my_id();
    let expected = planner::plan(config)?.count_for(me);
    debug!("worker {} expecting {} assignments", me, expected);

    let mut computation_time = 0.0;
    let mut blocks = Vec::with_capacity(expected);

    for _ in 0..expected {
        let block = endpoint.recv_block(WorkerId::DRIVER)?;
        let (values, elapsed) = shade_block(config, shader, &block, me);

        computation_time += elapsed;
        blocks.push((block, values));
    }

    let message = ResultMsg {
        computation_time,
        blocks,
    };
    endpoint.send_buffer(WorkerId::DRIVER, protocol::encode(&message))?;

    Ok(())
}

/// Pull one block at a time, reporting each result before the next pull,
/// until the driver sends the zero-extent sentinel.
fn pull_loop(endpoint: &mut Endpoint, config: &Config, shader: &dyn PixelShader) -> Result {
    let me = endpoint.my_id();
    let mut computation_time = 0.0;

    loop {
        let block = endpoint.recv_block(WorkerId::DRIVER)?;

        if block.is_sentinel() {
            trace!("worker {} released", me);
            return Ok(());
        }

        let (values, elapsed) = shade_block(config, shader, &block, me);
        computation_time += elapsed;

        let message = ResultMsg {
            computation_time,
            blocks: vec![(block, values)],
        };
        endpoint.send_buffer(WorkerId::DRIVER, protocol::encode(&message))?;
    }
}

/// Shade one block, row-major, into a fresh block-local buffer, timing the
/// computation.
fn shade_block(
    config: &Config,
    shader: &dyn PixelShader,
    block: &Block,
    me: WorkerId,
) -> (Vec<f32>, f64) {
    let mut values = vec![0.0; block.num_values()];
    let start = Instant::now();

    for row in 0..block.height {
        for column in 0..block.width {
            let base = CHANNELS * (row as usize * block.width as usize + column as usize);
            shader.shade(
                &mut values[base..base + CHANNELS],
                block.y + row,
                block.x + column,
            );
        }
    }

    let elapsed = start.elapsed().as_secs_f64();

    if config.tint_by_worker {
        let tint = worker_tint(me, config.workers);
        for pixel in values.chunks_exact_mut(CHANNELS) {
            pixel.copy_from_slice(&tint);
        }
    }

    trace!("worker {} shaded {:?} in {:.6} s", me, block, elapsed);
    (values, elapsed)
}

/// A fully saturated color with the hue spread evenly over the worker ids,
/// for making each worker's share of the image visible.
pub(crate) fn worker_tint(worker: WorkerId, workers: usize) -> [f32; 3] {
    let hue = worker.get() as f32 / workers as f32 * 6.0;
    let sector = hue as u32 % 6;
    let fraction = hue - hue.floor();

    match sector {
        0 => [1.0, fraction, 0.0],
        1 => [1.0 - fraction, 1.0, 0.0],
        2 => [0.0, 1.0, fraction],
        3 => [0.0, 1.0 - fraction, 1.0],
        4 => [fraction, 0.0, 1.0],
        _ => [1.0, 0.0, 1.0 - fraction],
    }
}
