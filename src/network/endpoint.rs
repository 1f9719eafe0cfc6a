//! Point-to-point transport between the driver and its workers.
//!
//! The process group is a star: all assignment traffic flows driver to
//! worker and all result traffic flows worker to driver, so each participant
//! holds a sender towards the peers it may address and one inbox. The
//! driver also holds a sender to itself; under the static strategies it
//! doubles as worker 0 and its own assignments loop back through that local
//! channel. Message sizes travel with the payload, so there is no separate
//! probe step before a receive.

use bincode::Options;
use crossbeam::channel::{unbounded, Receiver, Sender};
use serde::{de::DeserializeOwned, Serialize};
use std::collections::VecDeque;

use crate::prelude::*;
use crate::types::{Block, WorkerId};

#[derive(Error, Debug)]
pub enum TransportError {
    #[error("participant {0} does not exist")]
    InvalidRank(WorkerId),

    #[error("connection was closed")]
    Disconnected,

    #[error("malformed assignment message: {0}")]
    Decode(#[from] bincode::Error),
}

fn serialize<S>(msg: &S) -> bincode::Result<Vec<u8>>
where
    S: Serialize,
{
    bincode::DefaultOptions::new()
        .with_varint_encoding()
        .serialize(msg)
}

fn deserialize<D>(buffer: &[u8]) -> bincode::Result<D>
where
    D: DeserializeOwned,
{
    bincode::DefaultOptions::new()
        .with_varint_encoding()
        .deserialize(buffer)
}

#[derive(Debug)]
struct Envelope {
    source: WorkerId,
    data: Vec<u8>,
}

/// One participant's handle on the transport.
///
/// Receives are blocking; a receive aimed at a specific source stashes
/// whatever else arrives in the meantime, preserving per-sender order.
#[derive(Debug)]
pub(crate) struct Endpoint {
    my_id: WorkerId,
    num_participants: usize,
    peers: HashMap<WorkerId, Sender<Envelope>>,
    inbox: Receiver<Envelope>,
    stash: HashMap<WorkerId, VecDeque<Vec<u8>>>,
}

impl Endpoint {
    pub fn my_id(&self) -> WorkerId {
        self.my_id
    }

    pub fn num_participants(&self) -> usize {
        self.num_participants
    }

    fn send(&self, dst: WorkerId, data: Vec<u8>) -> Result<(), TransportError> {
        let sender = self
            .peers
            .get(&dst)
            .ok_or(TransportError::InvalidRank(dst))?;

        sender
            .send(Envelope {
                source: self.my_id,
                data,
            })
            .map_err(|_| TransportError::Disconnected)
    }

    /// Send one fixed-size block descriptor.
    pub fn send_block(&self, dst: WorkerId, block: &Block) -> Result<(), TransportError> {
        self.send(dst, serialize(block)?)
    }

    /// Send an opaque variable-length buffer.
    pub fn send_buffer(&self, dst: WorkerId, buffer: Vec<u8>) -> Result<(), TransportError> {
        self.send(dst, buffer)
    }

    pub fn recv_block(&mut self, src: WorkerId) -> Result<Block, TransportError> {
        Ok(deserialize(&self.recv_buffer_from(src)?)?)
    }

    /// Receive the next buffer sent by `src`, stashing messages from other
    /// sources until their turn comes.
    pub fn recv_buffer_from(&mut self, src: WorkerId) -> Result<Vec<u8>, TransportError> {
        if let Some(data) = self.stash.get_mut(&src).and_then(|q| q.pop_front()) {
            return Ok(data);
        }

        loop {
            let envelope = self
                .inbox
                .recv()
                .map_err(|_| TransportError::Disconnected)?;

            if envelope.source == src {
                return Ok(envelope.data);
            }

            self.stash
                .entry(envelope.source)
                .or_default()
                .push_back(envelope.data);
        }
    }

    /// Receive a buffer from whichever sender delivers first, reporting who
    /// it came from.
    pub fn recv_buffer_any(&mut self) -> Result<(WorkerId, Vec<u8>), TransportError> {
        for (&source, queue) in self.stash.iter_mut() {
            if let Some(data) = queue.pop_front() {
                return Ok((source, data));
            }
        }

        let envelope = self
            .inbox
            .recv()
            .map_err(|_| TransportError::Disconnected)?;

        Ok((envelope.source, envelope.data))
    }
}

/// Wire up `count` participants and run them to completion: workers on
/// named threads, the driver (participant 0) on the calling thread. The
/// driver's return value is the run's return value; a worker failure or
/// panic fails the run.
pub(crate) fn execute_participants<R, D, W>(
    count: usize,
    driver_fn: D,
    worker_fn: W,
) -> Result<R>
where
    D: FnOnce(Endpoint) -> Result<R>,
    W: Fn(Endpoint) -> Result<()> + Sync,
{
    let (driver_sender, driver_inbox) = unbounded();

    let mut driver_peers: HashMap<_, _> = default();
    driver_peers.insert(WorkerId::DRIVER, driver_sender.clone());

    let mut worker_endpoints = Vec::with_capacity(count.saturating_sub(1));
    for rank in 1..count {
        let id = WorkerId::new(rank);
        let (sender, inbox) = unbounded();
        driver_peers.insert(id, sender);

        let mut peers: HashMap<_, _> = default();
        peers.insert(WorkerId::DRIVER, driver_sender.clone());

        worker_endpoints.push(Endpoint {
            my_id: id,
            num_participants: count,
            peers,
            inbox,
            stash: default(),
        });
    }

    drop(driver_sender);

    let driver_endpoint = Endpoint {
        my_id: WorkerId::DRIVER,
        num_participants: count,
        peers: driver_peers,
        inbox: driver_inbox,
        stash: default(),
    };

    crossbeam::thread::scope(|scope| {
        let mut handles = Vec::with_capacity(worker_endpoints.len());

        for endpoint in worker_endpoints {
            let worker_fn = &worker_fn;
            let handle = scope
                .builder()
                .name(format!("worker-{}", endpoint.my_id()))
                .spawn(move |_| worker_fn(endpoint))
                .map_err(|e| anyhow!("failed to launch worker thread: {}", e))?;
            handles.push(handle);
        }

        let output = driver_fn(driver_endpoint);

        let mut failure = None;
        for handle in handles {
            match handle.join() {
                Ok(Ok(())) => {}
                Ok(Err(e)) => failure = Some(e.context("worker failed")),
                Err(_) => {
                    error!("a worker thread panicked");
                    failure = Some(anyhow!("worker thread panicked"));
                }
            }
        }

        match (output, failure) {
            (Err(e), _) => Err(e),
            (Ok(_), Some(e)) => Err(e),
            (Ok(r), None) => Ok(r),
        }
    })
    .map_err(|_| anyhow!("worker thread panicked"))?
}
