//! The packed result message a worker sends back to the driver.
//!
//! One message carries the worker's computation time, a block count, and
//! that many (header, payload) pairs. There is no fixed schema or length
//! prefix per block: the payload length follows from the header's extent,
//! which lets a single message mix blocks of different sizes. The total
//! byte size is an exact sum computed before any writing happens, so
//! encoding never reallocates.

use crate::prelude::*;
use crate::types::Block;

/// Computation time scalar, `f64`.
const SCALAR_COST: usize = 8;
/// Block count, `u32`.
const COUNT_COST: usize = 4;
/// Four `u32` header fields per block.
const HEADER_COST: usize = 16;
/// One `f32` channel value.
const VALUE_COST: usize = 4;

/// A decoded result message. Everything is little-endian on the wire.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultMsg {
    pub computation_time: f64,
    pub blocks: Vec<(Block, Vec<f32>)>,
}

/// A buffer that disagrees with its own embedded count or headers.
/// Indicates a codec bug on one side; never retried.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    #[error("message truncated: needed {expected} more bytes, {actual} remain")]
    Truncated { expected: usize, actual: usize },

    #[error("block of {width}x{height} pixels exceeds the addressable payload size")]
    Oversized { width: u32, height: u32 },

    #[error("{0} trailing bytes after the last block")]
    TrailingBytes(usize),
}

/// Exact encoded size of a message carrying the given blocks.
pub fn message_size(blocks: &[(Block, Vec<f32>)]) -> usize {
    let payload: usize = blocks
        .iter()
        .map(|(block, _)| HEADER_COST + VALUE_COST * block.num_values())
        .sum();

    SCALAR_COST + COUNT_COST + payload
}

/// Pack a message into one flat buffer of exactly [`message_size`] bytes.
///
/// # Panics
/// Panics if any payload length disagrees with its block header; the worker
/// constructs both from the same block, so a mismatch is a caller bug.
pub fn encode(msg: &ResultMsg) -> Vec<u8> {
    let size = message_size(&msg.blocks);
    let mut buffer = Vec::with_capacity(size);

    buffer.extend_from_slice(&msg.computation_time.to_le_bytes());
    buffer.extend_from_slice(&(msg.blocks.len() as u32).to_le_bytes());

    for (block, values) in &msg.blocks {
        assert_eq!(values.len(), block.num_values());

        for field in &[block.x, block.y, block.width, block.height] {
            buffer.extend_from_slice(&field.to_le_bytes());
        }

        for value in values {
            buffer.extend_from_slice(&value.to_le_bytes());
        }
    }

    debug_assert_eq!(buffer.len(), size);
    buffer
}

/// Unpack a message, trusting the embedded count and headers to delimit the
/// payloads. Any disagreement with the buffer length is a [`ProtocolError`].
pub fn decode(buffer: &[u8]) -> Result<ResultMsg, ProtocolError> {
    let mut reader = Reader { buffer, pos: 0 };

    let computation_time = f64::from_le_bytes(reader.take_array()?);
    let count = u32::from_le_bytes(reader.take_array()?) as usize;

    // The count is untrusted input, cap the preallocation by what the
    // buffer could possibly hold.
    let mut blocks = Vec::with_capacity(min(count, buffer.len() / HEADER_COST + 1));

    for _ in 0..count {
        let x = u32::from_le_bytes(reader.take_array()?);
        let y = u32::from_le_bytes(reader.take_array()?);
        let width = u32::from_le_bytes(reader.take_array()?);
        let height = u32::from_le_bytes(reader.take_array()?);
        let block = Block::new(x, y, width, height);

        // Checked throughout: the header is untrusted and an absurd extent
        // must fail before anything is allocated.
        let byte_len = (width as usize)
            .checked_mul(height as usize)
            .and_then(|pixels| pixels.checked_mul(crate::types::CHANNELS))
            .and_then(|values| values.checked_mul(VALUE_COST))
            .ok_or(ProtocolError::Oversized { width, height })?;

        let values = reader
            .take(byte_len)?
            .chunks_exact(VALUE_COST)
            .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
            .collect();

        blocks.push((block, values));
    }

    if reader.remaining() > 0 {
        return Err(ProtocolError::TrailingBytes(reader.remaining()));
    }

    Ok(ResultMsg {
        computation_time,
        blocks,
    })
}

struct Reader<'a> {
    buffer: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn remaining(&self) -> usize {
        self.buffer.len() - self.pos
    }

    fn take(&mut self, len: usize) -> Result<&'a [u8], ProtocolError> {
        if self.remaining() < len {
            return Err(ProtocolError::Truncated {
                expected: len,
                actual: self.remaining(),
            });
        }

        let slice = &self.buffer[self.pos..self.pos + len];
        self.pos += len;
        Ok(slice)
    }

    fn take_array<const N: usize>(&mut self) -> Result<[u8; N], ProtocolError> {
        let mut out = [0; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn patterned(block: &Block) -> Vec<f32> {
        (0..block.num_values())
            .map(|i| (i as f32) * 0.5 - 3.0)
            .collect()
    }

    fn message(blocks: &[Block]) -> ResultMsg {
        ResultMsg {
            computation_time: 1.25,
            blocks: blocks.iter().map(|&b| (b, patterned(&b))).collect(),
        }
    }

    #[test]
    fn test_round_trip() {
        // Heterogeneous block sizes in one message, as the grid and dynamic
        // strategies produce.
        let msg = message(&[
            Block::new(0, 0, 4, 2),
            Block::new(7, 3, 1, 5),
            Block::new(2, 9, 3, 3),
        ]);

        let encoded = encode(&msg);
        assert_eq!(encoded.len(), message_size(&msg.blocks));
        assert_eq!(decode(&encoded), Ok(msg));
    }

    #[test]
    fn test_round_trip_single_row() {
        let msg = message(&[Block::new(0, 11, 64, 1)]);
        assert_eq!(decode(&encode(&msg)), Ok(msg));
    }

    #[test]
    fn test_round_trip_empty() {
        // A worker that planned zero blocks still reports its timing.
        let msg = ResultMsg {
            computation_time: 0.0,
            blocks: vec![],
        };

        let encoded = encode(&msg);
        assert_eq!(encoded.len(), 12);
        assert_eq!(decode(&encoded), Ok(msg));
    }

    #[test]
    fn test_truncated() {
        let encoded = encode(&message(&[Block::new(0, 0, 2, 2)]));

        for len in 0..encoded.len() {
            match decode(&encoded[..len]) {
                Err(ProtocolError::Truncated { .. }) => {}
                other => panic!("truncation to {} bytes gave {:?}", len, other),
            }
        }
    }

    #[test]
    fn test_trailing_bytes() {
        let mut encoded = encode(&message(&[Block::new(1, 1, 2, 2)]));
        encoded.extend_from_slice(&[0, 0, 0]);

        assert_eq!(decode(&encoded), Err(ProtocolError::TrailingBytes(3)));
    }

    #[test]
    fn test_lying_count() {
        let mut encoded = encode(&message(&[Block::new(0, 0, 2, 2)]));
        // Claim far more blocks than the buffer holds.
        encoded[8..12].copy_from_slice(&u32::MAX.to_le_bytes());

        assert!(matches!(
            decode(&encoded),
            Err(ProtocolError::Truncated { .. })
        ));
    }

    #[test]
    fn test_absurd_header() {
        let msg = ResultMsg {
            computation_time: 0.0,
            blocks: vec![],
        };
        let mut encoded = encode(&msg);
        encoded[8..12].copy_from_slice(&1u32.to_le_bytes());
        // A header promising u32::MAX squared pixels must fail cleanly
        // without allocating.
        encoded.extend_from_slice(&0u32.to_le_bytes());
        encoded.extend_from_slice(&0u32.to_le_bytes());
        encoded.extend_from_slice(&u32::MAX.to_le_bytes());
        encoded.extend_from_slice(&u32::MAX.to_le_bytes());

        match decode(&encoded) {
            Err(ProtocolError::Truncated { .. }) | Err(ProtocolError::Oversized { .. }) => {}
            other => panic!("expected failure, got {:?}", other),
        }
    }
}
