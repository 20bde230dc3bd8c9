// Pull-side adapter over the slot ring
//
// Callers ask for an arbitrary number of elements; slots hold whatever the
// transport delivered. The reader keeps the current slot on loan across
// calls until every element in it has been converted.

use crate::convert::{convert_cf32, BYTES_PER_ELEMENT};
use crate::error::StreamResult;
use crate::ring::{RingBuffer, SlotHandle};
use crate::types::{Outcome, ReadChunk};
use std::time::Duration;

#[derive(Debug)]
struct HeldSlot {
    handle: SlotHandle,
    /// Unconverted elements left in the slot
    remaining: usize,
    /// Byte offset of the next unconverted element
    cursor: usize,
}

/// Converts ring slots into caller-sized CF32 reads.
#[derive(Debug, Default)]
pub struct StreamReader {
    held: Option<HeldSlot>,
    reads: u64,
    elements_delivered: u64,
}

impl StreamReader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read up to `max_elements` I/Q pairs into `dst` as interleaved floats.
    ///
    /// `dst` must hold `2 * max_elements` floats; a shorter buffer caps the
    /// element count. Timeout and overflow from the ring are passed through
    /// without touching `dst`.
    pub fn read(
        &mut self,
        ring: &RingBuffer,
        dst: &mut [f32],
        max_elements: usize,
        timeout: Duration,
    ) -> StreamResult<Outcome<ReadChunk>> {
        if ring.is_reset_pending() {
            self.discard(ring);
        }

        let mut held = match self.held.take() {
            Some(held) => held,
            None => match ring.acquire(timeout)? {
                Outcome::Ready(acquired) => HeldSlot {
                    handle: acquired.handle,
                    remaining: acquired.elements,
                    cursor: 0,
                },
                Outcome::Timeout => return Ok(Outcome::Timeout),
                Outcome::Overflow => return Ok(Outcome::Overflow),
            },
        };

        let count = held.remaining.min(max_elements).min(dst.len() / 2);
        let end = held.cursor + count * BYTES_PER_ELEMENT;
        convert_cf32(&ring.data(&held.handle)[held.cursor..end], &mut dst[..count * 2]);

        held.cursor = end;
        held.remaining -= count;
        self.reads += 1;
        self.elements_delivered += count as u64;

        let more_fragments = held.remaining > 0;
        if more_fragments {
            self.held = Some(held);
        } else {
            ring.release(held.handle);
        }

        Ok(Outcome::Ready(ReadChunk {
            elements: count,
            more_fragments,
        }))
    }

    /// Drop any carry-over and give its slot back to the ring.
    pub fn discard(&mut self, ring: &RingBuffer) {
        if let Some(held) = self.held.take() {
            log::debug!("Discarding {} carried-over elements", held.remaining);
            ring.release(held.handle);
        }
    }

    /// Elements left in the slot currently on loan.
    pub fn remaining_elements(&self) -> usize {
        self.held.as_ref().map_or(0, |held| held.remaining)
    }

    /// Index of the slot currently on loan.
    pub fn current_slot(&self) -> Option<usize> {
        self.held.as_ref().map(|held| held.handle.index())
    }

    pub fn reads(&self) -> u64 {
        self.reads
    }

    pub fn elements_delivered(&self) -> u64 {
        self.elements_delivered
    }
}
