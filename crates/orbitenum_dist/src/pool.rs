//! Bounded in-flight send tracking and per-destination outbound buffering.
//!
//! Together these are the backpressure mechanism: at most `max_flying`
//! messages are in flight at once, and everything beyond that parks in
//! per-destination buffers until a slot frees up. Memory is traded for
//! progress; the driver never blocks on a send.

use std::collections::VecDeque;

use orbitenum::EngineResult;

use crate::comm::{Communicator, SendHandle};
use crate::protocol::{FacetBatch, Message, RoutedFace};

/// Fixed-capacity pool of in-flight sends.
pub struct InFlightPool {
    slots: Vec<Option<SendHandle>>,
}

impl InFlightPool {
    /// Constructs a pool with `capacity` slots.
    pub fn new(capacity: usize) -> Self {
        InFlightPool {
            slots: (0..capacity.max(1)).map(|_| None).collect(),
        }
    }

    /// Releases the slots of completed sends and returns how many slots are
    /// now free.
    pub fn poll_completed(&mut self) -> usize {
        for slot in &mut self.slots {
            if slot.as_ref().is_some_and(SendHandle::is_complete) {
                *slot = None;
            }
        }
        self.slots.iter().filter(|s| s.is_none()).count()
    }

    /// Claims a free slot for `handle`; fails (returning it) when full.
    pub fn try_admit(&mut self, handle: SendHandle) -> Result<(), SendHandle> {
        match self.slots.iter_mut().find(|s| s.is_none()) {
            Some(slot) => {
                *slot = Some(handle);
                Ok(())
            }
            None => Err(handle),
        }
    }

    /// Number of sends currently in flight.
    pub fn in_flight(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }
}

/// Per-destination buffers of not-yet-sent faces, drained one batch at a time
/// through the in-flight pool.
pub struct BufferedExchange {
    unsent: Vec<VecDeque<RoutedFace>>,
    pool: InFlightPool,
    origin_rank: usize,
}

impl BufferedExchange {
    /// Constructs buffers for `n_proc` destinations with `max_flying`
    /// in-flight slots.
    pub fn new(n_proc: usize, max_flying: usize, origin_rank: usize) -> Self {
        BufferedExchange {
            unsent: (0..n_proc).map(|_| VecDeque::new()).collect(),
            pool: InFlightPool::new(max_flying),
            origin_rank,
        }
    }

    /// Parks a face for `dest`.
    pub fn queue(&mut self, dest: usize, face: RoutedFace) {
        self.unsent[dest].push_back(face);
    }

    /// Total number of parked faces.
    pub fn unsent_len(&self) -> usize {
        self.unsent.iter().map(VecDeque::len).sum()
    }

    /// Sends the whole buffer of one destination as a single batch, if a slot
    /// is free. Returns whether anything was sent.
    pub fn flush_one(&mut self, comm: &impl Communicator) -> EngineResult<bool> {
        if self.pool.poll_completed() == 0 {
            return Ok(false);
        }
        let Some(dest) = (0..self.unsent.len()).find(|&d| !self.unsent[d].is_empty()) else {
            return Ok(false);
        };
        let faces: Vec<RoutedFace> = self.unsent[dest].drain(..).collect();
        log::debug!(
            "rank {}: flushing {} faces to rank {dest}",
            self.origin_rank,
            faces.len(),
        );
        let batch = FacetBatch {
            origin_rank: self.origin_rank,
            faces,
        };
        let handle = comm.send(dest, Message::NewFacets(batch))?;
        if let Err(handle) = self.pool.try_admit(handle) {
            // A slot was free when polled above; admitting cannot fail.
            debug_assert!(handle.is_complete(), "lost track of an in-flight send");
        }
        Ok(true)
    }

    /// Whether every buffer is empty and every in-flight send has completed.
    pub fn is_drained(&mut self) -> bool {
        self.pool.poll_completed();
        self.unsent_len() == 0 && self.pool.in_flight() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pool_capacity_is_enforced() {
        let mut pool = InFlightPool::new(2);
        assert!(pool.try_admit(SendHandle::completed()).is_ok());
        assert!(pool.try_admit(SendHandle::completed()).is_ok());
        assert!(pool.try_admit(SendHandle::completed()).is_err());
        assert_eq!(pool.in_flight(), 2);
        // Completed sends free their slots on the next poll.
        assert_eq!(pool.poll_completed(), 2);
        assert!(pool.try_admit(SendHandle::completed()).is_ok());
    }
}
