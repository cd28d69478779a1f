//! Transport abstraction and the in-process channel implementation.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;

use orbitenum::{EngineError, EngineResult};
use parking_lot::{Condvar, Mutex};

use crate::protocol::{LocalReport, Message};

/// Completion tracker for one asynchronous send.
///
/// The channel transport completes sends immediately; a real MPI transport
/// would flip the flag when the underlying request tests complete.
#[derive(Debug, Clone)]
pub struct SendHandle {
    complete: Arc<AtomicBool>,
}

impl SendHandle {
    /// A handle that is already complete.
    pub fn completed() -> Self {
        SendHandle {
            complete: Arc::new(AtomicBool::new(true)),
        }
    }

    /// Whether the send has finished and its slot can be reused.
    pub fn is_complete(&self) -> bool {
        self.complete.load(Ordering::Acquire)
    }
}

/// What the distributed driver needs from a transport.
///
/// Point-to-point delivery must be FIFO per ordered pair of ranks; the
/// termination protocol relies on a worker's facet messages arriving before
/// its quiescence notice.
pub trait Communicator {
    /// This worker's rank, in `0..size()`.
    fn rank(&self) -> usize;
    /// Number of workers.
    fn size(&self) -> usize;
    /// Starts sending a message to `dest`.
    fn send(&self, dest: usize, message: Message) -> EngineResult<SendHandle>;
    /// Non-blocking probe: the next pending message, with its source rank.
    fn try_probe(&self) -> Option<(usize, Message)>;
    /// Collective maximum over one value per worker. Every worker must call
    /// this the same number of times in the same order.
    fn all_reduce_max(&self, value: u64) -> u64;
    /// Collective gather of per-worker reports. Returns the reports, ordered
    /// by rank, at `root`; `None` elsewhere.
    fn gather_reports(&self, root: usize, report: LocalReport) -> Option<Vec<LocalReport>>;
}

#[derive(Default)]
struct ReduceState {
    round: u64,
    arrived: usize,
    current: u64,
    result: u64,
}

struct GatherState {
    round: u64,
    arrived: usize,
    slots: Vec<Option<LocalReport>>,
    result: Option<Vec<LocalReport>>,
}

struct Shared {
    n: usize,
    reduce: Mutex<ReduceState>,
    reduce_cv: Condvar,
    gather: Mutex<GatherState>,
    gather_cv: Condvar,
}

/// In-process transport: one rank per thread, `std::sync::mpsc` channels for
/// point-to-point messages (FIFO per sender), shared state for collectives.
pub struct ChannelComm {
    rank: usize,
    senders: Vec<mpsc::Sender<(usize, Message)>>,
    receiver: mpsc::Receiver<(usize, Message)>,
    shared: Arc<Shared>,
}

impl ChannelComm {
    /// Builds a cluster of `n` connected endpoints, one per rank.
    pub fn cluster(n: usize) -> Vec<ChannelComm> {
        assert!(n > 0, "a cluster needs at least one rank");
        let mut senders = Vec::with_capacity(n);
        let mut receivers = Vec::with_capacity(n);
        for _ in 0..n {
            let (tx, rx) = mpsc::channel();
            senders.push(tx);
            receivers.push(rx);
        }
        let shared = Arc::new(Shared {
            n,
            reduce: Mutex::new(ReduceState::default()),
            reduce_cv: Condvar::new(),
            gather: Mutex::new(GatherState {
                round: 0,
                arrived: 0,
                slots: (0..n).map(|_| None).collect(),
                result: None,
            }),
            gather_cv: Condvar::new(),
        });
        receivers
            .into_iter()
            .enumerate()
            .map(|(rank, receiver)| ChannelComm {
                rank,
                senders: senders.clone(),
                receiver,
                shared: Arc::clone(&shared),
            })
            .collect()
    }
}

impl Communicator for ChannelComm {
    fn rank(&self) -> usize {
        self.rank
    }

    fn size(&self) -> usize {
        self.shared.n
    }

    fn send(&self, dest: usize, message: Message) -> EngineResult<SendHandle> {
        self.senders[dest]
            .send((self.rank, message))
            .map_err(|_| EngineError::Fatal(format!("rank {dest} hung up")))?;
        Ok(SendHandle::completed())
    }

    fn try_probe(&self) -> Option<(usize, Message)> {
        match self.receiver.try_recv() {
            Ok(pair) => Some(pair),
            Err(mpsc::TryRecvError::Empty) => None,
            // A disconnected peer means the run is over; nothing more will
            // arrive, which is all a probe needs to report.
            Err(mpsc::TryRecvError::Disconnected) => None,
        }
    }

    fn all_reduce_max(&self, value: u64) -> u64 {
        let mut state = self.shared.reduce.lock();
        let my_round = state.round;
        state.current = state.current.max(value);
        state.arrived += 1;
        if state.arrived == self.shared.n {
            state.result = state.current;
            state.current = 0;
            state.arrived = 0;
            state.round += 1;
            self.shared.reduce_cv.notify_all();
        }
        while state.round == my_round {
            self.shared.reduce_cv.wait(&mut state);
        }
        state.result
    }

    fn gather_reports(&self, root: usize, report: LocalReport) -> Option<Vec<LocalReport>> {
        let mut state = self.shared.gather.lock();
        let my_round = state.round;
        state.slots[self.rank] = Some(report);
        state.arrived += 1;
        if state.arrived == self.shared.n {
            let collected = state
                .slots
                .iter_mut()
                .map(|slot| slot.take().unwrap_or_default())
                .collect();
            state.result = Some(collected);
            state.arrived = 0;
            state.round += 1;
            self.shared.gather_cv.notify_all();
        }
        while state.round == my_round {
            self.shared.gather_cv.wait(&mut state);
        }
        if self.rank == root {
            state.result.take()
        } else {
            None
        }
    }
}
